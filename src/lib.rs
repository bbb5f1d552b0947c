//! Handoff decision engine
//!
//! Decides, for one inbound conversational turn, whether an automated agent
//! must hand the conversation to a human and with what urgency.
//!
//! Path: turn → signal evaluators + tiered sentiment → aggregator → HandoffDecision

pub mod config;
pub mod core;
pub mod error;
pub mod types;

pub use config::EngineConfig;
pub use error::{HandoffError, Result};

// =============================================================================
// SENTIMENT THRESHOLDS [C]
// =============================================================================

/// Neutral starting point for the rule tier
pub const SENTIMENT_BASELINE: f64 = 0.5;

/// Resolved scores below this recommend escalation
pub const SENTIMENT_ESCALATION_THRESHOLD: f64 = 0.3;

/// Rule-tier scores within this distance of the threshold are ambiguous
pub const SENTIMENT_AMBIGUITY_MARGIN: f64 = 0.1;

/// Semantic-tier scores below this go on to the remote tier
pub const SENTIMENT_REMOTE_THRESHOLD: f64 = 0.2;

/// Upper bound for a remote-tier call (milliseconds)
pub const REMOTE_TIER_TIMEOUT_MS: u64 = 500;

/// Upper bound for a semantic-tier call (milliseconds)
pub const SEMANTIC_TIER_TIMEOUT_MS: u64 = 2_000;

// =============================================================================
// RULE-TIER WEIGHTS [C]
// =============================================================================

pub const WEIGHT_POSITIVE: f64 = 0.2;
pub const WEIGHT_STRONG_NEGATIVE: f64 = -0.3;
pub const WEIGHT_MODERATE_NEGATIVE: f64 = -0.15;
pub const WEIGHT_FRUSTRATION: f64 = -0.1;

/// Per shouted word, after the grace allowance
pub const WEIGHT_CAPS_WORD: f64 = -0.1;
pub const CAPS_PENALTY_CAP: f64 = -0.3;

/// Shouted words tolerated before the penalty starts (acronyms, "OK", "USA")
pub const CAPS_GRACE_WORDS: usize = 2;

/// Per run of 3+ consecutive `!`/`?`
pub const WEIGHT_PUNCTUATION_RUN: f64 = -0.05;
pub const PUNCTUATION_PENALTY_CAP: f64 = -0.2;

// =============================================================================
// SIGNAL EVALUATORS [C]
// =============================================================================

/// Confidence for any explicit human request
pub const EXPLICIT_REQUEST_CONFIDENCE: f64 = 0.9;

/// Consecutive failures before the failure-pattern signal fires
pub const FAILURE_STREAK_THRESHOLD: u32 = 3;

/// Token-set Jaccard above which two user turns repeat the same question
pub const REPEATED_QUESTION_SIMILARITY: f64 = 0.5;

/// Token-set Jaccard above which two agent replies form a loop
pub const AGENT_LOOP_SIMILARITY: f64 = 0.8;

pub const FAILURE_BASE_CONFIDENCE: f64 = 0.8;
pub const FAILURE_MAX_CONFIDENCE: f64 = 0.9;

/// Confidence step per failure beyond the threshold
pub const FAILURE_CONFIDENCE_STEP: f64 = 0.05;

/// Fixed confidence for a critical keyword hit
pub const KEYWORD_CONFIDENCE: f64 = 0.95;

/// Confidence attached to a matching user rule
pub const RULE_MATCH_CONFIDENCE: f64 = 0.9;

// =============================================================================
// DEGRADATION [C]
// =============================================================================

/// Scores kept per conversation
pub const DEGRADATION_WINDOW_SIZE: usize = 5;

/// first − last above this counts as degrading
pub const DEGRADATION_THRESHOLD: f64 = 0.3;

// =============================================================================
// VERSION
// =============================================================================

pub const VERSION: &str = "1.0.0";
