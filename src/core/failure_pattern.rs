//! Failure-pattern evaluator: the agent keeps failing and the user keeps trying
//!
//! Walks the conversation (oldest first) and counts an unbroken streak of:
//! - agent replies containing a failure phrase ("I don't understand")
//! - agent replies nearly identical to the previous agent reply (loop)
//! - user turns repeating the previous user turn (re-asked question)
//!
//! A success phrase in a user turn resets the streak to zero.

use std::collections::HashSet;
use lazy_static::lazy_static;
use regex::Regex;
use crate::config::FailureConfig;
use crate::core::signal::SignalEvaluator;
use crate::error::{EvaluatorError, Result};
use crate::types::{timeline, Context, Priority, SignalKind, SignalResult, Turn};
use crate::{FAILURE_BASE_CONFIDENCE, FAILURE_CONFIDENCE_STEP, FAILURE_MAX_CONFIDENCE};

lazy_static! {
    static ref RE_AGENT_FAILURE: Regex = Regex::new(
        r"(?i)\b(i\s+don'?t\s+understand|i\s+do\s+not\s+understand|i'?m\s+not\s+sure|i\s+am\s+not\s+sure|i\s+can'?t\s+help|i\s+cannot\s+help|i\s+don'?t\s+know|i\s+do\s+not\s+know|could\s+you\s+rephrase|can\s+you\s+rephrase|i\s+didn'?t\s+(get|catch)\s+that|i'?m\s+unable\s+to|i\s+am\s+unable\s+to|sorry,?\s+i\s+(can'?t|couldn'?t)|not\s+able\s+to\s+help)"
    ).unwrap();

    static ref RE_USER_SUCCESS: Regex = Regex::new(
        r"(?i)\b(thanks|thank\s+you|thx|perfect|got\s+it|that\s+works|that\s+helped|that\s+helps|great|awesome|solved|it\s+worked|makes\s+sense)\b"
    ).unwrap();

    static ref RE_TOKEN: Regex = Regex::new(r"[\p{L}\p{N}']+").unwrap();
}

/// Typographic apostrophes folded to ASCII so "I’m" reads as "I'm"
fn normalize(text: &str) -> String {
    text.replace(['\u{2018}', '\u{2019}'], "'")
}

/// Lowercased word set of a message
fn token_set(text: &str) -> HashSet<String> {
    RE_TOKEN
        .find_iter(&normalize(text))
        .map(|m| m.as_str().to_lowercase())
        .collect()
}

/// Token-set Jaccard similarity; two empty texts are not similar
pub fn jaccard_similarity(a: &str, b: &str) -> f64 {
    let a = token_set(a);
    let b = token_set(b);
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(&b).count();
    let union = a.union(&b).count();
    intersection as f64 / union as f64
}

/// Why a turn extended the streak
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureCause {
    AgentFailurePhrase,
    AgentLoop,
    RepeatedQuestion,
}

impl FailureCause {
    fn as_str(&self) -> &'static str {
        match self {
            Self::AgentFailurePhrase => "agent_failure_phrase",
            Self::AgentLoop => "agent_loop",
            Self::RepeatedQuestion => "repeated_question",
        }
    }
}

/// Streak state after walking the conversation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FailureStreak {
    /// Unbroken failures since the last success (or the start)
    pub consecutive: u32,
    /// Causes within the current streak, in order
    pub causes: Vec<FailureCause>,
    /// Number of resets seen along the way
    pub resets: u32,
}

impl FailureStreak {
    fn record(&mut self, cause: FailureCause) {
        self.consecutive += 1;
        self.causes.push(cause);
    }

    fn reset(&mut self) {
        self.consecutive = 0;
        self.causes.clear();
        self.resets += 1;
    }
}

/// Counts consecutive agent failures
#[derive(Debug, Clone)]
pub struct FailurePatternEvaluator {
    config: FailureConfig,
}

impl Default for FailurePatternEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl FailurePatternEvaluator {
    pub fn new() -> Self {
        Self {
            config: FailureConfig::default(),
        }
    }

    pub fn with_config(config: FailureConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &FailureConfig {
        &self.config
    }

    /// Walk the turns and compute the current streak
    pub fn streak(&self, turns: &[&Turn]) -> FailureStreak {
        let mut streak = FailureStreak::default();
        let mut last_user: Option<&Turn> = None;
        let mut last_agent: Option<&Turn> = None;

        for &turn in turns {
            let text = normalize(&turn.text);
            if turn.is_user() {
                if RE_USER_SUCCESS.is_match(&text) {
                    streak.reset();
                } else if let Some(prev) = last_user {
                    if jaccard_similarity(&prev.text, &turn.text) > self.config.question_similarity {
                        streak.record(FailureCause::RepeatedQuestion);
                    }
                }
                last_user = Some(turn);
            } else if turn.is_agent() {
                if RE_AGENT_FAILURE.is_match(&text) {
                    streak.record(FailureCause::AgentFailurePhrase);
                } else if let Some(prev) = last_agent {
                    if jaccard_similarity(&prev.text, &turn.text) > self.config.loop_similarity {
                        streak.record(FailureCause::AgentLoop);
                    }
                }
                last_agent = Some(turn);
            }
        }

        streak
    }

    /// 0.8 at the threshold, +0.05 per extra failure, capped at 0.9
    fn confidence(&self, consecutive: u32) -> f64 {
        let excess = consecutive.saturating_sub(self.config.streak_threshold) as f64;
        (FAILURE_BASE_CONFIDENCE + excess * FAILURE_CONFIDENCE_STEP).min(FAILURE_MAX_CONFIDENCE)
    }
}

impl SignalEvaluator for FailurePatternEvaluator {
    fn name(&self) -> &str {
        "failure_pattern"
    }

    fn kind(&self) -> SignalKind {
        SignalKind::FailurePattern
    }

    fn priority(&self) -> Priority {
        Priority::Medium
    }

    fn evaluate(
        &self,
        conversation: &[Turn],
        current: &Turn,
        _context: &Context,
    ) -> std::result::Result<SignalResult, EvaluatorError> {
        let turns = timeline(conversation, current);
        let streak = self.streak(&turns);
        let causes: Vec<&str> = streak.causes.iter().map(FailureCause::as_str).collect();

        if streak.consecutive < self.config.streak_threshold {
            return Ok(SignalResult::quiet(self.kind(), self.priority())
                .with_detail("consecutive_failures", streak.consecutive)
                .with_detail("threshold", self.config.streak_threshold));
        }

        Ok(SignalResult::triggered(
            self.kind(),
            self.confidence(streak.consecutive),
            self.priority(),
            format!(
                "{} consecutive failures (threshold {})",
                streak.consecutive, self.config.streak_threshold
            ),
        )
        .with_detail("consecutive_failures", streak.consecutive)
        .with_detail("threshold", self.config.streak_threshold)
        .with_detail("causes", causes))
    }
}

// =============================================================================
// TESTS
// =============================================================================
