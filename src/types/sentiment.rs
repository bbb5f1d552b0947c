//! Sentiment tier types

use std::time::Duration;
use serde::{Deserialize, Serialize};
use crate::types::signals::clamp_unit;

/// Scoring tiers, in escalation order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SentimentTier {
    /// Deterministic keyword/pattern scoring, always runs
    Rule,
    /// Local model, optional
    Semantic,
    /// Remote service, optional, bounded by a timeout
    Remote,
}

impl std::fmt::Display for SentimentTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SentimentTier::Rule => "RULE",
            SentimentTier::Semantic => "SEMANTIC",
            SentimentTier::Remote => "REMOTE",
        };
        write!(f, "{}", name)
    }
}

/// Label returned by a pluggable scorer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SentimentLabel {
    Positive,
    Neutral,
    Negative,
}

/// `score(text) -> (label, confidence)` payload of a semantic/remote tier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierVerdict {
    pub label: SentimentLabel,
    pub confidence: f64,
    /// Reported explicitly by some backends; otherwise derived as 1 - score
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frustration: Option<f64>,
}

impl TierVerdict {
    pub fn new(label: SentimentLabel, confidence: f64) -> Self {
        Self {
            label,
            confidence,
            frustration: None,
        }
    }

    pub fn with_frustration(mut self, frustration: f64) -> Self {
        self.frustration = Some(frustration);
        self
    }

    /// Confidence (and frustration, when present) must be finite and in [0, 1]
    pub fn is_valid(&self) -> bool {
        let in_unit = |v: f64| v.is_finite() && (0.0..=1.0).contains(&v);
        in_unit(self.confidence) && self.frustration.map_or(true, in_unit)
    }

    /// Map the label/confidence pair onto the [0, 1] sentiment scale
    ///
    /// POSITIVE pushes above 0.5 by confidence/2, NEGATIVE below, NEUTRAL stays at 0.5.
    pub fn to_score(&self) -> f64 {
        let half = self.confidence / 2.0;
        let score = match self.label {
            SentimentLabel::Positive => 0.5 + half,
            SentimentLabel::Neutral => 0.5,
            SentimentLabel::Negative => 0.5 - half,
        };
        clamp_unit(score)
    }
}

/// How a tier attempt ended
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status", content = "detail")]
pub enum TierOutcome {
    Completed,
    Unavailable,
    Failed(String),
    TimedOut,
    Cancelled,
}

/// One step of the escalation chain, kept for debugging
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierAttempt {
    pub tier: SentimentTier,
    pub outcome: TierOutcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

/// Adjustments applied by the rule tier on top of the 0.5 baseline
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleTierBreakdown {
    pub positive: f64,
    pub strong_negative: f64,
    pub moderate_negative: f64,
    pub frustration: f64,
    /// Capped at -0.3
    pub caps_penalty: f64,
    /// Capped at -0.2
    pub punctuation_penalty: f64,
    pub caps_words: usize,
    pub punctuation_runs: usize,
}

impl RuleTierBreakdown {
    /// Sum of the keyword weights only
    pub fn keyword_adjustment(&self) -> f64 {
        self.positive + self.strong_negative + self.moderate_negative + self.frustration
    }

    /// Sum of every adjustment
    pub fn total(&self) -> f64 {
        self.keyword_adjustment() + self.caps_penalty + self.punctuation_penalty
    }
}

/// Resolved sentiment for one turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentResult {
    /// 0 = very negative, 1 = very positive
    pub score: f64,
    pub frustration: f64,
    pub confidence: f64,
    /// Tier that produced the final score
    pub tier_used: SentimentTier,
    /// An escalation past the rule tier was attempted
    pub escalated: bool,
    pub degradation_detected: bool,
    /// Resolved score below the configured threshold
    pub should_escalate: bool,
    pub elapsed: Duration,
    pub breakdown: RuleTierBreakdown,
    #[serde(default)]
    pub attempts: Vec<TierAttempt>,
}

impl SentimentResult {
    /// Neutral result used for empty input
    pub fn neutral() -> Self {
        Self {
            score: crate::SENTIMENT_BASELINE,
            frustration: 1.0 - crate::SENTIMENT_BASELINE,
            confidence: 0.0,
            tier_used: SentimentTier::Rule,
            escalated: false,
            degradation_detected: false,
            should_escalate: false,
            elapsed: Duration::ZERO,
            breakdown: RuleTierBreakdown::default(),
            attempts: Vec::new(),
        }
    }
}
