//! Signal structures shared by every evaluator

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Urgency of a handoff. Ordering is total: IMMEDIATE > HIGH > MEDIUM > LOW
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    Low = 0,
    Medium = 1,
    High = 2,
    Immediate = 3,
}

impl Priority {
    /// Numeric rank (higher = more urgent)
    pub fn rank(&self) -> u8 {
        *self as u8
    }
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Medium
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Priority::Low => "LOW",
            Priority::Medium => "MEDIUM",
            Priority::High => "HIGH",
            Priority::Immediate => "IMMEDIATE",
        };
        write!(f, "{}", name)
    }
}

/// Which detector produced a signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalKind {
    ExplicitRequest,
    FailurePattern,
    Keyword,
    RuleBased,
    Sentiment,
    SentimentDegradation,
    /// Caller-registered evaluator
    Custom,
}

impl SignalKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ExplicitRequest => "EXPLICIT_REQUEST",
            Self::FailurePattern => "FAILURE_PATTERN",
            Self::Keyword => "KEYWORD",
            Self::RuleBased => "RULE_BASED",
            Self::Sentiment => "SENTIMENT",
            Self::SentimentDegradation => "SENTIMENT_DEGRADATION",
            Self::Custom => "CUSTOM",
        }
    }
}

impl std::fmt::Display for SignalKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Verdict of one evaluator for one turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalResult {
    pub triggered: bool,
    pub kind: SignalKind,
    /// Always within [0, 1]
    pub confidence: f64,
    pub priority: Priority,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub detail: Map<String, Value>,
}

impl SignalResult {
    /// A triggered signal; confidence is clamped into [0, 1]
    pub fn triggered(
        kind: SignalKind,
        confidence: f64,
        priority: Priority,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            triggered: true,
            kind,
            confidence: clamp_unit(confidence),
            priority,
            reason: reason.into(),
            detail: Map::new(),
        }
    }

    /// A non-triggering result with zero confidence
    pub fn quiet(kind: SignalKind, priority: Priority) -> Self {
        Self {
            triggered: false,
            kind,
            confidence: 0.0,
            priority,
            reason: String::new(),
            detail: Map::new(),
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = reason.into();
        self
    }

    /// Attach a debug detail (builder style)
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.detail.insert(key.into(), value.into());
        self
    }
}

/// Clamp into [0, 1]; NaN collapses to 0
pub(crate) fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}
