//! Error taxonomy
//!
//! Only configuration errors ever reach a caller. Evaluation-time faults
//! ([`EvaluatorError`], [`ScorerError`]) are logged and downgraded inside the
//! engine.

use thiserror::Error;

/// Result alias for configuration-time operations
pub type Result<T> = std::result::Result<T, HandoffError>;

/// Configuration errors, raised at construction / `add_rule` time
#[derive(Debug, Error)]
pub enum HandoffError {
    #[error("{name} must be within [0, 1], got {value}")]
    ThresholdOutOfRange { name: &'static str, value: f64 },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid regular expression {pattern:?}: {source}")]
    InvalidRegex {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("malformed condition: {0}")]
    MalformedCondition(String),

    #[error("unknown field path {0:?} (expected message.content, message.speaker, context.<key> or conversation.length)")]
    UnknownField(String),

    #[error("rule id {0:?} is already registered")]
    DuplicateRule(String),

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

/// A signal evaluator failed while evaluating a turn
#[derive(Debug, Error)]
pub enum EvaluatorError {
    #[error("evaluator failed: {0}")]
    Failed(String),
}

/// A sentiment tier could not produce a usable score
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScorerError {
    #[error("tier not available")]
    Unavailable,

    #[error("tier timed out after {0} ms")]
    TimedOut(u64),

    #[error("tier returned an invalid payload: {0}")]
    InvalidPayload(String),

    #[error("tier backend error: {0}")]
    Backend(String),
}

/// Check a `[0, 1]` threshold
pub(crate) fn check_unit(name: &'static str, value: f64) -> Result<f64> {
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(HandoffError::ThresholdOutOfRange { name, value })
    }
}
