//! Reason codes for handoff decisions

use serde::{Deserialize, Serialize};
use crate::types::SignalKind;

/// Reason codes attached to every decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[allow(non_camel_case_types)]
pub enum ReasonCode {
    // =========================================================================
    // H000: No handoff
    // =========================================================================
    /// No signal triggered and sentiment is acceptable
    H000_NO_HANDOFF,

    // =========================================================================
    // H001-H004: Signal evaluators
    // =========================================================================
    /// User asked for a human
    H001_EXPLICIT_REQUEST,
    /// Agent failed repeatedly without recovery
    H002_FAILURE_STREAK,
    /// Critical keyword (fraud, safety, legal, ...)
    H003_CRITICAL_KEYWORD,
    /// A configured rule matched
    H004_RULE_MATCHED,

    // =========================================================================
    // H005-H006: Sentiment
    // =========================================================================
    /// Resolved sentiment below threshold
    H005_NEGATIVE_SENTIMENT,
    /// Sentiment worsening across the window
    H006_SENTIMENT_DEGRADING,

    // =========================================================================
    // H007: Extensions
    // =========================================================================
    /// Caller-registered evaluator fired
    H007_CUSTOM_SIGNAL,
}

impl ReasonCode {
    /// Reason code for a winning signal kind
    pub fn for_kind(kind: SignalKind) -> Self {
        match kind {
            SignalKind::ExplicitRequest => Self::H001_EXPLICIT_REQUEST,
            SignalKind::FailurePattern => Self::H002_FAILURE_STREAK,
            SignalKind::Keyword => Self::H003_CRITICAL_KEYWORD,
            SignalKind::RuleBased => Self::H004_RULE_MATCHED,
            SignalKind::Sentiment => Self::H005_NEGATIVE_SENTIMENT,
            SignalKind::SentimentDegradation => Self::H006_SENTIMENT_DEGRADING,
            SignalKind::Custom => Self::H007_CUSTOM_SIGNAL,
        }
    }

    /// Get the code string (for logging)
    pub fn code(&self) -> &'static str {
        match self {
            Self::H000_NO_HANDOFF => "H000_NO_HANDOFF",
            Self::H001_EXPLICIT_REQUEST => "H001_EXPLICIT_REQUEST",
            Self::H002_FAILURE_STREAK => "H002_FAILURE_STREAK",
            Self::H003_CRITICAL_KEYWORD => "H003_CRITICAL_KEYWORD",
            Self::H004_RULE_MATCHED => "H004_RULE_MATCHED",
            Self::H005_NEGATIVE_SENTIMENT => "H005_NEGATIVE_SENTIMENT",
            Self::H006_SENTIMENT_DEGRADING => "H006_SENTIMENT_DEGRADING",
            Self::H007_CUSTOM_SIGNAL => "H007_CUSTOM_SIGNAL",
        }
    }

    /// Get human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            Self::H000_NO_HANDOFF => "No handoff recommended",
            Self::H001_EXPLICIT_REQUEST => "User requested a human agent",
            Self::H002_FAILURE_STREAK => "Repeated agent failures",
            Self::H003_CRITICAL_KEYWORD => "Critical keyword detected",
            Self::H004_RULE_MATCHED => "Handoff rule matched",
            Self::H005_NEGATIVE_SENTIMENT => "Negative sentiment",
            Self::H006_SENTIMENT_DEGRADING => "Sentiment degrading",
            Self::H007_CUSTOM_SIGNAL => "Custom signal triggered",
        }
    }

    pub fn is_handoff(&self) -> bool {
        *self != Self::H000_NO_HANDOFF
    }
}

impl std::fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code(), self.description())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_for_kind_covers_sentiment() {
        assert_eq!(
            ReasonCode::for_kind(SignalKind::SentimentDegradation),
            ReasonCode::H006_SENTIMENT_DEGRADING
        );
        assert!(ReasonCode::for_kind(SignalKind::Keyword).is_handoff());
        assert!(!ReasonCode::H000_NO_HANDOFF.is_handoff());
    }

    #[test]
    fn test_display_includes_code_and_description() {
        let s = ReasonCode::H003_CRITICAL_KEYWORD.to_string();
        assert_eq!(s, "H003_CRITICAL_KEYWORD: Critical keyword detected");
    }
}
