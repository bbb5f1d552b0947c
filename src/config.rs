//! Engine configuration
//!
//! Defaults come from the constants in the crate root. Every section is
//! validated before the engine accepts it.

use std::collections::HashMap;
use serde::{Deserialize, Serialize};
use crate::core::keyword::KeywordCategory;
use crate::error::{check_unit, HandoffError, Result};

/// Thresholds for the tiered sentiment estimator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SentimentConfig {
    /// Resolved score below this recommends escalation
    pub escalation_threshold: f64,
    /// Rule-tier scores this close to the threshold go to the semantic tier
    pub ambiguity_margin: f64,
    /// Semantic scores below this go to the remote tier
    pub remote_threshold: f64,
    pub semantic_timeout_ms: u64,
    pub remote_timeout_ms: u64,
    pub semantic_enabled: bool,
    pub remote_enabled: bool,
}

impl Default for SentimentConfig {
    fn default() -> Self {
        Self {
            escalation_threshold: crate::SENTIMENT_ESCALATION_THRESHOLD,
            ambiguity_margin: crate::SENTIMENT_AMBIGUITY_MARGIN,
            remote_threshold: crate::SENTIMENT_REMOTE_THRESHOLD,
            semantic_timeout_ms: crate::SEMANTIC_TIER_TIMEOUT_MS,
            remote_timeout_ms: crate::REMOTE_TIER_TIMEOUT_MS,
            semantic_enabled: true,
            remote_enabled: true,
        }
    }
}

impl SentimentConfig {
    pub fn validate(&self) -> Result<()> {
        check_unit("escalation_threshold", self.escalation_threshold)?;
        check_unit("ambiguity_margin", self.ambiguity_margin)?;
        check_unit("remote_threshold", self.remote_threshold)?;
        if self.remote_threshold > self.escalation_threshold {
            return Err(HandoffError::InvalidConfig(format!(
                "remote_threshold ({}) must not exceed escalation_threshold ({})",
                self.remote_threshold, self.escalation_threshold
            )));
        }
        if self.semantic_timeout_ms == 0 || self.remote_timeout_ms == 0 {
            return Err(HandoffError::InvalidConfig(
                "tier timeouts must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Failure-pattern evaluator settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FailureConfig {
    /// Consecutive failures needed to trigger
    pub streak_threshold: u32,
    pub question_similarity: f64,
    pub loop_similarity: f64,
}

impl Default for FailureConfig {
    fn default() -> Self {
        Self {
            streak_threshold: crate::FAILURE_STREAK_THRESHOLD,
            question_similarity: crate::REPEATED_QUESTION_SIMILARITY,
            loop_similarity: crate::AGENT_LOOP_SIMILARITY,
        }
    }
}

impl FailureConfig {
    pub fn validate(&self) -> Result<()> {
        if self.streak_threshold == 0 {
            return Err(HandoffError::InvalidConfig(
                "streak_threshold must be at least 1".to_string(),
            ));
        }
        check_unit("question_similarity", self.question_similarity)?;
        check_unit("loop_similarity", self.loop_similarity)?;
        Ok(())
    }
}

/// Keyword evaluator settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeywordConfig {
    /// When set, replaces the default lists entirely
    pub custom_keywords: Option<HashMap<KeywordCategory, Vec<String>>>,
    pub case_sensitive: bool,
}

/// Degradation tracker settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DegradationConfig {
    pub window_size: usize,
    pub threshold: f64,
}

impl Default for DegradationConfig {
    fn default() -> Self {
        Self {
            window_size: crate::DEGRADATION_WINDOW_SIZE,
            threshold: crate::DEGRADATION_THRESHOLD,
        }
    }
}

impl DegradationConfig {
    pub fn validate(&self) -> Result<()> {
        if self.window_size < 2 {
            return Err(HandoffError::InvalidConfig(format!(
                "window_size must be at least 2, got {}",
                self.window_size
            )));
        }
        check_unit("degradation threshold", self.threshold)?;
        Ok(())
    }
}

/// Complete engine configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub sentiment: SentimentConfig,
    pub failure: FailureConfig,
    pub keywords: KeywordConfig,
    pub degradation: DegradationConfig,
}

impl EngineConfig {
    /// Parse from JSON and validate
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.sentiment.validate()?;
        self.failure.validate()?;
        self.degradation.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_remote_threshold_above_escalation_rejected() {
        let config = SentimentConfig {
            remote_threshold: 0.5,
            escalation_threshold: 0.3,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(HandoffError::InvalidConfig(_))));
    }

    #[test]
    fn test_out_of_range_threshold_rejected() {
        let config = SentimentConfig {
            escalation_threshold: 1.4,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(HandoffError::ThresholdOutOfRange { name: "escalation_threshold", .. })
        ));
    }

    #[test]
    fn test_zero_streak_rejected() {
        let config = FailureConfig {
            streak_threshold: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_window_too_small_rejected() {
        let config = DegradationConfig {
            window_size: 1,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_json_partial() {
        let config = EngineConfig::from_json_str(
            r#"{"sentiment": {"escalation_threshold": 0.4}, "keywords": {"case_sensitive": true}}"#,
        )
        .unwrap();
        assert_eq!(config.sentiment.escalation_threshold, 0.4);
        assert_eq!(config.sentiment.remote_threshold, crate::SENTIMENT_REMOTE_THRESHOLD);
        assert!(config.keywords.case_sensitive);
        assert_eq!(config.degradation.window_size, 5);
    }

    #[test]
    fn test_from_json_custom_keywords() {
        let config = EngineConfig::from_json_str(
            r#"{"keywords": {"custom_keywords": {"legal": ["subpoena"]}}}"#,
        )
        .unwrap();
        let custom = config.keywords.custom_keywords.unwrap();
        assert_eq!(custom[&KeywordCategory::Legal], vec!["subpoena".to_string()]);
    }

    #[test]
    fn test_from_json_invalid_rejected() {
        assert!(matches!(
            EngineConfig::from_json_str(r#"{"degradation": {"threshold": 2.0}}"#),
            Err(HandoffError::ThresholdOutOfRange { .. })
        ));
        assert!(matches!(
            EngineConfig::from_json_str("not json"),
            Err(HandoffError::Parse(_))
        ));
    }
}
