//! Tiered sentiment estimator
//!
//! State machine:
//! - RULE: always runs
//! - RULE → SEMANTIC: rule score within the ambiguity margin of the threshold
//! - SEMANTIC → REMOTE: semantic score below the stricter remote threshold
//!
//! A tier that is unavailable, fails, times out, returns garbage or is
//! cancelled leaves the best completed lower tier in place. Both the
//! semantic and remote calls are time-bounded. Nothing here
//! returns an error to the caller.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use async_trait::async_trait;
use futures_util::FutureExt;
use tracing::{debug, warn};
use crate::config::SentimentConfig;
use crate::core::sentiment_rules::RuleTierScorer;
use crate::error::{Result, ScorerError};
use crate::types::{
    clamp_unit, SentimentResult, SentimentTier, TierAttempt, TierOutcome, TierVerdict,
};

/// Float slack for the "exactly on the boundary" case
const BOUNDARY_EPSILON: f64 = 1e-9;

/// Pluggable semantic / remote scoring capability
#[async_trait]
pub trait SentimentScorer: Send + Sync {
    fn name(&self) -> &str;

    /// False when the backend is not installed or not initialized
    fn is_available(&self) -> bool {
        true
    }

    async fn score(&self, text: &str) -> std::result::Result<TierVerdict, ScorerError>;
}

/// Best answer so far
#[derive(Debug, Clone, Copy)]
struct Resolved {
    tier: SentimentTier,
    score: f64,
    confidence: f64,
    frustration: Option<f64>,
}

impl Resolved {
    fn from_verdict(tier: SentimentTier, verdict: &TierVerdict) -> Self {
        Self {
            tier,
            score: verdict.to_score(),
            confidence: verdict.confidence,
            frustration: verdict.frustration,
        }
    }
}

/// Runs the rule tier and escalates through semantic and remote tiers
pub struct TieredSentimentEstimator {
    config: SentimentConfig,
    rule_tier: RuleTierScorer,
    semantic: Option<Arc<dyn SentimentScorer>>,
    remote: Option<Arc<dyn SentimentScorer>>,
}

impl Default for TieredSentimentEstimator {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TieredSentimentEstimator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TieredSentimentEstimator")
            .field("config", &self.config)
            .field("semantic", &self.semantic.as_ref().map(|s| s.name().to_string()))
            .field("remote", &self.remote.as_ref().map(|s| s.name().to_string()))
            .finish()
    }
}

impl TieredSentimentEstimator {
    /// Rule tier only, default thresholds
    pub fn new() -> Self {
        Self {
            config: SentimentConfig::default(),
            rule_tier: RuleTierScorer::new(),
            semantic: None,
            remote: None,
        }
    }

    pub fn with_config(config: SentimentConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            ..Self::new()
        })
    }

    pub fn with_semantic(mut self, scorer: Arc<dyn SentimentScorer>) -> Self {
        self.semantic = Some(scorer);
        self
    }

    pub fn with_remote(mut self, scorer: Arc<dyn SentimentScorer>) -> Self {
        self.remote = Some(scorer);
        self
    }

    pub fn config(&self) -> &SentimentConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: SentimentConfig) -> Result<()> {
        config.validate()?;
        self.config = config;
        Ok(())
    }

    pub fn set_semantic_tier(&mut self, scorer: Option<Arc<dyn SentimentScorer>>) {
        self.semantic = scorer;
    }

    pub fn set_remote_tier(&mut self, scorer: Option<Arc<dyn SentimentScorer>>) {
        self.remote = scorer;
    }

    /// True when the rule score sits close enough to the threshold to be ambiguous
    pub fn is_ambiguous(&self, score: f64) -> bool {
        (score - self.config.escalation_threshold).abs()
            <= self.config.ambiguity_margin + BOUNDARY_EPSILON
    }

    pub async fn estimate(&self, text: &str) -> SentimentResult {
        self.estimate_with_cancel(text, std::future::pending::<()>()).await
    }

    /// Like [`estimate`](Self::estimate); if `cancel` resolves while the
    /// remote tier is pending, the semantic result stands.
    pub async fn estimate_with_cancel<C>(&self, text: &str, cancel: C) -> SentimentResult
    where
        C: Future<Output = ()>,
    {
        let started = Instant::now();
        let rule = self.rule_tier.score(text);

        if text.trim().is_empty() {
            return SentimentResult {
                elapsed: started.elapsed(),
                ..SentimentResult::neutral()
            };
        }

        let mut attempts = vec![TierAttempt {
            tier: SentimentTier::Rule,
            outcome: TierOutcome::Completed,
            score: Some(rule.score),
        }];
        let mut best = Resolved {
            tier: SentimentTier::Rule,
            score: rule.score,
            confidence: rule.confidence,
            frustration: None,
        };
        let mut escalated = false;

        if self.is_ambiguous(rule.score) {
            escalated = true;
            debug!(score = rule.score, "rule tier ambiguous, escalating to semantic");

            match self.run_semantic(text).await {
                Ok(verdict) => {
                    best = Resolved::from_verdict(SentimentTier::Semantic, &verdict);
                    attempts.push(completed(SentimentTier::Semantic, best.score));

                    if best.score < self.config.remote_threshold {
                        debug!(score = best.score, "semantic tier below remote threshold, escalating to remote");
                        match self.run_remote(text, cancel).await {
                            Ok(verdict) => {
                                best = Resolved::from_verdict(SentimentTier::Remote, &verdict);
                                attempts.push(completed(SentimentTier::Remote, best.score));
                            }
                            Err(outcome) => attempts.push(TierAttempt {
                                tier: SentimentTier::Remote,
                                outcome,
                                score: None,
                            }),
                        }
                    }
                }
                Err(outcome) => attempts.push(TierAttempt {
                    tier: SentimentTier::Semantic,
                    outcome,
                    score: None,
                }),
            }
        }

        let score = clamp_unit(best.score);
        SentimentResult {
            score,
            frustration: clamp_unit(best.frustration.unwrap_or(1.0 - score)),
            confidence: clamp_unit(best.confidence),
            tier_used: best.tier,
            escalated,
            degradation_detected: false,
            should_escalate: score < self.config.escalation_threshold,
            elapsed: started.elapsed(),
            breakdown: rule.breakdown,
            attempts,
        }
    }

    async fn run_semantic(&self, text: &str) -> std::result::Result<TierVerdict, TierOutcome> {
        let scorer = match &self.semantic {
            Some(s) if self.config.semantic_enabled && s.is_available() => s,
            _ => {
                debug!("semantic tier unavailable, keeping rule tier");
                return Err(TierOutcome::Unavailable);
            }
        };
        let timeout_ms = self.config.semantic_timeout_ms;
        let result = tokio::time::timeout(
            Duration::from_millis(timeout_ms),
            call_scorer(scorer.as_ref(), text),
        )
        .await
        .unwrap_or(Err(ScorerError::TimedOut(timeout_ms)));
        settle(SentimentTier::Semantic, scorer.name(), result)
    }

    async fn run_remote<C>(&self, text: &str, cancel: C) -> std::result::Result<TierVerdict, TierOutcome>
    where
        C: Future<Output = ()>,
    {
        let scorer = match &self.remote {
            Some(s) if self.config.remote_enabled && s.is_available() => s,
            _ => {
                debug!("remote tier unavailable, keeping semantic tier");
                return Err(TierOutcome::Unavailable);
            }
        };

        let timeout_ms = self.config.remote_timeout_ms;
        let call = tokio::time::timeout(
            Duration::from_millis(timeout_ms),
            call_scorer(scorer.as_ref(), text),
        );
        tokio::pin!(cancel);

        let result = tokio::select! {
            biased;
            _ = &mut cancel => {
                warn!(scorer = scorer.name(), "remote tier cancelled, falling back");
                return Err(TierOutcome::Cancelled);
            }
            r = call => match r {
                Ok(inner) => inner,
                Err(_) => Err(ScorerError::TimedOut(timeout_ms)),
            },
        };
        settle(SentimentTier::Remote, scorer.name(), result)
    }
}

/// Call a scorer, turning a panic into a backend error
async fn call_scorer(
    scorer: &dyn SentimentScorer,
    text: &str,
) -> std::result::Result<TierVerdict, ScorerError> {
    match AssertUnwindSafe(scorer.score(text)).catch_unwind().await {
        Ok(result) => result,
        Err(_) => Err(ScorerError::Backend("scorer panicked".to_string())),
    }
}

/// Validate a tier result and log any fallback
fn settle(
    tier: SentimentTier,
    name: &str,
    result: std::result::Result<TierVerdict, ScorerError>,
) -> std::result::Result<TierVerdict, TierOutcome> {
    let error = match result {
        Ok(verdict) if verdict.is_valid() => return Ok(verdict),
        Ok(verdict) => ScorerError::InvalidPayload(format!(
            "confidence {} / frustration {:?} outside [0, 1]",
            verdict.confidence, verdict.frustration
        )),
        Err(e) => e,
    };
    warn!(%tier, scorer = name, error = %error, "sentiment tier failed, falling back");
    Err(match error {
        ScorerError::Unavailable => TierOutcome::Unavailable,
        ScorerError::TimedOut(_) => TierOutcome::TimedOut,
        other => TierOutcome::Failed(other.to_string()),
    })
}

fn completed(tier: SentimentTier, score: f64) -> TierAttempt {
    TierAttempt {
        tier,
        outcome: TierOutcome::Completed,
        score: Some(score),
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SentimentLabel;

    struct Fixed(TierVerdict);

    #[async_trait]
    impl SentimentScorer for Fixed {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn score(&self, _text: &str) -> std::result::Result<TierVerdict, ScorerError> {
            Ok(self.0.clone())
        }
    }

    struct NotInstalled;

    #[async_trait]
    impl SentimentScorer for NotInstalled {
        fn name(&self) -> &str {
            "not_installed"
        }

        fn is_available(&self) -> bool {
            false
        }

        async fn score(&self, _text: &str) -> std::result::Result<TierVerdict, ScorerError> {
            Err(ScorerError::Unavailable)
        }
    }

    fn negative(confidence: f64) -> Arc<dyn SentimentScorer> {
        Arc::new(Fixed(TierVerdict::new(SentimentLabel::Negative, confidence)))
    }

    #[tokio::test]
    async fn test_clear_text_stays_on_rule_tier() {
        let estimator = TieredSentimentEstimator::new().with_semantic(negative(0.9));
        let result = estimator.estimate("thanks, that was perfect").await;
        assert_eq!(result.tier_used, SentimentTier::Rule);
        assert!(!result.escalated);
        assert!(!result.should_escalate);
        assert_eq!(result.attempts.len(), 1);
    }

    #[tokio::test]
    async fn test_boundary_score_escalates() {
        // "this is annoying" scores 0.35, 0.05 from the threshold
        let estimator = TieredSentimentEstimator::with_config(SentimentConfig {
            escalation_threshold: 0.35,
            ..Default::default()
        })
        .unwrap()
        .with_semantic(Arc::new(Fixed(TierVerdict::new(SentimentLabel::Neutral, 0.7))));

        assert!(estimator.is_ambiguous(0.35));
        let result = estimator.estimate("this is annoying").await;
        assert!(result.escalated);
        assert_eq!(result.tier_used, SentimentTier::Semantic);
        assert_eq!(result.score, 0.5);
    }

    #[tokio::test]
    async fn test_semantic_unavailable_keeps_rule() {
        let estimator = TieredSentimentEstimator::new().with_semantic(Arc::new(NotInstalled));
        let result = estimator.estimate("I NEED HELP NOW!!!").await;
        assert!(result.escalated);
        assert_eq!(result.tier_used, SentimentTier::Rule);
        assert!((result.score - 0.35).abs() < 1e-9);
        assert_eq!(result.attempts[1].outcome, TierOutcome::Unavailable);
    }

    #[tokio::test]
    async fn test_no_semantic_installed_keeps_rule() {
        let result = TieredSentimentEstimator::new().estimate("I NEED HELP NOW!!!").await;
        assert_eq!(result.tier_used, SentimentTier::Rule);
        assert_eq!(result.attempts[1].outcome, TierOutcome::Unavailable);
    }

    #[tokio::test]
    async fn test_semantic_low_goes_remote() {
        let estimator = TieredSentimentEstimator::new()
            .with_semantic(negative(0.8))
            .with_remote(negative(0.6));
        let result = estimator.estimate("I NEED HELP NOW!!!").await;
        assert_eq!(result.tier_used, SentimentTier::Remote);
        assert!((result.score - 0.2).abs() < 1e-9);
        assert_eq!(result.attempts.len(), 3);
    }

    #[tokio::test]
    async fn test_disabled_semantic_tier() {
        let estimator = TieredSentimentEstimator::with_config(SentimentConfig {
            semantic_enabled: false,
            ..Default::default()
        })
        .unwrap()
        .with_semantic(negative(0.9));
        let result = estimator.estimate("I NEED HELP NOW!!!").await;
        assert_eq!(result.tier_used, SentimentTier::Rule);
    }

    #[tokio::test]
    async fn test_explicit_frustration_is_used() {
        let estimator = TieredSentimentEstimator::new().with_semantic(Arc::new(Fixed(
            TierVerdict::new(SentimentLabel::Neutral, 0.6).with_frustration(0.9),
        )));
        let result = estimator.estimate("I NEED HELP NOW!!!").await;
        assert_eq!(result.frustration, 0.9);
    }

    #[tokio::test]
    async fn test_frustration_defaults_to_inverse() {
        let result = TieredSentimentEstimator::new().estimate("this is terrible").await;
        assert!((result.frustration - (1.0 - result.score)).abs() < 1e-9);
        assert!(result.should_escalate);
    }

    #[tokio::test]
    async fn test_empty_text_is_neutral() {
        let result = TieredSentimentEstimator::new().estimate("").await;
        assert_eq!(result.score, 0.5);
        assert!(!result.should_escalate);
    }
}
