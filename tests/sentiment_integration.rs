//! Integration tests for the tiered sentiment estimator
//!
//! Tests the path: text → RULE → SEMANTIC → REMOTE with mock tiers

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use async_trait::async_trait;
use handoff::config::SentimentConfig;
use handoff::core::{DecisionAggregator, SentimentScorer, TieredSentimentEstimator};
use handoff::error::ScorerError;
use handoff::types::{Context, ReasonCode, SentimentLabel, SentimentTier, TierOutcome, TierVerdict, Turn};
use pretty_assertions::assert_eq;

/// "I NEED HELP NOW!!!" scores 0.35 at the rule tier, inside the ambiguity band
const AMBIGUOUS: &str = "I NEED HELP NOW!!!";

struct Scripted {
    verdict: TierVerdict,
    delay: Duration,
    calls: AtomicUsize,
}

impl Scripted {
    fn new(label: SentimentLabel, confidence: f64) -> Arc<Self> {
        Self::slow(label, confidence, Duration::ZERO)
    }

    fn slow(label: SentimentLabel, confidence: f64, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            verdict: TierVerdict::new(label, confidence),
            delay,
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl SentimentScorer for Scripted {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn score(&self, _text: &str) -> Result<TierVerdict, ScorerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(self.verdict.clone())
    }
}

struct Failing;

#[async_trait]
impl SentimentScorer for Failing {
    fn name(&self) -> &str {
        "failing"
    }

    async fn score(&self, _text: &str) -> Result<TierVerdict, ScorerError> {
        Err(ScorerError::Backend("503 from upstream".to_string()))
    }
}

struct Garbage;

#[async_trait]
impl SentimentScorer for Garbage {
    fn name(&self) -> &str {
        "garbage"
    }

    async fn score(&self, _text: &str) -> Result<TierVerdict, ScorerError> {
        Ok(TierVerdict::new(SentimentLabel::Negative, 7.5))
    }
}

struct Exploding;

#[async_trait]
impl SentimentScorer for Exploding {
    fn name(&self) -> &str {
        "exploding"
    }

    async fn score(&self, _text: &str) -> Result<TierVerdict, ScorerError> {
        panic!("model weights missing")
    }
}

fn semantic_very_negative() -> Arc<Scripted> {
    // 0.5 - 0.9/2 = 0.05, below the remote threshold
    Scripted::new(SentimentLabel::Negative, 0.9)
}

#[tokio::test]
async fn test_full_escalation_chain() {
    let semantic = semantic_very_negative();
    let remote = Scripted::new(SentimentLabel::Negative, 0.5);
    let estimator = TieredSentimentEstimator::new()
        .with_semantic(semantic.clone())
        .with_remote(remote.clone());

    let result = estimator.estimate(AMBIGUOUS).await;
    assert_eq!(result.tier_used, SentimentTier::Remote);
    assert!((result.score - 0.25).abs() < 1e-9);
    assert!(result.should_escalate);
    assert_eq!(semantic.calls.load(Ordering::SeqCst), 1);
    assert_eq!(remote.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_semantic_not_low_enough_skips_remote() {
    let remote = Scripted::new(SentimentLabel::Negative, 0.9);
    let estimator = TieredSentimentEstimator::new()
        .with_semantic(Scripted::new(SentimentLabel::Negative, 0.2))
        .with_remote(remote.clone());

    let result = estimator.estimate(AMBIGUOUS).await;
    assert_eq!(result.tier_used, SentimentTier::Semantic);
    assert!((result.score - 0.4).abs() < 1e-9);
    assert!(!result.should_escalate);
    assert_eq!(remote.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_remote_timeout_falls_back_to_semantic() {
    let estimator = TieredSentimentEstimator::with_config(SentimentConfig {
        remote_timeout_ms: 50,
        ..Default::default()
    })
    .unwrap()
    .with_semantic(semantic_very_negative())
    .with_remote(Scripted::slow(SentimentLabel::Positive, 1.0, Duration::from_secs(5)));

    let started = Instant::now();
    let result = estimator.estimate(AMBIGUOUS).await;
    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(result.tier_used, SentimentTier::Semantic);
    assert!((result.score - 0.05).abs() < 1e-9);
    assert_eq!(result.attempts.last().unwrap().outcome, TierOutcome::TimedOut);
}

#[tokio::test]
async fn test_semantic_timeout_falls_back_to_rule() {
    let remote = Scripted::new(SentimentLabel::Negative, 0.9);
    let estimator = TieredSentimentEstimator::with_config(SentimentConfig {
        semantic_timeout_ms: 50,
        ..Default::default()
    })
    .unwrap()
    .with_semantic(Scripted::slow(SentimentLabel::Negative, 0.9, Duration::from_secs(5)))
    .with_remote(remote.clone());

    let started = Instant::now();
    let result = estimator.estimate(AMBIGUOUS).await;
    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(result.tier_used, SentimentTier::Rule);
    assert!((result.score - 0.35).abs() < 1e-9);
    assert_eq!(result.attempts.last().unwrap().outcome, TierOutcome::TimedOut);
    assert_eq!(remote.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_remote_error_falls_back() {
    let estimator = TieredSentimentEstimator::new()
        .with_semantic(semantic_very_negative())
        .with_remote(Arc::new(Failing));
    let result = estimator.estimate(AMBIGUOUS).await;
    assert_eq!(result.tier_used, SentimentTier::Semantic);
    assert!(matches!(result.attempts.last().unwrap().outcome, TierOutcome::Failed(_)));
}

#[tokio::test]
async fn test_remote_invalid_payload_falls_back() {
    let estimator = TieredSentimentEstimator::new()
        .with_semantic(semantic_very_negative())
        .with_remote(Arc::new(Garbage));
    let result = estimator.estimate(AMBIGUOUS).await;
    assert_eq!(result.tier_used, SentimentTier::Semantic);
    assert!(result.score >= 0.0 && result.score <= 1.0);
}

#[tokio::test]
async fn test_semantic_panic_falls_back_to_rule() {
    let estimator = TieredSentimentEstimator::new().with_semantic(Arc::new(Exploding));
    let result = estimator.estimate(AMBIGUOUS).await;
    assert_eq!(result.tier_used, SentimentTier::Rule);
    assert!((result.score - 0.35).abs() < 1e-9);
}

#[tokio::test]
async fn test_cancellation_keeps_semantic_result() {
    let estimator = TieredSentimentEstimator::new()
        .with_semantic(semantic_very_negative())
        .with_remote(Scripted::slow(SentimentLabel::Positive, 1.0, Duration::from_millis(400)));

    let cancel = tokio::time::sleep(Duration::from_millis(20));
    let result = estimator.estimate_with_cancel(AMBIGUOUS, cancel).await;
    assert_eq!(result.tier_used, SentimentTier::Semantic);
    assert_eq!(result.attempts.last().unwrap().outcome, TierOutcome::Cancelled);
}

#[tokio::test]
async fn test_remote_disabled_by_config() {
    let remote = Scripted::new(SentimentLabel::Negative, 0.5);
    let estimator = TieredSentimentEstimator::with_config(SentimentConfig {
        remote_enabled: false,
        ..Default::default()
    })
    .unwrap()
    .with_semantic(semantic_very_negative())
    .with_remote(remote.clone());

    let result = estimator.estimate(AMBIGUOUS).await;
    assert_eq!(result.tier_used, SentimentTier::Semantic);
    assert_eq!(remote.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_score_always_in_unit_range() {
    let estimator = TieredSentimentEstimator::new();
    for text in [
        "",
        "!!!!!!!!!!!!!!!!!!!!",
        "TERRIBLE AWFUL HORRIBLE WORST USELESS GARBAGE!!! ??? !!!",
        "thanks thanks thanks thanks thanks thanks",
        "\u{1F620}\u{1F620}\u{1F620}",
    ] {
        let result = estimator.estimate(text).await;
        assert!((0.0..=1.0).contains(&result.score), "{:?} -> {}", text, result.score);
        assert!((0.0..=1.0).contains(&result.frustration));
    }
}

#[tokio::test]
async fn test_aggregator_uses_installed_tiers() {
    let mut aggregator = DecisionAggregator::new();
    aggregator.set_semantic_tier(Some(semantic_very_negative()));

    let decision = aggregator
        .decide(&[], &Turn::user(AMBIGUOUS), &Context::new())
        .await;
    assert_eq!(decision.sentiment.tier_used, SentimentTier::Semantic);
    assert!(decision.sentiment.should_escalate);
    assert_eq!(decision.reason_code, ReasonCode::H005_NEGATIVE_SENTIMENT);

    aggregator.set_semantic_tier(None);
    let decision = aggregator
        .decide(&[], &Turn::user(AMBIGUOUS), &Context::new())
        .await;
    assert_eq!(decision.sentiment.tier_used, SentimentTier::Rule);
    assert!(!decision.should_handoff);
}
