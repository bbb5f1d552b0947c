//! Decision aggregator: the engine's single entry point
//!
//! 1. Run every enabled signal evaluator (isolated; faults become quiet signals)
//! 2. Resolve sentiment through the tiered estimator, feed the tracker if given
//! 3. Winner = highest priority, then highest confidence, then registration order
//! 4. No winner but sentiment says escalate → synthesized SENTIMENT signal
//! 5. Emit the HandoffDecision

use std::collections::HashMap;
use std::future::Future;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, info, warn};
use crate::config::{EngineConfig, KeywordConfig, SentimentConfig};
use crate::core::degradation::DegradationTracker;
use crate::core::explicit_request::ExplicitRequestEvaluator;
use crate::core::failure_pattern::FailurePatternEvaluator;
use crate::core::keyword::{KeywordCategory, KeywordEvaluator};
use crate::core::rule_engine::{RuleBasedEvaluator, RuleEngine};
use crate::core::sentiment::{SentimentScorer, TieredSentimentEstimator};
use crate::core::signal::{Evaluator, SignalEvaluator};
use crate::error::Result;
use crate::types::{
    Context, HandoffDecision, Priority, Rule, SentimentResult, SignalKind, SignalResult, Turn,
};

#[derive(Debug)]
struct Registered {
    evaluator: Evaluator,
    enabled: bool,
}

/// Combines every signal and the sentiment estimate into one decision
#[derive(Debug)]
pub struct DecisionAggregator {
    evaluators: Vec<Registered>,
    rules: Arc<RuleEngine>,
    estimator: TieredSentimentEstimator,
    config: EngineConfig,
}

impl Default for DecisionAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl DecisionAggregator {
    /// Built-in evaluators with default settings, no rules, rule-tier sentiment only
    pub fn new() -> Self {
        let rules = Arc::new(RuleEngine::new());
        Self {
            evaluators: Self::builtin(
                ExplicitRequestEvaluator::new(),
                FailurePatternEvaluator::new(),
                KeywordEvaluator::new(),
                &rules,
            ),
            rules,
            estimator: TieredSentimentEstimator::new(),
            config: EngineConfig::default(),
        }
    }

    /// Validate the configuration and build every component from it
    pub fn with_config(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let rules = Arc::new(RuleEngine::new());
        Ok(Self {
            evaluators: Self::builtin(
                ExplicitRequestEvaluator::new(),
                FailurePatternEvaluator::with_config(config.failure.clone())?,
                KeywordEvaluator::with_config(&config.keywords)?,
                &rules,
            ),
            rules,
            estimator: TieredSentimentEstimator::with_config(config.sentiment.clone())?,
            config,
        })
    }

    fn builtin(
        explicit: ExplicitRequestEvaluator,
        failure: FailurePatternEvaluator,
        keyword: KeywordEvaluator,
        rules: &Arc<RuleEngine>,
    ) -> Vec<Registered> {
        [
            Evaluator::ExplicitRequest(explicit),
            Evaluator::FailurePattern(failure),
            Evaluator::Keyword(keyword),
            Evaluator::RuleBased(RuleBasedEvaluator::new(Arc::clone(rules))),
        ]
        .into_iter()
        .map(|evaluator| Registered {
            evaluator,
            enabled: true,
        })
        .collect()
    }

    // =========================================================================
    // Decision
    // =========================================================================

    /// Decide for one turn without degradation tracking
    pub async fn decide(
        &self,
        conversation: &[Turn],
        current: &Turn,
        context: &Context,
    ) -> HandoffDecision {
        self.decide_inner(conversation, current, context, None, std::future::pending::<()>())
            .await
    }

    /// Decide and feed the conversation's tracker exactly once
    pub async fn decide_tracked(
        &self,
        conversation: &[Turn],
        current: &Turn,
        context: &Context,
        tracker: &mut DegradationTracker,
    ) -> HandoffDecision {
        self.decide_inner(
            conversation,
            current,
            context,
            Some(tracker),
            std::future::pending::<()>(),
        )
        .await
    }

    /// Like [`decide_tracked`](Self::decide_tracked); `cancel` abandons a
    /// pending remote sentiment call in favour of the lower-tier result.
    pub async fn decide_with_cancel<C>(
        &self,
        conversation: &[Turn],
        current: &Turn,
        context: &Context,
        tracker: Option<&mut DegradationTracker>,
        cancel: C,
    ) -> HandoffDecision
    where
        C: Future<Output = ()>,
    {
        self.decide_inner(conversation, current, context, tracker, cancel).await
    }

    async fn decide_inner<C>(
        &self,
        conversation: &[Turn],
        current: &Turn,
        context: &Context,
        tracker: Option<&mut DegradationTracker>,
        cancel: C,
    ) -> HandoffDecision
    where
        C: Future<Output = ()>,
    {
        let signals = self.run_evaluators(conversation, current, context);

        // Sentiment describes the user; agent and system turns stay neutral
        let mut sentiment = if current.is_user() {
            self.estimator.estimate_with_cancel(&current.text, cancel).await
        } else {
            SentimentResult::neutral()
        };

        // Only a turn that fed the tracker can report degradation
        let mut trend = None;
        if let Some(tracker) = tracker.filter(|_| current.is_user()) {
            tracker.track(sentiment.score);
            sentiment.degradation_detected = tracker.is_degrading();
            trend = Some(tracker.trend());
        }

        let winner = select_winner(&signals)
            .cloned()
            .or_else(|| synthesize_sentiment_signal(&sentiment, trend));

        let decision = HandoffDecision::new(winner, sentiment, signals);
        if decision.should_handoff {
            info!(
                reason_code = decision.reason_code.code(),
                priority = %decision.priority,
                sentiment = decision.sentiment.score,
                "handoff recommended"
            );
        } else {
            debug!(sentiment = decision.sentiment.score, "no handoff");
        }
        decision
    }

    /// Every enabled evaluator, in registration order; faults become quiet signals
    fn run_evaluators(
        &self,
        conversation: &[Turn],
        current: &Turn,
        context: &Context,
    ) -> Vec<SignalResult> {
        self.evaluators
            .iter()
            .filter(|r| r.enabled)
            .map(|r| {
                let evaluator = &r.evaluator;
                let outcome = catch_unwind(AssertUnwindSafe(|| {
                    evaluator.evaluate(conversation, current, context)
                }));
                match outcome {
                    Ok(Ok(signal)) => signal,
                    Ok(Err(e)) => {
                        warn!(evaluator = evaluator.name(), error = %e, "evaluator failed, treating as not triggered");
                        SignalResult::quiet(evaluator.kind(), evaluator.priority())
                    }
                    Err(_) => {
                        warn!(evaluator = evaluator.name(), "evaluator panicked, treating as not triggered");
                        SignalResult::quiet(evaluator.kind(), evaluator.priority())
                    }
                }
            })
            .collect()
    }

    // =========================================================================
    // Configuration
    // =========================================================================

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn estimator(&self) -> &TieredSentimentEstimator {
        &self.estimator
    }

    /// Shared rule engine; rules added through it apply to later decisions
    pub fn rule_engine(&self) -> Arc<RuleEngine> {
        Arc::clone(&self.rules)
    }

    pub fn add_rule(&self, rule: Rule) -> Result<String> {
        self.rules.add_rule(rule)
    }

    pub fn remove_rule(&self, id: &str) -> bool {
        self.rules.remove_rule(id)
    }

    pub fn list_rules(&self) -> Vec<Rule> {
        self.rules.list_rules()
    }

    /// Fresh tracker sized by the degradation config
    pub fn new_tracker(&self) -> DegradationTracker {
        DegradationTracker::with_config(&self.config.degradation).unwrap_or_default()
    }

    /// Replace the keyword lists outright
    pub fn set_keywords(
        &mut self,
        keywords: HashMap<KeywordCategory, Vec<String>>,
        case_sensitive: bool,
    ) -> Result<()> {
        self.set_keyword_config(KeywordConfig {
            custom_keywords: Some(keywords),
            case_sensitive,
        })
    }

    pub fn set_keyword_config(&mut self, config: KeywordConfig) -> Result<()> {
        let evaluator = KeywordEvaluator::with_config(&config)?;
        self.replace_builtin(Evaluator::Keyword(evaluator));
        self.config.keywords = config;
        Ok(())
    }

    pub fn set_failure_threshold(&mut self, threshold: u32) -> Result<()> {
        let mut failure = self.config.failure.clone();
        failure.streak_threshold = threshold;
        let evaluator = FailurePatternEvaluator::with_config(failure.clone())?;
        self.replace_builtin(Evaluator::FailurePattern(evaluator));
        self.config.failure = failure;
        Ok(())
    }

    pub fn set_sentiment_config(&mut self, config: SentimentConfig) -> Result<()> {
        self.estimator.set_config(config.clone())?;
        self.config.sentiment = config;
        Ok(())
    }

    pub fn set_semantic_tier(&mut self, scorer: Option<Arc<dyn SentimentScorer>>) {
        self.estimator.set_semantic_tier(scorer);
    }

    pub fn set_remote_tier(&mut self, scorer: Option<Arc<dyn SentimentScorer>>) {
        self.estimator.set_remote_tier(scorer);
    }

    /// Enable or disable every evaluator of a kind; true iff one exists
    pub fn set_evaluator_enabled(&mut self, kind: SignalKind, enabled: bool) -> bool {
        let mut found = false;
        for registered in self.evaluators.iter_mut().filter(|r| r.evaluator.kind() == kind) {
            registered.enabled = enabled;
            found = true;
        }
        found
    }

    /// Append a caller-defined evaluator after the built-ins
    pub fn register_evaluator(&mut self, evaluator: Box<dyn SignalEvaluator>) {
        debug!(evaluator = evaluator.name(), "custom evaluator registered");
        self.evaluators.push(Registered {
            evaluator: Evaluator::Custom(evaluator),
            enabled: true,
        });
    }

    /// Names of registered evaluators with their enabled flag
    pub fn evaluators(&self) -> Vec<(String, bool)> {
        self.evaluators
            .iter()
            .map(|r| (r.evaluator.name().to_string(), r.enabled))
            .collect()
    }

    /// Swap a built-in in place, keeping its slot and enabled flag
    fn replace_builtin(&mut self, evaluator: Evaluator) {
        let kind = evaluator.kind();
        if let Some(slot) = self
            .evaluators
            .iter_mut()
            .find(|r| !matches!(r.evaluator, Evaluator::Custom(_)) && r.evaluator.kind() == kind)
        {
            slot.evaluator = evaluator;
        }
    }
}

/// Highest priority, then highest confidence; the earliest keeps a tie
pub fn select_winner(signals: &[SignalResult]) -> Option<&SignalResult> {
    let mut winner: Option<&SignalResult> = None;
    for signal in signals.iter().filter(|s| s.triggered) {
        let better = match winner {
            None => true,
            Some(w) => {
                signal.priority > w.priority
                    || (signal.priority == w.priority && signal.confidence > w.confidence)
            }
        };
        if better {
            winner = Some(signal);
        }
    }
    winner
}

/// Sentiment-derived winner when no evaluator fired
fn synthesize_sentiment_signal(
    sentiment: &SentimentResult,
    trend: Option<f64>,
) -> Option<SignalResult> {
    if sentiment.degradation_detected {
        let trend = trend.unwrap_or_default();
        return Some(
            SignalResult::triggered(
                SignalKind::SentimentDegradation,
                sentiment.confidence,
                Priority::High,
                format!("Sentiment degrading across recent turns (trend {:.2})", trend),
            )
            .with_detail("trend", trend)
            .with_detail("score", sentiment.score)
            .with_detail("tier", sentiment.tier_used.to_string()),
        );
    }
    if sentiment.should_escalate {
        return Some(
            SignalResult::triggered(
                SignalKind::Sentiment,
                sentiment.confidence,
                Priority::Medium,
                format!(
                    "Negative sentiment {:.2} ({} tier)",
                    sentiment.score, sentiment.tier_used
                ),
            )
            .with_detail("score", sentiment.score)
            .with_detail("frustration", sentiment.frustration)
            .with_detail("tier", sentiment.tier_used.to_string()),
        );
    }
    None
}

// =============================================================================
// TESTS
// =============================================================================
