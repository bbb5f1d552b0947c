//! Core engines for the handoff decision path

pub mod condition;
pub mod rule_engine;
pub mod signal;
pub mod explicit_request;
pub mod failure_pattern;
pub mod keyword;
pub mod sentiment_rules;
pub mod sentiment;
pub mod degradation;
pub mod aggregator;

pub use condition::{evaluate_condition, CompiledCondition, EvalContext};
pub use rule_engine::{RuleBasedEvaluator, RuleEngine};
pub use signal::{Evaluator, SignalEvaluator};
pub use explicit_request::{Detection, ExplicitRequestEvaluator};
pub use failure_pattern::{jaccard_similarity, FailureCause, FailurePatternEvaluator, FailureStreak};
pub use keyword::{KeywordCategory, KeywordEvaluator};
pub use sentiment_rules::{RuleTierScore, RuleTierScorer};
pub use sentiment::{SentimentScorer, TieredSentimentEstimator};
pub use degradation::{ConversationTrackers, DegradationTracker};
pub use aggregator::{select_winner, DecisionAggregator};
