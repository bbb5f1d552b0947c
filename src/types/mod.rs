//! Core types for the handoff engine

mod turn;
mod signals;
mod rule;
mod sentiment;
mod reason;
mod decision;

pub use turn::{Turn, Speaker, Context, timeline};
pub use signals::{SignalResult, SignalKind, Priority};
pub(crate) use signals::clamp_unit;
pub use rule::{Rule, Condition, CompoundCondition, ConditionNode, Operator, LogicalOperator};
pub use sentiment::{
    SentimentResult, SentimentTier, SentimentLabel, TierVerdict, TierOutcome, TierAttempt,
    RuleTierBreakdown,
};
pub use reason::ReasonCode;
pub use decision::HandoffDecision;
