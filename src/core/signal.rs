//! Signal evaluator capability and the registered variant set

use crate::core::explicit_request::ExplicitRequestEvaluator;
use crate::core::failure_pattern::FailurePatternEvaluator;
use crate::core::keyword::KeywordEvaluator;
use crate::core::rule_engine::RuleBasedEvaluator;
use crate::error::EvaluatorError;
use crate::types::{Context, Priority, SignalKind, SignalResult, Turn};

/// One independent handoff detector
///
/// Implementations must be pure with respect to the conversation: no
/// evaluator may depend on another evaluator's result.
pub trait SignalEvaluator: Send + Sync {
    /// Stable name used in logs
    fn name(&self) -> &str;

    fn kind(&self) -> SignalKind;

    /// Priority this evaluator reports when it fires
    fn priority(&self) -> Priority;

    fn evaluate(
        &self,
        conversation: &[Turn],
        current: &Turn,
        context: &Context,
    ) -> Result<SignalResult, EvaluatorError>;
}

/// The built-in evaluators plus a slot for caller-defined ones
pub enum Evaluator {
    ExplicitRequest(ExplicitRequestEvaluator),
    FailurePattern(FailurePatternEvaluator),
    Keyword(KeywordEvaluator),
    RuleBased(RuleBasedEvaluator),
    Custom(Box<dyn SignalEvaluator>),
}

impl Evaluator {
    pub fn as_signal_evaluator(&self) -> &dyn SignalEvaluator {
        match self {
            Evaluator::ExplicitRequest(e) => e,
            Evaluator::FailurePattern(e) => e,
            Evaluator::Keyword(e) => e,
            Evaluator::RuleBased(e) => e,
            Evaluator::Custom(e) => e.as_ref(),
        }
    }
}

impl SignalEvaluator for Evaluator {
    fn name(&self) -> &str {
        self.as_signal_evaluator().name()
    }

    fn kind(&self) -> SignalKind {
        self.as_signal_evaluator().kind()
    }

    fn priority(&self) -> Priority {
        self.as_signal_evaluator().priority()
    }

    fn evaluate(
        &self,
        conversation: &[Turn],
        current: &Turn,
        context: &Context,
    ) -> Result<SignalResult, EvaluatorError> {
        self.as_signal_evaluator().evaluate(conversation, current, context)
    }
}

impl std::fmt::Debug for Evaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Evaluator")
            .field("name", &self.name())
            .field("kind", &self.kind())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variant_delegates_metadata() {
        let e = Evaluator::Keyword(KeywordEvaluator::new());
        assert_eq!(e.kind(), SignalKind::Keyword);
        assert_eq!(e.priority(), Priority::Immediate);
        assert_eq!(e.name(), "keyword");
    }

    #[test]
    fn test_variant_delegates_evaluate() {
        let e = Evaluator::ExplicitRequest(ExplicitRequestEvaluator::new());
        let result = e
            .evaluate(&[], &Turn::user("please transfer me"), &Context::new())
            .unwrap();
        assert!(result.triggered);
    }
}
