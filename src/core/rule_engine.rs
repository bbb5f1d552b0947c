//! Rule engine: named, prioritized condition trees
//!
//! Winner = highest priority among matching enabled rules; ties go to the
//! rule registered first. The rule list sits behind a read-write lock so
//! evaluations share it while add/remove take it exclusively.

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Instant;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;
use crate::core::condition::{CompiledCondition, EvalContext};
use crate::core::signal::SignalEvaluator;
use crate::error::{EvaluatorError, HandoffError, Result};
use crate::types::{Context, Priority, Rule, SignalKind, SignalResult, Turn};
use crate::RULE_MATCH_CONFIDENCE;

#[derive(Debug)]
struct RegisteredRule {
    rule: Rule,
    condition: CompiledCondition,
}

/// Thread-safe rule registry and evaluator
#[derive(Debug, Default)]
pub struct RuleEngine {
    rules: RwLock<Vec<RegisteredRule>>,
}

impl RuleEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an engine from a rule list, failing on the first bad rule
    pub fn with_rules(rules: impl IntoIterator<Item = Rule>) -> Result<Self> {
        let engine = Self::new();
        for rule in rules {
            engine.add_rule(rule)?;
        }
        Ok(engine)
    }

    /// Register a rule; returns its id (generated when empty)
    pub fn add_rule(&self, mut rule: Rule) -> Result<String> {
        let condition = CompiledCondition::compile(&rule.condition)?;
        if rule.id.is_empty() {
            rule.id = Uuid::new_v4().to_string();
        }

        let mut rules = self.rules.write().unwrap_or_else(PoisonError::into_inner);
        if rules.iter().any(|r| r.rule.id == rule.id) {
            return Err(HandoffError::DuplicateRule(rule.id));
        }
        let id = rule.id.clone();
        debug!(rule_id = %id, name = %rule.name, priority = %rule.priority, "rule added");
        rules.push(RegisteredRule { rule, condition });
        Ok(id)
    }

    /// True iff a rule with this id existed
    pub fn remove_rule(&self, id: &str) -> bool {
        let mut rules = self.rules.write().unwrap_or_else(PoisonError::into_inner);
        let before = rules.len();
        rules.retain(|r| r.rule.id != id);
        let removed = rules.len() != before;
        if removed {
            debug!(rule_id = %id, "rule removed");
        }
        removed
    }

    /// Enable or disable in place; true iff found
    pub fn set_enabled(&self, id: &str, enabled: bool) -> bool {
        let mut rules = self.rules.write().unwrap_or_else(PoisonError::into_inner);
        match rules.iter_mut().find(|r| r.rule.id == id) {
            Some(r) => {
                r.rule.enabled = enabled;
                true
            }
            None => false,
        }
    }

    /// Snapshot of all rules in registration order
    pub fn list_rules(&self) -> Vec<Rule> {
        let rules = self.rules.read().unwrap_or_else(PoisonError::into_inner);
        rules.iter().map(|r| r.rule.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.rules.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Evaluate every enabled rule against the turn
    pub fn evaluate(&self, turn: &Turn, ctx: &EvalContext<'_>) -> SignalResult {
        let started = Instant::now();
        let rules = self.rules.read().unwrap_or_else(PoisonError::into_inner);

        let mut matched: Vec<&Rule> = Vec::new();
        let mut winner: Option<&Rule> = None;
        for registered in rules.iter().filter(|r| r.rule.enabled) {
            if !registered.condition.evaluate(turn, ctx) {
                continue;
            }
            let rule = &registered.rule;
            matched.push(rule);
            // Strictly greater: the earliest rule keeps a tie
            if winner.map_or(true, |w| rule.priority > w.priority) {
                winner = Some(rule);
            }
        }

        debug!(
            rules = rules.len(),
            matched = matched.len(),
            elapsed_us = started.elapsed().as_micros() as u64,
            "rules evaluated"
        );

        let Some(winner) = winner else {
            return SignalResult::quiet(SignalKind::RuleBased, Priority::Low);
        };

        let matched_rules: Vec<Value> = matched
            .iter()
            .map(|r| json!({"id": r.id, "name": r.name, "priority": r.priority}))
            .collect();

        SignalResult::triggered(
            SignalKind::RuleBased,
            RULE_MATCH_CONFIDENCE,
            winner.priority,
            format!("Rule '{}' matched", winner.name),
        )
        .with_detail("rule_id", winner.id.clone())
        .with_detail("rule_name", winner.name.clone())
        .with_detail("matched_rules", matched_rules)
    }
}

/// Rule engine exposed as a signal evaluator
#[derive(Debug, Clone, Default)]
pub struct RuleBasedEvaluator {
    engine: Arc<RuleEngine>,
}

impl RuleBasedEvaluator {
    pub fn new(engine: Arc<RuleEngine>) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &Arc<RuleEngine> {
        &self.engine
    }
}

impl SignalEvaluator for RuleBasedEvaluator {
    fn name(&self) -> &str {
        "rule_based"
    }

    fn kind(&self) -> SignalKind {
        SignalKind::RuleBased
    }

    /// Placeholder; a fired rule reports its own priority
    fn priority(&self) -> Priority {
        Priority::Medium
    }

    fn evaluate(
        &self,
        conversation: &[Turn],
        current: &Turn,
        context: &Context,
    ) -> std::result::Result<SignalResult, EvaluatorError> {
        let ctx = EvalContext::new(conversation, context);
        Ok(self.engine.evaluate(current, &ctx))
    }
}

// =============================================================================
// TESTS
// =============================================================================
