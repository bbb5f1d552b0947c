//! Integration tests for rules
//!
//! Tests the path: JSON rule → RuleEngine → aggregator → HandoffDecision

use handoff::core::{DecisionAggregator, EvalContext, RuleEngine};
use handoff::types::{Context, Priority, ReasonCode, Rule, Turn};
use handoff::HandoffError;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

fn rule_from_json(value: Value) -> Rule {
    serde_json::from_value(value).unwrap()
}

/// Rules written as JSON, the way hosts ship them
#[test]
fn test_json_rules_round_into_engine() {
    let rules: Vec<Rule> = serde_json::from_value(json!([
        {
            "id": "vip-billing",
            "name": "VIP billing issue",
            "priority": "HIGH",
            "condition": {
                "operator": "AND",
                "conditions": [
                    {"field": "context.tier", "operator": "==", "value": "gold"},
                    {"field": "message.content", "operator": "contains", "value": "invoice"}
                ]
            }
        },
        {
            "name": "long conversation",
            "condition": {"field": "conversation.length", "operator": ">=", "value": 10}
        }
    ]))
    .unwrap();

    let engine = RuleEngine::with_rules(rules).unwrap();
    let listed = engine.list_rules();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].id, "vip-billing");
    assert_eq!(listed[1].priority, Priority::Medium);
    assert!(listed[1].enabled);
    assert!(!listed[1].id.is_empty());
}

#[test]
fn test_nested_or_inside_and() {
    let engine = RuleEngine::new();
    engine
        .add_rule(rule_from_json(json!({
            "name": "angry about money",
            "priority": "HIGH",
            "condition": {
                "operator": "AND",
                "conditions": [
                    {"field": "message.speaker", "operator": "==", "value": "user"},
                    {
                        "operator": "OR",
                        "conditions": [
                            {"field": "message.content", "operator": "matches", "value": "(?i)refund|charge(d|back)"},
                            {"field": "context.account.balance", "operator": "<", "value": 0}
                        ]
                    }
                ]
            }
        })))
        .unwrap();

    let mut attrs = Context::new();
    attrs.insert("account".to_string(), json!({"balance": -12.5}));
    let ctx = EvalContext::new(&[], &attrs);

    assert!(engine.evaluate(&Turn::user("hello"), &ctx).triggered);
    assert!(engine.evaluate(&Turn::user("I was CHARGED twice"), &EvalContext::new(&[], &Context::new())).triggered);
    assert!(!engine.evaluate(&Turn::agent("refund issued"), &ctx).triggered);
}

#[test]
fn test_missing_context_key_is_false_not_error() {
    let engine = RuleEngine::new();
    engine
        .add_rule(Rule::new(
            "gold",
            handoff::types::ConditionNode::leaf("context.tier", handoff::types::Operator::Eq, "gold"),
            Priority::High,
        ))
        .unwrap();
    let attrs = Context::new();
    let result = engine.evaluate(&Turn::user("hi"), &EvalContext::new(&[], &attrs));
    assert!(!result.triggered);
    assert_eq!(result.confidence, 0.0);
}

#[test]
fn test_malformed_rules_fail_fast() {
    let engine = RuleEngine::new();

    let unknown_field = rule_from_json(json!({
        "name": "bad field",
        "condition": {"field": "message.mood", "operator": "==", "value": "sad"}
    }));
    assert!(matches!(engine.add_rule(unknown_field), Err(HandoffError::UnknownField(_))));

    let empty_and = rule_from_json(json!({
        "name": "empty",
        "condition": {"operator": "AND", "conditions": []}
    }));
    assert!(matches!(engine.add_rule(empty_and), Err(HandoffError::MalformedCondition(_))));

    let bad_regex = rule_from_json(json!({
        "name": "regex",
        "condition": {"field": "message.content", "operator": "matches", "value": "(unclosed"}
    }));
    assert!(matches!(engine.add_rule(bad_regex), Err(HandoffError::InvalidRegex { .. })));

    assert!(engine.is_empty());
}

#[tokio::test]
async fn test_rule_drives_decision() {
    let aggregator = DecisionAggregator::new();
    let id = aggregator
        .add_rule(rule_from_json(json!({
            "name": "cancellation",
            "priority": "HIGH",
            "condition": {"field": "message.content", "operator": "contains", "value": "cancel my subscription"}
        })))
        .unwrap();

    let turn = Turn::user("Please Cancel My Subscription today");
    let decision = aggregator.decide(&[], &turn, &Context::new()).await;
    assert!(decision.should_handoff);
    assert_eq!(decision.reason_code, ReasonCode::H004_RULE_MATCHED);
    assert_eq!(decision.priority, Priority::High);
    assert!(decision.reason.contains("cancellation"));

    assert!(aggregator.remove_rule(&id));
    let decision = aggregator.decide(&[], &turn, &Context::new()).await;
    assert!(!decision.should_handoff);
}

#[tokio::test]
async fn test_rules_shared_across_threads() {
    let aggregator = std::sync::Arc::new(DecisionAggregator::new());
    let engine = aggregator.rule_engine();

    let writers: Vec<_> = (0..4)
        .map(|i| {
            let engine = engine.clone();
            std::thread::spawn(move || {
                engine
                    .add_rule(Rule::new(
                        format!("rule-{}", i),
                        handoff::types::ConditionNode::leaf(
                            "message.content",
                            handoff::types::Operator::Contains,
                            format!("word{}", i),
                        ),
                        Priority::Low,
                    ))
                    .unwrap()
            })
        })
        .collect();
    for w in writers {
        w.join().unwrap();
    }

    assert_eq!(aggregator.list_rules().len(), 4);
    let decision = aggregator
        .decide(&[], &Turn::user("something about word3"), &Context::new())
        .await;
    assert_eq!(decision.reason_code, ReasonCode::H004_RULE_MATCHED);
    assert_eq!(decision.priority, Priority::Low);
}
