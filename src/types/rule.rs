//! Rule and condition definitions
//!
//! Conditions form a tagged tree: a [`Condition`] leaf or a
//! [`CompoundCondition`] node joining children with AND / OR.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use crate::types::Priority;

/// Leaf comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operator {
    /// Case-insensitive substring
    #[serde(rename = "contains")]
    Contains,
    /// Regular expression
    #[serde(rename = "matches")]
    Matches,
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = ">=")]
    Ge,
}

impl Operator {
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Contains => "contains",
            Self::Matches => "matches",
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Gt => ">",
            Self::Le => "<=",
            Self::Ge => ">=",
        }
    }
}

/// How a compound node joins its children
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogicalOperator {
    And,
    Or,
}

/// `{field, operator, value}` leaf
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    /// `message.content`, `message.speaker`, `context.<key>` or `conversation.length`
    pub field: String,
    pub operator: Operator,
    pub value: Value,
}

impl Condition {
    pub fn new(field: impl Into<String>, operator: Operator, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            operator,
            value: value.into(),
        }
    }
}

/// `{operator: AND|OR, conditions: [...]}` node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompoundCondition {
    pub operator: LogicalOperator,
    pub conditions: Vec<ConditionNode>,
}

/// Either a leaf or a compound node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConditionNode {
    Compound(CompoundCondition),
    Leaf(Condition),
}

impl ConditionNode {
    pub fn leaf(field: impl Into<String>, operator: Operator, value: impl Into<Value>) -> Self {
        ConditionNode::Leaf(Condition::new(field, operator, value))
    }

    /// AND of all children
    pub fn all(conditions: Vec<ConditionNode>) -> Self {
        ConditionNode::Compound(CompoundCondition {
            operator: LogicalOperator::And,
            conditions,
        })
    }

    /// OR of all children
    pub fn any(conditions: Vec<ConditionNode>) -> Self {
        ConditionNode::Compound(CompoundCondition {
            operator: LogicalOperator::Or,
            conditions,
        })
    }
}

impl From<Condition> for ConditionNode {
    fn from(condition: Condition) -> Self {
        ConditionNode::Leaf(condition)
    }
}

fn default_enabled() -> bool {
    true
}

/// A named, prioritized user rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    /// Empty ids are assigned by the rule engine on registration
    #[serde(default)]
    pub id: String,
    pub name: String,
    pub condition: ConditionNode,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl Rule {
    pub fn new(name: impl Into<String>, condition: impl Into<ConditionNode>, priority: Priority) -> Self {
        Self {
            id: String::new(),
            name: name.into(),
            condition: condition.into(),
            priority,
            enabled: true,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leaf_deserializes() {
        let node: ConditionNode = serde_json::from_str(
            r#"{"field": "message.content", "operator": "contains", "value": "refund"}"#,
        )
        .unwrap();
        assert_eq!(
            node,
            ConditionNode::leaf("message.content", Operator::Contains, "refund")
        );
    }

    #[test]
    fn test_compound_deserializes_recursively() {
        let node: ConditionNode = serde_json::from_str(
            r#"{
                "operator": "AND",
                "conditions": [
                    {"field": "context.tier", "operator": "==", "value": "vip"},
                    {"operator": "OR", "conditions": [
                        {"field": "conversation.length", "operator": ">", "value": 10}
                    ]}
                ]
            }"#,
        )
        .unwrap();
        match node {
            ConditionNode::Compound(c) => {
                assert_eq!(c.operator, LogicalOperator::And);
                assert!(matches!(c.conditions[1], ConditionNode::Compound(_)));
            }
            ConditionNode::Leaf(_) => panic!("expected compound"),
        }
    }

    #[test]
    fn test_rule_defaults() {
        let rule: Rule = serde_json::from_str(
            r#"{"name": "vip", "condition": {"field": "context.vip", "operator": "==", "value": true}}"#,
        )
        .unwrap();
        assert!(rule.enabled);
        assert!(rule.id.is_empty());
        assert_eq!(rule.priority, Priority::Medium);
    }
}
