//! Condition evaluator: compiles a condition tree once, evaluates it per turn
//!
//! Field paths:
//! - `message.content`    current turn text
//! - `message.speaker`    USER / AGENT / SYSTEM
//! - `context.<key>`      caller attribute (dotted keys walk nested objects)
//! - `conversation.length` turns including the current one
//!
//! An unresolved field evaluates to `false` for every operator.

use std::cmp::Ordering;
use regex::{Regex, RegexBuilder};
use serde_json::Value;
use crate::error::{HandoffError, Result};
use crate::types::{timeline, ConditionNode, Context, LogicalOperator, Operator, Turn};

/// Everything a condition may look at besides the current turn
#[derive(Debug, Clone, Copy)]
pub struct EvalContext<'a> {
    pub conversation: &'a [Turn],
    pub attributes: &'a Context,
}

impl<'a> EvalContext<'a> {
    pub fn new(conversation: &'a [Turn], attributes: &'a Context) -> Self {
        Self {
            conversation,
            attributes,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum FieldPath {
    Content,
    Speaker,
    Context(String),
    ConversationLength,
}

impl FieldPath {
    fn parse(path: &str) -> Result<Self> {
        match path {
            "message.content" => Ok(Self::Content),
            "message.speaker" => Ok(Self::Speaker),
            "conversation.length" => Ok(Self::ConversationLength),
            _ => match path.strip_prefix("context.") {
                Some(key) if !key.is_empty() => Ok(Self::Context(key.to_string())),
                _ => Err(HandoffError::UnknownField(path.to_string())),
            },
        }
    }

    fn resolve(&self, turn: &Turn, ctx: &EvalContext<'_>) -> Option<Value> {
        match self {
            Self::Content => Some(Value::String(turn.text.clone())),
            Self::Speaker => Some(Value::String(turn.speaker.as_str().to_string())),
            Self::ConversationLength => {
                Some(Value::from(timeline(ctx.conversation, turn).len() as u64))
            }
            Self::Context(key) => lookup(ctx.attributes, key).cloned(),
        }
    }
}

/// Exact key first, then walk `a.b.c` through nested objects
fn lookup<'a>(attributes: &'a Context, key: &str) -> Option<&'a Value> {
    if let Some(v) = attributes.get(key) {
        return Some(v);
    }
    let mut parts = key.split('.');
    let mut current = attributes.get(parts.next()?)?;
    for part in parts {
        current = current.as_object()?.get(part)?;
    }
    Some(current)
}

#[derive(Debug, Clone)]
enum Matcher {
    /// Lowercased needle
    Contains(String),
    Matches(Regex),
    Compare(Operator, Value),
}

#[derive(Debug, Clone)]
enum CompiledNode {
    Leaf { field: FieldPath, matcher: Matcher },
    All(Vec<CompiledNode>),
    Any(Vec<CompiledNode>),
}

/// A condition tree with its regexes compiled and paths resolved
#[derive(Debug, Clone)]
pub struct CompiledCondition {
    root: CompiledNode,
}

impl CompiledCondition {
    /// Validate and compile. Malformed trees fail here, never at evaluation.
    pub fn compile(node: &ConditionNode) -> Result<Self> {
        Ok(Self {
            root: compile_node(node)?,
        })
    }

    /// Evaluate against a turn. Never fails.
    pub fn evaluate(&self, turn: &Turn, ctx: &EvalContext<'_>) -> bool {
        eval_node(&self.root, turn, ctx)
    }
}

/// One-shot evaluation of an uncompiled tree
pub fn evaluate_condition(node: &ConditionNode, turn: &Turn, ctx: &EvalContext<'_>) -> Result<bool> {
    Ok(CompiledCondition::compile(node)?.evaluate(turn, ctx))
}

fn compile_node(node: &ConditionNode) -> Result<CompiledNode> {
    match node {
        ConditionNode::Compound(compound) => {
            if compound.conditions.is_empty() {
                return Err(HandoffError::MalformedCondition(format!(
                    "{:?} node has no children",
                    compound.operator
                )));
            }
            let children = compound
                .conditions
                .iter()
                .map(compile_node)
                .collect::<Result<Vec<_>>>()?;
            Ok(match compound.operator {
                LogicalOperator::And => CompiledNode::All(children),
                LogicalOperator::Or => CompiledNode::Any(children),
            })
        }
        ConditionNode::Leaf(leaf) => {
            let field = FieldPath::parse(&leaf.field)?;
            let matcher = compile_matcher(&field, leaf.operator, &leaf.value)?;
            Ok(CompiledNode::Leaf { field, matcher })
        }
    }
}

fn compile_matcher(field: &FieldPath, op: Operator, value: &Value) -> Result<Matcher> {
    match op {
        Operator::Contains | Operator::Matches => {
            let pattern = value.as_str().ok_or_else(|| {
                HandoffError::MalformedCondition(format!(
                    "`{}` needs a string value, got {}",
                    op.symbol(),
                    value
                ))
            })?;
            if op == Operator::Contains {
                return Ok(Matcher::Contains(pattern.to_lowercase()));
            }
            let regex = RegexBuilder::new(pattern)
                .build()
                .map_err(|source| HandoffError::InvalidRegex {
                    pattern: pattern.to_string(),
                    source,
                })?;
            Ok(Matcher::Matches(regex))
        }
        Operator::Lt | Operator::Gt | Operator::Le | Operator::Ge => {
            if as_number(value).is_none() {
                return Err(HandoffError::MalformedCondition(format!(
                    "`{}` needs a numeric value, got {}",
                    op.symbol(),
                    value
                )));
            }
            Ok(Matcher::Compare(op, value.clone()))
        }
        Operator::Eq | Operator::Ne => {
            // Speakers resolve to upper case; accept "user" as well
            let value = match (field, value) {
                (FieldPath::Speaker, Value::String(s)) => Value::String(s.to_uppercase()),
                _ => value.clone(),
            };
            Ok(Matcher::Compare(op, value))
        }
    }
}

fn eval_node(node: &CompiledNode, turn: &Turn, ctx: &EvalContext<'_>) -> bool {
    match node {
        CompiledNode::All(children) => children.iter().all(|c| eval_node(c, turn, ctx)),
        CompiledNode::Any(children) => children.iter().any(|c| eval_node(c, turn, ctx)),
        CompiledNode::Leaf { field, matcher } => match field.resolve(turn, ctx) {
            Some(actual) => eval_matcher(matcher, &actual),
            None => false,
        },
    }
}

fn eval_matcher(matcher: &Matcher, actual: &Value) -> bool {
    match matcher {
        Matcher::Contains(needle) => texts(actual)
            .iter()
            .any(|t| t.to_lowercase().contains(needle.as_str())),
        Matcher::Matches(regex) => texts(actual).iter().any(|t| regex.is_match(t)),
        Matcher::Compare(op, expected) => compare(*op, actual, expected),
    }
}

/// Text view of a value; arrays expose each scalar element
fn texts(value: &Value) -> Vec<String> {
    match value {
        Value::String(s) => vec![s.clone()],
        Value::Number(n) => vec![n.to_string()],
        Value::Bool(b) => vec![b.to_string()],
        Value::Array(items) => items.iter().flat_map(texts).collect(),
        Value::Null | Value::Object(_) => Vec::new(),
    }
}

/// Numeric coercion: numbers, and strings that parse as numbers
fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn compare(op: Operator, actual: &Value, expected: &Value) -> bool {
    let ordering = match (as_number(actual), as_number(expected)) {
        (Some(a), Some(b)) => a.partial_cmp(&b),
        _ => match op {
            Operator::Eq => return actual == expected,
            Operator::Ne => return actual != expected,
            _ => None,
        },
    };
    let Some(ordering) = ordering else {
        return false;
    };
    match op {
        Operator::Eq => ordering == Ordering::Equal,
        Operator::Ne => ordering != Ordering::Equal,
        Operator::Lt => ordering == Ordering::Less,
        Operator::Gt => ordering == Ordering::Greater,
        Operator::Le => ordering != Ordering::Greater,
        Operator::Ge => ordering != Ordering::Less,
        Operator::Contains | Operator::Matches => false,
    }
}

// =============================================================================
// TESTS
// =============================================================================
