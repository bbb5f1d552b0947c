//! Turn model
//!
//! - Turn = one immutable message from one speaker
//! - Conversation = ordered slice of turns, owned by the caller
//! - Context = caller-supplied attributes consumed by rules

use std::collections::HashMap;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Caller-supplied key/value attributes (user tier, channel, ...)
pub type Context = HashMap<String, Value>;

/// Who produced a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Speaker {
    User,
    Agent,
    System,
}

impl Speaker {
    pub fn as_str(&self) -> &'static str {
        match self {
            Speaker::User => "USER",
            Speaker::Agent => "AGENT",
            Speaker::System => "SYSTEM",
        }
    }
}

impl std::fmt::Display for Speaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single message in a conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub speaker: Speaker,
    #[serde(default)]
    pub text: String,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub attributes: HashMap<String, Value>,
}

impl Turn {
    /// Create a new turn stamped with the current time
    pub fn new(speaker: Speaker, text: impl Into<String>) -> Self {
        Self {
            speaker,
            text: text.into(),
            timestamp: Utc::now(),
            attributes: HashMap::new(),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Speaker::User, text)
    }

    pub fn agent(text: impl Into<String>) -> Self {
        Self::new(Speaker::Agent, text)
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self::new(Speaker::System, text)
    }

    /// Attach an attribute (builder style)
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn is_user(&self) -> bool {
        self.speaker == Speaker::User
    }

    pub fn is_agent(&self) -> bool {
        self.speaker == Speaker::Agent
    }
}

/// History plus the current turn, oldest first.
///
/// Callers may pass a history that already ends with the current turn; it is
/// not counted twice.
pub fn timeline<'a>(conversation: &'a [Turn], current: &'a Turn) -> Vec<&'a Turn> {
    let mut turns: Vec<&Turn> = conversation.iter().collect();
    if conversation.last() != Some(current) {
        turns.push(current);
    }
    turns
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_turn() {
        let turn = Turn::user("Hello");
        assert_eq!(turn.speaker, Speaker::User);
        assert_eq!(turn.text, "Hello");
        assert!(turn.attributes.is_empty());
    }

    #[test]
    fn test_with_attribute() {
        let turn = Turn::agent("Hi").with_attribute("intent", "greeting");
        assert_eq!(turn.attributes["intent"], Value::from("greeting"));
    }

    #[test]
    fn test_timeline_appends_current() {
        let history = vec![Turn::user("one"), Turn::agent("two")];
        let current = Turn::user("three");
        let turns = timeline(&history, &current);
        assert_eq!(turns.len(), 3);
        assert_eq!(turns[2].text, "three");
    }

    #[test]
    fn test_timeline_does_not_duplicate_current() {
        let current = Turn::user("three");
        let history = vec![Turn::user("one"), current.clone()];
        assert_eq!(timeline(&history, &current).len(), 2);
    }

    #[test]
    fn test_speaker_serializes_uppercase() {
        let json = serde_json::to_string(&Speaker::Agent).unwrap();
        assert_eq!(json, "\"AGENT\"");
    }

    #[test]
    fn test_turn_deserializes_with_defaults() {
        let turn: Turn = serde_json::from_str(r#"{"speaker": "USER"}"#).unwrap();
        assert_eq!(turn.text, "");
        assert!(turn.attributes.is_empty());
    }
}
