//! Explicit-request evaluator: the user asks for a human
//!
//! Negative phrasings ("don't need an agent") are checked first and suppress
//! any match. Otherwise the first positive pattern wins.

use lazy_static::lazy_static;
use regex::Regex;
use crate::core::signal::SignalEvaluator;
use crate::error::{EvaluatorError, HandoffError, Result};
use crate::types::{Context, Priority, SignalKind, SignalResult, Turn};
use crate::EXPLICIT_REQUEST_CONFIDENCE;

lazy_static! {
    static ref DEFAULT_REQUEST_PATTERNS: Vec<Regex> = compile_all(&[
        // "talk to a human", "speak with a real person", "chat with someone"
        r"(?i)\b(talk|speak|chat)\s+(to|with)\s+(a\s+|an\s+|some\s+|the\s+)?(real\s+|live\s+|actual\s+)?(human|person|agent|representative|rep|someone|somebody|operator|manager|supervisor)\b",
        // "get me an agent", "connect me to a person", "put me through to a manager"
        r"(?i)\b(get|give|connect|put)\s+me\s+(to\s+|through\s+to\s+|with\s+)?(a\s+|an\s+|the\s+)?(real\s+|live\s+)?(human|person|agent|representative|operator|manager|supervisor)\b",
        // "I want a human", "need a real person"
        r"(?i)\b(want|need|would\s+like)\s+(a\s+|an\s+|to\s+speak\s+to\s+(a\s+)?)?(real\s+|live\s+)?(human|person|representative|operator)\b",
        r"(?i)\bescalat(e|ion)\b",
        r"(?i)\btransfer\s+me\b",
        r"(?i)\b(human|live)\s+(agent|support|help|representative)\b",
        r"(?i)\bis\s+there\s+(a\s+)?(real\s+)?(human|person)\b",
    ])
    .unwrap_or_default();

    static ref DEFAULT_NEGATIVE_PATTERNS: Vec<Regex> = compile_all(&[
        r"(?i)\b(don'?t|do\s+not|doesn'?t|does\s+not|no\s+need\s+to)\s+(need|want|have)\s+(to\s+)?((talk|speak)\s+(to|with)\s+)?(a\s+|an\s+)?(real\s+|live\s+)?(human|person|agent|representative|operator)\b",
        r"(?i)\b(don'?t|do\s+not|no\s+need\s+to)\s+(escalate|transfer)\b",
        r"(?i)\bno\s+(need\s+for\s+(a\s+|an\s+)?(human|agent|escalation)|escalation)\b",
    ])
    .unwrap_or_default();
}

fn compile_all<S: AsRef<str>>(patterns: &[S]) -> Result<Vec<Regex>> {
    patterns
        .iter()
        .map(|p| {
            Regex::new(p.as_ref()).map_err(|source| HandoffError::InvalidRegex {
                pattern: p.as_ref().to_string(),
                source,
            })
        })
        .collect()
}

/// Detects requests for a human agent in the current user turn
#[derive(Debug, Clone)]
pub struct ExplicitRequestEvaluator {
    request_patterns: Vec<Regex>,
    negative_patterns: Vec<Regex>,
}

impl Default for ExplicitRequestEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl ExplicitRequestEvaluator {
    pub fn new() -> Self {
        Self {
            request_patterns: DEFAULT_REQUEST_PATTERNS.clone(),
            negative_patterns: DEFAULT_NEGATIVE_PATTERNS.clone(),
        }
    }

    /// Replace both pattern sets. Patterns are matched case-insensitively.
    pub fn with_patterns(requests: &[&str], negatives: &[&str]) -> Result<Self> {
        let requests: Vec<String> = requests.iter().map(|p| format!("(?i){}", p)).collect();
        let negatives: Vec<String> = negatives.iter().map(|p| format!("(?i){}", p)).collect();
        Ok(Self {
            request_patterns: compile_all(&requests)?,
            negative_patterns: compile_all(&negatives)?,
        })
    }

    /// First matching request phrase, unless a negative phrase suppresses it
    pub fn detect<'t>(&self, text: &'t str) -> Detection<'t> {
        if let Some(m) = self.negative_patterns.iter().find_map(|re| re.find(text)) {
            return Detection::Suppressed(m.as_str());
        }
        match self.request_patterns.iter().find_map(|re| re.find(text)) {
            Some(m) => Detection::Requested(m.as_str()),
            None => Detection::None,
        }
    }
}

/// Outcome of scanning one message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Detection<'t> {
    Requested(&'t str),
    Suppressed(&'t str),
    None,
}

impl SignalEvaluator for ExplicitRequestEvaluator {
    fn name(&self) -> &str {
        "explicit_request"
    }

    fn kind(&self) -> SignalKind {
        SignalKind::ExplicitRequest
    }

    fn priority(&self) -> Priority {
        Priority::High
    }

    fn evaluate(
        &self,
        _conversation: &[Turn],
        current: &Turn,
        _context: &Context,
    ) -> std::result::Result<SignalResult, EvaluatorError> {
        if !current.is_user() {
            return Ok(SignalResult::quiet(self.kind(), self.priority()));
        }

        let text = current.text.replace('\u{2019}', "'");
        Ok(match self.detect(&text) {
            Detection::Requested(phrase) => SignalResult::triggered(
                self.kind(),
                EXPLICIT_REQUEST_CONFIDENCE,
                self.priority(),
                format!("User requested a human: \"{}\"", phrase),
            )
            .with_detail("matched_phrase", phrase.to_string()),
            Detection::Suppressed(phrase) => SignalResult::quiet(self.kind(), self.priority())
                .with_reason("Request suppressed by negative phrasing")
                .with_detail("suppressed_by", phrase.to_string()),
            Detection::None => SignalResult::quiet(self.kind(), self.priority()),
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================
