//! Keyword evaluator: critical phrases force an immediate handoff
//!
//! Word-boundary matching ("fraud" does not fire inside "defraud").
//! Custom lists replace the defaults outright; they are never merged.

use std::collections::HashMap;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use crate::config::KeywordConfig;
use crate::core::signal::SignalEvaluator;
use crate::error::{EvaluatorError, HandoffError, Result};
use crate::types::{Context, Priority, SignalKind, SignalResult, Turn};
use crate::KEYWORD_CONFIDENCE;

/// Critical keyword categories, scanned in declaration order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeywordCategory {
    FinancialFraud,
    Safety,
    Legal,
    Urgency,
    Access,
}

impl KeywordCategory {
    pub const ALL: [KeywordCategory; 5] = [
        Self::FinancialFraud,
        Self::Safety,
        Self::Legal,
        Self::Urgency,
        Self::Access,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FinancialFraud => "financial_fraud",
            Self::Safety => "safety",
            Self::Legal => "legal",
            Self::Urgency => "urgency",
            Self::Access => "access",
        }
    }

    /// Built-in phrase list
    pub fn default_keywords(&self) -> &'static [&'static str] {
        match self {
            Self::FinancialFraud => &[
                "fraud", "fraudulent", "scam", "scammed", "stolen card",
                "unauthorized charge", "unauthorized transaction", "identity theft",
                "chargeback", "money laundering", "phishing",
            ],
            Self::Safety => &[
                "suicide", "kill myself", "self-harm", "hurt myself", "in danger",
                "threatened", "abuse", "overdose", "emergency",
            ],
            Self::Legal => &[
                "lawyer", "attorney", "lawsuit", "sue", "legal action", "court",
                "subpoena", "gdpr", "data breach",
            ],
            Self::Urgency => &[
                "urgent", "asap", "time sensitive", "critical issue", "system down",
                "outage",
            ],
            Self::Access => &[
                "locked out", "can't log in", "cannot log in", "account hacked",
                "hacked", "compromised", "lost access",
            ],
        }
    }
}

impl std::fmt::Display for KeywordCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
struct KeywordPattern {
    category: KeywordCategory,
    keyword: String,
    regex: Regex,
}

/// Matches critical keywords in the current user turn
#[derive(Debug, Clone)]
pub struct KeywordEvaluator {
    patterns: Vec<KeywordPattern>,
    case_sensitive: bool,
}

impl Default for KeywordEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl KeywordEvaluator {
    /// Default lists, case-insensitive
    pub fn new() -> Self {
        let defaults = default_keyword_map();
        // Built-in keywords are plain words; escaping cannot fail
        Self::build(&defaults, false).unwrap_or(Self {
            patterns: Vec::new(),
            case_sensitive: false,
        })
    }

    /// Custom lists replace the defaults entirely
    pub fn with_keywords(
        keywords: &HashMap<KeywordCategory, Vec<String>>,
        case_sensitive: bool,
    ) -> Result<Self> {
        Self::build(keywords, case_sensitive)
    }

    pub fn with_config(config: &KeywordConfig) -> Result<Self> {
        match &config.custom_keywords {
            Some(custom) => Self::build(custom, config.case_sensitive),
            None => Self::build(&default_keyword_map(), config.case_sensitive),
        }
    }

    fn build(keywords: &HashMap<KeywordCategory, Vec<String>>, case_sensitive: bool) -> Result<Self> {
        let mut patterns = Vec::new();
        for category in KeywordCategory::ALL {
            let Some(list) = keywords.get(&category) else {
                continue;
            };
            for keyword in list {
                let keyword = keyword.trim();
                if keyword.is_empty() {
                    return Err(HandoffError::InvalidConfig(format!(
                        "empty keyword in category {}",
                        category
                    )));
                }
                patterns.push(KeywordPattern {
                    category,
                    keyword: keyword.to_string(),
                    regex: word_boundary_regex(keyword, case_sensitive)?,
                });
            }
        }
        Ok(Self {
            patterns,
            case_sensitive,
        })
    }

    pub fn is_case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    pub fn keyword_count(&self) -> usize {
        self.patterns.len()
    }

    /// First keyword found in the text, in category order
    pub fn find(&self, text: &str) -> Option<(KeywordCategory, &str)> {
        self.patterns
            .iter()
            .find(|p| p.regex.is_match(text))
            .map(|p| (p.category, p.keyword.as_str()))
    }
}

fn default_keyword_map() -> HashMap<KeywordCategory, Vec<String>> {
    KeywordCategory::ALL
        .iter()
        .map(|c| (*c, c.default_keywords().iter().map(|k| k.to_string()).collect()))
        .collect()
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// `\bkeyword\b`, with inner whitespace matching any run of whitespace.
/// An edge that is punctuation ("C++", "help!") is bounded by a non-word
/// character or the end of the text instead.
fn word_boundary_regex(keyword: &str, case_sensitive: bool) -> Result<Regex> {
    let body = keyword
        .split_whitespace()
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(r"\s+");
    let start = match keyword.chars().next() {
        Some(c) if is_word_char(c) => r"\b",
        _ => r"(?:^|\W)",
    };
    let end = match keyword.chars().last() {
        Some(c) if is_word_char(c) => r"\b",
        _ => r"(?:\W|$)",
    };
    let pattern = format!("{}{}{}", start, body, end);
    RegexBuilder::new(&pattern)
        .case_insensitive(!case_sensitive)
        .build()
        .map_err(|source| HandoffError::InvalidRegex { pattern, source })
}

impl SignalEvaluator for KeywordEvaluator {
    fn name(&self) -> &str {
        "keyword"
    }

    fn kind(&self) -> SignalKind {
        SignalKind::Keyword
    }

    fn priority(&self) -> Priority {
        Priority::Immediate
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

        Ok(match self.find(&current.text) {
            Some((category, keyword)) => SignalResult::triggered(
                self.kind(),
                KEYWORD_CONFIDENCE,
                self.priority(),
                format!("Critical keyword \"{}\" ({})", keyword, category),
            )
            .with_detail("keyword", keyword.to_string())
            .with_detail("category", category.as_str()),
            None => SignalResult::quiet(self.kind(), self.priority()),
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================
