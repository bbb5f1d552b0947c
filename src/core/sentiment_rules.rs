//! Rule-tier sentiment scorer: deterministic keyword and pattern weights
//!
//! score = 0.5 + positive(+0.2) + strong(-0.3) + moderate(-0.15)
//!       + frustration(-0.1) + caps(-0.1/word, max -0.3)
//!       + punctuation runs(-0.05/run, max -0.2), clamped to [0, 1]

use lazy_static::lazy_static;
use regex::Regex;
use crate::types::{clamp_unit, RuleTierBreakdown};
use crate::{
    CAPS_GRACE_WORDS, CAPS_PENALTY_CAP, PUNCTUATION_PENALTY_CAP, SENTIMENT_BASELINE,
    WEIGHT_CAPS_WORD, WEIGHT_FRUSTRATION, WEIGHT_MODERATE_NEGATIVE, WEIGHT_POSITIVE,
    WEIGHT_PUNCTUATION_RUN, WEIGHT_STRONG_NEGATIVE,
};

lazy_static! {
    // =========================================================================
    // Positive (+0.2 per occurrence)
    // =========================================================================
    static ref RE_POSITIVE: Regex = Regex::new(
        r"(?i)\b(thanks|thank you|great|perfect|excellent|awesome|helpful|appreciate|appreciated|wonderful|love|happy|amazing|fantastic)\b"
    ).unwrap();

    // =========================================================================
    // Strong negative (-0.3 per occurrence)
    // =========================================================================
    static ref RE_STRONG_NEGATIVE: Regex = Regex::new(
        r"(?i)\b(terrible|horrible|awful|worst|hate|useless|disgusting|unacceptable|ridiculous|pathetic|furious|garbage)\b"
    ).unwrap();

    // =========================================================================
    // Moderate negative (-0.15 per occurrence)
    // =========================================================================
    static ref RE_MODERATE_NEGATIVE: Regex = Regex::new(
        r"(?i)\b(bad|annoying|annoyed|disappointed|disappointing|poor|wrong|problem|broken|slow|confusing|confused|unhappy|upset)\b"
    ).unwrap();

    // =========================================================================
    // Frustration phrases (-0.1 per occurrence)
    // =========================================================================
    static ref RE_FRUSTRATION: Regex = Regex::new(
        r"(?i)\b(doesn'?t work|does not work|not working|still not|again|waste of time|how many times|fed up|give up|frustrated|frustrating|already told you|makes no sense)\b"
    ).unwrap();

    // =========================================================================
    // Runs of 3+ consecutive ! / ?
    // =========================================================================
    static ref RE_PUNCTUATION_RUN: Regex = Regex::new(r"[!?]{3,}").unwrap();
}

/// Rule-tier output
#[derive(Debug, Clone, PartialEq)]
pub struct RuleTierScore {
    pub score: f64,
    pub confidence: f64,
    pub breakdown: RuleTierBreakdown,
}

/// Deterministic scorer for the first tier
#[derive(Debug, Default)]
pub struct RuleTierScorer;

impl RuleTierScorer {
    pub fn new() -> Self {
        Self
    }

    /// Score text. Whitespace differences never change the result.
    pub fn score(&self, text: &str) -> RuleTierScore {
        let text = normalize_whitespace(text);

        if text.is_empty() {
            return RuleTierScore {
                score: SENTIMENT_BASELINE,
                confidence: 0.0,
                breakdown: RuleTierBreakdown::default(),
            };
        }

        let caps_words = count_caps_words(&text);
        let punctuation_runs = RE_PUNCTUATION_RUN.find_iter(&text).count();

        let breakdown = RuleTierBreakdown {
            positive: count_matches(&RE_POSITIVE, &text) * WEIGHT_POSITIVE,
            strong_negative: count_matches(&RE_STRONG_NEGATIVE, &text) * WEIGHT_STRONG_NEGATIVE,
            moderate_negative: count_matches(&RE_MODERATE_NEGATIVE, &text) * WEIGHT_MODERATE_NEGATIVE,
            frustration: count_matches(&RE_FRUSTRATION, &text) * WEIGHT_FRUSTRATION,
            caps_penalty: (caps_words.saturating_sub(CAPS_GRACE_WORDS) as f64 * WEIGHT_CAPS_WORD)
                .max(CAPS_PENALTY_CAP),
            punctuation_penalty: (punctuation_runs as f64 * WEIGHT_PUNCTUATION_RUN)
                .max(PUNCTUATION_PENALTY_CAP),
            caps_words,
            punctuation_runs,
        };

        let score = clamp_unit(SENTIMENT_BASELINE + breakdown.total());

        // Further from neutral = more certain
        let confidence = (0.5 + (score - SENTIMENT_BASELINE).abs()).min(1.0);

        RuleTierScore {
            score,
            confidence,
            breakdown,
        }
    }

    /// Quick score - just the value
    pub fn quick_score(&self, text: &str) -> f64 {
        self.score(text).score
    }
}

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Count regex matches in text
fn count_matches(regex: &Regex, text: &str) -> f64 {
    regex.find_iter(text).count() as f64
}

/// Words with 3+ letters, all upper case ("NOW!!!" counts, "I" does not)
fn count_caps_words(text: &str) -> usize {
    text.split_whitespace()
        .filter(|word| {
            let letters: Vec<char> = word.chars().filter(|c| c.is_alphabetic()).collect();
            letters.len() >= 3 && letters.iter().all(|c| c.is_uppercase())
        })
        .count()
}

// =============================================================================
// TESTS
// =============================================================================
