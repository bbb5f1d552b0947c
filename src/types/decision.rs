//! Handoff decision, the engine's only output

use chrono::{DateTime, Utc};
use colored::Colorize;
use serde::{Deserialize, Serialize};
use crate::types::{Priority, ReasonCode, SentimentResult, SignalResult};

/// Final verdict for one turn. Built fresh per call, never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandoffDecision {
    pub timestamp: DateTime<Utc>,
    /// `winning_signal.is_some()`
    pub should_handoff: bool,
    pub winning_signal: Option<SignalResult>,
    pub sentiment: SentimentResult,
    /// Winner's priority, LOW when nothing won
    pub priority: Priority,
    pub reason: String,
    pub reason_code: ReasonCode,
    /// Every evaluator verdict, in registration order
    #[serde(default)]
    pub signals: Vec<SignalResult>,
}

impl HandoffDecision {
    pub fn new(
        winning_signal: Option<SignalResult>,
        sentiment: SentimentResult,
        signals: Vec<SignalResult>,
    ) -> Self {
        let (priority, reason, reason_code) = match &winning_signal {
            Some(w) => (w.priority, w.reason.clone(), ReasonCode::for_kind(w.kind)),
            None => (
                Priority::Low,
                ReasonCode::H000_NO_HANDOFF.description().to_string(),
                ReasonCode::H000_NO_HANDOFF,
            ),
        };

        Self {
            timestamp: Utc::now(),
            should_handoff: winning_signal.is_some(),
            winning_signal,
            sentiment,
            priority,
            reason,
            reason_code,
            signals,
        }
    }

    /// Format for terminal display (with colors)
    pub fn to_terminal_string(&self) -> String {
        let verdict = if self.should_handoff {
            let label = format!("HANDOFF [{}]", self.priority);
            match self.priority {
                Priority::Immediate | Priority::High => label.red().bold(),
                Priority::Medium => label.yellow().bold(),
                Priority::Low => label.cyan().bold(),
            }
        } else {
            "CONTINUE".green().bold()
        };

        format!(
            "{} | sentiment={:.3} ({}) | {} | {}",
            verdict,
            self.sentiment.score,
            self.sentiment.tier_used,
            self.reason_code.code().dimmed(),
            self.reason
        )
    }

    /// Format for parseable output (no colors)
    pub fn to_parseable_string(&self) -> String {
        format!(
            "handoff={} | priority={} | sentiment={:.3} | tier={} | reason={}",
            self.should_handoff,
            self.priority,
            self.sentiment.score,
            self.sentiment.tier_used,
            self.reason_code.code()
        )
    }
}
