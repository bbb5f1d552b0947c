//! Sentiment degradation tracking
//!
//! One tracker per conversation. The engine has no notion of conversation
//! identity; hosts that serve many conversations can key trackers by id
//! through [`ConversationTrackers`].

use std::collections::{HashMap, VecDeque};
use crate::config::DegradationConfig;
use crate::error::Result;
use crate::types::clamp_unit;

/// Rolling window of sentiment scores, oldest evicted first
#[derive(Debug, Clone, PartialEq)]
pub struct DegradationTracker {
    window: VecDeque<f64>,
    capacity: usize,
    threshold: f64,
}

impl Default for DegradationTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl DegradationTracker {
    /// Window of 5, threshold 0.3
    pub fn new() -> Self {
        Self {
            window: VecDeque::with_capacity(crate::DEGRADATION_WINDOW_SIZE),
            capacity: crate::DEGRADATION_WINDOW_SIZE,
            threshold: crate::DEGRADATION_THRESHOLD,
        }
    }

    pub fn with_config(config: &DegradationConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            window: VecDeque::with_capacity(config.window_size),
            capacity: config.window_size,
            threshold: config.threshold,
        })
    }

    /// Add the newest score, evicting the oldest when full
    pub fn track(&mut self, score: f64) {
        if self.window.len() == self.capacity {
            self.window.pop_front();
        }
        self.window.push_back(clamp_unit(score));
    }

    /// first − last; positive means worsening. 0 with fewer than 2 samples.
    pub fn trend(&self) -> f64 {
        if self.window.len() < 2 {
            return 0.0;
        }
        match (self.window.front(), self.window.back()) {
            (Some(first), Some(last)) => first - last,
            _ => 0.0,
        }
    }

    pub fn is_degrading(&self) -> bool {
        self.trend() > self.threshold
    }

    /// Forget everything (conversation ended)
    pub fn clear(&mut self) {
        self.window.clear();
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Scores oldest first
    pub fn scores(&self) -> impl Iterator<Item = f64> + '_ {
        self.window.iter().copied()
    }
}

/// Trackers keyed by conversation id
#[derive(Debug, Clone, Default)]
pub struct ConversationTrackers {
    config: DegradationConfig,
    trackers: HashMap<String, DegradationTracker>,
}

impl ConversationTrackers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: DegradationConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            trackers: HashMap::new(),
        })
    }

    /// Tracker for this conversation, created on first use
    pub fn get_or_create(&mut self, conversation_id: &str) -> &mut DegradationTracker {
        let config = &self.config;
        self.trackers
            .entry(conversation_id.to_string())
            .or_insert_with(|| DegradationTracker {
                window: VecDeque::with_capacity(config.window_size),
                capacity: config.window_size,
                threshold: config.threshold,
            })
    }

    pub fn get(&self, conversation_id: &str) -> Option<&DegradationTracker> {
        self.trackers.get(conversation_id)
    }

    /// Discard the tracker; true iff one existed
    pub fn end(&mut self, conversation_id: &str) -> bool {
        self.trackers.remove(conversation_id).is_some()
    }

    pub fn len(&self) -> usize {
        self.trackers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trackers.is_empty()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker_with(scores: &[f64]) -> DegradationTracker {
        let mut tracker = DegradationTracker::new();
        for &s in scores {
            tracker.track(s);
        }
        tracker
    }

    #[test]
    fn test_worsening_window_degrades() {
        let tracker = tracker_with(&[0.7, 0.6, 0.5, 0.4, 0.3]);
        assert!((tracker.trend() - 0.4).abs() < 1e-9);
        assert!(tracker.is_degrading());
    }

    #[test]
    fn test_flat_window_does_not_degrade() {
        let tracker = tracker_with(&[0.5, 0.5, 0.5, 0.5, 0.5]);
        assert_eq!(tracker.trend(), 0.0);
        assert!(!tracker.is_degrading());
    }

    #[test]
    fn test_single_sample_never_triggers() {
        let tracker = tracker_with(&[0.9]);
        assert_eq!(tracker.trend(), 0.0);
        assert!(!tracker.is_degrading());
    }

    #[test]
    fn test_oldest_evicted_first() {
        let tracker = tracker_with(&[0.9, 0.5, 0.5, 0.5, 0.5, 0.5]);
        assert_eq!(tracker.len(), 5);
        assert_eq!(tracker.scores().next(), Some(0.5));
        assert!(!tracker.is_degrading());
    }

    #[test]
    fn test_improving_is_negative_trend() {
        let tracker = tracker_with(&[0.2, 0.8]);
        assert!(tracker.trend() < 0.0);
        assert!(!tracker.is_degrading());
    }

    #[test]
    fn test_clear() {
        let mut tracker = tracker_with(&[0.9, 0.1]);
        assert!(tracker.is_degrading());
        tracker.clear();
        assert!(tracker.is_empty());
        assert!(!tracker.is_degrading());
    }

    #[test]
    fn test_custom_config() {
        let config = DegradationConfig {
            window_size: 3,
            threshold: 0.1,
        };
        let mut tracker = DegradationTracker::with_config(&config).unwrap();
        for s in [0.6, 0.55, 0.45, 0.4] {
            tracker.track(s);
        }
        assert_eq!(tracker.capacity(), 3);
        assert!((tracker.trend() - 0.15).abs() < 1e-9);
        assert!(tracker.is_degrading());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = DegradationConfig {
            window_size: 1,
            threshold: 0.3,
        };
        assert!(DegradationTracker::with_config(&config).is_err());
    }

    #[test]
    fn test_conversation_trackers_are_independent() {
        let mut trackers = ConversationTrackers::new();
        trackers.get_or_create("a").track(0.9);
        trackers.get_or_create("a").track(0.2);
        trackers.get_or_create("b").track(0.5);

        assert_eq!(trackers.len(), 2);
        assert!(trackers.get("a").unwrap().is_degrading());
        assert!(!trackers.get("b").unwrap().is_degrading());

        assert!(trackers.end("a"));
        assert!(!trackers.end("a"));
        assert!(trackers.get("a").is_none());
    }
}
