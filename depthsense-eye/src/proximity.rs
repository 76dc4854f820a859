//! Too-close decision from the occupancy average

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProximityDecision {
    TooClose,
    Clear,
}

/// Fixed-threshold comparison on the occupancy average
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProximityPolicy {
    trigger_threshold: f64,
}

impl Default for ProximityPolicy {
    fn default() -> Self {
        Self::new(0.35)
    }
}

impl ProximityPolicy {
    pub fn new(trigger_threshold: f64) -> Self {
        Self { trigger_threshold }
    }

    pub fn trigger_threshold(&self) -> f64 {
        self.trigger_threshold
    }

    /// `TooClose` only when the average is strictly above the threshold
    pub fn evaluate(&self, average: f64) -> ProximityDecision {
        if average > self.trigger_threshold {
            ProximityDecision::TooClose
        } else {
            ProximityDecision::Clear
        }
    }
}
