//! Feedback sinks fired when something is too close

use crate::error::EyeError;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::info;

/// Strength of a feedback event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeedbackStyle {
    Light,
    Medium,
    Heavy,
}

/// Trait for feedback outputs (haptics, audio cues, ...)
#[cfg_attr(test, mockall::automock)]
pub trait FeedbackSink: Send + Sync {
    /// Fire one feedback event
    fn trigger(&self, style: FeedbackStyle) -> Result<(), EyeError>;

    /// Get sink name
    fn name(&self) -> &str;
}

/// Sink that records events to the log
#[derive(Debug, Default)]
pub struct LoggingFeedback {
    count: AtomicU64,
}

impl LoggingFeedback {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events fired so far
    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }
}

impl FeedbackSink for LoggingFeedback {
    fn trigger(&self, style: FeedbackStyle) -> Result<(), EyeError> {
        let count = self.count.fetch_add(1, Ordering::Relaxed) + 1;
        info!("Proximity feedback #{} ({:?})", count, style);
        Ok(())
    }

    fn name(&self) -> &str {
        "logging"
    }
}
