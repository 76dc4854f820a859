//! Configuration for depthsense-eye

use crate::error::EyeError;
use crate::feedback::FeedbackStyle;
use depthsense_core::NormalizerConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Depth pipeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EyeConfig {
    /// Frames converted concurrently before new frames wait
    pub max_in_flight: usize,
    /// Averages strictly above this count as too close
    pub trigger_threshold: f64,
    /// Fire feedback when too close
    pub feedback_enabled: bool,
    /// Strength of the feedback event
    pub feedback_style: FeedbackStyle,
    /// Grid normalization settings
    pub normalizer: NormalizerConfig,
}

impl Default for EyeConfig {
    fn default() -> Self {
        Self {
            max_in_flight: 2,
            trigger_threshold: 0.35,
            feedback_enabled: true,
            feedback_style: FeedbackStyle::Heavy,
            normalizer: NormalizerConfig::default(),
        }
    }
}

impl EyeConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.max_in_flight == 0 || self.max_in_flight > 64 {
            return Err("max_in_flight must be between 1 and 64".to_string());
        }

        if !self.trigger_threshold.is_finite()
            || self.trigger_threshold < 0.0
            || self.trigger_threshold > 1.0
        {
            return Err("Trigger threshold must be in [0, 1]".to_string());
        }

        self.normalizer.validate()
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(input: &str) -> Result<Self, EyeError> {
        let config: Self = toml::from_str(input)?;
        config.validate().map_err(EyeError::Config)?;
        Ok(config)
    }

    /// Load and validate a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, EyeError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }
}
