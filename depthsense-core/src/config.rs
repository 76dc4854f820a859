//! Configuration for grid normalization

use crate::error::GridError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Normalizer configuration
///
/// The output resolution is the depth model's known plane size. It fixes the
/// denominator of the occupancy average, independently of the grid that a
/// given tensor actually produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizerConfig {
    /// Width of the model output plane (tensor axis 1)
    pub output_width: usize,
    /// Height of the model output plane (tensor axis 2)
    pub output_height: usize,
    /// Normalized values at or above this are occupied
    pub occupancy_threshold: f64,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        // FCRN emits a 128x160 plane
        Self {
            output_width: 128,
            output_height: 160,
            occupancy_threshold: 0.5,
        }
    }
}

impl NormalizerConfig {
    /// Build a config whose denominator matches the given plane
    pub fn for_resolution(output_width: usize, output_height: usize) -> Self {
        Self {
            output_width,
            output_height,
            ..Self::default()
        }
    }

    /// Cell count the occupancy sum is divided by
    pub fn denominator(&self) -> usize {
        self.output_width.saturating_mul(self.output_height)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.output_width == 0 || self.output_height == 0 {
            return Err("Output resolution must be non-zero".to_string());
        }

        self.output_width
            .checked_mul(self.output_height)
            .ok_or_else(|| "Output resolution would cause integer overflow".to_string())?;

        if !self.occupancy_threshold.is_finite()
            || self.occupancy_threshold <= 0.0
            || self.occupancy_threshold > 1.0
        {
            return Err("Occupancy threshold must be in (0, 1]".to_string());
        }

        Ok(())
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(input: &str) -> Result<Self, GridError> {
        let config: Self = toml::from_str(input)?;
        config.validate().map_err(GridError::Config)?;
        Ok(config)
    }

    /// Load and validate a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, GridError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }
}
