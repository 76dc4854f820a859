//! Error types for depthsense-eye

use depthsense_core::GridError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EyeError {
    #[error("Estimator error: {0}")]
    Estimator(String),

    #[error("Frame error: {0}")]
    Frame(String),

    #[error("Feedback error: {0}")]
    Feedback(String),

    #[error("Pipeline error: {0}")]
    Pipeline(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Grid error: {0}")]
    Grid(#[from] GridError),

    #[error("Config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
