use thiserror::Error;

#[derive(Error, Debug)]
pub enum GridError {
    #[error("Invalid tensor shape {shape:?}: expected at least (channels, width, height) with channels >= 1")]
    InvalidShape { shape: Vec<usize> },

    #[error("Tensor buffer too short: expected at least {expected} samples, got {actual}")]
    BufferTooShort { expected: usize, actual: usize },

    #[error("Tensor buffer length mismatch: shape needs {expected} samples, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("Tensor dimensions overflow: {0:?}")]
    DimensionOverflow(Vec<usize>),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    Parse(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, GridError>;
