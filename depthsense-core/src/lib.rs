//! depthsense-core: depth tensor normalization
//!
//! Turns the raw confidence tensor of a monocular depth model into a
//! normalized grid for display, an occupancy grid, and the scalar average
//! used to decide whether something is too close.

pub mod config;
pub mod error;
pub mod grid;
pub mod normalizer;
pub mod tensor;

pub use config::NormalizerConfig;
pub use error::{GridError, Result};
pub use grid::{Grid, NormalizedGrid, OccupancyGrid};
pub use normalizer::{ConversionResult, GridNormalizer, RangeKind};
pub use tensor::{Tensor, TensorShape};
