//! Depth estimators
//!
//! An estimator wraps one long-lived inference resource. It is loaded once
//! before the pipeline starts, shared as `Arc<dyn DepthEstimator>` across
//! frames, and torn down by `shutdown` when the pipeline stops.

pub mod luminance;

use crate::error::EyeError;
use crate::frame::Frame;
use async_trait::async_trait;
use depthsense_core::{Tensor, TensorShape};

pub use luminance::LuminanceEstimator;

/// Trait for monocular depth estimators
#[async_trait]
pub trait DepthEstimator: Send + Sync {
    /// Run inference on one frame, producing a `(channels, width, height)`
    /// tensor with height varying fastest inside each plane
    async fn estimate(&self, frame: &Frame) -> Result<Tensor, EyeError>;

    /// Shape of the tensors `estimate` returns
    fn output_shape(&self) -> TensorShape;

    /// Get estimator name
    fn name(&self) -> &str;

    /// Release the inference resource
    async fn shutdown(&self) -> Result<(), EyeError> {
        Ok(())
    }
}
