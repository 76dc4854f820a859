//! depthsense-eye: depth pipeline around depthsense-core
//!
//! Runs captured frames through a long-lived depth estimator, converts the
//! resulting tensors into display and occupancy grids, keeps the display in
//! capture order, and fires feedback when the scene is too close.

pub mod config;
pub mod error;
pub mod estimator;
pub mod feedback;
pub mod frame;
pub mod pipeline;
pub mod proximity;

pub use config::EyeConfig;
pub use error::EyeError;
pub use estimator::{DepthEstimator, LuminanceEstimator};
pub use feedback::{FeedbackSink, FeedbackStyle, LoggingFeedback};
pub use frame::Frame;
pub use pipeline::{DepthFrameResult, DepthPipeline, PipelineStats};
pub use proximity::{ProximityDecision, ProximityPolicy};
