//! Brightness-as-proximity estimator
//!
//! Treats brighter pixels as closer. Useful wherever a real depth model is
//! unavailable, and it produces tensors in exactly the layout a model does.

use super::DepthEstimator;
use crate::error::EyeError;
use crate::frame::Frame;
use async_trait::async_trait;
use depthsense_core::{Tensor, TensorShape};
use parking_lot::RwLock;
use tracing::{debug, info};

pub struct LuminanceEstimator {
    shape: TensorShape,
    is_loaded: RwLock<bool>,
}

impl LuminanceEstimator {
    /// Estimator emitting a single `width` x `height` plane
    pub fn new(width: usize, height: usize) -> Result<Self, EyeError> {
        if width == 0 || height == 0 {
            return Err(EyeError::Estimator("Output dimensions cannot be zero".to_string()));
        }
        width
            .checked_mul(height)
            .ok_or_else(|| EyeError::Estimator("Output dimensions would overflow".to_string()))?;

        info!("Luminance estimator ready with {}x{} output", width, height);
        Ok(Self {
            shape: TensorShape::new(1, width, height),
            is_loaded: RwLock::new(true),
        })
    }

    pub fn is_loaded(&self) -> bool {
        *self.is_loaded.read()
    }

    /// Nearest-neighbour resample of the frame into the output plane
    fn resample(&self, frame: &Frame) -> Vec<f32> {
        let (out_w, out_h) = (self.shape.width, self.shape.height);
        let mut data = vec![0.0f32; out_w * out_h];

        for i in 0..out_w {
            let src_x = ((i as u64 * frame.width as u64) / out_w as u64) as u32;
            let src_x = src_x.min(frame.width - 1);
            for j in 0..out_h {
                let src_y = ((j as u64 * frame.height as u64) / out_h as u64) as u32;
                let src_y = src_y.min(frame.height - 1);
                let value = frame.pixel(src_x, src_y).unwrap_or(0);
                data[self.shape.index(i, j)] = value as f32 / 255.0;
            }
        }

        data
    }
}

#[async_trait]
impl DepthEstimator for LuminanceEstimator {
    async fn estimate(&self, frame: &Frame) -> Result<Tensor, EyeError> {
        if !self.is_loaded() {
            return Err(EyeError::Estimator("Estimator has been shut down".to_string()));
        }
        debug!("Estimating depth for frame {}", frame.sequence());

        let data = self.resample(frame);
        Ok(Tensor::from_shape(self.shape, data)?)
    }

    fn output_shape(&self) -> TensorShape {
        self.shape
    }

    fn name(&self) -> &str {
        "luminance"
    }

    async fn shutdown(&self) -> Result<(), EyeError> {
        *self.is_loaded.write() = false;
        info!("Luminance estimator shut down");
        Ok(())
    }
}
