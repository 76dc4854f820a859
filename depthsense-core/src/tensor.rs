//! Raw model output tensors

use crate::error::GridError;
use serde::{Deserialize, Serialize};

/// The (channels, width, height) view of a tensor shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TensorShape {
    pub channels: usize,
    pub width: usize,
    pub height: usize,
}

impl TensorShape {
    pub fn new(channels: usize, width: usize, height: usize) -> Self {
        Self { channels, width, height }
    }

    /// Interpret raw dimensions. Only the first three are read; trailing
    /// dimensions are ignored.
    pub fn from_dims(dims: &[usize]) -> Result<Self, GridError> {
        if dims.len() < 3 || dims[0] == 0 {
            return Err(GridError::InvalidShape { shape: dims.to_vec() });
        }
        Ok(Self::new(dims[0], dims[1], dims[2]))
    }

    /// Samples in one channel plane
    pub fn plane_len(&self) -> Option<usize> {
        self.width.checked_mul(self.height)
    }

    /// Samples across every channel
    pub fn total_len(&self) -> Option<usize> {
        self.plane_len()?.checked_mul(self.channels)
    }

    /// Flat position of (i, j) inside a plane: `i` walks width, `j` walks
    /// height, and height varies fastest.
    #[inline]
    pub fn index(&self, i: usize, j: usize) -> usize {
        i * self.height + j
    }

    pub fn dims(&self) -> [usize; 3] {
        [self.channels, self.width, self.height]
    }
}

/// Flat buffer of model samples plus its dimension list
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    dims: Vec<usize>,
    data: Vec<f32>,
}

impl Tensor {
    /// Wrap a buffer without checking it. Shape problems surface when the
    /// tensor is converted.
    pub fn new(dims: Vec<usize>, data: Vec<f32>) -> Self {
        Self { dims, data }
    }

    /// Build a `(channels, width, height)` tensor, requiring a buffer of
    /// exactly `channels * width * height` samples.
    pub fn from_shape(shape: TensorShape, data: Vec<f32>) -> Result<Self, GridError> {
        let expected = shape
            .total_len()
            .ok_or_else(|| GridError::DimensionOverflow(shape.dims().to_vec()))?;
        if data.len() != expected {
            return Err(GridError::LengthMismatch { expected, actual: data.len() });
        }
        Ok(Self {
            dims: shape.dims().to_vec(),
            data,
        })
    }

    /// Single-plane tensor of shape (1, width, height)
    pub fn single_plane(width: usize, height: usize, data: Vec<f32>) -> Result<Self, GridError> {
        Self::from_shape(TensorShape::new(1, width, height), data)
    }

    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn shape(&self) -> Result<TensorShape, GridError> {
        TensorShape::from_dims(&self.dims)
    }

    pub fn into_data(self) -> Vec<f32> {
        self.data
    }
}
