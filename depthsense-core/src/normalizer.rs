//! Tensor-to-grid conversion
//!
//! A depth model emits a `(channels, width, height)` confidence tensor. The
//! normalizer reads the first plane, transposes it into a grid with one row
//! per height step and one column per width step, rescales the sampled
//! cells to [0, 1] with a global min-max, and thresholds the result into an
//! occupancy grid plus a scalar average.
//!
//! Only plane 0 is read. The depth models this crate targets emit a single
//! plane; a multi-plane tensor has its remaining planes ignored.

use crate::config::NormalizerConfig;
use crate::error::GridError;
use crate::grid::{Grid, NormalizedGrid, OccupancyGrid};
use crate::tensor::Tensor;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, warn};

/// Range of the sampled confidences
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum RangeKind {
    /// At least two distinct sampled values
    Spread { min: f64, max: f64 },
    /// Nothing sampled, or every sample identical. The grid is all zeros.
    Degenerate { value: Option<f64> },
}

impl RangeKind {
    pub fn is_degenerate(&self) -> bool {
        matches!(self, RangeKind::Degenerate { .. })
    }
}

/// Output of one conversion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionResult {
    pub normalized: NormalizedGrid,
    pub occupancy: OccupancyGrid,
    pub range: RangeKind,
    /// Cells that carried a usable confidence
    pub sampled_cells: usize,
    /// Occupied cells over the configured denominator
    pub average: f64,
}

impl ConversionResult {
    /// Result with zero-sized grids
    pub fn empty() -> Self {
        Self {
            normalized: Grid::empty(),
            occupancy: Grid::empty(),
            range: RangeKind::Degenerate { value: None },
            sampled_cells: 0,
            average: 0.0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.normalized.is_empty()
    }

    pub fn occupied(&self) -> usize {
        self.occupancy.occupied()
    }
}

/// Converts raw confidence tensors into normalized and occupancy grids
#[derive(Debug, Clone, Default)]
pub struct GridNormalizer {
    config: NormalizerConfig,
}

impl GridNormalizer {
    /// Create a normalizer from a validated config
    pub fn new(config: NormalizerConfig) -> Result<Self, GridError> {
        config.validate().map_err(GridError::Config)?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &NormalizerConfig {
        &self.config
    }

    /// Convert a tensor, failing on a malformed shape or short buffer
    pub fn convert(&self, tensor: &Tensor) -> Result<ConversionResult, GridError> {
        let start = Instant::now();

        let shape = tensor.shape()?;
        let plane_len = shape
            .plane_len()
            .ok_or_else(|| GridError::DimensionOverflow(tensor.dims().to_vec()))?;
        let data = tensor.data();
        if data.len() < plane_len {
            return Err(GridError::BufferTooShort {
                expected: plane_len,
                actual: data.len(),
            });
        }
        if shape.channels > 1 {
            debug!("Tensor has {} planes, reading plane 0 only", shape.channels);
        }

        let (width, height) = (shape.width, shape.height);
        let mut normalized: NormalizedGrid = Grid::new(height, width);

        let mut min = f64::MAX;
        let mut max = f64::MIN;
        let mut sampled_cells = 0usize;

        for i in 0..width {
            for j in 0..height {
                let confidence = data[shape.index(i, j)] as f64;
                // Non-positive and non-finite samples carry no information
                if !(confidence > 0.0 && confidence.is_finite()) {
                    continue;
                }
                normalized[(j, i)] = confidence;
                min = min.min(confidence);
                max = max.max(confidence);
                sampled_cells += 1;
            }
        }

        let range = if sampled_cells > 0 && max > min {
            RangeKind::Spread { min, max }
        } else {
            RangeKind::Degenerate {
                value: (sampled_cells > 0).then_some(min),
            }
        };

        match range {
            RangeKind::Spread { min, max } => {
                let gap = max - min;
                // Unsampled cells hold 0.0 and every sampled cell is > 0
                for cell in normalized.cells_mut() {
                    if *cell > 0.0 {
                        *cell = (*cell - min) / gap;
                    }
                }
            }
            RangeKind::Degenerate { value } => {
                warn!(
                    "Degenerate confidence range ({} sampled, value {:?}), emitting zero grid",
                    sampled_cells, value
                );
                normalized.cells_mut().fill(0.0);
            }
        }

        let occupancy = normalized.map(|&v| self.occupancy(v));
        let average = self.average(&occupancy);

        if normalized.len() != self.config.denominator() {
            debug!(
                "Grid has {} cells but average denominator is {}",
                normalized.len(),
                self.config.denominator()
            );
        }
        debug!("Conversion to {}x{} grid took {:?}", height, width, start.elapsed());

        Ok(ConversionResult {
            normalized,
            occupancy,
            range,
            sampled_cells,
            average,
        })
    }

    /// Convert a tensor, degrading to an empty result on failure
    pub fn convert_or_empty(&self, tensor: &Tensor) -> (ConversionResult, Option<GridError>) {
        match self.convert(tensor) {
            Ok(result) => (result, None),
            Err(e) => {
                warn!("Tensor conversion failed: {}", e);
                (ConversionResult::empty(), Some(e))
            }
        }
    }

    /// Occupancy of a single normalized value
    #[inline]
    pub fn occupancy(&self, value: f64) -> u8 {
        (value >= self.config.occupancy_threshold) as u8
    }

    /// Occupied cells over the configured denominator
    pub fn average(&self, occupancy: &OccupancyGrid) -> f64 {
        let denominator = self.config.denominator();
        if denominator == 0 {
            return 0.0;
        }
        occupancy.occupied() as f64 / denominator as f64
    }
}
