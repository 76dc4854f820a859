//! Captured camera frames

use crate::error::EyeError;
use bytes::Bytes;
use chrono::{DateTime, Utc};

/// 8-bit grayscale frame, row-major
#[derive(Debug, Clone)]
pub struct Frame {
    sequence: u64,
    pub captured_at: DateTime<Utc>,
    pub width: u32,
    pub height: u32,
    pub pixels: Bytes,
}

impl Frame {
    /// Create a frame stamped with the current time
    pub fn grayscale(width: u32, height: u32, pixels: impl Into<Bytes>) -> Result<Self, EyeError> {
        if width == 0 || height == 0 {
            return Err(EyeError::Frame("Frame dimensions cannot be zero".to_string()));
        }

        let expected = (width as u64)
            .checked_mul(height as u64)
            .and_then(|n| usize::try_from(n).ok())
            .ok_or_else(|| EyeError::Frame("Frame dimensions would overflow".to_string()))?;

        let pixels = pixels.into();
        if pixels.len() != expected {
            return Err(EyeError::Frame(format!(
                "Expected {} pixels for {}x{} frame, got {}",
                expected,
                width,
                height,
                pixels.len()
            )));
        }

        Ok(Self {
            sequence: 0,
            captured_at: Utc::now(),
            width,
            height,
            pixels,
        })
    }

    /// Capture order assigned on submission; 0 until submitted
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub(crate) fn set_sequence(&mut self, sequence: u64) {
        self.sequence = sequence;
    }

    /// Pixel at (x, y)
    pub fn pixel(&self, x: u32, y: u32) -> Option<u8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = y as usize * self.width as usize + x as usize;
        self.pixels.get(idx).copied()
    }
}
