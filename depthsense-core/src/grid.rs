//! Dense 2D grids handed to rendering and decision code

use crate::error::GridError;
use serde::{Deserialize, Serialize};
use std::ops::{Index, IndexMut};

/// Rectangular row-major grid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    try_from = "RawGrid<T>",
    bound(deserialize = "T: Deserialize<'de>")
)]
pub struct Grid<T> {
    rows: usize,
    cols: usize,
    cells: Vec<T>,
}

/// Unchecked wire form of a `Grid`
#[derive(Deserialize)]
struct RawGrid<T> {
    rows: usize,
    cols: usize,
    cells: Vec<T>,
}

impl<T> TryFrom<RawGrid<T>> for Grid<T> {
    type Error = GridError;

    fn try_from(raw: RawGrid<T>) -> Result<Self, Self::Error> {
        let expected = raw
            .rows
            .checked_mul(raw.cols)
            .ok_or_else(|| GridError::DimensionOverflow(vec![raw.rows, raw.cols]))?;
        if raw.cells.len() != expected {
            return Err(GridError::LengthMismatch {
                expected,
                actual: raw.cells.len(),
            });
        }
        Ok(Self {
            rows: raw.rows,
            cols: raw.cols,
            cells: raw.cells,
        })
    }
}

/// Continuous values in [0, 1], rows indexed by the tensor's height axis
pub type NormalizedGrid = Grid<f64>;

/// Binary cells derived from a `NormalizedGrid`
pub type OccupancyGrid = Grid<u8>;

impl<T: Clone + Default> Grid<T> {
    /// Grid of `rows` x `cols` default cells
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            cells: vec![T::default(); rows * cols],
        }
    }

    /// Zero-sized grid
    pub fn empty() -> Self {
        Self {
            rows: 0,
            cols: 0,
            cells: Vec::new(),
        }
    }

    /// Copy out as nested rows
    pub fn to_nested(&self) -> Vec<Vec<T>> {
        self.iter_rows().map(|row| row.to_vec()).collect()
    }

    /// Apply `f` to every cell
    pub fn map<U, F>(&self, f: F) -> Grid<U>
    where
        F: Fn(&T) -> U,
    {
        Grid {
            rows: self.rows,
            cols: self.cols,
            cells: self.cells.iter().map(f).collect(),
        }
    }
}

impl<T> Grid<T> {
    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// (rows, cols)
    pub fn dims(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn get(&self, row: usize, col: usize) -> Option<&T> {
        if row < self.rows && col < self.cols {
            self.cells.get(row * self.cols + col)
        } else {
            None
        }
    }

    /// Cells of one row.
    ///
    /// # Panics
    ///
    /// Panics if `row >= self.rows()`. Use [`Grid::get`] for checked access.
    pub fn row(&self, row: usize) -> &[T] {
        assert!(row < self.rows, "grid row {} out of bounds", row);
        let start = row * self.cols;
        &self.cells[start..start + self.cols]
    }

    pub fn iter_rows(&self) -> impl Iterator<Item = &[T]> {
        // chunks() panics on a zero size; zero-column grids hold no cells anyway
        let cols = self.cols.max(1);
        self.cells.chunks(cols).take(self.rows)
    }

    pub fn cells(&self) -> &[T] {
        &self.cells
    }

    pub(crate) fn cells_mut(&mut self) -> &mut [T] {
        &mut self.cells
    }
}

impl<T> Index<(usize, usize)> for Grid<T> {
    type Output = T;

    fn index(&self, (row, col): (usize, usize)) -> &T {
        assert!(row < self.rows && col < self.cols, "grid index ({}, {}) out of bounds", row, col);
        &self.cells[row * self.cols + col]
    }
}

impl<T> IndexMut<(usize, usize)> for Grid<T> {
    fn index_mut(&mut self, (row, col): (usize, usize)) -> &mut T {
        assert!(row < self.rows && col < self.cols, "grid index ({}, {}) out of bounds", row, col);
        &mut self.cells[row * self.cols + col]
    }
}

impl OccupancyGrid {
    /// Number of occupied cells
    pub fn occupied(&self) -> usize {
        self.cells.iter().map(|&c| c as usize).sum()
    }
}
