//! Structured grid dimensions and the dense 2-D layer arrays decoded from the
//! output stream.

use crate::common::constants::{FLOAT_BYTES, LAYER_PREAMBLE_BYTES};
use crate::domain::{OutputError, OutputResult};
use faer::Mat;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct GridGeometry {
    layers: usize,
    rows: usize,
    cols: usize,
}

impl GridGeometry {
    /// Rejects empty grids and grids whose per-layer records for one instance
    /// overflow a `u64` byte offset. Every byte count derived from an accepted
    /// geometry is therefore exact.
    pub fn new(layers: usize, rows: usize, cols: usize) -> OutputResult<Self> {
        let invalid = || OutputError::InvalidGeometry { layers, rows, cols };
        if layers == 0 || rows == 0 || cols == 0 {
            return Err(invalid());
        }

        let cells = rows.checked_mul(cols).ok_or_else(invalid)?;
        cells.checked_mul(layers).ok_or_else(invalid)?;
        let grid_bytes = cells
            .checked_mul(FLOAT_BYTES)
            .and_then(|bytes| u64::try_from(bytes).ok())
            .ok_or_else(invalid)?;
        grid_bytes
            .checked_add(LAYER_PREAMBLE_BYTES as u64)
            .and_then(|block| block.checked_mul(layers as u64))
            .ok_or_else(invalid)?;

        Ok(Self { layers, rows, cols })
    }

    pub const fn layers(&self) -> usize {
        self.layers
    }

    pub const fn rows(&self) -> usize {
        self.rows
    }

    pub const fn cols(&self) -> usize {
        self.cols
    }

    pub const fn cell_count(&self) -> usize {
        self.rows * self.cols
    }

    /// Bytes of one layer payload without any preamble.
    pub const fn grid_bytes(&self) -> u64 {
        (FLOAT_BYTES * self.rows * self.cols) as u64
    }

    /// Bytes of one per-layer record: preamble followed by the layer payload.
    pub const fn layer_block_bytes(&self) -> u64 {
        LAYER_PREAMBLE_BYTES as u64 + self.grid_bytes()
    }

    pub const fn row_block_bytes(&self) -> u64 {
        (FLOAT_BYTES * self.cols) as u64
    }
}

/// One decoded layer, row-major on the wire, stored as a dense matrix.
#[derive(Debug, Clone)]
pub struct LayerGrid {
    values: Mat<f32>,
}

impl LayerGrid {
    pub fn from_row_major(rows: usize, cols: usize, values: &[f32]) -> Self {
        debug_assert_eq!(values.len(), rows * cols);
        Self {
            values: Mat::from_fn(rows, cols, |row, col| values[row * cols + col]),
        }
    }

    pub fn rows(&self) -> usize {
        self.values.nrows()
    }

    pub fn cols(&self) -> usize {
        self.values.ncols()
    }

    pub fn get(&self, row: usize, col: usize) -> Option<f32> {
        (row < self.rows() && col < self.cols()).then(|| self.values[(row, col)])
    }

    pub fn as_mat(&self) -> &Mat<f32> {
        &self.values
    }

    pub fn row(&self, row: usize) -> Option<Vec<f32>> {
        (row < self.rows()).then(|| (0..self.cols()).map(|col| self.values[(row, col)]).collect())
    }

    pub fn to_rows(&self) -> Vec<Vec<f32>> {
        (0..self.rows())
            .map(|row| (0..self.cols()).map(|col| self.values[(row, col)]).collect())
            .collect()
    }

    pub fn to_row_major(&self) -> Vec<f32> {
        self.to_rows().into_iter().flatten().collect()
    }
}

impl PartialEq for LayerGrid {
    fn eq(&self, other: &Self) -> bool {
        self.rows() == other.rows()
            && self.cols() == other.cols()
            && self.to_row_major() == other.to_row_major()
    }
}

impl Serialize for LayerGrid {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.to_rows().serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::{GridGeometry, LayerGrid};
    use crate::domain::OutputError;

    #[test]
    fn layout_units_follow_grid_dimensions() {
        let geometry = GridGeometry::new(3, 2, 5).expect("geometry should build");
        assert_eq!(geometry.cell_count(), 10);
        assert_eq!(geometry.grid_bytes(), 40);
        assert_eq!(geometry.layer_block_bytes(), 84);
        assert_eq!(geometry.row_block_bytes(), 20);
    }

    #[test]
    fn zero_dimensions_are_rejected() {
        for (layers, rows, cols) in [(0, 1, 1), (1, 0, 1), (1, 1, 0)] {
            let error = GridGeometry::new(layers, rows, cols).expect_err("geometry should fail");
            assert!(matches!(error, OutputError::InvalidGeometry { .. }));
        }
    }

    #[test]
    fn dimensions_overflowing_byte_offsets_are_rejected() {
        let cases = [
            (1, usize::MAX, 2),
            (1, 1 << 31, 1 << 31),
            (usize::MAX / 8, 1, 1),
        ];
        for (layers, rows, cols) in cases {
            let error = GridGeometry::new(layers, rows, cols)
                .expect_err("oversized geometry should fail");
            assert!(
                matches!(error, OutputError::InvalidGeometry { .. }),
                "{layers} x {rows} x {cols}: {error:?}"
            );
            assert_eq!(error.placeholder(), "INPUT.GRID_GEOMETRY");
        }

        let wide = GridGeometry::new(4, 1 << 20, 1 << 20).expect("large grid fits");
        assert_eq!(wide.grid_bytes(), 1 << 42);
        assert_eq!(wide.layer_block_bytes(), 44 + (1 << 42));
    }

    #[test]
    fn layer_grid_keeps_row_major_order() {
        let grid = LayerGrid::from_row_major(2, 3, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(grid.rows(), 2);
        assert_eq!(grid.cols(), 3);
        assert_eq!(grid.get(1, 0), Some(4.0));
        assert_eq!(grid.get(2, 0), None);
        assert_eq!(grid.row(0), Some(vec![1.0, 2.0, 3.0]));
        assert_eq!(grid.to_rows(), vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]]);
        assert_eq!(grid.as_mat()[(0, 2)], 3.0);
    }

    #[test]
    fn layer_grid_serializes_as_nested_rows() {
        let grid = LayerGrid::from_row_major(2, 2, &[1.5, 2.0, 3.0, 4.0]);
        let json = serde_json::to_string(&grid).expect("grid should serialize");
        assert_eq!(json, "[[1.5,2.0],[3.0,4.0]]");
    }
}
