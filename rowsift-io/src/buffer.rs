use std::ops::Range;
use std::slice::ChunksExact;

use rowsift_error::{RowsiftResult, rowsift_bail, rowsift_err};

use crate::NativeValue;

/// A contiguous block of rows, addressed by flat row offset.
///
/// Every row holds exactly `row_width` values, stored row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct RowBuffer<T> {
    values: Vec<T>,
    row_width: usize,
}

impl<T: NativeValue> RowBuffer<T> {
    /// Allocate a buffer holding `rows` default-valued rows.
    pub fn zeroed(rows: usize, row_width: usize) -> Self {
        Self {
            values: vec![T::default(); rows * row_width],
            row_width,
        }
    }

    /// Wrap existing row-major values.
    pub fn try_new(values: Vec<T>, row_width: usize) -> RowsiftResult<Self> {
        if row_width == 0 {
            rowsift_bail!("Row width must be positive");
        }
        if values.len() % row_width != 0 {
            rowsift_bail!(
                ShapeMismatch: "{} values do not divide into rows of width {}",
                values.len(),
                row_width
            );
        }
        Ok(Self { values, row_width })
    }

    /// The number of rows held.
    pub fn row_count(&self) -> usize {
        if self.row_width == 0 {
            0
        } else {
            self.values.len() / self.row_width
        }
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn row_width(&self) -> usize {
        self.row_width
    }

    /// The values of row `idx`.
    ///
    /// ## Panics
    ///
    /// Panics if the row is out of bounds.
    pub fn row(&self, idx: usize) -> &[T] {
        &self.values[idx * self.row_width..(idx + 1) * self.row_width]
    }

    /// Iterate the rows in order.
    pub fn rows(&self) -> ChunksExact<'_, T> {
        self.values.chunks_exact(self.row_width.max(1))
    }

    /// The mutable region backing the given rows.
    pub fn rows_mut(&mut self, rows: Range<usize>) -> RowsiftResult<&mut [T]> {
        let row_count = self.row_count();
        if rows.start > rows.end || rows.end > row_count {
            return Err(rowsift_err!(OutOfBounds: rows.end, 0, row_count));
        }
        Ok(&mut self.values[rows.start * self.row_width..rows.end * self.row_width])
    }

    pub fn as_slice(&self) -> &[T] {
        &self.values
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.values
    }

    pub fn into_vec(self) -> Vec<T> {
        self.values
    }

    /// Copy the rows at the given positions, in order, into a new buffer.
    pub fn gather(&self, positions: &[usize]) -> RowsiftResult<Self> {
        let row_count = self.row_count();
        if let Some(&pos) = positions.iter().find(|&&pos| pos >= row_count) {
            return Err(rowsift_err!(OutOfBounds: pos, 0, row_count));
        }

        let mut values = Vec::with_capacity(positions.len() * self.row_width);
        if self.row_width == 1 {
            values.extend(positions.iter().map(|&pos| self.values[pos]));
        } else {
            for &pos in positions {
                values.extend_from_slice(self.row(pos));
            }
        }
        Ok(Self {
            values,
            row_width: self.row_width,
        })
    }
}
