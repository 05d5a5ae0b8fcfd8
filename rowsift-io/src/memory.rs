use std::ops::Range;

use rowsift_error::{RowsiftResult, rowsift_bail};

use crate::{ColumnSelector, NativeValue, RowStore, check_read_range};

/// A [`RowStore`] over values already held in memory.
///
/// Chunking is purely nominal here, but lets in-memory data stand in for a chunked dataset.
#[derive(Debug, Clone)]
pub struct InMemoryStore<T> {
    values: Vec<T>,
    ndim: usize,
    row_width: usize,
    chunk_size: Option<usize>,
    max_concurrent_reads: usize,
}

impl<T: NativeValue> InMemoryStore<T> {
    /// A one-dimensional, unchunked store.
    pub fn new(values: Vec<T>) -> Self {
        Self {
            values,
            ndim: 1,
            row_width: 1,
            chunk_size: None,
            max_concurrent_reads: usize::MAX,
        }
    }

    /// A two-dimensional store of row-major values with `row_width` columns.
    pub fn try_new_2d(values: Vec<T>, row_width: usize) -> RowsiftResult<Self> {
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
        Ok(Self {
            values,
            ndim: 2,
            row_width,
            chunk_size: None,
            max_concurrent_reads: usize::MAX,
        })
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = Some(chunk_size);
        self
    }

    pub fn with_max_concurrent_reads(mut self, max_concurrent_reads: usize) -> Self {
        self.max_concurrent_reads = max_concurrent_reads.max(1);
        self
    }

    pub fn values(&self) -> &[T] {
        &self.values
    }
}

impl<T: NativeValue> RowStore<T> for InMemoryStore<T> {
    fn len(&self) -> usize {
        self.values.len() / self.row_width
    }

    fn chunk_size(&self) -> Option<usize> {
        self.chunk_size
    }

    fn ndim(&self) -> usize {
        self.ndim
    }

    fn row_width(&self) -> usize {
        self.row_width
    }

    fn read_range(
        &self,
        rows: Range<usize>,
        columns: &ColumnSelector,
        dest: &mut [T],
    ) -> RowsiftResult<()> {
        let width = check_read_range(
            self.len(),
            self.ndim,
            self.row_width,
            &rows,
            columns,
            dest.len(),
        )?;
        let src = &self.values[rows.start * self.row_width..rows.end * self.row_width];

        if columns.selects_all(self.ndim, self.row_width) {
            dest.copy_from_slice(src);
            return Ok(());
        }

        for (src_row, dest_row) in src
            .chunks_exact(self.row_width)
            .zip(dest.chunks_exact_mut(width))
        {
            for (slot, col) in dest_row
                .iter_mut()
                .zip(columns.columns_for(self.ndim, self.row_width))
            {
                *slot = src_row[col];
            }
        }
        Ok(())
    }

    fn max_concurrent_reads(&self) -> usize {
        self.max_concurrent_reads
    }
}
