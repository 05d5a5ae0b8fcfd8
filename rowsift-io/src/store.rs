use std::ops::Range;
use std::sync::Arc;

use rowsift_error::{RowsiftResult, rowsift_bail, rowsift_err};

use crate::{ColumnSelector, NativeValue};

/// A chunked, read-only array of rows.
///
/// The only bulk operation a store needs to provide is reading one contiguous range of rows
/// straight into a destination slice. Callers pass the unfilled region of their output buffer
/// as `dest`, so no intermediate copy is required.
///
/// ## Thread Safety
///
/// Stores are shared by reference across reader threads. A store whose underlying handle cannot
/// serve concurrent reads reports so through [`RowStore::max_concurrent_reads`], and readers then
/// issue its reads one at a time.
pub trait RowStore<T: NativeValue>: Send + Sync {
    /// The number of rows in the store.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The number of rows in each storage chunk, or `None` if the store is not chunked.
    ///
    /// A chunk size of zero is treated as unchunked.
    fn chunk_size(&self) -> Option<usize>;

    /// The dimensionality of the stored array, 1 or 2.
    fn ndim(&self) -> usize {
        1
    }

    /// The number of values in one stored row.
    fn row_width(&self) -> usize {
        1
    }

    /// Read `rows` into `dest`, restricted to `columns` on two-dimensional stores.
    ///
    /// `dest` must hold exactly `rows.len()` rows of the selected width.
    fn read_range(
        &self,
        rows: Range<usize>,
        columns: &ColumnSelector,
        dest: &mut [T],
    ) -> RowsiftResult<()>;

    /// How many reads the store can safely serve at once. Defaults to one, serialising reads.
    fn max_concurrent_reads(&self) -> usize {
        1
    }
}

/// Validate a [`RowStore::read_range`] request, returning the width of each output row.
pub fn check_read_range(
    len: usize,
    ndim: usize,
    row_width: usize,
    rows: &Range<usize>,
    columns: &ColumnSelector,
    dest_len: usize,
) -> RowsiftResult<usize> {
    if rows.start > rows.end {
        rowsift_bail!("Malformed row range {}..{}", rows.start, rows.end);
    }
    if rows.end > len {
        return Err(rowsift_err!(OutOfBounds: rows.end, 0, len));
    }
    let width = columns.width_for(ndim, row_width)?;
    let expected = rows.len() * width;
    if dest_len != expected {
        rowsift_bail!(
            ShapeMismatch: "Destination holds {} values but rows {}..{} of width {} need {}",
            dest_len,
            rows.start,
            rows.end,
            width,
            expected
        );
    }
    Ok(width)
}

impl<T: NativeValue, S: RowStore<T> + ?Sized> RowStore<T> for Arc<S> {
    fn len(&self) -> usize {
        S::len(self)
    }

    fn chunk_size(&self) -> Option<usize> {
        S::chunk_size(self)
    }

    fn ndim(&self) -> usize {
        S::ndim(self)
    }

    fn row_width(&self) -> usize {
        S::row_width(self)
    }

    fn read_range(
        &self,
        rows: Range<usize>,
        columns: &ColumnSelector,
        dest: &mut [T],
    ) -> RowsiftResult<()> {
        S::read_range(self, rows, columns, dest)
    }

    fn max_concurrent_reads(&self) -> usize {
        S::max_concurrent_reads(self)
    }
}

impl<T: NativeValue, S: RowStore<T> + ?Sized> RowStore<T> for &S {
    fn len(&self) -> usize {
        S::len(self)
    }

    fn chunk_size(&self) -> Option<usize> {
        S::chunk_size(self)
    }

    fn ndim(&self) -> usize {
        S::ndim(self)
    }

    fn row_width(&self) -> usize {
        S::row_width(self)
    }

    fn read_range(
        &self,
        rows: Range<usize>,
        columns: &ColumnSelector,
        dest: &mut [T],
    ) -> RowsiftResult<()> {
        S::read_range(self, rows, columns, dest)
    }

    fn max_concurrent_reads(&self) -> usize {
        S::max_concurrent_reads(self)
    }
}
