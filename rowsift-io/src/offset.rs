use std::ops::Range;

use rowsift_error::{RowsiftResult, rowsift_err};

use crate::{ColumnSelector, NativeValue, RowStore};

/// An adapter that views a store from a fixed row offset onward.
///
/// The chunk grid is only preserved when the offset falls on a chunk boundary, otherwise the
/// view reports itself as unchunked.
#[derive(Debug, Clone)]
pub struct OffsetStore<S> {
    store: S,
    offset: usize,
}

impl<S> OffsetStore<S> {
    pub fn try_new<T: NativeValue>(store: S, offset: usize) -> RowsiftResult<Self>
    where
        S: RowStore<T>,
    {
        if offset > store.len() {
            return Err(rowsift_err!(OutOfBounds: offset, 0, store.len()));
        }
        Ok(Self { store, offset })
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn into_inner(self) -> S {
        self.store
    }
}

impl<T: NativeValue, S: RowStore<T>> RowStore<T> for OffsetStore<S> {
    fn len(&self) -> usize {
        self.store.len() - self.offset
    }

    fn chunk_size(&self) -> Option<usize> {
        self.store
            .chunk_size()
            .filter(|&chunk| chunk > 0 && self.offset % chunk == 0)
    }

    fn ndim(&self) -> usize {
        self.store.ndim()
    }

    fn row_width(&self) -> usize {
        self.store.row_width()
    }

    fn read_range(
        &self,
        rows: Range<usize>,
        columns: &ColumnSelector,
        dest: &mut [T],
    ) -> RowsiftResult<()> {
        self.store.read_range(
            rows.start + self.offset..rows.end + self.offset,
            columns,
            dest,
        )
    }

    fn max_concurrent_reads(&self) -> usize {
        self.store.max_concurrent_reads()
    }
}
