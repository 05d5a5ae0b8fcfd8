use std::ops::Range;
use std::sync::Arc;

use rowsift_error::RowsiftResult;
use rowsift_metrics::{Counter, Histogram, RowsiftMetrics};

use crate::{ColumnSelector, NativeValue, RowStore};

/// An adapter that records every read issued against the wrapped store.
///
/// Records `rowsift.io.reads` (store calls), `rowsift.io.rows` (rows transferred) and the
/// `rowsift.io.read.rows` histogram of rows per call.
pub struct InstrumentedStore<S> {
    store: S,
    reads: Arc<Counter>,
    rows: Arc<Counter>,
    read_rows: Arc<Histogram>,
}

impl<S> InstrumentedStore<S> {
    pub fn new(store: S, metrics: &RowsiftMetrics) -> Self {
        Self {
            store,
            reads: metrics.counter("rowsift.io.reads"),
            rows: metrics.counter("rowsift.io.rows"),
            read_rows: metrics.histogram("rowsift.io.read.rows"),
        }
    }

    /// The number of reads issued so far.
    pub fn read_count(&self) -> i64 {
        self.reads.count()
    }

    /// The number of rows read so far.
    pub fn row_count(&self) -> i64 {
        self.rows.count()
    }

    pub fn inner(&self) -> &S {
        &self.store
    }
}

impl<T: NativeValue, S: RowStore<T>> RowStore<T> for InstrumentedStore<S> {
    fn len(&self) -> usize {
        self.store.len()
    }

    fn chunk_size(&self) -> Option<usize> {
        self.store.chunk_size()
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
        let width = i64::try_from(rows.len()).unwrap_or(i64::MAX);
        self.store.read_range(rows, columns, dest)?;
        self.reads.inc();
        self.rows.add(width);
        self.read_rows.update(width);
        Ok(())
    }

    fn max_concurrent_reads(&self) -> usize {
        self.store.max_concurrent_reads()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InMemoryStore;

    #[test]
    fn counts_reads_and_rows() {
        let metrics = RowsiftMetrics::default();
        let store = InstrumentedStore::new(InMemoryStore::new((0..8i32).collect()), &metrics);

        let mut dest = vec![0i32; 3];
        store.read_range(0..3, &ColumnSelector::All, &mut dest).unwrap();
        store.read_range(5..8, &ColumnSelector::All, &mut dest).unwrap();

        assert_eq!(store.read_count(), 2);
        assert_eq!(store.row_count(), 6);
        assert_eq!(metrics.metrics().counter_total("rowsift.io.reads"), 2);
    }
}
