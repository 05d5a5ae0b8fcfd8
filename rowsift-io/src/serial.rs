use std::ops::Range;

use parking_lot::Mutex;
use rowsift_error::RowsiftResult;

use crate::{ColumnSelector, NativeValue, RowStore};

/// An adapter for handles that must not serve concurrent reads.
///
/// Every read takes a lock, so reads through the same `SerialStore` never overlap even when
/// several readers share it, and the store advertises a concurrent-read capacity of one.
#[derive(Debug)]
pub struct SerialStore<S> {
    store: S,
    lock: Mutex<()>,
}

impl<S> SerialStore<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            lock: Mutex::new(()),
        }
    }

    pub fn into_inner(self) -> S {
        self.store
    }
}

impl<T: NativeValue, S: RowStore<T>> RowStore<T> for SerialStore<S> {
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
        let _guard = self.lock.lock();
        self.store.read_range(rows, columns, dest)
    }

    fn max_concurrent_reads(&self) -> usize {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InMemoryStore;

    #[test]
    fn forces_serial_reads() {
        let store = InMemoryStore::new(vec![1u16, 2, 3]).with_max_concurrent_reads(16);
        let serial = SerialStore::new(store);
        assert_eq!(RowStore::<u16>::max_concurrent_reads(&serial), 1);

        let mut dest = vec![0u16; 2];
        serial.read_range(1..3, &ColumnSelector::All, &mut dest).unwrap();
        assert_eq!(dest, vec![2, 3]);
    }
}
