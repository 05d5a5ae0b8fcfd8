use std::ops::Range;

use rayon::ThreadPool;
use rayon::prelude::*;
use rowsift_error::{RowsiftResult, rowsift_bail, rowsift_err};
use rowsift_io::{ColumnSelector, NativeValue, RowBuffer, RowStore};

/// Reads a list of row ranges from a store into one contiguous buffer.
///
/// The output holds the rows of every range back to back, in range order. It is allocated once
/// and each store read writes straight into its own region of it.
///
/// With a thread pool, reads are spread over at most `workers` threads, further bounded by the
/// store's [`max_concurrent_reads`](RowStore::max_concurrent_reads). A store that cannot serve
/// concurrent reads is always read serially on the calling thread.
#[derive(Clone, Copy)]
pub struct BulkReader<'a> {
    pool: Option<&'a ThreadPool>,
    workers: usize,
}

impl<'a> BulkReader<'a> {
    /// A reader that issues every read on the calling thread.
    pub fn serial() -> Self {
        Self {
            pool: None,
            workers: 1,
        }
    }

    /// A reader that spreads reads over at most `workers` threads of `pool`.
    pub fn with_pool(pool: &'a ThreadPool, workers: usize) -> Self {
        Self {
            pool: Some(pool),
            workers: workers.max(1),
        }
    }

    /// The number of reads this reader would issue against `store` at once.
    pub fn concurrency<T: NativeValue, S: RowStore<T> + ?Sized>(&self, store: &S) -> usize {
        match self.pool {
            None => 1,
            Some(_) => self.workers.min(store.max_concurrent_reads()).max(1),
        }
    }

    /// Read `ranges` into a newly allocated buffer.
    pub fn read<T: NativeValue, S: RowStore<T> + ?Sized>(
        &self,
        store: &S,
        ranges: &[Range<usize>],
        columns: &ColumnSelector,
    ) -> RowsiftResult<RowBuffer<T>> {
        let width = check_ranges::<T, S>(store, ranges, columns)?;
        let rows = ranges.iter().map(|r| r.len()).sum();
        let mut out = RowBuffer::zeroed(rows, width);
        self.read_checked(store, ranges, columns, width, &mut out)?;
        Ok(out)
    }

    /// Read `ranges` into `out`, which must hold exactly the requested rows.
    ///
    /// On failure the contents of `out` are unspecified.
    pub fn read_into<T: NativeValue, S: RowStore<T> + ?Sized>(
        &self,
        store: &S,
        ranges: &[Range<usize>],
        columns: &ColumnSelector,
        out: &mut RowBuffer<T>,
    ) -> RowsiftResult<()> {
        let width = check_ranges::<T, S>(store, ranges, columns)?;
        let rows: usize = ranges.iter().map(|r| r.len()).sum();
        if out.row_width() != width || out.row_count() != rows {
            rowsift_bail!(
                ShapeMismatch: "Output buffer holds {} rows of width {} but {} rows of width {} were requested",
                out.row_count(),
                out.row_width(),
                rows,
                width
            );
        }
        self.read_checked(store, ranges, columns, width, out)
    }

    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(level = "debug", skip_all, fields(ranges = ranges.len()))
    )]
    fn read_checked<T: NativeValue, S: RowStore<T> + ?Sized>(
        &self,
        store: &S,
        ranges: &[Range<usize>],
        columns: &ColumnSelector,
        width: usize,
        out: &mut RowBuffer<T>,
    ) -> RowsiftResult<()> {
        // Split the output into one disjoint region per non-empty range.
        let mut rest = out.as_mut_slice();
        let mut reads = Vec::with_capacity(ranges.len());
        for range in ranges.iter().filter(|r| !r.is_empty()) {
            let (dest, tail) = std::mem::take(&mut rest).split_at_mut(range.len() * width);
            reads.push((range.clone(), dest));
            rest = tail;
        }

        let concurrency = self.concurrency::<T, S>(store);
        match self.pool {
            Some(pool) if concurrency > 1 && reads.len() > 1 => {
                log::debug!(
                    "Reading {} ranges with {} concurrent reads",
                    reads.len(),
                    concurrency
                );
                // Each group is read in order by one thread, bounding the reads in flight.
                let group_size = reads.len().div_ceil(concurrency);
                pool.install(|| {
                    reads.par_chunks_mut(group_size).try_for_each(|group| {
                        group
                            .iter_mut()
                            .try_for_each(|(range, dest)| read_one(store, range, columns, dest))
                    })
                })
            }
            _ => reads
                .iter_mut()
                .try_for_each(|(range, dest)| read_one(store, range, columns, dest)),
        }
    }
}

fn read_one<T: NativeValue, S: RowStore<T> + ?Sized>(
    store: &S,
    range: &Range<usize>,
    columns: &ColumnSelector,
    dest: &mut [T],
) -> RowsiftResult<()> {
    log::trace!("Reading rows {}..{}", range.start, range.end);
    store
        .read_range(range.clone(), columns, dest)
        .map_err(|err| {
            rowsift_err!(
                IoFailure: "Failed to read rows {}..{}: {}",
                range.start,
                range.end,
                err
            )
        })
}

/// Check every range lies within the store, returning the width of an output row.
fn check_ranges<T: NativeValue, S: RowStore<T> + ?Sized>(
    store: &S,
    ranges: &[Range<usize>],
    columns: &ColumnSelector,
) -> RowsiftResult<usize> {
    let len = store.len();
    for range in ranges {
        if range.start > range.end {
            rowsift_bail!("Malformed row range {}..{}", range.start, range.end);
        }
        if range.end > len {
            return Err(rowsift_err!(OutOfBounds: range.end - 1, 0, len));
        }
    }
    let width = columns.width_for(store.ndim(), store.row_width())?;
    if width == 0 {
        rowsift_bail!("Store rows must hold at least one value");
    }
    Ok(width)
}
