use rayon::ThreadPool;
use rayon::prelude::*;
use rowsift_error::{RowsiftResult, rowsift_bail};
use rowsift_io::{NativeValue, RowBuffer};

use crate::RangeSet;

/// Rows gathered per parallel task.
const GATHER_BLOCK_ROWS: usize = 4096;

/// Map every row of `original` to its position in a buffer read over `aligned`.
///
/// The buffer holds the rows of each aligned range back to back, so a row `r` inside the aligned
/// range starting at `lower` sits at `offset + (r - lower)`, where `offset` is the total width of
/// the aligned ranges before it.
pub fn extract_positions(aligned: &RangeSet, original: &RangeSet) -> RowsiftResult<Vec<usize>> {
    let mut positions = Vec::with_capacity(original.row_count());
    let mut outer = aligned.iter();
    let mut current = outer.next();
    let mut offset = 0;

    for range in original.iter() {
        // Advance to the aligned range that could contain this one.
        while let Some(a) = current.filter(|a| a.end <= range.start) {
            offset += a.len();
            current = outer.next();
        }
        let Some(a) = current.filter(|a| a.start <= range.start && range.end <= a.end) else {
            rowsift_bail!(
                "Range {}..{} is not covered by the aligned ranges {}",
                range.start,
                range.end,
                aligned
            );
        };
        positions.extend(offset + (range.start - a.start)..offset + (range.end - a.start));
    }
    Ok(positions)
}

/// Gathers the originally requested rows out of a buffer read over chunk-aligned ranges.
#[derive(Clone, Copy)]
pub struct RangeExtractor<'a> {
    pool: Option<&'a ThreadPool>,
    parallel_threshold: usize,
}

impl Default for RangeExtractor<'_> {
    fn default() -> Self {
        Self {
            pool: None,
            parallel_threshold: usize::MAX,
        }
    }
}

impl<'a> RangeExtractor<'a> {
    /// Gather on `pool` whenever more than `parallel_threshold` rows are extracted.
    pub fn with_pool(pool: &'a ThreadPool, parallel_threshold: usize) -> Self {
        Self {
            pool: Some(pool),
            parallel_threshold,
        }
    }

    /// Extract the rows of `original` from `buffer`, which holds the rows of `aligned`.
    ///
    /// The result holds exactly `original.row_count()` rows, in order. Rows read only to pad
    /// reads out to chunk boundaries are dropped.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(level = "debug", skip_all, fields(rows = original.row_count()))
    )]
    pub fn extract<T: NativeValue>(
        &self,
        buffer: &RowBuffer<T>,
        aligned: &RangeSet,
        original: &RangeSet,
    ) -> RowsiftResult<RowBuffer<T>> {
        if buffer.row_count() != aligned.row_count() {
            rowsift_bail!(
                ShapeMismatch: "Buffer holds {} rows but the aligned ranges {} cover {}",
                buffer.row_count(),
                aligned,
                aligned.row_count()
            );
        }
        let positions = extract_positions(aligned, original)?;

        match self.pool {
            Some(pool) if positions.len() > self.parallel_threshold && buffer.row_width() > 0 => {
                Ok(gather_parallel(pool, buffer, &positions))
            }
            _ => buffer.gather(&positions),
        }
    }
}

/// Extract the rows of `original` from `buffer` on the calling thread.
pub fn extract<T: NativeValue>(
    buffer: &RowBuffer<T>,
    aligned: &RangeSet,
    original: &RangeSet,
) -> RowsiftResult<RowBuffer<T>> {
    RangeExtractor::default().extract(buffer, aligned, original)
}

/// Positions must already be known to lie within `buffer`.
fn gather_parallel<T: NativeValue>(
    pool: &ThreadPool,
    buffer: &RowBuffer<T>,
    positions: &[usize],
) -> RowBuffer<T> {
    let width = buffer.row_width();
    let mut out = RowBuffer::zeroed(positions.len(), width);
    log::trace!("Gathering {} rows in parallel", positions.len());
    pool.install(|| {
        out.as_mut_slice()
            .par_chunks_mut(GATHER_BLOCK_ROWS * width)
            .zip(positions.par_chunks(GATHER_BLOCK_ROWS))
            .for_each(|(dest, block)| {
                for (row, &pos) in dest.chunks_exact_mut(width).zip(block) {
                    row.copy_from_slice(buffer.row(pos));
                }
            })
    });
    out
}
