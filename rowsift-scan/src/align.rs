use std::fmt::{Display, Formatter};
use std::ops::{Deref, Range};

use rowsift_error::{RowsiftResult, rowsift_bail, rowsift_err};
use rowsift_io::{NativeValue, RowStore};

use crate::RangeSet;

/// How a store partitions its rows into fixed-size chunks.
///
/// Every chunk holds `chunk_size` rows except the last, which ends at `array_length`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkGrid {
    chunk_size: usize,
    array_length: usize,
}

impl ChunkGrid {
    pub fn try_new(chunk_size: usize, array_length: usize) -> RowsiftResult<Self> {
        if chunk_size == 0 {
            rowsift_bail!("Chunk size must be positive");
        }
        if array_length == 0 {
            rowsift_bail!("Array length must be positive");
        }
        Ok(Self {
            chunk_size,
            array_length,
        })
    }

    /// The grid of a store, or `None` if the store is unchunked or empty.
    pub fn for_store<T: NativeValue, S: RowStore<T> + ?Sized>(store: &S) -> Option<Self> {
        let chunk_size = store.chunk_size().filter(|&c| c > 0)?;
        Self::try_new(chunk_size, store.len()).ok()
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn array_length(&self) -> usize {
        self.array_length
    }

    pub fn chunk_count(&self) -> usize {
        self.array_length.div_ceil(self.chunk_size)
    }

    /// The start of the chunk containing `row`.
    #[inline]
    pub fn chunk_start(&self, row: usize) -> usize {
        (row / self.chunk_size) * self.chunk_size
    }

    /// The end of the chunk that `end` falls into, capped at the array length.
    #[inline]
    pub fn chunk_end(&self, end: usize) -> usize {
        (end.div_ceil(self.chunk_size) * self.chunk_size).min(self.array_length)
    }

    /// Whether both bounds of `range` already sit on chunk boundaries.
    pub fn is_aligned(&self, range: &Range<usize>) -> bool {
        self.chunk_start(range.start) == range.start && self.chunk_end(range.end) == range.end
    }
}

/// A [`RangeSet`] whose bounds fall on the chunk boundaries of a [`ChunkGrid`].
///
/// Only the final upper bound may sit off the grid, where it is capped by the array length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlignedRanges {
    ranges: RangeSet,
    grid: ChunkGrid,
}

impl AlignedRanges {
    pub fn ranges(&self) -> &RangeSet {
        &self.ranges
    }

    pub fn grid(&self) -> &ChunkGrid {
        &self.grid
    }
}

impl Display for AlignedRanges {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} in chunks of {}", self.ranges, self.grid.chunk_size)
    }
}

impl Deref for AlignedRanges {
    type Target = RangeSet;

    fn deref(&self) -> &Self::Target {
        &self.ranges
    }
}

/// Widen every range to the chunks it touches and merge ranges whose chunks touch or overlap.
///
/// The result covers every row of `ranges`, and each of its ranges is one contiguous run of whole
/// chunks that can be fetched with a single read.
pub fn align(ranges: &RangeSet, grid: &ChunkGrid) -> RowsiftResult<AlignedRanges> {
    if let Some(last) = ranges.last() {
        if last.end > grid.array_length {
            return Err(rowsift_err!(
                OutOfBounds: last.end - 1,
                0,
                grid.array_length
            ));
        }
    }

    let mut aligned: Vec<Range<usize>> = Vec::with_capacity(ranges.len());
    for range in ranges.iter() {
        let lower = grid.chunk_start(range.start);
        let upper = grid.chunk_end(range.end);

        match aligned.last_mut() {
            // A lower bound at or below the previous upper bound shares a chunk boundary with it.
            Some(prev) if lower <= prev.end => prev.end = prev.end.max(upper),
            _ => aligned.push(lower..upper),
        }
    }

    log::trace!(
        "Aligned {} ranges to {} chunk ranges of {} rows",
        ranges.len(),
        aligned.len(),
        grid.chunk_size
    );

    Ok(AlignedRanges {
        ranges: RangeSet::new_unchecked(aligned),
        grid: *grid,
    })
}

#[cfg(test)]
mod tests {
    use rowsift_error::ErrorKind;
    use rstest::rstest;

    use super::*;

    fn ranges(ranges: Vec<Range<usize>>) -> RangeSet {
        RangeSet::try_new(ranges).unwrap()
    }

    #[rstest]
    #[case(vec![3..7, 12..13], 5, 20, vec![0..15])]
    #[case(vec![1..2, 11..12], 5, 20, vec![0..5, 10..15])]
    #[case(vec![0..1, 5..6], 5, 20, vec![0..10])]
    #[case(vec![18..20], 5, 20, vec![15..20])]
    #[case(vec![16..17], 5, 17, vec![15..17])]
    #[case(vec![5..10], 5, 20, vec![5..10])]
    #[case(vec![0..1, 3..4, 7..8], 100, 1000, vec![0..100])]
    fn aligns(
        #[case] input: Vec<Range<usize>>,
        #[case] chunk_size: usize,
        #[case] array_length: usize,
        #[case] expected: Vec<Range<usize>>,
    ) {
        let grid = ChunkGrid::try_new(chunk_size, array_length).unwrap();
        let aligned = align(&ranges(input), &grid).unwrap();
        assert_eq!(aligned.ranges().clone().into_inner(), expected);
    }

    #[test]
    fn full_chunk_is_its_own_aligned_range() {
        let grid = ChunkGrid::try_new(8, 64).unwrap();
        let aligned = align(&ranges(vec![16..24]), &grid).unwrap();
        assert_eq!(aligned.len(), 1);
        assert_eq!(aligned[0], 16..24);
        assert!(grid.is_aligned(&aligned[0]));
    }

    #[test]
    fn display_names_the_chunk_size() {
        let grid = ChunkGrid::try_new(5, 20).unwrap();
        let aligned = align(&ranges(vec![3..7, 12..13]), &grid).unwrap();
        assert_eq!(aligned.to_string(), "[0..15] in chunks of 5");
        assert_eq!(format!("{aligned}"), format!("{} in chunks of 5", aligned.ranges()));
    }

    #[test]
    fn range_past_array_end() {
        let grid = ChunkGrid::try_new(4, 10).unwrap();
        let err = align(&ranges(vec![8..11]), &grid).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[rstest]
    #[case(0, 10)]
    #[case(4, 0)]
    fn invalid_grids(#[case] chunk_size: usize, #[case] array_length: usize) {
        assert!(ChunkGrid::try_new(chunk_size, array_length).is_err());
    }

    #[test]
    fn grid_arithmetic() {
        let grid = ChunkGrid::try_new(5, 17).unwrap();
        assert_eq!(grid.chunk_count(), 4);
        assert_eq!(grid.chunk_start(9), 5);
        assert_eq!(grid.chunk_end(11), 15);
        assert_eq!(grid.chunk_end(16), 17);
        assert!(grid.is_aligned(&(15..17)));
        assert!(!grid.is_aligned(&(14..17)));
    }
}
