use std::fmt::{Display, Formatter};
use std::ops::{Deref, Range};

use itertools::Itertools;
use rowsift_error::{RowsiftResult, rowsift_bail};

/// An ordered list of half-open row ranges.
///
/// Ranges are non-empty, sorted by start, pairwise disjoint and never adjacent: the end of one
/// range is always strictly below the start of the next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeSet(Vec<Range<usize>>);

impl RangeSet {
    /// Validate and wrap a list of ranges.
    pub fn try_new(ranges: Vec<Range<usize>>) -> RowsiftResult<Self> {
        if let Some(range) = ranges.iter().find(|r| r.start >= r.end) {
            rowsift_bail!("Range {}..{} is empty", range.start, range.end);
        }
        if let Some((prev, next)) = ranges
            .iter()
            .tuple_windows()
            .find(|(prev, next)| prev.end >= next.start)
        {
            rowsift_bail!(
                "Ranges {}..{} and {}..{} are unsorted, overlapping or adjacent",
                prev.start,
                prev.end,
                next.start,
                next.end
            );
        }
        Ok(Self(ranges))
    }

    /// Wrap ranges that are known to uphold the invariants.
    pub(crate) fn new_unchecked(ranges: Vec<Range<usize>>) -> Self {
        debug_assert!(
            ranges.iter().all(|r| r.start < r.end)
                && ranges.iter().tuple_windows().all(|(a, b)| a.end < b.start),
            "RangeSet invariants violated"
        );
        Self(ranges)
    }

    /// The number of rows covered by all ranges.
    pub fn row_count(&self) -> usize {
        self.0.iter().map(|r| r.len()).sum()
    }

    /// Every covered row, in order.
    pub fn positions(&self) -> impl Iterator<Item = usize> + '_ {
        self.0.iter().flat_map(|r| r.clone())
    }

    /// Whether `other` covers a subset of the rows this set covers.
    pub fn covers(&self, other: &RangeSet) -> bool {
        let mut outer = self.0.iter().peekable();
        other.0.iter().all(|inner| {
            while outer.next_if(|o| o.end <= inner.start).is_some() {}
            outer
                .peek()
                .is_some_and(|o| o.start <= inner.start && inner.end <= o.end)
        })
    }

    pub fn into_inner(self) -> Vec<Range<usize>> {
        self.0
    }
}

impl Deref for RangeSet {
    type Target = [Range<usize>];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Display for RangeSet {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "[")?;
        for (i, range) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}..{}", range.start, range.end)?;
        }
        write!(f, "]")
    }
}

impl TryFrom<Vec<Range<usize>>> for RangeSet {
    type Error = rowsift_error::RowsiftError;

    fn try_from(value: Vec<Range<usize>>) -> Result<Self, Self::Error> {
        Self::try_new(value)
    }
}
