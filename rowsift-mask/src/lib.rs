//! A mask flags the rows of a dataset that a caller wants to read.
//!
//! The selected rows of a [`Mask`] come out as the maximal runs of consecutive true positions,
//! which is already the compressed form the selection pipeline reads from.
#![deny(missing_docs)]

use std::fmt::{Debug, Formatter};
use std::ops::Range;
use std::sync::{Arc, OnceLock};

use arrow_buffer::{BooleanBuffer, BooleanBufferBuilder};
use itertools::Itertools;
use rowsift_error::{RowsiftResult, rowsift_bail, rowsift_err};

/// Represents a set of values that are all included, all excluded, or some mixture of both.
pub enum AllOr<T> {
    /// All values are included.
    All,
    /// No values are included.
    None,
    /// Some values are included.
    Some(T),
}

impl<T> Debug for AllOr<T>
where
    T: Debug,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::All => f.write_str("All"),
            Self::None => f.write_str("None"),
            Self::Some(v) => f.debug_tuple("Some").field(v).finish(),
        }
    }
}

impl<T> PartialEq for AllOr<T>
where
    T: PartialEq,
{
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::All, Self::All) => true,
            (Self::None, Self::None) => true,
            (Self::Some(lhs), Self::Some(rhs)) => lhs == rhs,
            _ => false,
        }
    }
}

impl<T> Eq for AllOr<T> where T: Eq {}

/// A boolean flag per row of a dataset.
///
/// The mask is cheap to clone. Masks with some, but not all, rows set compute their runs of
/// selected rows once, the first time they are requested.
#[derive(Clone, Debug)]
pub enum Mask {
    /// Every row is selected.
    AllTrue(usize),
    /// No row is selected.
    AllFalse(usize),
    /// Some rows are selected, represented as a [`BooleanBuffer`].
    Values(Arc<MaskValues>),
}

/// The values of a [`Mask`] that contains some true and some false rows.
#[derive(Debug)]
pub struct MaskValues {
    buffer: BooleanBuffer,
    ranges: OnceLock<Vec<Range<usize>>>,
    true_count: usize,
}

impl MaskValues {
    /// Returns the length of the mask.
    #[inline]
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Returns the number of selected rows.
    pub fn true_count(&self) -> usize {
        self.true_count
    }

    /// The maximal runs of selected rows, in ascending order.
    ///
    /// Runs are never empty and never adjacent: consecutive runs are separated by at least one
    /// unselected row.
    pub fn ranges(&self) -> &[Range<usize>] {
        self.ranges.get_or_init(|| {
            self.buffer
                .set_slices()
                .map(|(start, end)| start..end)
                .collect()
        })
    }
}

impl Mask {
    /// Create a new mask selecting every row.
    pub fn new_true(length: usize) -> Self {
        Self::AllTrue(length)
    }

    /// Create a new mask selecting no row.
    pub fn new_false(length: usize) -> Self {
        Self::AllFalse(length)
    }

    /// Create a new [`Mask`] from a [`BooleanBuffer`].
    pub fn from_buffer(buffer: BooleanBuffer) -> Self {
        let len = buffer.len();
        let true_count = buffer.count_set_bits();

        if true_count == 0 {
            return Self::AllFalse(len);
        }
        if true_count == len {
            return Self::AllTrue(len);
        }

        Self::Values(Arc::new(MaskValues {
            buffer,
            ranges: OnceLock::new(),
            true_count,
        }))
    }

    /// Create a new [`Mask`] of length `len` selecting the given row indices.
    ///
    /// The indices must be strictly increasing and in bounds.
    pub fn from_indices(len: usize, indices: &[usize]) -> RowsiftResult<Self> {
        if let Some((prev, next)) = indices.iter().tuple_windows().find(|(a, b)| a >= b) {
            rowsift_bail!(
                "Mask indices must be strictly increasing, got {} followed by {}",
                prev,
                next
            );
        }
        if let Some(&last) = indices.last() {
            if last >= len {
                return Err(rowsift_err!(OutOfBounds: last, 0, len));
            }
        }

        let mut buf = BooleanBufferBuilder::new(len);
        buf.append_n(len, false);
        indices.iter().for_each(|idx| buf.set_bit(*idx, true));
        Ok(Self::from_buffer(buf.finish()))
    }

    /// Returns the length of the mask (not the number of selected rows).
    #[inline]
    // It's confusing to provide is_empty, does it mean len == 0 or true_count == 0?
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        match &self {
            Self::AllTrue(len) => *len,
            Self::AllFalse(len) => *len,
            Self::Values(values) => values.len(),
        }
    }

    /// Get the number of selected rows.
    #[inline]
    pub fn true_count(&self) -> usize {
        match &self {
            Self::AllTrue(len) => *len,
            Self::AllFalse(_) => 0,
            Self::Values(values) => values.true_count(),
        }
    }

    /// Returns true if no row is selected.
    #[inline]
    pub fn all_false(&self) -> bool {
        self.true_count() == 0
    }

    /// The runs of selected rows, see [`MaskValues::ranges`].
    pub fn ranges(&self) -> AllOr<&[Range<usize>]> {
        match &self {
            Self::AllTrue(_) => AllOr::All,
            Self::AllFalse(_) => AllOr::None,
            Self::Values(values) => AllOr::Some(values.ranges()),
        }
    }
}

impl From<BooleanBuffer> for Mask {
    fn from(value: BooleanBuffer) -> Self {
        Self::from_buffer(value)
    }
}

impl From<&[bool]> for Mask {
    fn from(value: &[bool]) -> Self {
        Self::from_iter(value.iter().copied())
    }
}

impl FromIterator<bool> for Mask {
    fn from_iter<T: IntoIterator<Item = bool>>(iter: T) -> Self {
        Self::from_buffer(BooleanBuffer::from_iter(iter))
    }
}

#[cfg(test)]
mod test {
    use rowsift_error::ErrorKind;
    use rstest::rstest;

    use super::*;

    #[test]
    fn mask_all_true() {
        let mask = Mask::new_true(5);
        assert_eq!(mask.len(), 5);
        assert_eq!(mask.true_count(), 5);
        assert_eq!(mask.ranges(), AllOr::All);
    }

    #[test]
    fn mask_all_false() {
        let mask = Mask::new_false(5);
        assert_eq!(mask.len(), 5);
        assert!(mask.all_false());
        assert_eq!(mask.ranges(), AllOr::None);
    }

    #[test]
    fn mask_from() {
        let masks = [
            Mask::from_indices(5, &[0, 2, 3]).unwrap(),
            Mask::from_buffer(BooleanBuffer::from_iter([true, false, true, true, false])),
            Mask::from(&[true, false, true, true, false][..]),
        ];

        for mask in &masks {
            assert_eq!(mask.len(), 5);
            assert_eq!(mask.true_count(), 3);
            assert_eq!(mask.ranges(), AllOr::Some(&[0..1, 2..4][..]));
        }
    }

    #[test]
    fn ranges_are_maximal_runs() {
        let mask = Mask::from_iter((0..100).map(|i| i % 10 < 3 || i == 99));
        let AllOr::Some(ranges) = mask.ranges() else {
            panic!("expected a mixed mask");
        };
        assert_eq!(ranges.len(), 11);
        assert_eq!(ranges[0], 0..3);
        assert_eq!(ranges[9], 90..93);
        assert_eq!(ranges[10], 99..100);
        assert_eq!(
            ranges.iter().map(|r| r.len()).sum::<usize>(),
            mask.true_count()
        );
    }

    #[test]
    fn from_indices_collapses_full_and_empty() {
        assert!(matches!(
            Mask::from_indices(3, &[0, 1, 2]).unwrap(),
            Mask::AllTrue(3)
        ));
        assert!(matches!(Mask::from_indices(3, &[]).unwrap(), Mask::AllFalse(3)));
    }

    #[rstest]
    #[case(vec![2, 1])]
    #[case(vec![1, 1])]
    #[case(vec![0, 5])]
    fn from_indices_rejects(#[case] indices: Vec<usize>) {
        let err = Mask::from_indices(5, &indices).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }
}
