use rowsift_error::{RowsiftResult, rowsift_bail};
use rowsift_mask::{AllOr, Mask};

use crate::{RangeSet, Selection};

/// Compress a selection into the minimal set of contiguous row ranges covering exactly its rows.
///
/// A single pass extends the current run while each index is one past the previous one and
/// closes it otherwise, so the output ranges are maximal: no two of them could be merged.
pub fn compress(selection: &Selection) -> RangeSet {
    let indices = selection.indices();
    let mut ranges = Vec::new();

    let mut start = indices[0];
    let mut stop = indices[0];
    for &idx in &indices[1..] {
        if idx != stop + 1 {
            ranges.push(start..stop + 1);
            start = idx;
        }
        stop = idx;
    }
    ranges.push(start..stop + 1);

    RangeSet::new_unchecked(ranges)
}

/// Validate a list of row indices and compress it, see [`compress`].
pub fn ranges_from_indices(indices: &[usize]) -> RowsiftResult<RangeSet> {
    Ok(compress(&Selection::try_new(indices.to_vec())?))
}

/// The ranges of rows selected by a mask, taken from its runs without expanding every index.
pub fn compress_mask(mask: &Mask) -> RowsiftResult<RangeSet> {
    match mask.ranges() {
        AllOr::None => rowsift_bail!("Mask of length {} selects no rows", mask.len()),
        AllOr::All if mask.len() == 0 => rowsift_bail!("Mask of length 0 selects no rows"),
        AllOr::All => Ok(RangeSet::new_unchecked(vec![0..mask.len()])),
        AllOr::Some(ranges) => Ok(RangeSet::new_unchecked(ranges.to_vec())),
    }
}

#[cfg(test)]
mod tests {
    use rowsift_error::ErrorKind;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(vec![0, 1, 2, 3, 5, 6, 7, 9, 11, 12, 13], vec![0..4, 5..8, 9..10, 11..14])]
    #[case(vec![7], vec![7..8])]
    #[case(vec![0, 2, 4], vec![0..1, 2..3, 4..5])]
    #[case(vec![3, 4, 5, 6, 12], vec![3..7, 12..13])]
    #[case((10..20).collect(), vec![10..20])]
    fn compresses(#[case] indices: Vec<usize>, #[case] expected: Vec<std::ops::Range<usize>>) {
        assert_eq!(ranges_from_indices(&indices).unwrap().into_inner(), expected);
    }

    #[test]
    fn largest_index_is_invalid() {
        let err = ranges_from_indices(&[usize::MAX - 1, usize::MAX]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert_eq!(
            ranges_from_indices(&[usize::MAX - 2, usize::MAX - 1])
                .unwrap()
                .into_inner(),
            vec![usize::MAX - 2..usize::MAX]
        );
    }

    #[rstest]
    #[case(vec![false, true, true, false, true], vec![1..3, 4..5])]
    #[case(vec![true, true, true], vec![0..3])]
    #[case(vec![true, false, false, false], vec![0..1])]
    fn compresses_masks(#[case] bools: Vec<bool>, #[case] expected: Vec<std::ops::Range<usize>>) {
        let mask = Mask::from_iter(bools);
        assert_eq!(compress_mask(&mask).unwrap().into_inner(), expected);
    }

    #[rstest]
    #[case(Mask::new_false(4))]
    #[case(Mask::new_true(0))]
    fn mask_selecting_nothing_is_invalid(#[case] mask: Mask) {
        assert_eq!(
            compress_mask(&mask).unwrap_err().kind(),
            ErrorKind::InvalidInput
        );
    }

    #[test]
    fn empty_selection_is_invalid() {
        assert_eq!(
            ranges_from_indices(&[]).unwrap_err().kind(),
            ErrorKind::InvalidInput
        );
    }
}
