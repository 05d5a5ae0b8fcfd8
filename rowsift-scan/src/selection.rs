use itertools::Itertools;
use rowsift_error::{RowsiftError, RowsiftResult, rowsift_bail, rowsift_err};
use rowsift_mask::Mask;

use crate::{RangeSet, compress, compress_mask};

/// A non-empty, strictly increasing list of row indices.
///
/// Every stage of the pipeline relies on this ordering, so it is checked once on construction
/// and never again. `usize::MAX` is never a valid row, since no range can end past it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection(Vec<usize>);

impl Selection {
    /// Validate and wrap a list of row indices.
    pub fn try_new(indices: Vec<usize>) -> RowsiftResult<Self> {
        let Some(&last) = indices.last() else {
            rowsift_bail!("Selection must contain at least one row index");
        };
        if let Some((pos, (prev, next))) = indices
            .iter()
            .tuple_windows()
            .find_position(|(prev, next)| prev >= next)
        {
            if prev == next {
                rowsift_bail!(
                    "Selection contains duplicate row index {} at position {}",
                    next,
                    pos + 1
                );
            }
            rowsift_bail!(
                "Selection is not sorted: row index {} follows {} at position {}",
                next,
                prev,
                pos + 1
            );
        }
        if last == usize::MAX {
            return Err(rowsift_err!(OutOfBounds: last, 0, usize::MAX));
        }
        Ok(Self(indices))
    }

    pub fn indices(&self) -> &[usize] {
        &self.0
    }

    /// The number of selected rows.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn last(&self) -> usize {
        self.0[self.0.len() - 1]
    }

    /// Check every index addresses a row of an array of length `len`.
    pub fn check_bounds(&self, len: usize) -> RowsiftResult<()> {
        let last = self.last();
        if last >= len {
            return Err(rowsift_err!(OutOfBounds: last, 0, len));
        }
        Ok(())
    }
}

impl TryFrom<Vec<usize>> for Selection {
    type Error = RowsiftError;

    fn try_from(value: Vec<usize>) -> Result<Self, Self::Error> {
        Self::try_new(value)
    }
}

/// The rows a caller asks an [`IndexedReader`](crate::IndexedReader) for.
#[derive(Debug, Clone, Copy)]
pub enum RowSelector<'a> {
    /// Raw row indices, validated on use.
    Indices(&'a [usize]),
    /// An already validated selection.
    Selection(&'a Selection),
    /// A boolean mask over every row of the store.
    Mask(&'a Mask),
}

impl RowSelector<'_> {
    /// Resolve into the compressed ranges of a selection over an array of `len` rows.
    ///
    /// Masks go straight from their runs to ranges, index lists are validated and compressed.
    pub fn to_ranges(&self, len: usize) -> RowsiftResult<RangeSet> {
        match *self {
            RowSelector::Indices(indices) => {
                let selection = Selection::try_new(indices.to_vec())?;
                selection.check_bounds(len)?;
                Ok(compress(&selection))
            }
            RowSelector::Selection(selection) => {
                selection.check_bounds(len)?;
                Ok(compress(selection))
            }
            RowSelector::Mask(mask) => {
                if mask.len() != len {
                    rowsift_bail!(
                        ShapeMismatch: "Mask of length {} cannot select from {} rows",
                        mask.len(),
                        len
                    );
                }
                compress_mask(mask)
            }
        }
    }
}

impl<'a> From<&'a [usize]> for RowSelector<'a> {
    fn from(value: &'a [usize]) -> Self {
        RowSelector::Indices(value)
    }
}

impl<'a> From<&'a Vec<usize>> for RowSelector<'a> {
    fn from(value: &'a Vec<usize>) -> Self {
        RowSelector::Indices(value)
    }
}

impl<'a> From<&'a Selection> for RowSelector<'a> {
    fn from(value: &'a Selection) -> Self {
        RowSelector::Selection(value)
    }
}

impl<'a> From<&'a Mask> for RowSelector<'a> {
    fn from(value: &'a Mask) -> Self {
        RowSelector::Mask(value)
    }
}
