use std::fmt::{Display, Formatter};
use std::ops::Range;

use itertools::Either;
use rowsift_error::{RowsiftResult, rowsift_bail, rowsift_err};

/// Selects the columns of a two-dimensional store that a read returns.
///
/// One-dimensional stores have a single implicit column and ignore the selector.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ColumnSelector {
    /// Every column.
    #[default]
    All,
    /// A contiguous, non-empty run of columns.
    Range(Range<usize>),
    /// An explicit list of columns, returned in the given order.
    Indices(Vec<usize>),
}

impl ColumnSelector {
    /// The number of values each output row holds when reading a store of the given shape.
    pub fn width_for(&self, ndim: usize, row_width: usize) -> RowsiftResult<usize> {
        if ndim <= 1 {
            return Ok(row_width);
        }
        match self {
            ColumnSelector::All => Ok(row_width),
            ColumnSelector::Range(range) => {
                if range.start >= range.end {
                    rowsift_bail!("Empty column range {}..{}", range.start, range.end);
                }
                if range.end > row_width {
                    return Err(rowsift_err!(OutOfBounds: range.end - 1, 0, row_width));
                }
                Ok(range.len())
            }
            ColumnSelector::Indices(indices) => {
                if indices.is_empty() {
                    rowsift_bail!("Column selection must not be empty");
                }
                if let Some(&col) = indices.iter().find(|&&col| col >= row_width) {
                    return Err(rowsift_err!(OutOfBounds: col, 0, row_width));
                }
                Ok(indices.len())
            }
        }
    }

    /// Whether the selector returns whole rows, allowing a store to copy rows verbatim.
    pub fn selects_all(&self, ndim: usize, row_width: usize) -> bool {
        if ndim <= 1 {
            return true;
        }
        match self {
            ColumnSelector::All => true,
            ColumnSelector::Range(range) => range.start == 0 && range.end == row_width,
            ColumnSelector::Indices(indices) => {
                indices.len() == row_width && indices.iter().enumerate().all(|(i, &c)| i == c)
            }
        }
    }

    /// The selected column positions, in output order.
    ///
    /// The selector must have been validated with [`ColumnSelector::width_for`].
    pub fn columns_for(&self, ndim: usize, row_width: usize) -> impl Iterator<Item = usize> + '_ {
        if ndim <= 1 {
            return Either::Left(0..row_width);
        }
        match self {
            ColumnSelector::All => Either::Left(0..row_width),
            ColumnSelector::Range(range) => Either::Left(range.clone()),
            ColumnSelector::Indices(indices) => Either::Right(indices.iter().copied()),
        }
    }
}

impl Display for ColumnSelector {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ColumnSelector::All => write!(f, ":"),
            ColumnSelector::Range(range) => write!(f, "{}..{}", range.start, range.end),
            ColumnSelector::Indices(indices) => {
                write!(f, "[")?;
                for (i, col) in indices.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{col}")?;
                }
                write!(f, "]")
            }
        }
    }
}

impl From<Range<usize>> for ColumnSelector {
    fn from(value: Range<usize>) -> Self {
        ColumnSelector::Range(value)
    }
}

impl From<Vec<usize>> for ColumnSelector {
    fn from(value: Vec<usize>) -> Self {
        ColumnSelector::Indices(value)
    }
}

#[cfg(test)]
mod tests {
    use rowsift_error::ErrorKind;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(ColumnSelector::All, 3)]
    #[case(ColumnSelector::Range(1..3), 2)]
    #[case(ColumnSelector::Indices(vec![2, 0]), 2)]
    fn widths(#[case] selector: ColumnSelector, #[case] width: usize) {
        assert_eq!(selector.width_for(2, 3).unwrap(), width);
    }

    #[rstest]
    #[case(ColumnSelector::Range(2..2))]
    #[case(ColumnSelector::Range(1..4))]
    #[case(ColumnSelector::Indices(vec![]))]
    #[case(ColumnSelector::Indices(vec![0, 3]))]
    fn invalid_selectors(#[case] selector: ColumnSelector) {
        assert_eq!(
            selector.width_for(2, 3).unwrap_err().kind(),
            ErrorKind::InvalidInput
        );
    }

    #[test]
    fn one_dimensional_ignores_selector() {
        let selector = ColumnSelector::Indices(vec![5, 6]);
        assert_eq!(selector.width_for(1, 1).unwrap(), 1);
        assert!(selector.selects_all(1, 1));
        assert_eq!(selector.columns_for(1, 1).collect::<Vec<_>>(), vec![0]);
    }

    #[test]
    fn columns_in_selector_order() {
        let selector = ColumnSelector::Indices(vec![2, 0]);
        assert_eq!(selector.columns_for(2, 3).collect::<Vec<_>>(), vec![2, 0]);
        assert!(!selector.selects_all(2, 3));
        assert!(ColumnSelector::Range(0..3).selects_all(2, 3));
    }
}
