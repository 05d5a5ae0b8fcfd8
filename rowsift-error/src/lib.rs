#![deny(missing_docs)]

//! Error handling for the rowsift crates.
//!
//! Every failure surfaced by a selection read falls into one of three [`ErrorKind`]s: invalid
//! input detected before any I/O, a failure of the backing store, or a mismatch between an
//! output buffer and the rows requested.

use std::backtrace::Backtrace;
use std::borrow::Cow;
use std::fmt::{Debug, Display, Formatter};
use std::ops::Deref;
use std::{env, fmt, io};

/// A string that can be used as an error message.
#[derive(Debug)]
pub struct ErrString(Cow<'static, str>);

#[allow(clippy::fallible_impl_from)]
impl<T> From<T> for ErrString
where
    T: Into<Cow<'static, str>>,
{
    #[allow(clippy::panic)]
    fn from(msg: T) -> Self {
        if env::var("ROWSIFT_PANIC_ON_ERR").as_deref().unwrap_or("") == "1" {
            panic!("{}\nBacktrace:\n{}", msg.into(), Backtrace::capture());
        } else {
            Self(msg.into())
        }
    }
}

impl AsRef<str> for ErrString {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Deref for ErrString {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Display for ErrString {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

/// The coarse category of a [`RowsiftError`].
///
/// `InvalidInput` and `ShapeMismatch` are always raised before any read is issued against the
/// backing store, so no partial side effects exist when they are returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The selection, range, grid or option was malformed.
    InvalidInput,
    /// The backing store failed to produce the requested rows.
    IoFailure,
    /// An output buffer does not match the rows requested.
    ShapeMismatch,
}

// Alias so `thiserror` does not auto-detect the field as a backtrace and emit a `provide`
// method, which requires the unstable `error_generic_member_access` feature.
type CapturedBacktrace = Backtrace;

/// The top-level error type for rowsift.
#[derive(thiserror::Error)]
#[non_exhaustive]
pub enum RowsiftError {
    /// A selection, range or argument was malformed.
    #[error("{0}\nBacktrace:\n{1}")]
    InvalidInput(ErrString, CapturedBacktrace),
    /// An index is out of bounds.
    #[error("index {0} out of bounds from {1} to {2}\nBacktrace:\n{3}")]
    OutOfBounds(usize, usize, usize, CapturedBacktrace),
    /// An output buffer does not hold exactly the requested rows.
    #[error("{0}\nBacktrace:\n{1}")]
    ShapeMismatch(ErrString, CapturedBacktrace),
    /// The backing store failed a read.
    #[error("{0}\nBacktrace:\n{1}")]
    IoFailure(ErrString, CapturedBacktrace),
    /// A wrapper for other errors, carrying additional context.
    #[error("{0}: {1}")]
    Context(ErrString, #[source] Box<RowsiftError>),
    /// A wrapper for IO errors.
    #[error(transparent)]
    IOError(#[from] io::Error),
}

impl RowsiftError {
    /// Adds additional context to an error.
    pub fn with_context<T: Into<ErrString>>(self, msg: T) -> Self {
        RowsiftError::Context(msg.into(), Box::new(self))
    }

    /// Returns the category of this error, looking through any context wrappers.
    pub fn kind(&self) -> ErrorKind {
        match self {
            RowsiftError::InvalidInput(..) | RowsiftError::OutOfBounds(..) => {
                ErrorKind::InvalidInput
            }
            RowsiftError::ShapeMismatch(..) => ErrorKind::ShapeMismatch,
            RowsiftError::IoFailure(..) | RowsiftError::IOError(..) => ErrorKind::IoFailure,
            RowsiftError::Context(_, inner) => inner.kind(),
        }
    }
}

impl Debug for RowsiftError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(self, f)
    }
}

/// A type alias for Results that return [`RowsiftError`]s as their error type.
pub type RowsiftResult<T> = Result<T, RowsiftError>;

/// A trait for unwrapping a value, panicking with a [`RowsiftError`] on failure.
pub trait RowsiftUnwrap {
    /// The type of the value being unwrapped.
    type Output;

    /// Returns the value of the result if it is Ok, otherwise panics with the error.
    /// Should be called only in contexts where the error condition represents a bug
    /// (programmer error).
    fn rowsift_unwrap(self) -> Self::Output;
}

/// A trait for expect-ing a value, panicking with a [`RowsiftError`] that carries the message.
pub trait RowsiftExpect {
    /// The type of the value being expected.
    type Output;

    /// Returns the value of the result if it is Ok, otherwise panics with the error.
    /// Should be called only in contexts where the error condition represents a bug
    /// (programmer error).
    fn rowsift_expect(self, msg: &str) -> Self::Output;
}

/// A convenient macro for creating a [`RowsiftError`].
///
/// Without a variant prefix the error is an [`RowsiftError::InvalidInput`].
#[macro_export]
macro_rules! rowsift_err {
    (OutOfBounds: $idx:expr, $start:expr, $stop:expr) => {{
        use std::backtrace::Backtrace;
        $crate::__private::must_use(
            $crate::RowsiftError::OutOfBounds($idx, $start, $stop, Backtrace::capture())
        )
    }};
    (Context: $msg:literal, $err:expr) => {{
        $crate::__private::must_use(
            $crate::RowsiftError::Context($msg.into(), Box::new($err))
        )
    }};
    ($variant:ident: $fmt:literal $(, $arg:expr)* $(,)?) => {{
        use std::backtrace::Backtrace;
        $crate::__private::must_use(
            $crate::RowsiftError::$variant(format!($fmt, $($arg),*).into(), Backtrace::capture())
        )
    }};
    ($fmt:literal $(, $arg:expr)* $(,)?) => {
        $crate::rowsift_err!(InvalidInput: $fmt, $($arg),*)
    };
}

/// A convenient macro for returning a [`RowsiftError`] from the enclosing function.
#[macro_export]
macro_rules! rowsift_bail {
    ($($tt:tt)+) => {
        return Err($crate::rowsift_err!($($tt)+))
    };
}

/// A convenient macro for panicking with a [`RowsiftError`] in the presence of a programmer
/// error (e.g., an invariant has been violated).
#[macro_export]
macro_rules! rowsift_panic {
    (OutOfBounds: $idx:expr, $start:expr, $stop:expr) => {{
        $crate::rowsift_panic!($crate::rowsift_err!(OutOfBounds: $idx, $start, $stop))
    }};
    ($variant:ident: $fmt:literal $(, $arg:expr)* $(,)?) => {
        $crate::rowsift_panic!($crate::rowsift_err!($variant: $fmt, $($arg),*))
    };
    ($fmt:literal $(, $arg:expr)* $(,)?) => {
        $crate::rowsift_panic!($crate::rowsift_err!($fmt, $($arg),*))
    };
    ($err:expr, $fmt:literal $(, $arg:expr)* $(,)?) => {{
        let err: $crate::RowsiftError = $err;
        panic!("{}", err.with_context(format!($fmt, $($arg),*)))
    }};
    ($err:expr) => {{
        let err: $crate::RowsiftError = $err;
        panic!("{}", err)
    }};
}

impl<T, E> RowsiftUnwrap for Result<T, E>
where
    E: Into<RowsiftError>,
{
    type Output = T;

    #[inline(always)]
    fn rowsift_unwrap(self) -> Self::Output {
        self.map_err(|err| err.into())
            .unwrap_or_else(|err| rowsift_panic!(err))
    }
}

impl<T, E> RowsiftExpect for Result<T, E>
where
    E: Into<RowsiftError>,
{
    type Output = T;

    #[inline(always)]
    fn rowsift_expect(self, msg: &str) -> Self::Output {
        self.map_err(|err| err.into())
            .unwrap_or_else(|e| rowsift_panic!(e.with_context(msg.to_string())))
    }
}

impl<T> RowsiftExpect for Option<T> {
    type Output = T;

    #[inline(always)]
    fn rowsift_expect(self, msg: &str) -> Self::Output {
        self.unwrap_or_else(|| {
            let err = RowsiftError::InvalidInput(msg.to_string().into(), Backtrace::capture());
            rowsift_panic!(err)
        })
    }
}

#[doc(hidden)]
pub mod __private {
    use crate::RowsiftError;

    #[doc(hidden)]
    #[inline]
    #[must_use]
    pub fn must_use(err: RowsiftError) -> RowsiftError {
        err
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;

    fn fails_with_bail(len: usize) -> RowsiftResult<()> {
        rowsift_bail!("selection of length {len} is empty");
    }

    #[test]
    fn bail_defaults_to_invalid_input() {
        let err = fails_with_bail(0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert!(err.to_string().starts_with("selection of length 0 is empty"));
    }

    #[test]
    fn kinds_cover_the_taxonomy() {
        assert_eq!(
            rowsift_err!(OutOfBounds: 10, 0, 5).kind(),
            ErrorKind::InvalidInput
        );
        assert_eq!(
            rowsift_err!(ShapeMismatch: "expected {} rows, got {}", 3, 4).kind(),
            ErrorKind::ShapeMismatch
        );
        assert_eq!(
            rowsift_err!(IoFailure: "store went away").kind(),
            ErrorKind::IoFailure
        );
        let io_err: RowsiftError = io::Error::new(io::ErrorKind::UnexpectedEof, "eof").into();
        assert_eq!(io_err.kind(), ErrorKind::IoFailure);
    }

    #[test]
    fn context_keeps_inner_kind() {
        let err = rowsift_err!(ShapeMismatch: "bad shape").with_context("reading rows 0..4");
        assert_eq!(err.kind(), ErrorKind::ShapeMismatch);
        assert!(err.to_string().starts_with("reading rows 0..4: bad shape"));
    }

    #[test]
    #[should_panic(expected = "missing value")]
    fn expect_on_none_panics_with_message() {
        let value: Option<usize> = None;
        value.rowsift_expect("missing value");
    }
}
