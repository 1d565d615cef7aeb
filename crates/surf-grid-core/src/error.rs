//! Error type shared by every grid operation.
//!
//! All checks run before any cell of a caller-visible result is written, so an
//! `Err` never leaves a partially updated output behind.

use thiserror::Error;

/// Contract violations reported by grid operations.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum GridError {
    /// A size, kernel or scale parameter is malformed.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// A required operand is absent (e.g. an empty kernel).
    #[error("missing argument: `{0}` must be provided")]
    MissingArgument(&'static str),
    /// Two grids that must share a shape do not.
    #[error("dimension mismatch: expected {expected:?} (rows, columns), got {actual:?}")]
    DimensionMismatch {
        expected: (usize, usize),
        actual: (usize, usize),
    },
    /// Address outside the grid under [`EdgeMode::None`](crate::EdgeMode::None).
    #[error("({row}, {column}) is outside a {rows}x{columns} grid")]
    OutOfRange {
        row: isize,
        column: isize,
        rows: usize,
        columns: usize,
    },
    /// Multi-channel images with different colorspaces were combined.
    #[error("colorspace mismatch: expected {expected}, got {actual}")]
    ColorspaceMismatch {
        expected: &'static str,
        actual: &'static str,
    },
}

pub type Result<T> = std::result::Result<T, GridError>;

/// Fails with [`GridError::DimensionMismatch`] unless `actual == expected`.
#[inline]
pub(crate) fn check_shape(expected: (usize, usize), actual: (usize, usize)) -> Result<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(GridError::DimensionMismatch { expected, actual })
    }
}
