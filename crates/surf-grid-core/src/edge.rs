//! Edge-aware address resolution.
//!
//! Every lookup into a [`Grid`](crate::Grid) goes through [`EdgeMode::resolve`],
//! which turns a signed `(row, column)` pair into either a flat cell index or
//! the zero sentinel.

use crate::error::{GridError, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Policy for addresses that fall outside the grid.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum EdgeMode {
    /// Out-of-range coordinates are an error.
    #[default]
    None,
    /// Clamp to the nearest valid row/column (edge replication).
    Extend,
    /// Toroidal addressing; negative inputs wrap as well.
    Wrap,
    /// Everything outside the grid reads as 0 and ignores writes.
    Zero,
}

/// Outcome of resolving a possibly out-of-range address.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Address {
    /// Flat row-major index of an existing cell.
    Cell(usize),
    /// No backing cell; reads are 0 and writes are dropped.
    Zero,
}

impl EdgeMode {
    /// Resolve `(row, column)` against a `rows x columns` grid.
    ///
    /// Lookups into an empty grid resolve to [`Address::Zero`] for every mode
    /// except [`EdgeMode::None`], which reports [`GridError::OutOfRange`].
    pub fn resolve(self, row: isize, column: isize, rows: usize, columns: usize) -> Result<Address> {
        let out_of_range = GridError::OutOfRange {
            row,
            column,
            rows,
            columns,
        };
        let (r, c) = match self {
            EdgeMode::None => {
                if !in_bounds(row, column, rows, columns) {
                    return Err(out_of_range);
                }
                (row, column)
            }
            _ if rows == 0 || columns == 0 => return Ok(Address::Zero),
            EdgeMode::Extend => (
                row.clamp(0, rows as isize - 1),
                column.clamp(0, columns as isize - 1),
            ),
            EdgeMode::Wrap => (row.rem_euclid(rows as isize), column.rem_euclid(columns as isize)),
            EdgeMode::Zero => {
                if !in_bounds(row, column, rows, columns) {
                    return Ok(Address::Zero);
                }
                (row, column)
            }
        };
        Ok(Address::Cell(r as usize * columns + c as usize))
    }
}

#[inline]
fn in_bounds(row: isize, column: isize, rows: usize, columns: usize) -> bool {
    row >= 0 && column >= 0 && (row as usize) < rows && (column as usize) < columns
}

impl std::str::FromStr for EdgeMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(EdgeMode::None),
            "extend" | "clamp" => Ok(EdgeMode::Extend),
            "wrap" => Ok(EdgeMode::Wrap),
            "zero" => Ok(EdgeMode::Zero),
            other => Err(format!(
                "invalid edge mode '{other}', expected none|extend|wrap|zero"
            )),
        }
    }
}
