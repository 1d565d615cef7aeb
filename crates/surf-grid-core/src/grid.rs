//! Dense row-major `f32` grid with edge-aware addressing.
//!
//! `Grid` is the single container used by every stage of the pipeline: source
//! images, kernels, integral images and response maps. Cell `(r, c)` lives at
//! flat index `r * columns + c`.
//!
//! Two addressing styles are offered:
//! - [`Grid::get`] / [`Grid::set`] take signed coordinates plus an
//!   [`EdgeMode`] and report contract violations as [`GridError`].
//! - [`Grid::at`] / [`Grid::put`] take in-range `usize` coordinates and panic
//!   otherwise, for inner loops whose bounds are already established.

use crate::edge::{Address, EdgeMode};
use crate::error::{check_shape, GridError, Result};

/// Dense 2D numeric container in row-major layout.
#[derive(Clone, Debug, PartialEq)]
pub struct Grid {
    rows: usize,
    columns: usize,
    data: Vec<f32>,
}

impl Grid {
    /// Zero-filled grid of the given shape.
    pub fn new(rows: usize, columns: usize) -> Self {
        Self::filled(rows, columns, 0.0)
    }

    /// Grid with every cell set to `value`.
    pub fn filled(rows: usize, columns: usize, value: f32) -> Self {
        Self {
            rows,
            columns,
            data: vec![value; rows * columns],
        }
    }

    /// Wrap row-major `data`; its length must equal `rows * columns`.
    pub fn from_vec(rows: usize, columns: usize, data: Vec<f32>) -> Result<Self> {
        if data.len() != rows * columns {
            return Err(GridError::InvalidArgument(format!(
                "data length {} does not match {rows}x{columns}",
                data.len()
            )));
        }
        Ok(Self {
            rows,
            columns,
            data,
        })
    }

    /// Zero-filled grid with the same shape as `self`.
    pub fn zeros_like(&self) -> Self {
        Self::new(self.rows, self.columns)
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn columns(&self) -> usize {
        self.columns
    }

    /// Number of cells (`rows * columns`).
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// `(rows, columns)`.
    #[inline]
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.columns)
    }

    #[inline]
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.data
    }

    pub fn into_vec(self) -> Vec<f32> {
        self.data
    }

    /// Borrow one row.
    #[inline]
    pub fn row(&self, row: usize) -> &[f32] {
        let start = row * self.columns;
        &self.data[start..start + self.columns]
    }

    /// Value at an in-range coordinate.
    ///
    /// # Panics
    /// Panics if `(row, column)` is outside the grid.
    #[inline]
    pub fn at(&self, row: usize, column: usize) -> f32 {
        assert!(
            row < self.rows && column < self.columns,
            "({row}, {column}) out of bounds for {}x{}",
            self.rows,
            self.columns
        );
        self.data[row * self.columns + column]
    }

    /// Store `value` at an in-range coordinate.
    ///
    /// # Panics
    /// Panics if `(row, column)` is outside the grid.
    #[inline]
    pub fn put(&mut self, row: usize, column: usize, value: f32) {
        assert!(
            row < self.rows && column < self.columns,
            "({row}, {column}) out of bounds for {}x{}",
            self.rows,
            self.columns
        );
        self.data[row * self.columns + column] = value;
    }

    /// Flat index for `(row, column)` under `edge`, or `None` for the zero
    /// sentinel.
    pub fn index(&self, row: isize, column: isize, edge: EdgeMode) -> Result<Option<usize>> {
        match edge.resolve(row, column, self.rows, self.columns)? {
            Address::Cell(i) => Ok(Some(i)),
            Address::Zero => Ok(None),
        }
    }

    /// Read a cell, resolving out-of-range coordinates according to `edge`.
    pub fn get(&self, row: isize, column: isize, edge: EdgeMode) -> Result<f32> {
        Ok(self.index(row, column, edge)?.map_or(0.0, |i| self.data[i]))
    }

    /// Write a cell and return the previous value.
    ///
    /// Under [`EdgeMode::Zero`] an out-of-range write is a no-op returning 0.
    pub fn set(&mut self, row: isize, column: isize, value: f32, edge: EdgeMode) -> Result<f32> {
        match self.index(row, column, edge)? {
            Some(i) => Ok(std::mem::replace(&mut self.data[i], value)),
            None => Ok(0.0),
        }
    }

    /// Infallible read used inside traversals.
    ///
    /// Callers that pass [`EdgeMode::None`] validate the reach of their
    /// lookups before traversing; an unresolvable address reads as 0.
    #[inline]
    pub(crate) fn sample(&self, row: isize, column: isize, edge: EdgeMode) -> f32 {
        match edge.resolve(row, column, self.rows, self.columns) {
            Ok(Address::Cell(i)) => self.data[i],
            _ => 0.0,
        }
    }

    /// Set every cell to `value`.
    pub fn fill(&mut self, value: f32) {
        self.data.fill(value);
    }

    /// Copy all cells into `result`, which must have the same shape.
    pub fn clone_into(&self, result: &mut Grid) -> Result<()> {
        check_shape(self.shape(), result.shape())?;
        result.data.copy_from_slice(&self.data);
        Ok(())
    }

    /// Cell-wise `self + other`.
    pub fn add(&self, other: &Grid) -> Result<Grid> {
        let mut result = self.zeros_like();
        self.add_into(other, &mut result)?;
        Ok(result)
    }

    /// Cell-wise `self + other` written into `result`.
    pub fn add_into(&self, other: &Grid, result: &mut Grid) -> Result<()> {
        self.zip_into(other, result, |a, b| a + b)
    }

    /// Cell-wise `self - other`.
    pub fn subtract(&self, other: &Grid) -> Result<Grid> {
        let mut result = self.zeros_like();
        self.subtract_into(other, &mut result)?;
        Ok(result)
    }

    /// Cell-wise `self - other` written into `result`.
    pub fn subtract_into(&self, other: &Grid, result: &mut Grid) -> Result<()> {
        self.zip_into(other, result, |a, b| a - b)
    }

    /// Cell-wise `self * factor`.
    pub fn scale(&self, factor: f32) -> Grid {
        let mut result = self.clone();
        result.scale_in_place(factor);
        result
    }

    /// Cell-wise `self * factor` written into `result`.
    pub fn scale_into(&self, factor: f32, result: &mut Grid) -> Result<()> {
        check_shape(self.shape(), result.shape())?;
        for (dst, &src) in result.data.iter_mut().zip(&self.data) {
            *dst = src * factor;
        }
        Ok(())
    }

    pub fn scale_in_place(&mut self, factor: f32) {
        for v in &mut self.data {
            *v *= factor;
        }
    }

    fn zip_into(&self, other: &Grid, result: &mut Grid, op: impl Fn(f32, f32) -> f32) -> Result<()> {
        check_shape(self.shape(), other.shape())?;
        check_shape(self.shape(), result.shape())?;
        for ((dst, &a), &b) in result.data.iter_mut().zip(&self.data).zip(&other.data) {
            *dst = op(a, b);
        }
        Ok(())
    }

    /// Largest cell, or `None` for an empty grid.
    pub fn max(&self) -> Option<f32> {
        self.reduce(f32::max)
    }

    /// Smallest cell, or `None` for an empty grid.
    pub fn min(&self) -> Option<f32> {
        self.reduce(f32::min)
    }

    /// Sum of all cells in row-major order, or `None` for an empty grid.
    pub fn sum(&self) -> Option<f32> {
        self.reduce(|acc, v| acc + v)
    }

    fn reduce(&self, op: impl Fn(f32, f32) -> f32) -> Option<f32> {
        let (&first, rest) = self.data.split_first()?;
        Some(rest.iter().fold(first, |acc, &v| op(acc, v)))
    }

    /// Exact elementwise equality; `false` when shapes differ.
    pub fn equals(&self, other: &Grid) -> bool {
        self == other
    }

    /// Visit every cell in row-major order.
    ///
    /// `f` receives the grid itself plus the cell coordinates; auxiliary
    /// inputs are whatever the closure captures.
    pub fn apply<F>(&self, mut f: F)
    where
        F: FnMut(&Grid, usize, usize),
    {
        for row in 0..self.rows {
            for column in 0..self.columns {
                f(self, row, column);
            }
        }
    }

    /// Row/column-swapped copy.
    pub fn transpose(&self) -> Grid {
        let mut result = Grid::new(self.columns, self.rows);
        self.write_transpose(&mut result);
        result
    }

    /// Transpose into `result`, which must be `columns x rows`.
    pub fn transpose_into(&self, result: &mut Grid) -> Result<()> {
        check_shape((self.columns, self.rows), result.shape())?;
        self.write_transpose(result);
        Ok(())
    }

    /// Transpose in place; the shape swaps for non-square grids.
    pub fn transpose_in_place(&mut self) {
        with_distinct_source(self, |source, target| {
            target.rows = source.columns;
            target.columns = source.rows;
            source.write_transpose(target);
        });
    }

    fn write_transpose(&self, result: &mut Grid) {
        for row in 0..self.rows {
            for column in 0..self.columns {
                result.data[column * self.rows + row] = self.data[row * self.columns + column];
            }
        }
    }

    /// Boolean mask as a grid: 1.0 where `value >= threshold`, else 0.0.
    pub fn threshold(&self, threshold: f32) -> Grid {
        Grid {
            rows: self.rows,
            columns: self.columns,
            data: self
                .data
                .iter()
                .map(|&v| if v >= threshold { 1.0 } else { 0.0 })
                .collect(),
        }
    }
}

/// Run `f` with a snapshot of `target` as its read-only source.
///
/// In-place variants of convolution, the integral transform and transpose all
/// route through here so that no traversal ever reads cells it has already
/// overwritten.
pub(crate) fn with_distinct_source<R>(
    target: &mut Grid,
    f: impl FnOnce(&Grid, &mut Grid) -> R,
) -> R {
    let source = target.clone();
    f(&source, target)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn g(rows: usize, columns: usize, data: &[f32]) -> Grid {
        Grid::from_vec(rows, columns, data.to_vec()).unwrap()
    }

    #[test]
    fn new_is_zero_filled_and_sized() {
        let grid = Grid::new(3, 4);
        assert_eq!(grid.shape(), (3, 4));
        assert_eq!(grid.len(), 12);
        assert!(grid.as_slice().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn from_vec_rejects_wrong_length() {
        let err = Grid::from_vec(2, 2, vec![1.0; 3]).unwrap_err();
        assert!(matches!(err, GridError::InvalidArgument(_)));
    }

    #[test]
    fn set_returns_previous_value() {
        let mut grid = g(2, 2, &[0.0, 1.0, 2.0, 3.0]);
        assert_eq!(grid.set(1, 0, 9.0, EdgeMode::None), Ok(2.0));
        assert_eq!(grid.at(1, 0), 9.0);
    }

    #[test]
    fn zero_mode_set_outside_is_noop() {
        let mut grid = g(2, 2, &[0.0, 1.0, 2.0, 3.0]);
        let before = grid.clone();
        assert_eq!(grid.set(-1, 5, 9.0, EdgeMode::Zero), Ok(0.0));
        assert_eq!(grid, before);
    }

    #[test]
    fn extend_mode_set_writes_the_clamped_cell() {
        let mut grid = Grid::new(2, 2);
        grid.set(-4, 7, 5.0, EdgeMode::Extend).unwrap();
        assert_eq!(grid.at(0, 1), 5.0);
    }

    #[test]
    fn reductions_are_none_for_empty_grid() {
        let grid = Grid::new(0, 5);
        assert_eq!(grid.max(), None);
        assert_eq!(grid.min(), None);
        assert_eq!(grid.sum(), None);
    }

    #[test]
    fn reductions_cover_every_cell() {
        let grid = g(2, 3, &[4.0, -1.0, 7.0, 0.5, 2.0, 3.0]);
        assert_eq!(grid.max(), Some(7.0));
        assert_eq!(grid.min(), Some(-1.0));
        assert_eq!(grid.sum(), Some(15.5));
    }

    #[test]
    fn add_and_subtract_check_shapes() {
        let a = g(2, 2, &[0.0, 1.0, 2.0, 3.0]);
        let b = g(2, 2, &[4.0, 5.0, 6.0, 7.0]);
        assert_eq!(a.add(&b).unwrap(), g(2, 2, &[4.0, 6.0, 8.0, 10.0]));
        assert_eq!(b.subtract(&a).unwrap(), g(2, 2, &[4.0, 4.0, 4.0, 4.0]));

        let c = Grid::new(2, 3);
        assert!(matches!(
            a.add(&c),
            Err(GridError::DimensionMismatch { .. })
        ));
        let mut wrong = Grid::new(3, 2);
        assert!(matches!(
            a.add_into(&b, &mut wrong),
            Err(GridError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn scale_into_checks_shape() {
        let a = g(1, 3, &[1.0, 2.0, 3.0]);
        let mut out = Grid::new(1, 3);
        a.scale_into(2.0, &mut out).unwrap();
        assert_eq!(out, g(1, 3, &[2.0, 4.0, 6.0]));
        let mut wrong = Grid::new(3, 1);
        assert!(a.scale_into(2.0, &mut wrong).is_err());
    }

    #[test]
    fn equals_is_false_on_shape_mismatch() {
        let a = Grid::new(2, 3);
        let b = Grid::new(3, 2);
        assert!(!a.equals(&b));
        assert!(a.equals(&a.clone()));
    }

    #[test]
    fn transpose_of_asymmetric_grid() {
        let a = g(2, 3, &[0.0, 1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(a.transpose(), g(3, 2, &[0.0, 3.0, 1.0, 4.0, 2.0, 5.0]));

        let mut wrong = Grid::new(2, 3);
        assert!(a.transpose_into(&mut wrong).is_err());
    }

    #[test]
    fn transpose_in_place_reads_original_values() {
        let mut square = g(3, 3, &[0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]);
        square.transpose_in_place();
        assert_eq!(
            square,
            g(3, 3, &[0.0, 3.0, 6.0, 1.0, 4.0, 7.0, 2.0, 5.0, 8.0])
        );

        let mut wide = g(1, 3, &[1.0, 2.0, 3.0]);
        wide.transpose_in_place();
        assert_eq!(wide, g(3, 1, &[1.0, 2.0, 3.0]));
    }

    #[test]
    fn apply_visits_row_major() {
        let grid = Grid::new(2, 3);
        let mut seen = Vec::new();
        grid.apply(|_, r, c| seen.push((r, c)));
        assert_eq!(seen, vec![(0, 0), (0, 1), (0, 2), (1, 0), (1, 1), (1, 2)]);
    }

    #[test]
    fn threshold_builds_mask() {
        let grid = g(3, 3, &[0.0, 1.0, 2.0, 3.0, 4.0, 3.0, 2.0, 0.0, 0.0]);
        assert_eq!(
            grid.threshold(2.0),
            g(3, 3, &[0.0, 0.0, 1.0, 1.0, 1.0, 1.0, 1.0, 0.0, 0.0])
        );
    }
}
