//! Summed-area tables and O(1) rectangle sums.

use crate::chunk::{traverse, CellOp, ChunkConfig, ChunkedTraversal};
use crate::edge::EdgeMode;
use crate::error::{check_shape, GridError, Result};
use crate::grid::{with_distinct_source, Grid};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// One step of the row-major prefix-sum recurrence.
///
/// Reads the already-written neighbors above and to the left from `output`,
/// so the pass must run strictly in row-major order.
#[derive(Clone, Copy, Debug)]
pub struct PrefixSum<'a> {
    source: &'a Grid,
}

impl<'a> PrefixSum<'a> {
    pub fn new(source: &'a Grid) -> Self {
        Self { source }
    }
}

impl CellOp for PrefixSum<'_> {
    #[inline]
    fn eval(&self, output: &Grid, row: usize, column: usize) -> f32 {
        let r = row as isize;
        let c = column as isize;
        let z = EdgeMode::Zero;
        self.source.at(row, column) + output.sample(r - 1, c, z) + output.sample(r, c - 1, z)
            - output.sample(r - 1, c - 1, z)
    }
}

/// Integral image of `source`.
pub fn integral(source: &Grid) -> Grid {
    let mut out = source.zeros_like();
    traverse(&PrefixSum::new(source), &mut out);
    out
}

/// Integral image of `source` written into `result` (same shape required).
#[cfg_attr(
    feature = "tracing",
    instrument(level = "debug", skip_all, fields(rows = source.rows(), columns = source.columns()))
)]
pub fn integral_into(source: &Grid, result: &mut Grid) -> Result<()> {
    check_shape(source.shape(), result.shape())?;
    traverse(&PrefixSum::new(source), result);
    Ok(())
}

/// Replace `grid` with its integral image.
pub fn integral_in_place(grid: &mut Grid) {
    with_distinct_source(grid, |source, target| {
        traverse(&PrefixSum::new(source), target)
    })
}

/// Suspendable variant of [`integral_into`].
pub fn integral_chunked<'a>(
    source: &'a Grid,
    result: &'a mut Grid,
    config: ChunkConfig,
) -> Result<ChunkedTraversal<'a, PrefixSum<'a>>> {
    check_shape(source.shape(), result.shape())?;
    Ok(ChunkedTraversal::new(PrefixSum::new(source), result, config))
}

/// Sum of the source over rows `r0..=r1` and columns `c0..=c1`.
///
/// Terms that fall before the first row/column count as 0, so `r0`/`c0` may be
/// 0 (or negative).
#[inline]
pub fn rect_sum(integral: &Grid, r0: isize, c0: isize, r1: isize, c1: isize) -> f32 {
    let z = EdgeMode::Zero;
    integral.sample(r1, c1, z) - integral.sample(r0 - 1, c1, z) - integral.sample(r1, c0 - 1, z)
        + integral.sample(r0 - 1, c0 - 1, z)
}

/// Mean over a `size x size` window centered on each cell.
///
/// The window is cropped at the grid border and divided by the number of
/// cells it actually covers.
#[derive(Clone, Copy, Debug)]
pub struct BoxMean<'a> {
    integral: &'a Grid,
    half: isize,
}

impl<'a> BoxMean<'a> {
    /// `size` must be odd.
    pub fn new(integral: &'a Grid, size: usize) -> Result<Self> {
        if size % 2 == 0 {
            return Err(GridError::InvalidArgument(format!(
                "box mean size must be odd, got {size}"
            )));
        }
        Ok(Self {
            integral,
            half: (size / 2) as isize,
        })
    }
}

impl CellOp for BoxMean<'_> {
    fn eval(&self, _output: &Grid, row: usize, column: usize) -> f32 {
        let last_r = self.integral.rows() as isize - 1;
        let last_c = self.integral.columns() as isize - 1;
        let (r, c) = (row as isize, column as isize);
        let r0 = (r - self.half).max(0);
        let c0 = (c - self.half).max(0);
        let r1 = (r + self.half).min(last_r);
        let c1 = (c + self.half).min(last_c);
        let area = ((r1 - r0 + 1) * (c1 - c0 + 1)) as f32;
        rect_sum(self.integral, r0, c0, r1, c1) / area
    }
}

/// Local mean filter computed from an integral image.
pub fn box_mean(integral: &Grid, size: usize) -> Result<Grid> {
    let op = BoxMean::new(integral, size)?;
    let mut out = integral.zeros_like();
    traverse(&op, &mut out);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_row_and_column_are_plain_prefix_sums() {
        let src = Grid::filled(3, 4, 1.0);
        let ii = integral(&src);
        assert_eq!(ii.row(0), &[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(ii.at(1, 0), 2.0);
        assert_eq!(ii.at(2, 3), 12.0);
    }

    #[test]
    fn in_place_matches_out_of_place() {
        let data: Vec<f32> = (0..20).map(|v| (v % 7) as f32).collect();
        let mut grid = Grid::from_vec(4, 5, data).unwrap();
        let expected = integral(&grid);
        integral_in_place(&mut grid);
        assert_eq!(grid, expected);
    }

    #[test]
    fn rect_sum_matches_direct_sum() {
        let data: Vec<f32> = (0..30).map(|v| v as f32).collect();
        let src = Grid::from_vec(5, 6, data).unwrap();
        let ii = integral(&src);
        let mut direct = 0.0;
        for r in 1..=3 {
            for c in 2..=4 {
                direct += src.at(r, c);
            }
        }
        assert_eq!(rect_sum(&ii, 1, 2, 3, 4), direct);
        assert_eq!(rect_sum(&ii, 0, 0, 4, 5), src.sum().unwrap());
    }

    #[test]
    fn integral_into_checks_shape() {
        let src = Grid::new(2, 3);
        let mut out = Grid::new(3, 2);
        assert!(matches!(
            integral_into(&src, &mut out),
            Err(GridError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn box_mean_crops_at_border() {
        let src = Grid::filled(4, 4, 2.0);
        let mean = box_mean(&integral(&src), 3).unwrap();
        assert!(mean.as_slice().iter().all(|&v| v == 2.0));
        assert!(box_mean(&integral(&src), 4).is_err());
    }
}
