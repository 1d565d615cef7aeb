//! Edge-aware 2D cross-correlation.
//!
//! The kernel is applied unflipped: `out(i, j) = Σ src(i+m-cr, j+n-cc) * k(m, n)`
//! with `(cr, cc)` the kernel center. Callers that need textbook convolution
//! pass a flipped kernel.

use crate::chunk::{traverse, CellOp, ChunkConfig, ChunkedTraversal};
use crate::edge::EdgeMode;
use crate::error::{check_shape, GridError, Result};
use crate::grid::{with_distinct_source, Grid};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Edge mode used by [`convolve`].
pub const DEFAULT_CONVOLVE_EDGE: EdgeMode = EdgeMode::Extend;

/// Per-cell correlation of `source` with `kernel`.
#[derive(Clone, Copy, Debug)]
pub struct Correlate<'a> {
    source: &'a Grid,
    kernel: &'a Grid,
    edge: EdgeMode,
    center_row: isize,
    center_column: isize,
}

impl<'a> Correlate<'a> {
    /// Validates the kernel and, for [`EdgeMode::None`], that no lookup can
    /// leave the grid.
    pub fn new(source: &'a Grid, kernel: &'a Grid, edge: EdgeMode) -> Result<Self> {
        if kernel.is_empty() {
            return Err(GridError::MissingArgument("kernel"));
        }
        let center_row = (kernel.rows() / 2) as isize;
        let center_column = (kernel.columns() / 2) as isize;

        // Any kernel wider than one cell reaches past the first output cell.
        if edge == EdgeMode::None && !source.is_empty() && kernel.len() > 1 {
            return Err(GridError::OutOfRange {
                row: -center_row,
                column: -center_column,
                rows: source.rows(),
                columns: source.columns(),
            });
        }

        Ok(Self {
            source,
            kernel,
            edge,
            center_row,
            center_column,
        })
    }

    pub fn source(&self) -> &'a Grid {
        self.source
    }
}

impl CellOp for Correlate<'_> {
    #[inline]
    fn eval(&self, _output: &Grid, row: usize, column: usize) -> f32 {
        let base_r = row as isize - self.center_row;
        let base_c = column as isize - self.center_column;
        let mut acc = 0.0f32;
        for m in 0..self.kernel.rows() {
            let weights = self.kernel.row(m);
            for (n, &w) in weights.iter().enumerate() {
                let v = self
                    .source
                    .sample(base_r + m as isize, base_c + n as isize, self.edge);
                acc += v * w;
            }
        }
        acc
    }
}

/// Correlate `source` with `kernel` using [`DEFAULT_CONVOLVE_EDGE`].
pub fn convolve(source: &Grid, kernel: &Grid) -> Result<Grid> {
    convolve_with(source, kernel, DEFAULT_CONVOLVE_EDGE)
}

/// Correlate `source` with `kernel` into a freshly allocated grid.
pub fn convolve_with(source: &Grid, kernel: &Grid, edge: EdgeMode) -> Result<Grid> {
    let mut out = source.zeros_like();
    convolve_into(source, kernel, edge, &mut out)?;
    Ok(out)
}

/// Correlate `source` with `kernel`, writing into `result`.
///
/// `result` must have the shape of `source`.
#[cfg_attr(
    feature = "tracing",
    instrument(
        level = "debug",
        skip(source, kernel, result),
        fields(rows = source.rows(), columns = source.columns(), k = ?kernel.shape())
    )
)]
pub fn convolve_into(source: &Grid, kernel: &Grid, edge: EdgeMode, result: &mut Grid) -> Result<()> {
    let op = Correlate::new(source, kernel, edge)?;
    check_shape(source.shape(), result.shape())?;
    traverse(&op, result);
    Ok(())
}

/// Correlate `grid` with `kernel` in place; reads only the original values.
pub fn convolve_in_place(grid: &mut Grid, kernel: &Grid, edge: EdgeMode) -> Result<()> {
    with_distinct_source(grid, |source, target| {
        convolve_into(source, kernel, edge, target)
    })
}

/// Suspendable variant of [`convolve_into`].
///
/// Nothing is written until the returned traversal is stepped.
pub fn convolve_chunked<'a>(
    source: &'a Grid,
    kernel: &'a Grid,
    edge: EdgeMode,
    result: &'a mut Grid,
    config: ChunkConfig,
) -> Result<ChunkedTraversal<'a, Correlate<'a>>> {
    let op = Correlate::new(source, kernel, edge)?;
    check_shape(source.shape(), result.shape())?;
    Ok(ChunkedTraversal::new(op, result, config))
}
