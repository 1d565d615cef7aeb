//! Box-filter approximations of the second-order Gaussian derivatives.
//!
//! Each response cell costs a constant number of integral-image lookups
//! regardless of the filter size. The `discrete_log_*` kernels spell out the
//! same band layout cell by cell; correlating a source with them (edge mode
//! [`EdgeMode::Zero`]) reproduces the box-filter output exactly for every
//! size that is a multiple of 3, which covers all sizes from
//! [`filter_size`](crate::hessian::filter_size). Sizes with `size % 3 == 2`
//! break that equivalence for Lxx/Lyy (see [`BandGeometry::for_size`]).

use crate::bands::{BandGeometry, Rect};
use crate::chunk::{traverse, CellOp, ChunkConfig, ChunkedTraversal};
use crate::edge::EdgeMode;
use crate::error::{check_shape, Result};
use crate::grid::Grid;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Which second derivative to approximate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Derivative {
    /// Horizontal, `∂²/∂x²` (varies along columns).
    Xx,
    /// Vertical, `∂²/∂y²` (varies along rows).
    Yy,
    /// Mixed, `∂²/∂x∂y`.
    Xy,
}

#[derive(Clone, Copy, Debug)]
enum Layout {
    Bands([Rect; 3]),
    Lobes([Rect; 4]),
}

const BAND_WEIGHTS: [f32; 3] = [1.0, -2.0, 1.0];
const LOBE_WEIGHTS: [f32; 4] = [1.0, -1.0, -1.0, 1.0];

impl Layout {
    fn for_derivative(geometry: &BandGeometry, derivative: Derivative) -> Self {
        match derivative {
            Derivative::Xx => Layout::Bands(geometry.xx_bands()),
            Derivative::Yy => Layout::Bands(geometry.yy_bands()),
            Derivative::Xy => Layout::Lobes(geometry.xy_lobes()),
        }
    }

    fn weight_at(&self, dr: isize, dc: isize) -> f32 {
        let hit = |(rect, w): (&Rect, &f32)| rect.contains(dr, dc).then_some(*w);
        match self {
            Layout::Bands(bands) => bands.iter().zip(&BAND_WEIGHTS).find_map(hit),
            Layout::Lobes(lobes) => lobes.iter().zip(&LOBE_WEIGHTS).find_map(hit),
        }
        .unwrap_or(0.0)
    }
}

/// Box-filter response of one derivative at a fixed filter size.
#[derive(Clone, Copy, Debug)]
pub struct BoxFilter<'a> {
    integral: &'a Grid,
    derivative: Derivative,
    layout: Layout,
}

impl<'a> BoxFilter<'a> {
    /// Fails with `InvalidArgument` unless `size` is odd and at least 3.
    pub fn new(integral: &'a Grid, size: usize, derivative: Derivative) -> Result<Self> {
        let geometry = BandGeometry::for_size(size)?;
        Ok(Self {
            integral,
            derivative,
            layout: Layout::for_derivative(&geometry, derivative),
        })
    }

    pub fn derivative(&self) -> Derivative {
        self.derivative
    }

    /// Response at an in-range cell.
    #[inline]
    pub fn at(&self, row: usize, column: usize) -> f32 {
        let ii = self.integral;
        match &self.layout {
            Layout::Bands([first, middle, last]) => {
                first.sum(ii, row, column) + last.sum(ii, row, column)
                    - 2.0 * middle.sum(ii, row, column)
            }
            Layout::Lobes([ul, ur, ll, lr]) => {
                ul.sum(ii, row, column) - ur.sum(ii, row, column) - ll.sum(ii, row, column)
                    + lr.sum(ii, row, column)
            }
        }
    }
}

impl CellOp for BoxFilter<'_> {
    #[inline]
    fn eval(&self, _output: &Grid, row: usize, column: usize) -> f32 {
        self.at(row, column)
    }
}

/// Approximate `derivative` at filter size `size` from an integral image.
///
/// Matches [`discrete_log_response`] for multiples of 3; Lxx/Lyy diverge from
/// it when `size % 3 == 2`.
pub fn fast_log(integral: &Grid, size: usize, derivative: Derivative) -> Result<Grid> {
    let mut out = integral.zeros_like();
    fast_log_into(integral, size, derivative, &mut out)?;
    Ok(out)
}

/// Lxx from an integral image.
pub fn fast_log_xx(integral: &Grid, size: usize) -> Result<Grid> {
    fast_log(integral, size, Derivative::Xx)
}

/// Lyy from an integral image.
pub fn fast_log_yy(integral: &Grid, size: usize) -> Result<Grid> {
    fast_log(integral, size, Derivative::Yy)
}

/// Lxy from an integral image.
pub fn fast_log_xy(integral: &Grid, size: usize) -> Result<Grid> {
    fast_log(integral, size, Derivative::Xy)
}

#[cfg_attr(
    feature = "tracing",
    instrument(level = "debug", skip(integral, result), fields(rows = integral.rows(), columns = integral.columns()))
)]
pub fn fast_log_into(
    integral: &Grid,
    size: usize,
    derivative: Derivative,
    result: &mut Grid,
) -> Result<()> {
    let op = BoxFilter::new(integral, size, derivative)?;
    check_shape(integral.shape(), result.shape())?;
    traverse(&op, result);
    Ok(())
}

/// Suspendable variant of [`fast_log_into`].
pub fn fast_log_chunked<'a>(
    integral: &'a Grid,
    size: usize,
    derivative: Derivative,
    result: &'a mut Grid,
    config: ChunkConfig,
) -> Result<ChunkedTraversal<'a, BoxFilter<'a>>> {
    let op = BoxFilter::new(integral, size, derivative)?;
    check_shape(integral.shape(), result.shape())?;
    Ok(ChunkedTraversal::new(op, result, config))
}

/// Explicit `size x size` kernel with the band layout of `derivative`.
pub fn discrete_log(size: usize, derivative: Derivative) -> Result<Grid> {
    let geometry = BandGeometry::for_size(size)?;
    let layout = Layout::for_derivative(&geometry, derivative);
    let mut kernel = Grid::new(size, size);
    for m in 0..size {
        for n in 0..size {
            let w = layout.weight_at(m as isize - geometry.half, n as isize - geometry.half);
            kernel.put(m, n, w);
        }
    }
    Ok(kernel)
}

pub fn discrete_log_xx(size: usize) -> Result<Grid> {
    discrete_log(size, Derivative::Xx)
}

pub fn discrete_log_yy(size: usize) -> Result<Grid> {
    discrete_log(size, Derivative::Yy)
}

pub fn discrete_log_xy(size: usize) -> Result<Grid> {
    discrete_log(size, Derivative::Xy)
}

/// Reference response: correlate `source` with [`discrete_log`] using
/// [`EdgeMode::Zero`]. O(size²) per cell.
pub fn discrete_log_response(source: &Grid, size: usize, derivative: Derivative) -> Result<Grid> {
    let kernel = discrete_log(size, derivative)?;
    crate::convolve::convolve_with(source, &kernel, EdgeMode::Zero)
}
