//! Determinant-of-Hessian response from box-filter derivatives.
use crate::boxfilter::{BoxFilter, Derivative};
use crate::chunk::{traverse, CellOp, ChunkConfig, ChunkedTraversal};
use crate::error::{check_shape, GridError, Result};
use crate::grid::Grid;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Box-filter size for a scale-space `(octave, level)` pair.
///
/// `9 + 3·o·(o+1) + 6·2^o·l`: 9, 15, 21, 27 for octave 0; 15, 27, 39, 51 for
/// octave 1; 27, 51, 75, 99 for octave 2.
///
/// Fails with [`GridError::InvalidArgument`] when `2^octave` or the size
/// overflows `usize`.
pub fn filter_size(octave: u32, level: u32) -> Result<usize> {
    let o = octave as usize;
    let l = level as usize;
    let step = 1usize
        .checked_shl(octave)
        .and_then(|p| p.checked_mul(l))
        .and_then(|p| p.checked_mul(6));
    o.checked_add(1)
        .and_then(|n| n.checked_mul(o))
        .and_then(|n| n.checked_mul(3))
        .zip(step)
        .and_then(|(base, step)| base.checked_add(step))
        .and_then(|n| n.checked_add(9))
        .ok_or_else(|| {
            GridError::InvalidArgument(format!("filter size overflows for octave {octave}, level {level}"))
        })
}

/// `Lxx·Lyy - Lxy²` at one filter size.
#[derive(Clone, Copy, Debug)]
pub struct HessianOp<'a> {
    xx: BoxFilter<'a>,
    yy: BoxFilter<'a>,
    xy: BoxFilter<'a>,
}

impl<'a> HessianOp<'a> {
    pub fn new(integral: &'a Grid, size: usize) -> Result<Self> {
        Ok(Self {
            xx: BoxFilter::new(integral, size, Derivative::Xx)?,
            yy: BoxFilter::new(integral, size, Derivative::Yy)?,
            xy: BoxFilter::new(integral, size, Derivative::Xy)?,
        })
    }
}

impl CellOp for HessianOp<'_> {
    #[inline]
    fn eval(&self, _output: &Grid, row: usize, column: usize) -> f32 {
        let xx = self.xx.at(row, column);
        let yy = self.yy.at(row, column);
        let xy = self.xy.at(row, column);
        xx * yy - xy * xy
    }
}

/// Hessian response for scale-space coordinates `(octave, level)`.
pub fn hessian_determinant(integral: &Grid, octave: u32, level: u32) -> Result<Grid> {
    hessian_determinant_for_size(integral, filter_size(octave, level)?)
}

/// Hessian response at an explicit filter size.
pub fn hessian_determinant_for_size(integral: &Grid, size: usize) -> Result<Grid> {
    let mut out = integral.zeros_like();
    hessian_determinant_into(integral, size, &mut out)?;
    Ok(out)
}

#[cfg_attr(
    feature = "tracing",
    instrument(level = "debug", skip(integral, result), fields(rows = integral.rows(), columns = integral.columns()))
)]
pub fn hessian_determinant_into(integral: &Grid, size: usize, result: &mut Grid) -> Result<()> {
    let op = HessianOp::new(integral, size)?;
    check_shape(integral.shape(), result.shape())?;
    traverse(&op, result);
    Ok(())
}

/// Suspendable variant of [`hessian_determinant_into`].
pub fn hessian_determinant_chunked<'a>(
    integral: &'a Grid,
    size: usize,
    result: &'a mut Grid,
    config: ChunkConfig,
) -> Result<ChunkedTraversal<'a, HessianOp<'a>>> {
    let op = HessianOp::new(integral, size)?;
    check_shape(integral.shape(), result.shape())?;
    Ok(ChunkedTraversal::new(op, result, config))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_sizes_per_octave() {
        let sizes: Vec<Vec<usize>> = (0..3)
            .map(|o| (0..4).map(|l| filter_size(o, l).unwrap()).collect())
            .collect();
        assert_eq!(sizes[0], vec![9, 15, 21, 27]);
        assert_eq!(sizes[1], vec![15, 27, 39, 51]);
        assert_eq!(sizes[2], vec![27, 51, 75, 99]);
    }

    #[test]
    fn filter_sizes_are_odd_multiples_of_three() {
        for o in 0..4 {
            for l in 0..4 {
                let s = filter_size(o, l).unwrap();
                assert_eq!(s % 2, 1);
                assert_eq!(s % 3, 0);
            }
        }
    }

    #[test]
    fn oversized_scales_are_rejected() {
        assert!(matches!(filter_size(64, 0), Err(GridError::InvalidArgument(_))));
        assert!(matches!(filter_size(62, 1), Err(GridError::InvalidArgument(_))));
        assert!(filter_size(u32::MAX, u32::MAX).is_err());
        assert_eq!(filter_size(31, 0).unwrap(), 9 + 3 * 31 * 32);
        let ii = crate::integral::integral(&Grid::new(4, 4));
        assert!(hessian_determinant(&ii, 64, 0).is_err());
    }

    #[test]
    fn flat_image_has_zero_interior_response() {
        let ii = crate::integral::integral(&Grid::filled(32, 32, 1.0));
        let resp = hessian_determinant(&ii, 0, 0).unwrap();
        assert_eq!(resp.at(16, 16), 0.0);
    }
}
