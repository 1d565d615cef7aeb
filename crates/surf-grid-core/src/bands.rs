//! Band and lobe layout of the box-filter second-derivative kernels.
//!
//! All rectangles are given as inclusive offsets relative to the kernel
//! center, so the same layout drives both the O(1) integral-image lookups and
//! the explicit reference kernels.

use crate::edge::EdgeMode;
use crate::error::{GridError, Result};
use crate::grid::Grid;

/// Axis-aligned rectangle of offsets `top..=bottom` x `left..=right`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rect {
    pub top: isize,
    pub left: isize,
    pub bottom: isize,
    pub right: isize,
}

impl Rect {
    pub const fn new(top: isize, left: isize, bottom: isize, right: isize) -> Self {
        Self {
            top,
            left,
            bottom,
            right,
        }
    }

    /// Same rectangle with rows and columns swapped.
    pub const fn transposed(self) -> Self {
        Self::new(self.left, self.top, self.right, self.bottom)
    }

    #[inline]
    pub fn contains(&self, dr: isize, dc: isize) -> bool {
        (self.top..=self.bottom).contains(&dr) && (self.left..=self.right).contains(&dc)
    }

    /// Sum of the source under this rectangle centered at `(row, column)`.
    ///
    /// Corners are clamped to the last row/column; corners before the first
    /// row/column read 0. Cells outside the grid therefore contribute nothing.
    #[inline]
    pub fn sum(&self, integral: &Grid, row: usize, column: usize) -> f32 {
        let last_r = integral.rows() as isize - 1;
        let last_c = integral.columns() as isize - 1;
        let (r, c) = (row as isize, column as isize);
        let top = (r + self.top - 1).min(last_r);
        let bottom = (r + self.bottom).min(last_r);
        let left = (c + self.left - 1).min(last_c);
        let right = (c + self.right).min(last_c);

        let z = EdgeMode::Zero;
        integral.sample(bottom, right, z) - integral.sample(top, right, z)
            - integral.sample(bottom, left, z)
            + integral.sample(top, left, z)
    }
}

/// Derived widths for an odd filter size `s`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BandGeometry {
    /// Filter size (odd, >= 3).
    pub size: usize,
    /// `s / 2`.
    pub half: isize,
    /// `round(s * 0.2)`: columns left blank on each side of Lxx/Lyy bands.
    pub zero_band: isize,
    /// `round(s / 3)`: height of each Lxx/Lyy band.
    pub positive_band: isize,
    /// `round(s / 3)`: side of each Lxy lobe.
    pub lobe: isize,
    /// `round((s - 2*lobe - 1) / 2)`: gap between the Lxy lobes and the border.
    pub lobe_gap: isize,
}

impl BandGeometry {
    /// Layout for an odd `size >= 3`.
    ///
    /// The three Lxx/Lyy bands span `3 * positive_band` cells, which exceeds
    /// `size` when `size % 3 == 2` (5, 11, 17, ...). For those sizes the last
    /// band reaches one cell past the window and the box filter no longer
    /// equals the discrete kernel of the same size; the Lxy lobes always fit.
    pub fn for_size(size: usize) -> Result<Self> {
        if size < 3 || size % 2 == 0 {
            return Err(GridError::InvalidArgument(format!(
                "filter size must be odd and >= 3, got {size}"
            )));
        }
        let s = size as f64;
        let lobe = (s / 3.0).round() as isize;
        Ok(Self {
            size,
            half: (size / 2) as isize,
            zero_band: (s * 0.2).round() as isize,
            positive_band: lobe,
            lobe,
            lobe_gap: ((s - 2.0 * lobe as f64 - 1.0) / 2.0).round() as isize,
        })
    }

    /// Top, middle and bottom bands of Lyy (weights +1, -2, +1).
    pub fn yy_bands(&self) -> [Rect; 3] {
        let left = -self.half + self.zero_band;
        let right = self.half - self.zero_band;
        let pb = self.positive_band;
        let start = -self.half;
        [
            Rect::new(start, left, start + pb - 1, right),
            Rect::new(start + pb, left, start + 2 * pb - 1, right),
            Rect::new(start + 2 * pb, left, start + 3 * pb - 1, right),
        ]
    }

    /// Left, middle and right bands of Lxx.
    pub fn xx_bands(&self) -> [Rect; 3] {
        self.yy_bands().map(Rect::transposed)
    }

    /// Upper-left, upper-right, lower-left and lower-right lobes of Lxy
    /// (weights +1, -1, -1, +1).
    pub fn xy_lobes(&self) -> [Rect; 4] {
        let l = self.lobe;
        let far = self.half - self.lobe_gap;
        let near = far - l + 1;
        [
            Rect::new(-l, -l, -1, -1),
            Rect::new(-l, near, -1, far),
            Rect::new(near, -l, far, -1),
            Rect::new(near, near, far, far),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_nine_widths() {
        let g = BandGeometry::for_size(9).unwrap();
        assert_eq!(g.half, 4);
        assert_eq!(g.zero_band, 2);
        assert_eq!(g.positive_band, 3);
        assert_eq!(g.lobe, 3);
        assert_eq!(g.lobe_gap, 1);
    }

    #[test]
    fn rejects_even_or_tiny_sizes() {
        assert!(BandGeometry::for_size(8).is_err());
        assert!(BandGeometry::for_size(1).is_err());
        assert!(BandGeometry::for_size(0).is_err());
    }

    #[test]
    fn yy_bands_tile_the_kernel_rows() {
        let g = BandGeometry::for_size(15).unwrap();
        let [top, mid, bottom] = g.yy_bands();
        assert_eq!(top.top, -7);
        assert_eq!(top.bottom + 1, mid.top);
        assert_eq!(mid.bottom + 1, bottom.top);
        assert_eq!(bottom.bottom, 7);
        assert_eq!((top.left, top.right), (-4, 4));
    }

    #[test]
    fn xy_lobes_are_symmetric() {
        let g = BandGeometry::for_size(9).unwrap();
        let [ul, ur, ll, lr] = g.xy_lobes();
        assert_eq!(ul, Rect::new(-3, -3, -1, -1));
        assert_eq!(ur, Rect::new(-3, 1, -1, 3));
        assert_eq!(ll, ur.transposed());
        assert_eq!(lr, Rect::new(1, 1, 3, 3));
    }

    #[test]
    fn rect_sum_is_clamped_to_the_grid() {
        let src = Grid::filled(3, 3, 1.0);
        let ii = crate::integral::integral(&src);
        let everything = Rect::new(-5, -5, 5, 5);
        assert_eq!(everything.sum(&ii, 1, 1), 9.0);
        assert_eq!(Rect::new(0, 0, 0, 0).sum(&ii, 2, 2), 1.0);
        assert_eq!(Rect::new(1, 1, 3, 3).sum(&ii, 2, 2), 0.0);
    }
}
