//! Fixed-bin histograms of grid values.
use crate::error::{GridError, Result};
use crate::grid::Grid;

/// Per-bin counts over `[min, max]`.
#[derive(Clone, Debug, PartialEq)]
pub struct Histogram {
    pub counts: Vec<usize>,
    pub min: f32,
    pub max: f32,
    /// Value width of one bin; 0 when every sample is equal.
    pub bin_size: f32,
}

impl Histogram {
    /// Number of samples counted.
    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }

    /// Lower value edge of bin `bin`.
    pub fn bin_value(&self, bin: usize) -> f32 {
        self.min + bin as f32 * self.bin_size
    }
}

impl Grid {
    /// Histogram with `bins` bins spanning the grid's value range.
    ///
    /// `min` falls in the first bin and `max` in the last; the bin width is
    /// `(max - min) / (bins - 1)`. A constant grid puts everything in bin 0.
    pub fn histogram(&self, bins: usize) -> Result<Histogram> {
        if bins == 0 {
            return Err(GridError::InvalidArgument(
                "histogram needs at least one bin".to_string(),
            ));
        }
        let (Some(min), Some(max)) = (self.min(), self.max()) else {
            return Err(GridError::InvalidArgument(
                "histogram of an empty grid".to_string(),
            ));
        };

        let bin_size = if bins > 1 && max > min {
            (max - min) / (bins - 1) as f32
        } else {
            0.0
        };

        let mut counts = vec![0usize; bins];
        for &v in self.as_slice() {
            let bin = if bin_size > 0.0 {
                (((v - min) / bin_size).floor() as usize).min(bins - 1)
            } else {
                0
            };
            counts[bin] += 1;
        }

        Ok(Histogram {
            counts,
            min,
            max,
            bin_size,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_values_one_per_bin() {
        let g = Grid::from_vec(3, 3, vec![0., 1., 2., 3., 4., 3., 2., 0., 0.]).unwrap();
        let h = g.histogram(5).unwrap();
        assert_eq!(h.counts, vec![3, 1, 2, 2, 1]);
        assert_eq!((h.min, h.max, h.bin_size), (0.0, 4.0, 1.0));
        assert_eq!(h.total(), 9);
        assert_eq!(h.bin_value(3), 3.0);
    }

    #[test]
    fn constant_grid_lands_in_first_bin() {
        let h = Grid::filled(2, 2, 5.0).histogram(4).unwrap();
        assert_eq!(h.counts, vec![4, 0, 0, 0]);
    }

    #[test]
    fn rejects_zero_bins_and_empty_grid() {
        assert!(Grid::filled(1, 1, 0.0).histogram(0).is_err());
        assert!(Grid::new(0, 3).histogram(4).is_err());
    }
}
