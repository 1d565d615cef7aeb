//! Otsu's method for picking a global threshold from a histogram.
use crate::histogram::Histogram;

/// Optimal bin threshold for `histogram` built from `total` samples.
///
/// Scans the split that maximizes between-class variance. When several bins
/// tie for the maximum the result is the midpoint of the first and last of
/// them, so it may fall between two bins.
pub fn otsu(histogram: &[usize], total: usize) -> f32 {
    let total = total as f64;
    let sum: f64 = histogram
        .iter()
        .enumerate()
        .map(|(i, &count)| i as f64 * count as f64)
        .sum();

    let mut sum_b = 0.0f64;
    let mut w_b = 0.0f64;
    let mut max = 0.0f64;
    let mut first = 0usize;
    let mut last = 0usize;

    for (i, &count) in histogram.iter().enumerate() {
        w_b += count as f64;
        if w_b == 0.0 {
            continue;
        }
        let w_f = total - w_b;
        if w_f <= 0.0 {
            break;
        }
        sum_b += i as f64 * count as f64;
        let m_b = sum_b / w_b;
        let m_f = (sum - sum_b) / w_f;
        let between = w_b * w_f * (m_b - m_f) * (m_b - m_f);
        if between >= max {
            last = i;
            if between > max {
                first = i;
            }
            max = between;
        }
    }

    (first + last) as f32 / 2.0
}

impl Histogram {
    /// Otsu threshold in bin units.
    pub fn otsu_bin(&self) -> f32 {
        otsu(&self.counts, self.total())
    }

    /// Otsu threshold mapped back to the value domain.
    pub fn otsu_value(&self) -> f32 {
        self.min + self.otsu_bin() * self.bin_size
    }
}
