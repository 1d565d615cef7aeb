//! Keypoint extraction from a Hessian response grid.
use crate::grid::Grid;
use crate::HessianParams;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
#[cfg(feature = "tracing")]
use tracing::instrument;

/// A local maximum of the determinant-of-Hessian response.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Keypoint {
    pub row: usize,
    pub column: usize,
    /// Response value at the peak.
    pub response: f32,
    /// Box-filter size the response was computed with.
    pub filter_size: usize,
}

/// Threshold + NMS over `response`, sorted by descending response.
///
/// Honors relative vs absolute thresholds (a negative threshold is raised to
/// 0) and skips a border of `params.border` cells, or `filter_size / 2` when
/// unset, where the box filters are cropped by the grid edge.
#[cfg_attr(
    feature = "tracing",
    instrument(
        level = "debug",
        skip(response, params),
        fields(rows = response.rows(), columns = response.columns())
    )
)]
pub fn detect_keypoints(response: &Grid, params: &HessianParams, filter_size: usize) -> Vec<Keypoint> {
    let rows = response.rows();
    let columns = response.columns();

    let Some(max_r) = response.max() else {
        return Vec::new();
    };
    if !max_r.is_finite() {
        return Vec::new();
    }

    let thr = params
        .threshold_abs
        .unwrap_or(params.threshold_rel * max_r)
        .max(0.0);

    let border = params.border.unwrap_or(filter_size / 2);
    if rows <= 2 * border || columns <= 2 * border {
        return Vec::new();
    }

    let nms_r = params.nms_radius as isize;
    let mut keypoints = Vec::new();
    for row in border..(rows - border) {
        for column in border..(columns - border) {
            let v = response.at(row, column);
            if v <= thr {
                continue;
            }
            if !is_local_max(response, row, column, nms_r, v) {
                continue;
            }
            keypoints.push(Keypoint {
                row,
                column,
                response: v,
                filter_size,
            });
        }
    }

    keypoints.sort_by(|a, b| b.response.total_cmp(&a.response));
    keypoints
}

/// `true` if no cell within `r` (Chebyshev distance) is strictly greater.
pub(crate) fn is_local_max(response: &Grid, row: usize, column: usize, r: isize, v: f32) -> bool {
    let rows = response.rows() as isize;
    let columns = response.columns() as isize;
    let (cr, cc) = (row as isize, column as isize);

    for dr in -r..=r {
        for dc in -r..=r {
            if dr == 0 && dc == 0 {
                continue;
            }
            let rr = cr + dr;
            let cc2 = cc + dc;
            if rr < 0 || cc2 < 0 || rr >= rows || cc2 >= columns {
                continue;
            }
            if response.at(rr as usize, cc2 as usize) > v {
                return false;
            }
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peaks() -> Grid {
        let mut g = Grid::new(12, 12);
        g.put(4, 4, 10.0);
        g.put(4, 5, 9.0);
        g.put(8, 7, 6.0);
        g.put(1, 1, 50.0);
        g
    }

    #[test]
    fn finds_peaks_inside_border_sorted() {
        let params = HessianParams {
            border: Some(2),
            ..Default::default()
        };
        let kps = detect_keypoints(&peaks(), &params, 9);
        let coords: Vec<_> = kps.iter().map(|k| (k.row, k.column)).collect();
        assert_eq!(coords, vec![(4, 4), (8, 7)]);
        assert!(kps.iter().all(|k| k.filter_size == 9));
    }

    #[test]
    fn absolute_threshold_overrides_relative() {
        let params = HessianParams {
            threshold_abs: Some(7.0),
            border: Some(2),
            ..Default::default()
        };
        let kps = detect_keypoints(&peaks(), &params, 9);
        assert_eq!(kps.len(), 1);
        assert_eq!(kps[0].response, 10.0);
    }

    #[test]
    fn default_border_is_half_filter_size() {
        // Border 4 keeps rows/columns 4..8; the peak at row 8 is dropped.
        let kps = detect_keypoints(&peaks(), &HessianParams::default(), 9);
        assert_eq!(
            kps.iter().map(|k| (k.row, k.column)).collect::<Vec<_>>(),
            vec![(4, 4)]
        );
        // Filter larger than the grid leaves nothing to scan.
        assert!(detect_keypoints(&peaks(), &HessianParams::default(), 27).is_empty());
    }

    #[test]
    fn empty_response_yields_nothing() {
        assert!(detect_keypoints(&Grid::new(0, 0), &HessianParams::default(), 9).is_empty());
    }
}
