use surf_grid_core::boxfilter::{
    discrete_log_response, discrete_log_xx, discrete_log_xy, discrete_log_yy, fast_log_xx,
    fast_log_xy, fast_log_yy, Derivative,
};
use surf_grid_core::convolve::convolve_with;
use surf_grid_core::hessian::{filter_size, hessian_determinant, hessian_determinant_for_size};
use surf_grid_core::integral::integral;
use surf_grid_core::{EdgeMode, Grid};

/// Small integer values keep every sum exact in f32.
fn make_texture(rows: usize, columns: usize, seed: u32) -> Grid {
    let mut state = seed;
    let data = (0..rows * columns)
        .map(|_| {
            state = state.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            ((state >> 16) % 10) as f32
        })
        .collect();
    Grid::from_vec(rows, columns, data).expect("texture grid")
}

#[test]
fn box_filters_match_discrete_kernels_size_nine() {
    let src = make_texture(3, 3, 1);
    let ii = integral(&src);

    let xx = convolve_with(&src, &discrete_log_xx(9).unwrap(), EdgeMode::Zero).unwrap();
    let yy = convolve_with(&src, &discrete_log_yy(9).unwrap(), EdgeMode::Zero).unwrap();
    let xy = convolve_with(&src, &discrete_log_xy(9).unwrap(), EdgeMode::Zero).unwrap();

    assert_eq!(fast_log_xx(&ii, 9).unwrap(), xx);
    assert_eq!(fast_log_yy(&ii, 9).unwrap(), yy);
    assert_eq!(fast_log_xy(&ii, 9).unwrap(), xy);
}

#[test]
fn box_filters_match_discrete_kernels_across_sizes_and_shapes() {
    let shapes = [(3, 3), (5, 8), (16, 16), (23, 11), (40, 33)];
    let sizes = [3, 9, 15, 21, 27, 39];
    for (i, &(rows, columns)) in shapes.iter().enumerate() {
        let src = make_texture(rows, columns, 17 + i as u32);
        let ii = integral(&src);
        for &size in &sizes {
            for d in [Derivative::Xx, Derivative::Yy, Derivative::Xy] {
                let fast = surf_grid_core::boxfilter::fast_log(&ii, size, d).unwrap();
                let oracle = discrete_log_response(&src, size, d).unwrap();
                assert_eq!(fast, oracle, "{rows}x{columns}, size {size}, {d:?}");
            }
        }
    }
}

#[test]
fn yy_responds_to_horizontal_line() {
    let mut src = Grid::new(21, 21);
    for c in 0..21 {
        src.put(10, c, 1.0);
    }
    let ii = integral(&src);
    let yy = fast_log_yy(&ii, 9).unwrap();
    let xx = fast_log_xx(&ii, 9).unwrap();
    // Line in the middle band: -2 * 5 columns.
    assert_eq!(yy.at(10, 10), -10.0);
    // Same line seen by the top band from 3 rows below.
    assert_eq!(yy.at(13, 10), 5.0);
    // Constant along the row, so no horizontal curvature in the interior.
    assert_eq!(xx.at(10, 10), 0.0);
}

#[test]
fn band_overhang_breaks_equivalence_only_for_second_residue() {
    let src = make_texture(16, 16, 5);
    let ii = integral(&src);
    let fast = |size, d| surf_grid_core::boxfilter::fast_log(&ii, size, d).unwrap();
    let oracle = |size, d| discrete_log_response(&src, size, d).unwrap();

    for size in [7, 13] {
        for d in [Derivative::Xx, Derivative::Yy, Derivative::Xy] {
            assert_eq!(fast(size, d), oracle(size, d), "size {size}, {d:?}");
        }
    }
    for size in [5, 11] {
        assert_eq!(fast(size, Derivative::Xy), oracle(size, Derivative::Xy), "size {size}");
        assert_ne!(fast(size, Derivative::Xx), oracle(size, Derivative::Xx), "size {size}");
        assert_ne!(fast(size, Derivative::Yy), oracle(size, Derivative::Yy), "size {size}");
    }
}

#[test]
fn hessian_equals_manual_combination() {
    let src = make_texture(24, 30, 99);
    let ii = integral(&src);
    for (octave, level) in [(0, 0), (0, 1), (1, 0), (1, 1)] {
        let size = filter_size(octave, level).unwrap();
        let xx = fast_log_xx(&ii, size).unwrap();
        let yy = fast_log_yy(&ii, size).unwrap();
        let xy = fast_log_xy(&ii, size).unwrap();

        let resp = hessian_determinant(&ii, octave, level).unwrap();
        for r in 0..src.rows() {
            for c in 0..src.columns() {
                let manual = xx.at(r, c) * yy.at(r, c) - xy.at(r, c) * xy.at(r, c);
                assert_eq!(resp.at(r, c), manual, "({octave}, {level}) at ({r}, {c})");
            }
        }
        assert_eq!(hessian_determinant_for_size(&ii, size).unwrap(), resp);
    }
}

#[test]
fn hessian_peaks_on_a_blob() {
    let mut src = Grid::new(31, 31);
    for r in 13..18 {
        for c in 13..18 {
            src.put(r, c, 10.0);
        }
    }
    let ii = integral(&src);
    let resp = hessian_determinant(&ii, 0, 0).unwrap();
    let max = resp.max().unwrap();
    assert!(max > 0.0);
    assert_eq!(resp.at(15, 15), max);
}
