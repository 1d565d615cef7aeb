use approx::assert_relative_eq;
use image::{GrayImage, Luma};
use surf_grid::app::{
    detect_with_config, draw_keypoints, load_config, params_from_config, run_detection, KeypointOut,
    ResponseConfig,
};
use surf_grid::hessian::hessian_determinant;
use surf_grid::integral::integral;
use surf_grid::{
    build_scale_space, find_keypoints_image, grid_from_gray, hessian_response_image, ChunkConfig,
    HessianParams, ScaleSpaceParams,
};

fn make_blob_image(w: u32, h: u32, cx: f32, cy: f32, sigma: f32) -> GrayImage {
    GrayImage::from_fn(w, h, |x, y| {
        let dx = x as f32 - cx;
        let dy = y as f32 - cy;
        let v = 220.0 * (-(dx * dx + dy * dy) / (2.0 * sigma * sigma)).exp();
        Luma([v.round() as u8])
    })
}

fn make_gradient_image(w: u32, h: u32) -> GrayImage {
    GrayImage::from_fn(w, h, |x, y| Luma([((x * 7 + y * 3) % 255) as u8]))
}

fn scratch_dir(name: &str) -> std::path::PathBuf {
    let dir = std::env::temp_dir().join(format!("surf-grid-{name}-{}", std::process::id()));
    std::fs::create_dir_all(&dir).expect("scratch dir");
    dir
}

#[test]
fn response_helper_matches_core_pipeline() {
    let img = make_gradient_image(24, 20);
    let helper = hessian_response_image(&img, 0, 1).unwrap();
    let core = hessian_determinant(&integral(&grid_from_gray(&img)), 0, 1).unwrap();
    assert_eq!(helper, core);
}

#[test]
fn strongest_keypoint_sits_on_the_blob() {
    let img = make_blob_image(64, 64, 32.0, 30.0, 2.5);
    let keypoints = find_keypoints_image(
        &img,
        &ScaleSpaceParams::default(),
        &HessianParams::default(),
        2.0,
    )
    .unwrap();

    let best = keypoints.first().expect("at least one keypoint");
    let dx = best.column as f32 - 32.0;
    let dy = best.row as f32 - 30.0;
    assert!(
        (dx * dx + dy * dy).sqrt() <= 1.5,
        "strongest keypoint at ({}, {})",
        best.column,
        best.row
    );
    assert!(keypoints.windows(2).all(|w| w[0].response >= w[1].response));
}

#[test]
fn chunked_scale_space_matches_single_pass() {
    let source = grid_from_gray(&make_gradient_image(40, 33));
    let single = build_scale_space(&source, &ScaleSpaceParams::new(2, 3)).unwrap();
    let chunked = build_scale_space(
        &source,
        &ScaleSpaceParams::new(2, 3).with_chunk(ChunkConfig::new(97)),
    )
    .unwrap();

    assert_eq!(single.integral, chunked.integral);
    assert_eq!(single.layers.len(), chunked.layers.len());
    for (a, b) in single.layers.iter().zip(&chunked.layers) {
        assert_eq!((a.octave, a.level, a.filter_size), (b.octave, b.level, b.filter_size));
        assert_eq!(a.response, b.response);
    }
}

#[test]
fn config_overrides_are_validated() {
    let mut cfg = ResponseConfig {
        octaves: Some(2),
        levels: Some(3),
        chunk_iterations: Some(128),
        nms_radius: Some(2),
        threshold_abs: Some(1.0),
        ..Default::default()
    };
    let (scale, params, merge) = params_from_config(&cfg).unwrap();
    assert_eq!((scale.octaves, scale.levels, scale.chunk.iterations), (2, 3, 128));
    assert_eq!(params.nms_radius, 2);
    assert_eq!(params.threshold_abs, Some(1.0));
    assert_relative_eq!(merge, 2.0);

    cfg.levels = Some(0);
    assert!(params_from_config(&cfg).is_err());
}

#[test]
fn detect_with_config_reports_image_geometry() {
    let img = make_blob_image(48, 40, 24.0, 20.0, 2.0);
    let cfg = ResponseConfig {
        image: "blob.png".into(),
        octaves: Some(1),
        ..Default::default()
    };
    let dump = detect_with_config(&img, &cfg).unwrap();
    assert_eq!((dump.width, dump.height), (48, 40));
    assert_eq!(dump.image, "blob.png");
    assert!(!dump.keypoints.is_empty());
    for kp in &dump.keypoints {
        assert_relative_eq!(kp.sigma, 1.2 * kp.filter_size as f32 / 9.0, max_relative = 1e-6);
    }
}

#[test]
fn oversized_octave_count_is_an_error() {
    let img = make_blob_image(16, 16, 8.0, 8.0, 2.0);
    let cfg = ResponseConfig {
        octaves: Some(64),
        levels: Some(2),
        ..Default::default()
    };
    assert!(detect_with_config(&img, &cfg).is_err());
}

#[test]
fn keypoints_are_outlined_at_filter_size() {
    let mut vis = GrayImage::new(21, 21);
    let kp = KeypointOut {
        x: 10.0,
        y: 10.0,
        response: 1.0,
        filter_size: 9,
        sigma: 1.2,
        octave: 0,
        level: 0,
    };
    draw_keypoints(&mut vis, &[kp]);

    assert_eq!(vis.get_pixel(10, 10).0[0], 255);
    for (x, y) in [(6, 6), (14, 6), (6, 14), (14, 14), (10, 6), (6, 10)] {
        assert_eq!(vis.get_pixel(x, y).0[0], 255, "({x}, {y})");
    }
    assert_eq!(vis.get_pixel(11, 11).0[0], 0);
    assert_eq!(vis.get_pixel(5, 10).0[0], 0);
}

#[test]
fn config_paths_resolve_against_config_dir() {
    let dir = scratch_dir("relative");
    let config_path = dir.join("config.json");
    let config = serde_json::json!({
        "image": "input.png",
        "output_json": "out/keypoints.json",
        "output_png": "/tmp/absolute.png",
    });
    std::fs::write(&config_path, config.to_string()).unwrap();

    let cfg = load_config(&config_path).unwrap();
    assert_eq!(cfg.image, dir.join("input.png"));
    assert_eq!(cfg.output_json, Some(dir.join("out/keypoints.json")));
    assert_eq!(cfg.output_png, Some(std::path::PathBuf::from("/tmp/absolute.png")));
    assert_eq!(cfg.output_response, None);

    std::fs::write(&config_path, r#"{"octaves": 2}"#).unwrap();
    assert!(load_config(&config_path).is_err());

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn run_detection_writes_outputs() {
    let dir = scratch_dir("run");
    let image_path = dir.join("blob.png");
    make_blob_image(48, 48, 24.0, 24.0, 2.0)
        .save(&image_path)
        .unwrap();

    let config_path = dir.join("config.json");
    let json_out = dir.join("out.json");
    let png_out = dir.join("out.png");
    let resp_out = dir.join("resp.png");
    let config = serde_json::json!({
        "image": image_path,
        "octaves": 1,
        "levels": 3,
        "chunk_iterations": 500,
        "output_json": json_out,
        "output_png": png_out,
        "output_response": resp_out,
    });
    std::fs::write(&config_path, config.to_string()).unwrap();

    let cfg = load_config(&config_path).unwrap();
    let dump = run_detection(cfg).unwrap();

    let written: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&json_out).unwrap()).unwrap();
    assert_eq!(
        written["keypoints"].as_array().map(|k| k.len()),
        Some(dump.keypoints.len())
    );
    assert_eq!(written["chunk_iterations"], 500);
    assert!(png_out.exists());
    assert!(resp_out.exists());

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn missing_config_is_reported() {
    let err = load_config(std::path::Path::new("/definitely/not/here.json")).unwrap_err();
    assert!(format!("{err:#}").contains("opening config"));
}
