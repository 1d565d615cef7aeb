//! Shared application-level helpers for the CLI and examples.
//!
//! These functions wire up I/O (load image, JSON/PNG output) around the
//! scale-space detection APIs so both the CLI and examples share the same
//! behavior.

use crate::image::{find_keypoints_image, gray_from_grid};
use crate::scale_space::{ScaleKeypoint, ScaleSpaceParams};
use anyhow::{Context, Result};
use image::{GrayImage, ImageReader, Luma};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path, path::PathBuf};
use surf_grid_core::{ChunkConfig, HessianParams};

#[cfg(feature = "tracing")]
use tracing::info;

/// JSON configuration accepted by the `surf-grid` binary.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ResponseConfig {
    pub image: PathBuf,
    pub octaves: Option<u32>,
    pub levels: Option<u32>,
    pub chunk_iterations: Option<usize>,
    pub chunk_delay_ms: Option<u64>,
    pub threshold_rel: Option<f32>,
    pub threshold_abs: Option<f32>,
    pub nms_radius: Option<u32>,
    pub merge_radius: Option<f32>,
    pub output_json: Option<PathBuf>,
    pub output_png: Option<PathBuf>,
    /// Optional response map of the first layer, min–max normalized.
    pub output_response: Option<PathBuf>,
    pub log_level: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct KeypointOut {
    pub x: f32,
    pub y: f32,
    pub response: f32,
    pub filter_size: usize,
    pub sigma: f32,
    pub octave: u32,
    pub level: u32,
}

impl From<&ScaleKeypoint> for KeypointOut {
    fn from(kp: &ScaleKeypoint) -> Self {
        Self {
            x: kp.column as f32,
            y: kp.row as f32,
            response: kp.response,
            filter_size: kp.filter_size,
            sigma: kp.sigma(),
            octave: kp.octave,
            level: kp.level,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ResponseDump {
    pub image: String,
    pub width: u32,
    pub height: u32,
    pub octaves: u32,
    pub levels: u32,
    pub chunk_iterations: usize,
    pub merge_radius: f32,
    pub keypoints: Vec<KeypointOut>,
}

/// Default merge radius in pixels.
pub const DEFAULT_MERGE_RADIUS: f32 = 2.0;

/// Scale-space and detector parameters after applying config overrides.
pub fn params_from_config(cfg: &ResponseConfig) -> Result<(ScaleSpaceParams, HessianParams, f32)> {
    let mut scale = ScaleSpaceParams::default();
    if let Some(v) = cfg.octaves {
        if v == 0 {
            anyhow::bail!("octaves must be >= 1");
        }
        scale.octaves = v;
    }
    if let Some(v) = cfg.levels {
        if v == 0 {
            anyhow::bail!("levels must be >= 1");
        }
        scale.levels = v;
    }
    scale.chunk = ChunkConfig::new(cfg.chunk_iterations.unwrap_or(0))
        .with_delay_ms(cfg.chunk_delay_ms.unwrap_or(0));

    let mut params = HessianParams::default();
    if let Some(t) = cfg.threshold_rel {
        params.threshold_rel = t;
    }
    if let Some(t) = cfg.threshold_abs {
        params.threshold_abs = Some(t);
    }
    if let Some(n) = cfg.nms_radius {
        params.nms_radius = n;
    }

    let merge_radius = cfg.merge_radius.unwrap_or(DEFAULT_MERGE_RADIUS);
    if merge_radius < 0.0 {
        anyhow::bail!("merge radius must be >= 0");
    }
    Ok((scale, params, merge_radius))
}

/// Detect keypoints on an already loaded image according to `cfg`.
pub fn detect_with_config(img: &GrayImage, cfg: &ResponseConfig) -> Result<ResponseDump> {
    let (scale, params, merge_radius) = params_from_config(cfg)?;
    let keypoints = find_keypoints_image(img, &scale, &params, merge_radius)
        .context("computing scale-space keypoints")?;

    Ok(ResponseDump {
        image: cfg.image.to_string_lossy().into_owned(),
        width: img.width(),
        height: img.height(),
        octaves: scale.octaves,
        levels: scale.levels,
        chunk_iterations: scale.chunk.iterations,
        merge_radius,
        keypoints: keypoints.iter().map(KeypointOut::from).collect(),
    })
}

/// Load the image named in `cfg`, detect keypoints and write the JSON dump and
/// PNG visualization.
pub fn run_detection(cfg: ResponseConfig) -> Result<ResponseDump> {
    let img = ImageReader::open(&cfg.image)
        .with_context(|| format!("opening image {}", cfg.image.display()))?
        .decode()
        .with_context(|| format!("decoding image {}", cfg.image.display()))?
        .to_luma8();

    let dump = detect_with_config(&img, &cfg)?;
    #[cfg(feature = "tracing")]
    info!(
        keypoints = dump.keypoints.len(),
        width = dump.width,
        height = dump.height,
        "detection finished"
    );

    let json_out = cfg
        .output_json
        .clone()
        .unwrap_or_else(|| cfg.image.with_extension("keypoints.json"));
    write_json(&json_out, &dump)?;

    let png_out = cfg
        .output_png
        .clone()
        .unwrap_or_else(|| cfg.image.with_extension("keypoints.png"));
    let mut vis = img.clone();
    draw_keypoints(&mut vis, &dump.keypoints);
    vis.save(&png_out)
        .with_context(|| format!("writing {}", png_out.display()))?;

    if let Some(path) = &cfg.output_response {
        let resp = crate::image::hessian_response_image(&img, 0, 0)?;
        gray_from_grid(&resp)
            .save(path)
            .with_context(|| format!("writing {}", path.display()))?;
    }

    Ok(dump)
}

/// Outline each keypoint with a square as wide as its filter and mark the
/// center pixel.
pub fn draw_keypoints(vis: &mut GrayImage, keypoints: &[KeypointOut]) {
    let (w, h) = (vis.width() as i64, vis.height() as i64);
    let mut plot = |x: i64, y: i64| {
        if (0..w).contains(&x) && (0..h).contains(&y) {
            vis.put_pixel(x as u32, y as u32, Luma([255u8]));
        }
    };
    for kp in keypoints {
        let (cx, cy) = (kp.x.round() as i64, kp.y.round() as i64);
        let half = (kp.filter_size / 2) as i64;
        plot(cx, cy);
        for d in -half..=half {
            plot(cx + d, cy - half);
            plot(cx + d, cy + half);
            plot(cx - half, cy + d);
            plot(cx + half, cy + d);
        }
    }
}

/// Pretty-printed JSON with a trailing newline; missing parent directories
/// are created.
pub fn write_json(path: &Path, value: &impl Serialize) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }
    let mut text = serde_json::to_string_pretty(value)?;
    text.push('\n');
    fs::write(path, text).with_context(|| format!("writing {}", path.display()))
}

/// Read a [`ResponseConfig`]; relative paths inside it are resolved against
/// the config file's directory.
pub fn load_config(path: &Path) -> Result<ResponseConfig> {
    let text = fs::read_to_string(path).with_context(|| format!("opening config {}", path.display()))?;
    let mut cfg: ResponseConfig =
        serde_json::from_str(&text).with_context(|| format!("parsing config {}", path.display()))?;
    if cfg.image.as_os_str().is_empty() {
        anyhow::bail!("config {} does not name an image", path.display());
    }

    let base = path.parent().unwrap_or_else(|| Path::new(""));
    let resolve = |p: &mut PathBuf| {
        if p.is_relative() {
            *p = base.join(&*p);
        }
    };
    resolve(&mut cfg.image);
    for out in [&mut cfg.output_json, &mut cfg.output_png, &mut cfg.output_response]
        .into_iter()
        .flatten()
    {
        resolve(out);
    }
    Ok(cfg)
}
