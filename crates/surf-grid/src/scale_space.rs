//! Multi-scale Hessian responses and keypoint extraction across scales.
//!
//! One integral image is shared by every `(octave, level)` layer; each layer
//! only differs in its box-filter size (see [`filter_size`]). With chunking
//! configured, all layers run as interleaved tasks on one [`Scheduler`], so a
//! caller-chosen chunk budget bounds the work done between yields.

use surf_grid_core::detect::{detect_keypoints, Keypoint};
use surf_grid_core::hessian::{filter_size, HessianOp};
use surf_grid_core::integral::{integral, integral_chunked};
use surf_grid_core::{ChunkConfig, ChunkedTraversal, Grid, GridError, HessianParams, Result, Scheduler};

use serde::{Deserialize, Serialize};
#[cfg(feature = "tracing")]
use tracing::{debug, debug_span, instrument};

/// Which layers to compute and how to schedule them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScaleSpaceParams {
    /// Number of octaves (>= 1).
    pub octaves: u32,
    /// Levels per octave (>= 1).
    pub levels: u32,
    /// Chunking applied to the integral image and every layer.
    pub chunk: ChunkConfig,
    /// Divide each layer by `filter_size⁴` so responses compare across scales.
    pub normalize: bool,
}

impl Default for ScaleSpaceParams {
    fn default() -> Self {
        Self {
            octaves: 3,
            levels: 4,
            chunk: ChunkConfig::default(),
            normalize: true,
        }
    }
}

impl ScaleSpaceParams {
    pub fn new(octaves: u32, levels: u32) -> Self {
        Self {
            octaves,
            levels,
            ..Self::default()
        }
    }

    pub fn with_chunk(mut self, chunk: ChunkConfig) -> Self {
        self.chunk = chunk;
        self
    }

    pub fn with_normalize(mut self, normalize: bool) -> Self {
        self.normalize = normalize;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.octaves == 0 || self.levels == 0 {
            return Err(GridError::InvalidArgument(format!(
                "scale space needs at least one octave and one level, got {}x{}",
                self.octaves, self.levels
            )));
        }
        // Sizes grow with both indices, so the last layer bounds them all.
        filter_size(self.octaves - 1, self.levels - 1)?;
        Ok(())
    }
}

/// Determinant-of-Hessian response for one `(octave, level)`, scaled by
/// `filter_size⁻⁴` when [`ScaleSpaceParams::normalize`] is set.
#[derive(Clone, Debug)]
pub struct ResponseLayer {
    pub octave: u32,
    pub level: u32,
    pub filter_size: usize,
    pub response: Grid,
}

/// All response layers of one source grid.
#[derive(Clone, Debug)]
pub struct ScaleSpace {
    pub integral: Grid,
    /// Layers ordered by octave, then level.
    pub layers: Vec<ResponseLayer>,
}

impl ScaleSpace {
    pub fn layer(&self, octave: u32, level: u32) -> Option<&ResponseLayer> {
        self.layers
            .iter()
            .find(|l| l.octave == octave && l.level == level)
    }

    pub fn rows(&self) -> usize {
        self.integral.rows()
    }

    pub fn columns(&self) -> usize {
        self.integral.columns()
    }
}

/// Keypoint tagged with the layer it was found on.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScaleKeypoint {
    pub row: usize,
    pub column: usize,
    pub response: f32,
    pub filter_size: usize,
    pub octave: u32,
    pub level: u32,
}

impl ScaleKeypoint {
    /// Gaussian scale approximated by the box filter (`1.2` at size 9).
    pub fn sigma(&self) -> f32 {
        1.2 * self.filter_size as f32 / 9.0
    }

    fn from_keypoint(kp: Keypoint, octave: u32, level: u32) -> Self {
        Self {
            row: kp.row,
            column: kp.column,
            response: kp.response,
            filter_size: kp.filter_size,
            octave,
            level,
        }
    }
}

/// Compute the integral image of `source` and every Hessian layer.
#[cfg_attr(
    feature = "tracing",
    instrument(
        level = "debug",
        skip(source, params),
        fields(rows = source.rows(), columns = source.columns(), octaves = params.octaves, levels = params.levels)
    )
)]
pub fn build_scale_space(source: &Grid, params: &ScaleSpaceParams) -> Result<ScaleSpace> {
    params.validate()?;

    let ii = if params.chunk.is_chunked() {
        let mut out = source.zeros_like();
        integral_chunked(source, &mut out, params.chunk)?.run();
        out
    } else {
        integral(source)
    };

    let mut coords = Vec::new();
    for octave in 0..params.octaves {
        for level in 0..params.levels {
            coords.push((octave, level, filter_size(octave, level)?));
        }
    }

    // Build every op first so an invalid size fails before any work starts.
    let ops = coords
        .iter()
        .map(|&(_, _, size)| HessianOp::new(&ii, size))
        .collect::<Result<Vec<_>>>()?;

    let mut responses: Vec<Grid> = coords.iter().map(|_| ii.zeros_like()).collect();
    {
        #[cfg(feature = "tracing")]
        let _span = debug_span!("layers", count = coords.len()).entered();
        let mut scheduler = Scheduler::new();
        for (op, out) in ops.into_iter().zip(responses.iter_mut()) {
            scheduler.spawn(ChunkedTraversal::new(op, out, params.chunk));
        }
        let _chunks = scheduler.run();
        #[cfg(feature = "tracing")]
        debug!(chunks = _chunks, "scale space layers complete");
    }

    if params.normalize {
        for (response, &(_, _, size)) in responses.iter_mut().zip(&coords) {
            response.scale_in_place(1.0 / (size as f32).powi(4));
        }
    }

    let layers = coords
        .into_iter()
        .zip(responses)
        .map(|((octave, level, filter_size), response)| ResponseLayer {
            octave,
            level,
            filter_size,
            response,
        })
        .collect();

    Ok(ScaleSpace {
        integral: ii,
        layers,
    })
}

/// Per-layer NMS, suppression against neighboring levels of the same octave,
/// then merging of detections closer than `merge_radius`.
///
/// The result is sorted by descending response.
#[cfg_attr(feature = "tracing", instrument(level = "debug", skip(space, params)))]
pub fn find_keypoints_scale_space(
    space: &ScaleSpace,
    params: &HessianParams,
    merge_radius: f32,
) -> Vec<ScaleKeypoint> {
    let scale_r = params.nms_radius.max(1) as isize;
    let mut all = Vec::new();

    for layer in &space.layers {
        let below = layer
            .level
            .checked_sub(1)
            .and_then(|l| space.layer(layer.octave, l));
        let above = space.layer(layer.octave, layer.level + 1);

        for kp in detect_keypoints(&layer.response, params, layer.filter_size) {
            let dominated = [below, above]
                .into_iter()
                .flatten()
                .any(|other| exceeds_within(&other.response, kp.row, kp.column, scale_r, kp.response));
            if !dominated {
                all.push(ScaleKeypoint::from_keypoint(kp, layer.octave, layer.level));
            }
        }
    }

    all.sort_by(|a, b| b.response.total_cmp(&a.response));
    merge_keypoints(all, merge_radius)
}

/// `true` if any cell of `grid` within `r` of `(row, column)`, the center
/// included, is strictly greater than `v`.
fn exceeds_within(grid: &Grid, row: usize, column: usize, r: isize, v: f32) -> bool {
    let rows = grid.rows() as isize;
    let columns = grid.columns() as isize;
    let r0 = (row as isize - r).max(0);
    let r1 = (row as isize + r).min(rows - 1);
    let c0 = (column as isize - r).max(0);
    let c1 = (column as isize + r).min(columns - 1);
    (r0..=r1).any(|rr| (c0..=c1).any(|cc| grid.at(rr as usize, cc as usize) > v))
}

/// Keep the strongest keypoint among those within `radius` of each other.
///
/// Expects `keypoints` sorted by descending response.
pub fn merge_keypoints(keypoints: Vec<ScaleKeypoint>, radius: f32) -> Vec<ScaleKeypoint> {
    let r2 = radius * radius;
    let mut out: Vec<ScaleKeypoint> = Vec::new();

    'outer: for kp in keypoints {
        for o in &mut out {
            let dr = kp.row as f32 - o.row as f32;
            let dc = kp.column as f32 - o.column as f32;
            if dr * dr + dc * dc <= r2 {
                if kp.response > o.response {
                    *o = kp;
                }
                continue 'outer;
            }
        }
        out.push(kp);
    }

    out
}
