//! Dense 2D grids, integral images and box-filter Hessian responses.
//!
//! # Overview
//!
//! This crate exposes the computational building blocks of a SURF-style blob
//! detector:
//!
//! - [`grid`] – row-major `f32` grid with edge-aware addressing ([`edge`]).
//! - [`convolve`] – cross-correlation with a small kernel.
//! - [`integral`] – summed-area tables and O(1) rectangle sums.
//! - [`boxfilter`] – box-filter approximations of `Lxx`, `Lyy` and `Lxy`
//!   built from the band layout in [`bands`], plus the explicit reference
//!   kernels they are validated against.
//! - [`hessian`] – the determinant-of-Hessian response and the
//!   octave/level → filter size mapping.
//! - [`detect`] – thresholding and non-maximum suppression on a response.
//! - [`chunk`] – the cooperative scheduler that lets any of the passes above
//!   run in bounded, resumable chunks.
//!
//! Smaller helpers live in [`kernel`] (identity, average, Gaussian, Sobel,
//! Laplacian), [`histogram`], [`otsu`] and [`channels`] (multi-channel
//! images).
//!
//! # Features
//!
//! - `serde` – derives `Serialize`/`Deserialize` for the parameter types
//!   ([`EdgeMode`], [`ChunkConfig`], [`HessianParams`], [`Keypoint`], …).
//! - `tracing` – emits spans for the public passes and `trace!` events when a
//!   chunked traversal suspends.
//!
//! Neither feature changes numerical results.

pub mod bands;
pub mod boxfilter;
pub mod channels;
pub mod chunk;
pub mod convolve;
pub mod detect;
pub mod edge;
pub mod error;
pub mod grid;
pub mod hessian;
pub mod histogram;
pub mod integral;
pub mod kernel;
pub mod otsu;

pub use crate::boxfilter::Derivative;
pub use crate::channels::{ChannelImage, Colorspace};
pub use crate::chunk::{CellOp, ChunkConfig, ChunkState, ChunkedTraversal, Scheduler, Step, TaskId};
pub use crate::detect::{detect_keypoints, Keypoint};
pub use crate::edge::EdgeMode;
pub use crate::error::{GridError, Result};
pub use crate::grid::Grid;
pub use crate::hessian::filter_size;
pub use crate::histogram::Histogram;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Tunable parameters for keypoint extraction from a Hessian response.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct HessianParams {
    /// Relative threshold as a fraction of the max response (e.g. 0.01 = 1%).
    pub threshold_rel: f32,
    /// Absolute threshold override; if `Some`, this is used instead of `threshold_rel`.
    pub threshold_abs: Option<f32>,
    /// Non-maximum suppression radius (in cells).
    pub nms_radius: u32,
    /// Cells skipped at the grid border; `None` means half the filter size.
    pub border: Option<usize>,
}

impl Default for HessianParams {
    fn default() -> Self {
        Self {
            threshold_rel: 0.01,
            threshold_abs: None,
            nms_radius: 1,
            border: None,
        }
    }
}
