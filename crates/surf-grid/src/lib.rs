//! Scale-space Hessian feature responses on top of `surf-grid-core`.
//!
//! Re-exports the core crate and adds:
//!
//! - [`scale_space`] – every `(octave, level)` response layer from one
//!   integral image, and keypoint extraction across layers.
//! - [`image`] *(feature `image`)* – conversions between `image` buffers and
//!   grids.
//! - [`app`] *(feature `image`)* – the JSON-config driven pipeline shared by
//!   the `surf-grid` binary and the examples.

pub use surf_grid_core::*;

#[cfg(feature = "image")]
pub mod app;
#[cfg(feature = "image")]
pub mod image;
pub mod scale_space;

#[cfg(feature = "image")]
pub use crate::image::{
    channel_image_from_rgba, find_keypoints_image, gray_from_grid, grid_from_gray,
    hessian_response_image, rgba_from_channel_image,
};
pub use crate::scale_space::{
    build_scale_space, find_keypoints_scale_space, ResponseLayer, ScaleKeypoint, ScaleSpace,
    ScaleSpaceParams,
};
