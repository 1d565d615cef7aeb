//! Conversions between `image` buffers and grids, plus image-level helpers.
//!
//! Grids use `(row, column)` addressing, so pixel `(x, y)` maps to cell
//! `(y, x)`.

use crate::scale_space::{build_scale_space, find_keypoints_scale_space, ScaleKeypoint, ScaleSpaceParams};
use ::image::{GrayImage, Luma, Rgba, RgbaImage};
use surf_grid_core::hessian::hessian_determinant;
use surf_grid_core::integral::integral;
use surf_grid_core::{ChannelImage, Colorspace, Grid, GridError, HessianParams, Result};

/// Grayscale image as a grid of raw intensities (0..=255).
pub fn grid_from_gray(img: &GrayImage) -> Grid {
    let mut grid = Grid::new(img.height() as usize, img.width() as usize);
    for (cell, &v) in grid.as_mut_slice().iter_mut().zip(img.as_raw()) {
        *cell = v as f32;
    }
    grid
}

/// Render a grid as an 8-bit image, stretching `[min, max]` to `[0, 255]`.
///
/// A constant grid renders black.
pub fn gray_from_grid(grid: &Grid) -> GrayImage {
    let min = grid.min().unwrap_or(0.0);
    let max = grid.max().unwrap_or(0.0);
    let span = max - min;
    GrayImage::from_fn(grid.columns() as u32, grid.rows() as u32, |x, y| {
        let v = grid.at(y as usize, x as usize);
        let n = if span > 0.0 { (v - min) / span * 255.0 } else { 0.0 };
        Luma([n.round().clamp(0.0, 255.0) as u8])
    })
}

/// Split an RGBA image into four channel grids.
pub fn channel_image_from_rgba(img: &RgbaImage) -> Result<ChannelImage> {
    let raw: Vec<f32> = img.as_raw().iter().map(|&v| v as f32).collect();
    ChannelImage::from_raw(img.width() as usize, img.height() as usize, Colorspace::Rgba, &raw)
}

/// Interleave an RGBA channel image back into 8-bit pixels (rounded and
/// clamped).
pub fn rgba_from_channel_image(img: &ChannelImage) -> Result<RgbaImage> {
    if img.colorspace() != Colorspace::Rgba {
        return Err(GridError::ColorspaceMismatch {
            expected: Colorspace::Rgba.name(),
            actual: img.colorspace().name(),
        });
    }
    let to_u8 = |v: f32| v.round().clamp(0.0, 255.0) as u8;
    let channels = img.channels();
    Ok(RgbaImage::from_fn(img.width() as u32, img.height() as u32, |x, y| {
        let (r, c) = (y as usize, x as usize);
        Rgba([
            to_u8(channels[0].at(r, c)),
            to_u8(channels[1].at(r, c)),
            to_u8(channels[2].at(r, c)),
            to_u8(channels[3].at(r, c)),
        ])
    }))
}

/// Determinant-of-Hessian response of a grayscale image at `(octave, level)`.
#[inline]
pub fn hessian_response_image(img: &GrayImage, octave: u32, level: u32) -> Result<Grid> {
    let ii = integral(&grid_from_gray(img));
    hessian_determinant(&ii, octave, level)
}

/// Multi-scale keypoints of a grayscale image.
pub fn find_keypoints_image(
    img: &GrayImage,
    scale: &ScaleSpaceParams,
    params: &HessianParams,
    merge_radius: f32,
) -> Result<Vec<ScaleKeypoint>> {
    let space = build_scale_space(&grid_from_gray(img), scale)?;
    Ok(find_keypoints_scale_space(&space, params, merge_radius))
}
