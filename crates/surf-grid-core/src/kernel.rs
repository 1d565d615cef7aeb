//! Ready-made convolution kernels.
//!
//! Every factory takes `(rows, columns)`; odd sizes keep the center cell
//! unambiguous. The Sobel and Laplacian kernels are laid out for the
//! unflipped correlation performed by [`convolve`](crate::convolve::convolve).

use crate::convolve::convolve_in_place;
use crate::edge::EdgeMode;
use crate::error::{GridError, Result};
use crate::grid::Grid;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Default standard deviation of [`gaussian`].
pub const DEFAULT_SIGMA: f32 = 0.85;

fn check_size(rows: usize, columns: usize) -> Result<()> {
    if rows == 0 || columns == 0 {
        return Err(GridError::InvalidArgument(format!(
            "kernel size must be non-zero, got {rows}x{columns}"
        )));
    }
    Ok(())
}

/// 1 at the center, 0 elsewhere.
pub fn identity(rows: usize, columns: usize) -> Result<Grid> {
    check_size(rows, columns)?;
    let mut k = Grid::new(rows, columns);
    k.put(rows / 2, columns / 2, 1.0);
    Ok(k)
}

/// Uniform weights summing to 1.
pub fn average(rows: usize, columns: usize) -> Result<Grid> {
    check_size(rows, columns)?;
    Ok(Grid::filled(rows, columns, 1.0 / (rows * columns) as f32))
}

/// Sampled 2D Gaussian, normalized to sum to 1.
pub fn gaussian(rows: usize, columns: usize, sigma: f32) -> Result<Grid> {
    check_size(rows, columns)?;
    if sigma.is_nan() || sigma <= 0.0 {
        return Err(GridError::InvalidArgument(format!(
            "gaussian sigma must be positive, got {sigma}"
        )));
    }
    let hr = (rows / 2) as isize;
    let hc = (columns / 2) as isize;
    let two_s2 = 2.0 * sigma as f64 * sigma as f64;
    let mut k = Grid::new(rows, columns);
    let mut total = 0.0f64;
    for r in 0..rows {
        for c in 0..columns {
            let (i, j) = (r as isize - hr, c as isize - hc);
            let v = (-((i * i + j * j) as f64) / two_s2).exp();
            k.put(r, c, v as f32);
            total += v;
        }
    }
    if total > 0.0 {
        k.scale_in_place((1.0 / total) as f32);
    }
    Ok(k)
}

/// Horizontal Sobel operator generalized to any size.
///
/// The 3x3 case is `[1 0 -1; 2 0 -2; 1 0 -1]`.
pub fn sobel_x(rows: usize, columns: usize) -> Result<Grid> {
    check_size(rows, columns)?;
    let hr = (rows / 2) as isize;
    let hc = (columns / 2) as isize;
    let mut k = Grid::new(rows, columns);
    for i in 0..rows as isize {
        for j in 0..columns as isize {
            if j == hc {
                continue;
            }
            let sign = if j > hc { -1 } else { 1 };
            let fold = if i > hr { 2 * (hr - i) } else { 0 };
            k.put(i as usize, j as usize, (hc - j + sign * (i + fold)) as f32);
        }
    }
    Ok(k)
}

/// Vertical Sobel operator; the 3x3 case is `[1 2 1; 0 0 0; -1 -2 -1]`.
pub fn sobel_y(rows: usize, columns: usize) -> Result<Grid> {
    Ok(sobel_x(columns, rows)?.transpose())
}

/// All ones with the center set to `-(len - 1)`.
pub fn laplacian(rows: usize, columns: usize) -> Result<Grid> {
    check_size(rows, columns)?;
    let mut k = Grid::filled(rows, columns, 1.0);
    k.put(rows / 2, columns / 2, -((rows * columns - 1) as f32));
    Ok(k)
}

/// Sampled `-∇²G`, positive at the center and scaled so the weights sum to 1.
///
/// The raw sum shrinks quickly once the window covers the negative ring
/// (about 0.1 at 5x5 for the default sigma), so large windows get large
/// weights.
pub fn laplacian_of_gaussian(rows: usize, columns: usize, sigma: f32) -> Result<Grid> {
    check_size(rows, columns)?;
    if sigma.is_nan() || sigma <= 0.0 {
        return Err(GridError::InvalidArgument(format!(
            "laplacian of gaussian sigma must be positive, got {sigma}"
        )));
    }
    let hr = (rows / 2) as isize;
    let hc = (columns / 2) as isize;
    let two_s2 = 2.0 * sigma as f64 * sigma as f64;
    let mut weights = Vec::with_capacity(rows * columns);
    for r in 0..rows as isize {
        for c in 0..columns as isize {
            let d = ((r - hr).pow(2) + (c - hc).pow(2)) as f64 / two_s2;
            weights.push((1.0 - d) * (-d).exp());
        }
    }
    let total: f64 = weights.iter().sum();
    let norm = if total > 0.0 { 1.0 / total } else { 1.0 };
    Grid::from_vec(rows, columns, weights.iter().map(|w| (w * norm) as f32).collect())
}

/// Cascade two kernels: `source` is zero-padded by half of `kernel` on each
/// side and correlated with it.
pub fn combine(source: &Grid, kernel: &Grid) -> Result<Grid> {
    if kernel.is_empty() {
        return Err(GridError::MissingArgument("kernel"));
    }
    let hr = kernel.rows() / 2;
    let hc = kernel.columns() / 2;
    let mut result = Grid::new(source.rows() + 2 * hr, source.columns() + 2 * hc);
    for r in 0..source.rows() {
        for c in 0..source.columns() {
            result.put(r + hr, c + hc, source.at(r, c));
        }
    }
    convolve_in_place(&mut result, kernel, EdgeMode::Zero)?;
    Ok(result)
}

/// Named kernel factories, e.g. for configuration files.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum KernelKind {
    Identity,
    Average,
    Gaussian,
    SobelX,
    SobelY,
    Laplacian,
    LaplacianOfGaussian,
}

impl KernelKind {
    /// Build a kernel of this kind; the Gaussian kinds use [`DEFAULT_SIGMA`].
    pub fn build(self, rows: usize, columns: usize) -> Result<Grid> {
        match self {
            KernelKind::Identity => identity(rows, columns),
            KernelKind::Average => average(rows, columns),
            KernelKind::Gaussian => gaussian(rows, columns, DEFAULT_SIGMA),
            KernelKind::SobelX => sobel_x(rows, columns),
            KernelKind::SobelY => sobel_y(rows, columns),
            KernelKind::Laplacian => laplacian(rows, columns),
            KernelKind::LaplacianOfGaussian => laplacian_of_gaussian(rows, columns, DEFAULT_SIGMA),
        }
    }
}

impl std::str::FromStr for KernelKind {
    type Err = GridError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "identity" => Ok(KernelKind::Identity),
            "average" => Ok(KernelKind::Average),
            "gaussian" => Ok(KernelKind::Gaussian),
            "sobel_x" | "sobelx" => Ok(KernelKind::SobelX),
            "sobel_y" | "sobely" => Ok(KernelKind::SobelY),
            "laplacian" => Ok(KernelKind::Laplacian),
            "laplacian_of_gaussian" | "laplacianofgaussian" | "log" => {
                Ok(KernelKind::LaplacianOfGaussian)
            }
            other => Err(GridError::InvalidArgument(format!("unknown kernel '{other}'"))),
        }
    }
}

/// Look up a factory by name and build a `rows x columns` kernel.
pub fn from_name(name: &str, rows: usize, columns: usize) -> Result<Grid> {
    name.parse::<KernelKind>()?.build(rows, columns)
}
