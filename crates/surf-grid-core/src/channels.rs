//! Multi-channel images: one [`Grid`] per channel under a colorspace label.
//!
//! Filters run independently on every channel. The alpha channel of an RGBA
//! image is copied through unchanged.

use crate::chunk::{CellOp, ChunkConfig, ChunkedTraversal, Scheduler};
use crate::convolve::Correlate;
use crate::edge::EdgeMode;
use crate::error::{GridError, Result};
use crate::grid::Grid;
use crate::integral::PrefixSum;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Channel layout of a [`ChannelImage`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Colorspace {
    Grayscale,
    Rgb,
    #[default]
    Rgba,
}

impl Colorspace {
    pub const fn channels(self) -> usize {
        match self {
            Colorspace::Grayscale => 1,
            Colorspace::Rgb => 3,
            Colorspace::Rgba => 4,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Colorspace::Grayscale => "GRAYSCALE",
            Colorspace::Rgb => "RGB",
            Colorspace::Rgba => "RGBA",
        }
    }

    /// Channels that filters copy instead of transform.
    #[inline]
    pub const fn is_passthrough(self, channel: usize) -> bool {
        matches!(self, Colorspace::Rgba) && channel == 3
    }
}

/// Planar image with `colorspace.channels()` grids of `height x width`.
#[derive(Clone, Debug, PartialEq)]
pub struct ChannelImage {
    width: usize,
    height: usize,
    colorspace: Colorspace,
    channels: Vec<Grid>,
}

impl ChannelImage {
    /// Zero-filled image.
    pub fn new(width: usize, height: usize, colorspace: Colorspace) -> Self {
        Self {
            width,
            height,
            colorspace,
            channels: vec![Grid::new(height, width); colorspace.channels()],
        }
    }

    /// Split interleaved samples (`c0 c1 .. c0 c1 ..`) into channels.
    pub fn from_raw(width: usize, height: usize, colorspace: Colorspace, data: &[f32]) -> Result<Self> {
        let n = colorspace.channels();
        let expected = width * height * n;
        if data.len() != expected {
            return Err(GridError::InvalidArgument(format!(
                "raw data has {} samples, expected {expected} for {width}x{height} {}",
                data.len(),
                colorspace.name()
            )));
        }
        let mut image = Self::new(width, height, colorspace);
        for (i, px) in data.chunks_exact(n).enumerate() {
            for (channel, &v) in image.channels.iter_mut().zip(px) {
                channel.as_mut_slice()[i] = v;
            }
        }
        Ok(image)
    }

    /// Wrap existing planes; all must be `height x width`.
    pub fn from_channels(colorspace: Colorspace, channels: Vec<Grid>) -> Result<Self> {
        if channels.len() != colorspace.channels() {
            return Err(GridError::InvalidArgument(format!(
                "{} expects {} channels, got {}",
                colorspace.name(),
                colorspace.channels(),
                channels.len()
            )));
        }
        let (height, width) = channels[0].shape();
        for c in &channels[1..] {
            crate::error::check_shape((height, width), c.shape())?;
        }
        Ok(Self {
            width,
            height,
            colorspace,
            channels,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn colorspace(&self) -> Colorspace {
        self.colorspace
    }

    pub fn channels(&self) -> &[Grid] {
        &self.channels
    }

    pub fn channel(&self, n: usize) -> Option<&Grid> {
        self.channels.get(n)
    }

    pub fn channel_mut(&mut self, n: usize) -> Option<&mut Grid> {
        self.channels.get_mut(n)
    }

    pub fn into_channels(self) -> Vec<Grid> {
        self.channels
    }

    /// Interleave the channels back into one sample buffer.
    pub fn to_raw(&self) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.width * self.height * self.channels.len());
        self.write_raw(&mut out);
        out
    }

    /// Interleave into `out`, overwriting existing entries and appending the
    /// rest.
    pub fn write_raw(&self, out: &mut Vec<f32>) {
        let mut index = 0;
        for i in 0..self.width * self.height {
            for channel in &self.channels {
                let v = channel.as_slice()[i];
                match out.get_mut(index) {
                    Some(slot) => *slot = v,
                    None => out.push(v),
                }
                index += 1;
            }
        }
    }

    fn check_compatible(&self, result: &ChannelImage) -> Result<()> {
        if self.colorspace != result.colorspace {
            return Err(GridError::ColorspaceMismatch {
                expected: self.colorspace.name(),
                actual: result.colorspace.name(),
            });
        }
        crate::error::check_shape((self.height, self.width), (result.height, result.width))
    }

    /// Run one op per channel as interleaved scheduler tasks.
    ///
    /// Every op is built (and so validated) before any channel of `result`
    /// is written. Returns the number of chunks executed.
    fn run_per_channel<'a, Op, F>(
        &'a self,
        result: &'a mut ChannelImage,
        config: ChunkConfig,
        make_op: F,
    ) -> Result<usize>
    where
        Op: CellOp + 'a,
        F: Fn(&'a Grid) -> Result<Op>,
    {
        self.check_compatible(result)?;
        let mut ops = Vec::with_capacity(self.channels.len());
        for (n, channel) in self.channels.iter().enumerate() {
            if self.colorspace.is_passthrough(n) {
                ops.push(None);
            } else {
                ops.push(Some(make_op(channel)?));
            }
        }

        let mut scheduler = Scheduler::new();
        for ((op, source), out) in ops
            .into_iter()
            .zip(&self.channels)
            .zip(result.channels.iter_mut())
        {
            match op {
                Some(op) => {
                    scheduler.spawn(ChunkedTraversal::new(op, out, config));
                }
                None => source.clone_into(out)?,
            }
        }
        Ok(scheduler.run())
    }

    /// Correlate every channel with `kernel`.
    pub fn convolve(&self, kernel: &Grid, edge: EdgeMode) -> Result<ChannelImage> {
        let mut out = ChannelImage::new(self.width, self.height, self.colorspace);
        self.convolve_into(kernel, edge, &mut out)?;
        Ok(out)
    }

    pub fn convolve_into(&self, kernel: &Grid, edge: EdgeMode, result: &mut ChannelImage) -> Result<()> {
        self.convolve_chunked(kernel, edge, result, ChunkConfig::default())
            .map(|_| ())
    }

    /// Chunked per-channel correlation; channels are interleaved chunk by
    /// chunk. Returns the number of chunks executed.
    pub fn convolve_chunked(
        &self,
        kernel: &Grid,
        edge: EdgeMode,
        result: &mut ChannelImage,
        config: ChunkConfig,
    ) -> Result<usize> {
        self.run_per_channel(result, config, |c| Correlate::new(c, kernel, edge))
    }

    /// Integral image of every channel.
    pub fn integral(&self) -> ChannelImage {
        let mut out = ChannelImage::new(self.width, self.height, self.colorspace);
        for (n, (source, target)) in self.channels.iter().zip(out.channels.iter_mut()).enumerate() {
            if self.colorspace.is_passthrough(n) {
                target.as_mut_slice().copy_from_slice(source.as_slice());
            } else {
                crate::chunk::traverse(&PrefixSum::new(source), target);
            }
        }
        out
    }

    pub fn integral_into(&self, result: &mut ChannelImage) -> Result<()> {
        self.integral_chunked(result, ChunkConfig::default()).map(|_| ())
    }

    pub fn integral_chunked(&self, result: &mut ChannelImage, config: ChunkConfig) -> Result<usize> {
        self.run_per_channel(result, config, |c| Ok(PrefixSum::new(c)))
    }
}
