//! Pixel buffer geometry.
//!
//! Buffers are flat, row-major and interleaved: pixel `(x, y)` channel `c`
//! lives at `(y * width + x) * channels + c`.

use std::ops::Range;

use crate::error::{Result, StackBlurError};

/// Interleaved channel layout of an 8-bit pixel buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channels {
    /// Single luminance channel
    Gray,
    /// Red, green, blue
    Rgb,
    /// RGB + alpha (alpha is blurred like any other channel)
    Rgba,
}

impl Channels {
    pub fn from_count(count: usize) -> Result<Self> {
        match count {
            1 => Ok(Channels::Gray),
            3 => Ok(Channels::Rgb),
            4 => Ok(Channels::Rgba),
            other => Err(StackBlurError::UnsupportedChannels(other)),
        }
    }

    pub fn count(self) -> usize {
        match self {
            Channels::Gray => 1,
            Channels::Rgb => 3,
            Channels::Rgba => 4,
        }
    }
}

/// Validated width, height and channel layout of a pixel buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageLayout {
    pub width: usize,
    pub height: usize,
    pub channels: Channels,
}

impl ImageLayout {
    /// Build a layout, rejecting empty images.
    pub fn new(width: usize, height: usize, channels: Channels) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(StackBlurError::InvalidDimensions { width, height });
        }
        Ok(Self {
            width,
            height,
            channels,
        })
    }

    /// Bytes per row.
    #[inline]
    pub fn stride(&self) -> usize {
        self.width * self.channels.count()
    }

    /// Total bytes the buffer must hold.
    #[inline]
    pub fn len(&self) -> usize {
        self.stride() * self.height
    }

    /// Fail unless `buffer_len` is exactly `width * height * channels`.
    pub fn check_buffer(&self, buffer_len: usize) -> Result<()> {
        let expected = self.len();
        if buffer_len != expected {
            return Err(StackBlurError::BufferSizeMismatch {
                expected,
                actual: buffer_len,
            });
        }
        Ok(())
    }

    pub fn check_rows(&self, rows: &Range<usize>) -> Result<()> {
        if rows.start > rows.end || rows.end > self.height {
            return Err(StackBlurError::InvalidRowRange {
                start: rows.start,
                end: rows.end,
                height: self.height,
            });
        }
        Ok(())
    }

    /// Byte range covered by `rows`.
    #[inline]
    pub fn row_bytes(&self, rows: &Range<usize>) -> Range<usize> {
        rows.start * self.stride()..rows.end * self.stride()
    }
}
