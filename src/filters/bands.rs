//! Band scheduler: runs the stack blur on several threads.
//!
//! The image height is split into contiguous row bands, one per worker. The
//! blur runs in two phases separated by a join:
//!
//! 1. Horizontal pass: each band reads its rows of the caller's buffer and
//!    writes the same rows of an intermediate buffer.
//! 2. Vertical pass: each band reads the intermediate buffer, up to `radius`
//!    rows past its own edges, and writes its rows of the caller's buffer.
//!
//! Reads and writes never target the same buffer within a phase, and every
//! band owns a disjoint `&mut` slice of the destination, so no locking is
//! needed and the result does not depend on the worker count.

use std::ops::Range;

use log::{debug, trace};
use rayon::prelude::*;

use super::layout::{Channels, ImageLayout};
use super::stack_blur::{check_radius, horizontal_pass, stack_blur_rows, vertical_pass};
use crate::error::{Result, StackBlurError};

/// Contiguous half-open row range handled by one worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Band {
    pub start: usize,
    pub end: usize,
}

impl Band {
    pub fn rows(&self) -> Range<usize> {
        self.start..self.end
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Split `[0, height)` into at most `workers` bands.
///
/// Band sizes differ by at most one row. When there are fewer rows than
/// workers, every band is a single row. A worker count of 0 is treated as 1.
pub fn split_bands(height: usize, workers: usize) -> Vec<Band> {
    let count = workers.max(1).min(height);
    (0..count)
        .map(|i| Band {
            start: i * height / count,
            end: (i + 1) * height / count,
        })
        .collect()
}

/// Cut `buffer` into one mutable slice per band.
///
/// A band reaching past the end of `buffer` gets a short slice, which
/// [`check_band`] then rejects.
fn band_slices<'a>(buffer: &'a mut [u8], bands: &[Band], stride: usize) -> Vec<&'a mut [u8]> {
    let mut slices = Vec::with_capacity(bands.len());
    let mut rest = buffer;
    for band in bands {
        let take = (band.len() * stride).min(rest.len());
        let (head, tail) = rest.split_at_mut(take);
        slices.push(head);
        rest = tail;
    }
    slices
}

/// Stack blur an image in place using `workers` threads.
///
/// Produces exactly the same bytes as [`super::stack_blur::stack_blur`] for
/// any worker count. With a single worker (or a single row) the blur runs in
/// place on the calling thread. Nothing is written if validation fails.
///
/// # Arguments
/// * `buffer` - Interleaved 8-bit pixels, `width * height * channels` bytes
/// * `width`, `height` - Image size in pixels
/// * `channels` - Channel layout of `buffer`
/// * `radius` - Blur radius in pixels, 0 leaves the image untouched
/// * `workers` - Number of worker threads (0 is treated as 1)
pub fn stack_blur_parallel(
    buffer: &mut [u8],
    width: usize,
    height: usize,
    channels: Channels,
    radius: u32,
    workers: usize,
) -> Result<()> {
    let layout = ImageLayout::new(width, height, channels)?;
    layout.check_buffer(buffer.len())?;
    check_radius(radius)?;

    if radius == 0 {
        return Ok(());
    }

    let bands = split_bands(height, workers);
    if bands.len() <= 1 {
        return stack_blur_rows(buffer, width, height, channels, radius, 0..height);
    }

    debug!(
        "stack blur {}x{}x{} radius {} on {} bands",
        width,
        height,
        channels.count(),
        radius,
        bands.len()
    );

    run_bands(buffer, &layout, radius, &bands)
}

/// Run `op` where at least `threads` rayon workers are available.
///
/// The current pool (the global one outside of rayon) is used when it is
/// large enough; otherwise a pool of exactly `threads` is built for the call.
pub(crate) fn with_pool<R: Send>(threads: usize, op: impl FnOnce() -> R + Send) -> Result<R> {
    if rayon::current_num_threads() >= threads {
        return Ok(op());
    }
    trace!("building a pool of {} threads", threads);
    let pool = rayon::ThreadPoolBuilder::new().num_threads(threads).build()?;
    Ok(pool.install(op))
}

/// Both passes over `bands`, one task per band, joined after each pass.
///
/// Each task checks its band against the image and its slice before touching
/// anything. The first failing task stops the tasks not yet started and its
/// error is returned once the running ones have finished; a failure in the
/// horizontal pass leaves `buffer` untouched.
pub(crate) fn run_bands(
    buffer: &mut [u8],
    layout: &ImageLayout,
    radius: u32,
    bands: &[Band],
) -> Result<()> {
    let stride = layout.stride();
    let mut intermediate = vec![0u8; layout.len()];

    with_pool(bands.len(), || -> Result<()> {
        let source: &[u8] = &*buffer;
        band_slices(&mut intermediate, bands, stride)
            .into_par_iter()
            .zip(bands.par_iter())
            .try_for_each(|(dst, band)| -> Result<()> {
                check_band(layout, band, dst.len())?;
                trace!("horizontal pass rows {:?}", band.rows());
                horizontal_pass(source, dst, layout, radius, band.rows());
                Ok(())
            })?;

        let source: &[u8] = &intermediate;
        band_slices(buffer, bands, stride)
            .into_par_iter()
            .zip(bands.par_iter())
            .try_for_each(|(dst, band)| -> Result<()> {
                check_band(layout, band, dst.len())?;
                trace!("vertical pass rows {:?}", band.rows());
                vertical_pass(source, 0, dst, layout, radius, band.rows());
                Ok(())
            })
    })?
}

fn check_band(layout: &ImageLayout, band: &Band, slice_len: usize) -> Result<()> {
    layout.check_rows(&band.rows())?;
    let expected = band.len() * layout.stride();
    if slice_len != expected {
        return Err(StackBlurError::BufferSizeMismatch {
            expected,
            actual: slice_len,
        });
    }
    Ok(())
}
