//! Stack blur filter for u8 images.
//!
//! Array front-end over [`super::bands::stack_blur_parallel`], shaped like
//! the rest of the filters: takes an `(height, width, channels)` view and
//! returns a new array. Every channel, alpha included, is blurred.

use std::num::NonZeroUsize;
use std::thread;

use ndarray::{Array3, ArrayView3};

use super::bands::stack_blur_parallel;
use super::layout::Channels;
use crate::error::Result;

/// Radius used when none is given.
pub const DEFAULT_RADIUS: u32 = 2;

/// Number of logical cores, or 1 if it cannot be determined.
///
/// Only the bindings and [`StackBlurParams::default`] call this; the blur
/// itself always takes the worker count as a parameter.
pub fn default_worker_count() -> usize {
    thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
}

/// Blur strength and parallelism.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StackBlurParams {
    /// Blur radius in pixels, 0 is a no-op
    pub radius: u32,
    /// Worker threads, 0 is treated as 1
    pub workers: usize,
}

impl StackBlurParams {
    /// Single-threaded blur with the given radius.
    pub fn new(radius: u32) -> Self {
        Self { radius, workers: 1 }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }
}

impl Default for StackBlurParams {
    fn default() -> Self {
        Self {
            radius: DEFAULT_RADIUS,
            workers: default_worker_count(),
        }
    }
}

/// Apply stack blur to an image - u8 version.
///
/// # Arguments
/// * `input` - Image with 1, 3, or 4 channels (height, width, channels)
/// * `params` - Radius and worker count
///
/// # Returns
/// Blurred image with same dimensions
pub fn stack_blur_u8(input: ArrayView3<u8>, params: &StackBlurParams) -> Result<Array3<u8>> {
    let (height, width, channel_count) = input.dim();
    let channels = Channels::from_count(channel_count)?;

    // Logical iteration order is row-major whatever the view's strides are
    let mut data: Vec<u8> = input.iter().copied().collect();
    stack_blur_parallel(
        &mut data,
        width,
        height,
        channels,
        params.radius,
        params.workers,
    )?;

    Ok(Array3::from_shape_vec((height, width, channel_count), data)?)
}
