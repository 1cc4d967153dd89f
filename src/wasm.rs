//! WebAssembly exports for the stack blur filter.
//!
//! These functions are exposed to JavaScript via wasm-bindgen. Browsers run
//! them on the calling thread, so the blur is always single-threaded here.

use wasm_bindgen::prelude::*;

use crate::filters::layout::Channels;
use crate::filters::stack_blur::stack_blur;

/// Apply stack blur to a flat u8 image.
///
/// # Arguments
/// * `data` - Flat array of bytes (length = width * height * channels)
/// * `width` - Image width in pixels
/// * `height` - Image height in pixels
/// * `channels` - 1 (gray), 3 (RGB) or 4 (RGBA)
/// * `radius` - Blur radius in pixels
///
/// # Returns
/// Flat array of blurred bytes
#[wasm_bindgen]
pub fn stack_blur_wasm(
    data: &[u8],
    width: usize,
    height: usize,
    channels: usize,
    radius: u32,
) -> Result<Vec<u8>, JsError> {
    let channels = Channels::from_count(channels)?;
    let mut output = data.to_vec();
    stack_blur(&mut output, width, height, channels, radius)?;
    Ok(output)
}

/// Apply stack blur to a flat RGBA u8 image.
#[wasm_bindgen]
pub fn stack_blur_rgba_wasm(
    data: &[u8],
    width: usize,
    height: usize,
    radius: u32,
) -> Result<Vec<u8>, JsError> {
    stack_blur_wasm(data, width, height, 4, radius)
}
