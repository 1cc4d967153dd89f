//! Stack blur kernel.
//!
//! Approximates a Gaussian blur with a triangular ("stack") kernel applied
//! separably: a horizontal pass over each row, then a vertical pass over the
//! horizontal result. For radius `R` the tap at offset `d` weighs
//! `R + 1 - |d|`, so the weights of one axis sum to `(R + 1)^2`.
//!
//! Each pass keeps three running sums per channel (see [`StackState`]) and
//! updates them as the window slides, so the per-pixel cost does not depend
//! on the radius. Coordinates outside the image are clamped to the nearest
//! edge pixel.
//!
//! The band passes read from one buffer and write into another; the scheduler
//! in [`super::bands`] relies on that to run bands of either pass in
//! parallel. A single-threaded blur of the whole image works in place.

use std::ops::Range;

use log::trace;

use super::layout::{Channels, ImageLayout};
use crate::error::{Result, StackBlurError};

/// Largest accepted radius. Keeps `255 * (R + 1)^2` inside a `u64`.
pub const MAX_RADIUS: u32 = 1 << 24;

/// Running sums for one channel of one scanline (or column).
///
/// With the window centered on `x`:
/// - `sum` is the weighted sum of all taps
/// - `sum_out` holds the taps at offsets `-R..=0`
/// - `sum_in` holds the taps at offsets `1..=R`
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct StackState {
    sum: u64,
    sum_in: u64,
    sum_out: u64,
}

impl StackState {
    /// Build the window centered on `center` of a line of `len` samples.
    ///
    /// Taps past either end all read the same edge sample, so they are folded
    /// in with one multiplication instead of a loop over the radius.
    fn primed(center: usize, len: usize, radius: usize, sample: impl Fn(usize) -> u64) -> Self {
        let peak = (radius + 1) as u64;
        let mut state = StackState {
            sum: peak * sample(center),
            sum_in: 0,
            sum_out: sample(center),
        };

        let before = radius.min(center);
        for d in 1..=before {
            let v = sample(center - d);
            state.sum_out += v;
            state.sum += (radius + 1 - d) as u64 * v;
        }
        let clamped = (radius - before) as u64;
        if clamped > 0 {
            let v = sample(0);
            state.sum_out += clamped * v;
            state.sum += clamped * (clamped + 1) / 2 * v;
        }

        let after = radius.min(len - 1 - center);
        for d in 1..=after {
            let v = sample(center + d);
            state.sum_in += v;
            state.sum += (radius + 1 - d) as u64 * v;
        }
        let clamped = (radius - after) as u64;
        if clamped > 0 {
            let v = sample(len - 1);
            state.sum_in += clamped * v;
            state.sum += clamped * (clamped + 1) / 2 * v;
        }

        state
    }

    /// Move the window one sample forward.
    ///
    /// `leaving` is the tap at `-R`, `entering` the tap at `R + 1` and `next`
    /// the sample that becomes the new center.
    #[inline]
    fn advance(&mut self, leaving: u64, entering: u64, next: u64) {
        self.sum -= self.sum_out;
        self.sum_out -= leaving;
        self.sum_in += entering;
        self.sum += self.sum_in;
        self.sum_out += next;
        self.sum_in -= next;
    }

    /// Normalized value, rounded half up.
    #[inline]
    fn value(&self, divisor: u64) -> u8 {
        ((self.sum + divisor / 2) / divisor).min(255) as u8
    }
}

#[inline]
fn divisor(radius: usize) -> u64 {
    let r = (radius + 1) as u64;
    r * r
}

/// Blur one line of `len` samples read through `sample`, handing each result
/// to `emit`. `sample` must keep returning the original values while `emit`
/// runs, so in-place callers read from a copy of the line.
fn blur_line(
    len: usize,
    radius: usize,
    div: u64,
    sample: impl Fn(usize) -> u64,
    mut emit: impl FnMut(usize, u8),
) {
    let mut state = StackState::primed(0, len, radius, &sample);
    for i in 0..len {
        emit(i, state.value(div));
        if i + 1 < len {
            state.advance(
                sample(i.saturating_sub(radius)),
                sample((i + radius + 1).min(len - 1)),
                sample(i + 1),
            );
        }
    }
}

/// Blur every channel of one row from `line` into `out`.
#[inline]
fn blur_row(line: &[u8], out: &mut [u8], width: usize, channels: usize, radius: usize, div: u64) {
    for c in 0..channels {
        blur_line(
            width,
            radius,
            div,
            |x| line[x * channels + c] as u64,
            |x, v| out[x * channels + c] = v,
        );
    }
}

/// Horizontal pass over `rows`.
///
/// `src` is the whole image. `dst` holds exactly the rows of `rows`, its
/// first row being `rows.start`.
pub(crate) fn horizontal_pass(
    src: &[u8],
    dst: &mut [u8],
    layout: &ImageLayout,
    radius: u32,
    rows: Range<usize>,
) {
    let width = layout.width;
    let channels = layout.channels.count();
    let stride = layout.stride();
    let radius = radius as usize;
    let div = divisor(radius);

    for (y, out) in rows.zip(dst.chunks_exact_mut(stride)) {
        let line = &src[y * stride..(y + 1) * stride];
        blur_row(line, out, width, channels, radius, div);
    }
}

/// Both passes over the whole image, in place.
///
/// Scratch memory is one row for the horizontal pass and one column for the
/// vertical pass.
fn blur_in_place(buffer: &mut [u8], layout: &ImageLayout, radius: u32) {
    let width = layout.width;
    let height = layout.height;
    let channels = layout.channels.count();
    let stride = layout.stride();
    let radius = radius as usize;
    let div = divisor(radius);

    let mut line = vec![0u8; stride];
    for out in buffer.chunks_exact_mut(stride) {
        line.copy_from_slice(out);
        blur_row(&line, out, width, channels, radius, div);
    }

    let mut column = vec![0u8; height];
    for j in 0..stride {
        for (y, value) in column.iter_mut().enumerate() {
            *value = buffer[y * stride + j];
        }
        blur_line(
            height,
            radius,
            div,
            |y| column[y] as u64,
            |y, v| buffer[y * stride + j] = v,
        );
    }
}

/// Vertical pass over `rows`.
///
/// `src` holds the horizontal result for a strip of rows starting at image
/// row `src_first_row`; it must cover `rows` widened by the radius (clamped to
/// the image). `dst` holds exactly the rows of `rows`.
///
/// Columns are processed side by side, one row at a time, so the running
/// sums live in one array the width of a row.
pub(crate) fn vertical_pass(
    src: &[u8],
    src_first_row: usize,
    dst: &mut [u8],
    layout: &ImageLayout,
    radius: u32,
    rows: Range<usize>,
) {
    if rows.is_empty() {
        return;
    }
    let height = layout.height;
    let stride = layout.stride();
    let radius = radius as usize;
    let div = divisor(radius);

    let row = |y: usize| strip_row(src, src_first_row, stride, y);

    let mut states: Vec<StackState> = (0..stride)
        .map(|j| StackState::primed(rows.start, height, radius, |y| row(y)[j] as u64))
        .collect();

    for (y, out) in rows.clone().zip(dst.chunks_exact_mut(stride)) {
        for (value, state) in out.iter_mut().zip(&states) {
            *value = state.value(div);
        }
        if y + 1 < rows.end {
            let leaving = row(y.saturating_sub(radius));
            let entering = row((y + radius + 1).min(height - 1));
            let next = row(y + 1);
            for (j, state) in states.iter_mut().enumerate() {
                state.advance(leaving[j] as u64, entering[j] as u64, next[j] as u64);
            }
        }
    }
}

#[inline]
fn strip_row(strip: &[u8], first_row: usize, stride: usize, y: usize) -> &[u8] {
    let offset = (y - first_row) * stride;
    &strip[offset..offset + stride]
}

/// Rows of horizontal output the vertical pass needs to produce `rows`.
#[inline]
pub(crate) fn vertical_reach(rows: &Range<usize>, radius: u32, height: usize) -> Range<usize> {
    let radius = radius as usize;
    rows.start.saturating_sub(radius)..rows.end.saturating_add(radius).min(height)
}

pub(crate) fn check_radius(radius: u32) -> Result<()> {
    if radius > MAX_RADIUS {
        return Err(StackBlurError::RadiusTooLarge {
            radius,
            max: MAX_RADIUS,
        });
    }
    Ok(())
}

/// Stack blur the rows `rows` of an image in place, single-threaded.
///
/// Pixels outside `rows` are read (the vertical window reaches `radius` rows
/// past the range) but never written. Nothing is written if validation fails.
///
/// Over the full height the blur runs in place with one row and one column
/// of scratch. A partial range allocates the horizontal result for the range
/// widened by `radius` rows.
///
/// # Arguments
/// * `buffer` - Interleaved 8-bit pixels, `width * height * channels` bytes
/// * `width`, `height` - Image size in pixels
/// * `channels` - Channel layout of `buffer`
/// * `radius` - Blur radius in pixels, 0 leaves the image untouched
/// * `rows` - Half-open range of rows to produce
pub fn stack_blur_rows(
    buffer: &mut [u8],
    width: usize,
    height: usize,
    channels: Channels,
    radius: u32,
    rows: Range<usize>,
) -> Result<()> {
    let layout = ImageLayout::new(width, height, channels)?;
    layout.check_buffer(buffer.len())?;
    layout.check_rows(&rows)?;
    check_radius(radius)?;

    if radius == 0 || rows.is_empty() {
        return Ok(());
    }

    if rows.start == 0 && rows.end == height {
        trace!("stack blur {}x{} in place (radius {})", width, height, radius);
        blur_in_place(buffer, &layout, radius);
        return Ok(());
    }

    // A partial range still needs the horizontal result of the rows around
    // it, which must not be written back.
    let strip = vertical_reach(&rows, radius, height);
    trace!(
        "stack blur rows {:?} of {}x{} (radius {}, horizontal strip {:?})",
        rows,
        width,
        height,
        radius,
        strip
    );

    let mut horizontal = vec![0u8; strip.len() * layout.stride()];
    horizontal_pass(buffer, &mut horizontal, &layout, radius, strip.clone());

    let target = layout.row_bytes(&rows);
    vertical_pass(
        &horizontal,
        strip.start,
        &mut buffer[target],
        &layout,
        radius,
        rows,
    );
    Ok(())
}

/// Stack blur a whole image in place, single-threaded.
pub fn stack_blur(
    buffer: &mut [u8],
    width: usize,
    height: usize,
    channels: Channels,
    radius: u32,
) -> Result<()> {
    stack_blur_rows(buffer, width, height, channels, radius, 0..height)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Direct O(R) evaluation of one axis, for cross-checking the sliding sums.
    fn reference_line(line: &[u8], radius: usize) -> Vec<u8> {
        let len = line.len() as isize;
        let r = radius as isize;
        let div = divisor(radius);
        (0..len)
            .map(|x| {
                let sum: u64 = (-r..=r)
                    .map(|d| {
                        let idx = (x + d).clamp(0, len - 1) as usize;
                        (r + 1 - d.abs()) as u64 * line[idx] as u64
                    })
                    .sum();
                ((sum + div / 2) / div) as u8
            })
            .collect()
    }

    fn reference_blur(img: &[u8], width: usize, height: usize, radius: usize) -> Vec<u8> {
        let mut horizontal = Vec::with_capacity(img.len());
        for row in img.chunks(width) {
            horizontal.extend(reference_line(row, radius));
        }
        let mut out = vec![0u8; img.len()];
        for x in 0..width {
            let column: Vec<u8> = (0..height).map(|y| horizontal[y * width + x]).collect();
            for (y, v) in reference_line(&column, radius).into_iter().enumerate() {
                out[y * width + x] = v;
            }
        }
        out
    }

    fn gradient(width: usize, height: usize, channels: usize) -> Vec<u8> {
        (0..width * height * channels)
            .map(|i| ((i * 37 + (i / 7) * 11) % 256) as u8)
            .collect()
    }

    #[test]
    fn test_radius_zero_is_identity() {
        let original = gradient(7, 5, 4);
        let mut img = original.clone();
        stack_blur(&mut img, 7, 5, Channels::Rgba, 0).unwrap();
        assert_eq!(img, original);
    }

    #[test]
    fn test_single_bright_pixel_3x3() {
        let mut img = vec![0u8; 9];
        img[4] = 255;
        stack_blur(&mut img, 3, 3, Channels::Gray, 1).unwrap();
        // {1,2,1} x {1,2,1} / 16 applied to 255
        assert_eq!(img, vec![16, 32, 16, 32, 64, 32, 16, 32, 16]);
    }

    #[test]
    fn test_solid_image_unchanged() {
        for &(w, h, r) in &[(1, 1, 3), (4, 9, 1), (13, 6, 5), (3, 3, 40)] {
            let mut img = vec![173u8; w * h * 3];
            stack_blur(&mut img, w, h, Channels::Rgb, r).unwrap();
            assert!(img.iter().all(|&v| v == 173), "{w}x{h} r={r}");
        }
    }

    #[test]
    fn test_matches_direct_evaluation() {
        let (w, h) = (11, 8);
        let img = gradient(w, h, 1);
        for radius in [1, 2, 3, 7, 15] {
            let mut blurred = img.clone();
            stack_blur(&mut blurred, w, h, Channels::Gray, radius).unwrap();
            assert_eq!(
                blurred,
                reference_blur(&img, w, h, radius as usize),
                "radius {radius}"
            );
        }
    }

    #[test]
    fn test_channels_blurred_independently() {
        let (w, h) = (6, 4);
        let rgba = gradient(w, h, 4);
        let mut blurred = rgba.clone();
        stack_blur(&mut blurred, w, h, Channels::Rgba, 2).unwrap();

        for c in 0..4 {
            let mut plane: Vec<u8> = rgba.iter().skip(c).step_by(4).copied().collect();
            stack_blur(&mut plane, w, h, Channels::Gray, 2).unwrap();
            let blurred_plane: Vec<u8> = blurred.iter().skip(c).step_by(4).copied().collect();
            assert_eq!(plane, blurred_plane, "channel {c}");
        }
    }

    #[test]
    fn test_row_range_matches_full_blur() {
        let (w, h) = (9, 12);
        let img = gradient(w, h, 3);
        let mut full = img.clone();
        stack_blur(&mut full, w, h, Channels::Rgb, 3).unwrap();

        let mut partial = img.clone();
        stack_blur_rows(&mut partial, w, h, Channels::Rgb, 3, 4..9).unwrap();

        let stride = w * 3;
        assert_eq!(&partial[..4 * stride], &img[..4 * stride]);
        assert_eq!(&partial[4 * stride..9 * stride], &full[4 * stride..9 * stride]);
        assert_eq!(&partial[9 * stride..], &img[9 * stride..]);
    }

    #[test]
    fn test_in_place_matches_strip_path() {
        let (w, h) = (10, 13);
        let img = gradient(w, h, 4);
        let stride = w * 4;

        let mut in_place = img.clone();
        stack_blur(&mut in_place, w, h, Channels::Rgba, 5).unwrap();

        let mut top = img.clone();
        stack_blur_rows(&mut top, w, h, Channels::Rgba, 5, 0..h - 1).unwrap();
        let mut bottom = img.clone();
        stack_blur_rows(&mut bottom, w, h, Channels::Rgba, 5, h - 1..h).unwrap();

        assert_eq!(&in_place[..(h - 1) * stride], &top[..(h - 1) * stride]);
        assert_eq!(&in_place[(h - 1) * stride..], &bottom[(h - 1) * stride..]);
    }

    #[test]
    fn test_radius_larger_than_image() {
        let (w, h) = (4, 3);
        let img = gradient(w, h, 1);
        let mut blurred = img.clone();
        stack_blur(&mut blurred, w, h, Channels::Gray, 50).unwrap();
        assert_eq!(blurred, reference_blur(&img, w, h, 50));

        let min = *img.iter().min().unwrap();
        let max = *img.iter().max().unwrap();
        let spread = blurred.iter().max().unwrap() - blurred.iter().min().unwrap();
        assert!(blurred.iter().all(|&v| v >= min && v <= max));
        assert!(spread < max - min);
    }

    #[test]
    fn test_single_row_and_column() {
        let line: Vec<u8> = vec![0, 0, 255, 0, 0];
        let mut row = line.clone();
        stack_blur(&mut row, 5, 1, Channels::Gray, 1).unwrap();
        assert_eq!(row, vec![0, 64, 128, 64, 0]);

        let mut column = line.clone();
        stack_blur(&mut column, 1, 5, Channels::Gray, 1).unwrap();
        assert_eq!(column, row);
    }

    #[test]
    fn test_invalid_input_leaves_buffer_untouched() {
        let original = gradient(4, 4, 1);
        let mut img = original.clone();
        assert!(matches!(
            stack_blur(&mut img, 4, 5, Channels::Gray, 2),
            Err(StackBlurError::BufferSizeMismatch { .. })
        ));
        assert!(matches!(
            stack_blur(&mut img, 0, 4, Channels::Gray, 2),
            Err(StackBlurError::InvalidDimensions { .. })
        ));
        assert!(matches!(
            stack_blur_rows(&mut img, 4, 4, Channels::Gray, 2, 2..6),
            Err(StackBlurError::InvalidRowRange { .. })
        ));
        assert!(matches!(
            stack_blur(&mut img, 4, 4, Channels::Gray, MAX_RADIUS + 1),
            Err(StackBlurError::RadiusTooLarge { .. })
        ));
        assert_eq!(img, original);
    }

    #[test]
    fn test_primed_window_clamps_edges() {
        let line = [10u64, 20, 30];
        let state = StackState::primed(0, 3, 4, |i| line[i]);
        // offsets -4..=0 all read 10, offsets 1..=4 read 20, 30, 30, 30
        assert_eq!(state.sum_out, 50);
        assert_eq!(state.sum_in, 110);
        let expected = 10 * (1 + 2 + 3 + 4 + 5) + 20 * 4 + 30 * (3 + 2 + 1);
        assert_eq!(state.sum, expected);
    }
}
