//! Stack blur filter modules.
//!
//! ## Supported Formats
//!
//! | Format | Shape | Type | Description |
//! |--------|-------|------|-------------|
//! | Grayscale8 | (H, W, 1) | u8 | Single luminance channel, 0-255 |
//! | RGB8 | (H, W, 3) | u8 | Red, green, blue, 0-255 |
//! | RGBA8 | (H, W, 4) | u8 | RGB + alpha, 0-255 |
//!
//! ## Layers
//!
//! - [`stack_blur`] - single-threaded kernel over any strip of rows
//! - [`bands`] - splits the image into row bands and runs the kernel's
//!   passes on a rayon pool
//! - [`blur`] - ndarray front-end and blur parameters
//! - [`layout`] - buffer geometry and validation

pub mod layout;
pub mod stack_blur;
pub mod bands;
pub mod blur;
