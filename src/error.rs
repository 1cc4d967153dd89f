//! Error type shared by the blur kernel, the band scheduler and the bindings.

use thiserror::Error;

/// Everything that can make a blur call fail.
///
/// All variants except [`StackBlurError::ThreadPool`] are raised during
/// validation, before a single byte of the caller's buffer is touched.
#[derive(Debug, Error)]
pub enum StackBlurError {
    #[error("Invalid dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("Unsupported channel count: {0} (expected 1, 3 or 4)")]
    UnsupportedChannels(usize),

    #[error("Buffer size mismatch: expected {expected} bytes, got {actual}")]
    BufferSizeMismatch { expected: usize, actual: usize },

    #[error("Row range {start}..{end} is outside image height {height}")]
    InvalidRowRange {
        start: usize,
        end: usize,
        height: usize,
    },

    #[error("Radius {radius} exceeds maximum {max}")]
    RadiusTooLarge { radius: u32, max: u32 },

    #[error("Array shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),

    #[error("Failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

pub type Result<T> = std::result::Result<T, StackBlurError>;

#[cfg(feature = "python")]
impl From<StackBlurError> for pyo3::PyErr {
    fn from(err: StackBlurError) -> Self {
        pyo3::exceptions::PyValueError::new_err(err.to_string())
    }
}
