//! StackBlur Rust Extensions
//!
//! Fast approximate Gaussian blur ("stack blur") for 8-bit images, with
//! Python bindings via PyO3 and WASM bindings for JavaScript.
//!
//! ## Image Format
//! Images are interleaved u8 pixels in row-major order:
//! - **Grayscale**: (height, width, 1) - single channel
//! - **RGB**: (height, width, 3) - 3 color channels
//! - **RGBA**: (height, width, 4) - 3 color channels + alpha
//!
//! Every channel is blurred independently, alpha included.
//!
//! ## Threading
//! The image is split into horizontal bands that are blurred on rayon
//! workers; a dedicated pool is built only when the current one is too small. The worker count is always passed in by the caller; the
//! bindings default it to the number of logical cores. Output does not
//! depend on the worker count.

pub mod error;
pub mod filters;

#[cfg(feature = "wasm")]
pub mod wasm;

pub use error::{Result, StackBlurError};
pub use filters::bands::{split_bands, stack_blur_parallel, Band};
pub use filters::blur::{default_worker_count, stack_blur_u8, StackBlurParams, DEFAULT_RADIUS};
pub use filters::layout::{Channels, ImageLayout};
pub use filters::stack_blur::{stack_blur, stack_blur_rows, MAX_RADIUS};

// Python bindings (only when python feature is enabled)
#[cfg(feature = "python")]
mod python {
    use numpy::{IntoPyArray, PyArray3, PyReadonlyArray3};
    use pyo3::prelude::*;
    use pyo3::types::PyList;

    use crate::filters::bands::stack_blur_parallel;
    use crate::filters::blur::{default_worker_count, stack_blur_u8, StackBlurParams, DEFAULT_RADIUS};
    use crate::filters::layout::Channels;

    fn params(radius: u32, workers: Option<usize>) -> StackBlurParams {
        StackBlurParams::new(radius).with_workers(workers.unwrap_or_else(default_worker_count))
    }

    fn blur_array<'py>(
        py: Python<'py>,
        image: PyReadonlyArray3<'py, u8>,
        params: StackBlurParams,
    ) -> PyResult<Bound<'py, PyArray3<u8>>> {
        let input = image.as_array();
        let result = py.allow_threads(|| stack_blur_u8(input, &params))?;
        Ok(result.into_pyarray(py))
    }

    // ========================================================================
    // Stack Blur
    // ========================================================================

    /// Apply stack blur to a u8 image.
    ///
    /// # Arguments
    /// * `image` - Image with 1, 3, or 4 channels (height, width, channels)
    /// * `radius` - Blur radius in pixels (default: 2, 0 returns a copy)
    /// * `workers` - Worker threads (default: number of logical cores)
    #[pyfunction]
    #[pyo3(signature = (image, radius=DEFAULT_RADIUS, workers=None))]
    pub fn stack_blur<'py>(
        py: Python<'py>,
        image: PyReadonlyArray3<'py, u8>,
        radius: u32,
        workers: Option<usize>,
    ) -> PyResult<Bound<'py, PyArray3<u8>>> {
        blur_array(py, image, params(radius, workers))
    }

    /// Blur a flat list of channel values, `width * height * channels` long.
    ///
    /// The list is blurred in place and returned, so callers may use either
    /// the argument or the result.
    #[pyfunction]
    #[pyo3(signature = (data, width, height, radius, cores, channels=1))]
    pub fn stackblur<'py>(
        py: Python<'py>,
        data: &Bound<'py, PyList>,
        width: usize,
        height: usize,
        radius: u32,
        cores: usize,
        channels: usize,
    ) -> PyResult<Bound<'py, PyList>> {
        let channels = Channels::from_count(channels)?;
        let mut values: Vec<u8> = data.extract()?;
        py.allow_threads(|| {
            stack_blur_parallel(&mut values, width, height, channels, radius, cores)
        })?;
        for (index, value) in values.into_iter().enumerate() {
            data.set_item(index, value)?;
        }
        Ok(data.clone())
    }

    /// Stack blur filter object.
    ///
    /// `filter(image)` returns a blurred copy of a (height, width, channels)
    /// u8 array, so an instance can be dropped into an image pipeline.
    #[pyclass(name = "StackBlur", module = "stackblur_rust")]
    #[derive(Clone)]
    pub struct StackBlur {
        #[pyo3(get, set)]
        radius: u32,
        #[pyo3(get, set)]
        workers: usize,
    }

    #[pymethods]
    impl StackBlur {
        #[classattr]
        fn name() -> &'static str {
            "StackBlur"
        }

        #[new]
        #[pyo3(signature = (radius=DEFAULT_RADIUS, workers=None))]
        fn new(radius: u32, workers: Option<usize>) -> Self {
            let params = params(radius, workers);
            StackBlur {
                radius: params.radius,
                workers: params.workers,
            }
        }

        fn filter<'py>(
            &self,
            py: Python<'py>,
            image: PyReadonlyArray3<'py, u8>,
        ) -> PyResult<Bound<'py, PyArray3<u8>>> {
            blur_array(py, image, params(self.radius, Some(self.workers)))
        }

        fn __repr__(&self) -> String {
            format!("StackBlur(radius={}, workers={})", self.radius, self.workers)
        }
    }

    /// Python module definition
    #[pymodule]
    pub fn stackblur_rust(m: &Bound<'_, PyModule>) -> PyResult<()> {
        m.add_function(wrap_pyfunction!(stack_blur, m)?)?;
        m.add_function(wrap_pyfunction!(stackblur, m)?)?;
        m.add_class::<StackBlur>()?;
        Ok(())
    }
}

#[cfg(feature = "python")]
pub use python::stackblur_rust;
