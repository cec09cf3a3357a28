//! Numeric primitives consumed by the pipeline
//!
//! Thin wrappers over rubato (resampling) and rustfft (forward transform) so
//! the pipeline stages see the two fixed interfaces they need and nothing
//! else of either crate's surface.

pub mod fft;
pub mod resampler;

pub use fft::{magnitude_response, ForwardFft, MAGNITUDE_FLOOR};
pub use resampler::IrResampler;
