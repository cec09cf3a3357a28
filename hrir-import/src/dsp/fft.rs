//! Forward transform and magnitude response using rustfft

use std::sync::Arc;

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};

/// Floor applied to magnitude bins before any later dB conversion
pub const MAGNITUDE_FLOOR: f64 = 1.0e-9;

/// Shared in-place forward FFT plan
#[derive(Clone)]
pub struct ForwardFft {
    plan: Arc<dyn Fft<f64>>,
}

impl ForwardFft {
    pub fn new(size: usize) -> Self {
        Self {
            plan: FftPlanner::new().plan_fft_forward(size),
        }
    }

    /// Transform `buffer` in place.
    pub fn process(&self, buffer: &mut [Complex<f64>]) {
        self.plan.process(buffer);
    }
}

/// Derive the amplitude of the first `out.len()` bins of a transformed
/// buffer, clamped to [`MAGNITUDE_FLOOR`].
pub fn magnitude_response(h: &[Complex<f64>], out: &mut [f64]) {
    for (mag, bin) in out.iter_mut().zip(h) {
        *mag = bin.norm().max(MAGNITUDE_FLOOR);
    }
}
