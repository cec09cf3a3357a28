//! Impulse-response resampling using rubato
//!
//! Whole impulse responses are converted in one fixed-size chunk. When the
//! source and destination rates match, processing degrades to a plain copy
//! and rubato is never invoked.

use rubato::{FastFixedIn, PolynomialDegree, Resampler as RubatoResampler};

use crate::error::{Error, Result};

/// Single-channel resampler for fixed-length impulse responses
pub struct IrResampler {
    inner: Option<FastFixedIn<f64>>,
    chunk: usize,
}

impl IrResampler {
    /// Prepare a resampler converting `src_rate` to `dst_rate` for inputs of
    /// exactly `chunk` samples.
    pub fn init(src_rate: u32, dst_rate: u32, chunk: usize) -> Result<Self> {
        if src_rate == dst_rate {
            return Ok(Self { inner: None, chunk });
        }
        let inner = FastFixedIn::<f64>::new(
            f64::from(dst_rate) / f64::from(src_rate),
            1.0,
            PolynomialDegree::Septic,
            chunk,
            1,
        )
        .map_err(|e| Error::Resample(format!("Failed to create resampler: {e}")))?;
        Ok(Self {
            inner: Some(inner),
            chunk,
        })
    }

    /// Resample `input` into `output`, zero-padding or truncating to the
    /// output length. Identical rates copy the input unchanged.
    pub fn process(&mut self, input: &[f64], output: &mut [f64]) -> Result<()> {
        if input.len() != self.chunk {
            return Err(Error::Resample(format!(
                "Expected {} input samples, got {}",
                self.chunk,
                input.len()
            )));
        }
        let Some(inner) = self.inner.as_mut() else {
            let n = input.len().min(output.len());
            output[..n].copy_from_slice(&input[..n]);
            output[n..].fill(0.0);
            return Ok(());
        };

        let frames = inner
            .process(&[input], None)
            .map_err(|e| Error::Resample(format!("Resampling failed: {e}")))?;
        // Each impulse response is independent; drop the filter history.
        inner.reset();

        let resampled = &frames[0];
        let n = resampled.len().min(output.len());
        output[..n].copy_from_slice(&resampled[..n]);
        output[n..].fill(0.0);
        Ok(())
    }
}
