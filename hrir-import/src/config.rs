//! Import pipeline configuration
//!
//! Caller-facing knobs for one import run. Values map to the parameters the
//! surrounding tool passes in; everything else (snap tolerances, engine
//! limits) is a fixed constant of the grid model.

use serde::Deserialize;

use crate::error::{Error, Result};

/// How receiver channels map to the stored data set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelMode {
    /// Two-receiver sets are kept as stereo measurements
    AllowStereo,
    /// Always store a single (left-ear) channel
    ForceMono,
}

/// Configuration for one import run
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImportConfig {
    /// Forward transform size for magnitude analysis (power of two)
    pub fft_size: usize,

    /// Minimum usable impulse-response length in samples
    pub truncate: usize,

    /// Requested output sample rate; 0 keeps the source rate
    pub out_rate: u32,

    /// Stereo handling for two-receiver measurement sets
    pub channel_mode: ChannelMode,

    /// Worker threads for magnitude analysis (1 degrades to serial)
    pub workers: usize,

    /// Assumed head radius in meters
    pub head_radius: f64,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            fft_size: 65536,
            truncate: 64,
            out_rate: 0,
            channel_mode: ChannelMode::AllowStereo,
            workers: 2,
            head_radius: 0.09,
        }
    }
}

impl ImportConfig {
    /// Check the configuration before any pipeline stage runs.
    pub fn validate(&self) -> Result<()> {
        if !self.fft_size.is_power_of_two() {
            return Err(Error::Config(format!(
                "FFT size must be a power of two, got {}",
                self.fft_size
            )));
        }
        if self.truncate == 0 || self.truncate > self.fft_size {
            return Err(Error::Config(format!(
                "Truncation size {} out of range (1 to {})",
                self.truncate, self.fft_size
            )));
        }
        if self.workers == 0 {
            return Err(Error::Config("Worker count must be at least 1".into()));
        }
        if !(self.head_radius > 0.0) {
            return Err(Error::Config(format!(
                "Head radius must be positive, got {}",
                self.head_radius
            )));
        }
        Ok(())
    }
}
