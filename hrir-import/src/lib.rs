//! # HRIR Measurement Import Pipeline (hrir-import)
//!
//! Reorganizes raw head-related impulse-response measurement sets, stored in
//! irregular sensor-specific spherical sampling patterns, into the dense
//! structurally regular grid a real-time spatial-audio convolution engine
//! consumes, and precomputes per-impulse onset delays and magnitude spectra.
//!
//! **Purpose:** layout inference over scattered measurement positions,
//! tolerance-checked grid mapping, resampling, and parallel per-impulse
//! analysis, with strict data-integrity validation throughout.
//!
//! **Architecture:** staged pipeline (detect, allocate, map, validate,
//! onset, magnitude) using tokio background tasks with progress polling and
//! an atomic-cursor worker pool; DSP via rubato + rustfft.
//!
//! Container parsing, data-set export, and the command-line front end are
//! external collaborators; the pipeline starts from a [`MeasurementSet`] and
//! ends with a populated [`HrirDataSet`].

pub mod config;
pub mod dsp;
pub mod error;
pub mod grid;
pub mod import;
pub mod measurement;

pub use config::{ChannelMode, ImportConfig};
pub use error::{Error, Result};
pub use grid::{ChannelType, HrirDataSet};
pub use import::load_measurement_set;
pub use measurement::{DelayType, MeasurementSet};
