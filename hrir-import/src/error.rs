//! Error types for hrir-import
//!
//! Defines pipeline error types using thiserror for clear error propagation.
//! Every failure here is fatal to the import run: stages abort on the first
//! error and no partial data set is considered usable.

use thiserror::Error;

/// Main error type for the import pipeline
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid import configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Unsupported measurement-set structure (dimensions, units, rates)
    #[error("Format error: {0}")]
    Format(String),

    /// Measurement positions do not form a compatible grid
    #[error("Incompatible layout: {0}")]
    Layout(String),

    /// Two raw measurements snapped to the same grid cell
    #[error("Multiple measurements near [ a={azimuth:.3}, e={elevation:.3}, r={distance:.3} ]")]
    DuplicateMeasurement {
        azimuth: f64,
        elevation: f64,
        distance: f64,
    },

    /// A required grid cell was never populated
    #[error("Missing source reference {0}")]
    Coverage(String),

    /// Resampler construction or processing failure
    #[error("Resample error: {0}")]
    Resample(String),

    /// Background stage task failed to complete
    #[error("Task error: {0}")]
    Task(String),
}

/// Convenience Result type using the pipeline Error
pub type Result<T> = std::result::Result<T, Error>;
