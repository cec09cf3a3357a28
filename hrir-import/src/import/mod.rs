//! Measurement import and analysis pipeline
//!
//! Drives the stages strictly in order: format validation, layout detection,
//! grid allocation, measurement mapping, coverage validation, onset
//! calculation, magnitude calculation. Each stage must fully succeed before
//! the next begins; any failure aborts the run and the partial data set is
//! dropped with the returned error.

pub(crate) mod coverage;
pub(crate) mod magnitude;
pub(crate) mod mapper;
pub(crate) mod onset;
pub(crate) mod progress;

use std::sync::atomic::AtomicUsize;
use std::sync::Arc;

use tracing::info;

use crate::config::{ChannelMode, ImportConfig};
use crate::error::{Error, Result};
use crate::grid::{detect_layout, ChannelType, HrirDataSet};
use crate::measurement::MeasurementSet;

/// Import a raw measurement set into a dense, analyzed HRIR data set.
///
/// This is the single entry point the surrounding tool calls after the
/// container reader produced `set`. On success the returned data set carries
/// refined per-impulse delays and magnitude spectra ready for export.
pub async fn load_measurement_set(
    set: MeasurementSet,
    config: &ImportConfig,
) -> Result<HrirDataSet> {
    config.validate()?;
    set.validate()?;

    // Two receivers make a stereo measurement; one is mono left-ear-only.
    let channel_type = if set.receivers == 2 && config.channel_mode == ChannelMode::AllowStereo {
        ChannelType::Stereo
    } else {
        ChannelType::Mono
    };

    if set.samples > config.fft_size {
        return Err(Error::Format(format!(
            "Sample points exceeds the FFT size ({} > {})",
            set.samples, config.fft_size
        )));
    }
    if set.samples < config.truncate {
        return Err(Error::Format(format!(
            "Sample points is below the truncation size ({} < {})",
            set.samples, config.truncate
        )));
    }

    let ir_rate = set.sample_rate()?;
    let delay_type = set.delay_type()?;
    set.check_ir_dimensions()?;

    info!("Detecting compatible layout...");
    let layouts = detect_layout(&set.source_positions)?;

    let ir_points = set.samples;
    let ir_size = (config.fft_size / 2 + 1).max(set.samples);
    let data = HrirDataSet::allocate(
        &layouts,
        channel_type,
        ir_rate,
        ir_points,
        ir_size,
        config.fft_size,
        config.head_radius,
    );

    let total = set.measurements;
    let counter = Arc::new(AtomicUsize::new(0));
    let worker_counter = counter.clone();
    let out_rate = config.out_rate;
    let mut data = {
        let mut data = data;
        progress::run_polled("Loading HRIRs", total, counter, move || {
            mapper::map_measurements(&set, &mut data, delay_type, out_rate, &worker_counter)?;
            Ok(data)
        })
        .await?
    };

    coverage::validate_coverage(&mut data)?;

    let hrir_total = magnitude::work_list(&data).len();

    let counter = Arc::new(AtomicUsize::new(0));
    let worker_counter = counter.clone();
    let mut data = progress::run_polled("Calculating HRIR onsets", hrir_total, counter, move || {
        onset::calculate_onsets(&mut data, &worker_counter)?;
        Ok(data)
    })
    .await?;

    let counter = Arc::new(AtomicUsize::new(0));
    let worker_counter = counter.clone();
    let workers = config.workers;
    let data = progress::run_polled(
        "Calculating HRIR magnitudes",
        hrir_total,
        counter,
        move || {
            magnitude::calculate_magnitudes(&mut data, workers, &worker_counter)?;
            Ok(data)
        },
    )
    .await?;

    Ok(data)
}
