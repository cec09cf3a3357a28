//! Onset calculator
//!
//! Refines each stored impulse response's coarse delay with a sample-accurate
//! onset estimate: the response is upsampled by a fixed integer multiple and
//! the time of its absolute peak is added to the slot delay.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::dsp::IrResampler;
use crate::error::Result;
use crate::grid::HrirDataSet;
use crate::import::coverage::resync_mirrored_delays;

/// Upsampling factor for onset detection
pub(crate) const ONSET_RATE_MULTIPLE: u32 = 10;

/// Locate the peak of the upsampled response as a time offset in seconds.
fn onset_time(
    resampler: &mut IrResampler,
    rate: u32,
    upsampled: &mut [f64],
    ir: &[f64],
) -> Result<f64> {
    resampler.process(ir, upsampled)?;

    let mut peak = 0usize;
    let mut peak_value = 0.0f64;
    for (i, &v) in upsampled.iter().enumerate() {
        if v.abs() > peak_value {
            peak_value = v.abs();
            peak = i;
        }
    }
    Ok(peak as f64 / (f64::from(ONSET_RATE_MULTIPLE) * f64::from(rate)))
}

/// Add the onset estimate to every populated slot's delay, per channel.
///
/// Processes slots serially inside one background task; `progress` is
/// incremented once per (slot, channel).
pub(crate) fn calculate_onsets(data: &mut HrirDataSet, progress: &AtomicUsize) -> Result<()> {
    let channels = data.channel_type.count();
    let rate = data.ir_rate;
    let points = data.ir_points;

    let mut resampler = IrResampler::init(rate, ONSET_RATE_MULTIPLE * rate, points)?;
    let mut upsampled = vec![0.0f64; ONSET_RATE_MULTIPLE as usize * points];

    for fi in 0..data.fields.len() {
        let ev_start = data.fields[fi].ev_start;
        for ei in ev_start..data.fields[fi].elevations.len() {
            for ai in 0..data.fields[fi].elevations[ei].azimuths.len() {
                for ti in 0..channels {
                    progress.fetch_add(1, Ordering::Relaxed);
                    let Some(offset) = data.fields[fi].elevations[ei].azimuths[ai].irs[ti]
                    else {
                        continue;
                    };
                    let onset = {
                        let ir = &data.ir(offset)[..points];
                        onset_time(&mut resampler, rate, &mut upsampled, ir)?
                    };
                    data.fields[fi].elevations[ei].azimuths[ai].delays[ti] += onset;
                }
            }
        }
    }

    // Mirrored cells must keep holding the same delay as their source.
    resync_mirrored_delays(data);
    Ok(())
}
