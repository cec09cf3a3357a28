//! Measurement mapper
//!
//! Snaps each raw measurement onto the allocated grid, resamples or copies
//! its impulse responses into the slot's backing storage and records the
//! per-channel delay. Measurements that match no field or fall between grid
//! cells are skipped; two measurements landing on the same cell abort the
//! run.

use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::debug;

use crate::dsp::IrResampler;
use crate::error::{Error, Result};
use crate::grid::cartesian_to_spherical;
use crate::grid::layout::{DISTANCE_EPSILON, POLE_FOLD, SNAP_TOLERANCE};
use crate::grid::HrirDataSet;
use crate::measurement::{DelayType, MeasurementSet};

/// Map every measurement of `set` into `data`, in source order.
///
/// `progress` is incremented once per measurement regardless of success or
/// skip. A non-zero `out_rate` different from the source rate resamples each
/// impulse response and rescales `ir_points` afterwards.
pub(crate) fn map_measurements(
    set: &MeasurementSet,
    data: &mut HrirDataSet,
    delay_type: DelayType,
    out_rate: u32,
    progress: &AtomicUsize,
) -> Result<()> {
    let channels = data.channel_type.count();
    let src_rate = data.ir_rate;
    let resampling = out_rate != 0 && out_rate != src_rate;
    let mut resampler = if resampling {
        Some(IrResampler::init(src_rate, out_rate, set.samples)?)
    } else {
        None
    };

    for si in 0..set.measurements {
        progress.fetch_add(1, Ordering::Relaxed);

        let [az_raw, elevation, distance] = cartesian_to_spherical(set.position(si));
        // Convert to the grid's clockwise azimuth convention; at the poles
        // the azimuth is meaningless and collapses to 0.
        let azimuth = if elevation.abs() >= POLE_FOLD {
            0.0
        } else {
            (360.0 - az_raw).rem_euclid(360.0)
        };

        let Some(fi) = data
            .fields
            .iter()
            .position(|f| (distance - f.distance).abs() < DISTANCE_EPSILON)
        else {
            debug!("Measurement {si} matches no field (r={distance:.3}), skipping");
            continue;
        };

        let field = &data.fields[fi];
        let ef = (elevation - field.ev_base) / field.ev_step;
        let ei = ef.round();
        if (ef - ei).abs() >= SNAP_TOLERANCE || ei < 0.0 || ei >= field.elevations.len() as f64 {
            debug!("Measurement {si} off the elevation grid (e={elevation:.2}), skipping");
            continue;
        }
        let ei = ei as usize;

        let az_count = field.elevations[ei].azimuths.len();
        let af = azimuth / (360.0 / az_count as f64);
        let ai = af.round();
        if (af - ai).abs() >= SNAP_TOLERANCE {
            debug!("Measurement {si} off the azimuth grid (a={azimuth:.2}), skipping");
            continue;
        }
        let ai = (ai as usize) % az_count;

        if data.fields[fi].elevations[ei].azimuths[ai].is_populated() {
            return Err(Error::DuplicateMeasurement {
                azimuth,
                elevation,
                distance,
            });
        }

        let index = data.fields[fi].elevations[ei].azimuths[ai].index;
        for ti in 0..channels {
            let offset = data.channel_offset(ti, index);
            let src = set.ir_samples(si, ti);
            let dst = data.ir_mut(offset);
            match resampler.as_mut() {
                Some(rs) => rs.process(src, dst)?,
                None => {
                    let n = src.len().min(dst.len());
                    dst[..n].copy_from_slice(&src[..n]);
                }
            }
            data.fields[fi].elevations[ei].azimuths[ai].irs[ti] = Some(offset);
        }

        // Delays are stored in source samples; keep them in seconds.
        match delay_type {
            DelayType::None => {}
            DelayType::PerReceiver => {
                for ti in 0..channels {
                    data.fields[fi].elevations[ei].azimuths[ai].delays[ti] =
                        set.delay.values[ti] / f64::from(src_rate);
                }
            }
            DelayType::PerMeasurementReceiver => {
                for ti in 0..channels {
                    data.fields[fi].elevations[ei].azimuths[ai].delays[ti] =
                        set.delay.values[si * set.receivers + ti] / f64::from(src_rate);
                }
            }
        }
    }

    if resampling {
        let scale = f64::from(out_rate) / f64::from(src_rate);
        data.ir_rate = out_rate;
        data.ir_points = ((data.ir_points as f64 * scale).ceil() as usize).min(data.ir_size);
    }
    Ok(())
}
