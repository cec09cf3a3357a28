//! Layout detector
//!
//! Infers a structured field/elevation/azimuth grid from an arbitrary
//! scattered set of measurement positions. Most data sets are uniform enough
//! to produce a maximally dense layout once a few outliers are removed; sets
//! with purely random positions or inconsistent spacing are rejected as
//! incompatible.

use tracing::{debug, info};

use crate::error::{Error, Result};

use super::cartesian_to_spherical;

/// Engine limit on the number of distance shells
pub const MAX_FIELD_COUNT: usize = 16;

/// Distance match tolerance in meters
pub(crate) const DISTANCE_EPSILON: f64 = 0.001;

/// Angular snap tolerance as a fraction of one slot width
pub(crate) const SNAP_TOLERANCE: f64 = 0.1;

/// Elevations at or beyond this angle collapse to azimuth 0
pub(crate) const POLE_FOLD: f64 = 89.999;

/// Clustering equality threshold for raw angles, in degrees
const ANGLE_EPSILON: f64 = 0.1;

/// Detected skeleton of one distance shell
#[derive(Debug, Clone)]
pub struct FieldLayout {
    /// Shell distance in meters
    pub distance: f64,
    /// Elevation of row 0 in degrees
    pub ev_base: f64,
    /// Uniform spacing between elevation rows in degrees
    pub ev_step: f64,
    /// Azimuth slot count per elevation row
    pub az_counts: Vec<usize>,
    /// Whether each row holds genuine measurements (false = mirror region)
    pub measured: Vec<bool>,
}

impl FieldLayout {
    /// Elevation angle of row `ei` in degrees.
    pub fn elevation(&self, ei: usize) -> f64 {
        self.ev_base + self.ev_step * ei as f64
    }
}

/// Group sorted values into clusters no wider than `epsilon`.
fn cluster(mut values: Vec<f64>, epsilon: f64) -> Vec<Vec<f64>> {
    values.sort_by(f64::total_cmp);
    let mut groups: Vec<Vec<f64>> = Vec::new();
    for v in values {
        match groups.last_mut() {
            Some(group) if v - group[0] < epsilon => group.push(v),
            _ => groups.push(vec![v]),
        }
    }
    groups
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// The dominant spacing between row angles: the most common pairwise
/// difference, preferring the smallest on a tie.
fn dominant_step(row_angles: &[f64]) -> f64 {
    let mut diffs = Vec::new();
    for i in 0..row_angles.len() {
        for j in i + 1..row_angles.len() {
            diffs.push(row_angles[j] - row_angles[i]);
        }
    }
    let mut step = 0.0;
    let mut votes = 0;
    for group in cluster(diffs, ANGLE_EPSILON) {
        if group.len() > votes {
            votes = group.len();
            step = mean(&group);
        }
    }
    step
}

/// Count the azimuth slots of one elevation row from its distinct measured
/// azimuths. Missing slots are allowed (they fail coverage later); spacing
/// that does not divide 360 degrees cleanly is not.
fn azimuth_slot_count(distinct: &[f64], elevation: f64, distance: f64) -> Result<usize> {
    if distinct.len() <= 1 {
        return Ok(1);
    }
    let mut gaps: Vec<f64> = distinct.windows(2).map(|w| w[1] - w[0]).collect();
    gaps.push(360.0 - distinct[distinct.len() - 1] + distinct[0]);
    let gap = gaps.iter().copied().fold(f64::INFINITY, f64::min);

    let slots = 360.0 / gap;
    if (slots - slots.round()).abs() > SNAP_TOLERANCE {
        return Err(Error::Layout(format!(
            "Azimuth spacing at [ e={elevation:.2}, r={distance:.3} ] does not divide 360 degrees"
        )));
    }
    let slots = slots.round() as usize;

    let az_scale = 360.0 / slots as f64;
    for &az in distinct {
        let f = az / az_scale;
        if (f - f.round()).abs() > SNAP_TOLERANCE {
            return Err(Error::Layout(format!(
                "Azimuths at [ e={elevation:.2}, r={distance:.3} ] are not evenly spaced"
            )));
        }
    }
    Ok(slots)
}

/// Detect a compatible grid layout from flat `M x 3` Cartesian positions.
///
/// Returns one [`FieldLayout`] per distance shell, ordered by increasing
/// distance. Only structural compatibility is checked here; coverage of the
/// individual slots is validated after mapping.
pub fn detect_layout(positions: &[f64]) -> Result<Vec<FieldLayout>> {
    if positions.is_empty() || positions.len() % 3 != 0 {
        return Err(Error::Layout(format!(
            "Expected a non-empty multiple of 3 position values, got {}",
            positions.len()
        )));
    }
    let aers: Vec<[f64; 3]> = positions
        .chunks_exact(3)
        .map(|p| cartesian_to_spherical([p[0], p[1], p[2]]))
        .collect();

    let shells = cluster(aers.iter().map(|a| a[2]).collect(), DISTANCE_EPSILON);
    if shells.len() > MAX_FIELD_COUNT {
        return Err(Error::Layout(format!(
            "Too many distance shells: {} (max {MAX_FIELD_COUNT})",
            shells.len()
        )));
    }

    let mut fields = Vec::with_capacity(shells.len());
    let mut usable = 0usize;
    for shell in &shells {
        let distance = mean(shell);
        let members: Vec<[f64; 3]> = aers
            .iter()
            .filter(|a| (a[2] - distance).abs() < DISTANCE_EPSILON)
            .copied()
            .collect();

        let rows = cluster(members.iter().map(|a| a[1]).collect(), ANGLE_EPSILON);
        if rows.len() < 2 {
            return Err(Error::Layout(format!(
                "Field at {distance:.3} m has fewer than two elevation rows"
            )));
        }
        let row_evs: Vec<f64> = rows.iter().map(|g| mean(g)).collect();
        let step = dominant_step(&row_evs);
        if !(step > 0.0) {
            return Err(Error::Layout(format!(
                "No usable elevation spacing at {distance:.3} m"
            )));
        }

        // Anchor the lattice on the best-populated row and drop rows that do
        // not sit on it. A few outliers are expected; losing a meaningful
        // share of the measurements means the layout is incompatible.
        let anchor = row_evs[rows
            .iter()
            .enumerate()
            .max_by_key(|(_, g)| g.len())
            .map(|(i, _)| i)
            .unwrap_or(0)];
        let mut kept = Vec::new();
        let mut dropped = 0usize;
        for (row, &ev) in rows.iter().zip(&row_evs) {
            let f = (ev - anchor) / step;
            if (f - f.round()).abs() <= SNAP_TOLERANCE {
                kept.push(ev);
            } else {
                debug!("Dropping outlier elevation row at {ev:.2} ({} IRs)", row.len());
                dropped += row.len();
            }
        }
        if dropped * 10 > members.len() {
            return Err(Error::Layout(format!(
                "Inconsistent elevation spacing at {distance:.3} m ({dropped} of {} IRs off the grid)",
                members.len()
            )));
        }
        if kept.len() < 2 {
            return Err(Error::Layout(format!(
                "Field at {distance:.3} m has fewer than two usable elevation rows"
            )));
        }

        // Extend to the range symmetric about the equator so rows missing at
        // the low end can be synthesized by mirroring.
        let m_min = kept[0];
        let m_max = kept[kept.len() - 1];
        let base = m_min.min(-m_max);
        let top = m_max.max(-m_min);
        let span = (top - base) / step;
        if (span - span.round()).abs() > SNAP_TOLERANCE {
            return Err(Error::Layout(format!(
                "Elevation grid at {distance:.3} m is not symmetric about the equator"
            )));
        }
        let count = span.round() as usize + 1;

        let mut az_counts = vec![0usize; count];
        let mut measured = vec![false; count];
        for &ev in &kept {
            let f = (ev - base) / step;
            let ei = f.round();
            if (f - ei).abs() > SNAP_TOLERANCE || ei < 0.0 || ei >= count as f64 {
                return Err(Error::Layout(format!(
                    "Elevation {ev:.2} does not sit on the detected grid at {distance:.3} m"
                )));
            }
            let ei = ei as usize;

            let mut distinct: Vec<f64> = Vec::new();
            for group in cluster(
                members
                    .iter()
                    .filter(|a| (a[1] - ev).abs() < ANGLE_EPSILON)
                    .map(|a| a[0])
                    .collect(),
                ANGLE_EPSILON,
            ) {
                distinct.push(mean(&group));
            }
            // A cluster just below 360 degrees is the same slot as azimuth 0.
            if distinct.len() > 1
                && (360.0 - distinct[distinct.len() - 1]) + distinct[0] < ANGLE_EPSILON
            {
                distinct.pop();
            }

            usable += distinct.len();
            az_counts[ei] = azimuth_slot_count(&distinct, ev, distance)?;
            measured[ei] = true;
        }

        for ei in 0..count {
            if measured[ei] {
                continue;
            }
            let mi = count - 1 - ei;
            if !measured[mi] {
                return Err(Error::Layout(format!(
                    "Row {ei} at {distance:.3} m has no measurements and no mirror source"
                )));
            }
            az_counts[ei] = az_counts[mi];
        }

        // Azimuth density may not increase moving from the equator toward
        // either pole.
        let mut equator = 0;
        for ei in 1..count {
            if (base + step * ei as f64).abs() < (base + step * equator as f64).abs() {
                equator = ei;
            }
        }
        for ei in equator..count - 1 {
            if az_counts[ei + 1] > az_counts[ei] {
                return Err(Error::Layout(format!(
                    "Azimuth count increases toward the pole at {distance:.3} m (row {})",
                    ei + 1
                )));
            }
        }
        for ei in (1..=equator).rev() {
            if az_counts[ei - 1] > az_counts[ei] {
                return Err(Error::Layout(format!(
                    "Azimuth count increases toward the pole at {distance:.3} m (row {})",
                    ei - 1
                )));
            }
        }

        fields.push(FieldLayout {
            distance,
            ev_base: base,
            ev_step: step,
            az_counts,
            measured,
        });
    }

    info!("Using {} of {} IRs", usable, aers.len());
    Ok(fields)
}
