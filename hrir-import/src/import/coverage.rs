//! Coverage validator
//!
//! Confirms every grid cell ended up populated, determines each field's
//! `ev_start` and fills the sparse pole region below it by aliasing the
//! mirrored elevation's storage. No samples are copied: a mirrored cell and
//! its source reference the same backing region.

use tracing::{debug, error};

use crate::error::{Error, Result};
use crate::grid::HrirDataSet;

/// Validate coverage for every field and wire up the mirror region.
pub(crate) fn validate_coverage(data: &mut HrirDataSet) -> Result<()> {
    for fi in 0..data.fields.len() {
        let ev_count = data.fields[fi].elevations.len();

        let ev_start = data.fields[fi]
            .elevations
            .iter()
            .position(|e| e.azimuths.iter().any(|slot| slot.is_populated()));
        let Some(ev_start) = ev_start else {
            error!("Field {fi} holds no measurements at all");
            return Err(Error::Coverage(format!("[ {fi}, *, * ]")));
        };
        data.fields[fi].ev_start = ev_start;

        for ei in ev_start..ev_count {
            for (ai, slot) in data.fields[fi].elevations[ei].azimuths.iter().enumerate() {
                if !slot.is_populated() {
                    return Err(Error::Coverage(format!("[ {fi}, {ei}, {ai} ]")));
                }
            }
        }

        if ev_start > 0 {
            debug!("Field {fi}: mirroring {ev_start} elevation row(s)");
        }
        for ei in 0..ev_start {
            let mi = ev_count - 1 - ei;
            let az_count = data.fields[fi].elevations[ei].azimuths.len();
            if az_count != data.fields[fi].elevations[mi].azimuths.len() {
                return Err(Error::Coverage(format!(
                    "Mirror row size mismatch [ {fi}, {ei} ]"
                )));
            }
            for ai in 0..az_count {
                let source = data.fields[fi].elevations[mi].azimuths[az_count - 1 - ai].clone();
                if !source.is_populated() {
                    return Err(Error::Coverage(format!(
                        "[ {fi}, {mi}, {} ]",
                        az_count - 1 - ai
                    )));
                }
                let slot = &mut data.fields[fi].elevations[ei].azimuths[ai];
                slot.irs = source.irs;
                slot.delays = source.delays;
            }
        }
    }
    Ok(())
}

/// Re-copy the refined delays into the mirror region so both cells of every
/// mirrored pair hold the identical value.
pub(crate) fn resync_mirrored_delays(data: &mut HrirDataSet) {
    for field in &mut data.fields {
        let ev_count = field.elevations.len();
        for ei in 0..field.ev_start {
            let mi = ev_count - 1 - ei;
            let az_count = field.elevations[ei].azimuths.len();
            for ai in 0..az_count {
                let delays = field.elevations[mi].azimuths[az_count - 1 - ai].delays;
                field.elevations[ei].azimuths[ai].delays = delays;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::layout::FieldLayout;
    use crate::grid::{ChannelType, HrirDataSet};

    fn allocate(az_counts: Vec<usize>) -> HrirDataSet {
        let layout = FieldLayout {
            distance: 1.0,
            ev_base: -60.0,
            ev_step: 60.0,
            measured: vec![true; az_counts.len()],
            az_counts,
        };
        HrirDataSet::allocate(&[layout], ChannelType::Mono, 48000, 16, 33, 64, 0.09)
    }

    fn populate(data: &mut HrirDataSet, ei: usize, ai: usize) {
        let index = data.fields[0].elevations[ei].azimuths[ai].index;
        let offset = data.channel_offset(0, index);
        data.fields[0].elevations[ei].azimuths[ai].irs[0] = Some(offset);
    }

    #[test]
    fn fully_populated_field_starts_at_zero() {
        let mut data = allocate(vec![4, 8, 4]);
        for ei in 0..3 {
            for ai in 0..data.fields[0].elevations[ei].azimuths.len() {
                populate(&mut data, ei, ai);
            }
        }
        validate_coverage(&mut data).unwrap();
        assert_eq!(data.fields[0].ev_start, 0);
    }

    #[test]
    fn empty_field_is_fatal() {
        let mut data = allocate(vec![4, 8, 4]);
        assert!(matches!(
            validate_coverage(&mut data),
            Err(Error::Coverage(_))
        ));
    }

    #[test]
    fn gap_above_ev_start_is_fatal() {
        let mut data = allocate(vec![4, 8, 4]);
        for ei in 0..3 {
            for ai in 0..data.fields[0].elevations[ei].azimuths.len() {
                populate(&mut data, ei, ai);
            }
        }
        data.fields[0].elevations[1].azimuths[5].irs[0] = None;
        let result = validate_coverage(&mut data);
        match result {
            Err(Error::Coverage(loc)) => assert_eq!(loc, "[ 0, 1, 5 ]"),
            other => panic!("expected coverage error, got {other:?}"),
        }
    }

    #[test]
    fn unpopulated_mirror_source_is_fatal() {
        // Only the topmost of three rows is populated, so ev_start = 2 and
        // row 1 would have to mirror itself while holding nothing.
        let mut data = allocate(vec![2, 2, 2]);
        for ai in 0..2 {
            populate(&mut data, 2, ai);
        }
        assert!(matches!(
            validate_coverage(&mut data),
            Err(Error::Coverage(_))
        ));
    }

    #[test]
    fn mirror_rows_alias_reversed_azimuths() {
        let mut data = allocate(vec![4, 8, 4]);
        for ei in 1..3 {
            for ai in 0..data.fields[0].elevations[ei].azimuths.len() {
                populate(&mut data, ei, ai);
            }
        }
        for ai in 0..4 {
            data.fields[0].elevations[2].azimuths[ai].delays[0] = 0.001 * ai as f64;
        }
        validate_coverage(&mut data).unwrap();
        assert_eq!(data.fields[0].ev_start, 1);

        for ai in 0..4 {
            let mirrored = &data.fields[0].elevations[0].azimuths[ai];
            let source = &data.fields[0].elevations[2].azimuths[3 - ai];
            assert_eq!(mirrored.irs[0], source.irs[0]);
            assert_eq!(mirrored.delays[0], source.delays[0]);
            // The slot keeps its own reserved index even while aliasing.
            assert_ne!(mirrored.index, source.index);
        }
    }
}
