//! HRIR data set storage
//!
//! One flat backing buffer owns every impulse response; fields, elevations
//! and azimuth slots only hold offsets into it. Two slots may share the same
//! offset (equatorial mirroring) without duplicating storage.

use serde::Deserialize;

use super::layout::FieldLayout;

/// Channel layout of the stored impulse responses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelType {
    Mono,
    Stereo,
}

impl ChannelType {
    pub fn count(self) -> usize {
        match self {
            ChannelType::Mono => 1,
            ChannelType::Stereo => 2,
        }
    }
}

/// One grid cell: a stable storage index plus per-channel IR views and delays
///
/// `irs` holds sample offsets into the shared backing buffer, `None` until
/// the mapper (or the mirroring pass) assigns the slot.
#[derive(Debug, Clone, Default)]
pub struct AzimuthSlot {
    /// Stable IR slot index assigned at allocation
    pub index: usize,
    /// Per-channel offsets into the backing buffer
    pub irs: [Option<usize>; 2],
    /// Per-channel propagation delay in seconds
    pub delays: [f64; 2],
}

impl AzimuthSlot {
    /// A slot is populated once its first channel has an IR view.
    pub fn is_populated(&self) -> bool {
        self.irs[0].is_some()
    }
}

/// One elevation row of azimuth slots, evenly spaced in `[0, 360)`
#[derive(Debug, Clone)]
pub struct Elevation {
    pub azimuths: Vec<AzimuthSlot>,
}

/// One distance shell with its own elevation/azimuth sampling grid
#[derive(Debug, Clone)]
pub struct Field {
    /// Shell distance in meters
    pub distance: f64,
    /// Elevation of row 0 in degrees
    pub ev_base: f64,
    /// Spacing between elevation rows in degrees
    pub ev_step: f64,
    /// First elevation row with genuine source coverage; lower rows are
    /// filled by mirroring
    pub ev_start: usize,
    pub elevations: Vec<Elevation>,
}

/// Root aggregate owning the flat IR storage and the field grid
#[derive(Debug)]
pub struct HrirDataSet {
    pub channel_type: ChannelType,
    /// Impulse response sample rate in Hz
    pub ir_rate: u32,
    /// Usable samples per impulse response
    pub ir_points: usize,
    /// Allocated samples per impulse response slot
    pub ir_size: usize,
    /// Forward transform size for magnitude analysis
    pub fft_size: usize,
    /// Assumed head radius in meters
    pub radius: f64,
    /// Total IR slots across all fields
    pub ir_count: usize,
    pub fields: Vec<Field>,
    hrirs: Vec<f64>,
}

impl HrirDataSet {
    /// Reserve zeroed storage for every slot of the detected layout and
    /// assign stable indices by flattening (field, elevation, azimuth).
    #[allow(clippy::too_many_arguments)]
    pub fn allocate(
        layouts: &[FieldLayout],
        channel_type: ChannelType,
        ir_rate: u32,
        ir_points: usize,
        ir_size: usize,
        fft_size: usize,
        radius: f64,
    ) -> Self {
        let mut index = 0usize;
        let mut fields = Vec::with_capacity(layouts.len());
        for layout in layouts {
            let mut elevations = Vec::with_capacity(layout.az_counts.len());
            for &az_count in &layout.az_counts {
                let mut azimuths = Vec::with_capacity(az_count);
                for _ in 0..az_count {
                    azimuths.push(AzimuthSlot {
                        index,
                        ..Default::default()
                    });
                    index += 1;
                }
                elevations.push(Elevation { azimuths });
            }
            fields.push(Field {
                distance: layout.distance,
                ev_base: layout.ev_base,
                ev_step: layout.ev_step,
                ev_start: 0,
                elevations,
            });
        }

        let ir_count = index;
        let hrirs = vec![0.0; channel_type.count() * ir_count * ir_size];
        Self {
            channel_type,
            ir_rate,
            ir_points,
            ir_size,
            fft_size,
            radius,
            ir_count,
            fields,
            hrirs,
        }
    }

    /// Backing-buffer offset of `index`'s IR for one channel. This is the
    /// single layout rule for the flat storage.
    pub fn channel_offset(&self, channel: usize, index: usize) -> usize {
        (self.ir_count * channel + index) * self.ir_size
    }

    /// Impulse-response view at a backing offset.
    pub fn ir(&self, offset: usize) -> &[f64] {
        &self.hrirs[offset..offset + self.ir_size]
    }

    /// Mutable impulse-response view at a backing offset.
    pub fn ir_mut(&mut self, offset: usize) -> &mut [f64] {
        let ir_size = self.ir_size;
        &mut self.hrirs[offset..offset + ir_size]
    }

    /// The whole backing buffer; used by the parallel magnitude stage.
    pub(crate) fn backing_mut(&mut self) -> &mut [f64] {
        &mut self.hrirs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::layout::FieldLayout;

    fn layout() -> FieldLayout {
        FieldLayout {
            distance: 1.0,
            ev_base: -60.0,
            ev_step: 60.0,
            az_counts: vec![4, 8, 4],
            measured: vec![true, true, true],
        }
    }

    #[test]
    fn allocates_contiguous_slot_indices() {
        let data = HrirDataSet::allocate(&[layout()], ChannelType::Stereo, 48000, 32, 33, 64, 0.09);
        assert_eq!(data.ir_count, 16);

        let mut expected = 0;
        for field in &data.fields {
            for elevation in &field.elevations {
                for slot in &elevation.azimuths {
                    assert_eq!(slot.index, expected);
                    assert!(!slot.is_populated());
                    expected += 1;
                }
            }
        }
    }

    #[test]
    fn channel_offsets_are_disjoint() {
        let data = HrirDataSet::allocate(&[layout()], ChannelType::Stereo, 48000, 32, 33, 64, 0.09);
        let left = data.channel_offset(0, 3);
        let right = data.channel_offset(1, 3);
        assert_eq!(left, 3 * 33);
        assert_eq!(right, (16 + 3) * 33);
        assert_eq!(data.ir(left).len(), 33);
    }
}
