//! Structured measurement grid
//!
//! Layout detection over scattered measurement positions and the dense
//! field/elevation/azimuth data set the pipeline fills in.

pub mod dataset;
pub mod layout;

pub use dataset::{AzimuthSlot, ChannelType, Elevation, Field, HrirDataSet};
pub use layout::{detect_layout, FieldLayout};

/// Convert a Cartesian position to spherical coordinates in degrees:
/// azimuth in `[0, 360)`, elevation in `[-90, 90]`, radius in meters.
pub(crate) fn cartesian_to_spherical(p: [f64; 3]) -> [f64; 3] {
    let [x, y, z] = p;
    let mut azimuth = y.atan2(x).to_degrees();
    if azimuth < 0.0 {
        azimuth += 360.0;
    }
    let elevation = z.atan2(x.hypot(y)).to_degrees();
    let radius = (x * x + y * y + z * z).sqrt();
    [azimuth, elevation, radius]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_axis_positions() {
        let [az, ev, r] = cartesian_to_spherical([1.0, 0.0, 0.0]);
        assert!(az.abs() < 1e-9);
        assert!(ev.abs() < 1e-9);
        assert!((r - 1.0).abs() < 1e-9);

        let [az, ev, _] = cartesian_to_spherical([0.0, -1.0, 0.0]);
        assert!((az - 270.0).abs() < 1e-9);
        assert!(ev.abs() < 1e-9);

        let [_, ev, r] = cartesian_to_spherical([0.0, 0.0, 2.0]);
        assert!((ev - 90.0).abs() < 1e-9);
        assert!((r - 2.0).abs() < 1e-9);
    }
}
