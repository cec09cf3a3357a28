//! Measurement-set reader boundary
//!
//! `MeasurementSet` models exactly what the external container reader hands
//! over: raw measurement arrays plus their attribute metadata. The pipeline
//! only validates and borrows this data; parsing the container itself is the
//! reader's job.

use tracing::debug;

use crate::error::{Error, Result};

/// Lowest supported measurement sample rate in Hz
pub const MIN_RATE: u32 = 32_000;
/// Highest supported measurement sample rate in Hz
pub const MAX_RATE: u32 = 96_000;

/// One attribute attached to a data array by the container reader
#[derive(Debug, Clone)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

impl Attribute {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// A raw data array with its declared attributes
#[derive(Debug, Clone, Default)]
pub struct DataArray {
    pub values: Vec<f64>,
    pub attributes: Vec<Attribute>,
}

/// How per-impulse delays are represented in the source set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DelayType {
    /// No delay data present
    None,
    /// One delay per receiver, shared by all measurements (`I,R`)
    PerReceiver,
    /// One delay per measurement per receiver (`M,R`)
    PerMeasurementReceiver,
}

/// Raw measurement set as exposed by the external reader
#[derive(Debug, Clone)]
pub struct MeasurementSet {
    /// Number of measurements (M)
    pub measurements: usize,
    /// Number of receiver channels (R)
    pub receivers: usize,
    /// Number of emitters (E); only single-emitter sets are supported
    pub emitters: usize,
    /// Samples per impulse response (N)
    pub samples: usize,
    /// Flat `M x 3` Cartesian source positions in meters
    pub source_positions: Vec<f64>,
    /// Sample-rate scalar with unit/dimension attributes
    pub sample_rate: DataArray,
    /// Delay data; dimensions decide the [`DelayType`]
    pub delay: DataArray,
    /// Raw impulse-response samples, declared `M,R,N`
    pub ir: DataArray,
}

/// Walk an array's attributes, returning its dimension list and unit type.
///
/// Duplicate declarations are a format error; anything else unexpected is
/// reported and ignored, matching what permissive readers produce.
fn dimensions_and_units<'a>(
    array: &'a DataArray,
    label: &str,
) -> Result<(Option<&'a str>, Option<&'a str>)> {
    let mut dim = None;
    let mut units = None;
    for attr in &array.attributes {
        match attr.name.as_str() {
            "DIMENSION_LIST" => {
                if dim.is_some() {
                    return Err(Error::Format(format!("Duplicate {label}.DIMENSION_LIST")));
                }
                dim = Some(attr.value.as_str());
            }
            "Units" => {
                if units.is_some() {
                    return Err(Error::Format(format!("Duplicate {label}.Units")));
                }
                units = Some(attr.value.as_str());
            }
            name => debug!("Unexpected {label} attribute: {} = {}", name, attr.value),
        }
    }
    Ok((dim, units))
}

impl MeasurementSet {
    /// Sanity-check counts and array shapes before any stage runs.
    pub fn validate(&self) -> Result<()> {
        if self.emitters != 1 {
            return Err(Error::Format(format!(
                "{} emitters not supported",
                self.emitters
            )));
        }
        if self.receivers < 1 || self.receivers > 2 {
            return Err(Error::Format(format!(
                "{} receivers not supported",
                self.receivers
            )));
        }
        if self.source_positions.len() != self.measurements * 3 {
            return Err(Error::Format(format!(
                "Expected {} position values, got {}",
                self.measurements * 3,
                self.source_positions.len()
            )));
        }
        Ok(())
    }

    /// Resolve the measurement sample rate in Hz.
    pub fn sample_rate(&self) -> Result<u32> {
        let (dim, units) = dimensions_and_units(&self.sample_rate, "SampleRate")?;
        let dim = dim.ok_or_else(|| Error::Format("Missing sample rate dimensions".into()))?;
        if dim != "I" {
            return Err(Error::Format(format!(
                "Unsupported sample rate dimensions: {dim}"
            )));
        }
        let units = units.ok_or_else(|| Error::Format("Missing sample rate unit type".into()))?;
        if units != "hertz" {
            return Err(Error::Format(format!(
                "Unsupported sample rate unit type: {units}"
            )));
        }
        // The scalar dimension guarantees a single value.
        let rate = *self
            .sample_rate
            .values
            .first()
            .ok_or_else(|| Error::Format("Missing sample rate value".into()))?;
        if rate < f64::from(MIN_RATE) || rate > f64::from(MAX_RATE) {
            return Err(Error::Format(format!(
                "Sample rate out of range: {rate} (expected {MIN_RATE} to {MAX_RATE})"
            )));
        }
        Ok(rate.round() as u32)
    }

    /// Classify the delay representation carried by the set and verify the
    /// array holds as many values as its dimensions declare.
    pub fn delay_type(&self) -> Result<DelayType> {
        let (dim, _units) = dimensions_and_units(&self.delay, "Delay")?;
        let (delay_type, expected) = match dim {
            None => return Ok(DelayType::None),
            Some("I,R") => (DelayType::PerReceiver, self.receivers),
            Some("M,R") => (
                DelayType::PerMeasurementReceiver,
                self.measurements * self.receivers,
            ),
            Some(other) => {
                return Err(Error::Format(format!(
                    "Unsupported delay dimensions: {other}"
                )))
            }
        };
        if self.delay.values.len() != expected {
            return Err(Error::Format(format!(
                "Expected {} delay values, got {}",
                expected,
                self.delay.values.len()
            )));
        }
        Ok(delay_type)
    }

    /// Verify the impulse-response array is laid out measurement-major.
    pub fn check_ir_dimensions(&self) -> Result<()> {
        let (dim, _units) = dimensions_and_units(&self.ir, "IR")?;
        let dim = dim.ok_or_else(|| Error::Format("Missing IR dimensions".into()))?;
        if dim != "M,R,N" {
            return Err(Error::Format(format!("Unsupported IR dimensions: {dim}")));
        }
        let expected = self.measurements * self.receivers * self.samples;
        if self.ir.values.len() != expected {
            return Err(Error::Format(format!(
                "Expected {} IR samples, got {}",
                expected,
                self.ir.values.len()
            )));
        }
        Ok(())
    }

    /// Cartesian position of measurement `si`.
    pub fn position(&self, si: usize) -> [f64; 3] {
        let p = &self.source_positions[si * 3..si * 3 + 3];
        [p[0], p[1], p[2]]
    }

    /// Raw impulse response of measurement `si`, receiver `channel`.
    pub fn ir_samples(&self, si: usize, channel: usize) -> &[f64] {
        let start = (si * self.receivers + channel) * self.samples;
        &self.ir.values[start..start + self.samples]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rate_array(dim: &str, units: &str, value: f64) -> DataArray {
        DataArray {
            values: vec![value],
            attributes: vec![
                Attribute::new("DIMENSION_LIST", dim),
                Attribute::new("Units", units),
            ],
        }
    }

    fn minimal_set() -> MeasurementSet {
        MeasurementSet {
            measurements: 1,
            receivers: 1,
            emitters: 1,
            samples: 4,
            source_positions: vec![1.0, 0.0, 0.0],
            sample_rate: rate_array("I", "hertz", 48000.0),
            delay: DataArray::default(),
            ir: DataArray {
                values: vec![1.0, 0.0, 0.0, 0.0],
                attributes: vec![Attribute::new("DIMENSION_LIST", "M,R,N")],
            },
        }
    }

    #[test]
    fn accepts_minimal_set() {
        let set = minimal_set();
        set.validate().unwrap();
        assert_eq!(set.sample_rate().unwrap(), 48000);
        assert_eq!(set.delay_type().unwrap(), DelayType::None);
        set.check_ir_dimensions().unwrap();
    }

    #[test]
    fn rejects_multiple_emitters() {
        let set = MeasurementSet {
            emitters: 2,
            ..minimal_set()
        };
        assert!(matches!(set.validate(), Err(Error::Format(_))));
    }

    #[test]
    fn rejects_wrong_rate_dimensions() {
        let set = MeasurementSet {
            sample_rate: rate_array("M", "hertz", 48000.0),
            ..minimal_set()
        };
        assert!(matches!(set.sample_rate(), Err(Error::Format(_))));
    }

    #[test]
    fn rejects_wrong_rate_units() {
        let set = MeasurementSet {
            sample_rate: rate_array("I", "seconds", 48000.0),
            ..minimal_set()
        };
        assert!(matches!(set.sample_rate(), Err(Error::Format(_))));
    }

    #[test]
    fn rejects_duplicate_dimension_list() {
        let mut set = minimal_set();
        set.sample_rate
            .attributes
            .push(Attribute::new("DIMENSION_LIST", "I"));
        assert!(matches!(set.sample_rate(), Err(Error::Format(_))));
    }

    #[test]
    fn rejects_out_of_range_rate() {
        let set = MeasurementSet {
            sample_rate: rate_array("I", "hertz", 8000.0),
            ..minimal_set()
        };
        assert!(matches!(set.sample_rate(), Err(Error::Format(_))));
    }

    #[test]
    fn classifies_delay_dimensions() {
        let mut set = minimal_set();
        set.delay = DataArray {
            values: vec![12.0],
            attributes: vec![Attribute::new("DIMENSION_LIST", "I,R")],
        };
        assert_eq!(set.delay_type().unwrap(), DelayType::PerReceiver);

        set.delay.attributes[0].value = "M,R".into();
        assert_eq!(
            set.delay_type().unwrap(),
            DelayType::PerMeasurementReceiver
        );

        set.delay.attributes[0].value = "M,R,N".into();
        assert!(matches!(set.delay_type(), Err(Error::Format(_))));
    }

    #[test]
    fn rejects_mismatched_delay_length() {
        // Declared per-measurement-per-receiver but holding no values.
        let mut set = minimal_set();
        set.delay = DataArray {
            values: vec![],
            attributes: vec![Attribute::new("DIMENSION_LIST", "M,R")],
        };
        assert!(matches!(set.delay_type(), Err(Error::Format(_))));

        set.delay.attributes[0].value = "I,R".into();
        set.delay.values = vec![12.0, 14.0];
        assert!(matches!(set.delay_type(), Err(Error::Format(_))));
    }

    #[test]
    fn rejects_wrong_ir_dimensions() {
        let mut set = minimal_set();
        set.ir.attributes[0].value = "R,M,N".into();
        assert!(matches!(set.check_ir_dimensions(), Err(Error::Format(_))));
    }
}
