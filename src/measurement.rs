//! Measurement types and the decoded-report parser.
//!
//! A decoded report carries an opcode in byte 0 and a big-endian 16-bit
//! magnitude in bytes 1-2. Everything after that (checksum, terminator) is
//! ignored.

use crate::protocol::ProtocolConfig;
use serde::{Serialize, Serializer};
use tracing::trace;

/// Offset between Kelvin and Celsius.
const KELVIN_OFFSET: f64 = 273.15;

/// A single decoded sensor reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Measurement {
    /// CO2 concentration in ppm
    Co2(u16),
    /// Ambient temperature in degrees Celsius
    Temperature(f64),
}

impl Measurement {
    /// Short label used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Measurement::Co2(_) => "co2",
            Measurement::Temperature(_) => "temp",
        }
    }
}

/// Partially populated reading handed to an output sink.
///
/// Fields serialize in the order `temp`, `co2`; absent fields become `null`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Value {
    /// Temperature in degrees Celsius
    #[serde(serialize_with = "serialize_temperature")]
    pub temp: Option<f64>,
    /// CO2 concentration in ppm
    pub co2: Option<u16>,
}

impl Value {
    /// Overwrite the field matching `measurement`, leaving the other untouched.
    pub fn merge(&mut self, measurement: Measurement) {
        match measurement {
            Measurement::Co2(ppm) => self.co2 = Some(ppm),
            Measurement::Temperature(celsius) => self.temp = Some(celsius),
        }
    }

    /// Both kinds have been observed.
    pub fn is_complete(&self) -> bool {
        self.co2.is_some() && self.temp.is_some()
    }
}

impl From<Measurement> for Value {
    fn from(measurement: Measurement) -> Self {
        let mut value = Value::default();
        value.merge(measurement);
        value
    }
}

// Whole-degree temperatures print as integers (`18`, not `18.0`).
fn serialize_temperature<S: Serializer>(temp: &Option<f64>, s: S) -> Result<S::Ok, S::Error> {
    match temp {
        Some(t) if t.is_finite() && t.fract() == 0.0 && t.abs() < 1e15 => s.serialize_i64(*t as i64),
        Some(t) => s.serialize_f64(*t),
        None => s.serialize_none(),
    }
}

/// Maps decoded reports onto [`Measurement`]s.
#[derive(Debug, Clone, Copy)]
pub struct MeasurementParser {
    co2_opcode: u8,
    temperature_opcode: u8,
}

impl MeasurementParser {
    /// Build a parser using the opcodes from `protocol`.
    pub fn new(protocol: &ProtocolConfig) -> Self {
        Self {
            co2_opcode: protocol.co2_opcode,
            temperature_opcode: protocol.temperature_opcode,
        }
    }

    /// Parse a decoded report.
    ///
    /// Never fails: short reports and unknown opcodes yield `None`.
    pub fn parse(&self, decoded: &[u8]) -> Option<Measurement> {
        let &[opcode, high, low, ..] = decoded else {
            return None;
        };
        let magnitude = u16::from_be_bytes([high, low]);

        if opcode == self.co2_opcode {
            Some(Measurement::Co2(magnitude))
        } else if opcode == self.temperature_opcode {
            Some(Measurement::Temperature(
                f64::from(magnitude) / 16.0 - KELVIN_OFFSET,
            ))
        } else {
            trace!(opcode, magnitude, "ignoring report");
            None
        }
    }
}

impl Default for MeasurementParser {
    fn default() -> Self {
        Self::new(&ProtocolConfig::default())
    }
}
