//! Fixed protocol constants for the CO2 monitor family.
//!
//! The device key, opcodes and HID identifier are modelled as an immutable
//! [`ProtocolConfig`] that is built once at startup and handed explicitly to
//! the codec, the parser, discovery and the acquisition loop.

use crate::error::{AppResult, MonitorError};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Length in bytes of the device key and of every raw report.
pub const REPORT_LEN: usize = 8;

/// Opcode of a CO2 concentration report.
pub const CO2_OPCODE: u8 = 0x50;

/// Opcode of an ambient temperature report.
pub const TEMPERATURE_OPCODE: u8 = 0x42;

/// Key shipped with the reference host software.
pub const DEFAULT_KEY: [u8; REPORT_LEN] = [0x86, 0x41, 0xc9, 0xa8, 0x7f, 0x41, 0x3c, 0xac];

/// Poll timeout of a single read.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(1);

/// Secret used both to prime the device and to descramble its reports.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct DeviceKey([u8; REPORT_LEN]);

impl DeviceKey {
    /// Wrap raw key bytes.
    pub const fn new(bytes: [u8; REPORT_LEN]) -> Self {
        Self(bytes)
    }

    /// Raw key bytes, as written to the device.
    pub fn as_bytes(&self) -> &[u8; REPORT_LEN] {
        &self.0
    }
}

impl Default for DeviceKey {
    fn default() -> Self {
        Self(DEFAULT_KEY)
    }
}

impl fmt::Display for DeviceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

// Keep the key out of debug logs.
impl fmt::Debug for DeviceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DeviceKey(..)")
    }
}

impl FromStr for DeviceKey {
    type Err = MonitorError;

    /// Parse 16 hex digits, e.g. `8641c9a87f413cac`.
    fn from_str(s: &str) -> AppResult<Self> {
        let s = s.trim();
        if s.len() != REPORT_LEN * 2 || !s.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(MonitorError::Configuration(format!(
                "device key must be {} hex digits",
                REPORT_LEN * 2
            )));
        }

        let mut bytes = [0u8; REPORT_LEN];
        for (i, byte) in bytes.iter_mut().enumerate() {
            let pair = &s[i * 2..i * 2 + 2];
            *byte = u8::from_str_radix(pair, 16).map_err(|_| {
                MonitorError::Configuration(format!("invalid hex byte '{}' in device key", pair))
            })?;
        }
        Ok(Self(bytes))
    }
}

/// HID identity of the sensor: `vendor:product:revision:interface`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceIdentifier {
    /// USB vendor id
    pub vendor: u16,
    /// USB product id
    pub product: u16,
    /// Device release number (bcdDevice)
    pub revision: u16,
    /// USB interface number
    pub interface: u8,
}

impl DeviceIdentifier {
    /// Identifier of the supported monitor, `04d9:a052:0100:00`.
    pub const CO2_MINI: Self = Self {
        vendor: 0x04d9,
        product: 0xa052,
        revision: 0x0100,
        interface: 0x00,
    };
}

impl Default for DeviceIdentifier {
    fn default() -> Self {
        Self::CO2_MINI
    }
}

impl fmt::Display for DeviceIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04x}:{:04x}:{:04x}:{:02x}",
            self.vendor, self.product, self.revision, self.interface
        )
    }
}

impl FromStr for DeviceIdentifier {
    type Err = MonitorError;

    fn from_str(s: &str) -> AppResult<Self> {
        let invalid = || {
            MonitorError::Configuration(format!(
                "invalid device identifier '{}', expected vendor:product:revision:interface in hex",
                s
            ))
        };

        let fields: Vec<&str> = s.trim().split(':').collect();
        let &[vendor, product, revision, interface] = fields.as_slice() else {
            return Err(invalid());
        };

        let is_hex = |field: &str, width: usize| {
            field.len() == width && field.chars().all(|c| c.is_ascii_hexdigit())
        };
        let parse16 = |field: &str| -> AppResult<u16> {
            if !is_hex(field, 4) {
                return Err(invalid());
            }
            u16::from_str_radix(field, 16).map_err(|_| invalid())
        };
        if !is_hex(interface, 2) {
            return Err(invalid());
        }

        Ok(Self {
            vendor: parse16(vendor)?,
            product: parse16(product)?,
            revision: parse16(revision)?,
            interface: u8::from_str_radix(interface, 16).map_err(|_| invalid())?,
        })
    }
}

/// Immutable protocol settings shared by every component.
#[derive(Debug, Clone, PartialEq)]
pub struct ProtocolConfig {
    /// Priming and descrambling key
    pub key: DeviceKey,
    /// Identifier discovery must match
    pub identifier: DeviceIdentifier,
    /// Opcode of CO2 reports
    pub co2_opcode: u8,
    /// Opcode of temperature reports
    pub temperature_opcode: u8,
    /// Timeout of a single poll
    pub read_timeout: Duration,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            key: DeviceKey::default(),
            identifier: DeviceIdentifier::default(),
            co2_opcode: CO2_OPCODE,
            temperature_opcode: TEMPERATURE_OPCODE,
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifier_renders_like_discovery_string() {
        assert_eq!(DeviceIdentifier::CO2_MINI.to_string(), "04d9:a052:0100:00");
    }

    #[test]
    fn identifier_parses_and_rejects() {
        let id: DeviceIdentifier = "04d9:a052:0100:00".parse().unwrap();
        assert_eq!(id, DeviceIdentifier::CO2_MINI);

        assert!("04d9:a052:0100".parse::<DeviceIdentifier>().is_err());
        assert!("04d9:a052:0100:00:01".parse::<DeviceIdentifier>().is_err());
        assert!("4d9:a052:0100:00".parse::<DeviceIdentifier>().is_err());
        assert!("04d9:zz52:0100:00".parse::<DeviceIdentifier>().is_err());
        assert!("04d9:a052:0100:0000".parse::<DeviceIdentifier>().is_err());
    }

    #[test]
    fn key_round_trips_through_hex() {
        let key: DeviceKey = "8641c9a87f413cac".parse().unwrap();
        assert_eq!(key, DeviceKey::default());
        assert_eq!(key.to_string(), "8641c9a87f413cac");

        assert!("8641c9a87f413c".parse::<DeviceKey>().is_err());
        assert!("8641c9a87f413cxx".parse::<DeviceKey>().is_err());
    }

    #[test]
    fn key_is_not_printed_in_debug_output() {
        let rendered = format!("{:?}", ProtocolConfig::default());
        assert!(!rendered.contains("8641"));
    }
}
