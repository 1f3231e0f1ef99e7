//! `hidapi` backed transport and device discovery.
//!
//! Discovery walks the HID device list and computes the
//! `vendor:product:revision:interface` identifier of every entry; the first
//! entry whose identifier equals the configured one wins.

use crate::error::{AppResult, MonitorError};
use crate::hardware::transport::{ReportHandle, Transport};
use crate::protocol::DeviceIdentifier;
use hidapi::{DeviceInfo, HidApi, HidDevice};
use std::ffi::CString;
use std::time::Duration;
use tracing::{debug, info};

/// Render the identifier string of a HID device entry.
///
/// `interface` is signed because hidapi reports `-1` when the interface is
/// unknown; such entries render as a value that never matches.
pub fn format_identifier(vendor: u16, product: u16, revision: u16, interface: i32) -> String {
    format!(
        "{:04x}:{:04x}:{:04x}:{:02x}",
        vendor, product, revision, interface
    )
}

/// Whether a device entry carries exactly the `expected` identifier.
pub fn identifier_matches(
    vendor: u16,
    product: u16,
    revision: u16,
    interface: i32,
    expected: &DeviceIdentifier,
) -> bool {
    format_identifier(vendor, product, revision, interface) == expected.to_string()
}

fn info_matches(info: &DeviceInfo, expected: &DeviceIdentifier) -> bool {
    identifier_matches(
        info.vendor_id(),
        info.product_id(),
        info.release_number(),
        info.interface_number(),
        expected,
    )
}

/// Find the attached device with the given identifier.
///
/// # Errors
/// - `Hid` if the HID subsystem cannot be initialised
/// - `DeviceNotFound` if no entry matches
pub fn discover(identifier: &DeviceIdentifier) -> AppResult<HidTransport> {
    let api = HidApi::new()?;

    for info in api.device_list() {
        debug!(
            id = %format_identifier(
                info.vendor_id(),
                info.product_id(),
                info.release_number(),
                info.interface_number()
            ),
            path = ?info.path(),
            "HID device"
        );
    }

    let info = api
        .device_list()
        .find(|info| info_matches(info, identifier))
        .ok_or_else(|| MonitorError::DeviceNotFound(identifier.to_string()))?;

    info!(id = %identifier, path = ?info.path(), "found CO2 monitor");
    Ok(HidTransport {
        path: info.path().to_owned(),
        identifier: *identifier,
    })
}

/// A discovered HID device, not yet opened.
#[derive(Debug, Clone)]
pub struct HidTransport {
    path: CString,
    identifier: DeviceIdentifier,
}

impl Transport for HidTransport {
    type Handle = HidReportHandle;

    fn describe(&self) -> String {
        format!("{} at {}", self.identifier, self.path.to_string_lossy())
    }

    fn open(&self) -> AppResult<HidReportHandle> {
        let api = HidApi::new().map_err(|e| MonitorError::TransportOpen(e.to_string()))?;
        let device = api.open_path(&self.path).map_err(|e| {
            MonitorError::TransportOpen(format!("{}: {}", self.path.to_string_lossy(), e))
        })?;
        Ok(HidReportHandle { device, _api: api })
    }
}

/// Open hidapi device. Closed by hidapi when dropped.
pub struct HidReportHandle {
    device: HidDevice,
    // Declared after `device` so the library outlives the handle on drop.
    _api: HidApi,
}

impl ReportHandle for HidReportHandle {
    fn send_feature_report(&mut self, data: &[u8]) -> AppResult<()> {
        self.device
            .send_feature_report(data)
            .map_err(|e| MonitorError::DevicePrime(e.to_string()))
    }

    fn read_timeout(&mut self, buf: &mut [u8], timeout: Duration) -> AppResult<usize> {
        let millis = i32::try_from(timeout.as_millis()).unwrap_or(i32::MAX);
        self.device
            .read_timeout(buf, millis)
            .map_err(|e| MonitorError::TransportRead(e.to_string()))
    }
}
