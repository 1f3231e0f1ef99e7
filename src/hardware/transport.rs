//! Transport abstraction for HID report devices.
//!
//! A [`Transport`] knows how to reach one device; opening it yields a
//! [`ReportHandle`] that is exclusively owned by whoever opened it. Dropping
//! the handle closes the device, so release is guaranteed on every exit path.
//!
//! Both traits are blocking. The acquisition loop drives them from a
//! `spawn_blocking` thread, never from the async runtime directly.

use crate::error::AppResult;
use std::time::Duration;

/// Something that can be opened to obtain a report handle.
///
/// # Contract
/// - `open` performs the actual device open and may fail with `TransportOpen`
/// - implementations must be cheap to move onto a blocking thread
pub trait Transport: Send + 'static {
    /// Open device handle type
    type Handle: ReportHandle;

    /// Human readable description for logs (path, identifier, ...).
    fn describe(&self) -> String;

    /// Open the device.
    fn open(&self) -> AppResult<Self::Handle>;
}

/// An open device. Closed when dropped.
pub trait ReportHandle {
    /// Write a feature report. `data[0]` is the report id.
    fn send_feature_report(&mut self, data: &[u8]) -> AppResult<()>;

    /// Read one input report into `buf`, waiting at most `timeout`.
    ///
    /// # Returns
    /// - Ok(n) with the number of bytes read; `Ok(0)` means the timeout elapsed
    /// - Err(`TransportRead`) on a failed read
    fn read_timeout(&mut self, buf: &mut [u8], timeout: Duration) -> AppResult<usize>;
}
