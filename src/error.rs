//! Custom error types for the application.
//!
//! This module defines the primary error type, `MonitorError`, used by every
//! layer of the crate. Using the `thiserror` crate, it gives a single place to
//! describe what can go wrong between finding the sensor and printing a value.
//!
//! ## Error Hierarchy
//!
//! - **`DeviceNotFound`**: discovery found no HID device with the configured identifier.
//! - **`Configuration`** / **`Config`**: semantic configuration errors (bad output format,
//!   malformed key or identifier) and `figment` extraction failures respectively.
//! - **`Hid`**: the HID library itself could not be initialised or enumerated.
//! - **`TransportOpen`** / **`DevicePrime`**: the device could not be opened or would not
//!   accept the key report. Both abort the acquisition before any polling.
//! - **`TransportRead`**: a single poll failed. The acquisition loop swallows these and
//!   polls again, so callers only ever see them from the transport layer directly.
//! - **`OutputWrite`**: the output sink failed; always fatal.
//!
//! By using `#[from]`, `MonitorError` can be created from the underlying library errors,
//! simplifying error handling with the `?` operator.

use thiserror::Error;

/// Convenience alias for results using the application error type.
pub type AppResult<T> = std::result::Result<T, MonitorError>;

/// Everything that can fail while discovering, polling or reporting.
#[derive(Error, Debug)]
pub enum MonitorError {
    /// No attached device matched the configured identifier.
    #[error("device not found (looking for {0})")]
    DeviceNotFound(String),

    /// A configuration value was syntactically valid but unusable.
    #[error("Configuration validation error: {0}")]
    Configuration(String),

    /// Layered configuration could not be extracted.
    #[error("Configuration error: {0}")]
    Config(#[from] Box<figment::Error>),

    /// The HID subsystem reported an error outside of a specific device operation.
    #[error("HID error: {0}")]
    Hid(#[from] hidapi::HidError),

    /// Opening the device failed.
    #[error("failed to open device: {0}")]
    TransportOpen(String),

    /// The device rejected the initial key report.
    #[error("failed to send key report to device: {0}")]
    DevicePrime(String),

    /// One poll of the device failed.
    #[error("device read failed: {0}")]
    TransportRead(String),

    /// The output sink could not be written.
    #[error("output write failed: {0}")]
    OutputWrite(#[from] std::io::Error),

    /// A background task panicked or was aborted.
    #[error("acquisition task failed: {0}")]
    TaskJoin(String),

    /// Acquisition was cancelled before a complete reading was collected.
    #[error("interrupted before a complete reading was received")]
    Interrupted,
}

impl MonitorError {
    /// Whether this error must terminate the current operation.
    ///
    /// Only per-poll read failures are recoverable; they are retried on the next cycle.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, MonitorError::TransportRead(_))
    }
}

impl From<figment::Error> for MonitorError {
    fn from(value: figment::Error) -> Self {
        MonitorError::Config(Box::new(value))
    }
}

impl From<tokio::task::JoinError> for MonitorError {
    fn from(value: tokio::task::JoinError) -> Self {
        MonitorError::TaskJoin(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_read_errors_are_recoverable() {
        assert!(!MonitorError::TransportRead("timeout".into()).is_fatal());
        assert!(MonitorError::TransportOpen("permission denied".into()).is_fatal());
        assert!(MonitorError::DeviceNotFound("04d9:a052:0100:00".into()).is_fatal());
        assert!(MonitorError::Configuration("bad".into()).is_fatal());
        assert!(MonitorError::Interrupted.is_fatal());
    }

    #[test]
    fn output_errors_convert_from_io() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed");
        let err: MonitorError = io.into();
        match err {
            MonitorError::OutputWrite(inner) => {
                assert_eq!(inner.kind(), std::io::ErrorKind::BrokenPipe)
            }
            other => panic!("unexpected variant: {:?}", other),
        }
    }

    #[test]
    fn device_not_found_names_identifier() {
        let err = MonitorError::DeviceNotFound("04d9:a052:0100:00".into());
        assert!(err.to_string().contains("04d9:a052:0100:00"));
    }
}
