//! # co2mini
//!
//! Reader for the USB "CO2 mini" family of NDIR CO2 and temperature monitors.
//! The devices enumerate as a plain HID endpoint and speak a small scrambled
//! report protocol; this crate decodes it and offers two acquisition modes.
//!
//! ## Crate Structure
//!
//! - **`protocol`**: device key, opcodes and HID identifier as an immutable `ProtocolConfig`.
//! - **`codec`**: `ReportCodec`, the keyed reversible report descrambler.
//! - **`measurement`**: `Measurement`, the aggregate `Value` and `MeasurementParser`.
//! - **`hardware`**: the blocking `Transport`/`ReportHandle` traits, the `hidapi`
//!   backend with device discovery, and a scripted `MockTransport`.
//! - **`acquisition`**: the polling state machine and its `CancellationToken`.
//! - **`monitor`**: the `oneshot` and `watch` modes and their consumers.
//! - **`output`**: plain-text and JSON sinks behind the `OutputWriter` trait.
//! - **`config`**: layered configuration loaded with `figment`.
//! - **`logging`**: `tracing` subscriber setup.
//! - **`error`**: the crate-wide `MonitorError`.
//!
//! ## Example
//!
//! ```no_run
//! use co2mini::acquisition::CancellationToken;
//! use co2mini::hardware;
//! use co2mini::output::PlainOutputWriter;
//! use co2mini::protocol::ProtocolConfig;
//!
//! # async fn run() -> co2mini::error::AppResult<()> {
//! let protocol = ProtocolConfig::default();
//! let device = hardware::discover(&protocol.identifier)?;
//! let mut sink = PlainOutputWriter::new(std::io::stdout());
//! co2mini::oneshot(device, &protocol, &mut sink, CancellationToken::new()).await?;
//! # Ok(())
//! # }
//! ```

pub mod acquisition;
pub mod codec;
pub mod config;
pub mod error;
pub mod hardware;
pub mod logging;
pub mod measurement;
pub mod monitor;
pub mod output;
pub mod protocol;

pub use monitor::{oneshot, watch};
