//! Device access: the transport traits, the `hidapi` backend and a scripted mock.

pub mod hid;
pub mod mock;
pub mod transport;

pub use hid::{discover, HidTransport};
pub use mock::{MockRead, MockTransport};
pub use transport::{ReportHandle, Transport};
