//! Acquisition modes built on the producer/consumer pipeline.
//!
//! Both modes run exactly two tasks: the blocking [`AcquisitionLoop`] and one
//! consumer, joined by a single-slot queue.
//!
//! - [`oneshot`] aggregates until one CO2 and one temperature reading were seen,
//!   writes that value once and stops the loop.
//! - [`watch`] writes every reading as it arrives until cancelled from outside.

pub mod oneshot;
pub mod watch;

pub use oneshot::{OneshotAggregator, Progress};
pub use watch::Watcher;

use crate::acquisition::{self, AcquisitionLoop, CancellationToken};
use crate::error::{AppResult, MonitorError};
use crate::hardware::Transport;
use crate::measurement::Value;
use crate::output::OutputWriter;
use crate::protocol::ProtocolConfig;
use tracing::{info, warn};

/// Read one complete value and write it to `sink`.
///
/// There is no overall timeout: if the device never reports both kinds this
/// waits until `cancel` is triggered from outside.
///
/// # Errors
/// - the acquisition loop's fatal error (`TransportOpen`, `DevicePrime`)
/// - `OutputWrite` if the sink fails
/// - `Interrupted` if `cancel` fired before the value was complete
pub async fn oneshot<T, O>(
    transport: T,
    protocol: &ProtocolConfig,
    sink: &mut O,
    cancel: CancellationToken,
) -> AppResult<Value>
where
    T: Transport,
    O: OutputWriter + ?Sized,
{
    let (mut receiver, producer) =
        acquisition::spawn(AcquisitionLoop::new(transport, protocol), cancel.clone());

    let completed = OneshotAggregator::new()
        .consume(&mut receiver, &cancel)
        .await;
    // Unblocks a producer parked on the full queue.
    drop(receiver);

    let delivered = match completed {
        Some(value) => sink.write(&value).map(|()| Some(value)),
        None => Ok(None),
    };
    let summary = producer.await?;

    match (delivered?, summary) {
        (Some(value), _) => {
            info!(co2 = ?value.co2, temp = ?value.temp, "oneshot reading delivered");
            Ok(value)
        }
        (None, Err(err)) => Err(err),
        (None, Ok(_)) => Err(MonitorError::Interrupted),
    }
}

/// Stream every reading to `sink` until `cancel` fires.
///
/// Returns the number of values written.
///
/// # Errors
/// - the acquisition loop's fatal error (`TransportOpen`, `DevicePrime`)
/// - `OutputWrite` if the sink fails; the loop is stopped first
pub async fn watch<T, O>(
    transport: T,
    protocol: &ProtocolConfig,
    sink: &mut O,
    cancel: CancellationToken,
) -> AppResult<u64>
where
    T: Transport,
    O: OutputWriter + ?Sized,
{
    let (mut receiver, producer) =
        acquisition::spawn(AcquisitionLoop::new(transport, protocol), cancel.clone());

    let consumed = Watcher::new().consume(&mut receiver, sink).await;
    if let Err(err) = &consumed {
        warn!(error = %err, "output failed, stopping acquisition");
        cancel.cancel();
    }
    drop(receiver);

    let summary = producer.await?;
    let delivered = consumed?;
    summary?;
    Ok(delivered)
}
