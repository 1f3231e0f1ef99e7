//! Streaming consumer: forwards every measurement to the sink on its own.

use crate::error::AppResult;
use crate::measurement::{Measurement, Value};
use crate::output::OutputWriter;
use tokio::sync::mpsc;
use tracing::trace;

/// Writes one single-field [`Value`] per measurement, in arrival order.
#[derive(Debug, Default)]
pub struct Watcher {
    delivered: u64,
}

impl Watcher {
    /// New watcher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Write `measurement` to `sink` as a value with only that field set.
    pub fn forward<O: OutputWriter + ?Sized>(
        &mut self,
        measurement: Measurement,
        sink: &mut O,
    ) -> AppResult<()> {
        sink.write(&Value::from(measurement))?;
        self.delivered += 1;
        trace!(kind = measurement.kind(), delivered = self.delivered, "forwarded");
        Ok(())
    }

    /// Forward until the queue closes. Never cancels the producer itself.
    ///
    /// # Errors
    /// The first sink failure; the caller is expected to tear the pipeline down.
    pub async fn consume<O: OutputWriter + ?Sized>(
        mut self,
        receiver: &mut mpsc::Receiver<Measurement>,
        sink: &mut O,
    ) -> AppResult<u64> {
        while let Some(measurement) = receiver.recv().await {
            self.forward(measurement, sink)?;
        }
        Ok(self.delivered)
    }
}
