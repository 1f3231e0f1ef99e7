//! Aggregating consumer: collects one CO2 and one temperature reading.

use crate::acquisition::CancellationToken;
use crate::measurement::{Measurement, Value};
use tokio::sync::mpsc;
use tracing::debug;

/// Result of feeding one measurement to the aggregator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// At least one kind is still missing
    Pending,
    /// This measurement completed the value
    Completed,
    /// The value was already complete; the measurement was still merged
    AlreadyCompleted,
}

/// Merges measurements into a [`Value`] until both kinds were seen.
#[derive(Debug, Default)]
pub struct OneshotAggregator {
    value: Value,
    completed: bool,
}

impl OneshotAggregator {
    /// Empty aggregator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge `measurement` (last observation of a kind wins).
    ///
    /// Reports [`Progress::Completed`] exactly once.
    pub fn observe(&mut self, measurement: Measurement) -> Progress {
        self.value.merge(measurement);

        if self.completed {
            Progress::AlreadyCompleted
        } else if self.value.is_complete() {
            self.completed = true;
            Progress::Completed
        } else {
            Progress::Pending
        }
    }

    /// Value merged so far.
    pub fn value(&self) -> Value {
        self.value
    }

    /// Receive until the value is complete, then cancel the producer.
    ///
    /// Returns `None` if the queue closes first. Stops consuming as soon as the
    /// value completes; anything the producer sends afterwards is left unread.
    pub async fn consume(
        mut self,
        receiver: &mut mpsc::Receiver<Measurement>,
        cancel: &CancellationToken,
    ) -> Option<Value> {
        while let Some(measurement) = receiver.recv().await {
            if self.observe(measurement) == Progress::Completed {
                debug!(value = ?self.value, "reading complete");
                cancel.cancel();
                return Some(self.value);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acquisition::QUEUE_CAPACITY;

    #[test]
    fn completes_once_on_second_kind() {
        let mut aggregator = OneshotAggregator::new();
        let progress = [
            aggregator.observe(Measurement::Co2(400)),
            aggregator.observe(Measurement::Temperature(21.5)),
            aggregator.observe(Measurement::Co2(410)),
        ];

        assert_eq!(
            progress,
            [Progress::Pending, Progress::Completed, Progress::AlreadyCompleted]
        );
        assert_eq!(
            aggregator.value(),
            Value {
                co2: Some(410),
                temp: Some(21.5)
            }
        );
    }

    #[test]
    fn repeated_kind_does_not_complete() {
        let mut aggregator = OneshotAggregator::new();
        assert_eq!(aggregator.observe(Measurement::Co2(400)), Progress::Pending);
        assert_eq!(aggregator.observe(Measurement::Co2(405)), Progress::Pending);
        assert_eq!(
            aggregator.observe(Measurement::Temperature(20.0)),
            Progress::Completed
        );
        assert_eq!(aggregator.value().co2, Some(405));
    }

    #[tokio::test]
    async fn consume_cancels_and_returns_on_completion() {
        let (tx, mut rx) = mpsc::channel(QUEUE_CAPACITY + 2);
        let cancel = CancellationToken::new();

        tx.send(Measurement::Temperature(19.0)).await.unwrap();
        tx.send(Measurement::Co2(555)).await.unwrap();
        tx.send(Measurement::Co2(999)).await.unwrap();

        let value = OneshotAggregator::new().consume(&mut rx, &cancel).await;

        assert_eq!(
            value,
            Some(Value {
                co2: Some(555),
                temp: Some(19.0)
            })
        );
        assert!(cancel.is_cancelled());
        // The trailing measurement was not consumed.
        assert_eq!(rx.recv().await, Some(Measurement::Co2(999)));
    }

    #[tokio::test]
    async fn consume_returns_none_when_queue_closes_early() {
        let (tx, mut rx) = mpsc::channel(QUEUE_CAPACITY);
        let cancel = CancellationToken::new();

        tx.send(Measurement::Co2(400)).await.unwrap();
        drop(tx);

        assert_eq!(OneshotAggregator::new().consume(&mut rx, &cancel).await, None);
        assert!(!cancel.is_cancelled());
    }
}
