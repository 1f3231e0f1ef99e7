//! Acquisition loop: owns the device, polls it and feeds decoded measurements
//! into a single-slot queue.
//!
//! ```text
//!   Idle ──open + key report──▶ Polling ──cancel / consumer gone / error──▶ Stopped
//! ```
//!
//! The loop is blocking and runs on a `spawn_blocking` thread. Each iteration:
//!
//! 1. checks the [`CancellationToken`] (the only place cancellation is observed)
//! 2. reads one report with the configured timeout; a timeout or a failed read
//!    simply starts the next iteration
//! 3. descrambles and parses the report and, if it carried a measurement, pushes
//!    it with `blocking_send`. The queue holds one entry, so a slow consumer
//!    stalls the loop instead of losing data.
//!
//! The device handle lives on the loop's stack frame, so it is closed on every
//! exit path: normal stop, error or panic.

pub mod cancel;

pub use cancel::CancellationToken;

use crate::codec::ReportCodec;
use crate::error::AppResult;
use crate::hardware::{ReportHandle, Transport};
use crate::measurement::{Measurement, MeasurementParser};
use crate::protocol::{DeviceKey, ProtocolConfig, REPORT_LEN};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, info_span, trace};

/// Capacity of the queue between the loop and its consumer.
pub const QUEUE_CAPACITY: usize = 1;

/// Feature report id used for the key report.
const KEY_REPORT_ID: u8 = 0x00;

/// Lifecycle of an [`AcquisitionLoop`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// Created, device not yet opened
    Idle,
    /// Device open and primed, reading reports
    Polling,
    /// Terminal; device closed
    Stopped,
}

/// Counters reported when the loop stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopSummary {
    /// Reads attempted
    pub polls: u64,
    /// Measurements handed to the consumer
    pub measurements: u64,
    /// Reads that failed and were skipped
    pub read_errors: u64,
}

/// Producer half of the acquisition pipeline.
pub struct AcquisitionLoop<T: Transport> {
    transport: T,
    key: DeviceKey,
    codec: ReportCodec,
    parser: MeasurementParser,
    read_timeout: Duration,
    state: LoopState,
}

impl<T: Transport> AcquisitionLoop<T> {
    /// Create an idle loop for `transport`.
    pub fn new(transport: T, protocol: &ProtocolConfig) -> Self {
        Self {
            transport,
            key: protocol.key,
            codec: ReportCodec::new(protocol.key),
            parser: MeasurementParser::new(protocol),
            read_timeout: protocol.read_timeout,
            state: LoopState::Idle,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Open the device and poll until cancelled or the consumer goes away.
    ///
    /// Blocking; call from `spawn_blocking` or a dedicated thread.
    ///
    /// # Errors
    /// - `TransportOpen` if the device cannot be opened
    /// - `DevicePrime` if the key report is rejected
    ///
    /// Read failures are never returned; they are counted in the summary.
    pub fn run(
        mut self,
        sender: mpsc::Sender<Measurement>,
        cancel: &CancellationToken,
    ) -> AppResult<LoopSummary> {
        let span = info_span!("acquisition", device = %self.transport.describe());
        let _enter = span.enter();

        let result = self.poll_until_stopped(&sender, cancel);
        self.transition(LoopState::Stopped);

        match &result {
            Ok(summary) => info!(
                polls = summary.polls,
                measurements = summary.measurements,
                read_errors = summary.read_errors,
                "acquisition stopped"
            ),
            Err(err) => debug!(error = %err, "acquisition aborted"),
        }
        result
    }

    fn poll_until_stopped(
        &mut self,
        sender: &mpsc::Sender<Measurement>,
        cancel: &CancellationToken,
    ) -> AppResult<LoopSummary> {
        let mut handle = self.transport.open()?;
        handle.send_feature_report(&self.key_report())?;
        self.transition(LoopState::Polling);

        let mut summary = LoopSummary::default();
        let mut buf = [0u8; REPORT_LEN];

        while !cancel.is_cancelled() {
            summary.polls += 1;

            let len = match handle.read_timeout(&mut buf, self.read_timeout) {
                Ok(0) => continue,
                Ok(len) => len,
                Err(err) if !err.is_fatal() => {
                    summary.read_errors += 1;
                    debug!(error = %err, "read failed, polling again");
                    continue;
                }
                Err(err) => return Err(err),
            };

            let decoded = self.codec.descramble(&buf[..len]);
            let Some(measurement) = self.parser.parse(&decoded) else {
                continue;
            };

            trace!(kind = measurement.kind(), ?measurement, "decoded");
            if sender.blocking_send(measurement).is_err() {
                debug!("consumer closed the queue");
                break;
            }
            summary.measurements += 1;
        }

        Ok(summary)
    }

    // Report id followed by the raw key bytes; the key is not transformed.
    fn key_report(&self) -> [u8; REPORT_LEN + 1] {
        let mut report = [KEY_REPORT_ID; REPORT_LEN + 1];
        report[1..].copy_from_slice(self.key.as_bytes());
        report
    }

    fn transition(&mut self, next: LoopState) {
        trace!(from = ?self.state, to = ?next, "state change");
        self.state = next;
    }
}

/// Spawn `acquisition` on the blocking pool, returning the queue receiver.
pub fn spawn<T: Transport>(
    acquisition: AcquisitionLoop<T>,
    cancel: CancellationToken,
) -> (
    mpsc::Receiver<Measurement>,
    tokio::task::JoinHandle<AppResult<LoopSummary>>,
) {
    let (tx, rx) = mpsc::channel(QUEUE_CAPACITY);
    let task = tokio::task::spawn_blocking(move || acquisition.run(tx, &cancel));
    (rx, task)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MonitorError;
    use crate::hardware::{MockRead, MockTransport};
    use crate::protocol::{DEFAULT_KEY, TEMPERATURE_OPCODE};

    fn protocol() -> ProtocolConfig {
        ProtocolConfig {
            read_timeout: Duration::from_millis(20),
            ..ProtocolConfig::default()
        }
    }

    fn codec() -> ReportCodec {
        ReportCodec::new(DeviceKey::default())
    }

    #[test]
    fn new_loop_is_idle() {
        let acquisition = AcquisitionLoop::new(MockTransport::new(vec![]), &protocol());
        assert_eq!(acquisition.state(), LoopState::Idle);
    }

    #[tokio::test]
    async fn primes_device_with_raw_key() {
        let device = MockTransport::new(vec![]);
        let cancel = CancellationToken::new();
        let (_rx, task) = spawn(AcquisitionLoop::new(device.clone(), &protocol()), cancel.clone());

        tokio::time::sleep(Duration::from_millis(30)).await;
        cancel.cancel();
        task.await.unwrap().unwrap();

        let mut expected = vec![0x00];
        expected.extend_from_slice(&DEFAULT_KEY);
        assert_eq!(device.feature_reports(), vec![expected]);
        assert_eq!(device.closes(), 1);
    }

    #[tokio::test]
    async fn skips_timeouts_errors_and_unknown_reports() {
        let codec = codec();
        let device = MockTransport::new(vec![
            MockRead::Timeout,
            MockRead::Error("EIO".into()),
            MockRead::encoded(&codec, 0x6d, 1234),
            MockRead::Report(vec![0x01, 0x02, 0x03]),
            MockRead::co2(&codec, 400),
            MockRead::encoded(&codec, TEMPERATURE_OPCODE, 4714),
        ]);
        let cancel = CancellationToken::new();
        let (mut rx, task) = spawn(AcquisitionLoop::new(device.clone(), &protocol()), cancel.clone());

        assert_eq!(rx.recv().await, Some(Measurement::Co2(400)));
        assert_eq!(
            rx.recv().await,
            Some(Measurement::Temperature(4714.0 / 16.0 - 273.15))
        );

        cancel.cancel();
        let summary = task.await.unwrap().unwrap();
        assert_eq!(summary.measurements, 2);
        assert_eq!(summary.read_errors, 1);
        assert!(summary.polls >= 6);
        assert_eq!(device.closes(), 1);
    }

    #[tokio::test]
    async fn full_queue_blocks_producer() {
        let codec = codec();
        let device = MockTransport::new(vec![
            MockRead::co2(&codec, 500),
            MockRead::co2(&codec, 501),
            MockRead::co2(&codec, 502),
            MockRead::co2(&codec, 503),
        ]);
        let cancel = CancellationToken::new();
        let (mut rx, task) = spawn(AcquisitionLoop::new(device.clone(), &protocol()), cancel.clone());

        // One value sits in the queue, the next send is parked.
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(device.polls(), 2);
        assert_eq!(device.remaining(), 2);

        // Draining delivers everything in order; nothing was dropped.
        for ppm in 500..=503 {
            assert_eq!(rx.recv().await, Some(Measurement::Co2(ppm)));
        }

        cancel.cancel();
        task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn stops_when_consumer_drops_queue() {
        let codec = codec();
        let device = MockTransport::new(vec![
            MockRead::co2(&codec, 600),
            MockRead::co2(&codec, 601),
            MockRead::co2(&codec, 602),
        ]);
        let cancel = CancellationToken::new();
        let (rx, task) = spawn(AcquisitionLoop::new(device.clone(), &protocol()), cancel);
        drop(rx);

        let summary = tokio::time::timeout(Duration::from_secs(2), task)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(summary.measurements, 0);
        assert_eq!(device.closes(), 1);
    }

    #[tokio::test]
    async fn open_failure_is_fatal_and_never_polls() {
        let device = MockTransport::failing_open("permission denied");
        let (mut rx, task) = spawn(
            AcquisitionLoop::new(device.clone(), &protocol()),
            CancellationToken::new(),
        );

        assert_eq!(rx.recv().await, None);
        let err = task.await.unwrap().unwrap_err();
        assert!(matches!(err, MonitorError::TransportOpen(_)));
        assert_eq!(device.polls(), 0);
    }

    #[tokio::test]
    async fn prime_failure_closes_device() {
        let device = MockTransport::failing_prime("stall");
        let (_rx, task) = spawn(
            AcquisitionLoop::new(device.clone(), &protocol()),
            CancellationToken::new(),
        );

        let err = task.await.unwrap().unwrap_err();
        assert!(matches!(err, MonitorError::DevicePrime(_)));
        assert_eq!(device.opens(), 1);
        assert_eq!(device.closes(), 1);
        assert_eq!(device.polls(), 0);
    }

    #[test]
    fn cancelled_before_start_does_not_poll() {
        let device = MockTransport::new(vec![MockRead::co2(&codec(), 700)]);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let (tx, _rx) = mpsc::channel(QUEUE_CAPACITY);
        let summary = AcquisitionLoop::new(device.clone(), &protocol())
            .run(tx, &cancel)
            .unwrap();

        assert_eq!(summary, LoopSummary::default());
        assert_eq!(device.opens(), 1);
        assert_eq!(device.closes(), 1);
    }
}
