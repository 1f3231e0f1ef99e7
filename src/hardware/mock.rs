//! Mock Hardware Implementations
//!
//! Provides a scripted CO2 monitor for testing without physical hardware.
//!
//! [`MockTransport`] replays a queue of [`MockRead`] steps: scrambled reports,
//! timeouts and transient read failures. It records the key report written at
//! start-up and counts opens, closes and polls, so tests can assert on the
//! acquisition loop's resource handling. Clones share the same state.
//!
//! # Example
//!
//! ```rust,ignore
//! let device = MockTransport::new(vec![
//!     MockRead::co2(&codec, 400),
//!     MockRead::Timeout,
//!     MockRead::temperature(&codec, 21.5),
//! ]);
//! ```

use crate::codec::ReportCodec;
use crate::error::{AppResult, MonitorError};
use crate::hardware::transport::{ReportHandle, Transport};
use crate::protocol::{ProtocolConfig, CO2_OPCODE, TEMPERATURE_OPCODE};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// One scripted poll result.
#[derive(Debug, Clone, PartialEq)]
pub enum MockRead {
    /// Deliver these raw bytes
    Report(Vec<u8>),
    /// Behave like an elapsed read timeout
    Timeout,
    /// Fail the read
    Error(String),
}

impl MockRead {
    /// Scrambled report with `opcode` and `magnitude`, checksum and terminator included.
    pub fn encoded(codec: &ReportCodec, opcode: u8, magnitude: u16) -> Self {
        let [high, low] = magnitude.to_be_bytes();
        let checksum = opcode.wrapping_add(high).wrapping_add(low);
        let plain = [opcode, high, low, checksum, 0x0d, 0x00, 0x00, 0x00];
        MockRead::Report(codec.scramble(&plain))
    }

    /// Scrambled CO2 report.
    pub fn co2(codec: &ReportCodec, ppm: u16) -> Self {
        Self::encoded(codec, CO2_OPCODE, ppm)
    }

    /// Scrambled temperature report, rounded to the device's 1/16 K resolution.
    pub fn temperature(codec: &ReportCodec, celsius: f64) -> Self {
        let sixteenths = ((celsius + 273.15) * 16.0).round().clamp(0.0, f64::from(u16::MAX));
        Self::encoded(codec, TEMPERATURE_OPCODE, sixteenths as u16)
    }
}

#[derive(Debug, Default)]
struct MockState {
    script: Mutex<VecDeque<MockRead>>,
    cycle: Vec<MockRead>,
    feature_reports: Mutex<Vec<Vec<u8>>>,
    opens: AtomicUsize,
    closes: AtomicUsize,
    polls: AtomicUsize,
    fail_open: Option<String>,
    fail_prime: Option<String>,
    read_delay: Duration,
}

/// Scripted in-process CO2 monitor.
#[derive(Debug, Clone)]
pub struct MockTransport {
    state: Arc<MockState>,
}

impl MockTransport {
    /// Device that plays `script` once and then only times out.
    pub fn new(script: Vec<MockRead>) -> Self {
        Self::build(MockState {
            script: Mutex::new(script.into()),
            read_delay: Duration::from_millis(5),
            ..MockState::default()
        })
    }

    /// Device that replays `script` forever, waiting `read_delay` before every read.
    pub fn looping(script: Vec<MockRead>, read_delay: Duration) -> Self {
        Self::build(MockState {
            script: Mutex::new(script.clone().into()),
            cycle: script,
            read_delay,
            ..MockState::default()
        })
    }

    /// Device that cannot be opened.
    pub fn failing_open(reason: impl Into<String>) -> Self {
        Self::build(MockState {
            fail_open: Some(reason.into()),
            ..MockState::default()
        })
    }

    /// Device that rejects the key report.
    pub fn failing_prime(reason: impl Into<String>) -> Self {
        Self::build(MockState {
            fail_prime: Some(reason.into()),
            ..MockState::default()
        })
    }

    /// Simulated monitor used by `--simulate`: a slow drift of plausible readings
    /// interleaved with the unrelated reports a real device also emits.
    pub fn simulated(protocol: &ProtocolConfig) -> Self {
        let codec = ReportCodec::new(protocol.key);
        let mut script = Vec::new();
        for step in 0u16..12 {
            script.push(MockRead::encoded(&codec, protocol.co2_opcode, 640 + step * 3));
            script.push(MockRead::encoded(&codec, 0x6d, 0x0a5c));
            script.push(MockRead::temperature(&codec, 22.0 + f64::from(step) * 0.125));
            script.push(MockRead::Timeout);
        }
        Self::looping(script, Duration::from_millis(250))
    }

    fn build(state: MockState) -> Self {
        Self {
            state: Arc::new(state),
        }
    }

    /// Number of successful opens.
    pub fn opens(&self) -> usize {
        self.state.opens.load(Ordering::SeqCst)
    }

    /// Number of handles dropped.
    pub fn closes(&self) -> usize {
        self.state.closes.load(Ordering::SeqCst)
    }

    /// Number of reads attempted.
    pub fn polls(&self) -> usize {
        self.state.polls.load(Ordering::SeqCst)
    }

    /// Feature reports written so far.
    pub fn feature_reports(&self) -> Vec<Vec<u8>> {
        self.state
            .feature_reports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Scripted steps not yet consumed.
    pub fn remaining(&self) -> usize {
        self.state
            .script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl Transport for MockTransport {
    type Handle = MockHandle;

    fn describe(&self) -> String {
        "simulated CO2 monitor".to_string()
    }

    fn open(&self) -> AppResult<MockHandle> {
        if let Some(reason) = &self.state.fail_open {
            return Err(MonitorError::TransportOpen(reason.clone()));
        }
        self.state.opens.fetch_add(1, Ordering::SeqCst);
        Ok(MockHandle {
            state: Arc::clone(&self.state),
        })
    }
}

/// Open handle onto a [`MockTransport`].
#[derive(Debug)]
pub struct MockHandle {
    state: Arc<MockState>,
}

impl ReportHandle for MockHandle {
    fn send_feature_report(&mut self, data: &[u8]) -> AppResult<()> {
        if let Some(reason) = &self.state.fail_prime {
            return Err(MonitorError::DevicePrime(reason.clone()));
        }
        self.state
            .feature_reports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(data.to_vec());
        Ok(())
    }

    fn read_timeout(&mut self, buf: &mut [u8], timeout: Duration) -> AppResult<usize> {
        self.state.polls.fetch_add(1, Ordering::SeqCst);
        std::thread::sleep(self.state.read_delay.min(timeout));

        let step = {
            let mut script = self
                .state
                .script
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if script.is_empty() {
                script.extend(self.state.cycle.iter().cloned());
            }
            script.pop_front()
        };

        match step {
            Some(MockRead::Report(bytes)) => {
                let n = bytes.len().min(buf.len());
                buf[..n].copy_from_slice(&bytes[..n]);
                Ok(n)
            }
            Some(MockRead::Error(reason)) => Err(MonitorError::TransportRead(reason)),
            Some(MockRead::Timeout) | None => Ok(0),
        }
    }
}

impl Drop for MockHandle {
    fn drop(&mut self) {
        self.state.closes.fetch_add(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::measurement::{Measurement, MeasurementParser};

    #[test]
    fn encoded_reports_decode_back() {
        let codec = ReportCodec::new(Default::default());
        let parser = MeasurementParser::default();

        let MockRead::Report(raw) = MockRead::co2(&codec, 654) else {
            panic!("expected report");
        };
        assert_eq!(parser.parse(&codec.descramble(&raw)), Some(Measurement::Co2(654)));

        let MockRead::Report(raw) = MockRead::temperature(&codec, 21.5) else {
            panic!("expected report");
        };
        match parser.parse(&codec.descramble(&raw)) {
            Some(Measurement::Temperature(t)) => assert!((t - 21.5).abs() < 1.0 / 16.0),
            other => panic!("unexpected parse result {:?}", other),
        }
    }

    #[test]
    fn handle_tracks_open_and_close() {
        let device = MockTransport::new(vec![MockRead::Timeout]);
        {
            let mut handle = device.open().unwrap();
            handle.send_feature_report(&[0, 1, 2]).unwrap();
            let mut buf = [0u8; 8];
            assert_eq!(handle.read_timeout(&mut buf, Duration::from_millis(1)).unwrap(), 0);
            assert_eq!(device.opens(), 1);
            assert_eq!(device.closes(), 0);
        }
        assert_eq!(device.closes(), 1);
        assert_eq!(device.polls(), 1);
        assert_eq!(device.feature_reports(), vec![vec![0, 1, 2]]);
    }

    #[test]
    fn looping_device_repeats_script() {
        let device = MockTransport::looping(
            vec![MockRead::Report(vec![1; 8]), MockRead::Timeout],
            Duration::ZERO,
        );
        let mut handle = device.open().unwrap();
        let mut buf = [0u8; 8];
        let reads: Vec<usize> = (0..5)
            .map(|_| handle.read_timeout(&mut buf, Duration::ZERO).unwrap())
            .collect();
        assert_eq!(reads, vec![8, 0, 8, 0, 8]);
    }

    #[test]
    fn failures_are_reported() {
        assert!(matches!(
            MockTransport::failing_open("gone").open(),
            Err(MonitorError::TransportOpen(_))
        ));

        let mut handle = MockTransport::failing_prime("stall").open().unwrap();
        assert!(matches!(
            handle.send_feature_report(&[0]),
            Err(MonitorError::DevicePrime(_))
        ));

        let mut handle = MockTransport::new(vec![MockRead::Error("EIO".into())])
            .open()
            .unwrap();
        let mut buf = [0u8; 8];
        assert!(matches!(
            handle.read_timeout(&mut buf, Duration::ZERO),
            Err(MonitorError::TransportRead(_))
        ));
    }
}
