//! Motion sample sources.
//!
//! A source hands out a channel receiver on `subscribe` and stops delivering
//! on `unsubscribe`. The session drains the receiver from a single thread.

pub mod synthetic;

use crossbeam::channel::{self, Receiver, TrySendError};
use log::{debug, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::error::{RepCounterError, Result};
use crate::types::MotionSample;

/// Channel capacity for paced delivery; samples beyond it are dropped.
const CHANNEL_CAPACITY: usize = 500;

pub trait MotionSource {
    fn name(&self) -> &str;

    /// Requested delivery interval in milliseconds.
    fn set_update_interval(&mut self, interval_ms: u64);

    fn subscribe(&mut self) -> Result<Receiver<MotionSample>>;

    fn unsubscribe(&mut self);
}

/// Delivers a fixed list of samples immediately, keeping their timestamps.
pub struct ScriptedSource {
    samples: Vec<MotionSample>,
    interval_ms: u64,
    failure: Option<String>,
}

impl ScriptedSource {
    pub fn new(samples: Vec<MotionSample>) -> Self {
        Self {
            samples,
            interval_ms: 60,
            failure: None,
        }
    }

    /// A source whose subscription always fails.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            samples: Vec::new(),
            interval_ms: 60,
            failure: Some(reason.into()),
        }
    }

    pub fn interval_ms(&self) -> u64 {
        self.interval_ms
    }
}

impl MotionSource for ScriptedSource {
    fn name(&self) -> &str {
        "scripted"
    }

    fn set_update_interval(&mut self, interval_ms: u64) {
        self.interval_ms = interval_ms;
    }

    fn subscribe(&mut self) -> Result<Receiver<MotionSample>> {
        if let Some(reason) = &self.failure {
            return Err(RepCounterError::SourceUnavailable(reason.clone()));
        }

        let (tx, rx) = channel::unbounded();
        for sample in &self.samples {
            // Receiver is alive in this scope, send cannot fail
            let _ = tx.send(*sample);
        }
        Ok(rx)
    }

    fn unsubscribe(&mut self) {}
}

/// Replays samples from a background thread, one per update interval.
///
/// With `restamp`, each sample gets its arrival time (ms since subscribe)
/// instead of its recorded timestamp.
pub struct PacedSource {
    samples: Arc<Vec<MotionSample>>,
    interval_ms: u64,
    restamp: bool,
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<u64>>,
}

impl PacedSource {
    pub fn new(samples: Vec<MotionSample>, interval_ms: u64) -> Self {
        Self {
            samples: Arc::new(samples),
            interval_ms,
            restamp: false,
            running: Arc::new(AtomicBool::new(false)),
            handle: None,
        }
    }

    pub fn with_restamp(mut self, restamp: bool) -> Self {
        self.restamp = restamp;
        self
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

impl MotionSource for PacedSource {
    fn name(&self) -> &str {
        "paced"
    }

    fn set_update_interval(&mut self, interval_ms: u64) {
        self.interval_ms = interval_ms;
    }

    fn subscribe(&mut self) -> Result<Receiver<MotionSample>> {
        self.unsubscribe();

        let (tx, rx) = channel::bounded(CHANNEL_CAPACITY);
        let samples = Arc::clone(&self.samples);
        let running = Arc::clone(&self.running);
        let interval = Duration::from_millis(self.interval_ms.max(1));
        let restamp = self.restamp;

        running.store(true, Ordering::SeqCst);
        let handle = thread::Builder::new()
            .name("motion-source".to_string())
            .spawn(move || {
                let start = Instant::now();
                let mut sent = 0u64;

                for sample in samples.iter() {
                    if !running.load(Ordering::SeqCst) {
                        break;
                    }
                    let mut sample = *sample;
                    if restamp {
                        sample.t = start.elapsed().as_millis() as u64;
                    }

                    match tx.try_send(sample) {
                        Ok(()) => {
                            sent += 1;
                            if sent % 100 == 0 {
                                debug!("[source] {} samples", sent);
                            }
                        }
                        Err(TrySendError::Disconnected(_)) => {
                            debug!("[source] channel closed after {} samples", sent);
                            break;
                        }
                        Err(TrySendError::Full(_)) => {
                            // Consumer fell behind, drop this sample
                        }
                    }
                    thread::sleep(interval);
                }

                running.store(false, Ordering::SeqCst);
                sent
            })
            .map_err(|e| RepCounterError::SourceUnavailable(format!("failed to spawn source thread: {e}")))?;

        self.handle = Some(handle);
        Ok(rx)
    }

    fn unsubscribe(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            match handle.join() {
                Ok(sent) => debug!("[source] stopped after {} samples", sent),
                Err(_) => warn!("[source] delivery thread panicked"),
            }
        }
    }
}

impl Drop for PacedSource {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn samples(n: u64) -> Vec<MotionSample> {
        (0..n).map(|i| MotionSample::new(0.0, 1.0, 0.0, i * 60)).collect()
    }

    #[test]
    fn test_scripted_source_delivers_everything() {
        let mut source = ScriptedSource::new(samples(5));
        source.set_update_interval(20);
        assert_eq!(source.interval_ms(), 20);

        let rx = source.subscribe().unwrap();
        let got: Vec<_> = rx.try_iter().collect();
        assert_eq!(got.len(), 5);
        assert_eq!(got[4].t, 240);
    }

    #[test]
    fn test_unavailable_source() {
        let mut source = ScriptedSource::unavailable("no accelerometer");
        let err = source.subscribe().unwrap_err();
        assert!(err.is_unavailable());
    }

    #[test]
    fn test_paced_source_delivers_in_order_and_finishes() {
        let mut source = PacedSource::new(samples(4), 1);
        let rx = source.subscribe().unwrap();
        let got: Vec<_> = rx.iter().collect();
        assert_eq!(got.iter().map(|s| s.t).collect::<Vec<_>>(), vec![0, 60, 120, 180]);
        assert!(!source.is_running());
    }

    #[test]
    fn test_paced_source_unsubscribe_stops_delivery() {
        let mut source = PacedSource::new(samples(1_000), 5);
        let rx = source.subscribe().unwrap();
        let first = rx.recv().unwrap();
        assert_eq!(first.t, 0);

        source.unsubscribe();
        assert!(!source.is_running());
        let remaining = rx.try_iter().count();
        assert!(remaining < 999);
    }

    #[test]
    fn test_restamp_uses_arrival_time() {
        let mut source = PacedSource::new(vec![MotionSample::new(0.0, 1.0, 0.0, 99_999); 2], 1)
            .with_restamp(true);
        let rx = source.subscribe().unwrap();
        let got: Vec<_> = rx.iter().collect();
        assert_eq!(got.len(), 2);
        assert!(got.iter().all(|s| s.t < 99_999));
    }
}
