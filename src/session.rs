use chrono::Utc;
use crossbeam::channel::{Receiver, TryRecvError};
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::config::{DetectorConfig, Strategy};
use crate::detector::{DetectorEvent, Observation, RepDetector};
use crate::error::{RepCounterError, Result};
use crate::health_monitor::SourceHealth;
use crate::phase::Phase;
use crate::recording::SessionSummary;
use crate::sensors::MotionSource;
use crate::types::MotionSample;

/// Session state machine states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    /// Created, never started
    Idle,
    /// Subscribed and counting
    Running,
    /// Unsubscribed; last count and phase retained
    Stopped,
}

/// Session metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionMetadata {
    pub session_id: String,
    pub start_time: String,
    pub state: SessionState,
    pub strategy: Option<Strategy>,
    pub samples_received: u64,
}

/// Called with every detector event and the observation after that sample.
pub type Listener = Box<dyn FnMut(&DetectorEvent, &Observation)>;

/// Counting session: owns the detector and the subscription to one motion source.
///
/// Single-threaded: samples are drained from the source's channel by
/// [`Session::poll`] or handed in directly with [`Session::push`].
pub struct Session<S: MotionSource> {
    source: S,
    detector: Option<RepDetector>,
    receiver: Option<Receiver<MotionSample>>,
    metadata: SessionMetadata,
    health: SourceHealth,
    listeners: Vec<Listener>,
    unavailable: bool,
    source_exhausted: bool,
}

impl<S: MotionSource> Session<S> {
    /// Create new session in Idle state
    pub fn new(source: S) -> Self {
        let health = SourceHealth::named(source.name());

        Session {
            source,
            detector: None,
            receiver: None,
            metadata: SessionMetadata {
                session_id: new_session_id(),
                start_time: Utc::now().to_rfc3339(),
                state: SessionState::Idle,
                strategy: None,
                samples_received: 0,
            },
            health,
            listeners: Vec::new(),
            unavailable: false,
            source_exhausted: false,
        }
    }

    /// Validate `config`, subscribe to the source and start counting from zero.
    ///
    /// An invalid config leaves any running subscription untouched. A running
    /// session is otherwise stopped first. On subscription failure the
    /// session stays stopped and reports itself unavailable.
    pub fn start(&mut self, config: DetectorConfig) -> Result<()> {
        let detector = RepDetector::new(config)?;

        if self.is_running() {
            info!("session {} restarting", self.metadata.session_id);
            self.stop()?;
        }

        let strategy = detector.config().strategy;
        self.source
            .set_update_interval(detector.config().sampling_interval_ms);

        let receiver = match self.source.subscribe() {
            Ok(rx) => rx,
            Err(e) => {
                if !self.unavailable {
                    warn!("motion source '{}' unavailable: {}", self.source.name(), e);
                }
                self.unavailable = true;
                return Err(e);
            }
        };

        self.detector = Some(detector);
        self.receiver = Some(receiver);
        self.unavailable = false;
        self.source_exhausted = false;
        self.health.restart();
        self.metadata = SessionMetadata {
            session_id: new_session_id(),
            start_time: Utc::now().to_rfc3339(),
            state: SessionState::Running,
            strategy: Some(strategy),
            samples_received: 0,
        };

        info!(
            "session {} started ({}, source '{}')",
            self.metadata.session_id,
            strategy,
            self.source.name()
        );
        Ok(())
    }

    /// Unsubscribe. Rep count and phase stay readable until `reset`.
    pub fn stop(&mut self) -> Result<()> {
        if !self.is_running() {
            return Err(RepCounterError::NotRunning);
        }

        self.source.unsubscribe();
        self.receiver = None;
        self.metadata.state = SessionState::Stopped;
        info!(
            "session {} stopped at {} reps",
            self.metadata.session_id,
            self.observation().rep_count
        );
        Ok(())
    }

    /// Zero the rep count and phase; the subscription is left alone.
    pub fn reset(&mut self) {
        if let Some(detector) = self.detector.as_mut() {
            detector.reset();
            info!("session {} reset", self.metadata.session_id);
        }
    }

    /// Process every sample currently waiting on the source channel.
    pub fn poll(&mut self) -> Result<Vec<DetectorEvent>> {
        if !self.is_running() {
            return Err(RepCounterError::NotRunning);
        }

        let mut pending = Vec::new();
        if let Some(rx) = self.receiver.as_ref() {
            loop {
                match rx.try_recv() {
                    Ok(sample) => pending.push(sample),
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        if !self.source_exhausted {
                            info!("motion source '{}' finished", self.source.name());
                        }
                        self.source_exhausted = true;
                        break;
                    }
                }
            }
        }

        let mut events = Vec::new();
        for sample in pending {
            events.extend(self.handle(sample));
        }

        if !self.source_exhausted {
            if let Some(silence) = self.health.check() {
                warn!(
                    "motion source '{}' silent for {:.1}s",
                    self.health.name,
                    silence.as_secs_f64()
                );
            }
        }

        Ok(events)
    }

    /// Deliver one sample directly (callback-style hosts). Ignored unless running.
    pub fn push(&mut self, sample: MotionSample) -> Vec<DetectorEvent> {
        if !self.is_running() {
            return Vec::new();
        }
        self.handle(sample)
    }

    fn handle(&mut self, sample: MotionSample) -> Vec<DetectorEvent> {
        let Some(detector) = self.detector.as_mut() else {
            return Vec::new();
        };

        self.health.update();
        self.metadata.samples_received += 1;

        let events = detector.process(&sample);
        if !events.is_empty() {
            let observation = detector.observation();
            for event in &events {
                for listener in self.listeners.iter_mut() {
                    listener(event, &observation);
                }
            }
        }
        events
    }

    pub fn on_event(&mut self, listener: impl FnMut(&DetectorEvent, &Observation) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Current outputs; zeroed before the first start.
    pub fn observation(&self) -> Observation {
        self.detector
            .as_ref()
            .map(RepDetector::observation)
            .unwrap_or(Observation {
                rep_count: 0,
                phase: Phase::Idle,
                signal_value: 0.0,
                calibrated: false,
            })
    }

    pub fn state(&self) -> SessionState {
        self.metadata.state
    }

    pub fn is_running(&self) -> bool {
        self.metadata.state == SessionState::Running
    }

    /// The last start failed to subscribe to the source.
    pub fn is_unavailable(&self) -> bool {
        self.unavailable
    }

    /// The source closed its channel; no more samples will arrive.
    pub fn is_source_exhausted(&self) -> bool {
        self.source_exhausted
    }

    pub fn is_source_silent(&self) -> bool {
        self.is_running() && !self.source_exhausted && self.health.is_silent()
    }

    pub fn health(&self) -> &SourceHealth {
        &self.health
    }

    pub fn metadata(&self) -> &SessionMetadata {
        &self.metadata
    }

    pub fn detector(&self) -> Option<&RepDetector> {
        self.detector.as_ref()
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary::new(&self.metadata, self.detector.as_ref(), self.unavailable)
    }
}

fn new_session_id() -> String {
    format!("session_{}", Utc::now().timestamp_millis())
}
