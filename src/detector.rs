//! Repetition detector: sample filter → signal strategy → phase machine.
//!
//! A pure reducer over the sample stream. `process` never fails; rejected
//! samples and rejected cycles only show up as events.

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::config::DetectorConfig;
use crate::error::Result;
use crate::phase::{CycleEvent, Phase, PhaseMachine, RejectReason};
use crate::signal::SignalStrategy;
use crate::smoothing::{FilterOutcome, SampleFilter};
use crate::types::{MotionSample, Vec3};

/// Observable outputs, refreshed after every accepted sample.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Observation {
    pub rep_count: u32,
    pub phase: Phase,
    pub signal_value: f64,
    pub calibrated: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DetectorEvent {
    SampleRejected {
        t_ms: u64,
        jerk: f64,
    },
    Calibrated {
        t_ms: u64,
    },
    PhaseChanged {
        t_ms: u64,
        from: Phase,
        to: Phase,
        signal: f64,
    },
    RepCounted {
        t_ms: u64,
        rep_count: u32,
        duration_ms: u64,
        range: f64,
    },
    CycleRejected {
        t_ms: u64,
        reason: RejectReason,
        duration_ms: u64,
        range: f64,
    },
    CycleAborted {
        t_ms: u64,
    },
}

/// Running totals for diagnostics and session summaries.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectorStats {
    pub accepted_samples: u64,
    pub rejected_samples: u64,
    pub rejected_cycles: u64,
    pub aborted_cycles: u64,
}

pub struct RepDetector {
    config: DetectorConfig,
    filter: SampleFilter,
    signal: SignalStrategy,
    machine: PhaseMachine,
    rep_count: u32,
    signal_value: f64,
    stats: DetectorStats,
}

impl RepDetector {
    pub fn new(config: DetectorConfig) -> Result<Self> {
        config.validate()?;

        let signal = SignalStrategy::from_config(&config);
        let initial = initial_phase(&signal);
        let machine = PhaseMachine::new(
            config.strategy.direction(),
            config.thresholds(),
            config.gates(),
            initial,
        );

        Ok(Self {
            filter: SampleFilter::new(config.smoothing_alpha, config.max_jerk),
            signal,
            machine,
            rep_count: 0,
            signal_value: 0.0,
            stats: DetectorStats::default(),
            config,
        })
    }

    /// Feed one sample, returning what happened in delivery order.
    pub fn process(&mut self, sample: &MotionSample) -> Vec<DetectorEvent> {
        let t_ms = sample.t;
        let mut events = Vec::new();

        let smoothed = match self.filter.apply(sample.vector()) {
            FilterOutcome::Rejected { jerk } => {
                self.stats.rejected_samples += 1;
                debug!("t={t_ms}ms sample rejected, jerk {jerk:.3} > {}", self.config.max_jerk);
                events.push(DetectorEvent::SampleRejected { t_ms, jerk });
                return events;
            }
            FilterOutcome::Initialized(v) => {
                self.stats.accepted_samples += 1;
                self.signal.seed(&v, t_ms);
                if self.signal.is_calibrated() {
                    self.on_calibrated(t_ms, &mut events);
                }
                return events;
            }
            FilterOutcome::Smoothed(v) => v,
        };
        self.stats.accepted_samples += 1;

        let was_calibrated = self.signal.is_calibrated();
        let Some(value) = self.signal.derive(&smoothed, t_ms, self.machine.phase()) else {
            return events;
        };
        if !was_calibrated {
            self.on_calibrated(t_ms, &mut events);
        }
        self.signal_value = value;

        let step = self.machine.step(value, t_ms);
        if step.changed() {
            debug!("t={t_ms}ms phase {} -> {} (signal {value:.3})", step.from, step.to);
            events.push(DetectorEvent::PhaseChanged {
                t_ms,
                from: step.from,
                to: step.to,
                signal: value,
            });
        }

        match step.cycle {
            Some(CycleEvent::Counted(stats)) => {
                self.rep_count += 1;
                info!(
                    "rep {} counted ({} ms, range {:.3})",
                    self.rep_count, stats.duration_ms, stats.range
                );
                events.push(DetectorEvent::RepCounted {
                    t_ms,
                    rep_count: self.rep_count,
                    duration_ms: stats.duration_ms,
                    range: stats.range,
                });
            }
            Some(CycleEvent::Rejected(stats, reason)) => {
                self.stats.rejected_cycles += 1;
                debug!(
                    "t={t_ms}ms cycle rejected: {reason:?} ({} ms, range {:.3})",
                    stats.duration_ms, stats.range
                );
                events.push(DetectorEvent::CycleRejected {
                    t_ms,
                    reason,
                    duration_ms: stats.duration_ms,
                    range: stats.range,
                });
            }
            Some(CycleEvent::Aborted) => {
                self.stats.aborted_cycles += 1;
                events.push(DetectorEvent::CycleAborted { t_ms });
            }
            None => {}
        }

        events
    }

    fn on_calibrated(&mut self, t_ms: u64, events: &mut Vec<DetectorEvent>) {
        let step = self.machine.arm();
        if !step.changed() {
            return;
        }
        debug!("t={t_ms}ms calibration complete, reference frozen");
        events.push(DetectorEvent::Calibrated { t_ms });
        events.push(DetectorEvent::PhaseChanged {
            t_ms,
            from: step.from,
            to: step.to,
            signal: 0.0,
        });
    }

    /// Zero the rep count and phase. Smoothing, baseline and calibration are kept.
    ///
    /// The phase returns to `Idle`, except for a delta-angle detector whose
    /// reference is not captured yet: that one stays `Calibrating`.
    pub fn reset(&mut self) {
        self.rep_count = 0;
        self.machine.reset(initial_phase(&self.signal));
    }

    pub fn observation(&self) -> Observation {
        Observation {
            rep_count: self.rep_count,
            phase: self.machine.phase(),
            signal_value: self.signal_value,
            calibrated: self.signal.is_calibrated(),
        }
    }

    pub fn rep_count(&self) -> u32 {
        self.rep_count
    }

    pub fn phase(&self) -> Phase {
        self.machine.phase()
    }

    pub fn signal_value(&self) -> f64 {
        self.signal_value
    }

    pub fn is_calibrated(&self) -> bool {
        self.signal.is_calibrated()
    }

    pub fn smoothed(&self) -> Option<Vec3> {
        self.filter.smoothed()
    }

    /// Delta-angle reference vector; `None` until calibrated or for axis-deviation.
    pub fn reference(&self) -> Option<Vec3> {
        self.signal.reference()
    }

    /// Axis-deviation baseline; `None` for delta-angle.
    pub fn baseline(&self) -> Option<f64> {
        self.signal.baseline()
    }

    pub fn stats(&self) -> DetectorStats {
        self.stats
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }
}

fn initial_phase(signal: &SignalStrategy) -> Phase {
    if signal.is_calibrated() {
        Phase::Idle
    } else {
        Phase::Calibrating
    }
}
