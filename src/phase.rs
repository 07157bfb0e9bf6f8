//! Repetition phase state machine.
//!
//! `idle → descending → hold → ascending → idle`, driven only by the derived
//! scalar signal and sample timestamps. A cycle is counted when it returns
//! past the exit threshold with both enough duration and enough range.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::{CycleGates, Thresholds};

/// Position within one repetition cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Delta-angle only: reference orientation not captured yet
    Calibrating,
    Idle,
    Descending,
    Hold,
    Ascending,
}

impl Phase {
    pub fn label(self) -> &'static str {
        match self {
            Phase::Calibrating => "calibrating",
            Phase::Idle => "idle",
            Phase::Descending => "descending",
            Phase::Hold => "hold",
            Phase::Ascending => "ascending",
        }
    }

    /// True while a repetition is under way.
    pub fn in_cycle(self) -> bool {
        matches!(self, Phase::Descending | Phase::Hold | Phase::Ascending)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Sign of the signal while moving away from rest.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MotionDirection {
    /// Signal grows during the motion (tilt angle)
    Rising,
    /// Signal goes negative during the motion (axis deviation)
    Falling,
}

impl MotionDirection {
    /// Signal expressed so that larger always means further into the motion.
    pub fn progress(self, value: f64) -> f64 {
        match self {
            MotionDirection::Rising => value,
            MotionDirection::Falling => -value,
        }
    }

    /// `signal` is past `threshold` in the motion direction.
    pub fn beyond(self, signal: f64, threshold: f64) -> bool {
        self.progress(signal) > self.progress(threshold)
    }

    /// `signal` is past `threshold` in the return direction.
    pub fn returned(self, signal: f64, threshold: f64) -> bool {
        self.progress(signal) < self.progress(threshold)
    }
}

/// Why a completed cycle was not counted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    TooShort,
    TooShallow,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CycleStats {
    pub duration_ms: u64,
    pub range: f64,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CycleEvent {
    /// Fell back before reaching the deep zone
    Aborted,
    Counted(CycleStats),
    Rejected(CycleStats, RejectReason),
}

/// Result of feeding one signal value.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Step {
    pub from: Phase,
    pub to: Phase,
    pub cycle: Option<CycleEvent>,
}

impl Step {
    pub fn changed(&self) -> bool {
        self.from != self.to
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct CycleRange {
    min: f64,
    max: f64,
}

impl CycleRange {
    fn new(value: f64) -> Self {
        Self { min: value, max: value }
    }

    fn include(&mut self, value: f64) {
        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }

    fn span(&self) -> f64 {
        self.max - self.min
    }
}

pub struct PhaseMachine {
    direction: MotionDirection,
    thresholds: Thresholds,
    gates: CycleGates,
    phase: Phase,
    cycle_start_ms: u64,
    hold_start_ms: u64,
    range: Option<CycleRange>,
}

impl PhaseMachine {
    pub fn new(
        direction: MotionDirection,
        thresholds: Thresholds,
        gates: CycleGates,
        initial: Phase,
    ) -> Self {
        Self {
            direction,
            thresholds,
            gates,
            phase: initial,
            cycle_start_ms: 0,
            hold_start_ms: 0,
            range: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Leave `Calibrating`; no-op in any other phase.
    pub fn arm(&mut self) -> Step {
        let from = self.phase;
        if from == Phase::Calibrating {
            self.phase = Phase::Idle;
        }
        Step {
            from,
            to: self.phase,
            cycle: None,
        }
    }

    /// Return to `initial` and drop cycle bookkeeping.
    pub fn reset(&mut self, initial: Phase) {
        self.phase = initial;
        self.clear_cycle();
    }

    /// Advance with one smoothed signal value.
    pub fn step(&mut self, signal: f64, now_ms: u64) -> Step {
        let from = self.phase;
        let dir = self.direction;
        let th = self.thresholds;
        let mut cycle = None;

        match self.phase {
            Phase::Calibrating => {}
            Phase::Idle => {
                if dir.beyond(signal, th.enter) {
                    self.phase = Phase::Descending;
                    self.cycle_start_ms = now_ms;
                    self.range = Some(CycleRange::new(signal));
                }
            }
            Phase::Descending => {
                self.track(signal);
                if dir.beyond(signal, th.deep) {
                    self.phase = Phase::Hold;
                    self.hold_start_ms = now_ms;
                } else if dir.returned(signal, th.exit) {
                    self.phase = Phase::Idle;
                    self.clear_cycle();
                    cycle = Some(CycleEvent::Aborted);
                }
            }
            Phase::Hold => {
                self.track(signal);
                let held = now_ms.saturating_sub(self.hold_start_ms);
                if held >= self.gates.min_hold_ms && dir.returned(signal, th.recover) {
                    self.phase = Phase::Ascending;
                }
            }
            Phase::Ascending => {
                self.track(signal);
                if dir.returned(signal, th.exit) {
                    cycle = Some(self.evaluate(now_ms));
                    self.phase = Phase::Idle;
                    self.clear_cycle();
                } else if dir.beyond(signal, th.deep) {
                    self.phase = Phase::Descending;
                }
            }
        }

        Step {
            from,
            to: self.phase,
            cycle,
        }
    }

    fn track(&mut self, signal: f64) {
        match self.range.as_mut() {
            Some(range) => range.include(signal),
            None => self.range = Some(CycleRange::new(signal)),
        }
    }

    fn evaluate(&self, now_ms: u64) -> CycleEvent {
        let stats = CycleStats {
            duration_ms: now_ms.saturating_sub(self.cycle_start_ms),
            range: self.range.map(|r| r.span()).unwrap_or(0.0),
        };

        if stats.duration_ms < self.gates.min_cycle_ms {
            CycleEvent::Rejected(stats, RejectReason::TooShort)
        } else if stats.range < self.gates.min_range_delta {
            CycleEvent::Rejected(stats, RejectReason::TooShallow)
        } else {
            CycleEvent::Counted(stats)
        }
    }

    fn clear_cycle(&mut self) {
        self.cycle_start_ms = 0;
        self.hold_start_ms = 0;
        self.range = None;
    }
}
