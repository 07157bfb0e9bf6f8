//! Counts exercise repetitions from a stream of accelerometer samples.
//!
//! Samples pass a jerk gate and per-axis smoothing, are reduced to one scalar
//! signal (tilt angle from a calibrated pose, or one axis against an adaptive
//! baseline) and drive a cycle state machine that only counts cycles which
//! are both long enough and deep enough.

pub mod config;
pub mod detector;
pub mod error;
pub mod health_monitor;
pub mod live_status;
pub mod phase;
pub mod recording;
pub mod sensors;
pub mod session;
pub mod signal;
pub mod smoothing;
pub mod types;
pub mod workout;

pub use config::{ConfigOverrides, DetectorConfig, Strategy};
pub use detector::{DetectorEvent, DetectorStats, Observation, RepDetector};
pub use error::{RepCounterError, Result};
pub use phase::Phase;
pub use recording::{load_recording, SessionSummary};
pub use sensors::{MotionSource, PacedSource, ScriptedSource};
pub use session::{Session, SessionState};
pub use types::{Axis, MotionSample};
pub use workout::{Exercise, GoalEvent, GoalProgress, WorkoutGoal};
