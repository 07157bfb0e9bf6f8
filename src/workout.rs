//! Exercises with tuned presets, and a rep target to work towards.

use log::info;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::config::{DetectorConfig, Strategy};

/// Default number of reps in a set.
pub const DEFAULT_TARGET: u32 = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Exercise {
    /// Phone upright against the thigh, axis-deviation on y
    Squat,
    /// Phone on the chest, delta-angle from the lying position
    SitUp,
}

impl Exercise {
    pub fn preset(self) -> DetectorConfig {
        match self {
            Exercise::Squat => DetectorConfig::squat(),
            Exercise::SitUp => DetectorConfig::sit_up(),
        }
    }

    pub fn strategy(self) -> Strategy {
        self.preset().strategy
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Exercise::Squat => "squat",
            Exercise::SitUp => "sit-up",
        }
    }
}

impl fmt::Display for Exercise {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Exercise {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "squat" | "squats" => Ok(Exercise::Squat),
            "situp" | "sit-up" | "sit_up" | "situps" | "sit-ups" => Ok(Exercise::SitUp),
            other => Err(format!("unknown exercise '{other}' (expected squat or sit-up)")),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum GoalEvent {
    TargetReached { reps: u32, target: u32 },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoalProgress {
    pub reps: u32,
    pub target: u32,
    pub remaining: u32,
    pub completed: bool,
}

/// Tracks a rep count against a target. Reports completion once per set.
#[derive(Clone, Debug)]
pub struct WorkoutGoal {
    pub exercise: Exercise,
    pub target: u32,
    /// Ask the owner to zero the counter once the target is reached.
    pub reset_on_complete: bool,
    reached: bool,
}

impl WorkoutGoal {
    pub fn new(exercise: Exercise, target: u32) -> Self {
        Self {
            exercise,
            target: target.max(1),
            reset_on_complete: false,
            reached: false,
        }
    }

    pub fn with_reset_on_complete(mut self, reset: bool) -> Self {
        self.reset_on_complete = reset;
        self
    }

    /// Feed the latest rep count. Returns `TargetReached` the first time
    /// `reps` meets the target; `None` afterwards until [`rearm`](Self::rearm).
    pub fn observe(&mut self, reps: u32) -> Option<GoalEvent> {
        if self.reached || reps < self.target {
            return None;
        }
        self.reached = true;
        info!("{} target reached: {}/{}", self.exercise, reps, self.target);
        Some(GoalEvent::TargetReached {
            reps,
            target: self.target,
        })
    }

    pub fn progress(&self, reps: u32) -> GoalProgress {
        GoalProgress {
            reps,
            target: self.target,
            remaining: self.target.saturating_sub(reps),
            completed: reps >= self.target,
        }
    }

    pub fn is_reached(&self) -> bool {
        self.reached
    }

    /// Start a new set.
    pub fn rearm(&mut self) {
        self.reached = false;
    }
}

impl Default for WorkoutGoal {
    fn default() -> Self {
        Self::new(Exercise::Squat, DEFAULT_TARGET)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exercise_parsing() {
        assert_eq!("squat".parse::<Exercise>().unwrap(), Exercise::Squat);
        assert_eq!("Sit-Up".parse::<Exercise>().unwrap(), Exercise::SitUp);
        assert_eq!("situp".parse::<Exercise>().unwrap(), Exercise::SitUp);
        assert!("burpee".parse::<Exercise>().is_err());
        assert_eq!(Exercise::SitUp.to_string(), "sit-up");
    }

    #[test]
    fn test_exercise_presets() {
        assert_eq!(Exercise::Squat.strategy(), Strategy::AxisDeviation);
        assert_eq!(Exercise::SitUp.strategy(), Strategy::DeltaAngle);
        assert_eq!(Exercise::SitUp.preset().calibration_ms, 2000);
    }

    #[test]
    fn test_target_reached_once() {
        let mut goal = WorkoutGoal::new(Exercise::SitUp, 3);
        assert_eq!(goal.observe(1), None);
        assert_eq!(goal.observe(2), None);
        assert_eq!(
            goal.observe(3),
            Some(GoalEvent::TargetReached { reps: 3, target: 3 })
        );
        assert_eq!(goal.observe(4), None);
        assert!(goal.is_reached());

        goal.rearm();
        assert_eq!(goal.observe(0), None);
        assert!(goal.observe(3).is_some());
    }

    #[test]
    fn test_progress() {
        let goal = WorkoutGoal::default();
        assert_eq!(goal.target, DEFAULT_TARGET);

        let p = goal.progress(4);
        assert_eq!(p.remaining, 6);
        assert!(!p.completed);

        let p = goal.progress(12);
        assert_eq!(p.remaining, 0);
        assert!(p.completed);
    }

    #[test]
    fn test_zero_target_is_clamped() {
        let mut goal = WorkoutGoal::new(Exercise::Squat, 0).with_reset_on_complete(true);
        assert_eq!(goal.target, 1);
        assert!(goal.reset_on_complete);
        assert_eq!(goal.observe(0), None);
        assert!(goal.observe(1).is_some());
    }
}
