//! Detector configuration, per-exercise presets and partial overrides.
//!
//! Every option is explicit on [`DetectorConfig`]. Omitted options in a
//! [`ConfigOverrides`] fall back to the preset of the selected strategy:
//! delta-angle uses the sit-up preset, axis-deviation the squat preset.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::error::{RepCounterError, Result};
use crate::phase::MotionDirection;
use crate::types::Axis;

/// Signal derivation selected for a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// Angle between the smoothed vector and a calibrated reference (free orientation)
    DeltaAngle,
    /// Deviation of one axis from an adaptive baseline (fixed orientation)
    AxisDeviation,
}

impl Strategy {
    pub fn direction(self) -> MotionDirection {
        match self {
            Strategy::DeltaAngle => MotionDirection::Rising,
            Strategy::AxisDeviation => MotionDirection::Falling,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Strategy::DeltaAngle => "delta-angle",
            Strategy::AxisDeviation => "axis-deviation",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "delta-angle" | "deltaangle" | "angle" => Ok(Strategy::DeltaAngle),
            "axis-deviation" | "axis" => Ok(Strategy::AxisDeviation),
            other => Err(format!(
                "unknown strategy '{other}' (expected delta-angle or axis-deviation)"
            )),
        }
    }
}

/// Signal-unit thresholds, signed in the strategy's motion direction.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub enter: f64,
    pub deep: f64,
    pub exit: f64,
    /// Release level for leaving the hold
    pub recover: f64,
}

/// Squat-style thresholds expressed as depth below / rise above the baseline.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AxisThresholds {
    pub down_delta: f64,
    pub up_delta: f64,
}

impl AxisThresholds {
    pub fn thresholds(&self) -> Thresholds {
        Thresholds {
            enter: -0.5 * self.down_delta,
            deep: -self.down_delta,
            exit: 0.5 * self.up_delta,
            recover: -self.up_delta,
        }
    }
}

/// Timing and amplitude gates applied to a cycle.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CycleGates {
    pub min_hold_ms: u64,
    pub min_cycle_ms: u64,
    pub min_range_delta: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectorConfig {
    pub strategy: Strategy,
    pub sampling_interval_ms: u64,
    pub smoothing_alpha: f64,
    /// Axis-deviation only
    pub baseline_alpha: f64,
    /// Delta-angle only
    pub calibration_ms: u64,
    /// Axis-deviation only
    pub axis: Axis,
    pub enter_threshold: f64,
    pub deep_threshold: f64,
    pub exit_threshold: f64,
    pub recover_threshold: f64,
    pub min_hold_ms: u64,
    pub min_cycle_ms: u64,
    pub min_range_delta: f64,
    pub max_jerk: f64,
}

pub const SQUAT_AXIS_THRESHOLDS: AxisThresholds = AxisThresholds {
    down_delta: 0.35,
    up_delta: 0.20,
};

impl DetectorConfig {
    /// Phone held upright against the body, counting on the y axis.
    pub fn squat() -> Self {
        let th = SQUAT_AXIS_THRESHOLDS.thresholds();
        Self {
            strategy: Strategy::AxisDeviation,
            sampling_interval_ms: 60,
            smoothing_alpha: 0.15,
            baseline_alpha: 0.01,
            calibration_ms: 0,
            axis: Axis::Y,
            enter_threshold: th.enter,
            deep_threshold: th.deep,
            exit_threshold: th.exit,
            recover_threshold: th.recover,
            min_hold_ms: 200,
            min_cycle_ms: 1200,
            min_range_delta: 0.35,
            max_jerk: 1.2,
        }
    }

    /// Phone held in hand, lying down during the 2s calibration.
    pub fn sit_up() -> Self {
        Self {
            strategy: Strategy::DeltaAngle,
            sampling_interval_ms: 60,
            smoothing_alpha: 0.2,
            baseline_alpha: 0.01,
            calibration_ms: 2000,
            axis: Axis::Y,
            enter_threshold: 25.0,
            deep_threshold: 55.0,
            exit_threshold: 12.0,
            recover_threshold: 25.0,
            min_hold_ms: 220,
            min_cycle_ms: 1200,
            min_range_delta: 40.0,
            max_jerk: 1.2,
        }
    }

    pub fn for_strategy(strategy: Strategy) -> Self {
        match strategy {
            Strategy::DeltaAngle => Self::sit_up(),
            Strategy::AxisDeviation => Self::squat(),
        }
    }

    pub fn thresholds(&self) -> Thresholds {
        Thresholds {
            enter: self.enter_threshold,
            deep: self.deep_threshold,
            exit: self.exit_threshold,
            recover: self.recover_threshold,
        }
    }

    pub fn with_thresholds(mut self, th: Thresholds) -> Self {
        self.enter_threshold = th.enter;
        self.deep_threshold = th.deep;
        self.exit_threshold = th.exit;
        self.recover_threshold = th.recover;
        self
    }

    pub fn gates(&self) -> CycleGates {
        CycleGates {
            min_hold_ms: self.min_hold_ms,
            min_cycle_ms: self.min_cycle_ms,
            min_range_delta: self.min_range_delta,
        }
    }

    pub fn validate(&self) -> Result<()> {
        check_alpha("smoothingAlpha", self.smoothing_alpha)?;
        if self.strategy == Strategy::AxisDeviation {
            check_alpha("baselineAlpha", self.baseline_alpha)?;
        }
        if self.sampling_interval_ms == 0 {
            return Err(RepCounterError::invalid_config(
                "samplingIntervalMs must be greater than 0",
            ));
        }
        if !self.max_jerk.is_finite() || self.max_jerk <= 0.0 {
            return Err(RepCounterError::invalid_config(format!(
                "maxJerk must be a positive number, got {}",
                self.max_jerk
            )));
        }
        if !self.min_range_delta.is_finite() || self.min_range_delta < 0.0 {
            return Err(RepCounterError::invalid_config(format!(
                "minRangeDelta must be >= 0, got {}",
                self.min_range_delta
            )));
        }

        let th = self.thresholds();
        for (name, value) in [
            ("enterThreshold", th.enter),
            ("deepThreshold", th.deep),
            ("exitThreshold", th.exit),
            ("recoverThreshold", th.recover),
        ] {
            if !value.is_finite() {
                return Err(RepCounterError::invalid_config(format!(
                    "{name} must be finite, got {value}"
                )));
            }
        }

        // Compare in motion-direction units so both strategies share one rule
        let dir = self.strategy.direction();
        let (enter, deep, exit, recover) = (
            dir.progress(th.enter),
            dir.progress(th.deep),
            dir.progress(th.exit),
            dir.progress(th.recover),
        );
        if !(exit < enter && enter < deep) {
            return Err(RepCounterError::invalid_config(format!(
                "thresholds must be ordered exit < enter < deep in the {} direction \
                 (exit={}, enter={}, deep={})",
                self.strategy, th.exit, th.enter, th.deep
            )));
        }
        if !(exit < recover && recover < deep) {
            return Err(RepCounterError::invalid_config(format!(
                "recoverThreshold {} must lie between exit {} and deep {}",
                th.recover, th.exit, th.deep
            )));
        }

        Ok(())
    }
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self::squat()
    }
}

fn check_alpha(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 && value <= 1.0 {
        Ok(())
    } else {
        Err(RepCounterError::invalid_config(format!(
            "{name} must be in (0, 1], got {value}"
        )))
    }
}

/// Partially specified configuration, e.g. from a JSON file.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConfigOverrides {
    pub strategy: Option<Strategy>,
    pub sampling_interval_ms: Option<u64>,
    pub smoothing_alpha: Option<f64>,
    pub baseline_alpha: Option<f64>,
    pub calibration_ms: Option<u64>,
    pub axis: Option<Axis>,
    /// Shorthand for the four axis-deviation thresholds
    pub axis_thresholds: Option<AxisThresholds>,
    pub enter_threshold: Option<f64>,
    pub deep_threshold: Option<f64>,
    pub exit_threshold: Option<f64>,
    pub recover_threshold: Option<f64>,
    pub min_hold_ms: Option<u64>,
    pub min_cycle_ms: Option<u64>,
    pub min_range_delta: Option<f64>,
    pub max_jerk: Option<f64>,
}

impl ConfigOverrides {
    /// Resolve against the preset of the selected strategy (squat if unset).
    pub fn resolve(&self) -> DetectorConfig {
        let base = DetectorConfig::for_strategy(self.strategy.unwrap_or(Strategy::AxisDeviation));
        self.apply_to(base)
    }

    /// Overlay onto `base`. A strategy differing from the base swaps in that
    /// strategy's preset first so the thresholds stay in matching units.
    pub fn apply_to(&self, base: DetectorConfig) -> DetectorConfig {
        let mut cfg = match self.strategy {
            Some(strategy) if strategy != base.strategy => DetectorConfig::for_strategy(strategy),
            _ => base,
        };

        if let Some(axis_th) = self.axis_thresholds {
            cfg = cfg.with_thresholds(axis_th.thresholds());
        }

        macro_rules! overlay {
            ($($field:ident),* $(,)?) => {
                $(if let Some(v) = self.$field { cfg.$field = v; })*
            };
        }
        overlay!(
            sampling_interval_ms,
            smoothing_alpha,
            baseline_alpha,
            calibration_ms,
            axis,
            enter_threshold,
            deep_threshold,
            exit_threshold,
            recover_threshold,
            min_hold_ms,
            min_cycle_ms,
            min_range_delta,
            max_jerk,
        );

        cfg
    }
}

/// Load overrides from a JSON file.
pub fn load_overrides<P: AsRef<Path>>(path: P) -> Result<ConfigOverrides> {
    let text = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_presets_validate() {
        DetectorConfig::squat().validate().unwrap();
        DetectorConfig::sit_up().validate().unwrap();
        assert_eq!(DetectorConfig::default(), DetectorConfig::squat());
    }

    #[test]
    fn test_axis_thresholds_shorthand() {
        let th = SQUAT_AXIS_THRESHOLDS.thresholds();
        assert_relative_eq!(th.enter, -0.175);
        assert_relative_eq!(th.deep, -0.35);
        assert_relative_eq!(th.exit, 0.10);
        assert_relative_eq!(th.recover, -0.20);
    }

    #[test]
    fn test_alpha_bounds() {
        let mut cfg = DetectorConfig::squat();
        cfg.smoothing_alpha = 1.0;
        assert!(cfg.validate().is_ok());

        cfg.smoothing_alpha = 0.0;
        assert!(matches!(cfg.validate(), Err(RepCounterError::InvalidConfig(_))));

        cfg.smoothing_alpha = 0.2;
        cfg.baseline_alpha = 1.5;
        assert!(cfg.validate().is_err());

        // baselineAlpha is ignored by delta-angle
        let mut angle = DetectorConfig::sit_up();
        angle.baseline_alpha = 0.0;
        assert!(angle.validate().is_ok());
    }

    #[test]
    fn test_threshold_ordering_checked_in_motion_direction() {
        // Positive thresholds make no sense for a falling signal
        let cfg = DetectorConfig::squat().with_thresholds(Thresholds {
            enter: 0.175,
            deep: 0.35,
            exit: -0.1,
            recover: 0.2,
        });
        assert!(cfg.validate().is_err());

        let mut cfg = DetectorConfig::sit_up();
        cfg.recover_threshold = 70.0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_other_invalid_values() {
        let mut cfg = DetectorConfig::squat();
        cfg.sampling_interval_ms = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = DetectorConfig::squat();
        cfg.max_jerk = 0.0;
        assert!(cfg.validate().is_err());

        let mut cfg = DetectorConfig::squat();
        cfg.deep_threshold = f64::NAN;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_overrides_fall_back_to_strategy_preset() {
        let overrides: ConfigOverrides =
            serde_json::from_str(r#"{"strategy": "delta-angle", "minCycleMs": 900}"#).unwrap();
        let cfg = overrides.resolve();
        assert_eq!(cfg.strategy, Strategy::DeltaAngle);
        assert_eq!(cfg.min_cycle_ms, 900);
        assert_eq!(cfg.calibration_ms, 2000);
        assert_eq!(cfg.deep_threshold, 55.0);

        let empty = ConfigOverrides::default().resolve();
        assert_eq!(empty, DetectorConfig::squat());
    }

    #[test]
    fn test_overrides_switch_strategy_and_shorthand() {
        let overrides: ConfigOverrides = serde_json::from_str(
            r#"{"strategy": "axis-deviation", "axis": "z",
                "axisThresholds": {"downDelta": 0.5, "upDelta": 0.3},
                "exitThreshold": 0.12}"#,
        )
        .unwrap();
        let cfg = overrides.apply_to(DetectorConfig::sit_up());
        assert_eq!(cfg.strategy, Strategy::AxisDeviation);
        assert_eq!(cfg.axis, Axis::Z);
        assert_relative_eq!(cfg.deep_threshold, -0.5);
        assert_relative_eq!(cfg.recover_threshold, -0.3);
        // Explicit field wins over the shorthand
        assert_relative_eq!(cfg.exit_threshold, 0.12);
        cfg.validate().unwrap();
    }

    #[test]
    fn test_config_json_round_trip_names() {
        let json = serde_json::to_value(DetectorConfig::squat()).unwrap();
        assert_eq!(json["strategy"], "axis-deviation");
        assert_eq!(json["samplingIntervalMs"], 60);
        assert_eq!(json["axis"], "y");
    }

    #[test]
    fn test_strategy_parse() {
        assert_eq!("delta-angle".parse::<Strategy>().unwrap(), Strategy::DeltaAngle);
        assert_eq!("Axis".parse::<Strategy>().unwrap(), Strategy::AxisDeviation);
        assert!("gyro".parse::<Strategy>().is_err());
    }
}
