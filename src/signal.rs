//! Scalar signal derivation from the smoothed vector.
//!
//! Two strategies behind one tagged union:
//! - delta-angle: angle to a reference vector frozen after a calibration window
//! - axis-deviation: one axis minus a slowly adapting baseline, which only
//!   adapts while the detector is idle

use crate::config::{DetectorConfig, Strategy};
use crate::phase::Phase;
use crate::types::{angle_between_deg, Axis, Vec3};

#[derive(Clone, Debug, PartialEq)]
pub struct DeltaAngle {
    calibration_ms: u64,
    started_at_ms: Option<u64>,
    reference: Option<Vec3>,
}

impl DeltaAngle {
    pub fn new(calibration_ms: u64) -> Self {
        Self {
            calibration_ms,
            started_at_ms: None,
            reference: None,
        }
    }

    fn seed(&mut self, smoothed: &Vec3, t_ms: u64) {
        self.started_at_ms = Some(t_ms);
        if self.calibration_ms == 0 {
            self.reference = Some(*smoothed);
        }
    }

    fn derive(&mut self, smoothed: &Vec3, t_ms: u64) -> Option<f64> {
        if self.reference.is_none() {
            let started = *self.started_at_ms.get_or_insert(t_ms);
            if t_ms.saturating_sub(started) < self.calibration_ms {
                return None;
            }
            self.reference = Some(*smoothed);
        }
        self.reference
            .as_ref()
            .map(|reference| angle_between_deg(smoothed, reference))
    }

    pub fn reference(&self) -> Option<Vec3> {
        self.reference
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct AxisDeviation {
    axis: Axis,
    baseline_alpha: f64,
    baseline: Option<f64>,
}

impl AxisDeviation {
    pub fn new(axis: Axis, baseline_alpha: f64) -> Self {
        Self {
            axis,
            baseline_alpha,
            baseline: None,
        }
    }

    fn seed(&mut self, smoothed: &Vec3) {
        self.baseline = Some(self.axis.pick(smoothed));
    }

    fn derive(&mut self, smoothed: &Vec3, phase: Phase) -> f64 {
        let value = self.axis.pick(smoothed);
        let alpha = self.baseline_alpha;
        let baseline = self.baseline.get_or_insert(value);
        // Mid-repetition the baseline would chase the motion itself
        if !phase.in_cycle() {
            *baseline += alpha * (value - *baseline);
        }
        value - *baseline
    }

    pub fn baseline(&self) -> Option<f64> {
        self.baseline
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum SignalStrategy {
    DeltaAngle(DeltaAngle),
    AxisDeviation(AxisDeviation),
}

impl SignalStrategy {
    pub fn from_config(config: &DetectorConfig) -> Self {
        match config.strategy {
            Strategy::DeltaAngle => SignalStrategy::DeltaAngle(DeltaAngle::new(config.calibration_ms)),
            Strategy::AxisDeviation => {
                SignalStrategy::AxisDeviation(AxisDeviation::new(config.axis, config.baseline_alpha))
            }
        }
    }

    /// Seed from the first accepted vector of a session.
    pub fn seed(&mut self, smoothed: &Vec3, t_ms: u64) {
        match self {
            SignalStrategy::DeltaAngle(s) => s.seed(smoothed, t_ms),
            SignalStrategy::AxisDeviation(s) => s.seed(smoothed),
        }
    }

    /// Scalar signal for this sample, `None` while still calibrating.
    ///
    /// `phase` is the detector phase before this sample is applied.
    pub fn derive(&mut self, smoothed: &Vec3, t_ms: u64, phase: Phase) -> Option<f64> {
        match self {
            SignalStrategy::DeltaAngle(s) => s.derive(smoothed, t_ms),
            SignalStrategy::AxisDeviation(s) => Some(s.derive(smoothed, phase)),
        }
    }

    pub fn is_calibrated(&self) -> bool {
        match self {
            SignalStrategy::DeltaAngle(s) => s.reference.is_some(),
            SignalStrategy::AxisDeviation(_) => true,
        }
    }

    /// Frozen delta-angle reference, once calibrated.
    pub fn reference(&self) -> Option<Vec3> {
        match self {
            SignalStrategy::DeltaAngle(s) => s.reference(),
            SignalStrategy::AxisDeviation(_) => None,
        }
    }

    /// Axis-deviation baseline, if any.
    pub fn baseline(&self) -> Option<f64> {
        match self {
            SignalStrategy::DeltaAngle(_) => None,
            SignalStrategy::AxisDeviation(s) => s.baseline(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_delta_angle_waits_for_calibration() {
        let mut s = SignalStrategy::DeltaAngle(DeltaAngle::new(2000));
        let flat = Vec3::new(0.0, 0.0, 1.0);
        s.seed(&flat, 1_000);
        assert!(!s.is_calibrated());

        assert_eq!(s.derive(&Vec3::new(0.0, 1.0, 0.0), 2_500, Phase::Calibrating), None);
        assert!(!s.is_calibrated());

        // Reference frozen from the vector current at the end of the window
        let at_freeze = Vec3::new(0.0, 0.1, 1.0);
        let angle = s.derive(&at_freeze, 3_000, Phase::Calibrating).unwrap();
        assert_relative_eq!(angle, 0.0, epsilon = 1e-6);
        assert!(s.is_calibrated());
        assert_eq!(s.reference(), Some(at_freeze));

        let tilted = Vec3::new(0.0, 1.0, 0.1);
        let angle = s.derive(&tilted, 3_060, Phase::Idle).unwrap();
        // 84.3° from z minus the 5.7° reference tilt
        assert_relative_eq!(angle, 78.58, epsilon = 0.01);
    }

    #[test]
    fn test_zero_calibration_window() {
        let mut s = SignalStrategy::DeltaAngle(DeltaAngle::new(0));
        s.seed(&Vec3::new(0.0, 0.0, 1.0), 0);
        assert!(s.is_calibrated());
    }

    #[test]
    fn test_axis_deviation_seeds_baseline() {
        let mut s = SignalStrategy::AxisDeviation(AxisDeviation::new(Axis::Y, 0.01));
        s.seed(&Vec3::new(0.0, 0.98, 0.1), 0);
        assert_eq!(s.baseline(), Some(0.98));
        assert!(s.is_calibrated());
    }

    #[test]
    fn test_axis_baseline_adapts_only_outside_cycle() {
        let mut s = SignalStrategy::AxisDeviation(AxisDeviation::new(Axis::Y, 0.5));
        s.seed(&Vec3::new(0.0, 1.0, 0.0), 0);

        let d = s.derive(&Vec3::new(0.0, 0.8, 0.0), 60, Phase::Idle).unwrap();
        // baseline 1.0 -> 0.9, deviation 0.8 - 0.9
        assert_relative_eq!(s.baseline().unwrap(), 0.9, epsilon = 1e-12);
        assert_relative_eq!(d, -0.1, epsilon = 1e-12);

        for phase in [Phase::Descending, Phase::Hold, Phase::Ascending] {
            let d = s.derive(&Vec3::new(0.0, 0.4, 0.0), 120, phase).unwrap();
            assert_relative_eq!(s.baseline().unwrap(), 0.9, epsilon = 1e-12);
            assert_relative_eq!(d, -0.5, epsilon = 1e-12);
        }
    }
}
