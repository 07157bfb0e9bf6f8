//! Deterministic synthetic motion for demos and tests.
//!
//! Motion is described as piecewise-linear keyframes over time and rendered
//! into accelerometer samples at a fixed interval.

use std::f64::consts::PI;

use crate::types::{Axis, MotionSample, Vec3};

/// Piecewise-linear `(t_ms, value)` track.
#[derive(Clone, Debug, PartialEq)]
pub struct Keyframes {
    points: Vec<(u64, f64)>,
}

impl Keyframes {
    pub fn starting_at(value: f64) -> Self {
        Self {
            points: vec![(0, value)],
        }
    }

    fn last(&self) -> (u64, f64) {
        // starting_at always pushes one point
        self.points.last().copied().unwrap_or((0, 0.0))
    }

    /// Keep the current value for `duration_ms`.
    pub fn hold(mut self, duration_ms: u64) -> Self {
        let (t, v) = self.last();
        self.points.push((t + duration_ms, v));
        self
    }

    /// Move linearly to `value` over `duration_ms`.
    pub fn ramp_to(mut self, value: f64, duration_ms: u64) -> Self {
        let (t, _) = self.last();
        self.points.push((t + duration_ms, value));
        self
    }

    pub fn duration_ms(&self) -> u64 {
        self.last().0
    }

    pub fn value_at(&self, t_ms: u64) -> f64 {
        for pair in self.points.windows(2) {
            let (t0, v0) = pair[0];
            let (t1, v1) = pair[1];
            if t_ms > t1 {
                continue;
            }
            if t1 == t0 {
                return v1;
            }
            let frac = t_ms.saturating_sub(t0) as f64 / (t1 - t0) as f64;
            return v0 + (v1 - v0) * frac;
        }
        self.last().1
    }

    fn render(&self, interval_ms: u64, to_vector: impl Fn(f64) -> Vec3) -> Vec<MotionSample> {
        let interval_ms = interval_ms.max(1);
        (0..=self.duration_ms() / interval_ms)
            .map(|k| {
                let t = k * interval_ms;
                MotionSample::from_vector(to_vector(self.value_at(t)), t)
            })
            .collect()
    }

    /// Values are offsets added to `rest` on `axis` (g-units).
    pub fn render_axis(&self, rest: Vec3, axis: Axis, interval_ms: u64) -> Vec<MotionSample> {
        self.render(interval_ms, |offset| {
            let mut v = rest;
            match axis {
                Axis::X => v.x += offset,
                Axis::Y => v.y += offset,
                Axis::Z => v.z += offset,
            }
            v
        })
    }

    /// Values are tilt angles in degrees away from lying flat.
    pub fn render_tilt(&self, interval_ms: u64) -> Vec<MotionSample> {
        self.render(interval_ms, tilt_vector)
    }
}

/// Gravity as seen by a phone tilted `degrees` from flat, rotating in the y-z plane.
pub fn tilt_vector(degrees: f64) -> Vec3 {
    let rad = degrees.to_radians();
    Vec3::new(0.0, rad.sin(), rad.cos())
}

/// Upright phone on the thigh/chest; each rep dips y and rises back over the baseline.
pub fn squat_set(reps: u32, interval_ms: u64) -> Vec<MotionSample> {
    let mut track = Keyframes::starting_at(0.0).hold(800);
    for _ in 0..reps {
        track = track
            .ramp_to(-0.55, 600)
            .hold(600)
            .ramp_to(0.30, 700)
            .hold(700)
            .ramp_to(0.0, 300)
            .hold(800);
    }
    track.render_axis(Vec3::new(0.0, 1.0, 0.05), Axis::Y, interval_ms)
}

/// Phone held lying down for calibration, then each rep tilts up to ~80°.
pub fn sit_up_set(reps: u32, interval_ms: u64) -> Vec<MotionSample> {
    let mut track = Keyframes::starting_at(0.0).hold(2400);
    for _ in 0..reps {
        track = track
            .ramp_to(80.0, 800)
            .hold(600)
            .ramp_to(0.0, 800)
            .hold(1200);
    }
    track.render_tilt(interval_ms)
}

/// Add small deterministic hand tremor to every axis.
pub fn with_jitter(samples: Vec<MotionSample>, amplitude: f64) -> Vec<MotionSample> {
    samples
        .into_iter()
        .enumerate()
        .map(|(i, mut s)| {
            let k = i as f64;
            s.x += amplitude * (k * 2.0 * PI * 0.13).sin();
            s.y += amplitude * (k * 2.0 * PI * 0.07).cos();
            s.z += amplitude * 0.5 * (k * PI * 0.11).sin();
            s
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_keyframe_interpolation() {
        let track = Keyframes::starting_at(0.0).hold(100).ramp_to(-1.0, 200);
        assert_eq!(track.duration_ms(), 300);
        assert_eq!(track.value_at(50), 0.0);
        assert_relative_eq!(track.value_at(200), -0.5);
        assert_eq!(track.value_at(300), -1.0);
        // Past the end clamps to the last value
        assert_eq!(track.value_at(1_000), -1.0);
    }

    #[test]
    fn test_render_axis_timestamps() {
        let samples = Keyframes::starting_at(0.0)
            .ramp_to(0.4, 120)
            .render_axis(Vec3::new(0.0, 1.0, 0.0), Axis::Y, 40);
        let ts: Vec<u64> = samples.iter().map(|s| s.t).collect();
        assert_eq!(ts, vec![0, 40, 80, 120]);
        assert_relative_eq!(samples[3].y, 1.4);
    }

    #[test]
    fn test_tilt_vector_is_unit_length() {
        for deg in [0.0, 30.0, 80.0] {
            assert_relative_eq!(tilt_vector(deg).norm(), 1.0, epsilon = 1e-12);
        }
        assert_relative_eq!(tilt_vector(90.0).y, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_sets_have_expected_length() {
        let squats = squat_set(2, 60);
        assert_eq!(squats.last().unwrap().t, 8_200 / 60 * 60);
        let sit_ups = sit_up_set(1, 60);
        assert_eq!(sit_ups.last().unwrap().t, 5_800 / 60 * 60);
    }
}
