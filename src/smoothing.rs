use crate::types::Vec3;

/// What the filter did with one raw vector.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FilterOutcome {
    /// First accepted vector, taken as-is
    Initialized(Vec3),
    Smoothed(Vec3),
    /// Magnitude jumped by more than the jerk ceiling; nothing was updated
    Rejected { jerk: f64 },
}

/// Jerk gate followed by a per-axis exponential moving average.
///
/// The jerk reference is the magnitude of the previous raw sample, rejected or not.
pub struct SampleFilter {
    alpha: f64,
    max_jerk: f64,
    ema: Option<Vec3>,
    last_magnitude: Option<f64>,
}

impl SampleFilter {
    /// `alpha` in (0, 1]; 1.0 disables smoothing
    pub fn new(alpha: f64, max_jerk: f64) -> Self {
        SampleFilter {
            alpha,
            max_jerk,
            ema: None,
            last_magnitude: None,
        }
    }

    pub fn apply(&mut self, raw: Vec3) -> FilterOutcome {
        let magnitude = raw.norm();
        let jerk = self
            .last_magnitude
            .map(|last| (magnitude - last).abs())
            .unwrap_or(0.0);
        self.last_magnitude = Some(magnitude);

        if jerk > self.max_jerk {
            return FilterOutcome::Rejected { jerk };
        }

        match self.ema {
            None => {
                self.ema = Some(raw);
                FilterOutcome::Initialized(raw)
            }
            Some(prev) => {
                let next = prev + (raw - prev) * self.alpha;
                self.ema = Some(next);
                FilterOutcome::Smoothed(next)
            }
        }
    }

    /// Current smoothed vector, `None` before the first accepted sample.
    pub fn smoothed(&self) -> Option<Vec3> {
        self.ema
    }
}
