use std::time::{Duration, Instant};

/// Default silence before the motion source is considered stalled.
pub const DEFAULT_SILENCE_SECS: u64 = 5;

/// Tracks whether a subscribed motion source is still delivering samples.
#[derive(Clone, Debug)]
pub struct SourceHealth {
    pub name: String,
    pub silence_threshold: Duration,
    last_update: Instant,
    samples: u64,
    silence_reported: bool,
}

impl SourceHealth {
    pub fn new(name: &str, silence_threshold: Duration) -> Self {
        SourceHealth {
            name: name.to_string(),
            silence_threshold,
            last_update: Instant::now(),
            samples: 0,
            silence_reported: false,
        }
    }

    /// Default silence threshold under a source-specific name.
    pub fn named(name: &str) -> Self {
        Self::new(name, Duration::from_secs(DEFAULT_SILENCE_SECS))
    }

    /// Restart the silence clock, e.g. on a fresh subscription.
    pub fn restart(&mut self) {
        self.last_update = Instant::now();
        self.silence_reported = false;
    }

    pub fn update(&mut self) {
        self.last_update = Instant::now();
        self.samples += 1;
        self.silence_reported = false;
    }

    pub fn time_since_last_update(&self) -> Duration {
        self.last_update.elapsed()
    }

    pub fn is_silent(&self) -> bool {
        self.time_since_last_update() > self.silence_threshold
    }

    /// Silence duration the first time the source is found silent; `None`
    /// while healthy or once already reported. Re-armed by `update`.
    pub fn check(&mut self) -> Option<Duration> {
        if !self.is_silent() || self.silence_reported {
            return None;
        }
        self.silence_reported = true;
        Some(self.time_since_last_update())
    }

    /// Format health status for logging
    pub fn format_status(&self) -> String {
        if self.is_silent() {
            format!(
                "{} ⚠ (silent {:.1}s)",
                self.name,
                self.time_since_last_update().as_secs_f64()
            )
        } else {
            format!("{} ✓ ({} samples)", self.name, self.samples)
        }
    }
}

impl Default for SourceHealth {
    fn default() -> Self {
        Self::named("motion")
    }
}
