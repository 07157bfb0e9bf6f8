use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::phase::Phase;

/// Snapshot the live runner rewrites periodically for external monitors.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct LiveStatus {
    pub timestamp: f64,
    pub session_id: String,
    pub exercise: String,
    pub rep_count: u32,
    pub target: u32,
    pub phase: Phase,
    pub signal_value: f64,
    pub calibrated: bool,
    pub uptime_seconds: u64,
    // Source health
    pub unavailable: bool,
    pub source_silent: bool,
    pub source_silence_secs: f64,
    // Detector totals
    pub accepted_samples: u64,
    pub rejected_samples: u64,
    pub rejected_cycles: u64,
}

impl LiveStatus {
    pub fn new(session_id: &str, exercise: &str) -> Self {
        Self {
            timestamp: current_timestamp(),
            session_id: session_id.to_string(),
            exercise: exercise.to_string(),
            rep_count: 0,
            target: 0,
            phase: Phase::Idle,
            signal_value: 0.0,
            calibrated: false,
            uptime_seconds: 0,
            unavailable: false,
            source_silent: false,
            source_silence_secs: 0.0,
            accepted_samples: 0,
            rejected_samples: 0,
            rejected_cycles: 0,
        }
    }

    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}

pub fn current_timestamp() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_writes_snapshot() {
        let mut status = LiveStatus::new("session_42", "squat");
        status.rep_count = 7;
        status.phase = Phase::Hold;

        let path = std::env::temp_dir().join(format!("live_status_{}.json", std::process::id()));
        status.save(&path).unwrap();

        let back: LiveStatus = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(back.rep_count, 7);
        assert_eq!(back.phase, Phase::Hold);
        assert_eq!(back.session_id, "session_42");
        assert!(back.timestamp > 0.0);

        fs::remove_file(&path).ok();
    }
}
