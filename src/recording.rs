//! Recorded motion logs and session summaries.
//!
//! Recordings are JSON (an array of samples, or an object with a `samples`
//! array), JSON lines, or CSV `t,x,y,z`. Any of them may be gzipped (`.gz`).
//! Missing axes read as 0 and a missing timestamp as `index × interval`.

use flate2::read::GzDecoder;
use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::{self, File};
use std::io::{BufReader, Read};
use std::path::Path;

use crate::config::Strategy;
use crate::detector::{DetectorStats, RepDetector};
use crate::error::{RepCounterError, Result};
use crate::phase::Phase;
use crate::session::SessionMetadata;
use crate::types::MotionSample;
use crate::workout::Exercise;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordingFormat {
    Json,
    JsonLines,
    Csv,
}

impl RecordingFormat {
    /// Guess from the file name, looking through a trailing `.gz`.
    pub fn from_path(path: &Path) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();
        let name = name.strip_suffix(".gz").unwrap_or(&name);

        if name.ends_with(".csv") {
            RecordingFormat::Csv
        } else if name.ends_with(".jsonl") || name.ends_with(".ndjson") {
            RecordingFormat::JsonLines
        } else {
            RecordingFormat::Json
        }
    }
}

/// One sample as written by whatever produced the log. Anything goes per field.
#[derive(Deserialize)]
struct RawSample {
    #[serde(default)]
    x: Option<Value>,
    #[serde(default)]
    y: Option<Value>,
    #[serde(default)]
    z: Option<Value>,
    #[serde(default, alias = "timestamp")]
    t: Option<Value>,
}

impl RawSample {
    fn into_sample(self, index: usize, interval_ms: u64) -> MotionSample {
        let t = number(self.t.as_ref())
            .filter(|t| *t >= 0.0)
            .map(|t| t.round() as u64)
            .unwrap_or(index as u64 * interval_ms);
        MotionSample::new(
            number(self.x.as_ref()).unwrap_or(0.0),
            number(self.y.as_ref()).unwrap_or(0.0),
            number(self.z.as_ref()).unwrap_or(0.0),
            t,
        )
    }
}

fn number(value: Option<&Value>) -> Option<f64> {
    let v = match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    v.is_finite().then_some(v)
}

/// Load a recording from disk.
pub fn load_recording(path: &Path, interval_ms: u64) -> Result<Vec<MotionSample>> {
    let file = File::open(path)?;
    let mut text = String::new();
    if path.extension().map(|e| e == "gz").unwrap_or(false) {
        BufReader::new(GzDecoder::new(file)).read_to_string(&mut text)?;
    } else {
        BufReader::new(file).read_to_string(&mut text)?;
    }

    let samples = parse_recording(&text, RecordingFormat::from_path(path), interval_ms)?;
    if samples.is_empty() {
        return Err(RepCounterError::Recording(format!(
            "{} contains no samples",
            path.display()
        )));
    }
    Ok(samples)
}

pub fn parse_recording(
    text: &str,
    format: RecordingFormat,
    interval_ms: u64,
) -> Result<Vec<MotionSample>> {
    match format {
        RecordingFormat::Json => parse_json(text, interval_ms),
        RecordingFormat::JsonLines => Ok(parse_json_lines(text, interval_ms)),
        RecordingFormat::Csv => Ok(parse_csv(text, interval_ms)),
    }
}

fn parse_json(text: &str, interval_ms: u64) -> Result<Vec<MotionSample>> {
    let items = match serde_json::from_str::<Value>(text)? {
        Value::Array(items) => items,
        Value::Object(mut obj) => match obj.remove("samples") {
            Some(Value::Array(items)) => items,
            _ => {
                return Err(RepCounterError::Recording(
                    "expected an array of samples or a \"samples\" array".to_string(),
                ))
            }
        },
        _ => {
            return Err(RepCounterError::Recording(
                "expected an array of samples".to_string(),
            ))
        }
    };

    let mut samples = Vec::with_capacity(items.len());
    for (i, item) in items.into_iter().enumerate() {
        match serde_json::from_value::<RawSample>(item) {
            Ok(raw) => samples.push(raw.into_sample(samples.len(), interval_ms)),
            Err(e) => warn!("skipping sample {}: {}", i, e),
        }
    }
    Ok(samples)
}

fn parse_json_lines(text: &str, interval_ms: u64) -> Vec<MotionSample> {
    let mut samples = Vec::new();
    for (lineno, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<RawSample>(line) {
            Ok(raw) => samples.push(raw.into_sample(samples.len(), interval_ms)),
            Err(e) => warn!("skipping line {}: {}", lineno + 1, e),
        }
    }
    samples
}

/// Column positions of t, x, y, z.
type Columns = [Option<usize>; 4];

fn header_columns(cells: &[&str]) -> Columns {
    let mut cols = [None; 4];
    for (i, cell) in cells.iter().enumerate() {
        match cell.trim().to_ascii_lowercase().as_str() {
            "t" | "timestamp" | "time" | "t_ms" => cols[0] = Some(i),
            "x" => cols[1] = Some(i),
            "y" => cols[2] = Some(i),
            "z" => cols[3] = Some(i),
            _ => {}
        }
    }
    cols
}

fn parse_csv(text: &str, interval_ms: u64) -> Vec<MotionSample> {
    let mut columns: Columns = [Some(0), Some(1), Some(2), Some(3)];
    let mut samples = Vec::new();
    let mut first = true;

    for (lineno, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let cells: Vec<&str> = line.split(',').collect();
        let numeric: Vec<Option<f64>> = cells
            .iter()
            .map(|c| c.trim().parse::<f64>().ok().filter(|v| v.is_finite()))
            .collect();

        if numeric.iter().all(Option::is_none) {
            if first {
                columns = header_columns(&cells);
            } else {
                warn!("skipping line {}: no numeric fields", lineno + 1);
            }
            first = false;
            continue;
        }
        first = false;

        let cell = |col: Option<usize>| col.and_then(|i| numeric.get(i).copied().flatten());
        let t = cell(columns[0])
            .filter(|t| *t >= 0.0)
            .map(|t| t.round() as u64)
            .unwrap_or(samples.len() as u64 * interval_ms);
        samples.push(MotionSample::new(
            cell(columns[1]).unwrap_or(0.0),
            cell(columns[2]).unwrap_or(0.0),
            cell(columns[3]).unwrap_or(0.0),
            t,
        ));
    }
    samples
}

/// End-of-session record written next to the live status file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub start_time: String,
    pub exercise: Option<Exercise>,
    pub strategy: Option<Strategy>,
    pub rep_count: u32,
    pub final_phase: Phase,
    pub calibrated: bool,
    pub unavailable: bool,
    pub samples_received: u64,
    #[serde(flatten)]
    pub stats: DetectorStats,
}

impl SessionSummary {
    pub fn new(
        metadata: &SessionMetadata,
        detector: Option<&RepDetector>,
        unavailable: bool,
    ) -> Self {
        SessionSummary {
            session_id: metadata.session_id.clone(),
            start_time: metadata.start_time.clone(),
            exercise: None,
            strategy: metadata.strategy,
            rep_count: detector.map(RepDetector::rep_count).unwrap_or(0),
            final_phase: detector.map(RepDetector::phase).unwrap_or(Phase::Idle),
            calibrated: detector.map(RepDetector::is_calibrated).unwrap_or(false),
            unavailable,
            samples_received: metadata.samples_received,
            stats: detector.map(RepDetector::stats).unwrap_or_default(),
        }
    }

    pub fn with_exercise(mut self, exercise: Exercise) -> Self {
        self.exercise = Some(exercise);
        self
    }

    pub fn to_json(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionState;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    #[test]
    fn test_format_from_path() {
        assert_eq!(RecordingFormat::from_path(Path::new("a.csv")), RecordingFormat::Csv);
        assert_eq!(RecordingFormat::from_path(Path::new("a.CSV.gz")), RecordingFormat::Csv);
        assert_eq!(
            RecordingFormat::from_path(Path::new("a.jsonl")),
            RecordingFormat::JsonLines
        );
        assert_eq!(RecordingFormat::from_path(Path::new("a.json.gz")), RecordingFormat::Json);
        assert_eq!(RecordingFormat::from_path(Path::new("a")), RecordingFormat::Json);
    }

    #[test]
    fn test_json_array_with_gaps() {
        let text = r#"[
            {"x": 0.1, "y": 1.0, "z": 0.0, "t": 0},
            {"y": "0.9", "timestamp": 60},
            {"x": null, "y": 0.8, "z": "abc"},
            42
        ]"#;
        let samples = parse_recording(text, RecordingFormat::Json, 60).unwrap();
        assert_eq!(samples.len(), 3);
        assert_eq!(samples[1], MotionSample::new(0.0, 0.9, 0.0, 60));
        // Missing t falls back to index × interval
        assert_eq!(samples[2], MotionSample::new(0.0, 0.8, 0.0, 120));
    }

    #[test]
    fn test_json_object_with_samples() {
        let text = r#"{"device": "pixel", "samples": [{"x": 1, "y": 2, "z": 3, "t": 5}]}"#;
        let samples = parse_recording(text, RecordingFormat::Json, 60).unwrap();
        assert_eq!(samples, vec![MotionSample::new(1.0, 2.0, 3.0, 5)]);

        let bad = parse_recording(r#"{"device": "pixel"}"#, RecordingFormat::Json, 60);
        assert!(matches!(bad, Err(RepCounterError::Recording(_))));
    }

    #[test]
    fn test_json_lines_skips_bad_lines() {
        let text = "{\"y\": 1.0, \"t\": 0}\nnot json\n\n{\"y\": 0.5}\n";
        let samples = parse_recording(text, RecordingFormat::JsonLines, 40).unwrap();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[1].t, 40);
        assert_eq!(samples[1].y, 0.5);
    }

    #[test]
    fn test_csv_with_and_without_header() {
        let plain = "0,0.0,1.0,0.0\n60,0.0,0.8,0.1\n";
        let samples = parse_recording(plain, RecordingFormat::Csv, 60).unwrap();
        assert_eq!(samples[1], MotionSample::new(0.0, 0.8, 0.1, 60));

        let reordered = "# exported\nz,y,x\n0.1,0.9,0.0\n0.2,0.7,\n";
        let samples = parse_recording(reordered, RecordingFormat::Csv, 50).unwrap();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0], MotionSample::new(0.0, 0.9, 0.1, 0));
        assert_eq!(samples[1], MotionSample::new(0.0, 0.7, 0.2, 50));
    }

    #[test]
    fn test_load_gzipped_recording() {
        let dir = std::env::temp_dir().join(format!("rep_counter_rec_{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("set.jsonl.gz");

        let mut enc = GzEncoder::new(Vec::new(), Compression::default());
        enc.write_all(b"{\"x\":0,\"y\":1,\"z\":0,\"t\":0}\n{\"x\":0,\"y\":0.7,\"z\":0,\"t\":60}\n")
            .unwrap();
        fs::write(&path, enc.finish().unwrap()).unwrap();

        let samples = load_recording(&path, 60).unwrap();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[1].y, 0.7);

        let empty = dir.join("empty.csv");
        fs::write(&empty, "t,x,y,z\n").unwrap();
        assert!(matches!(
            load_recording(&empty, 60),
            Err(RepCounterError::Recording(_))
        ));

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_summary_serialization() {
        let metadata = SessionMetadata {
            session_id: "session_1".to_string(),
            start_time: "2025-11-19T12:00:00Z".to_string(),
            state: SessionState::Stopped,
            strategy: Some(Strategy::AxisDeviation),
            samples_received: 100,
        };
        let summary = SessionSummary::new(&metadata, None, false).with_exercise(Exercise::Squat);
        let json = summary.to_json().unwrap();
        assert!(json.contains("\"session_id\": \"session_1\""));
        assert!(json.contains("\"exercise\": \"squat\""));
        assert!(json.contains("\"strategy\": \"axis-deviation\""));
        assert!(json.contains("\"rejected_cycles\": 0"));
    }
}
