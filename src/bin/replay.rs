use std::path::{Path, PathBuf};

use clap::Parser;
use serde_json::json;

use rep_counter::config::load_overrides;
use rep_counter::recording::RecordingFormat;
use rep_counter::{load_recording, DetectorConfig, DetectorEvent, Exercise, RepDetector};

#[derive(Parser, Debug)]
struct Args {
    /// Path to a recording (.json, .jsonl, .csv, optionally .gz)
    #[arg(long, conflicts_with = "dir")]
    recording: Option<PathBuf>,

    /// Directory of recordings to batch replay
    #[arg(long)]
    dir: Option<PathBuf>,

    /// Exercise preset (squat, sit-up)
    #[arg(long, default_value = "squat")]
    exercise: Exercise,

    /// JSON file with detector option overrides
    #[arg(long)]
    config: Option<PathBuf>,

    /// Include every detector event in the output
    #[arg(long, default_value_t = false)]
    events: bool,
}

fn is_recording(path: &Path) -> bool {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    let name = name.strip_suffix(".gz").unwrap_or(&name);
    [".json", ".jsonl", ".ndjson", ".csv"]
        .iter()
        .any(|ext| name.ends_with(ext))
}

fn run_once(path: &Path, config: &DetectorConfig, args: &Args) -> anyhow::Result<serde_json::Value> {
    let samples = load_recording(path, config.sampling_interval_ms)?;
    let mut detector = RepDetector::new(config.clone())?;

    let mut events = Vec::new();
    let mut rep_durations = Vec::new();
    for sample in &samples {
        for event in detector.process(sample) {
            if let DetectorEvent::RepCounted { duration_ms, .. } = event {
                rep_durations.push(duration_ms);
            }
            if args.events {
                events.push(event);
            }
        }
    }

    let first_t = samples.first().map(|s| s.t).unwrap_or(0);
    let last_t = samples.last().map(|s| s.t).unwrap_or(0);
    let mean_rep_ms = if rep_durations.is_empty() {
        0.0
    } else {
        rep_durations.iter().sum::<u64>() as f64 / rep_durations.len() as f64
    };
    let stats = detector.stats();

    let mut result = json!({
        "recording": path.display().to_string(),
        "format": format!("{:?}", RecordingFormat::from_path(path)),
        "exercise": args.exercise.as_str(),
        "strategy": config.strategy.as_str(),
        "samples": samples.len(),
        "duration_s": last_t.saturating_sub(first_t) as f64 / 1000.0,
        "reps": detector.rep_count(),
        "mean_rep_ms": mean_rep_ms,
        "rejected_cycles": stats.rejected_cycles,
        "aborted_cycles": stats.aborted_cycles,
        "jerk_rejected_samples": stats.rejected_samples,
        "final_phase": detector.phase(),
        "calibrated": detector.is_calibrated(),
        "reference": detector.reference().map(|r| [r.x, r.y, r.z]),
        "baseline": detector.baseline(),
    });
    if args.events {
        result["events"] = serde_json::to_value(&events)?;
    }
    Ok(result)
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut config = args.exercise.preset();
    if let Some(path) = args.config.as_ref() {
        config = load_overrides(path)?.apply_to(config);
    }
    config.validate()?;

    let mut results = Vec::new();

    if let Some(dir) = args.dir.as_ref() {
        let mut paths = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_file() && is_recording(&path) {
                paths.push(path);
            }
        }
        paths.sort();

        for path in paths {
            match run_once(&path, &config, &args) {
                Ok(res) => results.push(res),
                Err(e) => eprintln!("Failed {}: {}", path.display(), e),
            }
        }
    } else if let Some(recording) = args.recording.as_ref() {
        results.push(run_once(recording, &config, &args)?);
    } else {
        anyhow::bail!("Provide --recording or --dir");
    }

    println!("{}", serde_json::to_string_pretty(&results)?);
    Ok(())
}
