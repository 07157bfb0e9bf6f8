use anyhow::Result;
use chrono::Utc;
use clap::Parser;
use std::path::{Path, PathBuf};
use tokio::time::{sleep, Duration};

use rep_counter::config::load_overrides;
use rep_counter::live_status::{current_timestamp, LiveStatus};
use rep_counter::sensors::synthetic;
use rep_counter::workout::DEFAULT_TARGET;
use rep_counter::{
    load_recording, DetectorEvent, Exercise, GoalEvent, MotionSample, MotionSource, PacedSource,
    Session, WorkoutGoal,
};

#[derive(Parser, Debug)]
#[command(name = "rep_counter")]
#[command(about = "Live repetition counter over a paced motion source", long_about = None)]
struct Args {
    /// Duration in seconds (0 = until the source ends)
    #[arg(value_name = "SECONDS", default_value = "0")]
    duration: u64,

    /// Exercise preset (squat, sit-up)
    #[arg(long, default_value = "squat")]
    exercise: Exercise,

    /// JSON file with detector option overrides
    #[arg(long)]
    config: Option<PathBuf>,

    /// Recording to play back in real time (synthetic set if omitted)
    #[arg(long)]
    recording: Option<PathBuf>,

    /// Reps in the synthetic set
    #[arg(long, default_value = "5")]
    reps: u32,

    /// Rep target for the set
    #[arg(long, default_value_t = DEFAULT_TARGET)]
    target: u32,

    /// Zero the counter once the target is reached
    #[arg(long)]
    reset_on_complete: bool,

    /// Sampling interval override (ms)
    #[arg(long)]
    interval_ms: Option<u64>,

    /// Stamp samples with their arrival time instead of the recorded time
    #[arg(long)]
    restamp: bool,

    /// Output directory
    #[arg(long, default_value = "rep_counter_sessions")]
    output_dir: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut config = args.exercise.preset();
    if let Some(path) = args.config.as_ref() {
        config = load_overrides(path)?.apply_to(config);
    }
    if let Some(interval) = args.interval_ms {
        config.sampling_interval_ms = interval;
    }
    config.validate()?;

    println!("[{}] Rep Counter Starting", ts_now());
    println!("  Exercise: {} ({})", args.exercise, config.strategy);
    println!("  Duration: {} seconds (0=until source ends)", args.duration);
    println!("  Target: {} reps", args.target);
    println!("  Interval: {} ms", config.sampling_interval_ms);
    println!("  Output Dir: {}", args.output_dir);

    std::fs::create_dir_all(&args.output_dir)?;

    let samples: Vec<MotionSample> = match args.recording.as_ref() {
        Some(path) => {
            let samples = load_recording(path, config.sampling_interval_ms)?;
            println!(
                "[{}] Loaded {} samples from {}",
                ts_now(),
                samples.len(),
                path.display()
            );
            samples
        }
        None => {
            let set = match args.exercise {
                Exercise::Squat => synthetic::squat_set(args.reps, config.sampling_interval_ms),
                Exercise::SitUp => synthetic::sit_up_set(args.reps, config.sampling_interval_ms),
            };
            println!("[{}] Generated synthetic set of {} reps", ts_now(), args.reps);
            synthetic::with_jitter(set, 0.02)
        }
    };

    let source = PacedSource::new(samples, config.sampling_interval_ms).with_restamp(args.restamp);
    let mut session = Session::new(source);
    session.on_event(|event, obs| match event {
        DetectorEvent::Calibrated { t_ms } => {
            println!("[{}] Calibrated at {} ms", ts_now(), t_ms)
        }
        DetectorEvent::RepCounted {
            duration_ms, range, ..
        } => println!(
            "[{}] Rep {} ({} ms, range {:.2})",
            ts_now(),
            obs.rep_count,
            duration_ms,
            range
        ),
        DetectorEvent::CycleRejected {
            reason,
            duration_ms,
            range,
            ..
        } => println!(
            "[{}] Cycle rejected: {:?} ({} ms, range {:.2})",
            ts_now(),
            reason,
            duration_ms,
            range
        ),
        _ => {}
    });

    let mut goal =
        WorkoutGoal::new(args.exercise, args.target).with_reset_on_complete(args.reset_on_complete);

    session.start(config)?;
    println!(
        "[{}] Counting ({}, source '{}')...",
        ts_now(),
        session.metadata().session_id,
        session.source().name()
    );

    let start = Utc::now();
    let mut last_status_update = start;
    let status_path = Path::new(&args.output_dir).join("live_status.json");

    loop {
        if args.duration > 0 {
            let elapsed = Utc::now().signed_duration_since(start);
            if elapsed.num_seconds() as u64 >= args.duration {
                println!("[{}] Duration reached, stopping...", ts_now());
                break;
            }
        }

        session.poll()?;

        if let Some(GoalEvent::TargetReached { reps, target }) =
            goal.observe(session.observation().rep_count)
        {
            println!("[{}] Target reached: {}/{}", ts_now(), reps, target);
            if goal.reset_on_complete {
                session.reset();
                goal.rearm();
            }
        }

        let now = Utc::now();
        if now.signed_duration_since(last_status_update).num_seconds() >= 2 {
            let uptime = now.signed_duration_since(start).num_seconds().max(0) as u64;
            let _ = build_status(&session, &goal, uptime).save(&status_path);
            last_status_update = now;
        }

        if session.is_source_exhausted() {
            println!("[{}] Motion source finished", ts_now());
            break;
        }

        sleep(Duration::from_millis(10)).await;
    }

    session.stop()?;

    let summary = session.summary().with_exercise(args.exercise);
    let summary_path =
        Path::new(&args.output_dir).join(format!("{}_summary.json", summary.session_id));
    summary.save(&summary_path)?;
    println!("[{}] Summary saved to {}", ts_now(), summary_path.display());

    let uptime = Utc::now().signed_duration_since(start).num_seconds().max(0) as u64;
    let final_status = build_status(&session, &goal, uptime);
    let _ = final_status.save(&Path::new(&args.output_dir).join("live_status_final.json"));

    let progress = goal.progress(summary.rep_count);
    println!("\n=== Final Stats ===");
    println!("Reps: {}/{}", progress.reps, progress.target);
    println!("Rejected cycles: {}", summary.stats.rejected_cycles);
    println!("Aborted cycles: {}", summary.stats.aborted_cycles);
    println!("Jerk-rejected samples: {}", summary.stats.rejected_samples);
    println!("Samples received: {}", summary.samples_received);
    println!("Source: {}", session.health().format_status());

    Ok(())
}

fn build_status<S: MotionSource>(
    session: &Session<S>,
    goal: &WorkoutGoal,
    uptime_seconds: u64,
) -> LiveStatus {
    let obs = session.observation();
    let stats = session.detector().map(|d| d.stats()).unwrap_or_default();

    let mut status = LiveStatus::new(&session.metadata().session_id, goal.exercise.as_str());
    status.timestamp = current_timestamp();
    status.rep_count = obs.rep_count;
    status.target = goal.target;
    status.phase = obs.phase;
    status.signal_value = obs.signal_value;
    status.calibrated = obs.calibrated;
    status.uptime_seconds = uptime_seconds;
    status.unavailable = session.is_unavailable();
    status.source_silent = session.is_source_silent();
    status.source_silence_secs = session.health().time_since_last_update().as_secs_f64();
    status.accepted_samples = stats.accepted_samples;
    status.rejected_samples = stats.rejected_samples;
    status.rejected_cycles = stats.rejected_cycles;
    status
}

fn ts_now() -> String {
    Utc::now().format("%H:%M:%S").to_string()
}
