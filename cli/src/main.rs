//! `redlight` CLI: run simulated scenarios or replay detection logs through
//! the violation engine.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use sim::replay::{load_replay, save_replay, ReplayFrame, ReplayLog};
use sim::scenarios::{Scenario, ScenarioKind};
use std::path::{Path, PathBuf};
use tracing::warn;
use violation_core::{EngineConfig, JsonLinesSink, LineConfig, ViolationEngine};

#[derive(Parser)]
#[command(name = "redlight", about = "Red-light violation engine CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a named scenario in batch mode and output metrics.
    RunScenario {
        #[arg(value_enum)]
        scenario: ScenarioKind,
        /// Random seed for reproducibility
        #[arg(long, default_value_t = 42)]
        seed: u64,
        #[command(flatten)]
        engine: EngineArgs,
        /// Also save the full replay log
        #[arg(long)]
        save_replay: Option<PathBuf>,
    },
    /// Load and replay a previously recorded detection log.
    Replay {
        /// Path to replay JSON file
        input: PathBuf,
        #[command(flatten)]
        engine: EngineArgs,
    },
}

#[derive(Args)]
struct EngineArgs {
    /// Engine config JSON (stop line, track TTL, initial phase)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Override the track TTL in frames
    #[arg(long, conflicts_with = "no_ttl")]
    ttl: Option<u64>,
    /// Keep tracks until the next phase change
    #[arg(long)]
    no_ttl: bool,
    /// Append every violation to this JSON-lines file
    #[arg(long)]
    audit_log: Option<PathBuf>,
    /// Output metrics to a JSON file
    #[arg(long)]
    output: Option<PathBuf>,
}

impl EngineArgs {
    /// Resolve the engine config. A line from the config file wins over the
    /// one recorded with the scenario or log.
    fn engine_config(&self, recorded_line: Option<LineConfig>) -> Result<EngineConfig> {
        let mut config = match &self.config {
            Some(path) => EngineConfig::from_json_file(path)?,
            None => EngineConfig::default(),
        };
        if config.stop_line.is_none() {
            config.stop_line = recorded_line;
        }
        if let Some(ttl) = self.ttl {
            config.track_ttl = Some(ttl);
        }
        if self.no_ttl {
            config.track_ttl = None;
        }
        config.validate()?;
        Ok(config)
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::RunScenario {
            scenario,
            seed,
            engine,
            save_replay: save_path,
        } => {
            run_scenario(scenario, seed, &engine, save_path.as_deref())?;
        }
        Commands::Replay { input, engine } => {
            run_replay(&input, &engine)?;
        }
    }

    Ok(())
}

/// Outcome of pushing a whole log through one engine.
struct RunSummary {
    engine: ViolationEngine,
    frames_rejected: u64,
    elapsed_s: f64,
}

fn process_frames(mut engine: ViolationEngine, frames: &[ReplayFrame]) -> Result<RunSummary> {
    let start = std::time::Instant::now();
    let mut frames_rejected = 0;

    for frame in frames {
        if let Err(e) = engine.process_frame(frame.phase, &frame.detections, frame.frame_index) {
            warn!(error = %e, "frame skipped");
            frames_rejected += 1;
        }
    }
    engine.flush_audit().context("flushing audit log")?;

    Ok(RunSummary {
        engine,
        frames_rejected,
        elapsed_s: start.elapsed().as_secs_f64(),
    })
}

fn evaluate(log: &ReplayLog, args: &EngineArgs) -> Result<()> {
    let config = args.engine_config(log.stop_line)?;
    if config.stop_line.is_none() {
        warn!("no stop line configured; tracks will be followed but nothing is counted");
    }

    let mut engine = ViolationEngine::new(config.clone())?;
    if let Some(path) = &args.audit_log {
        let sink = JsonLinesSink::append_to(path)
            .with_context(|| format!("opening audit log {}", path.display()))?;
        engine = engine.with_audit_sink(Box::new(sink));
    }

    let run = process_frames(engine, &log.frames)?;
    let stats = run.engine.stats();
    let violated: Vec<i64> = run.engine.violated_ids().iter().map(|id| id.0).collect();

    println!(
        "Done: {} frames ({} rejected), {} detections ({} malformed), elapsed={:.3}s",
        stats.frames_processed,
        run.frames_rejected,
        stats.detections_seen,
        stats.detections_rejected,
        run.elapsed_s,
    );
    println!(
        "Violations: {} over {} phase transitions, {} tracks expired",
        run.engine.violation_count(),
        stats.phase_transitions,
        stats.tracks_expired,
    );

    // Same config, noise-free input: what a perfect detector would have produced
    let ground_truth_violations = if log.ground_truth.is_empty() {
        None
    } else {
        let gt = process_frames(ViolationEngine::new(config)?, &log.ground_truth)?;
        println!("Ground truth violations: {}", gt.engine.violation_count());
        Some(gt.engine.violation_count())
    };

    if let Some(path) = &args.audit_log {
        println!("Audit log appended to {}", path.display());
    }

    if let Some(opath) = &args.output {
        let json = serde_json::json!({
            "scenario": log.scenario_name,
            "seed": log.seed,
            "elapsed_s": run.elapsed_s,
            "frames_rejected": run.frames_rejected,
            "violations": run.engine.violation_count(),
            "violated_ids": violated,
            "ground_truth_violations": ground_truth_violations,
            "stats": stats,
        });
        std::fs::write(opath, serde_json::to_string_pretty(&json)?)?;
        println!("Metrics saved to {}", opath.display());
    }

    Ok(())
}

fn run_scenario(
    kind: ScenarioKind,
    seed: u64,
    args: &EngineArgs,
    replay_path: Option<&Path>,
) -> Result<()> {
    let scenario = Scenario::build(kind, seed);
    println!(
        "Running scenario '{}' (seed={}, frames={}, vehicles={})...",
        scenario.name,
        seed,
        scenario.frames,
        scenario.vehicles.len()
    );

    let log = scenario.generate_log();

    if let Some(rpath) = replay_path {
        save_replay(&log, rpath)?;
        println!("Replay saved to {}", rpath.display());
    }

    evaluate(&log, args)
}

fn run_replay(input: &Path, args: &EngineArgs) -> Result<()> {
    let log = load_replay(input)
        .with_context(|| format!("loading replay {}", input.display()))?;
    println!(
        "Replaying '{}' ({} frames)...",
        log.scenario_name,
        log.frames.len()
    );
    evaluate(&log, args)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> EngineArgs {
        EngineArgs {
            config: None,
            ttl: None,
            no_ttl: false,
            audit_log: None,
            output: None,
        }
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn recorded_line_fills_missing_config_line() {
        let log = Scenario::build(ScenarioKind::Simple, 0).generate_log();
        let cfg = args().engine_config(log.stop_line).unwrap();
        assert_eq!(cfg.stop_line, log.stop_line);
    }

    #[test]
    fn ttl_flags_override_config() {
        let mut a = args();
        a.ttl = Some(5);
        assert_eq!(a.engine_config(None).unwrap().track_ttl, Some(5));
        a.ttl = Some(0);
        assert!(a.engine_config(None).is_err());
        a.ttl = None;
        a.no_ttl = true;
        assert_eq!(a.engine_config(None).unwrap().track_ttl, None);
    }

    #[test]
    fn scenario_replay_writes_audit_and_metrics() {
        let dir = tempfile::tempdir().unwrap();
        let mut a = args();
        a.audit_log = Some(dir.path().join("audit.jsonl"));
        a.output = Some(dir.path().join("metrics.json"));
        let log = Scenario::build(ScenarioKind::Simple, 0).generate_log();
        evaluate(&log, &a).unwrap();

        let audit = std::fs::read_to_string(dir.path().join("audit.jsonl")).unwrap();
        assert_eq!(audit.lines().count(), 2);
        let metrics: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(dir.path().join("metrics.json")).unwrap())
                .unwrap();
        assert_eq!(metrics["violations"], 2);
        assert_eq!(metrics["ground_truth_violations"], 2);
    }
}
