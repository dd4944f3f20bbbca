//! CLI entrypoint for the adaptdiff harness.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};

use adaptdiff_core::{Axis, DdaConfig};
use adaptdiff_harness::scenario::{RunReport, Scenario, ScenarioRunner};
use adaptdiff_harness::structured_log::{ArtifactIndex, LogEmitter, validate_log_file};
use adaptdiff_harness::synthetic::{SyntheticPlayer, simulate};

/// Replay and simulation tooling for the adaptive difficulty director.
#[derive(Debug, Parser)]
#[command(name = "adaptdiff-harness")]
#[command(about = "Scenario replay and closed-loop simulation for adaptdiff")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Replay a scenario file frame by frame.
    Replay {
        /// Scenario JSON path.
        #[arg(long)]
        scenario: PathBuf,
        /// Structured JSONL log output path.
        #[arg(long)]
        log: Option<PathBuf>,
        /// Run report JSON output path (if omitted, prints a summary).
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Run a synthetic player against the director.
    Simulate {
        /// Player skill in [0, 1].
        #[arg(long)]
        skill: f64,
        /// Simulated seconds.
        #[arg(long, default_value_t = 300.0)]
        seconds: f64,
        /// Frame length in seconds.
        #[arg(long, default_value_t = 0.1)]
        dt: f64,
        /// PRNG seed.
        #[arg(long, default_value_t = 1)]
        seed: u64,
        /// Optional config JSON; environment overrides apply on top.
        #[arg(long)]
        config: Option<PathBuf>,
        /// Structured JSONL log output path.
        #[arg(long)]
        log: Option<PathBuf>,
        /// Run report JSON output path.
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Validate a structured JSONL log.
    ValidateLog {
        /// JSONL log path.
        #[arg(long)]
        log: PathBuf,
    },
}

fn open_log(path: Option<&Path>, scope: &str, run_id: &str) -> std::io::Result<Option<LogEmitter>> {
    path.map(|p| LogEmitter::to_file(p, scope, run_id)).transpose()
}

fn run_id(label: &str) -> String {
    let secs = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();
    format!("{label}-{secs}")
}

fn write_outputs(
    report: &RunReport,
    run_id: &str,
    log: Option<&Path>,
    report_path: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut index = ArtifactIndex::new(run_id);
    if let Some(path) = log {
        index.add_file(path, "structured_log")?;
    }
    if let Some(path) = report_path {
        std::fs::write(path, report.to_json()?)?;
        index.add_file(path, "run_report")?;
        eprintln!("Report written to {}", path.display());
    }
    if !index.artifacts.is_empty() {
        let index_path = report_path
            .or(log)
            .map(|p| p.with_extension("index.json"))
            .unwrap_or_else(|| PathBuf::from("artifact_index.json"));
        std::fs::write(&index_path, index.to_json()?)?;
        eprintln!("Artifact index written to {}", index_path.display());
    }
    Ok(())
}

fn print_summary(report: &RunReport) {
    println!(
        "{}: {} frames, {:.1}s simulated, {} decision steps, {} applications",
        report.name, report.frames, report.sim_seconds, report.decision_steps, report.applications
    );
    for axis in Axis::ALL {
        println!("  {:<4} {:.4}", axis.short_label(), report.multiplier(axis));
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Command::Replay {
            scenario,
            log,
            report,
        } => {
            let parsed = Scenario::from_file(&scenario)?;
            let label = if parsed.name.is_empty() {
                "replay".to_string()
            } else {
                parsed.name.clone()
            };
            let id = run_id(&label);
            let emitter = open_log(log.as_deref(), "replay", &id)?;
            let (run, _) = ScenarioRunner::run(&parsed, emitter)?;
            print_summary(&run);
            write_outputs(&run, &id, log.as_deref(), report.as_deref())?;
        }
        Command::Simulate {
            skill,
            seconds,
            dt,
            seed,
            config,
            log,
            report,
        } => {
            let mut cfg = match config {
                Some(path) => DdaConfig::from_file(&path)?,
                None => DdaConfig::adaptive(),
            };
            cfg.apply_env_overrides();
            let mut player = SyntheticPlayer::new(skill, seed)?;
            let id = run_id(&format!("simulate-s{seed}"));
            let emitter = open_log(log.as_deref(), "simulate", &id)?;
            let (run, _) = simulate(cfg, &mut player, seconds, dt, emitter)?;
            print_summary(&run);
            println!("  kills {} deaths {}", player.kills(), player.deaths());
            write_outputs(&run, &id, log.as_deref(), report.as_deref())?;
        }
        Command::ValidateLog { log } => {
            let (lines, errors) = validate_log_file(&log)?;
            if errors.is_empty() {
                println!("{}: {lines} lines, all valid", log.display());
            } else {
                for error in &errors {
                    eprintln!("{error}");
                }
                eprintln!(
                    "{}: {lines} lines, {} validation errors",
                    log.display(),
                    errors.len()
                );
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
