/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

use std::path::PathBuf;
use std::process;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info, warn};

use schedsim::config::{PolicyKind, SimConfig};
use schedsim::engine::{Engine, PacedObserver, RunResult};
use schedsim::metrics::{log_comparison, AggregateMetrics, MetricsCollector};
use schedsim::policy::build_policy;
use schedsim::task::Ticks;
use schedsim::workload::load_workload;

// ── CLI argument definition ───────────────────────────────────────────────────

/// Which policies to run over the workload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PolicyChoice {
    One(PolicyKind),
    Both,
}

impl PolicyChoice {
    fn kinds(self) -> Vec<PolicyKind> {
        match self {
            PolicyChoice::One(kind) => vec![kind],
            PolicyChoice::Both => vec![PolicyKind::FixedPriority, PolicyKind::Mlfq],
        }
    }
}

fn parse_policy_choice(s: &str) -> Result<PolicyChoice, String> {
    if s == "both" {
        return Ok(PolicyChoice::Both);
    }
    s.parse::<PolicyKind>()
        .map(PolicyChoice::One)
        .map_err(|e| e.to_string())
}

/// CPU scheduling simulator.
///
/// Example:
///   schedsim --workload workload.yaml --policy both --seed 7
#[derive(Debug, Parser)]
#[command(
    name = "schedsim",
    about = "Virtual-clock CPU scheduling simulator (fixed-priority RR and MLFQ)",
    long_about = None,
)]
struct Cli {
    /// Path to the YAML workload file.
    #[arg(short = 'w', long = "workload")]
    workload: PathBuf,

    /// Path to the YAML simulation configuration.  Defaults to the reference
    /// MLFQ design.
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// Policy to run: fixed-priority, mlfq or both.  Overrides the config file.
    #[arg(short = 'p', long = "policy", value_parser = parse_policy_choice)]
    policy: Option<PolicyChoice>,

    /// Seed for randomized promotion.  Overrides the config file.
    #[arg(short = 's', long = "seed")]
    seed: Option<u64>,

    /// Uniform quantum for every bounded level.  Overrides the config file.
    #[arg(short = 'q', long = "quantum")]
    quantum: Option<Ticks>,

    /// Wall-clock microseconds to sleep per simulated tick (0 = no pacing).
    #[arg(long = "pace-us-per-tick", default_value_t = 0)]
    pace_us_per_tick: u64,

    /// Also log one line per finished task.
    #[arg(long = "per-task", default_value_t = false)]
    per_task: bool,
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() {
    // Level is controlled by the RUST_LOG env-var (e.g. RUST_LOG=debug).
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    info!(
        workload = %cli.workload.display(),
        config = ?cli.config,
        policy = ?cli.policy,
        seed = ?cli.seed,
        quantum = ?cli.quantum,
        pace_us_per_tick = cli.pace_us_per_tick,
        "schedsim starting"
    );

    if let Err(e) = run(&cli) {
        error!("{:#}", e);
        process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    // ── Configuration ─────────────────────────────────────────────────────────
    let mut base = match &cli.config {
        Some(path) => SimConfig::load_from_file(path)?,
        None => {
            warn!("No configuration file provided, using the reference MLFQ design");
            SimConfig::default()
        }
    };
    if let Some(seed) = cli.seed {
        base.seed = seed;
    }
    let choice = cli.policy.unwrap_or(PolicyChoice::One(base.policy));

    // ── Workload ──────────────────────────────────────────────────────────────
    let tasks = load_workload(&cli.workload)?;

    // ── Runs ──────────────────────────────────────────────────────────────────
    let mut summaries: Vec<AggregateMetrics> = Vec::new();
    for kind in choice.kinds() {
        let mut config = base.clone().with_policy(kind);
        if let Some(q) = cli.quantum {
            config = config.with_uniform_quantum(q);
        }

        let policy = build_policy(&config).with_context(|| format!("Invalid {kind} configuration"))?;
        let mut engine = Engine::new(&tasks, policy)?;
        let result: RunResult = if cli.pace_us_per_tick > 0 {
            engine.run_with(PacedObserver::new(Duration::from_micros(cli.pace_us_per_tick)))?
        } else {
            engine.run()?
        };

        let collector = MetricsCollector::from_config(&config);
        if cli.per_task {
            for t in collector.per_task(&result) {
                info!(
                    "  [{policy}] task {id:>4}  arrival={arr:<6} exec={exec:<6} turnaround={tat:<6} wait={wait:<6} response={resp:<6} slices={slices} levels {from}->{to}",
                    policy = result.policy,
                    id = t.id,
                    arr = t.arrival_time,
                    exec = t.execution_time,
                    tat = t.turnaround,
                    wait = t.wait,
                    resp = t.response,
                    slices = t.cpu_slices,
                    from = t.initial_level,
                    to = t.final_level,
                );
            }
        }

        let summary = collector.aggregate(&result);
        summary.log_summary();
        summaries.push(summary);
    }

    if summaries.len() > 1 {
        log_comparison(&summaries);
    }
    Ok(())
}
