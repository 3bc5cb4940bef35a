/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Per-task and aggregate statistics over a finished run.
//!
//! Reads [`RunResult`] only.  Every ratio whose denominator can be zero
//! (averages over an empty ledger, throughput over zero elapsed time) is an
//! `Option`: `None` means "undefined", never `NaN` and never a panic.
//!
//! | Metric | Definition |
//! |---|---|
//! | turnaround | `end_time - arrival_time` |
//! | wait | time arrived, unfinished and off the CPU |
//! | response | `start_time - arrival_time` |
//! | throughput | `finished / elapsed × throughput_unit` |
//! | CPU utilisation | `busy / elapsed` |

use tracing::info;

use crate::config::SimConfig;
use crate::engine::RunResult;
use crate::task::{Level, Task, TaskId, Ticks};

// ── Per task ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskMetrics {
    pub id: TaskId,
    pub arrival_time: Ticks,
    pub execution_time: Ticks,
    pub initial_level: Level,
    pub final_level: Level,
    pub start_time: Ticks,
    pub end_time: Ticks,
    pub turnaround: Ticks,
    pub wait: Ticks,
    pub response: Ticks,
    pub cpu_slices: u32,
    pub level_changes: u32,
}

impl TaskMetrics {
    /// `None` unless `task` is FINISHED.
    pub fn from_task(task: &Task) -> Option<Self> {
        Some(Self {
            id: task.id,
            arrival_time: task.arrival_time,
            execution_time: task.total_execution_time,
            initial_level: task.initial_level,
            final_level: task.priority_level,
            start_time: task.start_time?,
            end_time: task.end_time?,
            turnaround: task.turnaround_time?,
            wait: task.wait_time,
            response: task.response_time?,
            cpu_slices: task.cpu_slices,
            level_changes: task.level_changes,
        })
    }
}

// ── Aggregate ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct AggregateMetrics {
    pub policy: &'static str,
    pub finished: usize,
    pub avg_turnaround: Option<f64>,
    pub avg_wait: Option<f64>,
    pub avg_response: Option<f64>,
    /// Longest single-task wait; a starvation indicator.
    pub max_wait: Option<Ticks>,
    /// Finished tasks per `throughput_unit` ticks.
    pub throughput: Option<f64>,
    pub cpu_utilisation: Option<f64>,
    pub elapsed: Ticks,
    pub idle: Ticks,
    pub context_switches: u64,
    pub total_cpu_slices: u64,
    pub total_level_changes: u64,
}

impl AggregateMetrics {
    /// One `info!` line per figure, prefixed by the policy name.
    pub fn log_summary(&self) {
        info!(
            policy = self.policy,
            finished = self.finished,
            elapsed = self.elapsed,
            idle = self.idle,
            context_switches = self.context_switches,
            "run summary"
        );
        info!(
            "  [{}] avg turnaround={}  avg wait={}  avg response={}  max wait={}",
            self.policy,
            fmt_opt(self.avg_turnaround),
            fmt_opt(self.avg_wait),
            fmt_opt(self.avg_response),
            self.max_wait.map_or_else(|| "undefined".to_string(), |w| w.to_string()),
        );
        info!(
            "  [{}] throughput={}  cpu utilisation={}  slices={}  level changes={}",
            self.policy,
            fmt_opt(self.throughput),
            fmt_opt(self.cpu_utilisation),
            self.total_cpu_slices,
            self.total_level_changes,
        );
    }
}

fn fmt_opt(value: Option<f64>) -> String {
    value.map_or_else(|| "undefined".to_string(), |v| format!("{v:.2}"))
}

fn mean(values: impl ExactSizeIterator<Item = Ticks>) -> Option<f64> {
    let n = values.len();
    if n == 0 {
        return None;
    }
    let sum: u128 = values.map(u128::from).sum();
    Some(sum as f64 / n as f64)
}

// ── Collector ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsCollector {
    throughput_unit: Ticks,
}

impl MetricsCollector {
    /// `throughput_unit` of `0` is treated as `1`.
    pub fn new(throughput_unit: Ticks) -> Self {
        Self {
            throughput_unit: throughput_unit.max(1),
        }
    }

    pub fn from_config(config: &SimConfig) -> Self {
        Self::new(config.throughput_unit)
    }

    /// Metrics of every finished task, in completion order.
    pub fn per_task(&self, run: &RunResult) -> Vec<TaskMetrics> {
        run.finished.iter().filter_map(TaskMetrics::from_task).collect()
    }

    pub fn aggregate(&self, run: &RunResult) -> AggregateMetrics {
        let tasks = self.per_task(run);

        let throughput = (run.elapsed > 0)
            .then(|| tasks.len() as f64 * self.throughput_unit as f64 / run.elapsed as f64);
        let cpu_utilisation = (run.elapsed > 0).then(|| run.busy as f64 / run.elapsed as f64);

        AggregateMetrics {
            policy: run.policy,
            finished: tasks.len(),
            avg_turnaround: mean(tasks.iter().map(|t| t.turnaround)),
            avg_wait: mean(tasks.iter().map(|t| t.wait)),
            avg_response: mean(tasks.iter().map(|t| t.response)),
            max_wait: tasks.iter().map(|t| t.wait).max(),
            throughput,
            cpu_utilisation,
            elapsed: run.elapsed,
            idle: run.idle,
            context_switches: run.context_switches,
            total_cpu_slices: tasks.iter().map(|t| u64::from(t.cpu_slices)).sum(),
            total_level_changes: tasks.iter().map(|t| u64::from(t.level_changes)).sum(),
        }
    }
}

/// Side-by-side log of several runs over the same workload.
pub fn log_comparison(runs: &[AggregateMetrics]) {
    info!("{:<16} {:>12} {:>12} {:>12} {:>12} {:>10}", "policy", "turnaround", "wait", "response", "throughput", "switches");
    for m in runs {
        info!(
            "{:<16} {:>12} {:>12} {:>12} {:>12} {:>10}",
            m.policy,
            fmt_opt(m.avg_turnaround),
            fmt_opt(m.avg_wait),
            fmt_opt(m.avg_response),
            fmt_opt(m.throughput),
            m.context_switches,
        );
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
