/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Structured error types for the simulation engine.
//!
//! Three failure layers, one type each:
//!
//! * [`ConfigurationError`]: policy parameters or task priorities that make
//!   the run meaningless.  Raised before the first iteration.
//! * [`InvalidTaskError`]: a single task descriptor is unusable (carries an
//!   [`InvalidTaskReason`]).
//! * [`SimulationStalledError`]: unfinished tasks remain but nothing is ready
//!   and nothing will arrive.
//!
//! [`SimulationError`] wraps all three for callers that do not care which
//! layer failed.  Engine invariant violations (negative remaining time,
//! duplicate queue membership, a clock moving backwards) are **not** modelled
//! here: they panic.

use thiserror::Error;

use crate::task::{Level, TaskId, Ticks};

// ── Configuration ─────────────────────────────────────────────────────────────

/// Invalid policy / run parameters.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigurationError {
    #[error("number of levels must be at least 1")]
    ZeroLevels,

    #[error("level {level} has a non-positive quantum")]
    NonPositiveQuantum { level: Level },

    #[error("expected {expected} quanta (one per level) but {actual} were configured")]
    QuantumCountMismatch { expected: usize, actual: usize },

    /// A task's priority does not name a configured level.
    #[error("task {task} has priority level {level}, valid levels are 0..{levels}")]
    PriorityOutOfRange {
        task: TaskId,
        level: Level,
        levels: usize,
    },

    #[error("{timer} promotion interval must be positive")]
    ZeroPromotionInterval { timer: &'static str },

    #[error("randomized promotion fraction {0} is outside (0, 1]")]
    InvalidPromotionFraction(f64),

    #[error("throughput time unit must be positive")]
    ZeroThroughputUnit,

    #[error("unknown policy '{0}' (valid: fixed-priority, mlfq)")]
    UnknownPolicy(String),
}

// ── Task descriptors ──────────────────────────────────────────────────────────

/// Why a task descriptor was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidTaskReason {
    /// `execution_time == 0`: the task would finish without ever running.
    NonPositiveExecutionTime,

    /// Another descriptor in the same workload already uses this id.
    DuplicateId,
}

impl std::fmt::Display for InvalidTaskReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InvalidTaskReason::NonPositiveExecutionTime => {
                write!(f, "total execution time must be positive")
            }
            InvalidTaskReason::DuplicateId => write!(f, "task id is not unique in the workload"),
        }
    }
}

/// A task rejected at admission.  Distinct from normal completion.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("task {task} rejected: {reason}")]
pub struct InvalidTaskError {
    pub task: TaskId,
    pub reason: InvalidTaskReason,
}

// ── Stall ─────────────────────────────────────────────────────────────────────

/// No ready task, no future arrival, but unfinished tasks remain.
///
/// `stuck` lists the unfinished task ids in registry order.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("simulation stalled at clock {clock} with {} unfinished task(s): {stuck:?}", stuck.len())]
pub struct SimulationStalledError {
    pub clock: Ticks,
    pub stuck: Vec<TaskId>,
}

// ── Top-level ─────────────────────────────────────────────────────────────────

/// Any failure returned by [`Engine`](super::Engine) or
/// [`simulate`](super::simulate).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimulationError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    InvalidTask(#[from] InvalidTaskError),

    #[error(transparent)]
    Stalled(#[from] SimulationStalledError),
}
