/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Core task data structures for the scheduling simulator.
//!
//! Two distinct types model the two sides of a simulation run:
//!
//! ```text
//! workload file ──►  TaskSpec  ──(Engine::new)──►  Task  ──(run)──►  finished ledger
//!                    ↑ input                        ↑ mutable working record
//!                    immutable descriptor            snapshot once FINISHED
//! ```
//!
//! # Ownership model
//! `Task` is **owned** by the [`Engine`](crate::engine::Engine) registry for
//! the whole run.  Queues only hold registry indices, so a task is never
//! aliased mutably.  Finished tasks are cloned into the ledger and are not
//! touched again.

use serde::Deserialize;

/// Simulated time, in ticks.  The reference workloads use milliseconds.
pub type Ticks = u64;

/// Queue / priority level.  Level `0` is the highest priority.
pub type Level = usize;

/// Caller-supplied task identifier, unique within a workload.
pub type TaskId = u32;

// ── Task state ────────────────────────────────────────────────────────────────

/// Lifecycle state of a task.
///
/// ```text
/// READY ──select──► RUNNING ──slice ends, remaining > 0──► READY
///                      │
///                      └──remaining == 0──► FINISHED (terminal)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TaskState {
    #[default]
    Ready,
    Running,
    Finished,
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TaskState::Ready => "READY",
            TaskState::Running => "RUNNING",
            TaskState::Finished => "FINISHED",
        };
        f.write_str(s)
    }
}

// ── TaskSpec (input descriptor) ───────────────────────────────────────────────

/// One task descriptor as produced by the workload collaborator.
///
/// Validation (`execution_time > 0`, unique ids, priority in range) happens
/// in [`Engine::new`](crate::engine::Engine::new), not here, so descriptors
/// can be built freely in tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct TaskSpec {
    pub id: TaskId,
    pub execution_time: Ticks,
    #[serde(default)]
    pub priority: Level,
    #[serde(default)]
    pub arrival_time: Ticks,
}

impl TaskSpec {
    pub fn new(id: TaskId, execution_time: Ticks, priority: Level, arrival_time: Ticks) -> Self {
        Self {
            id,
            execution_time,
            priority,
            arrival_time,
        }
    }
}

// ── Task (working record) ─────────────────────────────────────────────────────

/// Mutable schedule record for one task.
///
/// The derived timestamps are `Option`s rather than sentinel values: a task
/// that never ran has no `start_time`, not a start time of `0`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    // ── Identity / workload ───────────────────────────────────────────────────
    pub id: TaskId,
    pub total_execution_time: Ticks,
    /// Never increases; reaches exactly `0` at completion.
    pub remaining_time: Ticks,
    pub arrival_time: Ticks,

    // ── Scheduling attributes ─────────────────────────────────────────────────
    /// Level the task entered the simulation with.
    pub initial_level: Level,
    /// Current level.  Only the MLFQ policy moves it.
    pub priority_level: Level,
    pub state: TaskState,

    // ── Derived timestamps ────────────────────────────────────────────────────
    pub start_time: Option<Ticks>,
    pub end_time: Option<Ticks>,
    pub response_time: Option<Ticks>,
    pub turnaround_time: Option<Ticks>,
    /// Time spent arrived, unfinished and off the CPU.
    pub wait_time: Ticks,

    // ── Counters ──────────────────────────────────────────────────────────────
    /// Distinct execution grants.
    pub cpu_slices: u32,
    /// Promotions plus demotions.
    pub level_changes: u32,
}

impl Task {
    /// Build the initial READY record from a descriptor.
    pub fn from_spec(spec: &TaskSpec) -> Self {
        Self {
            id: spec.id,
            total_execution_time: spec.execution_time,
            remaining_time: spec.execution_time,
            arrival_time: spec.arrival_time,
            initial_level: spec.priority,
            priority_level: spec.priority,
            state: TaskState::Ready,
            start_time: None,
            end_time: None,
            response_time: None,
            turnaround_time: None,
            wait_time: 0,
            cpu_slices: 0,
            level_changes: 0,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.state == TaskState::Finished
    }

    /// `true` once the task's arrival time has been reached at `clock`.
    pub fn has_arrived(&self, clock: Ticks) -> bool {
        self.arrival_time <= clock
    }

    /// READY → RUNNING.  Records `start_time` / `response_time` on the first
    /// grant only.
    pub fn mark_running(&mut self, clock: Ticks) {
        debug_assert_eq!(self.state, TaskState::Ready, "task {} not READY", self.id);
        self.state = TaskState::Running;
        if self.start_time.is_none() {
            self.start_time = Some(clock);
            self.response_time = Some(clock - self.arrival_time);
        }
    }

    /// RUNNING → READY after a slice that did not finish the task.
    pub fn mark_ready(&mut self) {
        debug_assert_eq!(self.state, TaskState::Running, "task {} not RUNNING", self.id);
        debug_assert!(self.remaining_time > 0, "task {} has no work left", self.id);
        self.state = TaskState::Ready;
    }

    /// Consume `ticks` of CPU time.
    ///
    /// # Panics
    /// If `ticks` exceeds `remaining_time`; remaining time never goes negative.
    pub fn consume(&mut self, ticks: Ticks) {
        assert!(
            ticks <= self.remaining_time,
            "task {} would overrun: slice {} > remaining {}",
            self.id,
            ticks,
            self.remaining_time
        );
        self.remaining_time -= ticks;
    }

    /// RUNNING → FINISHED.  Terminal.
    pub fn mark_finished(&mut self, clock: Ticks) {
        assert_eq!(self.remaining_time, 0, "task {} finished early", self.id);
        assert!(!self.is_finished(), "task {} finished twice", self.id);
        self.state = TaskState::Finished;
        self.end_time = Some(clock);
        self.turnaround_time = Some(clock - self.arrival_time);
    }

    /// Move to `level`, counting the change if it is one.
    pub fn set_level(&mut self, level: Level) {
        if level != self.priority_level {
            self.priority_level = level;
            self.level_changes += 1;
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
