/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Simulation engine.
//!
//! [`Engine`] owns the task registry, the ready queues and the virtual clock,
//! and drives one [`SchedulingPolicy`] through the run loop:
//!
//! ```text
//!   ┌─► admit ─► on_tick ─► select ──None──► jump to next arrival ─┐
//!   │                         │               (or stall error)     │
//!   │                         ▼                                    │
//!   │     execute min(budget, remaining, horizon - clock)          │
//!   │                         │                                    │
//!   │     account wait time of every other arrived task            │
//!   │                         │                                    │
//!   └── FINISHED → ledger  /  READY → policy.requeue ◄─────────────┘
//! ```
//!
//! # Design decisions
//!
//! | Topic | Choice |
//! |---|---|
//! | State | One `Engine` per run; no process-wide globals |
//! | Task ownership | Registry `Vec<Task>`; queues hold indices |
//! | Admission order | Registry order among tasks arriving in the same step |
//! | Wait accounting | Exact: a task arriving mid-slice waits only from its arrival |
//! | Instrumentation | [`SimObserver`] receives immutable snapshots only |
//! | Invariant breaks | `assert!` / panic, never an `Err` |

pub mod clock;
pub mod error;
pub mod observer;
pub mod queues;

pub use clock::VirtualClock;
pub use error::{
    ConfigurationError, InvalidTaskError, InvalidTaskReason, SimulationError,
    SimulationStalledError,
};
pub use observer::{PacedObserver, RecordingObserver, SimEvent, SimObserver};
pub use queues::{QueueSet, TaskIdx};

use std::collections::HashSet;

use tracing::{debug, info, warn};

use crate::config::SimConfig;
use crate::policy::{build_policy, Dispatch, SchedulingPolicy, SliceOutcome};
use crate::task::{Level, Task, TaskId, TaskSpec, Ticks};

// ── Run output ────────────────────────────────────────────────────────────────

/// One CPU slice, in grant order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SliceRecord {
    pub task: TaskId,
    /// Level the task ran at.
    pub level: Level,
    pub start: Ticks,
    pub length: Ticks,
    /// The slice resumed a grant cut at a preemption horizon.
    pub continuation: bool,
}

impl SliceRecord {
    pub fn end(&self) -> Ticks {
        self.start + self.length
    }
}

/// Everything a run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct RunResult {
    pub policy: &'static str,
    /// Finished tasks in completion order.
    pub finished: Vec<Task>,
    /// Final clock value (`busy + idle`).
    pub elapsed: Ticks,
    pub busy: Ticks,
    pub idle: Ticks,
    /// Number of distinct grants across all tasks.
    pub context_switches: u64,
    pub slices: Vec<SliceRecord>,
}

impl RunResult {
    /// Slices of one task, in grant order.
    pub fn slices_of(&self, task: TaskId) -> impl Iterator<Item = &SliceRecord> + '_ {
        self.slices.iter().filter(move |s| s.task == task)
    }

    /// Finished record of `task`, if it finished.
    pub fn task(&self, task: TaskId) -> Option<&Task> {
        self.finished.iter().find(|t| t.id == task)
    }

    /// Ids in completion order.
    pub fn completion_order(&self) -> Vec<TaskId> {
        self.finished.iter().map(|t| t.id).collect()
    }
}

// ── Engine ────────────────────────────────────────────────────────────────────

pub struct Engine {
    policy: Box<dyn SchedulingPolicy>,
    tasks: Vec<Task>,
    queues: QueueSet,
    clock: VirtualClock,
    /// Not yet admitted, registry order.
    pending: Vec<TaskIdx>,
    /// Completion order.
    finished: Vec<TaskIdx>,
    context_switches: u64,
    slices: Vec<SliceRecord>,
}

impl Engine {
    /// Validate the workload against `policy` and build a ready-to-run engine.
    ///
    /// # Errors
    /// * [`InvalidTaskError`] for a zero execution time or a duplicate id.
    /// * [`ConfigurationError::PriorityOutOfRange`] for a priority that does
    ///   not name one of the policy's levels.
    pub fn new(specs: &[TaskSpec], policy: Box<dyn SchedulingPolicy>) -> Result<Self, SimulationError> {
        let levels = policy.levels();
        if levels == 0 {
            return Err(ConfigurationError::ZeroLevels.into());
        }

        let mut seen = HashSet::with_capacity(specs.len());
        for spec in specs {
            if spec.execution_time == 0 {
                return Err(InvalidTaskError {
                    task: spec.id,
                    reason: InvalidTaskReason::NonPositiveExecutionTime,
                }
                .into());
            }
            if !seen.insert(spec.id) {
                return Err(InvalidTaskError {
                    task: spec.id,
                    reason: InvalidTaskReason::DuplicateId,
                }
                .into());
            }
            if spec.priority >= levels {
                return Err(ConfigurationError::PriorityOutOfRange {
                    task: spec.id,
                    level: spec.priority,
                    levels,
                }
                .into());
            }
        }

        let tasks: Vec<Task> = specs.iter().map(Task::from_spec).collect();
        debug!(policy = policy.name(), tasks = tasks.len(), levels, "engine created");

        Ok(Self {
            pending: (0..tasks.len()).collect(),
            finished: Vec::with_capacity(tasks.len()),
            queues: QueueSet::new(levels),
            clock: VirtualClock::new(),
            context_switches: 0,
            slices: Vec::new(),
            policy,
            tasks,
        })
    }

    pub fn policy_name(&self) -> &'static str {
        self.policy.name()
    }

    pub fn now(&self) -> Ticks {
        self.clock.now()
    }

    /// Registry view, in workload order.
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn is_done(&self) -> bool {
        self.finished.len() == self.tasks.len()
    }

    /// Run to completion without instrumentation.
    pub fn run(&mut self) -> Result<RunResult, SimulationError> {
        self.run_with(())
    }

    /// Run to completion, reporting every step to `observer`.
    ///
    /// # Errors
    /// [`SimulationStalledError`] if unfinished tasks remain while nothing is
    /// ready and nothing will arrive.
    pub fn run_with<O: SimObserver>(&mut self, mut observer: O) -> Result<RunResult, SimulationError> {
        info!(
            policy = self.policy.name(),
            tasks = self.tasks.len(),
            levels = self.queues.levels(),
            "simulation started"
        );

        while !self.is_done() {
            self.admit(&mut observer);

            let now = self.clock.now();
            self.policy.on_tick(now, &mut self.tasks, &mut self.queues);

            match self.policy.select(&mut self.queues, &self.tasks, now) {
                Some(dispatch) => self.execute(dispatch, &mut observer),
                None => self.idle(&mut observer)?,
            }
        }

        let result = self.result();
        info!(
            policy = result.policy,
            finished = result.finished.len(),
            elapsed = result.elapsed,
            idle = result.idle,
            context_switches = result.context_switches,
            "simulation finished"
        );
        Ok(result)
    }

    /// Snapshot of the run so far.
    pub fn result(&self) -> RunResult {
        RunResult {
            policy: self.policy.name(),
            finished: self.finished.iter().map(|&i| self.tasks[i].clone()).collect(),
            elapsed: self.clock.now(),
            busy: self.clock.busy(),
            idle: self.clock.idle(),
            context_switches: self.context_switches,
            slices: self.slices.clone(),
        }
    }

    // ── Loop steps ────────────────────────────────────────────────────────────

    /// Queue every pending task whose arrival time has been reached.
    fn admit<O: SimObserver>(&mut self, observer: &mut O) {
        let now = self.clock.now();
        let tasks = &self.tasks;
        let queues = &mut self.queues;
        self.pending.retain(|&idx| {
            let task = &tasks[idx];
            if !task.has_arrived(now) {
                return true;
            }
            queues.push_back(task.priority_level, idx);
            debug!(clock = now, task = task.id, level = task.priority_level, "admitted");
            observer.on_event(&SimEvent::Admitted {
                clock: now,
                task: task.id,
                level: task.priority_level,
            });
            false
        });
    }

    /// Earliest arrival among tasks not yet admitted.
    fn next_arrival(&self) -> Option<Ticks> {
        self.pending.iter().map(|&i| self.tasks[i].arrival_time).min()
    }

    fn idle<O: SimObserver>(&mut self, observer: &mut O) -> Result<(), SimulationStalledError> {
        let from = self.clock.now();
        let Some(to) = self.next_arrival() else {
            let stuck: Vec<TaskId> = self
                .tasks
                .iter()
                .filter(|t| !t.is_finished())
                .map(|t| t.id)
                .collect();
            warn!(clock = from, stuck = ?stuck, "simulation stalled");
            return Err(SimulationStalledError { clock: from, stuck });
        };
        debug!(from, to, "CPU idle until next arrival");
        self.clock.jump_to(to);
        observer.on_event(&SimEvent::IdleJump { from, to });
        Ok(())
    }

    fn execute<O: SimObserver>(&mut self, dispatch: Dispatch, observer: &mut O) {
        let Dispatch {
            idx,
            budget,
            continuation,
        } = dispatch;
        assert!(!self.queues.contains(idx), "dispatched task {idx} is still queued");

        let start = self.clock.now();
        let horizon = self.policy.preemption_horizon(start, self.next_arrival());

        // ── Execute ───────────────────────────────────────────────────────────
        let task = &mut self.tasks[idx];
        let (id, level) = (task.id, task.priority_level);
        let mut length = budget.cap(task.remaining_time);
        if let Some(h) = horizon {
            debug_assert!(h > start, "horizon {h} not after clock {start}");
            if h > start {
                length = length.min(h - start);
            }
        }
        assert!(length > 0, "zero-length slice for task {id}");

        task.mark_running(start);
        if !continuation {
            task.cpu_slices += 1;
            self.context_switches += 1;
        }
        observer.on_event(&SimEvent::Dispatched {
            clock: start,
            task: id,
            level,
            budget,
            continuation,
        });

        task.consume(length);
        let remaining = task.remaining_time;
        let end = self.clock.advance(length);
        debug_assert!(end >= start, "clock moved backwards");

        debug!(task = id, level, start, length, remaining, continuation, "slice");
        self.slices.push(SliceRecord {
            task: id,
            level,
            start,
            length,
            continuation,
        });
        observer.on_event(&SimEvent::SliceCompleted {
            clock: end,
            task: id,
            ran: length,
            remaining,
        });

        // ── Account ───────────────────────────────────────────────────────────
        for (other, t) in self.tasks.iter_mut().enumerate() {
            if other == idx || t.is_finished() || t.arrival_time >= end {
                continue;
            }
            t.wait_time += end - t.arrival_time.max(start);
        }

        // ── Transition ────────────────────────────────────────────────────────
        let task = &mut self.tasks[idx];
        if remaining == 0 {
            task.mark_finished(end);
            self.finished.push(idx);
            debug!(
                task = id,
                clock = end,
                turnaround = ?task.turnaround_time,
                wait = task.wait_time,
                "task finished"
            );
            observer.on_event(&SimEvent::Finished { clock: end, task: id });
        } else {
            task.mark_ready();
            let outcome = if budget.is_exhausted_by(length) {
                SliceOutcome::QuantumExpired { ran: length }
            } else {
                SliceOutcome::Interrupted { ran: length }
            };
            self.policy.requeue(idx, task, outcome, &mut self.queues);
        }
    }
}

/// Build the policy named by `config` and run `specs` through it.
pub fn simulate(specs: &[TaskSpec], config: &SimConfig) -> Result<RunResult, SimulationError> {
    let policy = build_policy(config)?;
    Engine::new(specs, policy)?.run()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
