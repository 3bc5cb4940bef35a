//! Scheduling policies.
//!
//! Every policy answers the same four questions for the [`Engine`]:
//!
//! | Hook | Question |
//! |---|---|
//! | [`on_tick`](SchedulingPolicy::on_tick) | Any housekeeping (promotion timers) before selection? |
//! | [`select`](SchedulingPolicy::select) | Which queued task runs next, with what budget? |
//! | [`preemption_horizon`](SchedulingPolicy::preemption_horizon) | Must the slice stop early at some future instant? |
//! | [`requeue`](SchedulingPolicy::requeue) | Where does an unfinished task go after its slice? |
//!
//! Two variants are provided:
//!
//! * [`FixedPriorityRoundRobin`]: static levels, strict priority between
//!   levels, round-robin inside a level.  Lower levels can starve; that is a
//!   property of the discipline.
//! * [`MultiLevelFeedbackQueue`]: demotion on quantum exhaustion, preemption
//!   by higher-level arrivals, global and randomized promotion timers.
//!
//! [`Engine`]: crate::engine::Engine

pub mod fixed_priority;
pub mod mlfq;

pub use fixed_priority::FixedPriorityRoundRobin;
pub use mlfq::MultiLevelFeedbackQueue;

use crate::config::{PolicyKind, SimConfig};
use crate::engine::error::ConfigurationError;
use crate::engine::queues::{QueueSet, TaskIdx};
use crate::task::{Level, Task, Ticks};

// ── Quantum ───────────────────────────────────────────────────────────────────

/// Time-slice budget of one level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quantum {
    Finite(Ticks),
    /// First-come-first-served: runs until done or preempted.
    Unbounded,
}

impl Quantum {
    /// Budget left after `used` ticks of this quantum have been spent.
    pub fn remaining_after(self, used: Ticks) -> Quantum {
        match self {
            Quantum::Finite(q) => Quantum::Finite(q.saturating_sub(used)),
            Quantum::Unbounded => Quantum::Unbounded,
        }
    }

    /// `min(self, ticks)`.
    pub fn cap(self, ticks: Ticks) -> Ticks {
        match self {
            Quantum::Finite(q) => q.min(ticks),
            Quantum::Unbounded => ticks,
        }
    }

    /// `true` if a slice of `ran` ticks used up this whole budget.
    pub fn is_exhausted_by(self, ran: Ticks) -> bool {
        matches!(self, Quantum::Finite(q) if ran >= q)
    }
}

impl std::fmt::Display for Quantum {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Quantum::Finite(q) => write!(f, "{q}"),
            Quantum::Unbounded => f.write_str("unbounded"),
        }
    }
}

// ── Dispatch / outcome ────────────────────────────────────────────────────────

/// Selection result: which task runs and for at most how long.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dispatch {
    pub idx: TaskIdx,
    pub budget: Quantum,
    /// The task resumes a grant that was cut at a preemption horizon.  The
    /// engine does not count a new grant or a context switch for it.
    pub continuation: bool,
}

/// How a slice of an unfinished task ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SliceOutcome {
    /// The dispatch budget was used up.
    QuantumExpired { ran: Ticks },
    /// The slice stopped at the policy's preemption horizon with budget left.
    Interrupted { ran: Ticks },
}

// ── Policy capability ─────────────────────────────────────────────────────────

pub trait SchedulingPolicy {
    /// Short identifier used in logs and reports.
    fn name(&self) -> &'static str;

    /// Number of levels the engine must allocate queues for.
    fn levels(&self) -> usize;

    /// Quantum granted to a fresh dispatch at `level`.
    fn quantum_for(&self, level: Level) -> Quantum;

    /// Called once per iteration after admission and before selection.
    fn on_tick(&mut self, _clock: Ticks, _tasks: &mut [Task], _queues: &mut QueueSet) {}

    /// Pick the next task.  The returned index must have been removed from
    /// `queues`.  `None` means nothing is ready.
    fn select(&mut self, queues: &mut QueueSet, tasks: &[Task], clock: Ticks) -> Option<Dispatch>;

    /// Earliest future instant at which the running slice must stop so the
    /// policy can reconsider.  `next_arrival` is the engine's next pending
    /// arrival, strictly after `clock`.
    fn preemption_horizon(&self, _clock: Ticks, _next_arrival: Option<Ticks>) -> Option<Ticks> {
        None
    }

    /// Place a task that ran but did not finish.  The task is READY on entry.
    fn requeue(&mut self, idx: TaskIdx, task: &mut Task, outcome: SliceOutcome, queues: &mut QueueSet);
}

/// Validate `config` and build the policy it names.
pub fn build_policy(config: &SimConfig) -> Result<Box<dyn SchedulingPolicy>, ConfigurationError> {
    config.validate()?;
    let policy: Box<dyn SchedulingPolicy> = match config.policy {
        PolicyKind::FixedPriority => Box::new(FixedPriorityRoundRobin::new(config)?),
        PolicyKind::Mlfq => Box::new(MultiLevelFeedbackQueue::new(config)?),
    };
    Ok(policy)
}
