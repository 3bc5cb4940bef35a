/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Fixed-priority round-robin.
//!
//! * Levels are static: a task stays on the level it was admitted with.
//! * Selection scans level 0 first and serves the first non-empty queue, so a
//!   lower level is never served while a higher level has a ready task.
//!   Starvation of low levels is deterministic and reproducible.
//! * Inside a level, tasks rotate FIFO by enqueue order.
//! * Slices are never cut early: a higher-level arrival waits for the current
//!   slice to end.

use tracing::debug;

use crate::config::SimConfig;
use crate::engine::error::ConfigurationError;
use crate::engine::queues::{QueueSet, TaskIdx};
use crate::task::{Level, Task, Ticks};

use super::{Dispatch, Quantum, SchedulingPolicy, SliceOutcome};

#[derive(Debug, Clone)]
pub struct FixedPriorityRoundRobin {
    quanta: Vec<Quantum>,
}

impl FixedPriorityRoundRobin {
    pub fn new(config: &SimConfig) -> Result<Self, ConfigurationError> {
        config.validate()?;
        Ok(Self {
            quanta: config.quanta.clone(),
        })
    }

    /// Same finite quantum on every level.
    pub fn uniform(levels: usize, quantum: Ticks) -> Result<Self, ConfigurationError> {
        Self::new(&SimConfig::fixed_priority(levels, quantum))
    }
}

impl SchedulingPolicy for FixedPriorityRoundRobin {
    fn name(&self) -> &'static str {
        "fixed-priority"
    }

    fn levels(&self) -> usize {
        self.quanta.len()
    }

    fn quantum_for(&self, level: Level) -> Quantum {
        self.quanta[level]
    }

    fn select(&mut self, queues: &mut QueueSet, tasks: &[Task], clock: Ticks) -> Option<Dispatch> {
        for level in 0..queues.levels() {
            let Some(head) = queues.iter_level(level).next() else {
                continue;
            };
            // Admission only queues arrived tasks; a non-arrived head means
            // the level is not servable yet.
            if !tasks[head].has_arrived(clock) {
                continue;
            }
            let idx = queues.pop_front(level)?;
            debug!(task = tasks[idx].id, level, "fixed-priority selected");
            return Some(Dispatch {
                idx,
                budget: self.quantum_for(level),
                continuation: false,
            });
        }
        None
    }

    fn requeue(&mut self, idx: TaskIdx, task: &mut Task, _outcome: SliceOutcome, queues: &mut QueueSet) {
        queues.push_back(task.priority_level, idx);
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::TaskSpec;

    fn tasks(specs: &[TaskSpec]) -> Vec<Task> {
        specs.iter().map(Task::from_spec).collect()
    }

    #[test]
    fn serves_highest_level_first() {
        let ts = tasks(&[TaskSpec::new(1, 100, 2, 0), TaskSpec::new(2, 100, 0, 0)]);
        let mut q = QueueSet::new(3);
        q.push_back(2, 0);
        q.push_back(0, 1);

        let mut p = FixedPriorityRoundRobin::uniform(3, 50).unwrap();
        let d = p.select(&mut q, &ts, 0).unwrap();
        assert_eq!(d.idx, 1);
        assert_eq!(d.budget, Quantum::Finite(50));
        assert!(!d.continuation);
        assert!(!q.contains(1), "selected task must leave its queue");
    }

    #[test]
    fn requeue_appends_to_own_level_tail() {
        let mut ts = tasks(&[TaskSpec::new(1, 100, 1, 0), TaskSpec::new(2, 100, 1, 0)]);
        let mut q = QueueSet::new(3);
        q.push_back(1, 1);

        let mut p = FixedPriorityRoundRobin::uniform(3, 50).unwrap();
        p.requeue(0, &mut ts[0], SliceOutcome::QuantumExpired { ran: 50 }, &mut q);
        assert_eq!(q.iter_level(1).collect::<Vec<_>>(), vec![1, 0]);
        assert_eq!(ts[0].priority_level, 1, "fixed priority never changes level");
    }

    #[test]
    fn per_level_quanta_are_honoured() {
        let mut cfg = SimConfig::fixed_priority(3, 100);
        cfg.quanta = vec![Quantum::Finite(100), Quantum::Finite(120), Quantum::Unbounded];
        let p = FixedPriorityRoundRobin::new(&cfg).unwrap();
        assert_eq!(p.quantum_for(1), Quantum::Finite(120));
        assert_eq!(p.quantum_for(2), Quantum::Unbounded);
    }

    #[test]
    fn empty_queues_select_nothing() {
        let mut q = QueueSet::new(3);
        let mut p = FixedPriorityRoundRobin::uniform(3, 50).unwrap();
        assert!(p.select(&mut q, &[], 0).is_none());
    }

    #[test]
    fn never_supplies_a_horizon() {
        let p = FixedPriorityRoundRobin::uniform(3, 50).unwrap();
        assert_eq!(p.preemption_horizon(0, Some(10)), None);
    }

    #[test]
    fn zero_quantum_is_rejected() {
        assert!(matches!(
            FixedPriorityRoundRobin::uniform(3, 0),
            Err(ConfigurationError::NonPositiveQuantum { level: 0 })
        ));
    }
}
