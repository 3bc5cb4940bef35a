/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Multi-level feedback queue.
//!
//! # Rules
//!
//! | Event | Effect |
//! |---|---|
//! | Quantum exhausted, task unfinished | Demote one level (floor at the lowest level), append to tail |
//! | Slice cut at a horizon (arrival or timer) | Task goes back to the **head** of its level with its used quantum remembered |
//! | Higher-level task ready while a cut task waits at the head | Cut task moves to the tail of its level, quantum resets (preemption) |
//! | Global promotion tick | Every queued task below level 0 moves to level 0 |
//! | Randomized promotion tick | `max(1, ⌊eligible × fraction⌋)` random tasks below level 0 move up one level |
//!
//! Both promotion timers run on the virtual clock.  The random source is
//! injected ([`with_rng`](MultiLevelFeedbackQueue::with_rng)); the default
//! constructor seeds a [`SmallRng`] from [`SimConfig::seed`] so two runs with
//! the same config are identical.

use rand::rngs::SmallRng;
use rand::seq::index;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::config::SimConfig;
use crate::engine::error::ConfigurationError;
use crate::engine::queues::{QueueSet, TaskIdx};
use crate::task::{Level, Task, Ticks};

use super::{Dispatch, Quantum, SchedulingPolicy, SliceOutcome};

// ── Promotion timer ───────────────────────────────────────────────────────────

/// Periodic deadline on the virtual clock, due at every multiple of
/// `interval`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PromotionTimer {
    interval: Ticks,
    next_due: Ticks,
}

impl PromotionTimer {
    fn new(interval: Ticks) -> Self {
        Self {
            interval,
            next_due: interval,
        }
    }

    /// `true` if the timer is due at `clock`.  Re-arms to the first multiple
    /// of `interval` strictly after `clock`; ticks missed during a long slice
    /// or an idle jump collapse into this one.
    fn fire(&mut self, clock: Ticks) -> bool {
        if clock < self.next_due {
            return false;
        }
        let missed = (clock - self.next_due) / self.interval + 1;
        self.next_due += missed * self.interval;
        true
    }
}

/// A grant in progress: which task, and how much of its quantum is spent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Grant {
    idx: TaskIdx,
    used: Ticks,
}

// ── Policy ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct MultiLevelFeedbackQueue<R = SmallRng> {
    quanta: Vec<Quantum>,
    global_promotion: Option<PromotionTimer>,
    random_promotion: Option<PromotionTimer>,
    random_fraction: f64,
    rng: R,
    /// Grant handed out by the last `select`.
    current: Option<Grant>,
    /// Grant cut at a horizon; its task sits at the head of its level.
    interrupted: Option<Grant>,
}

impl MultiLevelFeedbackQueue<SmallRng> {
    /// Build from `config`, seeding the random source from `config.seed`.
    pub fn new(config: &SimConfig) -> Result<Self, ConfigurationError> {
        Self::with_rng(config, SmallRng::seed_from_u64(config.seed))
    }
}

impl<R: Rng> MultiLevelFeedbackQueue<R> {
    /// Build from `config` with a caller-supplied random source.
    pub fn with_rng(config: &SimConfig, rng: R) -> Result<Self, ConfigurationError> {
        config.validate()?;
        let (random_promotion, random_fraction) = match config.random_promotion {
            Some(rp) => (Some(PromotionTimer::new(rp.interval)), rp.fraction),
            None => (None, 0.0),
        };
        Ok(Self {
            quanta: config.quanta.clone(),
            global_promotion: config.global_promotion_interval.map(PromotionTimer::new),
            random_promotion,
            random_fraction,
            rng,
            current: None,
            interrupted: None,
        })
    }

    fn lowest(&self) -> Level {
        self.quanta.len() - 1
    }

    /// Pop the first arrived task of `level`, rotating non-arrived ones to
    /// the tail.
    fn take_arrived(queues: &mut QueueSet, level: Level, tasks: &[Task], clock: Ticks) -> Option<TaskIdx> {
        for _ in 0..queues.len(level) {
            let idx = queues.pop_front(level)?;
            if tasks[idx].has_arrived(clock) {
                return Some(idx);
            }
            queues.push_back(level, idx);
        }
        None
    }

    /// A promoted task starts a fresh quantum on its new level.
    fn forget_interrupted(&mut self, idx: TaskIdx) {
        if self.interrupted.is_some_and(|g| g.idx == idx) {
            self.interrupted = None;
        }
    }

    /// Move every arrived task below level 0 to the tail of level 0.
    fn promote_all(&mut self, clock: Ticks, tasks: &mut [Task], queues: &mut QueueSet) {
        let mut promoted = 0usize;
        for level in 1..queues.levels() {
            for idx in queues.drain_level(level) {
                let task = &mut tasks[idx];
                if task.has_arrived(clock) && !task.is_finished() {
                    task.set_level(0);
                    queues.push_back(0, idx);
                    self.forget_interrupted(idx);
                    promoted += 1;
                } else {
                    queues.push_back(level, idx);
                }
            }
        }
        debug!(clock, promoted, "global promotion to level 0");
    }

    /// Promote a random subset of tasks below level 0 by one level.
    fn promote_random(&mut self, clock: Ticks, tasks: &mut [Task], queues: &mut QueueSet) {
        let eligible: Vec<TaskIdx> = (1..queues.levels())
            .flat_map(|level| queues.iter_level(level))
            .filter(|&idx| tasks[idx].has_arrived(clock) && !tasks[idx].is_finished())
            .collect();
        if eligible.is_empty() {
            return;
        }

        let amount = ((eligible.len() as f64 * self.random_fraction).floor() as usize)
            .clamp(1, eligible.len());
        let picks = index::sample(&mut self.rng, eligible.len(), amount);

        for pick in picks.iter() {
            let idx = eligible[pick];
            let Some(old) = queues.remove(idx) else {
                continue;
            };
            let new = old.saturating_sub(1);
            tasks[idx].set_level(new);
            queues.push_back(new, idx);
            self.forget_interrupted(idx);
            debug!(clock, task = tasks[idx].id, from = old, to = new, "randomized promotion");
        }
    }
}

impl<R: Rng> SchedulingPolicy for MultiLevelFeedbackQueue<R> {
    fn name(&self) -> &'static str {
        "mlfq"
    }

    fn levels(&self) -> usize {
        self.quanta.len()
    }

    fn quantum_for(&self, level: Level) -> Quantum {
        self.quanta[level]
    }

    fn on_tick(&mut self, clock: Ticks, tasks: &mut [Task], queues: &mut QueueSet) {
        if self.global_promotion.as_mut().is_some_and(|t| t.fire(clock)) {
            self.promote_all(clock, tasks, queues);
        }
        if self.random_promotion.as_mut().is_some_and(|t| t.fire(clock)) {
            self.promote_random(clock, tasks, queues);
        }
    }

    fn select(&mut self, queues: &mut QueueSet, tasks: &[Task], clock: Ticks) -> Option<Dispatch> {
        for level in 0..queues.levels() {
            let Some(idx) = Self::take_arrived(queues, level, tasks, clock) else {
                continue;
            };

            let resumed = match self.interrupted.take() {
                Some(g) if g.idx == idx => Some(g),
                Some(g) => {
                    // Only a higher level can be served before the head of
                    // the interrupted task's level.
                    debug!(
                        clock,
                        preempted = tasks[g.idx].id,
                        by = tasks[idx].id,
                        level,
                        "preempting interrupted task"
                    );
                    queues.rotate_to_back(g.idx);
                    None
                }
                None => None,
            };

            let used = resumed.map_or(0, |g| g.used);
            self.current = Some(Grant { idx, used });
            return Some(Dispatch {
                idx,
                budget: self.quantum_for(level).remaining_after(used),
                continuation: resumed.is_some(),
            });
        }
        None
    }

    fn preemption_horizon(&self, _clock: Ticks, next_arrival: Option<Ticks>) -> Option<Ticks> {
        [
            next_arrival,
            self.global_promotion.map(|t| t.next_due),
            self.random_promotion.map(|t| t.next_due),
        ]
        .into_iter()
        .flatten()
        .min()
    }

    fn requeue(&mut self, idx: TaskIdx, task: &mut Task, outcome: SliceOutcome, queues: &mut QueueSet) {
        let used_before = self
            .current
            .take()
            .filter(|g| g.idx == idx)
            .map_or(0, |g| g.used);

        match outcome {
            SliceOutcome::QuantumExpired { .. } => {
                let old = task.priority_level;
                let new = (old + 1).min(self.lowest());
                task.set_level(new);
                if new != old {
                    debug!(task = task.id, from = old, to = new, "demoted after quantum expiry");
                }
                queues.push_back(new, idx);
            }
            SliceOutcome::Interrupted { ran } => {
                self.interrupted = Some(Grant {
                    idx,
                    used: used_before + ran,
                });
                queues.push_front(task.priority_level, idx);
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RandomPromotion;
    use crate::task::TaskSpec;

    fn three_level(q0: Ticks, q1: Ticks) -> SimConfig {
        SimConfig::mlfq(vec![Quantum::Finite(q0), Quantum::Finite(q1), Quantum::Unbounded])
    }

    fn tasks_at(levels: &[Level]) -> Vec<Task> {
        levels
            .iter()
            .enumerate()
            .map(|(i, &l)| Task::from_spec(&TaskSpec::new(i as u32 + 1, 1_000, l, 0)))
            .collect()
    }

    fn queued(tasks: &[Task]) -> QueueSet {
        let mut q = QueueSet::new(3);
        for (idx, t) in tasks.iter().enumerate() {
            q.push_back(t.priority_level, idx);
        }
        q
    }

    // ── PromotionTimer ────────────────────────────────────────────────────────

    #[test]
    fn timer_fires_on_multiples_and_collapses_missed_ticks() {
        let mut t = PromotionTimer::new(100);
        assert!(!t.fire(99));
        assert!(t.fire(100));
        assert_eq!(t.next_due, 200);
        assert!(t.fire(450));
        assert_eq!(t.next_due, 500);
        assert!(!t.fire(499));
    }

    // ── Demotion ──────────────────────────────────────────────────────────────

    #[test]
    fn quantum_expiry_demotes_one_level() {
        let mut ts = tasks_at(&[0]);
        let mut q = queued(&ts);
        let mut p = MultiLevelFeedbackQueue::new(&three_level(150, 150)).unwrap();

        let d = p.select(&mut q, &ts, 0).unwrap();
        assert_eq!(d.budget, Quantum::Finite(150));
        p.requeue(d.idx, &mut ts[0], SliceOutcome::QuantumExpired { ran: 150 }, &mut q);
        assert_eq!(ts[0].priority_level, 1);
        assert_eq!(q.level_of(0), Some(1));
        assert_eq!(ts[0].level_changes, 1);
    }

    #[test]
    fn lowest_level_never_demotes_further() {
        let mut ts = tasks_at(&[2]);
        let mut q = QueueSet::new(3);
        let mut cfg = three_level(10, 10);
        cfg.quanta[2] = Quantum::Finite(10);
        let mut p = MultiLevelFeedbackQueue::new(&cfg).unwrap();

        p.requeue(0, &mut ts[0], SliceOutcome::QuantumExpired { ran: 10 }, &mut q);
        assert_eq!(ts[0].priority_level, 2);
        assert_eq!(ts[0].level_changes, 0);
    }

    // ── Interruption / preemption ─────────────────────────────────────────────

    #[test]
    fn interrupted_task_resumes_with_remaining_quantum() {
        let mut ts = tasks_at(&[0, 0]);
        let mut q = QueueSet::new(3);
        q.push_back(0, 0);
        let mut p = MultiLevelFeedbackQueue::new(&three_level(150, 150)).unwrap();

        let d = p.select(&mut q, &ts, 0).unwrap();
        p.requeue(d.idx, &mut ts[0], SliceOutcome::Interrupted { ran: 50 }, &mut q);
        // same-level arrival lands behind the interrupted task
        q.push_back(0, 1);

        let d = p.select(&mut q, &ts, 50).unwrap();
        assert_eq!(d.idx, 0);
        assert!(d.continuation);
        assert_eq!(d.budget, Quantum::Finite(100));
    }

    #[test]
    fn higher_level_task_preempts_interrupted_one() {
        let mut ts = tasks_at(&[2, 0]);
        let mut q = QueueSet::new(3);
        q.push_back(2, 0);
        let mut p = MultiLevelFeedbackQueue::new(&three_level(150, 150)).unwrap();

        let d = p.select(&mut q, &ts, 0).unwrap();
        p.requeue(d.idx, &mut ts[0], SliceOutcome::Interrupted { ran: 100 }, &mut q);
        q.push_back(0, 1);

        let d = p.select(&mut q, &ts, 100).unwrap();
        assert_eq!(d.idx, 1);
        assert!(!d.continuation);
        assert_eq!(q.level_of(0), Some(2), "preempted task keeps its level");

        // once resumed, the preempted task starts a fresh grant
        let d = p.select(&mut q, &ts, 200).unwrap();
        assert_eq!(d.idx, 0);
        assert!(!d.continuation);
        assert_eq!(d.budget, Quantum::Unbounded);
    }

    #[test]
    fn preempted_task_goes_to_tail_of_its_level() {
        let mut ts = tasks_at(&[1, 1, 0]);
        let mut q = QueueSet::new(3);
        q.push_back(1, 0);
        q.push_back(1, 1);
        let mut p = MultiLevelFeedbackQueue::new(&three_level(150, 150)).unwrap();

        let d = p.select(&mut q, &ts, 0).unwrap();
        assert_eq!(d.idx, 0);
        p.requeue(0, &mut ts[0], SliceOutcome::Interrupted { ran: 30 }, &mut q);
        assert_eq!(q.iter_level(1).collect::<Vec<_>>(), vec![0, 1]);

        q.push_back(0, 2);
        let d = p.select(&mut q, &ts, 30).unwrap();
        assert_eq!(d.idx, 2);
        assert_eq!(q.iter_level(1).collect::<Vec<_>>(), vec![1, 0]);
    }

    // ── Horizon ───────────────────────────────────────────────────────────────

    #[test]
    fn horizon_is_earliest_of_arrival_and_timers() {
        let mut cfg = three_level(150, 150);
        cfg.global_promotion_interval = Some(1_000);
        cfg.random_promotion = Some(RandomPromotion {
            interval: 400,
            fraction: 0.5,
        });
        let p = MultiLevelFeedbackQueue::new(&cfg).unwrap();
        assert_eq!(p.preemption_horizon(0, Some(700)), Some(400));
        assert_eq!(p.preemption_horizon(0, Some(300)), Some(300));
        assert_eq!(p.preemption_horizon(0, None), Some(400));
    }

    #[test]
    fn horizon_is_arrival_only_without_timers() {
        let p = MultiLevelFeedbackQueue::new(&three_level(150, 150)).unwrap();
        assert_eq!(p.preemption_horizon(0, Some(70)), Some(70));
        assert_eq!(p.preemption_horizon(0, None), None);
    }

    // ── Promotion ─────────────────────────────────────────────────────────────

    #[test]
    fn global_promotion_moves_everything_to_level_zero() {
        let mut ts = tasks_at(&[0, 1, 2, 2]);
        let mut q = queued(&ts);
        let mut cfg = three_level(150, 150);
        cfg.global_promotion_interval = Some(500);
        let mut p = MultiLevelFeedbackQueue::new(&cfg).unwrap();

        p.on_tick(499, &mut ts, &mut q);
        assert_eq!(q.len(0), 1, "not due yet");

        p.on_tick(500, &mut ts, &mut q);
        assert_eq!(q.len(0), 4);
        assert_eq!(q.iter_level(0).collect::<Vec<_>>(), vec![0, 1, 2, 3]);
        assert!(ts.iter().all(|t| t.priority_level == 0));
        assert_eq!(ts[0].level_changes, 0);
        assert_eq!(ts[2].level_changes, 1);
    }

    #[test]
    fn global_promotion_clears_interrupted_grant() {
        let mut ts = tasks_at(&[2]);
        let mut q = QueueSet::new(3);
        q.push_back(2, 0);
        let mut cfg = three_level(150, 150);
        cfg.global_promotion_interval = Some(100);
        let mut p = MultiLevelFeedbackQueue::new(&cfg).unwrap();

        let d = p.select(&mut q, &ts, 0).unwrap();
        p.requeue(d.idx, &mut ts[0], SliceOutcome::Interrupted { ran: 100 }, &mut q);
        p.on_tick(100, &mut ts, &mut q);

        let d = p.select(&mut q, &ts, 100).unwrap();
        assert!(!d.continuation);
        assert_eq!(d.budget, Quantum::Finite(150));
    }

    #[test]
    fn full_fraction_random_promotion_lifts_every_task_one_level() {
        let mut ts = tasks_at(&[0, 1, 2, 2]);
        let mut q = queued(&ts);
        let mut cfg = three_level(150, 150);
        cfg.random_promotion = Some(RandomPromotion {
            interval: 200,
            fraction: 1.0,
        });
        let mut p = MultiLevelFeedbackQueue::new(&cfg).unwrap();

        p.on_tick(200, &mut ts, &mut q);
        let levels: Vec<Level> = ts.iter().map(|t| t.priority_level).collect();
        assert_eq!(levels, vec![0, 0, 1, 1]);
        assert_eq!(q.total_len(), 4);
    }

    #[test]
    fn random_promotion_picks_at_least_one_task() {
        let mut ts = tasks_at(&[2, 2, 2]);
        let mut q = queued(&ts);
        let mut cfg = three_level(150, 150);
        cfg.random_promotion = Some(RandomPromotion {
            interval: 10,
            fraction: 0.1,
        });
        let mut p = MultiLevelFeedbackQueue::new(&cfg).unwrap();

        p.on_tick(10, &mut ts, &mut q);
        let promoted = ts.iter().filter(|t| t.priority_level == 1).count();
        assert_eq!(promoted, 1);
    }

    #[test]
    fn random_promotion_with_nothing_eligible_is_a_noop() {
        let mut ts = tasks_at(&[0, 0]);
        let mut q = queued(&ts);
        let mut cfg = three_level(150, 150);
        cfg.random_promotion = Some(RandomPromotion {
            interval: 10,
            fraction: 0.5,
        });
        let mut p = MultiLevelFeedbackQueue::new(&cfg).unwrap();

        p.on_tick(10, &mut ts, &mut q);
        assert_eq!(q.iter_level(0).collect::<Vec<_>>(), vec![0, 1]);
    }

    #[test]
    fn same_seed_promotes_same_tasks() {
        let picks = |seed: u64| {
            let mut ts = tasks_at(&[2, 2, 2, 2, 2, 2, 2, 2]);
            let mut q = queued(&ts);
            let mut cfg = three_level(150, 150);
            cfg.seed = seed;
            cfg.random_promotion = Some(RandomPromotion {
                interval: 10,
                fraction: 0.5,
            });
            let mut p = MultiLevelFeedbackQueue::new(&cfg).unwrap();
            p.on_tick(10, &mut ts, &mut q);
            ts.iter().map(|t| t.priority_level).collect::<Vec<_>>()
        };
        assert_eq!(picks(7), picks(7));
    }

    #[test]
    fn injected_rng_is_used() {
        let cfg = three_level(150, 150);
        let p = MultiLevelFeedbackQueue::with_rng(&cfg, SmallRng::seed_from_u64(1)).unwrap();
        assert_eq!(p.levels(), 3);
    }
}
