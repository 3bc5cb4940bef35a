/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Read-only instrumentation hooks.
//!
//! The engine hands every observer an immutable [`SimEvent`] after the state
//! change it describes has been applied.  Observers cannot reach the task
//! registry, the queues or the clock, so nothing they do can change a
//! scheduling decision or a metric.
//!
//! | Observer | Use |
//! |---|---|
//! | `()` | No instrumentation (what [`Engine::run`](super::Engine::run) uses) |
//! | [`RecordingObserver`] | Keeps every event in memory |
//! | [`PacedObserver`] | Sleeps wall-clock time proportional to simulated time |

use std::thread;
use std::time::Duration;

use crate::policy::Quantum;
use crate::task::{Level, TaskId, Ticks};

/// Snapshot of one engine step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimEvent {
    /// Task entered the ready queues for the first time.
    Admitted {
        clock: Ticks,
        task: TaskId,
        level: Level,
    },
    /// Task was put on the CPU.
    Dispatched {
        clock: Ticks,
        task: TaskId,
        level: Level,
        budget: Quantum,
        continuation: bool,
    },
    /// A slice ended; `clock` is the time after the slice.
    SliceCompleted {
        clock: Ticks,
        task: TaskId,
        ran: Ticks,
        remaining: Ticks,
    },
    Finished {
        clock: Ticks,
        task: TaskId,
    },
    /// CPU idle until the next arrival.
    IdleJump { from: Ticks, to: Ticks },
}

pub trait SimObserver {
    fn on_event(&mut self, event: &SimEvent);
}

impl SimObserver for () {
    fn on_event(&mut self, _event: &SimEvent) {}
}

impl<O: SimObserver + ?Sized> SimObserver for &mut O {
    fn on_event(&mut self, event: &SimEvent) {
        (**self).on_event(event);
    }
}

// ── RecordingObserver ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct RecordingObserver {
    events: Vec<SimEvent>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[SimEvent] {
        &self.events
    }

    pub fn into_events(self) -> Vec<SimEvent> {
        self.events
    }
}

impl SimObserver for RecordingObserver {
    fn on_event(&mut self, event: &SimEvent) {
        self.events.push(event.clone());
    }
}

// ── PacedObserver ─────────────────────────────────────────────────────────────

/// Real-time pacing: blocks the caller for `per_tick` of wall time for every
/// simulated tick that passes (busy or idle).
#[derive(Debug, Clone, Copy)]
pub struct PacedObserver {
    per_tick: Duration,
    slept: Duration,
}

impl PacedObserver {
    pub fn new(per_tick: Duration) -> Self {
        Self {
            per_tick,
            slept: Duration::ZERO,
        }
    }

    /// Total wall time spent sleeping so far.
    pub fn slept(&self) -> Duration {
        self.slept
    }

    fn pause(&mut self, ticks: Ticks) {
        if self.per_tick.is_zero() || ticks == 0 {
            return;
        }
        let ticks = u32::try_from(ticks).unwrap_or(u32::MAX);
        let pause = self.per_tick.checked_mul(ticks).unwrap_or(Duration::MAX);
        thread::sleep(pause);
        self.slept = self.slept.saturating_add(pause);
    }
}

impl SimObserver for PacedObserver {
    fn on_event(&mut self, event: &SimEvent) {
        match *event {
            SimEvent::SliceCompleted { ran, .. } => self.pause(ran),
            SimEvent::IdleJump { from, to } => self.pause(to - from),
            _ => {}
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
