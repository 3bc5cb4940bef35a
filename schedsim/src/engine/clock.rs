/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Virtual clock.
//!
//! Moves only two ways: [`advance`](VirtualClock::advance) by a granted slice,
//! or [`jump_to`](VirtualClock::jump_to) the next arrival while the CPU is
//! idle.  It never moves backwards.

use crate::task::Ticks;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VirtualClock {
    now: Ticks,
    busy: Ticks,
    idle: Ticks,
}

impl VirtualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> Ticks {
        self.now
    }

    /// Sum of all granted slices.
    pub fn busy(&self) -> Ticks {
        self.busy
    }

    /// Sum of all idle jumps.
    pub fn idle(&self) -> Ticks {
        self.idle
    }

    /// Advance by a granted slice and return the new time.
    pub fn advance(&mut self, slice: Ticks) -> Ticks {
        self.now = self
            .now
            .checked_add(slice)
            .expect("virtual clock overflowed u64");
        self.busy += slice;
        self.now
    }

    /// Jump forward to `target` while idle.
    ///
    /// # Panics
    /// If `target` is not strictly in the future.
    pub fn jump_to(&mut self, target: Ticks) {
        assert!(
            target > self.now,
            "idle jump must move forward: {} -> {}",
            self.now,
            target
        );
        self.idle += target - self.now;
        self.now = target;
    }
}
