/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Per-level FIFO ready queues.
//!
//! Queues hold registry indices, never tasks: the engine owns every [`Task`]
//! for the whole run and the queues are a view onto it.  A membership map
//! enforces that an index sits in at most one queue; breaking that is an
//! engine bug and panics.
//!
//! [`Task`]: crate::task::Task

use std::collections::{HashMap, VecDeque};

use crate::task::Level;

/// Index of a task in the engine registry.
pub type TaskIdx = usize;

#[derive(Debug, Clone)]
pub struct QueueSet {
    queues: Vec<VecDeque<TaskIdx>>,
    membership: HashMap<TaskIdx, Level>,
}

impl QueueSet {
    /// One empty queue per level.
    pub fn new(levels: usize) -> Self {
        Self {
            queues: vec![VecDeque::new(); levels],
            membership: HashMap::new(),
        }
    }

    pub fn levels(&self) -> usize {
        self.queues.len()
    }

    /// Lowest-priority level index.
    pub fn lowest(&self) -> Level {
        self.queues.len().saturating_sub(1)
    }

    /// Append `idx` to the tail of `level`.
    pub fn push_back(&mut self, level: Level, idx: TaskIdx) {
        self.claim(level, idx);
        self.queues[level].push_back(idx);
    }

    /// Put `idx` back at the head of `level`.
    pub fn push_front(&mut self, level: Level, idx: TaskIdx) {
        self.claim(level, idx);
        self.queues[level].push_front(idx);
    }

    pub fn pop_front(&mut self, level: Level) -> Option<TaskIdx> {
        let idx = self.queues[level].pop_front()?;
        self.membership.remove(&idx);
        Some(idx)
    }

    /// Remove `idx` from whichever queue holds it.  Returns the level it was
    /// on.
    pub fn remove(&mut self, idx: TaskIdx) -> Option<Level> {
        let level = self.membership.remove(&idx)?;
        let queue = &mut self.queues[level];
        let pos = queue
            .iter()
            .position(|&i| i == idx)
            .expect("membership map out of sync with queue contents");
        queue.remove(pos);
        Some(level)
    }

    /// Move `idx` to the tail of its current queue.
    pub fn rotate_to_back(&mut self, idx: TaskIdx) -> Option<Level> {
        let level = self.remove(idx)?;
        self.push_back(level, idx);
        Some(level)
    }

    /// Take every index out of `level`, head first.
    pub fn drain_level(&mut self, level: Level) -> Vec<TaskIdx> {
        let drained: Vec<TaskIdx> = self.queues[level].drain(..).collect();
        for idx in &drained {
            self.membership.remove(idx);
        }
        drained
    }

    pub fn level_of(&self, idx: TaskIdx) -> Option<Level> {
        self.membership.get(&idx).copied()
    }

    pub fn contains(&self, idx: TaskIdx) -> bool {
        self.membership.contains_key(&idx)
    }

    pub fn len(&self, level: Level) -> usize {
        self.queues[level].len()
    }

    pub fn total_len(&self) -> usize {
        self.membership.len()
    }

    pub fn is_empty(&self) -> bool {
        self.membership.is_empty()
    }

    /// Head-to-tail view of one level.
    pub fn iter_level(&self, level: Level) -> impl Iterator<Item = TaskIdx> + '_ {
        self.queues[level].iter().copied()
    }

    fn claim(&mut self, level: Level, idx: TaskIdx) {
        assert!(
            level < self.queues.len(),
            "level {level} out of range (levels = {})",
            self.queues.len()
        );
        if let Some(existing) = self.membership.insert(idx, level) {
            panic!("task index {idx} already queued on level {existing}");
        }
    }
}
