/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! schedsim – virtual-clock CPU scheduling simulator
//!
//! Module layout:
//!
//! ```text
//! lib.rs
//! ├── task.rs         – TaskSpec descriptors and mutable Task records
//! ├── engine/         – run loop, virtual clock, ready queues, errors, observers
//! ├── policy/         – fixed-priority round-robin and MLFQ
//! ├── metrics/        – per-task and aggregate statistics
//! ├── config/         – SimConfig defaults, validation, YAML loading
//! └── workload/       – YAML workload loading
//! ```
//!
//! # Example
//! ```rust
//! use schedsim::config::SimConfig;
//! use schedsim::engine::simulate;
//! use schedsim::task::TaskSpec;
//!
//! let tasks = [TaskSpec::new(1, 300, 1, 0), TaskSpec::new(2, 300, 1, 0)];
//! let run = simulate(&tasks, &SimConfig::fixed_priority(3, 150)).unwrap();
//! assert_eq!(run.elapsed, 600);
//! assert_eq!(run.context_switches, 4);
//! ```

pub mod config;
pub mod engine;
pub mod metrics;
pub mod policy;
pub mod task;
pub mod workload;
