/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Workload file loading.
//!
//! Workloads are produced elsewhere; this module only reads them.
//!
//! ```yaml
//! tasks:
//!   - id: 1
//!     execution_time: 300
//!     priority: 1        # optional, default 0 (highest)
//!     arrival_time: 0    # optional, default 0
//! ```
//!
//! The `tasks` key is required but may hold an empty list.  Semantic checks
//! (positive execution time, unique ids, priority range) are left to
//! [`Engine::new`](crate::engine::Engine::new).

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{info, warn};

use crate::task::TaskSpec;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct WorkloadFile {
    tasks: Vec<TaskSpec>,
}

/// Parse a workload document.
pub fn parse_workload(content: &str) -> Result<Vec<TaskSpec>> {
    let file: WorkloadFile =
        serde_yaml::from_str(content).context("Failed to parse workload YAML")?;
    if file.tasks.is_empty() {
        warn!("workload contains no tasks");
    }
    Ok(file.tasks)
}

/// Read and parse the workload at `path`.
///
/// # Errors
/// Returns an error if the file cannot be opened or is not a valid workload
/// document.
pub fn load_workload(path: &Path) -> Result<Vec<TaskSpec>> {
    info!("Loading workload from: {}", path.display());
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Cannot open workload file: {}", path.display()))?;
    let tasks = parse_workload(&content)
        .with_context(|| format!("Invalid workload file: {}", path.display()))?;
    info!(tasks = tasks.len(), "Workload loaded");
    Ok(tasks)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
