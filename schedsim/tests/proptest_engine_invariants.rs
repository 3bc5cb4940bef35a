//! Property-based invariant tests for the simulation engine.
//!
//! Random workloads under random policy parameters must satisfy:
//!
//! 1. Every task finishes exactly once, with `arrival <= start <= end`
//! 2. Slice lengths of a task sum to its execution time
//! 3. Slices never overlap and the clock never goes backwards
//! 4. `turnaround == wait + execution` for every task
//! 5. `elapsed == busy + idle`, `busy == Σ execution`
//! 6. Fixed priority: no slice starts while a higher-level task is ready
//! 7. Determinism: the same inputs yield the same result

use std::collections::HashMap;

use proptest::prelude::*;
use schedsim::config::{RandomPromotion, SimConfig};
use schedsim::engine::{simulate, RunResult};
use schedsim::policy::Quantum;
use schedsim::task::{TaskSpec, Ticks};

// ── Strategies ────────────────────────────────────────────────────────────────

fn workload_strategy() -> impl Strategy<Value = Vec<TaskSpec>> {
    prop::collection::vec((1u64..400, 0usize..3, 0u64..1_500), 0..20).prop_map(|raw| {
        raw.into_iter()
            .enumerate()
            .map(|(i, (exec, prio, arrival))| TaskSpec::new(i as u32 + 1, exec, prio, arrival))
            .collect()
    })
}

fn fixed_priority_strategy() -> impl Strategy<Value = SimConfig> {
    (1u64..200).prop_map(|q| SimConfig::fixed_priority(3, q))
}

fn mlfq_strategy() -> impl Strategy<Value = SimConfig> {
    (
        1u64..200,
        1u64..200,
        prop::option::of(50u64..2_000),
        prop::option::of((10u64..1_000, 0.05f64..=1.0)),
        any::<u64>(),
    )
        .prop_map(|(q0, q1, global, random, seed)| {
            let mut cfg =
                SimConfig::mlfq(vec![Quantum::Finite(q0), Quantum::Finite(q1), Quantum::Unbounded]);
            cfg.global_promotion_interval = global;
            cfg.random_promotion =
                random.map(|(interval, fraction)| RandomPromotion { interval, fraction });
            cfg.seed = seed;
            cfg
        })
}

fn config_strategy() -> impl Strategy<Value = SimConfig> {
    prop_oneof![fixed_priority_strategy(), mlfq_strategy()]
}

// ── Shared checks ─────────────────────────────────────────────────────────────

fn check_common(specs: &[TaskSpec], run: &RunResult) -> Result<(), TestCaseError> {
    prop_assert_eq!(run.finished.len(), specs.len());

    let mut per_task: HashMap<u32, Ticks> = HashMap::new();
    for s in &run.slices {
        prop_assert!(s.length > 0);
        *per_task.entry(s.task).or_default() += s.length;
    }
    for pair in run.slices.windows(2) {
        prop_assert!(pair[0].end() <= pair[1].start, "overlap: {:?}", pair);
    }

    for spec in specs {
        let t = run.task(spec.id).expect("every task finishes");
        let start = t.start_time.expect("finished task has a start");
        let end = t.end_time.expect("finished task has an end");
        prop_assert_eq!(t.remaining_time, 0);
        prop_assert!(spec.arrival_time <= start && start <= end);
        prop_assert_eq!(per_task.get(&spec.id).copied(), Some(spec.execution_time));
        prop_assert_eq!(t.turnaround_time, Some(t.wait_time + spec.execution_time));
    }

    let total: Ticks = specs.iter().map(|s| s.execution_time).sum();
    prop_assert_eq!(run.busy, total);
    prop_assert_eq!(run.elapsed, run.busy + run.idle);
    Ok(())
}

// ═════════════════════════════════════════════════════════════════════════════
// 1–5. Structural invariants, both policies
// ═════════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn every_run_satisfies_accounting_invariants(
        specs in workload_strategy(),
        cfg in config_strategy(),
    ) {
        let run = simulate(&specs, &cfg).unwrap();
        check_common(&specs, &run)?;
    }

    #[test]
    fn completion_order_matches_end_times(
        specs in workload_strategy(),
        cfg in config_strategy(),
    ) {
        let run = simulate(&specs, &cfg).unwrap();
        let ends: Vec<Ticks> = run.finished.iter().filter_map(|t| t.end_time).collect();
        prop_assert!(ends.windows(2).all(|w| w[0] <= w[1]));
    }
}

// ═════════════════════════════════════════════════════════════════════════════
// 6. Fixed priority is strict
// ═════════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn fixed_priority_never_runs_lower_level_over_ready_higher(
        specs in workload_strategy(),
        cfg in fixed_priority_strategy(),
    ) {
        let run = simulate(&specs, &cfg).unwrap();
        for slice in &run.slices {
            for other in &run.finished {
                if other.id == slice.task || other.initial_level >= slice.level {
                    continue;
                }
                let ready = other.arrival_time <= slice.start
                    && other.end_time.is_some_and(|end| end > slice.start);
                prop_assert!(
                    !ready,
                    "task {} (level {}) ran at {} while task {} (level {}) was ready",
                    slice.task, slice.level, slice.start, other.id, other.initial_level
                );
            }
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════════
// 7. Determinism
// ═════════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn identical_inputs_give_identical_results(
        specs in workload_strategy(),
        cfg in mlfq_strategy(),
    ) {
        let a = simulate(&specs, &cfg).unwrap();
        let b = simulate(&specs, &cfg).unwrap();
        prop_assert_eq!(a, b);
    }
}
