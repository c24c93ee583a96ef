//! Cycle search over the recorded lock dependencies (phase 2).
//!
//! A chain links dependencies of distinct routines where each link's
//! lock is blockingly held in the next lockset (LD-2) and no two chain
//! locksets share a blocking pair (LD-1); a chain whose last lock is
//! blockingly held by the first lockset closes a cycle (LD-3). Cycle
//! candidates survive only if every position retains an acquire that is
//! weak-clock concurrent with both neighbors; rotations are suppressed
//! by starting each search at the cycle's smallest routine id.

use rustc_hash::FxHashMap;
use skein_core::results::{AnalysisResult, BugKind};
use skein_core::types::{EventId, PrimitiveId, RoutineId};
use tracing::{debug, warn};

use crate::engine::state::{EngineState, LockDependency, LockMode};
use crate::engine::updater::UpdateCtx;
use crate::trace::trace::Trace;

/// Search for cyclic deadlocks and emit one result per surviving cycle.
pub fn search(state: &EngineState, trace: &Trace, ctx: &mut UpdateCtx<'_>) {
    if state.deadlock_analysis_failed {
        warn!("skipping cycle search: lock-dependency recording failed");
        return;
    }

    let mut by_routine: FxHashMap<RoutineId, Vec<&LockDependency>> = FxHashMap::default();
    for deps in state.lock_dependencies.values() {
        for dep in deps {
            by_routine.entry(dep.routine).or_default().push(dep);
        }
    }
    let mut routines: Vec<RoutineId> = by_routine.keys().copied().collect();
    routines.sort();

    for &start in &routines {
        for &dep in &by_routine[&start] {
            let mut chain = vec![dep];
            let mut used = vec![start];
            extend(&by_routine, &routines, &mut chain, &mut used, trace, ctx);
        }
    }
}

fn extend<'d>(
    by_routine: &FxHashMap<RoutineId, Vec<&'d LockDependency>>,
    routines: &[RoutineId],
    chain: &mut Vec<&'d LockDependency>,
    used: &mut Vec<RoutineId>,
    trace: &Trace,
    ctx: &mut UpdateCtx<'_>,
) {
    if chain.len() >= 2 && closes_cycle(chain) {
        report_cycle(chain, trace, ctx);
        return;
    }
    let start = used[0];
    for &candidate in routines {
        // The first routine is the smallest of the cycle; later positions
        // are strictly larger, which suppresses rotated duplicates.
        if candidate <= start || used.contains(&candidate) {
            continue;
        }
        for &next in &by_routine[&candidate] {
            if !links(chain.last().expect("chain non-empty"), next) {
                continue;
            }
            if !compatible_with_chain(chain, next) {
                continue;
            }
            chain.push(next);
            used.push(candidate);
            extend(by_routine, routines, chain, used, trace, ctx);
            chain.pop();
            used.pop();
        }
    }
}

/// LD-2: the previous dependency's lock is blockingly held in the next
/// dependency's lockset.
fn links(prev: &LockDependency, next: &LockDependency) -> bool {
    holds_blockingly(&next.lockset, prev.lock, prev.mode)
}

/// LD-3: the chain's last lock is blockingly held by the first lockset.
fn closes_cycle(chain: &[&LockDependency]) -> bool {
    let first = chain[0];
    let last = chain.last().expect("chain non-empty");
    holds_blockingly(&first.lockset, last.lock, last.mode)
}

fn holds_blockingly(lockset: &[(PrimitiveId, LockMode)], lock: PrimitiveId, mode: LockMode) -> bool {
    lockset
        .iter()
        .any(|&(id, held)| id == lock && held.blocks(mode))
}

/// LD-1: no two locksets of the chain share a blocking pair.
fn compatible_with_chain(chain: &[&LockDependency], next: &LockDependency) -> bool {
    chain.iter().all(|prev| {
        !prev.lockset.iter().any(|&(id, prev_mode)| {
            next.lockset
                .iter()
                .any(|&(other, next_mode)| id == other && prev_mode.blocks(next_mode))
        })
    })
}

/// Filter a cycle candidate by weak-clock concurrency and emit it.
///
/// Walking the cycle as a ring, each position keeps only acquires that
/// are concurrent with at least one acquire of both neighbors; an empty
/// position kills the candidate. The earliest retained acquire per
/// position is the witness.
fn report_cycle(chain: &[&LockDependency], trace: &Trace, ctx: &mut UpdateCtx<'_>) {
    let k = chain.len();
    let mut witnesses: Vec<EventId> = Vec::with_capacity(k);
    for (i, dep) in chain.iter().enumerate() {
        let prev = chain[(i + k - 1) % k];
        let next = chain[(i + 1) % k];
        let retained: Vec<EventId> = dep
            .events
            .iter()
            .copied()
            .filter(|&event| {
                neighbor_concurrent(trace, event, &prev.events)
                    && neighbor_concurrent(trace, event, &next.events)
            })
            .collect();
        let Some(&earliest) = retained
            .iter()
            .min_by_key(|&&event| trace.element(event).t_pre)
        else {
            debug!(position = i, "cycle candidate discarded: no concurrent acquire");
            return;
        };
        witnesses.push(earliest);
    }

    let stuck = *witnesses.last().expect("cycle has positions");
    let secondary = witnesses.iter().map(|&w| trace.summarize(w)).collect();
    ctx.sink.emit(AnalysisResult::new(
        BugKind::PossibleCyclicDeadlock,
        vec![trace.summarize(stuck)],
        secondary,
    ));
}

fn neighbor_concurrent(trace: &Trace, event: EventId, neighbors: &[EventId]) -> bool {
    let clock = &trace.element(event).wvc;
    neighbors.iter().any(|&other| {
        clock
            .happens_before(&trace.element(other).wvc)
            .is_concurrent()
    })
}
