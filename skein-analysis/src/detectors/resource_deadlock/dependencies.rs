//! Lock-dependency recording (phase 1).
//!
//! On every successful acquire taken while the routine already holds
//! locks, the tuple (routine, lock, held lockset, event) is recorded.
//! Acquires with identical routine and lockset aggregate their events.

use skein_core::types::{EventId, PrimitiveId, RoutineId};
use tracing::warn;

use crate::engine::state::{EngineState, LockDependency, LockMode};

/// Record one acquire. Call before the lock enters the routine's lockset.
pub fn record_acquire(
    state: &mut EngineState,
    routine: RoutineId,
    lock: PrimitiveId,
    mode: LockMode,
    event: EventId,
) {
    if state.deadlock_analysis_failed {
        return;
    }
    if state.lockset[routine.index()].is_empty() {
        return;
    }
    let mut lockset = state.lockset[routine.index()].snapshot();
    lockset.sort_by_key(|&(id, m)| (id.raw(), m == LockMode::Write));

    let deps = state.lock_dependencies.entry(lock).or_default();
    if let Some(dep) = deps
        .iter_mut()
        .find(|d| d.routine == routine && d.mode == mode && d.lockset == lockset)
    {
        dep.events.push(event);
    } else {
        deps.push(LockDependency {
            routine,
            lock,
            mode,
            lockset,
            events: vec![event],
        });
    }
}

/// A release of a lock the routine does not hold: cross-thread release.
/// The lockset bookkeeping is no longer trustworthy, so the whole
/// analysis is marked failed; other predicates continue.
pub fn mark_failed(state: &mut EngineState, routine: RoutineId, lock: PrimitiveId) {
    if !state.deadlock_analysis_failed {
        warn!(
            routine = routine.raw(),
            lock = lock.raw(),
            "release of a lock not held by the routine; resource-deadlock analysis disabled"
        );
    }
    state.deadlock_analysis_failed = true;
}
