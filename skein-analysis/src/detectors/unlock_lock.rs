//! Possible unlock-before-lock.
//!
//! The same flow construction as the wait-group check, with locks as
//! supplies and unlocks as demands. The common case — every unlock
//! matched by a preceding lock of the same routine — is skipped without
//! building the network.

use skein_core::results::{AnalysisResult, BugKind, ElementRef, Severity};
use skein_core::types::collections::FxHashMap;
use skein_core::types::PrimitiveId;
use tracing::warn;

use crate::clock::HappensBefore;
use crate::engine::state::{EngineState, LockOp};
use crate::engine::updater::UpdateCtx;
use crate::trace::trace::Trace;

use super::flow::BipartiteFlow;

/// Run the check for every lock id that saw an unlock.
pub fn check_all(state: &EngineState, trace: &Trace, ctx: &mut UpdateCtx<'_>) {
    let mut ids: Vec<PrimitiveId> = state.all_unlocks.keys().copied().collect();
    ids.sort();
    for id in ids {
        let unlocks = &state.all_unlocks[&id];
        let locks = state.all_locks.get(&id).map(Vec::as_slice).unwrap_or(&[]);
        check_mutex(trace, id, locks, unlocks, ctx);
    }
}

fn check_mutex(
    trace: &Trace,
    id: PrimitiveId,
    locks: &[LockOp],
    unlocks: &[LockOp],
    ctx: &mut UpdateCtx<'_>,
) {
    if unlocks.is_empty() {
        return;
    }
    if same_routine_balanced(trace, locks, unlocks) {
        return;
    }

    let capacities: Vec<u32> = locks.iter().map(|_| 1).collect();
    let mut network = BipartiteFlow::new(unlocks.len(), &capacities);
    for (u, unlock) in unlocks.iter().enumerate() {
        for (l, lock) in locks.iter().enumerate() {
            if lock.clock.happens_before(&unlock.clock) == HappensBefore::Before {
                network.connect(u, l);
            }
        }
    }

    match network.run() {
        Err(_) => {
            warn!(mutex = id.raw(), "max-flow iteration bound hit; inconclusive");
            ctx.sink.emit(
                AnalysisResult::new(
                    BugKind::PossibleUnlockBeforeLock,
                    unlocks.iter().map(|op| trace.summarize(op.event)).collect(),
                    locks.iter().map(|op| trace.summarize(op.event)).collect(),
                )
                .with_severity(Severity::Information),
            );
        }
        Ok(outcome) => {
            if outcome.max_flow < unlocks.len() as u64 {
                let primary: Vec<ElementRef> = outcome
                    .uncovered_demands
                    .iter()
                    .map(|&u| trace.summarize(unlocks[u].event))
                    .collect();
                // Locks on the cut side, ordered so the ones concurrent
                // with an uncovered unlock come first.
                let mut cut: Vec<usize> = outcome.cut_supplies.clone();
                cut.sort_by_key(|&l| {
                    let concurrent = outcome.uncovered_demands.iter().any(|&u| {
                        locks[l]
                            .clock
                            .happens_before(&unlocks[u].clock)
                            .is_concurrent()
                    });
                    !concurrent
                });
                let secondary: Vec<ElementRef> = cut
                    .into_iter()
                    .map(|l| trace.summarize(locks[l].event))
                    .collect();
                ctx.sink.emit(AnalysisResult::new(
                    BugKind::PossibleUnlockBeforeLock,
                    if primary.is_empty() {
                        unlocks.iter().map(|op| trace.summarize(op.event)).collect()
                    } else {
                        primary
                    },
                    secondary,
                ));
            }
        }
    }
}

/// True when walking each routine's lock/unlock sequence in recorded
/// order never releases more than it acquired — the shape a correct
/// same-routine protocol always has.
fn same_routine_balanced(trace: &Trace, locks: &[LockOp], unlocks: &[LockOp]) -> bool {
    #[derive(Clone, Copy)]
    enum Kind {
        Lock,
        Unlock,
    }
    let mut per_routine: FxHashMap<u32, Vec<(u64, Kind)>> = FxHashMap::default();
    for op in locks {
        per_routine
            .entry(op.routine.raw())
            .or_default()
            .push((trace.element(op.event).t_pre, Kind::Lock));
    }
    for op in unlocks {
        per_routine
            .entry(op.routine.raw())
            .or_default()
            .push((trace.element(op.event).t_pre, Kind::Unlock));
    }
    for ops in per_routine.values_mut() {
        ops.sort_by_key(|&(t_pre, _)| t_pre);
        let mut held: i64 = 0;
        for &(_, kind) in ops.iter() {
            match kind {
                Kind::Lock => held += 1,
                Kind::Unlock => {
                    held -= 1;
                    if held < 0 {
                        return false;
                    }
                }
            }
        }
    }
    true
}
