//! Mutex handling.
//!
//! Acquires observe the release clocks of the lock (write releases for
//! readers, both for writers); releases publish them. The weak clock
//! never synchronizes on mutex events — it is the must-happen-before
//! underapproximation the deadlock analysis relies on. With
//! `ignore_critical_sections` the strong clock skips these edges too.

use skein_core::errors::AnalysisError;
use skein_core::results::{FlowCandidate, FlowKind};
use skein_core::types::EventId;

use crate::clock::HappensBefore;
use crate::detectors::{leak, resource_deadlock};
use crate::engine::state::{AcquireSnapshot, EngineState, LockMode, LockOp};
use crate::trace::event::ElementKind;
use crate::trace::mutex::MutexOp;
use crate::trace::trace::Trace;

use super::{capture, inc_both, UpdateCtx};

pub fn update(
    state: &mut EngineState,
    trace: &mut Trace,
    eid: EventId,
    ctx: &mut UpdateCtx<'_>,
) -> Result<(), AnalysisError> {
    capture(state, trace, eid);
    let element = trace.element(eid);
    let routine = element.routine;
    let ElementKind::Mutex(mutex) = &element.kind else {
        unreachable!("update_mutex on non-mutex element");
    };
    let (id, op, success) = (mutex.mutex, mutex.op, mutex.success);

    // A blocked acquire is a leak; no bookkeeping happens for it.
    if element.is_blocked() {
        if ctx.config.leak {
            leak::report_mutex_leak(state, trace, eid, ctx);
        }
        return inc_both(state, trace, eid);
    }

    match op {
        MutexOp::Lock | MutexOp::TryLock if success => {
            if !ctx.config.ignore_critical_sections {
                if let Some(rel) = state.rel_w.get(&id) {
                    let rel = rel.clone();
                    state.current[routine.index()].sync(&rel)?;
                }
                if let Some(rel) = state.rel_r.get(&id) {
                    let rel = rel.clone();
                    state.current[routine.index()].sync(&rel)?;
                }
            }
            acquire(state, trace, eid, LockMode::Write, ctx);
        }
        MutexOp::RLock | MutexOp::TryRLock if success => {
            if !ctx.config.ignore_critical_sections {
                if let Some(rel) = state.rel_w.get(&id) {
                    let rel = rel.clone();
                    state.current[routine.index()].sync(&rel)?;
                }
            }
            acquire(state, trace, eid, LockMode::Read, ctx);
        }
        MutexOp::TryLock | MutexOp::TryRLock => {
            // Failed try: clocks still advance. In fuzzing mode a failed
            // try concurrent with the holding acquire is a flow candidate.
            if ctx.config.fuzzing {
                if let Some(&holder) = state.currently_held.get(&id) {
                    let holder_vc = &trace.element(holder).vc;
                    if trace.element(eid).vc.happens_before(holder_vc) == HappensBefore::Concurrent
                    {
                        ctx.flows.push(FlowCandidate {
                            kind: FlowKind::FailedTryLock,
                            blocked: trace.summarize(eid),
                            counterpart: trace.summarize(holder),
                        });
                    }
                }
            }
        }
        MutexOp::Unlock => {
            state
                .rel_w
                .insert(id, state.current[routine.index()].clone());
            state
                .rel_r
                .insert(id, state.current[routine.index()].clone());
            release(state, trace, eid, LockMode::Write);
        }
        MutexOp::RUnlock => {
            let current = state.current[routine.index()].clone();
            let routines = state.routine_count();
            let rel = state
                .rel_r
                .entry(id)
                .or_insert_with(|| crate::clock::VectorClock::new(routines));
            rel.sync(&current)?;
            release(state, trace, eid, LockMode::Read);
        }
        _ => {}
    }

    inc_both(state, trace, eid)
}

fn acquire(
    state: &mut EngineState,
    trace: &Trace,
    eid: EventId,
    mode: LockMode,
    ctx: &mut UpdateCtx<'_>,
) {
    let element = trace.element(eid);
    let routine = element.routine;
    let ElementKind::Mutex(mutex) = &element.kind else {
        return;
    };
    let id = mutex.mutex;

    if ctx.config.resource_deadlock || ctx.config.cyclic_deadlock {
        resource_deadlock::record_acquire(state, routine, id, mode, eid);
    }

    state.lockset[routine.index()].acquire(id, mode);
    state.currently_held.insert(id, eid);
    state.all_locks.entry(id).or_default().push(LockOp {
        event: eid,
        routine,
        clock: element.vc.clone(),
    });
    if ctx.config.leak {
        state.most_recent_acquire.insert(
            id,
            AcquireSnapshot {
                event: eid,
                clock: element.vc.clone(),
                op: mutex.op,
            },
        );
    }
}

fn release(state: &mut EngineState, trace: &Trace, eid: EventId, mode: LockMode) {
    let element = trace.element(eid);
    let routine = element.routine;
    let ElementKind::Mutex(mutex) = &element.kind else {
        return;
    };
    let id = mutex.mutex;

    if !state.lockset[routine.index()].release(id, mode) {
        // Cross-thread release: the lock-dependency recording can no
        // longer be trusted.
        resource_deadlock::mark_failed(state, routine, id);
    }
    state.currently_held.remove(&id);
    state.all_unlocks.entry(id).or_default().push(LockOp {
        event: eid,
        routine,
        clock: element.vc.clone(),
    });
}
