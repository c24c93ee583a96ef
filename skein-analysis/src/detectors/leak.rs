//! Leak predicates.
//!
//! A leak is any channel/select/mutex/wait-group/cond operation with
//! `t_post = 0`. Blocked channel ops and select cases hunt for a
//! concurrent partner in three streams: at registration (against the
//! completed-op snapshots, the close record, and earlier-registered
//! blocked ops), on each later successful op, and in a final sweep
//! against the recorded select cases. Whatever stays unpaired is
//! reported without a partner.

use skein_core::results::{AnalysisResult, BugKind, ElementRef};
use skein_core::types::collections::SmallVec8;
use skein_core::types::{EventId, PrimitiveId, RoutineId};

use crate::clock::VectorClock;
use crate::engine::state::{CaseRecord, EngineState, LeakEntry, LockMode};
use crate::engine::updater::channel::ChanOp;
use crate::engine::updater::UpdateCtx;
use crate::trace::channel::ChannelDir;
use crate::trace::event::{ElementKind, PartnerRef};
use crate::trace::trace::Trace;

use super::mixed_deadlock;

/// Whether `partner_clock` could have unblocked an op with
/// `blocked_clock`. Unbuffered channels need concurrency; a buffered
/// partner may also be strictly earlier.
fn feasible(partner_clock: &VectorClock, blocked_clock: &VectorClock, buffered: bool) -> bool {
    let relation = partner_clock.happens_before(blocked_clock);
    if buffered {
        relation.is_concurrent_or_before()
    } else {
        relation.is_concurrent()
    }
}

fn with_partner_kind(endpoint: PartnerRef, buffered: bool) -> BugKind {
    match endpoint {
        PartnerRef::Case { .. } => BugKind::LeakSelectWithPartner,
        PartnerRef::Element(_) if buffered => BugKind::LeakBufferedWithPartner,
        PartnerRef::Element(_) => BugKind::LeakUnbufferedWithPartner,
    }
}

fn without_partner_kind(buffered: bool) -> BugKind {
    if buffered {
        BugKind::LeakBufferedWithoutPartner
    } else {
        BugKind::LeakUnbufferedWithoutPartner
    }
}

fn emit_with_partner(
    state: &EngineState,
    trace: &Trace,
    ctx: &mut UpdateCtx<'_>,
    entry_endpoint: PartnerRef,
    entry_buffered: bool,
    entry_lockset: &[(PrimitiveId, LockMode)],
    partner_ref: ElementRef,
    partner_lockset: &[(PrimitiveId, LockMode)],
) {
    let kind = with_partner_kind(entry_endpoint, entry_buffered);
    let mut result = AnalysisResult::new(
        kind,
        vec![trace.summarize_partner(entry_endpoint)],
        vec![partner_ref],
    );
    if ctx.config.mixed_deadlock {
        result = mixed_deadlock::escalate(state, trace, result, entry_lockset, partner_lockset);
    }
    ctx.sink.emit(result);
}

// ---- registration-time stream ----

/// A blocked plain-channel send/recv: look for a partner now, then
/// register for the later streams.
pub(crate) fn blocked_channel_op(
    state: &mut EngineState,
    trace: &Trace,
    op: &ChanOp,
    ctx: &mut UpdateCtx<'_>,
) {
    let clock = trace.element(op.event).vc.clone();
    let buffered = op.q_size > 0;
    let lockset = state.lockset[op.routine.index()].snapshot();
    let mut entry = LeakEntry {
        endpoint: op.endpoint,
        routine: op.routine,
        dir: op.dir,
        buffered,
        clock: clock.clone(),
        lockset: lockset.clone(),
        reported: false,
    };

    if let Some(found) = find_partner(state, trace, op.channel, op.dir, &clock, buffered) {
        entry.reported = true;
        emit_with_partner(
            state,
            trace,
            ctx,
            op.endpoint,
            buffered,
            &lockset,
            found.reference.clone(),
            &found.lockset,
        );
        if let Some(index) = found.mutual_leak {
            // The partner is itself a leak: each side witnesses the other.
            report_mutual(state, trace, ctx, op.channel, index, op.endpoint, &lockset);
        }
    }

    state.leaking_ops.entry(op.channel).or_default().push(entry);
}

/// A blocked select: every case is a blocked operation. One result is
/// emitted if any case has a partner; all cases register.
pub(crate) fn blocked_select(
    state: &mut EngineState,
    trace: &Trace,
    select: EventId,
    ctx: &mut UpdateCtx<'_>,
) {
    let element = trace.element(select);
    let routine = element.routine;
    let clock = element.vc.clone();
    let lockset = state.lockset[routine.index()].snapshot();
    let Some(s) = element.as_select() else {
        return;
    };

    let mut reported = false;
    let mut entries = Vec::with_capacity(s.cases.len());
    for (index, case) in s.cases.iter().enumerate() {
        if case.channel.is_nil() {
            continue;
        }
        let endpoint = PartnerRef::Case { select, index };
        let buffered = case.is_buffered();
        let mut entry = LeakEntry {
            endpoint,
            routine,
            dir: case.dir,
            buffered,
            clock: clock.clone(),
            lockset: lockset.clone(),
            reported: false,
        };
        if !reported {
            if let Some(found) = find_partner(state, trace, case.channel, case.dir, &clock, buffered)
            {
                reported = true;
                entry.reported = true;
                emit_with_partner(
                    state,
                    trace,
                    ctx,
                    endpoint,
                    buffered,
                    &lockset,
                    found.reference.clone(),
                    &found.lockset,
                );
                if let Some(index) = found.mutual_leak {
                    report_mutual(state, trace, ctx, case.channel, index, endpoint, &lockset);
                }
            }
        }
        entries.push((case.channel, entry));
    }

    for (channel, mut entry) in entries {
        // A select leak is reported at most once.
        entry.reported |= reported;
        state.leaking_ops.entry(channel).or_default().push(entry);
    }
}

/// Report a registered leak whose partner turned out to be the op just
/// examined — each side is a leak witness of the other.
fn report_mutual(
    state: &mut EngineState,
    trace: &Trace,
    ctx: &mut UpdateCtx<'_>,
    channel: PrimitiveId,
    index: usize,
    witness: PartnerRef,
    witness_lockset: &[(PrimitiveId, LockMode)],
) {
    let (other_endpoint, other_buffered, other_lockset) = {
        let others = state.leaking_ops.get_mut(&channel).expect("entry exists");
        let other = &mut others[index];
        if other.reported {
            return;
        }
        other.reported = true;
        (other.endpoint, other.buffered, other.lockset.clone())
    };
    emit_with_partner(
        state,
        trace,
        ctx,
        other_endpoint,
        other_buffered,
        &other_lockset,
        trace.summarize_partner(witness),
        witness_lockset,
    );
}

struct FoundPartner {
    reference: ElementRef,
    lockset: SmallVec8<(PrimitiveId, LockMode)>,
    /// Index into `leaking_ops[channel]` when the partner is itself a
    /// registered leak.
    mutual_leak: Option<usize>,
}

fn find_partner(
    state: &EngineState,
    trace: &Trace,
    channel: PrimitiveId,
    dir: ChannelDir,
    clock: &VectorClock,
    buffered: bool,
) -> Option<FoundPartner> {
    // Completed complementary operations.
    let snapshots = match dir {
        ChannelDir::Send => &state.most_recent_recv,
        ChannelDir::Recv => &state.most_recent_send,
    };
    for per_routine in snapshots {
        if let Some(snap) = per_routine.get(&channel) {
            if feasible(&snap.clock, clock, buffered) {
                return Some(FoundPartner {
                    reference: trace.summarize_partner(snap.event),
                    lockset: snap.lockset.clone(),
                    mutual_leak: None,
                });
            }
        }
    }

    // The close would unblock a receive (and panic a send).
    if let Some(&close) = state.close_record.get(&channel) {
        if feasible(&trace.element(close).vc, clock, buffered) {
            return Some(FoundPartner {
                reference: trace.summarize(close),
                lockset: SmallVec8::new(),
                mutual_leak: None,
            });
        }
    }

    // Earlier-registered blocked ops of the complementary direction.
    if let Some(entries) = state.leaking_ops.get(&channel) {
        for (index, other) in entries.iter().enumerate() {
            if other.dir != dir.opposite() {
                continue;
            }
            if feasible(&other.clock, clock, buffered || other.buffered) {
                return Some(FoundPartner {
                    reference: trace.summarize_partner(other.endpoint),
                    lockset: other.lockset.clone(),
                    mutual_leak: Some(index),
                });
            }
        }
    }
    None
}

// ---- success-time stream ----

/// A successful send/recv may be the partner of an earlier-registered
/// blocked op on the same channel.
pub(crate) fn completed_channel_op(
    state: &mut EngineState,
    trace: &Trace,
    op: &ChanOp,
    ctx: &mut UpdateCtx<'_>,
) {
    let clock = trace.element(op.event).vc.clone();
    let lockset = state.lockset[op.routine.index()].snapshot();
    resolve_leaks(
        state,
        trace,
        ctx,
        op.channel,
        Some(op.dir.opposite()),
        &clock,
        trace.summarize_partner(op.endpoint),
        &lockset,
    );
}

/// A close resolves blocked receives (they complete) and blocked sends
/// (they panic); either way it is the witness.
pub(crate) fn completed_close(
    state: &mut EngineState,
    trace: &Trace,
    close: EventId,
    channel: PrimitiveId,
    ctx: &mut UpdateCtx<'_>,
) {
    let clock = trace.element(close).vc.clone();
    resolve_leaks(
        state,
        trace,
        ctx,
        channel,
        None,
        &clock,
        trace.summarize(close),
        &[],
    );
}

#[allow(clippy::too_many_arguments)]
fn resolve_leaks(
    state: &mut EngineState,
    trace: &Trace,
    ctx: &mut UpdateCtx<'_>,
    channel: PrimitiveId,
    dir_filter: Option<ChannelDir>,
    partner_clock: &VectorClock,
    partner_ref: ElementRef,
    partner_lockset: &[(PrimitiveId, LockMode)],
) {
    let mut matched: Vec<(PartnerRef, bool, SmallVec8<(PrimitiveId, LockMode)>)> = Vec::new();
    if let Some(entries) = state.leaking_ops.get_mut(&channel) {
        for entry in entries.iter_mut() {
            if entry.reported {
                continue;
            }
            if let Some(dir) = dir_filter {
                if entry.dir != dir {
                    continue;
                }
            }
            if feasible(partner_clock, &entry.clock, entry.buffered) {
                entry.reported = true;
                matched.push((entry.endpoint, entry.buffered, entry.lockset.clone()));
            }
        }
    }
    for (endpoint, buffered, lockset) in matched {
        emit_with_partner(
            state,
            trace,
            ctx,
            endpoint,
            buffered,
            &lockset,
            partner_ref.clone(),
            partner_lockset,
        );
    }
}

// ---- immediate leak reports ----

/// Blocked mutex acquire, paired with the most recent acquire (the
/// probable holder).
pub fn report_mutex_leak(
    state: &EngineState,
    trace: &Trace,
    eid: EventId,
    ctx: &mut UpdateCtx<'_>,
) {
    let Some(mutex) = trace.element(eid).as_mutex().map(|m| m.mutex) else {
        return;
    };
    let secondary = state
        .most_recent_acquire
        .get(&mutex)
        .map(|acquire| vec![trace.summarize(acquire.event)])
        .unwrap_or_default();
    ctx.sink.emit(AnalysisResult::new(
        BugKind::LeakMutex,
        vec![trace.summarize(eid)],
        secondary,
    ));
}

pub fn report_wait_group_leak(trace: &Trace, eid: EventId, ctx: &mut UpdateCtx<'_>) {
    ctx.sink.emit(AnalysisResult::new(
        BugKind::LeakWaitGroup,
        vec![trace.summarize(eid)],
        vec![],
    ));
}

pub fn report_cond_leak(trace: &Trace, eid: EventId, ctx: &mut UpdateCtx<'_>) {
    ctx.sink.emit(AnalysisResult::new(
        BugKind::LeakCond,
        vec![trace.summarize(eid)],
        vec![],
    ));
}

pub(crate) fn report_nil_channel_leak(trace: &Trace, op: &ChanOp, ctx: &mut UpdateCtx<'_>) {
    ctx.sink.emit(AnalysisResult::new(
        BugKind::LeakNilChannel,
        vec![trace.summarize_partner(op.endpoint)],
        vec![],
    ));
}

/// A completed op whose counterpart never appears in the trace
/// (PartnerMissing): kept as a leak candidate for the final sweep.
pub(crate) fn register_unmatched(state: &mut EngineState, trace: &Trace, op: &ChanOp) {
    let entry = LeakEntry {
        endpoint: op.endpoint,
        routine: op.routine,
        dir: op.dir,
        buffered: op.q_size > 0,
        clock: trace.element(op.event).vc.clone(),
        lockset: state.lockset[op.routine.index()].snapshot(),
        reported: false,
    };
    state.leaking_ops.entry(op.channel).or_default().push(entry);
}

// ---- final sweep ----

/// Pair leftovers against the recorded select cases, then report
/// whatever stayed unpaired.
pub fn final_sweep(state: &mut EngineState, trace: &Trace, ctx: &mut UpdateCtx<'_>) {
    let cases: Vec<CaseRecord> = state.select_cases.clone();

    // Select cases as partners for leftover blocked ops.
    let channels: Vec<PrimitiveId> = state.leaking_ops.keys().copied().collect();
    for channel in channels {
        let mut emissions = Vec::new();
        if let Some(entries) = state.leaking_ops.get_mut(&channel) {
            for entry in entries.iter_mut() {
                if entry.reported {
                    continue;
                }
                for case in cases.iter().filter(|c| c.channel == channel) {
                    if case.dir != entry.dir.opposite() {
                        continue;
                    }
                    if (PartnerRef::Case {
                        select: case.select,
                        index: case.index,
                    }) == entry.endpoint
                    {
                        continue;
                    }
                    if feasible(&case.clock, &entry.clock, entry.buffered) {
                        entry.reported = true;
                        emissions.push((
                            entry.endpoint,
                            entry.buffered,
                            entry.lockset.clone(),
                            trace.summarize_case(case.select, case.index),
                        ));
                        break;
                    }
                }
            }
        }
        for (endpoint, buffered, lockset, partner_ref) in emissions {
            emit_with_partner(state, trace, ctx, endpoint, buffered, &lockset, partner_ref, &[]);
        }
    }

    // Unpaired leftovers: channel ops report per op, select leaks report
    // once per select.
    let mut selects_without_partner: Vec<EventId> = Vec::new();
    for entries in state.leaking_ops.values() {
        for entry in entries {
            if entry.reported {
                continue;
            }
            match entry.endpoint {
                PartnerRef::Element(_) => {
                    ctx.sink.emit(AnalysisResult::new(
                        without_partner_kind(entry.buffered),
                        vec![trace.summarize_partner(entry.endpoint)],
                        vec![],
                    ));
                }
                PartnerRef::Case { select, .. } => {
                    if !selects_without_partner.contains(&select) {
                        selects_without_partner.push(select);
                    }
                }
            }
        }
    }
    for select in selects_without_partner {
        ctx.sink.emit(AnalysisResult::new(
            BugKind::LeakSelectWithoutPartner,
            vec![trace.summarize(select)],
            vec![],
        ));
    }
}

/// Routines that never ended without a blocked operation to blame.
pub fn stuck_routines(state: &EngineState, trace: &Trace, ctx: &mut UpdateCtx<'_>) {
    for index in 0..trace.routine_count() {
        let routine = RoutineId::from_index(index);
        let events = trace.events_of(routine);
        let Some(&last) = events.last() else {
            continue;
        };
        let element = trace.element(last);
        if matches!(element.kind, ElementKind::RoutineEnd | ElementKind::ReplayEnd(_)) {
            continue;
        }
        if element.t_post == 0 {
            continue;
        }
        // Attribute the leak to the spawning fork when known.
        let primary = state
            .all_forks
            .get(&routine)
            .map(|&fork| trace.summarize(fork))
            .unwrap_or_else(|| trace.summarize(last));
        ctx.sink.emit(AnalysisResult::new(
            BugKind::LeakWithoutBlock,
            vec![primary],
            vec![],
        ));
    }
}
