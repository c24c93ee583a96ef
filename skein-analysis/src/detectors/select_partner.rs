//! Select cases without a feasible partner.
//!
//! Three streams: an initial scan when the select is processed, updates
//! from every later channel op and close, and a final sweep that also
//! pairs recorded cases with each other. A case that never finds a
//! partner is reported — it can never fire in any schedule compatible
//! with the recorded synchronization.

use skein_core::results::{AnalysisResult, BugKind};
use skein_core::types::{EventId, PrimitiveId};

use crate::clock::VectorClock;
use crate::engine::state::{CaseRecord, EngineState};
use crate::engine::updater::channel::ChanOp;
use crate::engine::updater::UpdateCtx;
use crate::trace::channel::{ChannelDir, ChannelOp};
use crate::trace::event::ElementKind;
use crate::trace::trace::Trace;

/// Whether `other_clock` is a feasible partner for the case. Unbuffered
/// cases need concurrency; buffered cases also accept the ordering that
/// lets the buffer bridge the two ops.
fn case_feasible(record: &CaseRecord, other_clock: &VectorClock) -> bool {
    if !record.buffered {
        return record.clock.happens_before(other_clock).is_concurrent();
    }
    match record.dir {
        ChannelDir::Send => record
            .clock
            .happens_before(other_clock)
            .is_concurrent_or_before(),
        ChannelDir::Recv => other_clock
            .happens_before(&record.clock)
            .is_concurrent_or_before(),
    }
}

/// Record the cases of one select and run the initial partner scan.
/// Idempotent per select element.
pub fn record_select(state: &mut EngineState, trace: &Trace, select: EventId, ctx: &mut UpdateCtx<'_>) {
    if !ctx.config.select_without_partner {
        return;
    }
    let element = trace.element(select);
    let Some(s) = element.as_select() else {
        return;
    };
    // A parked select has no clock yet; it records when it is retried.
    if element.vc.is_empty() {
        return;
    }
    if !state.recorded_selects.insert(select) {
        return;
    }
    let completed = !element.is_blocked();

    let mut records = Vec::with_capacity(s.cases.len());
    for (index, case) in s.cases.iter().enumerate() {
        if case.channel.is_nil() {
            continue;
        }
        let executed = completed && s.chosen == Some(index);
        let mut record = CaseRecord {
            select,
            index,
            routine: element.routine,
            channel: case.channel,
            dir: case.dir,
            buffered: case.is_buffered(),
            clock: element.vc.clone(),
            // An executed case paired through the linking pass or fired
            // off a close has its partner by construction.
            partner_found: executed && (case.partner.is_some() || case.closed),
        };
        if !record.partner_found {
            initial_scan(state, trace, &mut record);
        }
        records.push(record);
    }
    state.select_cases.extend(records);
}

fn initial_scan(state: &EngineState, trace: &Trace, record: &mut CaseRecord) {
    let snapshots = match record.dir {
        ChannelDir::Send => &state.most_recent_recv,
        ChannelDir::Recv => &state.most_recent_send,
    };
    for per_routine in snapshots {
        if let Some(snap) = per_routine.get(&record.channel) {
            if case_feasible(record, &snap.clock) {
                record.partner_found = true;
                return;
            }
        }
    }
    if record.dir == ChannelDir::Recv {
        if let Some(&close) = state.close_record.get(&record.channel) {
            if close_feasible(record, &trace.element(close).vc) {
                record.partner_found = true;
            }
        }
    }
}

/// A close unblocks receive cases that cannot be strictly before it.
fn close_feasible(record: &CaseRecord, close_clock: &VectorClock) -> bool {
    close_clock
        .happens_before(&record.clock)
        .is_concurrent_or_before()
}

/// Mark every unfound case the given op could feed.
fn mark_feasible(
    cases: &mut [CaseRecord],
    op_element: EventId,
    channel: PrimitiveId,
    dir: ChannelDir,
    clock: &VectorClock,
) {
    for record in cases.iter_mut() {
        if record.partner_found
            || record.channel != channel
            || record.dir != dir.opposite()
            || record.select == op_element
        {
            continue;
        }
        if case_feasible(record, clock) {
            record.partner_found = true;
        }
    }
}

/// Stream 2: a later channel op may be the partner of an already
/// recorded case.
pub(crate) fn observe_channel_op(
    state: &mut EngineState,
    trace: &Trace,
    op: &ChanOp,
    _ctx: &mut UpdateCtx<'_>,
) {
    let clock = trace.element(op.event).vc.clone();
    for record in &mut state.select_cases {
        if record.partner_found
            || record.channel != op.channel
            || record.dir != op.dir.opposite()
            || record.select == op.event
        {
            continue;
        }
        if case_feasible(record, &clock) {
            record.partner_found = true;
        }
    }
}

/// Stream 3: a later close acts as the receive-side partner.
pub fn observe_close(
    state: &mut EngineState,
    trace: &Trace,
    close: EventId,
    channel: PrimitiveId,
    _ctx: &mut UpdateCtx<'_>,
) {
    let clock = trace.element(close).vc.clone();
    for record in &mut state.select_cases {
        if record.partner_found || record.channel != channel || record.dir != ChannelDir::Recv {
            continue;
        }
        if close_feasible(record, &clock) {
            record.partner_found = true;
        }
    }
}

/// Final pass: re-run the partner search over every channel op in the
/// trace (a select may have been processed after its partner), pair
/// cases with each other, and report what is left.
pub fn final_sweep(state: &mut EngineState, trace: &Trace, ctx: &mut UpdateCtx<'_>) {
    let mut cases = std::mem::take(&mut state.select_cases);

    for id in trace.ids() {
        if cases.iter().all(|record| record.partner_found) {
            break;
        }
        let element = trace.element(id);
        if element.vc.is_empty() {
            continue;
        }
        match &element.kind {
            // Blocked ops count too: a pending send can still feed a
            // receive case.
            ElementKind::Channel(c) => match c.op {
                ChannelOp::Close => {
                    for record in cases.iter_mut() {
                        if record.partner_found
                            || record.channel != c.channel
                            || record.dir != ChannelDir::Recv
                        {
                            continue;
                        }
                        if close_feasible(record, &element.vc) {
                            record.partner_found = true;
                        }
                    }
                }
                _ if !c.closed => {
                    let dir = c.op.dir().expect("send or recv");
                    mark_feasible(&mut cases, id, c.channel, dir, &element.vc);
                }
                _ => {}
            },
            ElementKind::Select(s) => {
                // Non-chosen cases are paired case-vs-case below.
                let Some(case) = s.chosen.and_then(|i| s.cases.get(i)) else {
                    continue;
                };
                if element.is_blocked() || case.closed || case.channel.is_nil() {
                    continue;
                }
                mark_feasible(&mut cases, id, case.channel, case.dir, &element.vc);
            }
            _ => {}
        }
    }

    // Case-vs-case pairing across selects.
    for i in 0..cases.len() {
        if cases[i].partner_found {
            continue;
        }
        for j in 0..cases.len() {
            if i == j || cases[i].select == cases[j].select {
                continue;
            }
            if cases[i].channel != cases[j].channel || cases[i].dir != cases[j].dir.opposite() {
                continue;
            }
            let (send, recv) = if cases[i].dir == ChannelDir::Send {
                (&cases[i], &cases[j])
            } else {
                (&cases[j], &cases[i])
            };
            let relation = send.clock.happens_before(&recv.clock);
            let feasible = if send.buffered || recv.buffered {
                relation.is_concurrent_or_before()
            } else {
                relation.is_concurrent()
            };
            if feasible {
                cases[i].partner_found = true;
                cases[j].partner_found = true;
                break;
            }
        }
    }

    for record in &cases {
        if !record.partner_found {
            ctx.sink.emit(AnalysisResult::new(
                BugKind::SelectWithoutPartner,
                vec![trace.summarize_case(record.select, record.index)],
                vec![],
            ));
        }
    }

    state.select_cases = cases;
}
