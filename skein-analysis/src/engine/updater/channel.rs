//! Channel handling.
//!
//! Unbuffered sends and receives are paired by the linking pass and
//! processed as one joint transition when the first endpoint is reached;
//! the partner is consumed from the iterator. Buffered operations go
//! through the per-channel buffer ring; a send hitting a full buffer or
//! a receive hitting an empty one is parked on a hold list and retried
//! after the next complementary success, which recovers oID-matched
//! draining without assuming a particular schedule.

use skein_core::errors::AnalysisError;
use skein_core::types::{EventId, OpId, PrimitiveId, RoutineId};
use tracing::warn;

use crate::detectors::{closed_channel, concurrent_recv, leak, select_partner};
use crate::engine::state::{BufSlot, ClockSnapshot, EngineState, OpSnapshot};
use crate::trace::channel::{ChannelDir, ChannelOp};
use crate::trace::event::{ElementKind, PartnerRef};
use crate::trace::iterator::SortedIter;
use crate::trace::trace::Trace;

use super::UpdateCtx;

/// A channel communication endpoint, normalized over plain channel
/// elements and chosen select cases.
#[derive(Debug, Clone)]
pub(crate) struct ChanOp {
    pub endpoint: PartnerRef,
    /// The arena element carrying the clocks (the select, for cases).
    pub event: EventId,
    pub routine: RoutineId,
    pub channel: PrimitiveId,
    pub dir: ChannelDir,
    pub o_id: OpId,
    pub q_size: u32,
    pub closed: bool,
    pub blocked: bool,
    pub partner: Option<PartnerRef>,
}

/// Normalize an endpoint into a [`ChanOp`]. Returns `None` for close
/// elements and malformed endpoints.
pub(crate) fn chan_op(trace: &Trace, endpoint: PartnerRef) -> Option<ChanOp> {
    match endpoint {
        PartnerRef::Element(id) => {
            let element = trace.element(id);
            let c = element.as_channel()?;
            let dir = c.op.dir()?;
            Some(ChanOp {
                endpoint,
                event: id,
                routine: element.routine,
                channel: c.channel,
                dir,
                o_id: c.o_id,
                q_size: c.q_size,
                closed: c.closed,
                blocked: element.is_blocked(),
                partner: c.partner,
            })
        }
        PartnerRef::Case { select, index } => {
            let element = trace.element(select);
            let s = element.as_select()?;
            let case = s.cases.get(index)?;
            Some(ChanOp {
                endpoint,
                event: select,
                routine: element.routine,
                channel: case.channel,
                dir: case.dir,
                o_id: case.o_id,
                q_size: case.q_size,
                closed: case.closed,
                blocked: element.is_blocked(),
                partner: case.partner,
            })
        }
    }
}

/// Entry point for plain channel elements.
pub fn update(
    state: &mut EngineState,
    trace: &mut Trace,
    iter: &mut SortedIter,
    eid: EventId,
    ctx: &mut UpdateCtx<'_>,
) -> Result<(), AnalysisError> {
    let ElementKind::Channel(c) = &trace.element(eid).kind else {
        unreachable!("update_channel on non-channel element");
    };
    if c.op == ChannelOp::Close {
        return close(state, trace, eid, ctx);
    }
    let op = chan_op(trace, PartnerRef::Element(eid))
        .expect("send/recv element always yields a ChanOp");
    process_comm(state, trace, iter, op, ctx)
}

/// Process one send/recv endpoint (plain or select case).
pub(crate) fn process_comm(
    state: &mut EngineState,
    trace: &mut Trace,
    iter: &mut SortedIter,
    op: ChanOp,
    ctx: &mut UpdateCtx<'_>,
) -> Result<(), AnalysisError> {
    if op.channel.is_nil() {
        capture_endpoint(state, trace, &op);
        inc_routine(state, op.routine)?;
        if op.blocked && ctx.config.leak {
            leak::report_nil_channel_leak(trace, &op, ctx);
        }
        return Ok(());
    }

    if op.blocked {
        capture_endpoint(state, trace, &op);
        inc_routine(state, op.routine)?;
        if op.dir == ChannelDir::Recv {
            concurrent_recv::observe(state, trace, &op, ctx);
        }
        if ctx.config.leak || ctx.config.mixed_deadlock {
            leak::blocked_channel_op(state, trace, &op, ctx);
        }
        return Ok(());
    }

    if op.closed {
        return comm_on_closed(state, trace, &op, ctx);
    }

    if op.q_size == 0 {
        unbuffered(state, trace, iter, &op, ctx)
    } else {
        let processed = buffered(state, trace, &op, ctx)?;
        if processed {
            drain_holds(state, trace, op.channel, ctx)?;
        }
        Ok(())
    }
}

// ---- closed-channel communication ----

/// A send/recv carrying the recorder's closed flag: synchronize with the
/// close and report the actual bug.
fn comm_on_closed(
    state: &mut EngineState,
    trace: &mut Trace,
    op: &ChanOp,
    ctx: &mut UpdateCtx<'_>,
) -> Result<(), AnalysisError> {
    capture_endpoint(state, trace, op);
    let close = state.close_record.get(&op.channel).copied();
    // Only a receive completes through the close and observes its clock;
    // a send on a closed channel panics instead.
    if op.dir == ChannelDir::Recv {
        if let Some(close_eid) = close {
            let strong = trace.element(close_eid).vc.clone();
            let weak = trace.element(close_eid).wvc.clone();
            if !strong.is_empty() {
                state.current[op.routine.index()].sync(&strong)?;
                state.current_weak[op.routine.index()].sync(&weak)?;
            }
        }
    }
    inc_routine(state, op.routine)?;

    match op.dir {
        ChannelDir::Send if ctx.config.send_on_closed => {
            closed_channel::actual_send_on_closed(trace, op, close, ctx);
        }
        ChannelDir::Recv if ctx.config.receive_on_closed => {
            closed_channel::actual_recv_on_closed(trace, op, close, ctx);
        }
        _ => {}
    }
    Ok(())
}

// ---- unbuffered ----

fn unbuffered(
    state: &mut EngineState,
    trace: &mut Trace,
    iter: &mut SortedIter,
    op: &ChanOp,
    ctx: &mut UpdateCtx<'_>,
) -> Result<(), AnalysisError> {
    let Some(partner_ref) = op.partner else {
        // PartnerMissing: a completed op whose counterpart never appears.
        // Treated as a leak candidate, not an error.
        capture_endpoint(state, trace, op);
        inc_routine(state, op.routine)?;
        if op.dir == ChannelDir::Recv {
            concurrent_recv::observe(state, trace, op, ctx);
        }
        if ctx.config.leak {
            leak::register_unmatched(state, trace, op);
        }
        return Ok(());
    };
    let partner = chan_op(trace, partner_ref)
        .expect("linked partner endpoint always yields a ChanOp");

    // The partner has not been reached yet; take it out of the iterator.
    iter.consume(partner.event);

    let (send, recv) = match op.dir {
        ChannelDir::Send => (op.clone(), partner),
        ChannelDir::Recv => (partner, op.clone()),
    };
    joint(state, trace, &send, &recv, ctx)
}

/// The joint transition of an unbuffered pair:
/// `current[recv].sync(current[send]); current[send] = current[recv];`
/// then both sides advance.
fn joint(
    state: &mut EngineState,
    trace: &mut Trace,
    send: &ChanOp,
    recv: &ChanOp,
    ctx: &mut UpdateCtx<'_>,
) -> Result<(), AnalysisError> {
    let sr = send.routine.index();
    let rr = recv.routine.index();

    // Send side keeps its pre-sync clock.
    capture_endpoint(state, trace, send);

    let send_strong = state.current[sr].clone();
    let send_weak = state.current_weak[sr].clone();
    state.current[rr].sync(&send_strong)?;
    state.current_weak[rr].sync(&send_weak)?;

    // Receive side stores the synced clock.
    capture_endpoint(state, trace, recv);
    // A select-case sender also observes the synced clock on its select.
    if matches!(send.endpoint, PartnerRef::Case { .. }) {
        let element = trace.element_mut(send.event);
        element.vc = state.current[rr].clone();
        element.wvc = state.current_weak[rr].clone();
    }

    let synced_strong = state.current[rr].clone();
    let synced_weak = state.current_weak[rr].clone();

    state.current[sr] = synced_strong.clone();
    state.current_weak[sr] = synced_weak.clone();
    state.current[sr].inc(send.routine)?;
    state.current_weak[sr].inc(send.routine)?;
    state.current[rr].inc(recv.routine)?;
    state.current_weak[rr].inc(recv.routine)?;

    // Both sides observe each other through the synced snapshot.
    let send_lockset = state.lockset[sr].snapshot();
    state.most_recent_send[sr].insert(
        send.channel,
        OpSnapshot {
            event: send.endpoint,
            routine: send.routine,
            clock: synced_strong.clone(),
            wclock: synced_weak.clone(),
            lockset: send_lockset,
        },
    );
    let recv_lockset = state.lockset[rr].snapshot();
    state.most_recent_recv[rr].insert(
        recv.channel,
        OpSnapshot {
            event: recv.endpoint,
            routine: recv.routine,
            clock: synced_strong,
            wclock: synced_weak,
            lockset: recv_lockset,
        },
    );
    state.has_send.insert(send.channel);
    state.has_received.insert(recv.channel);
    state.last_send[sr].insert(
        send.channel,
        ClockSnapshot {
            event: send.event,
            clock: trace.element(send.event).vc.clone(),
        },
    );

    concurrent_recv::observe(state, trace, recv, ctx);
    post_success(state, trace, send, ctx);
    post_success(state, trace, recv, ctx);
    register_select_if_case(state, trace, send, ctx);
    register_select_if_case(state, trace, recv, ctx);
    Ok(())
}

// ---- buffered ----

/// Run one buffered op. Returns false when the op was parked on a hold
/// list instead.
fn buffered(
    state: &mut EngineState,
    trace: &mut Trace,
    op: &ChanOp,
    ctx: &mut UpdateCtx<'_>,
) -> Result<bool, AnalysisError> {
    match op.dir {
        ChannelDir::Send => buffered_send(state, trace, op, ctx),
        ChannelDir::Recv => buffered_recv(state, trace, op, ctx),
    }
}

fn buffered_send(
    state: &mut EngineState,
    trace: &mut Trace,
    op: &ChanOp,
    ctx: &mut UpdateCtx<'_>,
) -> Result<bool, AnalysisError> {
    if state.buffer_mut(op.channel, op.q_size).is_full() {
        state
            .hold_send
            .entry(op.channel)
            .or_default()
            .push_back(op.endpoint);
        return Ok(false);
    }

    capture_endpoint(state, trace, op);
    let r = op.routine.index();

    let buffer = state.buffers.get(&op.channel).expect("buffer created above");
    let pos = buffer.count;
    let slot_strong = buffer.slots[pos].clock.clone();
    let slot_weak = buffer.slots[pos].wclock.clone();
    if !slot_strong.is_empty() {
        state.current[r].sync(&slot_strong)?;
        state.current_weak[r].sync(&slot_weak)?;
    }
    if ctx.config.assume_fifo {
        if let Some(prev) = state.most_recent_send[r].get(&op.channel) {
            let (strong, weak) = (prev.clock.clone(), prev.wclock.clone());
            state.current[r].sync(&strong)?;
            state.current_weak[r].sync(&weak)?;
        }
    }

    let synced_strong = state.current[r].clone();
    let synced_weak = state.current_weak[r].clone();
    let lockset = state.lockset[r].snapshot();
    state.most_recent_send[r].insert(
        op.channel,
        OpSnapshot {
            event: op.endpoint,
            routine: op.routine,
            clock: synced_strong.clone(),
            wclock: synced_weak.clone(),
            lockset,
        },
    );
    state.has_send.insert(op.channel);
    state.last_send[r].insert(
        op.channel,
        ClockSnapshot {
            event: op.event,
            clock: trace.element(op.event).vc.clone(),
        },
    );

    let buffer = state.buffers.get_mut(&op.channel).expect("buffer exists");
    buffer.slots[pos] = BufSlot {
        occupied: true,
        o_id: op.o_id,
        clock: synced_strong,
        wclock: synced_weak,
        sender: op.routine,
    };
    buffer.count += 1;

    inc_routine(state, op.routine)?;
    post_success(state, trace, op, ctx);
    register_select_if_case(state, trace, op, ctx);
    Ok(true)
}

fn buffered_recv(
    state: &mut EngineState,
    trace: &mut Trace,
    op: &ChanOp,
    ctx: &mut UpdateCtx<'_>,
) -> Result<bool, AnalysisError> {
    if state.buffer_mut(op.channel, op.q_size).is_drained() {
        state
            .hold_recv
            .entry(op.channel)
            .or_default()
            .push_back(op.endpoint);
        return Ok(false);
    }

    capture_endpoint(state, trace, op);
    let r = op.routine.index();

    // Out-of-order delivery: rotate the slot with the matching oID to the
    // front. FIFO is a sync edge, not a structural constraint.
    let buffer = state.buffers.get_mut(&op.channel).expect("buffer created above");
    if buffer.slots[0].o_id != op.o_id {
        match (1..buffer.count).find(|&j| buffer.slots[j].o_id == op.o_id) {
            Some(j) => {
                let matched = buffer.slots.remove(j);
                buffer.slots.insert(0, matched);
            }
            None => warn!(
                channel = op.channel.raw(),
                o_id = op.o_id.raw(),
                "no buffered value with matching oID; consuming the head slot"
            ),
        }
    }
    let head_strong = buffer.slots[0].clock.clone();
    let head_weak = buffer.slots[0].wclock.clone();
    if !head_strong.is_empty() {
        state.current[r].sync(&head_strong)?;
        state.current_weak[r].sync(&head_weak)?;
    }
    if ctx.config.assume_fifo {
        if let Some(prev) = state.most_recent_recv[r].get(&op.channel) {
            let (strong, weak) = (prev.clock.clone(), prev.wclock.clone());
            state.current[r].sync(&strong)?;
            state.current_weak[r].sync(&weak)?;
        }
    }

    // Advance the ring: shift left, the freed tail keeps its clock so the
    // next writer of that position synchronizes with this consumption.
    let buffer = state.buffers.get_mut(&op.channel).expect("buffer exists");
    for i in 1..buffer.count {
        buffer.slots[i - 1] = buffer.slots[i].clone();
    }
    let tail = buffer.count - 1;
    buffer.slots[tail].occupied = false;
    buffer.count -= 1;

    let synced_strong = state.current[r].clone();
    let synced_weak = state.current_weak[r].clone();
    let lockset = state.lockset[r].snapshot();
    state.most_recent_recv[r].insert(
        op.channel,
        OpSnapshot {
            event: op.endpoint,
            routine: op.routine,
            clock: synced_strong,
            wclock: synced_weak,
            lockset,
        },
    );
    state.has_received.insert(op.channel);

    inc_routine(state, op.routine)?;
    concurrent_recv::observe(state, trace, op, ctx);
    post_success(state, trace, op, ctx);
    register_select_if_case(state, trace, op, ctx);
    Ok(true)
}

/// Retry parked operations after a successful complementary op. Runs as
/// an explicit work loop; retried ops never re-park because the
/// precondition is checked before popping.
fn drain_holds(
    state: &mut EngineState,
    trace: &mut Trace,
    channel: PrimitiveId,
    ctx: &mut UpdateCtx<'_>,
) -> Result<(), AnalysisError> {
    loop {
        let mut progressed = false;

        while state
            .buffers
            .get(&channel)
            .is_some_and(|b| !b.is_drained())
        {
            let Some(endpoint) = state
                .hold_recv
                .get_mut(&channel)
                .and_then(|queue| queue.pop_front())
            else {
                break;
            };
            if let Some(op) = chan_op(trace, endpoint) {
                buffered(state, trace, &op, ctx)?;
                progressed = true;
            }
        }

        while state.buffers.get(&channel).is_some_and(|b| !b.is_full()) {
            let Some(endpoint) = state
                .hold_send
                .get_mut(&channel)
                .and_then(|queue| queue.pop_front())
            else {
                break;
            };
            if let Some(op) = chan_op(trace, endpoint) {
                buffered(state, trace, &op, ctx)?;
                progressed = true;
            }
        }

        if !progressed {
            return Ok(());
        }
    }
}

/// Park-list leftovers at end of trace: their buffers never drained, so
/// they become leak candidates.
pub fn flush_holds(
    state: &mut EngineState,
    trace: &mut Trace,
    ctx: &mut UpdateCtx<'_>,
) -> Result<(), AnalysisError> {
    let mut leftovers: Vec<PartnerRef> = Vec::new();
    for queue in state.hold_send.values_mut() {
        leftovers.extend(queue.drain(..));
    }
    for queue in state.hold_recv.values_mut() {
        leftovers.extend(queue.drain(..));
    }
    for endpoint in leftovers {
        let Some(op) = chan_op(trace, endpoint) else {
            continue;
        };
        capture_endpoint(state, trace, &op);
        inc_routine(state, op.routine)?;
        if ctx.config.leak {
            leak::register_unmatched(state, trace, &op);
        }
        register_select_if_case(state, trace, &op, ctx);
    }
    Ok(())
}

// ---- close ----

fn close(
    state: &mut EngineState,
    trace: &mut Trace,
    eid: EventId,
    ctx: &mut UpdateCtx<'_>,
) -> Result<(), AnalysisError> {
    super::capture(state, trace, eid);
    let element = trace.element(eid);
    let routine = element.routine;
    let channel = element
        .as_channel()
        .expect("close handler on channel element")
        .channel;

    if channel.is_nil() {
        // Close of nil panics at runtime; the exit-code predicate reports it.
        state.current[routine.index()].inc(routine)?;
        state.current_weak[routine.index()].inc(routine)?;
        return Ok(());
    }

    match state.close_record.get(&channel).copied() {
        Some(prior) => {
            if ctx.config.close_on_closed {
                closed_channel::close_on_closed(trace, eid, prior, ctx);
            }
        }
        None => {
            state.close_record.insert(channel, eid);
        }
    }

    state.current[routine.index()].inc(routine)?;
    state.current_weak[routine.index()].inc(routine)?;

    if ctx.config.send_on_closed {
        closed_channel::possible_send_on_closed(state, trace, eid, channel, ctx);
    }
    if ctx.config.receive_on_closed {
        closed_channel::possible_recv_on_closed(state, trace, eid, channel, ctx);
    }
    if ctx.config.select_without_partner {
        select_partner::observe_close(state, trace, eid, channel, ctx);
    }
    if ctx.config.leak || ctx.config.mixed_deadlock {
        leak::completed_close(state, trace, eid, channel, ctx);
    }
    Ok(())
}

// ---- shared helpers ----

/// Predicates that run after every successful send/recv.
fn post_success(state: &mut EngineState, trace: &Trace, op: &ChanOp, ctx: &mut UpdateCtx<'_>) {
    if ctx.config.leak || ctx.config.mixed_deadlock {
        leak::completed_channel_op(state, trace, op, ctx);
    }
    if ctx.config.select_without_partner {
        select_partner::observe_channel_op(state, trace, op, ctx);
    }
}

/// Record the cases of an endpoint's select for the partner analysis.
fn register_select_if_case(
    state: &mut EngineState,
    trace: &Trace,
    op: &ChanOp,
    ctx: &mut UpdateCtx<'_>,
) {
    if !ctx.config.select_without_partner {
        return;
    }
    if let PartnerRef::Case { select, .. } = op.endpoint {
        select_partner::record_select(state, trace, select, ctx);
    }
}

fn capture_endpoint(state: &EngineState, trace: &mut Trace, op: &ChanOp) {
    let vc = state.current[op.routine.index()].clone();
    let wvc = state.current_weak[op.routine.index()].clone();
    let element = trace.element_mut(op.event);
    element.vc = vc;
    element.wvc = wvc;
}

fn inc_routine(state: &mut EngineState, routine: RoutineId) -> Result<(), AnalysisError> {
    state.current[routine.index()].inc(routine)?;
    state.current_weak[routine.index()].inc(routine)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::channel::ChannelEvent;
    use crate::trace::trace::TraceBuilder;

    #[test]
    fn test_chan_op_from_channel_element() {
        let mut builder = TraceBuilder::new(1);
        let ch = PrimitiveId::new(3);
        let eid = builder
            .push(
                RoutineId::new(1),
                1,
                5,
                "a.go",
                2,
                ElementKind::Channel(ChannelEvent::send(ch, OpId::new(9), 2, 0)),
            )
            .unwrap();
        let trace = builder.finish().unwrap();
        let op = chan_op(&trace, PartnerRef::Element(eid)).unwrap();
        assert_eq!(op.channel, ch);
        assert_eq!(op.dir, ChannelDir::Send);
        assert_eq!(op.q_size, 2);
        assert!(!op.blocked);
    }
}
