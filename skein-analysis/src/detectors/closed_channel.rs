//! Send/recv/close on closed channels.
//!
//! Actual occurrences carry the recorder's closed flag and pair with the
//! recorded close; possible occurrences are derived on each close by
//! comparing the close clock against the most recent communication
//! snapshots of every routine.

use skein_core::results::{AnalysisResult, BugKind};
use skein_core::types::{EventId, PrimitiveId};

use crate::clock::HappensBefore;
use crate::engine::state::EngineState;
use crate::engine::updater::channel::ChanOp;
use crate::engine::updater::UpdateCtx;
use crate::trace::trace::Trace;

/// A send that observed the channel closed: a concrete panic.
pub(crate) fn actual_send_on_closed(
    trace: &Trace,
    op: &ChanOp,
    close: Option<EventId>,
    ctx: &mut UpdateCtx<'_>,
) {
    let secondary = close.map(|c| vec![trace.summarize(c)]).unwrap_or_default();
    ctx.sink.emit(AnalysisResult::new(
        BugKind::SendOnClosed,
        vec![trace.summarize_partner(op.endpoint)],
        secondary,
    ));
}

/// A receive that completed because the channel was closed.
pub(crate) fn actual_recv_on_closed(
    trace: &Trace,
    op: &ChanOp,
    close: Option<EventId>,
    ctx: &mut UpdateCtx<'_>,
) {
    let secondary = close.map(|c| vec![trace.summarize(c)]).unwrap_or_default();
    ctx.sink.emit(AnalysisResult::new(
        BugKind::RecvOnClosed,
        vec![trace.summarize_partner(op.endpoint)],
        secondary,
    ));
}

/// A second close on the same channel id.
pub fn close_on_closed(trace: &Trace, close: EventId, prior: EventId, ctx: &mut UpdateCtx<'_>) {
    ctx.sink.emit(AnalysisResult::new(
        BugKind::CloseOnClosed,
        vec![trace.summarize(close)],
        vec![trace.summarize(prior)],
    ));
}

/// On close: any most-recent send not provably before the close could
/// have hit the closed channel instead.
pub fn possible_send_on_closed(
    state: &EngineState,
    trace: &Trace,
    close: EventId,
    channel: PrimitiveId,
    ctx: &mut UpdateCtx<'_>,
) {
    let close_clock = &trace.element(close).vc;
    for sends in &state.most_recent_send {
        if let Some(snap) = sends.get(&channel) {
            if snap.clock.happens_before(close_clock) != HappensBefore::Before {
                ctx.sink.emit(AnalysisResult::new(
                    BugKind::PossibleSendOnClosed,
                    vec![trace.summarize_partner(snap.event)],
                    vec![trace.summarize(close)],
                ));
            }
        }
    }
}

/// On close: any most-recent receive the close could reach is a
/// possible receive-from-closed.
pub fn possible_recv_on_closed(
    state: &EngineState,
    trace: &Trace,
    close: EventId,
    channel: PrimitiveId,
    ctx: &mut UpdateCtx<'_>,
) {
    let close_clock = &trace.element(close).vc;
    for recvs in &state.most_recent_recv {
        if let Some(snap) = recvs.get(&channel) {
            if close_clock.happens_before(&snap.clock).is_concurrent_or_before() {
                ctx.sink.emit(AnalysisResult::new(
                    BugKind::PossibleRecvOnClosed,
                    vec![trace.summarize_partner(snap.event)],
                    vec![trace.summarize(close)],
                ));
            }
        }
    }
}
