//! Concurrent receives on the same channel.
//!
//! Two receives whose clocks are concurrent race for the value; the one
//! the recorded schedule favored may starve the other in a different
//! schedule. Blocked receives additionally become fuzzing flow
//! candidates.

use skein_core::results::{AnalysisResult, BugKind, FlowCandidate, FlowKind};

use crate::engine::state::{ClockSnapshot, EngineState};
use crate::engine::updater::channel::ChanOp;
use crate::engine::updater::UpdateCtx;
use crate::trace::trace::Trace;

/// Run the concurrent-receive check for one receive (completed or
/// blocked) and update the per-routine last-receive index.
pub(crate) fn observe(state: &mut EngineState, trace: &Trace, op: &ChanOp, ctx: &mut UpdateCtx<'_>) {
    let recv_clock = trace.element(op.event).vc.clone();

    if ctx.config.concurrent_recv {
        for (index, recvs) in state.last_recv.iter().enumerate() {
            if index == op.routine.index() {
                continue;
            }
            let Some(last) = recvs.get(&op.channel) else {
                continue;
            };
            if !last.clock.happens_before(&recv_clock).is_concurrent() {
                continue;
            }
            if op.blocked && ctx.config.fuzzing {
                ctx.flows.push(FlowCandidate {
                    kind: FlowKind::ConcurrentRecv,
                    blocked: trace.summarize_partner(op.endpoint),
                    counterpart: trace.summarize(last.event),
                });
            }
            ctx.sink.emit(AnalysisResult::new(
                BugKind::ConcurrentRecv,
                vec![trace.summarize_partner(op.endpoint)],
                vec![trace.summarize(last.event)],
            ));
        }
    }

    state.last_recv[op.routine.index()].insert(
        op.channel,
        ClockSnapshot {
            event: op.event,
            clock: recv_clock,
        },
    );
}
