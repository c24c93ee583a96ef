//! Condition variable handling.
//!
//! Wait enrolls the routine; signal pops the head of the waiter list and
//! hands it the signaller's clock; broadcast does so for every waiter.
//! The head-pop pairing is an underapproximation (the runtime's cond does
//! not guarantee FIFO wakeup) kept as recorded.

use skein_core::errors::AnalysisError;
use skein_core::types::EventId;

use crate::detectors::leak;
use crate::engine::state::EngineState;
use crate::trace::cond::CondOp;
use crate::trace::event::ElementKind;
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
    let ElementKind::Cond(cond) = &element.kind else {
        unreachable!("update_cond on non-cond element");
    };
    let (id, op) = (cond.cond, cond.op);

    match op {
        CondOp::Wait => {
            if element.is_blocked() {
                if ctx.config.leak {
                    leak::report_cond_leak(trace, eid, ctx);
                }
            } else {
                state.cond_waiters.entry(id).or_default().push_back(routine);
            }
        }
        CondOp::Signal => {
            let woken = state
                .cond_waiters
                .get_mut(&id)
                .and_then(|waiters| waiters.pop_front());
            if let Some(waiter) = woken {
                let strong = state.current[routine.index()].clone();
                let weak = state.current_weak[routine.index()].clone();
                state.current[waiter.index()].sync(&strong)?;
                state.current_weak[waiter.index()].sync(&weak)?;
            }
        }
        CondOp::Broadcast => {
            let waiters: Vec<_> = state
                .cond_waiters
                .get_mut(&id)
                .map(|waiters| waiters.drain(..).collect())
                .unwrap_or_default();
            let strong = state.current[routine.index()].clone();
            let weak = state.current_weak[routine.index()].clone();
            for waiter in waiters {
                state.current[waiter.index()].sync(&strong)?;
                state.current_weak[waiter.index()].sync(&weak)?;
            }
        }
    }

    inc_both(state, trace, eid)
}
