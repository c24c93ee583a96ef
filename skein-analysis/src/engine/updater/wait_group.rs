//! Wait-group handling.
//!
//! Changes fold the routine's clock into the per-group change clock and
//! are recorded for the max-flow analyses; waits observe the change
//! clock once they complete.

use skein_core::errors::AnalysisError;
use skein_core::types::EventId;

use crate::detectors::leak;
use crate::engine::state::{ClockPair, EngineState, WgChange};
use crate::trace::event::ElementKind;
use crate::trace::trace::Trace;
use crate::trace::wait_group::WaitGroupOp;

use super::{capture, inc_both, UpdateCtx};

pub fn update(
    state: &mut EngineState,
    trace: &mut Trace,
    eid: EventId,
    ctx: &mut UpdateCtx<'_>,
) -> Result<(), AnalysisError> {
    capture(state, trace, eid);
    let routines = state.routine_count();
    let element = trace.element(eid);
    let routine = element.routine;
    let ElementKind::WaitGroup(wg) = &element.kind else {
        unreachable!("update_wait_group on non-wait-group element");
    };
    let (id, op, delta) = (wg.wg, wg.op, wg.delta);

    match op {
        WaitGroupOp::Change => {
            let strong = state.current[routine.index()].clone();
            let weak = state.current_weak[routine.index()].clone();
            let change = state.last_wg_change.entry(id).or_insert_with(|| ClockPair {
                strong: crate::clock::VectorClock::new(routines),
                weak: crate::clock::VectorClock::new(routines),
            });
            change.strong.sync(&strong)?;
            change.weak.sync(&weak)?;

            let record = WgChange {
                event: eid,
                routine,
                clock: trace.element(eid).vc.clone(),
                delta,
            };
            if delta > 0 {
                state.wg_adds.entry(id).or_default().push(record);
            } else if delta < 0 {
                state.wg_dones.entry(id).or_default().push(record);
            }
        }
        WaitGroupOp::Wait => {
            if element.is_blocked() {
                if ctx.config.leak {
                    leak::report_wait_group_leak(trace, eid, ctx);
                }
            } else if let Some(change) = state.last_wg_change.get(&id) {
                let (strong, weak) = (change.strong.clone(), change.weak.clone());
                state.current[routine.index()].sync(&strong)?;
                state.current_weak[routine.index()].sync(&weak)?;
            }
        }
    }

    inc_both(state, trace, eid)
}
