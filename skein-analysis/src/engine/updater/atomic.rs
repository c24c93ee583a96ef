//! Atomic operation handling.
//!
//! Reads (load, and the read half of swap/CAS) synchronize with the last
//! write's clock; writes publish the current clock. Atomics are not
//! critical sections, so the weak clock follows the same rules.

use skein_core::errors::AnalysisError;
use skein_core::types::EventId;

use crate::engine::state::{ClockPair, EngineState};
use crate::trace::event::ElementKind;
use crate::trace::trace::Trace;

use super::{capture, inc_both};

pub fn update(
    state: &mut EngineState,
    trace: &mut Trace,
    eid: EventId,
) -> Result<(), AnalysisError> {
    capture(state, trace, eid);
    let element = trace.element(eid);
    let routine = element.routine;
    let ElementKind::Atomic(atomic) = &element.kind else {
        unreachable!("update_atomic on non-atomic element");
    };
    let (id, op) = (atomic.atomic, atomic.op);

    if op.is_read() {
        if let Some(last) = state.last_atomic_write.get(&id) {
            let (strong, weak) = (last.strong.clone(), last.weak.clone());
            state.current[routine.index()].sync(&strong)?;
            state.current_weak[routine.index()].sync(&weak)?;
        }
    }
    if op.is_write() {
        state.last_atomic_write.insert(
            id,
            ClockPair {
                strong: state.current[routine.index()].clone(),
                weak: state.current_weak[routine.index()].clone(),
            },
        );
    }

    inc_both(state, trace, eid)
}
