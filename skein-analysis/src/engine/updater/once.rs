//! Once-guard handling: the winner publishes its clock, losers observe it.

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
    let ElementKind::Once(once) = &element.kind else {
        unreachable!("update_once on non-once element");
    };
    let (id, success) = (once.once, once.success);

    if success {
        state.once_witness.insert(
            id,
            ClockPair {
                strong: state.current[routine.index()].clone(),
                weak: state.current_weak[routine.index()].clone(),
            },
        );
    } else if let Some(witness) = state.once_witness.get(&id) {
        let (strong, weak) = (witness.strong.clone(), witness.weak.clone());
        state.current[routine.index()].sync(&strong)?;
        state.current_weak[routine.index()].sync(&weak)?;
    }

    inc_both(state, trace, eid)
}
