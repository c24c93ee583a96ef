//! Per-event clock updates.
//!
//! Each handler captures the owning routine's clocks into the element
//! before mutating them, applies the kind-specific transition to both the
//! happens-before and the weak clock, and triggers the predicates the
//! configuration enables.

pub mod atomic;
pub mod channel;
pub mod cond;
pub mod control;
pub mod mutex;
pub mod once;
pub mod select;
pub mod wait_group;

use skein_core::config::AnalysisConfig;
use skein_core::errors::AnalysisError;
use skein_core::results::{FlowCandidate, ResultSink};
use skein_core::types::EventId;

use crate::trace::event::ElementKind;
use crate::trace::iterator::SortedIter;
use crate::trace::trace::Trace;

use super::state::EngineState;

/// Everything a handler needs besides the state and the trace.
pub struct UpdateCtx<'a> {
    pub config: &'a AnalysisConfig,
    pub sink: &'a mut dyn ResultSink,
    pub flows: &'a mut Vec<FlowCandidate>,
}

/// Dispatch tag, detached from the element so the handlers can borrow
/// the trace mutably.
enum Dispatch {
    Channel,
    Select,
    Mutex,
    WaitGroup,
    Cond,
    Once,
    Atomic,
    Fork,
    RoutineEnd,
    New,
    ReplayEnd,
}

/// Apply one element in global order.
pub fn apply(
    state: &mut EngineState,
    trace: &mut Trace,
    iter: &mut SortedIter,
    eid: EventId,
    ctx: &mut UpdateCtx<'_>,
) -> Result<(), AnalysisError> {
    let dispatch = match &trace.element(eid).kind {
        ElementKind::Channel(_) => Dispatch::Channel,
        ElementKind::Select(_) => Dispatch::Select,
        ElementKind::Mutex(_) => Dispatch::Mutex,
        ElementKind::WaitGroup(_) => Dispatch::WaitGroup,
        ElementKind::Cond(_) => Dispatch::Cond,
        ElementKind::Once(_) => Dispatch::Once,
        ElementKind::Atomic(_) => Dispatch::Atomic,
        ElementKind::Fork(_) => Dispatch::Fork,
        ElementKind::RoutineEnd => Dispatch::RoutineEnd,
        ElementKind::New(_) => Dispatch::New,
        ElementKind::ReplayEnd(_) => Dispatch::ReplayEnd,
    };
    match dispatch {
        Dispatch::Channel => channel::update(state, trace, iter, eid, ctx),
        Dispatch::Select => select::update(state, trace, iter, eid, ctx),
        Dispatch::Mutex => mutex::update(state, trace, eid, ctx),
        Dispatch::WaitGroup => wait_group::update(state, trace, eid, ctx),
        Dispatch::Cond => cond::update(state, trace, eid, ctx),
        Dispatch::Once => once::update(state, trace, eid),
        Dispatch::Atomic => atomic::update(state, trace, eid),
        Dispatch::Fork => control::update_fork(state, trace, eid),
        Dispatch::RoutineEnd => control::update_routine_end(state, trace, eid),
        Dispatch::New => control::update_new(state, trace, eid),
        Dispatch::ReplayEnd => control::update_replay_end(state, trace, eid),
    }
}

/// Write the routine's current clocks into the element.
pub(crate) fn capture(state: &EngineState, trace: &mut Trace, eid: EventId) {
    let routine = trace.element(eid).routine;
    let vc = state.current[routine.index()].clone();
    let wvc = state.current_weak[routine.index()].clone();
    let element = trace.element_mut(eid);
    element.vc = vc;
    element.wvc = wvc;
}

/// Increment both clocks of the element's routine.
pub(crate) fn inc_both(
    state: &mut EngineState,
    trace: &Trace,
    eid: EventId,
) -> Result<(), AnalysisError> {
    let routine = trace.element(eid).routine;
    state.current[routine.index()].inc(routine)?;
    state.current_weak[routine.index()].inc(routine)?;
    Ok(())
}
