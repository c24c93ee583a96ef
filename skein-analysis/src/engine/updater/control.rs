//! Fork, routine end, constructor, and replay-end handling.

use skein_core::errors::AnalysisError;
use skein_core::types::EventId;

use crate::engine::state::EngineState;
use crate::trace::control::PrimitiveType;
use crate::trace::event::ElementKind;
use crate::trace::trace::Trace;

use super::capture;

/// Spawn of a child routine.
///
/// The child copies the parent's clock before the parent's own step
/// advances; the fork step and the child's first step are then distinct
/// increments, which keeps the parent's post-fork events concurrent with
/// the child's.
pub fn update_fork(
    state: &mut EngineState,
    trace: &mut Trace,
    eid: EventId,
) -> Result<(), AnalysisError> {
    capture(state, trace, eid);
    let element = trace.element(eid);
    let parent = element.routine;
    let ElementKind::Fork(fork) = &element.kind else {
        unreachable!("update_fork on non-fork element");
    };
    let child = fork.child;

    state.current[child.index()] = state.current[parent.index()].clone();
    state.current[parent.index()].inc(parent)?;
    state.current[child.index()].inc(child)?;

    state.current_weak[child.index()] = state.current_weak[parent.index()].clone();
    state.current_weak[parent.index()].inc(parent)?;
    state.current_weak[child.index()].inc(child)?;

    state.all_forks.insert(child, eid);
    Ok(())
}

/// Routine end: capture only, no increment.
pub fn update_routine_end(
    state: &mut EngineState,
    trace: &mut Trace,
    eid: EventId,
) -> Result<(), AnalysisError> {
    capture(state, trace, eid);
    Ok(())
}

/// Constructor record: remember channel capacities, advance the clock.
pub fn update_new(
    state: &mut EngineState,
    trace: &mut Trace,
    eid: EventId,
) -> Result<(), AnalysisError> {
    capture(state, trace, eid);
    let element = trace.element(eid);
    if let ElementKind::New(new) = &element.kind {
        if new.primitive == PrimitiveType::Channel && new.payload >= 0 {
            state.channel_capacity.insert(new.id, new.payload as u32);
        }
    }
    super::inc_both(state, trace, eid)
}

/// Replay-end marker: record the exit code for the final predicate.
pub fn update_replay_end(
    state: &mut EngineState,
    trace: &mut Trace,
    eid: EventId,
) -> Result<(), AnalysisError> {
    capture(state, trace, eid);
    let element = trace.element(eid);
    if let ElementKind::ReplayEnd(end) = &element.kind {
        state.exit_code = Some((end.exit_code, eid));
    }
    Ok(())
}
