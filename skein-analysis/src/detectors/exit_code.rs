//! Recorded-exit-code predicate.
//!
//! When the run ended in a concrete runtime panic, the recorder's exit
//! code names it; the corresponding critical result is emitted directly
//! against the recorded position.

use skein_core::constants::exit_codes;
use skein_core::results::{AnalysisResult, BugKind};

use crate::engine::state::EngineState;
use crate::engine::updater::UpdateCtx;
use crate::trace::trace::Trace;

pub fn check(state: &EngineState, trace: &Trace, ctx: &mut UpdateCtx<'_>) {
    let Some((code, eid)) = state.exit_code else {
        return;
    };
    let kind = match code {
        exit_codes::SEND_ON_CLOSED => BugKind::SendOnClosed,
        exit_codes::CLOSE_ON_CLOSED => BugKind::CloseOnClosed,
        exit_codes::CLOSE_ON_NIL => BugKind::CloseOnNil,
        exit_codes::NEGATIVE_WAIT_GROUP => BugKind::NegativeWaitGroup,
        exit_codes::UNLOCK_OF_NOT_LOCKED => BugKind::UnlockOfNotLocked,
        exit_codes::PANIC_UNKNOWN => BugKind::UnknownPanic,
        exit_codes::TIMEOUT => BugKind::Timeout,
        _ => return,
    };
    ctx.sink
        .emit(AnalysisResult::new(kind, vec![trace.summarize(eid)], vec![]));
}
