//! Select handling.
//!
//! A completed select with a chosen case executes that case's channel
//! rule with the select's routine; the resulting clock lives on the
//! select element. A default-only completion just advances the clock. A
//! blocked select registers every case as a leak candidate.

use skein_core::errors::AnalysisError;
use skein_core::types::EventId;

use crate::detectors::{leak, select_partner};
use crate::engine::state::EngineState;
use crate::trace::event::{ElementKind, PartnerRef};
use crate::trace::iterator::SortedIter;
use crate::trace::trace::Trace;

use super::channel::{chan_op, process_comm};
use super::{capture, inc_both, UpdateCtx};

pub fn update(
    state: &mut EngineState,
    trace: &mut Trace,
    iter: &mut SortedIter,
    eid: EventId,
    ctx: &mut UpdateCtx<'_>,
) -> Result<(), AnalysisError> {
    let element = trace.element(eid);
    let ElementKind::Select(select) = &element.kind else {
        unreachable!("update_select on non-select element");
    };

    if element.is_blocked() {
        capture(state, trace, eid);
        inc_both(state, trace, eid)?;
        if ctx.config.leak || ctx.config.mixed_deadlock {
            leak::blocked_select(state, trace, eid, ctx);
        }
        if ctx.config.select_without_partner {
            select_partner::record_select(state, trace, eid, ctx);
        }
        return Ok(());
    }

    match select.chosen {
        None => {
            // Default case (or no case recorded): no communication.
            capture(state, trace, eid);
            inc_both(state, trace, eid)?;
        }
        Some(index) => {
            let op = chan_op(trace, PartnerRef::Case { select: eid, index })
                .expect("chosen case always yields a ChanOp");
            process_comm(state, trace, iter, op, ctx)?;
        }
    }

    if ctx.config.select_without_partner {
        select_partner::record_select(state, trace, eid, ctx);
    }
    Ok(())
}
