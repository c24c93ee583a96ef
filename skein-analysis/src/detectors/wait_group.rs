//! Possible negative wait-group counters (done-before-add).
//!
//! Per wait-group id: source → every done, add → sink with its delta as
//! capacity, done → add where the add provably happens before the done.
//! If the max flow cannot cover every done, some done may run before
//! enough adds — a possible panic. Changes are recorded incrementally by
//! the updater; the flow check runs in the final pass.

use skein_core::results::{AnalysisResult, BugKind, ElementRef, Severity};
use skein_core::types::PrimitiveId;
use tracing::warn;

use crate::clock::HappensBefore;
use crate::engine::state::{EngineState, WgChange};
use crate::engine::updater::UpdateCtx;
use crate::trace::trace::Trace;

use super::flow::BipartiteFlow;

/// Run the check for every wait-group that saw a done.
pub fn check_all(state: &EngineState, trace: &Trace, ctx: &mut UpdateCtx<'_>) {
    let mut ids: Vec<PrimitiveId> = state.wg_dones.keys().copied().collect();
    ids.sort();
    for id in ids {
        let dones = &state.wg_dones[&id];
        let adds = state.wg_adds.get(&id).map(Vec::as_slice).unwrap_or(&[]);
        check_wait_group(trace, id, adds, dones, ctx);
    }
}

fn check_wait_group(
    trace: &Trace,
    id: PrimitiveId,
    adds: &[WgChange],
    dones: &[WgChange],
    ctx: &mut UpdateCtx<'_>,
) {
    if dones.is_empty() {
        return;
    }

    let capacities: Vec<u32> = adds
        .iter()
        .map(|add| u32::try_from(add.delta).unwrap_or(0))
        .collect();
    let mut network = BipartiteFlow::new(dones.len(), &capacities);
    for (d, done) in dones.iter().enumerate() {
        for (a, add) in adds.iter().enumerate() {
            if add.clock.happens_before(&done.clock) == HappensBefore::Before {
                network.connect(d, a);
            }
        }
    }

    let all_dones = || dones.iter().map(|c| trace.summarize(c.event)).collect();
    let all_adds: Vec<ElementRef> = adds.iter().map(|c| trace.summarize(c.event)).collect();

    match network.run() {
        Err(_) => {
            warn!(wait_group = id.raw(), "max-flow iteration bound hit; inconclusive");
            ctx.sink.emit(
                AnalysisResult::new(BugKind::PossibleNegativeWaitGroup, all_dones(), all_adds)
                    .with_severity(Severity::Information),
            );
        }
        Ok(outcome) => {
            if outcome.max_flow < dones.len() as u64 {
                let mut primary: Vec<ElementRef> = outcome
                    .uncovered_demands
                    .iter()
                    .map(|&d| trace.summarize(dones[d].event))
                    .collect();
                if primary.is_empty() {
                    primary = all_dones();
                }
                ctx.sink.emit(AnalysisResult::new(
                    BugKind::PossibleNegativeWaitGroup,
                    primary,
                    all_adds,
                ));
            }
        }
    }
}
