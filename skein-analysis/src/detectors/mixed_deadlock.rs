//! Mixed channel/mutex deadlocks.
//!
//! A blocked channel operation whose candidate partner held an
//! intersecting lockset (with at least one blocking pair) points at a
//! deadlock where the communication is prevented by mutual exclusion.
//! The leak result is escalated to Critical and the acquires of the
//! shared locks are appended as witnesses.

use skein_core::results::{AnalysisResult, Severity};
use skein_core::types::collections::SmallVec2;
use skein_core::types::PrimitiveId;

use crate::engine::state::{EngineState, LockMode};
use crate::trace::trace::Trace;

/// Lock ids held on both sides with modes that can block each other.
pub fn blocking_intersection(
    a: &[(PrimitiveId, LockMode)],
    b: &[(PrimitiveId, LockMode)],
) -> SmallVec2<PrimitiveId> {
    let mut shared = SmallVec2::new();
    for &(id, mode_a) in a {
        for &(other, mode_b) in b {
            if id == other && mode_a.blocks(mode_b) {
                shared.push(id);
                break;
            }
        }
    }
    shared
}

/// Escalate a leak result into a mixed deadlock when the locksets of the
/// blocked op and its partner intersect blockingly.
pub fn escalate(
    state: &EngineState,
    trace: &Trace,
    result: AnalysisResult,
    blocked_lockset: &[(PrimitiveId, LockMode)],
    partner_lockset: &[(PrimitiveId, LockMode)],
) -> AnalysisResult {
    let shared = blocking_intersection(blocked_lockset, partner_lockset);
    if shared.is_empty() {
        return result;
    }
    let mut result = result.with_severity(Severity::Critical);
    for lock in shared {
        if let Some(acquire) = state.most_recent_acquire.get(&lock) {
            result.secondary.push(trace.summarize(acquire.event));
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_read_is_not_blocking() {
        let a = [(PrimitiveId::new(1), LockMode::Read)];
        let b = [(PrimitiveId::new(1), LockMode::Read)];
        assert!(blocking_intersection(&a, &b).is_empty());
    }

    #[test]
    fn test_write_read_blocks() {
        let a = [(PrimitiveId::new(1), LockMode::Write)];
        let b = [(PrimitiveId::new(1), LockMode::Read)];
        assert_eq!(blocking_intersection(&a, &b).len(), 1);
    }

    #[test]
    fn test_disjoint_ids_do_not_block() {
        let a = [(PrimitiveId::new(1), LockMode::Write)];
        let b = [(PrimitiveId::new(2), LockMode::Write)];
        assert!(blocking_intersection(&a, &b).is_empty());
    }
}
