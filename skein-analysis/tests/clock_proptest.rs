//! Property-based tests for the vector clock algebra.
//!
//! Uses proptest to fuzz-verify:
//!   - sync is idempotent, commutative, and monotone
//!   - happens_before is antisymmetric and consistent with sync
//!   - copies are independent of the original

use proptest::prelude::*;

use skein_analysis::clock::{HappensBefore, VectorClock};
use skein_core::types::RoutineId;

/// A clock of the given size with arbitrary small components.
fn clock(size: usize) -> impl Strategy<Value = VectorClock> {
    prop::collection::vec(0u32..50, size).prop_map(|components| {
        let mut vc = VectorClock::new(components.len());
        for (i, &n) in components.iter().enumerate() {
            for _ in 0..n {
                vc.inc(RoutineId::from_index(i)).unwrap();
            }
        }
        vc
    })
}

proptest! {
    /// sync(a, a) leaves a unchanged.
    #[test]
    fn prop_sync_idempotent(a in clock(4)) {
        let mut left = a.clone();
        let other = a.clone();
        left.sync(&other).unwrap();
        prop_assert_eq!(left, a);
    }

    /// sync(a, b) == sync(b, a).
    #[test]
    fn prop_sync_commutative(a in clock(4), b in clock(4)) {
        let mut left = a.clone();
        left.sync(&b).unwrap();
        let mut right = b.clone();
        right.sync(&a).unwrap();
        prop_assert_eq!(left, right);
    }

    /// After sync(a, b), both inputs happen at-or-before the result.
    #[test]
    fn prop_sync_is_upper_bound(a in clock(4), b in clock(4)) {
        let mut merged = a.clone();
        merged.sync(&b).unwrap();
        for source in [&a, &b] {
            let relation = source.happens_before(&merged);
            prop_assert!(
                matches!(relation, HappensBefore::Before | HappensBefore::Equal),
                "input {} must not exceed merged {}",
                source,
                merged
            );
        }
    }

    /// happens_before is antisymmetric: flipping the operands flips the
    /// relation.
    #[test]
    fn prop_happens_before_antisymmetric(a in clock(4), b in clock(4)) {
        let forward = a.happens_before(&b);
        let backward = b.happens_before(&a);
        prop_assert_eq!(forward, backward.flip());
    }

    /// A clone is unaffected by increments on the original.
    #[test]
    fn prop_copy_is_independent(a in clock(4), index in 0usize..4) {
        let snapshot = a.clone();
        let mut original = a;
        original.inc(RoutineId::from_index(index)).unwrap();
        prop_assert_eq!(snapshot.value(RoutineId::from_index(index)) + 1,
            original.value(RoutineId::from_index(index)));
    }

    /// Incrementing exactly one component makes the original Before.
    #[test]
    fn prop_inc_orders_after(a in clock(4), index in 0usize..4) {
        let before = a.clone();
        let mut after = a;
        after.inc(RoutineId::from_index(index)).unwrap();
        prop_assert_eq!(before.happens_before(&after), HappensBefore::Before);
        prop_assert_eq!(after.happens_before(&before), HappensBefore::After);
    }
}
