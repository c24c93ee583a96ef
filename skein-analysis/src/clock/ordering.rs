//! The happens-before relation between two clocks.

use serde::{Deserialize, Serialize};

/// Outcome of comparing two vector clocks pointwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HappensBefore {
    /// Every component equal.
    Equal,
    /// The left clock precedes the right one.
    Before,
    /// The right clock precedes the left one.
    After,
    /// Neither precedes the other (or the clocks are incomparable in size).
    Concurrent,
}

impl HappensBefore {
    pub fn is_concurrent(self) -> bool {
        matches!(self, Self::Concurrent)
    }

    /// Concurrent or Before — the "could still happen at or after" test
    /// buffered-channel predicates use.
    pub fn is_concurrent_or_before(self) -> bool {
        matches!(self, Self::Concurrent | Self::Before)
    }

    /// The relation seen from the other clock's side.
    pub fn flip(self) -> Self {
        match self {
            Self::Before => Self::After,
            Self::After => Self::Before,
            other => other,
        }
    }
}
