//! Numeric ID types for trace entities.
//!
//! Each ID wraps a primitive integer to prevent cross-type confusion: a
//! `RoutineId` cannot be accidentally used where a `PrimitiveId` is
//! expected. Routine ids are 1-based and dense over the trace; primitive
//! ids come straight from the recorder, with 0 denoting a nil primitive.

use serde::{Deserialize, Serialize};

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident($inner:ty)) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        pub struct $name(pub $inner);

        impl $name {
            /// Create a new ID from its raw value.
            pub fn new(raw: $inner) -> Self {
                Self(raw)
            }

            /// Get the raw value.
            pub fn raw(self) -> $inner {
                self.0
            }
        }

        impl From<$inner> for $name {
            fn from(raw: $inner) -> Self {
                Self(raw)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

define_id!(
    /// 1-based routine identifier, dense over `[1, routine_count]`.
    RoutineId(u32)
);

define_id!(
    /// Recorder-assigned primitive identifier (channel, mutex, …). 0 = nil.
    PrimitiveId(i64)
);

define_id!(
    /// Index of an event in the trace arena.
    EventId(u32)
);

define_id!(
    /// Recorder-assigned operation id pairing a channel send with its receive.
    OpId(u64)
);

impl RoutineId {
    /// Zero-based index into per-routine vectors (clocks, cursors).
    pub fn index(self) -> usize {
        debug_assert!(self.0 >= 1, "routine ids are 1-based");
        (self.0 - 1) as usize
    }

    /// The routine at the given zero-based index.
    pub fn from_index(index: usize) -> Self {
        Self(index as u32 + 1)
    }
}

impl PrimitiveId {
    /// Whether this id denotes a nil primitive (never constructed).
    pub fn is_nil(self) -> bool {
        self.0 == 0
    }
}

impl EventId {
    /// Arena slot index.
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// The id of the event stored at the given arena slot.
    pub fn from_index(index: usize) -> Self {
        Self(index as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_routine_index_round_trip() {
        let r = RoutineId::new(3);
        assert_eq!(r.index(), 2);
        assert_eq!(RoutineId::from_index(r.index()), r);
    }

    #[test]
    fn test_nil_primitive() {
        assert!(PrimitiveId::new(0).is_nil());
        assert!(!PrimitiveId::new(7).is_nil());
    }
}
