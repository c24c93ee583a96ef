//! Atomic operations.

use skein_core::types::PrimitiveId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AtomicOp {
    Load,
    Store,
    Add,
    Swap,
    CompareAndSwap,
    And,
    Or,
}

impl AtomicOp {
    /// Whether the op reads the previous value (draws an edge from the
    /// last write).
    pub fn is_read(self) -> bool {
        matches!(self, Self::Load | Self::Swap | Self::CompareAndSwap)
    }

    /// Whether the op publishes a new value.
    pub fn is_write(self) -> bool {
        !matches!(self, Self::Load)
    }
}

#[derive(Debug, Clone)]
pub struct AtomicEvent {
    pub atomic: PrimitiveId,
    pub op: AtomicOp,
}

impl AtomicEvent {
    pub fn new(atomic: PrimitiveId, op: AtomicOp) -> Self {
        Self { atomic, op }
    }
}
