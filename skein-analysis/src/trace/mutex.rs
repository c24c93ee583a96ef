//! Mutex operations (plain and reader/writer).

use skein_core::types::PrimitiveId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutexOp {
    Lock,
    RLock,
    TryLock,
    TryRLock,
    Unlock,
    RUnlock,
}

impl MutexOp {
    pub fn is_try(self) -> bool {
        matches!(self, Self::TryLock | Self::TryRLock)
    }
}

/// One lock/unlock on a mutex.
#[derive(Debug, Clone)]
pub struct MutexEvent {
    pub mutex: PrimitiveId,
    pub op: MutexOp,
    /// False only for failed try-acquires.
    pub success: bool,
}

impl MutexEvent {
    pub fn new(mutex: PrimitiveId, op: MutexOp) -> Self {
        Self {
            mutex,
            op,
            success: true,
        }
    }

    pub fn failed(mutex: PrimitiveId, op: MutexOp) -> Self {
        debug_assert!(op.is_try());
        Self {
            mutex,
            op,
            success: false,
        }
    }
}
