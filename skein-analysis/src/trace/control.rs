//! Control events: fork, constructor records, replay end.

use skein_core::types::{PrimitiveId, RoutineId};

/// Spawn of a new routine.
#[derive(Debug, Clone)]
pub struct ForkEvent {
    pub child: RoutineId,
}

/// The primitive class a constructor record creates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    Atomic,
    Channel,
    Cond,
    Mutex,
    Once,
    WaitGroup,
}

/// Constructor record: a primitive came into existence.
#[derive(Debug, Clone)]
pub struct NewEvent {
    pub id: PrimitiveId,
    pub primitive: PrimitiveType,
    /// Kind-specific side data (buffer capacity for channels).
    pub payload: i64,
}

impl NewEvent {
    pub fn new(id: PrimitiveId, primitive: PrimitiveType, payload: i64) -> Self {
        Self {
            id,
            primitive,
            payload,
        }
    }
}

/// End-of-replay marker carrying the recorded exit code.
#[derive(Debug, Clone)]
pub struct ReplayEndEvent {
    pub exit_code: i32,
}
