//! Condition variable operations.

use skein_core::types::PrimitiveId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CondOp {
    Wait,
    Signal,
    Broadcast,
}

#[derive(Debug, Clone)]
pub struct CondEvent {
    pub cond: PrimitiveId,
    pub op: CondOp,
}

impl CondEvent {
    pub fn new(cond: PrimitiveId, op: CondOp) -> Self {
        Self { cond, op }
    }
}
