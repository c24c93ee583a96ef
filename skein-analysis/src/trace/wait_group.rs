//! Wait-group operations.

use skein_core::types::PrimitiveId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WaitGroupOp {
    /// Add or Done, distinguished by the sign of `delta`.
    Change,
    Wait,
}

/// One change/wait on a wait-group.
#[derive(Debug, Clone)]
pub struct WaitGroupEvent {
    pub wg: PrimitiveId,
    pub op: WaitGroupOp,
    /// Signed counter change; negative for Done.
    pub delta: i64,
    /// Counter value after the change, as recorded.
    pub value: i64,
}

impl WaitGroupEvent {
    pub fn change(wg: PrimitiveId, delta: i64, value: i64) -> Self {
        Self {
            wg,
            op: WaitGroupOp::Change,
            delta,
            value,
        }
    }

    pub fn wait(wg: PrimitiveId) -> Self {
        Self {
            wg,
            op: WaitGroupOp::Wait,
            delta: 0,
            value: 0,
        }
    }
}
