//! Once-guard operations.

use skein_core::types::PrimitiveId;

/// One `Do` call on a once-guard. `success` marks the winning call.
#[derive(Debug, Clone)]
pub struct OnceEvent {
    pub once: PrimitiveId,
    pub success: bool,
}

impl OnceEvent {
    pub fn new(once: PrimitiveId, success: bool) -> Self {
        Self { once, success }
    }
}
