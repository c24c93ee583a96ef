//! Fuzzing flow candidates.
//!
//! When the `fuzzing` knob is on, the engine records schedule positions a
//! fuzzer could perturb to surface a bug the recorded run only grazed.

use serde::{Deserialize, Serialize};

use super::refs::ElementRef;

/// What kind of perturbation the candidate suggests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowKind {
    /// A blocked receive concurrent with a completed one — swapping them
    /// changes which routine obtains the value.
    ConcurrentRecv,
    /// A failed try-lock concurrent with the holding acquire — reordering
    /// could make it succeed.
    FailedTryLock,
}

/// A single flow candidate: the operation to perturb and its counterpart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowCandidate {
    pub kind: FlowKind,
    pub blocked: ElementRef,
    pub counterpart: ElementRef,
}
