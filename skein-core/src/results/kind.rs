//! The closed set of bug kinds and their stable codes.

use serde::{Deserialize, Serialize};

use super::severity::Severity;

/// Every bug the engine can report. The code strings are stable and the
/// set is closed — downstream tooling matches on them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BugKind {
    // ---- Actual bugs (observed by the recorder) ----
    /// A01: send on a closed channel.
    SendOnClosed,
    /// A02: receive on a closed channel.
    RecvOnClosed,
    /// A03: close of a closed channel.
    CloseOnClosed,
    /// A04: close of a nil channel.
    CloseOnNil,
    /// A05: wait-group counter went negative.
    NegativeWaitGroup,
    /// A06: unlock of a not-locked mutex.
    UnlockOfNotLocked,
    /// A07: two receives on the same channel are concurrent.
    ConcurrentRecv,
    /// A08: select case with no feasible partner anywhere in the trace.
    SelectWithoutPartner,

    // ---- Possible bugs (hb-derived) ----
    /// P01: send and close are not ordered — the send could hit a closed channel.
    PossibleSendOnClosed,
    /// P02: receive and close are not ordered the safe way round.
    PossibleRecvOnClosed,
    /// P03: a done is not covered by any add that provably precedes it.
    PossibleNegativeWaitGroup,
    /// P04: an unlock is not covered by any lock that provably precedes it.
    PossibleUnlockBeforeLock,
    /// P05: cyclic lock acquisition across routines.
    PossibleCyclicDeadlock,

    // ---- Leaks (operations still blocked at trace end) ----
    /// L00: routine never finished without a blocked operation to blame.
    LeakWithoutBlock,
    /// L01: blocked op on an unbuffered channel, concurrent partner exists.
    LeakUnbufferedWithPartner,
    /// L02: blocked op on an unbuffered channel, no partner anywhere.
    LeakUnbufferedWithoutPartner,
    /// L03: blocked op on a buffered channel, feasible partner exists.
    LeakBufferedWithPartner,
    /// L04: blocked op on a buffered channel, no partner anywhere.
    LeakBufferedWithoutPartner,
    /// L05: blocked op on a nil channel.
    LeakNilChannel,
    /// L06: blocked select, at least one case has a feasible partner.
    LeakSelectWithPartner,
    /// L07: blocked select, no case has a partner.
    LeakSelectWithoutPartner,
    /// L08: blocked mutex acquire.
    LeakMutex,
    /// L09: blocked wait-group wait.
    LeakWaitGroup,
    /// L10: blocked cond wait.
    LeakCond,

    // ---- Recorder-level outcomes ----
    /// R01: the run ended in a panic the recorder could not classify.
    UnknownPanic,
    /// R02: the run was cut off by the external timeout.
    Timeout,
}

impl BugKind {
    /// The stable code string.
    pub fn code(&self) -> &'static str {
        match self {
            Self::SendOnClosed => "A01",
            Self::RecvOnClosed => "A02",
            Self::CloseOnClosed => "A03",
            Self::CloseOnNil => "A04",
            Self::NegativeWaitGroup => "A05",
            Self::UnlockOfNotLocked => "A06",
            Self::ConcurrentRecv => "A07",
            Self::SelectWithoutPartner => "A08",
            Self::PossibleSendOnClosed => "P01",
            Self::PossibleRecvOnClosed => "P02",
            Self::PossibleNegativeWaitGroup => "P03",
            Self::PossibleUnlockBeforeLock => "P04",
            Self::PossibleCyclicDeadlock => "P05",
            Self::LeakWithoutBlock => "L00",
            Self::LeakUnbufferedWithPartner => "L01",
            Self::LeakUnbufferedWithoutPartner => "L02",
            Self::LeakBufferedWithPartner => "L03",
            Self::LeakBufferedWithoutPartner => "L04",
            Self::LeakNilChannel => "L05",
            Self::LeakSelectWithPartner => "L06",
            Self::LeakSelectWithoutPartner => "L07",
            Self::LeakMutex => "L08",
            Self::LeakWaitGroup => "L09",
            Self::LeakCond => "L10",
            Self::UnknownPanic => "R01",
            Self::Timeout => "R02",
        }
    }

    /// The severity this kind is reported at unless the emitter escalates
    /// (e.g. a leak that is part of a mixed deadlock).
    pub fn default_severity(&self) -> Severity {
        match self {
            Self::SendOnClosed
            | Self::RecvOnClosed
            | Self::CloseOnClosed
            | Self::CloseOnNil
            | Self::NegativeWaitGroup
            | Self::UnlockOfNotLocked
            | Self::PossibleSendOnClosed
            | Self::PossibleNegativeWaitGroup
            | Self::PossibleUnlockBeforeLock
            | Self::PossibleCyclicDeadlock
            | Self::UnknownPanic => Severity::Critical,
            Self::ConcurrentRecv
            | Self::SelectWithoutPartner
            | Self::PossibleRecvOnClosed
            | Self::LeakUnbufferedWithPartner
            | Self::LeakUnbufferedWithoutPartner
            | Self::LeakBufferedWithPartner
            | Self::LeakBufferedWithoutPartner
            | Self::LeakNilChannel
            | Self::LeakSelectWithPartner
            | Self::LeakSelectWithoutPartner
            | Self::LeakMutex
            | Self::LeakWaitGroup
            | Self::LeakCond => Severity::Warning,
            Self::LeakWithoutBlock | Self::Timeout => Severity::Information,
        }
    }

    /// Whether the kind describes a bug that actually happened in the
    /// recorded run (as opposed to an hb-derived possibility).
    pub fn is_actual(&self) -> bool {
        matches!(
            self,
            Self::SendOnClosed
                | Self::RecvOnClosed
                | Self::CloseOnClosed
                | Self::CloseOnNil
                | Self::NegativeWaitGroup
                | Self::UnlockOfNotLocked
                | Self::UnknownPanic
        )
    }
}
