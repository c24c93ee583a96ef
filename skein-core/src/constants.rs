//! Process-wide constants shared by the engine and its collaborators.

/// Multiplier for the max-flow iteration bound: the search aborts as
/// inconclusive after `MAX_FLOW_ITERATION_FACTOR * edges^3` augmenting
/// rounds (saturating).
pub const MAX_FLOW_ITERATION_FACTOR: u64 = 100_000;

/// Recorded exit codes a trace can end with (the `X` record).
///
/// Codes 30 and above denote a concrete runtime panic whose position the
/// recorder captured.
pub mod exit_codes {
    /// Clean exit.
    pub const SUCCESS: i32 = 0;
    /// The supervised run was cut off by the external timeout.
    pub const TIMEOUT: i32 = 10;
    /// Panic of a kind the recorder could not classify.
    pub const PANIC_UNKNOWN: i32 = 3;
    /// Send on a closed channel.
    pub const SEND_ON_CLOSED: i32 = 30;
    /// Close of a closed channel.
    pub const CLOSE_ON_CLOSED: i32 = 31;
    /// Close of a nil channel.
    pub const CLOSE_ON_NIL: i32 = 32;
    /// Wait-group counter went negative.
    pub const NEGATIVE_WAIT_GROUP: i32 = 33;
    /// Unlock of a mutex that was not locked.
    pub const UNLOCK_OF_NOT_LOCKED: i32 = 34;
}
