//! Trace ingest errors.

use super::error_code::{self, SkeinErrorCode};

/// Errors raised while assembling or validating a trace.
///
/// Tokenization failures are the parser's responsibility; these cover the
/// model-level checks the engine performs at ingest.
#[derive(Debug, thiserror::Error)]
pub enum TraceError {
    #[error("Malformed trace record for routine {routine}: {message}")]
    MalformedRecord { routine: u32, message: String },

    #[error("Routine id {routine} out of range [1, {count}]")]
    RoutineOutOfRange { routine: u32, count: usize },

    #[error("Events of routine {routine} are not ordered by tPre at index {index}")]
    UnorderedEvents { routine: u32, index: usize },
}

impl SkeinErrorCode for TraceError {
    fn error_code(&self) -> &'static str {
        error_code::TRACE_ERROR
    }
}
