//! Driver-level analysis errors.

use super::clock_error::ClockError;
use super::error_code::{self, SkeinErrorCode};
use super::trace_error::TraceError;

/// Errors that abort an analysis run.
///
/// Predicate-local failures (cross-thread release, max-flow overflow) are
/// recovered in place and surface on the report instead; only conditions
/// that invalidate the whole run travel this path. Cancellation is not an
/// error either — the driver returns the accumulated results.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error(transparent)]
    Clock(#[from] ClockError),

    #[error(transparent)]
    Trace(#[from] TraceError),
}

impl SkeinErrorCode for AnalysisError {
    fn error_code(&self) -> &'static str {
        match self {
            AnalysisError::Clock(_) => error_code::CLOCK_ERROR,
            AnalysisError::Trace(_) => error_code::TRACE_ERROR,
        }
    }
}
