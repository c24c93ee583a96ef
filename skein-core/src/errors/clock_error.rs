//! Vector clock errors.
//!
//! Both variants are programming errors: the engine sizes every clock to
//! the routine count of the trace, so hitting one of these aborts the run.

use super::error_code::{self, SkeinErrorCode};

/// Errors raised by vector clock operations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ClockError {
    #[error("Clock index {index} out of range [1, {size}]")]
    OutOfRange { index: u32, size: usize },

    #[error("Clock size mismatch: {left} vs {right}")]
    SizeMismatch { left: usize, right: usize },
}

impl SkeinErrorCode for ClockError {
    fn error_code(&self) -> &'static str {
        error_code::CLOCK_ERROR
    }
}
