//! Result severities.

use serde::{Deserialize, Serialize};

/// Severity of a reported bug.
///
/// Critical means a concrete panic-class bug or deadlock, Warning a
/// high-confidence hazard, Information an advisory finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Information,
    Warning,
    Critical,
}

impl Severity {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Information => "information",
            Self::Warning => "warning",
            Self::Critical => "critical",
        }
    }
}
