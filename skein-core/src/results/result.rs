//! A single emitted bug report.

use serde::{Deserialize, Serialize};

use super::kind::BugKind;
use super::refs::ElementRef;
use super::severity::Severity;

/// One bug report: a kind, a severity, and two witness lists.
///
/// `primary` holds the operations the bug is reported against; `secondary`
/// holds the partner/context operations (the close a send raced with, the
/// other positions of a deadlock cycle, …).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub severity: Severity,
    pub kind: BugKind,
    pub primary: Vec<ElementRef>,
    pub secondary: Vec<ElementRef>,
}

impl AnalysisResult {
    /// A result at the kind's default severity.
    pub fn new(kind: BugKind, primary: Vec<ElementRef>, secondary: Vec<ElementRef>) -> Self {
        Self {
            severity: kind.default_severity(),
            kind,
            primary,
            secondary,
        }
    }

    /// Override the severity (e.g. escalate a leak that is part of a
    /// mixed deadlock).
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// Canonical dedup string: code plus every reference with timestamps
    /// omitted.
    pub fn dedup_key(&self) -> String {
        let mut key = String::with_capacity(64);
        key.push_str(self.kind.code());
        key.push('|');
        for r in &self.primary {
            r.dedup_fragment(&mut key);
        }
        key.push('|');
        for r in &self.secondary {
            r.dedup_fragment(&mut key);
        }
        key
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::results::{ElementInfo, ElementRef, ObjectType};
    use crate::types::{PrimitiveId, RoutineId};

    fn sample() -> AnalysisResult {
        AnalysisResult::new(
            BugKind::CloseOnClosed,
            vec![ElementRef::Element(ElementInfo {
                routine: RoutineId::new(2),
                object_id: PrimitiveId::new(16),
                t_pre: 42,
                object_type: ObjectType::Channel,
                file: "main.go".to_string(),
                line: 7,
            })],
            vec![],
        )
    }

    #[test]
    fn test_json_round_trip() {
        let result = sample();
        let json = serde_json::to_string(&result).unwrap();
        let back: AnalysisResult = serde_json::from_str(&json).unwrap();
        assert_eq!(result, back);
    }

    #[test]
    fn test_dedup_key_carries_the_code() {
        assert!(sample().dedup_key().starts_with("A03|"));
    }
}
