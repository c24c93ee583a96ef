//! Result sinks.
//!
//! The engine emits into a sink it does not own; the default in-memory
//! sink deduplicates by an xxh3 key over the timestamp-free identity of
//! each result, so re-detections of the same bug collapse.

use xxhash_rust::xxh3::xxh3_64;

use crate::types::collections::FxHashSet;

use super::result::AnalysisResult;
use super::severity::Severity;

/// Receiver for emitted results.
pub trait ResultSink {
    fn emit(&mut self, result: AnalysisResult);
}

/// Collecting sink with deduplication.
#[derive(Debug, Default)]
pub struct MemorySink {
    results: Vec<AnalysisResult>,
    seen: FxHashSet<u64>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All accepted results, in emission order.
    pub fn results(&self) -> &[AnalysisResult] {
        &self.results
    }

    /// Consume the sink, returning the accepted results.
    pub fn into_results(self) -> Vec<AnalysisResult> {
        self.results
    }

    /// Whether any result was emitted.
    pub fn found_bug(&self) -> bool {
        !self.results.is_empty()
    }

    /// Number of accepted results at the given severity.
    pub fn count_at(&self, severity: Severity) -> usize {
        self.results.iter().filter(|r| r.severity == severity).count()
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

impl ResultSink for MemorySink {
    fn emit(&mut self, result: AnalysisResult) {
        let key = xxh3_64(result.dedup_key().as_bytes());
        if self.seen.insert(key) {
            self.results.push(result);
        } else {
            tracing::debug!(code = result.kind.code(), "duplicate result suppressed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::results::{BugKind, ElementInfo, ElementRef, ObjectType};
    use crate::types::{PrimitiveId, RoutineId};

    fn element(t_pre: u64) -> ElementRef {
        ElementRef::Element(ElementInfo {
            routine: RoutineId::new(1),
            object_id: PrimitiveId::new(4),
            t_pre,
            object_type: ObjectType::Channel,
            file: "main.go".to_string(),
            line: 12,
        })
    }

    #[test]
    fn test_dedup_ignores_timestamps() {
        let mut sink = MemorySink::new();
        sink.emit(AnalysisResult::new(
            BugKind::PossibleSendOnClosed,
            vec![element(10)],
            vec![],
        ));
        sink.emit(AnalysisResult::new(
            BugKind::PossibleSendOnClosed,
            vec![element(99)],
            vec![],
        ));
        assert_eq!(sink.len(), 1);
    }

    #[test]
    fn test_distinct_kinds_are_kept() {
        use crate::results::Severity;

        let mut sink = MemorySink::new();
        sink.emit(AnalysisResult::new(
            BugKind::PossibleSendOnClosed,
            vec![element(10)],
            vec![],
        ));
        sink.emit(AnalysisResult::new(
            BugKind::PossibleRecvOnClosed,
            vec![element(10)],
            vec![],
        ));
        assert_eq!(sink.len(), 2);
        assert!(sink.found_bug());
        assert_eq!(sink.count_at(Severity::Critical), 1);
        assert_eq!(sink.count_at(Severity::Warning), 1);
    }
}
