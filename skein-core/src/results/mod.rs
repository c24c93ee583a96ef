//! The result model: severities, bug kinds, element references, sink.

pub mod flow;
pub mod kind;
pub mod refs;
pub mod result;
pub mod severity;
pub mod sink;

pub use flow::{FlowCandidate, FlowKind};
pub use kind::BugKind;
pub use refs::{ElementInfo, ElementRef, ObjectType, SelectCaseInfo};
pub use result::AnalysisResult;
pub use severity::Severity;
pub use sink::{MemorySink, ResultSink};
