//! References from a result to the trace elements that witness it.

use serde::{Deserialize, Serialize};

use crate::types::{EventId, OpId, PrimitiveId, RoutineId};

/// The primitive class a reference points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectType {
    Channel,
    Select,
    Mutex,
    WaitGroup,
    Cond,
    Once,
    Atomic,
    Routine,
    Replay,
}

impl ObjectType {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Channel => "channel",
            Self::Select => "select",
            Self::Mutex => "mutex",
            Self::WaitGroup => "wait_group",
            Self::Cond => "cond",
            Self::Once => "once",
            Self::Atomic => "atomic",
            Self::Routine => "routine",
            Self::Replay => "replay",
        }
    }
}

/// Summary of a trace element, self-contained so results survive the
/// trace they were computed from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementInfo {
    pub routine: RoutineId,
    pub object_id: PrimitiveId,
    pub t_pre: u64,
    pub object_type: ObjectType,
    pub file: String,
    pub line: u32,
}

/// Reference to one case of a select statement.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SelectCaseInfo {
    /// Arena id of the select element.
    pub select_id: EventId,
    pub channel_id: PrimitiveId,
    pub object_type: ObjectType,
    pub routine: RoutineId,
    pub case_index: usize,
    /// Operation id of the case, when the recorder assigned one.
    pub op_id: Option<OpId>,
    pub file: String,
    pub line: u32,
}

/// A single witness: either a whole trace element or one select case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "ref", rename_all = "snake_case")]
pub enum ElementRef {
    Element(ElementInfo),
    SelectCase(SelectCaseInfo),
}

impl ElementRef {
    pub fn routine(&self) -> RoutineId {
        match self {
            Self::Element(e) => e.routine,
            Self::SelectCase(c) => c.routine,
        }
    }

    /// Stable identity of the referenced element with timestamps omitted,
    /// used for result deduplication.
    pub(crate) fn dedup_fragment(&self, out: &mut String) {
        use std::fmt::Write;
        match self {
            Self::Element(e) => {
                let _ = write!(
                    out,
                    "e:{}:{}:{}:{}:{};",
                    e.routine,
                    e.object_id,
                    e.object_type.name(),
                    e.file,
                    e.line
                );
            }
            Self::SelectCase(c) => {
                let _ = write!(
                    out,
                    "c:{}:{}:{}:{}:{}:{};",
                    c.routine,
                    c.channel_id,
                    c.object_type.name(),
                    c.case_index,
                    c.file,
                    c.line
                );
            }
        }
    }
}
