//! Core type vocabulary: ids, collections, positions, interning.

pub mod collections;
pub mod ids;
pub mod interning;
pub mod position;

pub use ids::{EventId, OpId, PrimitiveId, RoutineId};
pub use interning::PathInterner;
pub use position::Position;
