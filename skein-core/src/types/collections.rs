//! Re-exports of performance-oriented collection types.

pub use rustc_hash::{FxHashMap, FxHashSet};
pub use smallvec::SmallVec;
pub use std::collections::VecDeque;

/// SmallVec optimized for lockset entries (usually <8).
pub type SmallVec8<T> = SmallVec<[T; 8]>;

/// SmallVec optimized for witness lists (usually <2).
pub type SmallVec2<T> = SmallVec<[T; 2]>;
