//! Cyclic resource deadlocks.
//!
//! Phase 1 records lock dependencies while the updater processes mutex
//! acquires; phase 2 searches the dependency set for cycles and filters
//! the candidates by weak-clock concurrency.

pub mod cycles;
pub mod dependencies;

pub use cycles::search;
pub use dependencies::{mark_failed, record_acquire};
