//! Vector clock algebra.

pub mod ordering;
pub mod vector;

pub use ordering::HappensBefore;
pub use vector::VectorClock;
