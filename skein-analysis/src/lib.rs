//! The skein analysis engine.
//!
//! Consumes a recorded execution trace of a message-passing/locking
//! program and produces concurrency bug reports with witnesses. One pass
//! over all events in global time order computes two vector clocks per
//! event (happens-before and the weaker must-happen-before) while the
//! enabled predicates run interleaved; a final pass sweeps up everything
//! that needs the whole trace (leak partners, select partners, max-flow
//! checks, lock cycles).

pub mod clock;
pub mod detectors;
pub mod engine;
pub mod trace;
