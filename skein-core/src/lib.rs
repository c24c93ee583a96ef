//! Shared vocabulary for the skein concurrency-trace analyzer.
//!
//! Everything the analysis engine and its collaborators agree on lives
//! here: typed identifiers, collection aliases, source-position interning,
//! error enums with stable code strings, the analysis configuration, the
//! result model with its deduplicating sink, cooperative cancellation, and
//! tracing setup.

pub mod cancel;
pub mod config;
pub mod constants;
pub mod errors;
pub mod results;
pub mod tracing;
pub mod types;
