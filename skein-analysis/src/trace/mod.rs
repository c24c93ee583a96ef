//! The trace model: typed events in an arena, per-routine ordering, the
//! globally sorted iterator, and partner linking.

pub mod atomic;
pub mod channel;
pub mod cond;
pub mod control;
pub mod event;
pub mod iterator;
pub mod link;
pub mod mutex;
pub mod once;
pub mod select;
#[allow(clippy::module_inception)]
pub mod trace;
pub mod wait_group;

pub use atomic::{AtomicEvent, AtomicOp};
pub use channel::{ChannelDir, ChannelEvent, ChannelOp};
pub use cond::{CondEvent, CondOp};
pub use control::{ForkEvent, NewEvent, PrimitiveType, ReplayEndEvent};
pub use event::{ElementKind, PartnerRef, TraceElement};
pub use iterator::SortedIter;
pub use mutex::{MutexEvent, MutexOp};
pub use once::OnceEvent;
pub use select::{SelectCase, SelectEvent};
pub use trace::{Trace, TraceBuilder};
pub use wait_group::{WaitGroupEvent, WaitGroupOp};
