//! Trace elements: common header plus a per-kind payload.

use skein_core::results::ObjectType;
use skein_core::types::{EventId, Position, PrimitiveId, RoutineId};

use crate::clock::VectorClock;

use super::atomic::AtomicEvent;
use super::channel::ChannelEvent;
use super::cond::{CondEvent, CondOp};
use super::control::{ForkEvent, NewEvent, ReplayEndEvent};
use super::mutex::MutexEvent;
use super::once::OnceEvent;
use super::select::SelectEvent;
use super::wait_group::WaitGroupEvent;

/// Sort key value for events that never completed; pushes them to the
/// end of the global order.
pub const T_SORT_BLOCKED: u64 = u64::MAX;

/// Endpoint of a channel communication: a plain channel element, or one
/// case of a select.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PartnerRef {
    Element(EventId),
    Case { select: EventId, index: usize },
}

impl PartnerRef {
    /// The arena element the endpoint lives on.
    pub fn event(self) -> EventId {
        match self {
            Self::Element(id) => id,
            Self::Case { select, .. } => select,
        }
    }
}

/// Per-kind payload of a trace element.
#[derive(Debug, Clone)]
pub enum ElementKind {
    Channel(ChannelEvent),
    Select(SelectEvent),
    Mutex(MutexEvent),
    WaitGroup(WaitGroupEvent),
    Cond(CondEvent),
    Once(OnceEvent),
    Atomic(AtomicEvent),
    Fork(ForkEvent),
    RoutineEnd,
    New(NewEvent),
    ReplayEnd(ReplayEndEvent),
}

impl ElementKind {
    /// The primitive class for element references.
    pub fn object_type(&self) -> ObjectType {
        match self {
            Self::Channel(_) => ObjectType::Channel,
            Self::Select(_) => ObjectType::Select,
            Self::Mutex(_) => ObjectType::Mutex,
            Self::WaitGroup(_) => ObjectType::WaitGroup,
            Self::Cond(_) => ObjectType::Cond,
            Self::Once(_) => ObjectType::Once,
            Self::Atomic(_) => ObjectType::Atomic,
            Self::Fork(_) | Self::RoutineEnd => ObjectType::Routine,
            Self::New(n) => match n.primitive {
                super::control::PrimitiveType::Channel => ObjectType::Channel,
                super::control::PrimitiveType::Mutex => ObjectType::Mutex,
                super::control::PrimitiveType::WaitGroup => ObjectType::WaitGroup,
                super::control::PrimitiveType::Cond => ObjectType::Cond,
                super::control::PrimitiveType::Once => ObjectType::Once,
                super::control::PrimitiveType::Atomic => ObjectType::Atomic,
            },
            Self::ReplayEnd(_) => ObjectType::Replay,
        }
    }

    /// The primitive id the element operates on, where there is one.
    pub fn object_id(&self) -> PrimitiveId {
        match self {
            Self::Channel(c) => c.channel,
            Self::Mutex(m) => m.mutex,
            Self::WaitGroup(w) => w.wg,
            Self::Cond(c) => c.cond,
            Self::Once(o) => o.once,
            Self::Atomic(a) => a.atomic,
            Self::New(n) => n.id,
            Self::Fork(f) => PrimitiveId::new(f.child.raw() as i64),
            Self::Select(_) | Self::RoutineEnd | Self::ReplayEnd(_) => PrimitiveId::new(0),
        }
    }
}

/// One recorded operation: identity, timestamps, position, payload, and
/// the two clocks the engine computes.
#[derive(Debug, Clone)]
pub struct TraceElement {
    pub routine: RoutineId,
    pub pos: Position,
    /// Timestamp at operation start.
    pub t_pre: u64,
    /// Timestamp at completion; 0 = never completed.
    pub t_post: u64,
    /// Happens-before clock, empty until the updater fills it.
    pub vc: VectorClock,
    /// Must-happen-before (weak) clock.
    pub wvc: VectorClock,
    pub kind: ElementKind,
}

impl TraceElement {
    /// Whether the operation never completed.
    pub fn is_blocked(&self) -> bool {
        self.t_post == 0
    }

    /// Global processing order key.
    ///
    /// Completion time for ordinary events, with never-completed events
    /// pushed to the end. Cond signal/broadcast order by their start
    /// timestamp instead; atomics carry a single timestamp.
    pub fn t_sort(&self) -> u64 {
        match &self.kind {
            ElementKind::Cond(c) if matches!(c.op, CondOp::Signal | CondOp::Broadcast) => {
                if self.t_pre > 0 {
                    self.t_pre
                } else {
                    T_SORT_BLOCKED
                }
            }
            _ => {
                if self.t_post > 0 {
                    self.t_post
                } else {
                    T_SORT_BLOCKED
                }
            }
        }
    }

    // ---- payload accessors ----

    pub fn as_channel(&self) -> Option<&ChannelEvent> {
        match &self.kind {
            ElementKind::Channel(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_channel_mut(&mut self) -> Option<&mut ChannelEvent> {
        match &mut self.kind {
            ElementKind::Channel(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_select(&self) -> Option<&SelectEvent> {
        match &self.kind {
            ElementKind::Select(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_select_mut(&mut self) -> Option<&mut SelectEvent> {
        match &mut self.kind {
            ElementKind::Select(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_mutex(&self) -> Option<&MutexEvent> {
        match &self.kind {
            ElementKind::Mutex(m) => Some(m),
            _ => None,
        }
    }
}
