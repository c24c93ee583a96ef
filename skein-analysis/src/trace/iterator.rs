//! Globally sorted event iteration.
//!
//! One cursor per routine; each step picks the routine whose current
//! element has the smallest `t_sort`, ties broken by ascending routine
//! id. Elements consumed out of band (unbuffered partners) are entered
//! into a skip set and stepped over when their cursor reaches them.

use skein_core::types::collections::FxHashSet;
use skein_core::types::EventId;

use super::trace::Trace;

/// Cursor value for a routine whose stream is exhausted.
const PARKED: isize = -1;

#[derive(Debug)]
pub struct SortedIter {
    cursors: Vec<isize>,
    skip: FxHashSet<EventId>,
}

impl SortedIter {
    pub fn new(trace: &Trace) -> Self {
        Self {
            cursors: vec![0; trace.routine_count()],
            skip: FxHashSet::default(),
        }
    }

    /// Mark an element as already processed so the owning routine's
    /// cursor steps over it.
    pub fn consume(&mut self, id: EventId) {
        self.skip.insert(id);
    }

    /// The next element in global order, advancing its routine's cursor.
    pub fn next(&mut self, trace: &Trace) -> Option<EventId> {
        let mut best: Option<(u64, usize, EventId)> = None;
        for ri in 0..self.cursors.len() {
            loop {
                let cursor = self.cursors[ri];
                if cursor == PARKED {
                    break;
                }
                let events = trace.events_of_index(ri);
                let index = cursor as usize;
                if index >= events.len() {
                    self.cursors[ri] = PARKED;
                    break;
                }
                let eid = events[index];
                if self.skip.remove(&eid) {
                    self.cursors[ri] = cursor + 1;
                    continue;
                }
                let key = trace.element(eid).t_sort();
                // Strict < keeps the lowest routine id on ties.
                if best.map_or(true, |(bk, _, _)| key < bk) {
                    best = Some((key, ri, eid));
                }
                break;
            }
        }
        let (_, ri, eid) = best?;
        self.cursors[ri] += 1;
        Some(eid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::channel::ChannelEvent;
    use crate::trace::event::ElementKind;
    use crate::trace::trace::TraceBuilder;
    use skein_core::types::{OpId, PrimitiveId, RoutineId};

    fn send(o: u64) -> ElementKind {
        ElementKind::Channel(ChannelEvent::send(PrimitiveId::new(1), OpId::new(o), 0, 0))
    }

    fn build() -> Trace {
        let mut builder = TraceBuilder::new(2);
        // routine 1: t_post 10, 40; routine 2: t_post 20, blocked
        builder
            .push(RoutineId::new(1), 9, 10, "a.go", 1, send(1))
            .unwrap();
        builder
            .push(RoutineId::new(1), 39, 40, "a.go", 2, send(2))
            .unwrap();
        builder
            .push(RoutineId::new(2), 19, 20, "b.go", 1, send(3))
            .unwrap();
        builder
            .push(RoutineId::new(2), 50, 0, "b.go", 2, send(4))
            .unwrap();
        builder.finish().unwrap()
    }

    #[test]
    fn test_global_order_with_blocked_last() {
        let trace = build();
        let mut iter = SortedIter::new(&trace);
        let mut order = Vec::new();
        while let Some(id) = iter.next(&trace) {
            order.push(trace.element(id).t_post);
        }
        assert_eq!(order, vec![10, 20, 40, 0]);
    }

    #[test]
    fn test_consumed_elements_are_skipped() {
        let trace = build();
        let mut iter = SortedIter::new(&trace);
        let first = iter.next(&trace).unwrap();
        assert_eq!(trace.element(first).t_post, 10);
        // Consume routine 2's first element before the iterator reaches it.
        let second = trace.events_of(RoutineId::new(2))[0];
        iter.consume(second);
        let next = iter.next(&trace).unwrap();
        assert_eq!(trace.element(next).t_post, 40);
    }
}
