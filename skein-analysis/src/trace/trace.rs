//! The trace: an arena of elements plus per-routine ordering.

use skein_core::errors::TraceError;
use skein_core::results::{ElementInfo, ElementRef, ObjectType, SelectCaseInfo};
use skein_core::types::{EventId, PathInterner, Position, RoutineId};

use super::event::{ElementKind, TraceElement};

/// A recorded execution: all elements of all routines.
///
/// Elements live in one arena; every cross-reference in the engine is an
/// [`EventId`] into it. Routine ids are 1-based and dense; the element
/// lists per routine are ordered by `t_pre` as recorded.
#[derive(Debug)]
pub struct Trace {
    elements: Vec<TraceElement>,
    routines: Vec<Vec<EventId>>,
    interner: PathInterner,
    pub(crate) linked: bool,
}

impl Trace {
    /// Number of routines (fixed at construction).
    pub fn routine_count(&self) -> usize {
        self.routines.len()
    }

    /// Total number of elements.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Number of elements recorded for one routine.
    pub fn element_count_for(&self, routine: RoutineId) -> usize {
        self.routines
            .get(routine.index())
            .map(|events| events.len())
            .unwrap_or(0)
    }

    pub fn element(&self, id: EventId) -> &TraceElement {
        &self.elements[id.index()]
    }

    pub fn element_mut(&mut self, id: EventId) -> &mut TraceElement {
        &mut self.elements[id.index()]
    }

    /// The ordered element ids of one routine.
    pub fn events_of(&self, routine: RoutineId) -> &[EventId] {
        &self.routines[routine.index()]
    }

    pub(crate) fn events_of_index(&self, routine_index: usize) -> &[EventId] {
        &self.routines[routine_index]
    }

    /// Iterate all element ids in arena order.
    pub fn ids(&self) -> impl Iterator<Item = EventId> + '_ {
        (0..self.elements.len()).map(EventId::from_index)
    }

    pub fn interner(&self) -> &PathInterner {
        &self.interner
    }

    /// Self-contained reference to an element.
    pub fn summarize(&self, id: EventId) -> ElementRef {
        let element = self.element(id);
        ElementRef::Element(ElementInfo {
            routine: element.routine,
            object_id: element.kind.object_id(),
            t_pre: element.t_pre,
            object_type: element.kind.object_type(),
            file: self.interner.resolve(&element.pos.file).to_string(),
            line: element.pos.line,
        })
    }

    /// Self-contained reference to one case of a select element.
    pub fn summarize_case(&self, select: EventId, index: usize) -> ElementRef {
        let element = self.element(select);
        let case = element
            .as_select()
            .and_then(|s| s.cases.get(index))
            .expect("case index out of range for select element");
        ElementRef::SelectCase(SelectCaseInfo {
            select_id: select,
            channel_id: case.channel,
            object_type: ObjectType::Channel,
            routine: element.routine,
            case_index: index,
            op_id: Some(case.o_id),
            file: self.interner.resolve(&element.pos.file).to_string(),
            line: element.pos.line,
        })
    }

    /// Reference through a partner endpoint.
    pub fn summarize_partner(&self, partner: super::event::PartnerRef) -> ElementRef {
        match partner {
            super::event::PartnerRef::Element(id) => self.summarize(id),
            super::event::PartnerRef::Case { select, index } => self.summarize_case(select, index),
        }
    }

    /// Model-level validation: per-routine `t_pre` ordering.
    pub fn validate(&self) -> Result<(), TraceError> {
        for (ri, events) in self.routines.iter().enumerate() {
            let mut last_pre = 0u64;
            for (i, &eid) in events.iter().enumerate() {
                let t_pre = self.element(eid).t_pre;
                if t_pre > 0 && t_pre < last_pre {
                    return Err(TraceError::UnorderedEvents {
                        routine: ri as u32 + 1,
                        index: i,
                    });
                }
                if t_pre > 0 {
                    last_pre = t_pre;
                }
            }
        }
        Ok(())
    }
}

/// Incremental trace assembly, targeted by the (external) parser and by
/// tests.
#[derive(Debug)]
pub struct TraceBuilder {
    elements: Vec<TraceElement>,
    routines: Vec<Vec<EventId>>,
    interner: PathInterner,
}

impl TraceBuilder {
    /// A builder for a trace with `routines` routines.
    pub fn new(routines: usize) -> Self {
        Self {
            elements: Vec::new(),
            routines: vec![Vec::new(); routines],
            interner: PathInterner::new(),
        }
    }

    /// Append one element to a routine's stream. Elements must be pushed
    /// in recorded (`t_pre`) order.
    pub fn push(
        &mut self,
        routine: RoutineId,
        t_pre: u64,
        t_post: u64,
        file: &str,
        line: u32,
        kind: ElementKind,
    ) -> Result<EventId, TraceError> {
        let index = routine.index();
        if index >= self.routines.len() {
            return Err(TraceError::RoutineOutOfRange {
                routine: routine.raw(),
                count: self.routines.len(),
            });
        }
        let pos = Position::new(self.interner.intern(file), line);
        let id = EventId::from_index(self.elements.len());
        self.elements.push(TraceElement {
            routine,
            pos,
            t_pre,
            t_post,
            vc: crate::clock::VectorClock::empty(),
            wvc: crate::clock::VectorClock::empty(),
            kind,
        });
        self.routines[index].push(id);
        Ok(id)
    }

    /// Finish assembly and validate the model-level invariants.
    pub fn finish(self) -> Result<Trace, TraceError> {
        let trace = Trace {
            elements: self.elements,
            routines: self.routines,
            interner: self.interner,
            linked: false,
        };
        trace.validate()?;
        Ok(trace)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::channel::ChannelEvent;
    use skein_core::types::{OpId, PrimitiveId};

    #[test]
    fn test_push_rejects_unknown_routine() {
        let mut builder = TraceBuilder::new(1);
        let result = builder.push(
            RoutineId::new(2),
            1,
            2,
            "main.go",
            10,
            ElementKind::Channel(ChannelEvent::send(PrimitiveId::new(1), OpId::new(1), 0, 0)),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_finish_rejects_unordered_events() {
        let mut builder = TraceBuilder::new(1);
        let kind =
            |o: u64| ElementKind::Channel(ChannelEvent::send(PrimitiveId::new(1), OpId::new(o), 0, 0));
        builder
            .push(RoutineId::new(1), 10, 11, "main.go", 1, kind(1))
            .unwrap();
        builder
            .push(RoutineId::new(1), 5, 6, "main.go", 2, kind(2))
            .unwrap();
        assert!(builder.finish().is_err());
    }

    #[test]
    fn test_element_count_is_per_routine() {
        let mut builder = TraceBuilder::new(2);
        let kind =
            |o: u64| ElementKind::Channel(ChannelEvent::send(PrimitiveId::new(1), OpId::new(o), 0, 0));
        builder
            .push(RoutineId::new(1), 1, 2, "main.go", 1, kind(1))
            .unwrap();
        builder
            .push(RoutineId::new(1), 3, 4, "main.go", 2, kind(2))
            .unwrap();
        builder
            .push(RoutineId::new(2), 5, 6, "main.go", 3, kind(3))
            .unwrap();
        let trace = builder.finish().unwrap();
        assert_eq!(trace.element_count_for(RoutineId::new(1)), 2);
        assert_eq!(trace.element_count_for(RoutineId::new(2)), 1);
        assert_eq!(trace.len(), 3);
    }
}
