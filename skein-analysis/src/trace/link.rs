//! Partner linking for unbuffered channels.
//!
//! A send and its receive share `(channel, oID)`. The engine establishes
//! the link exactly once, before iteration; endpoints are plain channel
//! elements or chosen select cases. Buffered channels pair through the
//! buffer slots instead and are not linked here. Receives carrying the
//! closed flag pair with the close, not with a send.

use skein_core::types::collections::FxHashMap;
use skein_core::types::{OpId, PrimitiveId};
use tracing::warn;

use super::channel::{ChannelDir, ChannelOp};
use super::event::{ElementKind, PartnerRef};
use super::trace::Trace;

/// Link every completed unbuffered send to its receive. Idempotent.
pub fn link_partners(trace: &mut Trace) {
    if trace.linked {
        return;
    }

    let mut sends: FxHashMap<(PrimitiveId, OpId), PartnerRef> = FxHashMap::default();
    let mut recvs: FxHashMap<(PrimitiveId, OpId), PartnerRef> = FxHashMap::default();

    for id in trace.ids().collect::<Vec<_>>() {
        let element = trace.element(id);
        if element.is_blocked() {
            continue;
        }
        match &element.kind {
            ElementKind::Channel(c) => {
                if c.is_buffered() || c.channel.is_nil() {
                    continue;
                }
                match c.op {
                    // Ops carrying the closed flag pair with the close,
                    // not with a counterpart.
                    ChannelOp::Send if !c.closed => {
                        register(&mut sends, (c.channel, c.o_id), PartnerRef::Element(id));
                    }
                    ChannelOp::Recv if !c.closed => {
                        register(&mut recvs, (c.channel, c.o_id), PartnerRef::Element(id));
                    }
                    _ => {}
                }
            }
            ElementKind::Select(s) => {
                let Some(index) = s.chosen else { continue };
                let Some(case) = s.cases.get(index) else {
                    continue;
                };
                if case.is_buffered() || case.channel.is_nil() || case.closed {
                    continue;
                }
                let endpoint = PartnerRef::Case { select: id, index };
                match case.dir {
                    ChannelDir::Send => register(&mut sends, (case.channel, case.o_id), endpoint),
                    ChannelDir::Recv => register(&mut recvs, (case.channel, case.o_id), endpoint),
                }
            }
            _ => {}
        }
    }

    for (key, send) in &sends {
        if let Some(recv) = recvs.get(key) {
            set_partner(trace, *send, *recv);
            set_partner(trace, *recv, *send);
        }
    }

    trace.linked = true;
}

fn register(
    map: &mut FxHashMap<(PrimitiveId, OpId), PartnerRef>,
    key: (PrimitiveId, OpId),
    endpoint: PartnerRef,
) {
    if map.insert(key, endpoint).is_some() {
        warn!(
            channel = key.0.raw(),
            o_id = key.1.raw(),
            "duplicate unbuffered endpoint for (channel, oID); keeping the later one"
        );
    }
}

fn set_partner(trace: &mut Trace, on: PartnerRef, partner: PartnerRef) {
    match on {
        PartnerRef::Element(id) => {
            if let Some(c) = trace.element_mut(id).as_channel_mut() {
                c.partner = Some(partner);
            }
        }
        PartnerRef::Case { select, index } => {
            if let Some(s) = trace.element_mut(select).as_select_mut() {
                if let Some(case) = s.cases.get_mut(index) {
                    case.partner = Some(partner);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::channel::ChannelEvent;
    use crate::trace::trace::TraceBuilder;
    use skein_core::types::RoutineId;

    #[test]
    fn test_unbuffered_pair_is_linked_both_ways() {
        let mut builder = TraceBuilder::new(2);
        let ch = PrimitiveId::new(4);
        let send = builder
            .push(
                RoutineId::new(1),
                1,
                10,
                "a.go",
                5,
                ElementKind::Channel(ChannelEvent::send(ch, OpId::new(7), 0, 0)),
            )
            .unwrap();
        let recv = builder
            .push(
                RoutineId::new(2),
                2,
                11,
                "b.go",
                9,
                ElementKind::Channel(ChannelEvent::recv(ch, OpId::new(7), 0, 0)),
            )
            .unwrap();
        let mut trace = builder.finish().unwrap();
        link_partners(&mut trace);
        assert_eq!(
            trace.element(send).as_channel().unwrap().partner,
            Some(PartnerRef::Element(recv))
        );
        assert_eq!(
            trace.element(recv).as_channel().unwrap().partner,
            Some(PartnerRef::Element(send))
        );
    }

    #[test]
    fn test_blocked_ops_are_not_linked() {
        let mut builder = TraceBuilder::new(2);
        let ch = PrimitiveId::new(4);
        let send = builder
            .push(
                RoutineId::new(1),
                1,
                0,
                "a.go",
                5,
                ElementKind::Channel(ChannelEvent::send(ch, OpId::new(7), 0, 0)),
            )
            .unwrap();
        let mut trace = builder.finish().unwrap();
        link_partners(&mut trace);
        assert!(trace.element(send).as_channel().unwrap().partner.is_none());
    }
}
