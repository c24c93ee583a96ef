//! Select statements and their cases.

use smallvec::SmallVec;

use skein_core::types::{OpId, PrimitiveId};

use super::channel::ChannelDir;
use super::event::PartnerRef;

/// One case of a select: a potential send or receive on a channel.
#[derive(Debug, Clone)]
pub struct SelectCase {
    pub channel: PrimitiveId,
    pub dir: ChannelDir,
    /// Operation id, meaningful only for the chosen case.
    pub o_id: OpId,
    /// Buffer capacity of the case's channel; 0 = unbuffered.
    pub q_size: u32,
    /// Recorder flag: the case fired because the channel was closed.
    pub closed: bool,
    /// Matching endpoint for the chosen case, set by the linking pass.
    pub partner: Option<PartnerRef>,
}

impl SelectCase {
    pub fn send(channel: PrimitiveId, o_id: OpId, q_size: u32) -> Self {
        Self {
            channel,
            dir: ChannelDir::Send,
            o_id,
            q_size,
            closed: false,
            partner: None,
        }
    }

    pub fn recv(channel: PrimitiveId, o_id: OpId, q_size: u32) -> Self {
        Self {
            channel,
            dir: ChannelDir::Recv,
            o_id,
            q_size,
            closed: false,
            partner: None,
        }
    }

    pub fn is_buffered(&self) -> bool {
        self.q_size > 0
    }
}

/// A select statement: its cases and which one fired.
#[derive(Debug, Clone)]
pub struct SelectEvent {
    pub cases: SmallVec<[SelectCase; 4]>,
    /// Index of the case that fired; `None` when the default case ran or
    /// the select never completed.
    pub chosen: Option<usize>,
    pub has_default: bool,
}

impl SelectEvent {
    pub fn new(
        cases: SmallVec<[SelectCase; 4]>,
        chosen: Option<usize>,
        has_default: bool,
    ) -> Self {
        Self {
            cases,
            chosen,
            has_default,
        }
    }
}
