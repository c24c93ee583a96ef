//! Channel operations.

use skein_core::types::{OpId, PrimitiveId};

use super::event::PartnerRef;

/// Direction of a channel communication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelDir {
    Send,
    Recv,
}

impl ChannelDir {
    pub fn opposite(self) -> Self {
        match self {
            Self::Send => Self::Recv,
            Self::Recv => Self::Send,
        }
    }
}

/// What a channel element did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelOp {
    Send,
    Recv,
    Close,
}

impl ChannelOp {
    /// The communication direction, if the op is one.
    pub fn dir(self) -> Option<ChannelDir> {
        match self {
            Self::Send => Some(ChannelDir::Send),
            Self::Recv => Some(ChannelDir::Recv),
            Self::Close => None,
        }
    }
}

/// One send/recv/close on a channel.
#[derive(Debug, Clone)]
pub struct ChannelEvent {
    pub channel: PrimitiveId,
    pub op: ChannelOp,
    /// Recorder flag: the operation observed the channel closed.
    pub closed: bool,
    /// Pairs this send with its receive.
    pub o_id: OpId,
    /// Buffer capacity; 0 = unbuffered.
    pub q_size: u32,
    /// Queue length at the time of the operation.
    pub q_count: u32,
    /// Matching endpoint on an unbuffered channel, set by the linking pass.
    pub partner: Option<PartnerRef>,
}

impl ChannelEvent {
    pub fn send(channel: PrimitiveId, o_id: OpId, q_size: u32, q_count: u32) -> Self {
        Self {
            channel,
            op: ChannelOp::Send,
            closed: false,
            o_id,
            q_size,
            q_count,
            partner: None,
        }
    }

    pub fn recv(channel: PrimitiveId, o_id: OpId, q_size: u32, q_count: u32) -> Self {
        Self {
            channel,
            op: ChannelOp::Recv,
            closed: false,
            o_id,
            q_size,
            q_count,
            partner: None,
        }
    }

    pub fn close(channel: PrimitiveId) -> Self {
        Self {
            channel,
            op: ChannelOp::Close,
            closed: false,
            o_id: OpId::new(0),
            q_size: 0,
            q_count: 0,
            partner: None,
        }
    }

    /// Mark the recorder's closed flag.
    pub fn observed_closed(mut self) -> Self {
        self.closed = true;
        self
    }

    pub fn is_buffered(&self) -> bool {
        self.q_size > 0
    }
}
