use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::block::types::ack::Ack;
use crate::block::types::message::MessageWithEntry;
use crate::utilities::hash::ChainId;

/// A message together with the acknowledgment which places it into a VM sequence.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct MsgAckPair<M> {
    pub message: M,
    pub ack: Ack,
}

impl<M> MsgAckPair<M> {
    pub fn new(message: M, ack: Ack) -> Self {
        Self { message, ack }
    }

    pub fn height(&self) -> u32 {
        self.ack.height
    }
}

impl<M: MessageWithEntry> MsgAckPair<M> {
    pub fn chain_id(&self) -> ChainId {
        self.message.entry_chain_id()
    }

    /// Pairs are identified by their chain and ack height, not by the message payload.
    pub fn key(&self) -> (ChainId, u32) {
        (self.chain_id(), self.ack.height)
    }

    /// The ack was issued for this message.
    pub fn message_matches_ack(&self) -> bool {
        self.message.message_hash() == self.ack.message_hash
    }

    /// Both pairs carry the same message and the same acknowledgment.
    pub(crate) fn is_redelivery_of(&self, other: &MsgAckPair<M>) -> bool {
        self.key() == other.key()
            && self.ack.message_hash == other.ack.message_hash
            && self.ack.serial_hash == other.ack.serial_hash
            && self.message.message_hash() == other.message.message_hash()
    }
}

impl<M: MessageWithEntry> Display for MsgAckPair<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let chain_id = self.chain_id();
        let ack = &self.ack;
        write!(f, "chain: {chain_id}, {ack}")
    }
}
