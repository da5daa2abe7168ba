use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::utilities::encoding::to_hex;
use crate::utilities::hash::{blake2_256_concat, ChainId, HashType};
use crate::utilities::time::SequencerTime;

/// A message which carries an entry of some chain.
///
/// The sequencer doesn't look into the payload, it only needs to know which chain the entry
/// belongs to.
pub trait MessageWithEntry {
    fn entry_chain_id(&self) -> ChainId;

    /// Hash acknowledged by a leader for this message.
    fn message_hash(&self) -> HashType;
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct EntryMessage {
    pub chain_id: ChainId,
    ///Time when the message was created, not part of the message hash
    #[serde(default)]
    pub timestamp: u64,
    ///Application specific data
    pub payload: Vec<u8>,
}

impl EntryMessage {
    pub fn new(chain_id: ChainId, payload: Vec<u8>) -> Self {
        Self {
            chain_id,
            timestamp: SequencerTime::now(),
            payload,
        }
    }
}

impl MessageWithEntry for EntryMessage {
    fn entry_chain_id(&self) -> ChainId {
        self.chain_id
    }

    fn message_hash(&self) -> HashType {
        blake2_256_concat(&[self.chain_id.as_bytes(), self.payload.as_slice()])
    }
}

impl Display for EntryMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let chain_id = &self.chain_id;
        let hash = to_hex(self.message_hash());
        write!(f, "chain: {chain_id}, hash: {hash}, payload size: {}", self.payload.len())
    }
}
