use std::collections::HashMap;

use crate::block::router::route;
use crate::block::types::{Ack, AckError, MessageWithEntry, MsgAckPair};

/// Issues acknowledgments the way leaders do: every message gets the next height in the VM its
/// chain is routed to, chained to the previous ack of that VM.
pub struct Leader {
    number_of_leaders: usize,
    db_height: u32,
    last_acks: HashMap<usize, Ack>,
}

impl Leader {
    pub fn new(number_of_leaders: usize, db_height: u32) -> Self {
        Self {
            number_of_leaders,
            db_height,
            last_acks: HashMap::new(),
        }
    }

    /// Fails only when the VM of the message has used up all heights.
    pub fn acknowledge<M: MessageWithEntry>(&mut self, message: &M) -> Result<Ack, AckError> {
        let vm_index = route(&message.entry_chain_id(), self.number_of_leaders);
        let message_hash = message.message_hash();

        let ack = match self.last_acks.get(&vm_index) {
            Some(previous) => Ack::following(previous, message_hash)?,
            None => Ack::first(vm_index as u32, self.db_height, message_hash),
        };
        self.last_acks.insert(vm_index, ack.clone());
        Ok(ack)
    }

    pub fn acknowledge_all<M: MessageWithEntry>(
        &mut self,
        messages: Vec<M>,
    ) -> Result<Vec<MsgAckPair<M>>, AckError> {
        messages
            .into_iter()
            .map(|message| {
                let ack = self.acknowledge(&message)?;
                Ok(MsgAckPair::new(message, ack))
            })
            .collect()
    }
}
