use std::collections::VecDeque;
use std::num::NonZeroUsize;

use parking_lot::RwLock;
use serde::Serialize;

use crate::block::types::{Ack, MessageWithEntry, MsgAckPair};
use crate::block::{Result, SequencerError};

/// Read only view of a lane for reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LaneStatus {
    pub vm_index: usize,
    pub db_height: u32,
    pub latest_height: Option<u32>,
    pub pending: usize,
}

struct LaneState<M> {
    db_height: u32,
    /// Latest committed ack. `None` until height 0 is committed.
    latest_ack: Option<Ack>,
    /// Sorted by ack height, heights are unique.
    pending: VecDeque<MsgAckPair<M>>,
}

impl<M: MessageWithEntry> LaneState<M> {
    fn latest_height(&self) -> Option<u32> {
        self.latest_ack.as_ref().map(|ack| ack.height)
    }

    /// Height which can be committed next. `None` only if the height space is exhausted.
    fn next_height(&self) -> Option<u32> {
        match self.latest_height() {
            None => Some(0),
            Some(height) => height.checked_add(1),
        }
    }

    fn is_committed(&self, height: u32) -> bool {
        matches!(self.latest_height(), Some(latest) if height <= latest)
    }

    fn links(&self, pair: &MsgAckPair<M>) -> bool {
        pair.message_matches_ack()
            && matches!(pair.ack.verify_serial_hash(self.latest_ack.as_ref()), Ok(true))
    }

    /// Keeps the first pair delivered for a height. A later, different pair for the same height
    /// is rejected, unless the pending one is next in line and fails verification while the new
    /// one passes.
    ///
    /// Returns false if the pair is a redelivery of a pending pair.
    fn insert(
        &mut self,
        pair: MsgAckPair<M>,
        vm_index: usize,
        max_pending: Option<NonZeroUsize>,
    ) -> Result<bool> {
        let height = pair.height();
        match self.pending.binary_search_by_key(&height, |p| p.height()) {
            Ok(index) => {
                let existing = &self.pending[index];
                if existing.is_redelivery_of(&pair) {
                    log::trace!("Pair is already pending, ignoring: {pair}");
                    return Ok(false);
                }
                //A pair blocking the lane because of a bad ack or message can be corrected
                if self.next_height() == Some(height) && !self.links(existing) && self.links(&pair) {
                    log::info!("Replacing pending pair which failed verification: {pair}");
                    self.pending[index] = pair;
                    return Ok(true);
                }
                log::warn!("Different pair is already pending at height {height}, rejecting: {pair}");
                let (chain_id, height) = pair.key();
                Err(SequencerError::PendingHeightCollision { chain_id, height })
            }
            Err(index) => {
                if let Some(capacity) = max_pending {
                    //The next height is always accepted, otherwise a full lane could never drain
                    let full = self.pending.len() >= capacity.get();
                    if full && self.next_height() != Some(height) {
                        log::warn!("Pending queue of vm {vm_index} is full, rejecting: {pair}");
                        return Err(SequencerError::PendingQueueFull {
                            vm_index,
                            capacity: capacity.get(),
                        });
                    }
                }
                log::trace!("Inserting pair at index {index}: {pair}");
                self.pending.insert(index, pair);
                Ok(true)
            }
        }
    }

    fn drain<F>(&mut self, on_commit: &mut F) -> Result<Vec<MsgAckPair<M>>>
    where
        F: FnMut(&MsgAckPair<M>),
    {
        let mut committed = vec![];
        while let Some(head) = self.pending.front() {
            let height = head.height();
            if self.next_height() != Some(height) {
                log::trace!(
                    "Waiting for height {:?}, lowest pending is {height}",
                    self.next_height()
                );
                break;
            }

            if !head.message_matches_ack() {
                log::warn!("Message doesn't match its ack: {head}");
                return Err(SequencerError::MessageHashMismatch {
                    chain_id: head.chain_id(),
                    height,
                });
            }

            match head.ack.verify_serial_hash(self.latest_ack.as_ref()) {
                Ok(true) => {}
                Ok(false) => {
                    log::warn!("Ack doesn't continue the serial hash chain: {head}");
                    return Err(SequencerError::VerificationFailed {
                        chain_id: head.chain_id(),
                        height,
                    });
                }
                Err(err) => {
                    log::warn!("Ack verification failed: {head}: {err}");
                    return Err(SequencerError::InvalidAck {
                        chain_id: head.chain_id(),
                        height,
                        source: err,
                    });
                }
            }

            if let Some(pair) = self.pending.pop_front() {
                log::debug!("Committed: {pair}");
                self.latest_ack = Some(pair.ack.clone());
                on_commit(&pair);
                committed.push(pair);
            }
        }
        Ok(committed)
    }
}

/// VM sequencing the messages of the chains routed to it.
///
/// Pairs can be delivered in any order. They are committed strictly by ack height, starting from
/// 0, without gaps and only when the ack links to the previously committed one.
pub struct Lane<M> {
    vm_index: usize,
    max_pending: Option<NonZeroUsize>,
    state: RwLock<LaneState<M>>,
}

impl<M: MessageWithEntry> Lane<M> {
    pub fn new(vm_index: usize, db_height: u32, max_pending: Option<NonZeroUsize>) -> Self {
        Self {
            vm_index,
            max_pending,
            state: RwLock::new(LaneState {
                db_height,
                latest_ack: None,
                pending: VecDeque::new(),
            }),
        }
    }

    pub fn vm_index(&self) -> usize {
        self.vm_index
    }

    /// Adds the pair to the lane and returns all pairs which became committable, in commit order.
    pub fn process(&self, pair: MsgAckPair<M>) -> Result<Vec<MsgAckPair<M>>> {
        self.process_with(pair, |_| {})
    }

    /// Same as [Lane::process], `on_commit` is called for every committed pair while the lane is
    /// still locked.
    ///
    /// If verification fails after some pairs were committed in this call, those pairs stay
    /// committed and have been passed to `on_commit`, but the error is returned.
    pub fn process_with<F>(&self, pair: MsgAckPair<M>, mut on_commit: F) -> Result<Vec<MsgAckPair<M>>>
    where
        F: FnMut(&MsgAckPair<M>),
    {
        let mut state = self.state.write();

        if state.is_committed(pair.height()) {
            log::trace!("Pair is already committed, ignoring: {pair}");
            return Ok(vec![]);
        }

        if !state.insert(pair, self.vm_index, self.max_pending)? {
            return Ok(vec![]);
        }

        state.drain(&mut on_commit)
    }

    pub fn latest_height(&self) -> Option<u32> {
        self.state.read().latest_height()
    }

    pub fn latest_ack(&self) -> Option<Ack> {
        self.state.read().latest_ack.clone()
    }

    pub fn pending_len(&self) -> usize {
        self.state.read().pending.len()
    }

    pub fn pending_heights(&self) -> Vec<u32> {
        self.state.read().pending.iter().map(|p| p.height()).collect()
    }

    pub fn db_height(&self) -> u32 {
        self.state.read().db_height
    }

    pub fn set_db_height(&self, db_height: u32) {
        self.state.write().db_height = db_height;
    }

    pub fn status(&self) -> LaneStatus {
        let state = self.state.read();
        LaneStatus {
            vm_index: self.vm_index,
            db_height: state.db_height,
            latest_height: state.latest_height(),
            pending: state.pending.len(),
        }
    }
}

#[cfg(test)]
mod test {
    use assert_matches::assert_matches;

    use crate::block::types::EntryMessage;
    use crate::utilities::hash::ChainId;

    use super::*;

    fn chain() -> ChainId {
        ChainId::from_low_byte(0x42)
    }

    /// Pairs for heights `0..n` with a valid ack chain.
    fn pairs(n: usize) -> Vec<MsgAckPair<EntryMessage>> {
        let mut pairs: Vec<MsgAckPair<EntryMessage>> = Vec::with_capacity(n);
        for i in 0..n {
            let message = EntryMessage::new(chain(), vec![i as u8]);
            let ack = match pairs.last() {
                None => Ack::first(0, 0, message.message_hash()),
                Some(previous) => {
                    Ack::following(&previous.ack, message.message_hash()).unwrap()
                }
            };
            pairs.push(MsgAckPair::new(message, ack));
        }
        pairs
    }

    fn heights(pairs: &[MsgAckPair<EntryMessage>]) -> Vec<u32> {
        pairs.iter().map(|p| p.height()).collect()
    }

    fn lane() -> Lane<EntryMessage> {
        Lane::new(0, 0, None)
    }

    #[test]
    fn in_order_delivery_commits_immediately() {
        let lane = lane();
        for pair in pairs(3) {
            let height = pair.height();
            let committed = lane.process(pair).unwrap();
            assert_eq!(heights(&committed), vec![height]);
        }
        assert_eq!(lane.latest_height(), Some(2));
        assert_eq!(lane.pending_len(), 0);
    }

    #[test]
    fn waits_for_genesis() {
        let lane = lane();
        let pairs = pairs(2);

        let committed = lane.process(pairs[1].clone()).unwrap();

        assert!(committed.is_empty());
        assert_eq!(lane.latest_height(), None);
        assert_eq!(lane.latest_ack(), None);
        assert_eq!(lane.pending_heights(), vec![1]);
    }

    #[test]
    fn gap_blocks_until_missing_height_arrives() {
        let lane = lane();
        let pairs = pairs(3);

        assert_eq!(heights(&lane.process(pairs[0].clone()).unwrap()), vec![0]);
        assert!(lane.process(pairs[2].clone()).unwrap().is_empty());
        assert_eq!(lane.pending_heights(), vec![2]);

        assert_eq!(heights(&lane.process(pairs[1].clone()).unwrap()), vec![1, 2]);
        assert_eq!(lane.latest_height(), Some(2));
        assert_eq!(lane.pending_len(), 0);
    }

    #[test]
    fn arrival_order_two_zero_one() {
        let lane = lane();
        let pairs = pairs(3);

        assert!(lane.process(pairs[2].clone()).unwrap().is_empty());
        assert_eq!(heights(&lane.process(pairs[0].clone()).unwrap()), vec![0]);
        assert_eq!(heights(&lane.process(pairs[1].clone()).unwrap()), vec![1, 2]);
    }

    #[test]
    fn insertion_keeps_pending_sorted() {
        let lane = lane();
        let pairs = pairs(8);

        //Tail, head, middle and tail again
        for i in [5, 2, 3, 7, 1, 6] {
            assert!(lane.process(pairs[i].clone()).unwrap().is_empty());
        }
        assert_eq!(lane.pending_heights(), vec![1, 2, 3, 5, 6, 7]);

        let committed = lane.process(pairs[0].clone()).unwrap();
        assert_eq!(heights(&committed), vec![0, 1, 2, 3]);
        assert_eq!(lane.pending_heights(), vec![5, 6, 7]);

        let committed = lane.process(pairs[4].clone()).unwrap();
        assert_eq!(heights(&committed), vec![4, 5, 6, 7]);
    }

    #[test]
    fn stale_redelivery_is_ignored() {
        let lane = lane();
        let pairs = pairs(4);
        for pair in pairs.iter().take(2) {
            lane.process(pair.clone()).unwrap();
        }
        lane.process(pairs[3].clone()).unwrap();
        let latest_ack = lane.latest_ack();

        assert!(lane.process(pairs[0].clone()).unwrap().is_empty());
        assert!(lane.process(pairs[1].clone()).unwrap().is_empty());

        assert_eq!(lane.latest_height(), Some(1));
        assert_eq!(lane.latest_ack(), latest_ack);
        assert_eq!(lane.pending_heights(), vec![3]);
    }

    #[test]
    fn pending_redelivery_is_ignored() {
        let lane = lane();
        let pairs = pairs(3);

        lane.process(pairs[2].clone()).unwrap();
        let committed = lane.process(pairs[2].clone()).unwrap();

        assert!(committed.is_empty());
        assert_eq!(lane.pending_heights(), vec![2]);
    }

    #[test]
    fn different_pair_at_pending_height_is_rejected() {
        let lane = lane();
        let pairs = pairs(3);
        lane.process(pairs[2].clone()).unwrap();

        let message = EntryMessage::new(chain(), vec![0xee]);
        let mut conflicting = pairs[2].clone();
        conflicting.ack.message_hash = message.message_hash();
        conflicting.message = message;

        assert_matches!(
            lane.process(conflicting),
            Err(SequencerError::PendingHeightCollision { height: 2, .. })
        );

        //The first pair stays and still commits
        assert_eq!(lane.pending_heights(), vec![2]);
        lane.process(pairs[0].clone()).unwrap();
        let committed = lane.process(pairs[1].clone()).unwrap();
        assert_eq!(committed[1], pairs[2]);
    }

    #[test]
    fn broken_serial_hash_fails_fast() {
        let lane = lane();
        let pairs = pairs(3);
        lane.process(pairs[0].clone()).unwrap();
        let latest_ack = lane.latest_ack();

        let mut broken = pairs[1].clone();
        broken.ack.serial_hash = [0; 32];

        assert_matches!(
            lane.process(broken),
            Err(SequencerError::VerificationFailed { height: 1, .. })
        );
        assert_eq!(lane.latest_height(), Some(0));
        assert_eq!(lane.latest_ack(), latest_ack);
        assert_eq!(lane.pending_heights(), vec![1]);

        //Anything behind the broken ack waits as well
        assert!(lane.process(pairs[2].clone()).is_err());
        assert_eq!(lane.pending_heights(), vec![1, 2]);
        assert_eq!(lane.latest_height(), Some(0));
    }

    #[test]
    fn corrected_ack_replaces_failing_pending_pair() {
        let lane = lane();
        let pairs = pairs(3);
        lane.process(pairs[0].clone()).unwrap();
        lane.process(pairs[2].clone()).unwrap();

        let mut broken = pairs[1].clone();
        broken.ack.serial_hash = [0; 32];
        assert!(lane.process(broken).is_err());

        let committed = lane.process(pairs[1].clone()).unwrap();
        assert_eq!(heights(&committed), vec![1, 2]);
        assert_eq!(committed[0], pairs[1]);
        assert_eq!(lane.pending_len(), 0);
    }

    #[test]
    fn broken_ack_cannot_replace_valid_pending_pair() {
        let lane = lane();
        let pairs = pairs(3);
        lane.process(pairs[0].clone()).unwrap();
        lane.process(pairs[2].clone()).unwrap();

        let mut broken = pairs[2].clone();
        broken.ack.serial_hash = [0; 32];

        assert_matches!(
            lane.process(broken),
            Err(SequencerError::PendingHeightCollision { height: 2, .. })
        );
        let committed = lane.process(pairs[1].clone()).unwrap();
        assert_eq!(committed[1], pairs[2]);
    }

    #[test]
    fn structurally_invalid_ack_is_error() {
        let lane = lane();
        let pairs = pairs(2);
        lane.process(pairs[0].clone()).unwrap();

        let mut foreign = pairs[1].clone();
        foreign.ack.vm_index = 3;

        assert_matches!(
            lane.process(foreign),
            Err(SequencerError::InvalidAck { height: 1, .. })
        );
        assert_eq!(lane.latest_height(), Some(0));
        assert_eq!(lane.pending_len(), 1);
    }

    #[test]
    fn commits_before_failure_are_kept() {
        let lane = lane();
        let pairs = pairs(4);

        let mut broken = pairs[2].clone();
        broken.ack.serial_hash = [1; 32];
        lane.process(broken).unwrap();
        lane.process(pairs[1].clone()).unwrap();

        let mut seen = vec![];
        let result = lane.process_with(pairs[0].clone(), |pair| seen.push(pair.height()));

        assert_matches!(
            result,
            Err(SequencerError::VerificationFailed { height: 2, .. })
        );
        assert_eq!(seen, vec![0, 1]);
        assert_eq!(lane.latest_height(), Some(1));
        assert_eq!(lane.pending_heights(), vec![2]);
    }

    #[test]
    fn full_queue_rejects_all_but_next_height() {
        let lane: Lane<EntryMessage> = Lane::new(1, 0, NonZeroUsize::new(2));
        let pairs = pairs(5);

        lane.process(pairs[3].clone()).unwrap();
        lane.process(pairs[4].clone()).unwrap();

        assert_matches!(
            lane.process(pairs[2].clone()),
            Err(SequencerError::PendingQueueFull {
                vm_index: 1,
                capacity: 2
            })
        );
        assert_eq!(lane.pending_heights(), vec![3, 4]);

        let committed = lane.process(pairs[0].clone()).unwrap();
        assert_eq!(heights(&committed), vec![0]);

        lane.process(pairs[1].clone()).unwrap();
        let committed = lane.process(pairs[2].clone()).unwrap();
        assert_eq!(heights(&committed), vec![2, 3, 4]);
    }

    #[test]
    fn message_not_matching_ack_is_not_committed() {
        let lane = lane();
        let pairs = pairs(2);

        let mut forged = pairs[0].clone();
        forged.message.payload = vec![0xde, 0xad];

        assert_matches!(
            lane.process(forged),
            Err(SequencerError::MessageHashMismatch { height: 0, .. })
        );
        assert_eq!(lane.latest_height(), None);
        assert_eq!(lane.pending_heights(), vec![0]);

        //The real message takes over the height and the lane drains
        let committed = lane.process(pairs[0].clone()).unwrap();
        assert_eq!(committed, vec![pairs[0].clone()]);
        let committed = lane.process(pairs[1].clone()).unwrap();
        assert_eq!(heights(&committed), vec![1]);
    }

    #[test]
    fn other_message_with_pending_ack_is_a_collision() {
        let lane = lane();
        let pairs = pairs(3);
        lane.process(pairs[2].clone()).unwrap();

        let mut forged = pairs[2].clone();
        forged.message.payload = vec![0xde, 0xad];

        let err = lane.process(forged.clone()).unwrap_err();
        let (chain_id, height) = forged.key();
        assert_eq!(
            err,
            SequencerError::PendingHeightCollision { chain_id, height }
        );

        lane.process(pairs[0].clone()).unwrap();
        let committed = lane.process(pairs[1].clone()).unwrap();
        assert_eq!(committed[1], pairs[2]);
    }

    #[test]
    fn status_reports_lane_state() {
        let lane: Lane<EntryMessage> = Lane::new(2, 5, None);
        let pairs = pairs(3);
        lane.process(pairs[0].clone()).unwrap();
        lane.process(pairs[2].clone()).unwrap();
        lane.set_db_height(6);

        assert_eq!(
            lane.status(),
            LaneStatus {
                vm_index: 2,
                db_height: 6,
                latest_height: Some(0),
                pending: 1,
            }
        );
    }
}
