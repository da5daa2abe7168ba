use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::block::classifier::{ChainClassifier, ReservedChains};
use crate::block::lane::{Lane, LaneStatus};
use crate::block::processed::ProcessedEntries;
use crate::block::router::route;
use crate::block::types::{Ack, MessageWithEntry, MsgAckPair};
use crate::block::Result;
use crate::config::SequencerConfiguration;
use crate::utilities::hash::ChainId;

/// Routes acknowledged messages to their VMs and collects what the VMs commit.
///
/// It can be shared between threads, every VM makes progress independently of the others.
pub struct BlockMaker<M, C = ReservedChains> {
    number_of_leaders: usize,
    /// Capacity of each VM pending queue, unbounded if `None`
    max_pending: Option<NonZeroUsize>,
    vms: Mutex<HashMap<usize, Arc<Lane<M>>>>,
    processed: Mutex<ProcessedEntries<M>>,
    classifier: C,
    current_minute: AtomicUsize,
    db_height: AtomicU32,
}

impl<M: MessageWithEntry + Clone> BlockMaker<M, ReservedChains> {
    pub fn new(number_of_leaders: usize) -> Self {
        Self::with_classifier(number_of_leaders, ReservedChains::default())
    }
}

impl<M, C> BlockMaker<M, C>
where
    M: MessageWithEntry + Clone,
    C: ChainClassifier,
{
    pub fn with_classifier(number_of_leaders: usize, classifier: C) -> Self {
        Self {
            number_of_leaders: number_of_leaders.max(1),
            max_pending: None,
            vms: Mutex::new(HashMap::new()),
            processed: Mutex::new(ProcessedEntries::new()),
            classifier,
            current_minute: AtomicUsize::new(0),
            db_height: AtomicU32::new(0),
        }
    }

    pub fn from_config(config: &SequencerConfiguration, classifier: C) -> Self {
        let mut block_maker = Self::with_classifier(config.leader_count, classifier);
        block_maker.max_pending = config.max_pending_pairs.and_then(NonZeroUsize::new);
        block_maker
    }

    pub fn number_of_leaders(&self) -> usize {
        self.number_of_leaders
    }

    /// Returns the VM of the chain, creating it on first use.
    pub fn get_vm(&self, chain_id: &ChainId) -> Arc<Lane<M>> {
        let index = route(chain_id, self.number_of_leaders);

        let mut vms = self.vms.lock();
        vms.entry(index)
            .or_insert_with(|| {
                log::debug!("Creating vm {index}");
                Arc::new(Lane::new(
                    index,
                    self.db_height.load(Ordering::Acquire),
                    self.max_pending,
                ))
            })
            .clone()
    }

    /// Hands the pair over to the VM of the message chain.
    ///
    /// Everything the VM commits because of it is added to the processed entries and returned.
    pub fn process_acked_message(&self, message: M, ack: Ack) -> Result<Vec<MsgAckPair<M>>> {
        let chain_id = message.entry_chain_id();
        let vm = self.get_vm(&chain_id);

        vm.process_with(MsgAckPair::new(message, ack), |committed| {
            let category = self.classifier.classify(&committed.chain_id());
            self.processed
                .lock()
                .push(category, committed.message.clone());
        })
    }

    pub fn set_current_minute(&self, minute: usize) {
        self.current_minute.store(minute, Ordering::Release);
    }

    pub fn current_minute(&self) -> usize {
        self.current_minute.load(Ordering::Acquire)
    }

    /// Directory block height for new VMs and all existing ones.
    pub fn set_db_height(&self, db_height: u32) {
        self.db_height.store(db_height, Ordering::Release);
        for vm in self.vms_snapshot() {
            vm.set_db_height(db_height);
        }
    }

    pub fn db_height(&self) -> u32 {
        self.db_height.load(Ordering::Acquire)
    }

    /// Takes all processed entries, leaving empty collections behind.
    pub fn take_processed(&self) -> ProcessedEntries<M> {
        std::mem::take(&mut *self.processed.lock())
    }

    pub fn processed(&self) -> ProcessedEntries<M> {
        self.processed.lock().clone()
    }

    /// Status of every VM created so far, ordered by VM index.
    pub fn lane_statuses(&self) -> Vec<LaneStatus> {
        let mut statuses = self
            .vms_snapshot()
            .iter()
            .map(|vm| vm.status())
            .collect::<Vec<_>>();
        statuses.sort_by_key(|status| status.vm_index);
        statuses
    }

    //Lanes are accessed after the map lock is released
    fn vms_snapshot(&self) -> Vec<Arc<Lane<M>>> {
        self.vms.lock().values().cloned().collect()
    }
}
