use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use clap::Parser;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

use crate::block::lane::LaneStatus;
use crate::block::leader::Leader;
use crate::block::maker::BlockMaker;
use crate::block::types::{EntryMessage, MsgAckPair};
use crate::cli::load_configuration;
use crate::config::{Configuration, SequencerConfiguration};
use crate::logging::pretty_json;
use crate::utilities::hash::ChainId;

const MINUTES_PER_BLOCK: usize = 10;

/// Acknowledges random messages, delivers them shuffled and partly twice from concurrent tasks,
/// then checks that every VM committed everything.
#[derive(Debug, Clone, Parser)]
pub struct SimulateCmd {
    /// Uses the default configuration with `--leader-count` when not given
    #[clap(long)]
    pub config_file: Option<String>,
    #[clap(long, default_value_t = 3)]
    pub leader_count: usize,
    #[clap(long, default_value_t = 8)]
    pub chains: usize,
    /// Messages per chain
    #[clap(long, default_value_t = 100)]
    pub messages: usize,
    /// Also send messages to the reserved chains
    #[clap(long)]
    pub reserved_chains: bool,
    #[clap(long, default_value_t = 4)]
    pub tasks: usize,
    /// Probability of delivering a pair a second time
    #[clap(long, default_value_t = 0.1)]
    pub redelivery: f64,
    #[clap(long)]
    pub seed: Option<u64>,
}

#[derive(Debug, Serialize)]
struct SimulationReport {
    seed: u64,
    acknowledged: usize,
    deliveries: usize,
    committed: usize,
    errors: usize,
    admin_entries: usize,
    transactions: usize,
    entry_block_entries: usize,
    entry_credit_entries: usize,
    lanes: Vec<LaneStatus>,
}

impl SimulateCmd {
    pub async fn execute(self) -> anyhow::Result<()> {
        let configuration = match &self.config_file {
            Some(path) => load_configuration(Some(path.as_str()), "")?,
            None => Configuration::new(SequencerConfiguration {
                leader_count: self.leader_count,
                max_pending_pairs: None,
            }),
        };

        let seed = self.seed.unwrap_or_else(rand::random);
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        log::info!("Simulating with seed {seed}");

        let mut chain_ids = (0..self.chains)
            .map(|_| ChainId::new(rng.gen()))
            .collect::<Vec<_>>();
        if self.reserved_chains {
            chain_ids.push(configuration.chains.admin);
            chain_ids.push(configuration.chains.entry_credit);
            chain_ids.push(configuration.chains.factoid);
        }

        let mut leader = Leader::new(configuration.sequencer.leader_count, 0);
        let mut messages = Vec::with_capacity(chain_ids.len() * self.messages);
        for round in 0..self.messages {
            for chain_id in &chain_ids {
                let mut payload = (round as u64).to_be_bytes().to_vec();
                payload.extend_from_slice(&rng.gen::<[u8; 8]>());
                messages.push(EntryMessage::new(*chain_id, payload));
            }
        }
        let pairs = leader.acknowledge_all(messages)?;
        let acknowledged = pairs.len();

        let mut deliveries = pairs.clone();
        for pair in &pairs {
            if rng.gen_bool(self.redelivery.clamp(0.0, 1.0)) {
                deliveries.push(pair.clone());
            }
        }
        deliveries.shuffle(&mut rng);
        let total_deliveries = deliveries.len();

        let block_maker: Arc<BlockMaker<EntryMessage>> = Arc::new(BlockMaker::from_config(
            &configuration.sequencer,
            configuration.chains.clone(),
        ));
        let committed = Arc::new(AtomicUsize::new(0));
        let errors = Arc::new(AtomicUsize::new(0));

        let minute_size = (total_deliveries / MINUTES_PER_BLOCK).max(1);
        for (minute, minute_deliveries) in deliveries.chunks(minute_size).enumerate() {
            block_maker.set_current_minute(minute.min(MINUTES_PER_BLOCK - 1));
            self.deliver(
                minute_deliveries,
                block_maker.clone(),
                committed.clone(),
                errors.clone(),
            )
            .await?;
        }

        let lanes = block_maker.lane_statuses();
        log::debug!("Lanes after simulation: {}", pretty_json(&lanes));
        let processed = block_maker.take_processed();

        let report = SimulationReport {
            seed,
            acknowledged,
            deliveries: total_deliveries,
            committed: committed.load(Ordering::Acquire),
            errors: errors.load(Ordering::Acquire),
            admin_entries: processed.admin_entries.len(),
            transactions: processed.transactions.len(),
            entry_block_entries: processed.entry_block_entries.len(),
            entry_credit_entries: processed.entry_credit_entries.len(),
            lanes,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);

        if report.committed != acknowledged || processed.len() != acknowledged {
            anyhow::bail!(
                "Committed {} of {acknowledged} acknowledged messages",
                report.committed
            );
        }
        Ok(())
    }

    async fn deliver(
        &self,
        deliveries: &[MsgAckPair<EntryMessage>],
        block_maker: Arc<BlockMaker<EntryMessage>>,
        committed: Arc<AtomicUsize>,
        errors: Arc<AtomicUsize>,
    ) -> anyhow::Result<()> {
        let chunk_size = (deliveries.len() / self.tasks.max(1)).max(1);
        let tasks = deliveries
            .chunks(chunk_size)
            .map(|chunk| {
                let chunk = chunk.to_vec();
                let block_maker = block_maker.clone();
                let committed = committed.clone();
                let errors = errors.clone();
                tokio::spawn(async move {
                    for pair in chunk {
                        match block_maker.process_acked_message(pair.message, pair.ack) {
                            Ok(pairs) => {
                                committed.fetch_add(pairs.len(), Ordering::AcqRel);
                            }
                            Err(err) => {
                                log::error!("Delivery failed: {err}");
                                errors.fetch_add(1, Ordering::AcqRel);
                            }
                        }
                    }
                })
            })
            .collect::<Vec<_>>();

        for result in futures::future::join_all(tasks).await {
            result?;
        }
        Ok(())
    }
}
