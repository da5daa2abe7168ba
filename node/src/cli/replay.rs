use std::path::PathBuf;

use clap::Parser;
use serde::Serialize;

use crate::block::lane::LaneStatus;
use crate::block::maker::BlockMaker;
use crate::block::processed::ProcessedEntries;
use crate::block::types::{EntryMessage, MsgAckPair};
use crate::cli::load_configuration;
use crate::utilities::encoding::decode;

/// Feeds recorded deliveries through a block maker and prints what got committed.
///
/// The input file is a json array of `{"message": {..}, "ack": {..}}` objects, in arrival order.
#[derive(Debug, Clone, Parser)]
pub struct ReplayCmd {
    #[clap(long)]
    pub config_file: Option<String>,
    #[arg(long, default_value = "default")]
    pub node_name: String,
    #[clap(short, long)]
    pub input: PathBuf,
}

#[derive(Debug, Serialize)]
struct ReplayReport {
    deliveries: usize,
    committed: usize,
    errors: Vec<String>,
    lanes: Vec<LaneStatus>,
    processed: ProcessedEntries<EntryMessage>,
}

impl ReplayCmd {
    pub fn execute(self) -> anyhow::Result<()> {
        let configuration = load_configuration(self.config_file.as_deref(), &self.node_name)?;

        let bytes = std::fs::read(&self.input)?;
        let deliveries: Vec<MsgAckPair<EntryMessage>> = decode(&bytes)?;
        log::info!("Replaying {} deliveries from {:?}", deliveries.len(), self.input);

        let block_maker = BlockMaker::from_config(&configuration.sequencer, configuration.chains);

        let mut committed = 0;
        let mut errors = vec![];
        let total = deliveries.len();
        for pair in deliveries {
            let key = pair.to_string();
            match block_maker.process_acked_message(pair.message, pair.ack) {
                Ok(pairs) => committed += pairs.len(),
                Err(err) => {
                    log::error!("Delivery {key} failed: {err}");
                    errors.push(format!("{key}: {err}"));
                }
            }
        }

        let report = ReplayReport {
            deliveries: total,
            committed,
            errors,
            lanes: block_maker.lane_statuses(),
            processed: block_maker.take_processed(),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        Ok(())
    }
}
