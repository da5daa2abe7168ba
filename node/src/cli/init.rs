use clap::Parser;

use crate::config::{Configuration, SequencerConfiguration, DEFAULT_LEADER_COUNT};

#[derive(Debug, Clone, Parser)]
pub struct InitCmd {
    #[arg(long, default_value = "default")]
    pub node_name: String,
    #[clap(long, default_value_t = DEFAULT_LEADER_COUNT)]
    pub leader_count: usize,
    #[clap(long)]
    pub max_pending_pairs: Option<usize>,
}

impl InitCmd {
    pub fn execute(self) -> anyhow::Result<()> {
        if Configuration::try_load_from_home_dir(&self.node_name).is_ok() {
            anyhow::bail!("Configuration file already exists: {}", self.node_name);
        }

        let configuration = Configuration::new(SequencerConfiguration {
            leader_count: self.leader_count,
            max_pending_pairs: self.max_pending_pairs,
        });

        let path = configuration.try_write_home_dir(&self.node_name)?;
        println!("Created sequencer configuration in: {path:?}");
        Ok(())
    }
}
