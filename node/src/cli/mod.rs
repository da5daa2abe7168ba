use std::path::PathBuf;

use clap::Parser;

use crate::config::Configuration;

pub mod init;
pub mod replay;
pub mod simulate;

#[derive(Parser, Debug, Clone)]
#[command()]
pub struct Cli {
    #[command(subcommand)]
    pub subcommand: Subcommand,
}

#[derive(Clone, Debug, clap::Subcommand)]
pub enum Subcommand {
    Init(init::InitCmd),
    Replay(replay::ReplayCmd),
    Simulate(simulate::SimulateCmd),
}

impl Cli {
    pub async fn execute(self) -> anyhow::Result<()> {
        match self.subcommand {
            Subcommand::Init(cmd) => cmd.execute(),
            Subcommand::Replay(cmd) => cmd.execute(),
            Subcommand::Simulate(cmd) => cmd.execute().await,
        }
    }
}

/// Loads the configuration from the given file, or from the home directory of the node.
pub(crate) fn load_configuration(
    config_file: Option<&str>,
    node_name: &str,
) -> anyhow::Result<Configuration> {
    let result = match config_file {
        Some(path) => Configuration::try_load(PathBuf::from(path)),
        None => Configuration::try_load_from_home_dir(node_name),
    };
    match result {
        Ok(configuration) => Ok(configuration),
        Err(err) => anyhow::bail!("Error loading configuration file: {err}"),
    }
}
