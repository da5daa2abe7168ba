use std::io::Write;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::block::classifier::ReservedChains;

pub const DEFAULT_LEADER_COUNT: usize = 1;
pub const CONFIG_FILE_NAME: &str = "sequencer.toml";
const ROOT_DIR_NAME: &str = ".sequencer";

#[derive(Error, Debug)]
pub enum ConfigurationError {
    #[error("ConfigDoesNotExist: '{0}'")]
    DoesNotExist(String),
    #[error("ParsingFailed: {0}")]
    ParsingFailed(#[from] config::ConfigError),
    #[error("TomlError: {0}")]
    TomlError(#[from] toml::ser::Error),
    #[error("IoError: {0}")]
    IoError(#[from] std::io::Error),
    #[error("InvalidConfiguration: {0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, ConfigurationError>;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Configuration {
    pub sequencer: SequencerConfiguration,
    /// Ids of the reserved chains. Defaults to the well known ones.
    #[serde(default)]
    pub chains: ReservedChains,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SequencerConfiguration {
    /// Number of VMs. It must not change while a node is running.
    pub leader_count: usize,
    /// Maximum number of pairs waiting in a VM for a missing height.
    /// Unbounded when missing or 0.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_pending_pairs: Option<usize>,
}

impl Default for SequencerConfiguration {
    fn default() -> Self {
        Self {
            leader_count: DEFAULT_LEADER_COUNT,
            max_pending_pairs: None,
        }
    }
}

impl Configuration {
    pub fn new(sequencer: SequencerConfiguration) -> Self {
        Self {
            sequencer,
            chains: ReservedChains::default(),
        }
    }

    pub fn try_load<I: Into<PathBuf>>(path: I) -> Result<Configuration> {
        let path = path.into();
        if !path.exists() {
            return Err(ConfigurationError::DoesNotExist(
                path.to_string_lossy().to_string(),
            ));
        }

        let config = config::Config::builder()
            .add_source(config::File::from(path))
            .build()?;

        let configuration: Configuration = config.try_deserialize()?;
        configuration.validate()?;
        Ok(configuration)
    }

    pub fn try_load_from_home_dir(node_name: &str) -> Result<Configuration> {
        let path = Self::config_file_path(node_name)?;
        Self::try_load(path)
    }

    pub fn try_write<I: Into<PathBuf>>(&self, path: I) -> Result<()> {
        self.validate()?;
        let config = toml::to_string(&self)?;

        let config = format!(
            "#This file is generated by cli and automatically overwritten every time when cli is run\n{config}",
        );

        let mut file = std::fs::File::create(path.into())?;
        file.write_all(config.as_bytes())?;

        Ok(())
    }

    pub fn try_write_home_dir(&self, node_name: &str) -> Result<PathBuf> {
        let path = Self::config_file_path(node_name)?;
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        self.try_write(path.clone())?;
        Ok(path)
    }

    pub fn sequencer_root_dir() -> Result<PathBuf> {
        dirs::home_dir()
            .map(|home| home.join(ROOT_DIR_NAME))
            .ok_or_else(|| ConfigurationError::Invalid("Could not find home directory".into()))
    }

    pub fn config_file_path(node_name: &str) -> Result<PathBuf> {
        Ok(Self::sequencer_root_dir()?
            .join(node_name)
            .join(CONFIG_FILE_NAME))
    }

    fn validate(&self) -> Result<()> {
        if self.sequencer.leader_count == 0 {
            return Err(ConfigurationError::Invalid(
                "leader_count must be at least 1".into(),
            ));
        }
        let chains = &self.chains;
        if chains.admin == chains.entry_credit
            || chains.admin == chains.factoid
            || chains.entry_credit == chains.factoid
        {
            return Err(ConfigurationError::Invalid(
                "reserved chain ids must be distinct".into(),
            ));
        }
        Ok(())
    }
}
