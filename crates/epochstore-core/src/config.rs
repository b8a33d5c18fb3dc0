//! Configuration loading and typed config structures.
//!
//! The configuration lives in `epochstore-config.yaml`. This module defines
//! strongly-typed structs that mirror the YAML structure, and provides a
//! loader that reads and validates the file.

use std::path::Path;

use serde::Deserialize;

use epochstore_types::{Height, Params};

use crate::params::GENESIS_HEIGHT;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// The configuration parsed but is not usable.
    #[error("invalid configuration: {reason}")]
    Invalid {
        /// Explanation of what is wrong with the configuration.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct EpochStoreConfig {
    /// Parameter values fixated at genesis.
    #[serde(default)]
    pub genesis: GenesisConfig,

    /// Block replay settings.
    #[serde(default)]
    pub replay: ReplayConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl EpochStoreConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// `EPOCHSTORE_LOG_LEVEL` overrides `logging.level`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, or
    /// [`ConfigError::Invalid`] if validation fails.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML, or
    /// [`ConfigError::Invalid`] if validation fails.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = serde_yml::from_str(yaml)?;
        config.logging.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Check the configuration for values the store would reject.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.genesis.epoch_blocks == 0 {
            return Err(ConfigError::Invalid {
                reason: "genesis.epoch_blocks must be at least 1".to_owned(),
            });
        }

        let mut previous: Option<Height> = None;
        for change in &self.replay.param_changes {
            if change.height == GENESIS_HEIGHT {
                return Err(ConfigError::Invalid {
                    reason: "param changes at the genesis height belong in `genesis`".to_owned(),
                });
            }
            if previous.is_some_and(|p| p >= change.height) {
                return Err(ConfigError::Invalid {
                    reason: format!(
                        "param change heights must be strictly increasing (found {} after {})",
                        change.height,
                        previous.unwrap_or_default()
                    ),
                });
            }
            if change.epoch_blocks == Some(0) {
                return Err(ConfigError::Invalid {
                    reason: format!("param change at {} sets epoch_blocks to 0", change.height),
                });
            }
            previous = Some(change.height);
        }
        Ok(())
    }
}

/// Parameter values fixated at genesis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct GenesisConfig {
    /// Epoch length in blocks.
    #[serde(default = "default_epoch_blocks")]
    pub epoch_blocks: u64,

    /// Epochs of history to keep.
    #[serde(default = "default_epochs_to_save")]
    pub epochs_to_save: u64,

    /// Unstake hold period in blocks.
    #[serde(default = "default_unstake_hold_blocks")]
    pub unstake_hold_blocks: u64,
}

impl GenesisConfig {
    /// The genesis values as a [`Params`].
    pub const fn to_params(&self) -> Params {
        Params {
            epoch_blocks: self.epoch_blocks,
            epochs_to_save: self.epochs_to_save,
            unstake_hold_blocks: self.unstake_hold_blocks,
            latest_param_change: GENESIS_HEIGHT,
        }
    }
}

impl Default for GenesisConfig {
    fn default() -> Self {
        Self {
            epoch_blocks: default_epoch_blocks(),
            epochs_to_save: default_epochs_to_save(),
            unstake_hold_blocks: default_unstake_hold_blocks(),
        }
    }
}

/// Block replay settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReplayConfig {
    /// Number of blocks to execute after genesis.
    #[serde(default = "default_replay_blocks")]
    pub blocks: u64,

    /// Whether to prune fixations below the retention horizon at each
    /// epoch start.
    #[serde(default = "default_true")]
    pub prune: bool,

    /// Scheduled parameter changes, strictly increasing by height.
    #[serde(default)]
    pub param_changes: Vec<ParamChange>,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            blocks: default_replay_blocks(),
            prune: true,
            param_changes: Vec::new(),
        }
    }
}

/// A parameter change scheduled for a height. Unset fields keep their
/// current value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ParamChange {
    /// Height at which the change takes effect.
    pub height: Height,

    /// New epoch length.
    #[serde(default)]
    pub epoch_blocks: Option<u64>,

    /// New epochs-to-save.
    #[serde(default)]
    pub epochs_to_save: Option<u64>,

    /// New unstake hold period.
    #[serde(default)]
    pub unstake_hold_blocks: Option<u64>,
}

impl ParamChange {
    /// `current` with this change's fields applied.
    pub fn apply_to(&self, current: &Params) -> Params {
        Params {
            epoch_blocks: self.epoch_blocks.unwrap_or(current.epoch_blocks),
            epochs_to_save: self.epochs_to_save.unwrap_or(current.epochs_to_save),
            unstake_hold_blocks: self
                .unstake_hold_blocks
                .unwrap_or(current.unstake_hold_blocks),
            latest_param_change: current.latest_param_change,
        }
    }
}

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable output.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

impl LoggingConfig {
    /// Apply environment variable overrides.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("EPOCHSTORE_LOG_LEVEL") {
            self.level = val;
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::Pretty,
        }
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

const fn default_epoch_blocks() -> u64 {
    20
}

const fn default_epochs_to_save() -> u64 {
    25
}

const fn default_unstake_hold_blocks() -> u64 {
    210
}

const fn default_replay_blocks() -> u64 {
    200
}

const fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_owned()
}
