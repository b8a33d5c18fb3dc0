//! Replay binary for the epoch store.
//!
//! Wires the fixation store, params keeper, and epoch calculator into a
//! deterministic block replay driven by configuration.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `epochstore-config.yaml`
//! 2. Initialize structured logging (tracing)
//! 3. Create the fixation store and seed genesis parameters
//! 4. Create the block clock at genesis
//! 5. Run the replay loop
//! 6. Log the result

mod error;
mod summary_callback;

use std::path::{Path, PathBuf};

use epochstore_core::clock::BlockClock;
use epochstore_core::config::{EpochStoreConfig, LogFormat, LoggingConfig};
use epochstore_core::epoch::EpochCalculator;
use epochstore_core::params;
use epochstore_core::replay;
use epochstore_fixation::FixationStore;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::ReplayAppError;
use crate::summary_callback::SummaryCallback;

/// Default configuration file, relative to the working directory.
const DEFAULT_CONFIG_PATH: &str = "epochstore-config.yaml";

/// Application entry point for the replay binary.
///
/// # Errors
///
/// Returns an error if configuration, genesis seeding, or the replay fails.
fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration. Logging is not up yet, so remember whether the
    //    file was found and report it afterwards.
    let config_path = config_path();
    let (config, found) = load_config(&config_path)?;

    // 2. Initialize structured logging.
    init_logging(&config.logging)?;
    info!("epochstore-replay starting");
    if found {
        info!(path = %config_path.display(), "Configuration loaded");
    } else {
        info!(path = %config_path.display(), "Config file not found, using defaults");
    }
    info!(
        epoch_blocks = config.genesis.epoch_blocks,
        epochs_to_save = config.genesis.epochs_to_save,
        unstake_hold_blocks = config.genesis.unstake_hold_blocks,
        blocks = config.replay.blocks,
        scheduled_changes = config.replay.param_changes.len(),
        "Replay configuration"
    );

    // 3. Create the store and fixate genesis parameters.
    let store = FixationStore::in_memory();
    params::seed_genesis(&store, &config.genesis.to_params()).map_err(ReplayAppError::from)?;

    // 4. Block clock at genesis.
    let mut clock = BlockClock::new();

    // 5. Replay.
    let mut callback = SummaryCallback::new();
    let result = replay::run_replay(&store, &mut clock, &config.replay, &mut callback)
        .map_err(ReplayAppError::from)?;

    // 6. Log results.
    callback.log_summary();
    let final_params = params::get_params(&store).map_err(ReplayAppError::from)?;
    info!(
        epoch_blocks = final_params.epoch_blocks,
        epochs_to_save = final_params.epochs_to_save,
        unstake_hold_blocks = final_params.unstake_hold_blocks,
        latest_param_change = final_params.latest_param_change,
        "Final parameters"
    );

    let calc = EpochCalculator::new(&store);
    match calc.geometry(clock.height()) {
        Ok(geometry) => info!(
            height = geometry.height,
            epoch_start = geometry.epoch_start,
            block_in_epoch = geometry.block_in_epoch,
            next_epoch_start = geometry.next_epoch_start,
            "Epoch at stop height"
        ),
        Err(e) => warn!(height = clock.height(), error = %e, "Epoch at stop height unavailable"),
    }

    info!(
        blocks_executed = result.blocks_executed,
        epoch_starts = result.epoch_starts.len(),
        param_changes_applied = result.param_changes_applied,
        records_pruned = result.records_pruned,
        fixation_records = store.record_count(),
        "epochstore-replay shutdown complete"
    );

    Ok(())
}

/// Config path from `EPOCHSTORE_CONFIG`, then the first argument, then
/// [`DEFAULT_CONFIG_PATH`].
fn config_path() -> PathBuf {
    std::env::var_os("EPOCHSTORE_CONFIG")
        .or_else(|| std::env::args_os().nth(1))
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from)
}

/// Load the configuration, falling back to defaults when the file is absent.
///
/// Returns the config and whether the file existed.
fn load_config(path: &Path) -> Result<(EpochStoreConfig, bool), ReplayAppError> {
    if path.exists() {
        Ok((EpochStoreConfig::from_file(path)?, true))
    } else {
        let mut config = EpochStoreConfig::default();
        config.logging.apply_env_overrides();
        Ok((config, false))
    }
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over the configured level.
fn init_logging(logging: &LoggingConfig) -> Result<(), ReplayAppError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.level))
        .map_err(|e| ReplayAppError::Logging {
            message: format!("invalid log level {:?}: {e}", logging.level),
        })?;

    let installed = match logging.format {
        LogFormat::Pretty => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .try_init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .try_init(),
    };
    installed.map_err(|e| ReplayAppError::Logging {
        message: format!("{e}"),
    })
}
