//! Error types for the replay binary.
//!
//! [`ReplayAppError`] is the top-level error type that wraps all possible
//! failure modes during startup and replay.

/// Top-level error for the replay binary.
///
/// Each variant wraps a specific subsystem error, providing a single
/// error type that `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum ReplayAppError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: epochstore_core::config::ConfigError,
    },

    /// Genesis parameters could not be fixated.
    #[error("genesis error: {source}")]
    Genesis {
        /// The underlying params error.
        #[from]
        source: epochstore_core::params::ParamsError,
    },

    /// The replay loop failed.
    #[error("replay error: {source}")]
    Replay {
        /// The underlying replay error.
        #[from]
        source: epochstore_core::replay::ReplayError,
    },

    /// The log subscriber could not be installed.
    #[error("logging error: {message}")]
    Logging {
        /// Description of the logging failure.
        message: String,
    },
}
