//! Error types for the engine binary.
//!
//! [`EngineError`] is the top-level error type that wraps all possible
//! failure modes during startup and the scenario run.

/// Top-level error for the engine binary.
///
/// Each variant wraps a specific subsystem error, providing a single
/// error type that `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: loadgate_core::config::ConfigError,
    },

    /// The scenario file could not be read or is inconsistent.
    #[error("scenario error: {message}")]
    Scenario {
        /// Description of the scenario failure.
        message: String,
    },

    /// The scenario's quota table is invalid.
    #[error("quota error: {source}")]
    Quota {
        /// The underlying quota error.
        #[from]
        source: loadgate_core::quota::QuotaError,
    },

    /// The observer mirror rejected a replicated state.
    #[error("replication error: {source}")]
    Replication {
        /// The underlying replication error.
        #[from]
        source: loadgate_core::replication::ReplicationError,
    },

    /// The run summary could not be serialized.
    #[error("summary error: {message}")]
    Summary {
        /// Description of the serialization failure.
        message: String,
    },
}
