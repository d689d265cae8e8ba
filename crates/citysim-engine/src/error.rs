//! Error types for the engine binary.
//!
//! [`EngineError`] wraps every failure mode of startup and shutdown so
//! `main` can propagate with `?`.

/// Top-level error for the engine binary.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: citysim_core::config::ConfigError,
    },

    /// Connecting to or preparing the store failed.
    #[error("store error: {source}")]
    Store {
        /// The underlying store error.
        #[from]
        source: citysim_db::DbError,
    },

    /// Seeding the city or building the engine failed.
    #[error("simulation error: {source}")]
    Sim {
        /// The underlying simulation error.
        #[from]
        source: citysim_core::SimError,
    },

    /// Installing the shutdown signal handler failed.
    #[error("signal error: {source}")]
    Signal {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },
}
