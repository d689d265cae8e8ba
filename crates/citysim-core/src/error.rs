//! Error type shared by the simulators and the engine.

use citysim_db::DbError;

use crate::clock::ClockError;

/// Errors raised by a simulator or the engine.
///
/// The engine treats every variant as non-fatal for a single subsystem: it
/// logs the error and moves on to the next subsystem in the tick.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    /// A repository call failed.
    #[error("store error: {source}")]
    Store {
        /// The underlying store error.
        #[from]
        source: DbError,
    },

    /// The clock could not be built or advanced.
    #[error("clock error: {source}")]
    Clock {
        /// The underlying clock error.
        #[from]
        source: ClockError,
    },

    /// An entity referenced by another one no longer exists.
    #[error("missing {entity} {id}")]
    MissingReference {
        /// Kind of entity, e.g. `building`.
        entity: &'static str,
        /// Identifier that failed to resolve.
        id: String,
    },
}

impl SimError {
    /// Build a [`SimError::MissingReference`].
    pub fn missing(entity: &'static str, id: impl ToString) -> Self {
        Self::MissingReference {
            entity,
            id: id.to_string(),
        }
    }
}
