//! Error types for the data layer.
//!
//! All store operations return [`DbError`], which wraps the underlying
//! [`sqlx`] errors and adds the domain-level failures every store
//! implementation shares (conflicts, undecodable rows).

use citysim_types::UnknownVariant;

/// Errors that can occur in the data layer.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// A `PostgreSQL` operation failed.
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] sqlx::Error),

    /// A `PostgreSQL` migration failed.
    #[error("PostgreSQL migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization or deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A stored enum column held an unknown value.
    #[error("Decode error: {0}")]
    Decode(#[from] UnknownVariant),

    /// A stored numeric column was outside the domain range.
    #[error("Out of range: {column} = {value}")]
    OutOfRange {
        /// The column being decoded.
        column: &'static str,
        /// The raw stored value.
        value: i64,
    },

    /// A write would violate a uniqueness rule (one building per parcel,
    /// one road per parcel, unique parcel coordinates).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The city record does not exist.
    #[error("City not found")]
    CityNotFound,

    /// A configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}
