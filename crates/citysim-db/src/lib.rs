//! Data layer for the city simulation.
//!
//! The simulators never touch a database directly. They depend on the
//! repository traits in [`repository`], bundled as [`CityStore`], and this
//! crate provides two implementations of that contract.
//!
//! # Architecture
//!
//! ```text
//! SimulationEngine<S: CityStore>
//!     |
//!     +-- InMemoryStore  (tests, database-less runs)
//!     |
//!     +-- PgStore -------> PostgreSQL (connect_pool, migrations/)
//! ```
//!
//! # Modules
//!
//! - [`repository`] -- Per-entity repository traits and the [`CityStore`] bundle
//! - [`memory`] -- In-process store behind a Tokio `RwLock`
//! - [`postgres`] -- `PostgreSQL` pool setup and migrations
//! - [`pg_store`] -- `PostgreSQL` implementation of the repository traits
//! - [`error`] -- Shared error types

pub mod error;
pub mod memory;
pub mod pg_store;
pub mod postgres;
pub mod repository;

// Re-export primary types for convenience.
pub use error::DbError;
pub use memory::InMemoryStore;
pub use pg_store::PgStore;
pub use postgres::connect_pool;
pub use repository::{
    ActivityRepository, BuildingRepository, CityRepository, CityStore, CrimeRepository,
    OfficerRepository, ParcelRepository, ResidentRepository, RoadRepository, WalletRepository,
};
