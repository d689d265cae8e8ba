//! Shared type definitions for the city simulation.
//!
//! This crate is the single source of truth for the entities, identifiers,
//! and events exchanged between the data layer, the simulators, and the
//! engine binary.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrappers for all entity identifiers
//! - [`enums`] -- Enumeration types (terrain, zoning, buildings, crime)
//! - [`structs`] -- Entity records (city, parcels, buildings, residents, crimes)
//! - [`events`] -- Engine and domain events published each tick

pub mod enums;
pub mod events;
pub mod ids;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::{
    BuildingType, CrimeStatus, CrimeType, DemandCategory, OfficerStatus, RoadDirection, Terrain,
    UnknownVariant, Zoning,
};
pub use events::{
    BuildingCompletedDetails, CrimeReportedDetails, CrimeResolvedDetails, DomainEvent,
    EngineEvent, LandValueUpdatedDetails, LifecycleEvent, OfficersSpawnedDetails,
    PayrollProcessedDetails, ResidentEmployedDetails, ResidentSpawnedDetails,
    ResidentsDisplacedDetails, TickEvent, TimeEvent, ZoneBuildDetails, ZoneEvolvedDetails,
};
pub use ids::{BuildingId, CityId, CrimeId, OfficerId, OwnerId, ParcelId, ResidentId, RoadId};
pub use structs::{
    ActivityEntry, Building, City, CityTime, Crime, DemandSignals, LandValueUpdate, Parcel,
    PoliceOfficer, PopulationStats, Position, Resident, Road, Wallet, CONSTRUCTION_COMPLETE,
    LAND_VALUE_DEFAULT, LAND_VALUE_MAX, LAND_VALUE_MIN,
};
