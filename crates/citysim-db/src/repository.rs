//! Repository contract consumed by the simulators.
//!
//! Each trait covers one entity. Every store (in-memory, `PostgreSQL`)
//! implements all of them, and the simulators only ever see the
//! [`CityStore`] bound, so the storage technology is substitutable.
//!
//! Methods return `Send` futures so the engine's tick loop can run on a
//! spawned Tokio task. Listing methods that feed order-sensitive passes
//! (residents, crimes, officers, buildings) return rows in creation order.

use citysim_types::{
    ActivityEntry, Building, BuildingId, City, CityTime, Crime, CrimeId, CrimeStatus,
    LandValueUpdate, OfficerId, OwnerId, Parcel, ParcelId, PoliceOfficer, Resident, ResidentId,
    Road, RoadId,
};
use rust_decimal::Decimal;

use crate::error::DbError;

/// Access to the single city record.
pub trait CityRepository {
    /// Load the city record.
    fn load_city(&self) -> impl Future<Output = Result<City, DbError>> + Send;

    /// Persist the clock-derived time fields.
    fn update_city_time(&self, time: &CityTime) -> impl Future<Output = Result<(), DbError>> + Send;
}

/// Access to parcels.
pub trait ParcelRepository {
    /// All parcels.
    fn list_parcels(&self) -> impl Future<Output = Result<Vec<Parcel>, DbError>> + Send;

    /// Look up a parcel by ID.
    fn get_parcel(
        &self,
        id: ParcelId,
    ) -> impl Future<Output = Result<Option<Parcel>, DbError>> + Send;

    /// Look up a parcel by coordinates.
    fn get_parcel_at(
        &self,
        x: i32,
        y: i32,
    ) -> impl Future<Output = Result<Option<Parcel>, DbError>> + Send;

    /// Return the parcel at the coordinates, creating a default one if none
    /// exists yet.
    fn get_or_create_parcel(
        &self,
        x: i32,
        y: i32,
    ) -> impl Future<Output = Result<Parcel, DbError>> + Send;

    /// Insert or replace a parcel (terrain, zoning, owner, land value).
    ///
    /// Fails with [`DbError::Conflict`] if another parcel already holds the
    /// coordinates.
    fn save_parcel(&self, parcel: &Parcel) -> impl Future<Output = Result<(), DbError>> + Send;

    /// Batch-write land values. Returns the number of rows touched.
    fn update_land_values(
        &self,
        updates: &[LandValueUpdate],
    ) -> impl Future<Output = Result<u64, DbError>> + Send;
}

/// Access to buildings.
pub trait BuildingRepository {
    /// All buildings in creation order.
    fn list_buildings(&self) -> impl Future<Output = Result<Vec<Building>, DbError>> + Send;

    /// Look up a building by ID.
    fn get_building(
        &self,
        id: BuildingId,
    ) -> impl Future<Output = Result<Option<Building>, DbError>> + Send;

    /// The building standing on a parcel, if any.
    fn get_building_on_parcel(
        &self,
        parcel_id: ParcelId,
    ) -> impl Future<Output = Result<Option<Building>, DbError>> + Send;

    /// Insert a building. Fails with [`DbError::Conflict`] if the parcel is
    /// already occupied.
    fn create_building(
        &self,
        building: &Building,
    ) -> impl Future<Output = Result<(), DbError>> + Send;

    /// Set density and floors. Returns `false` if the building is gone.
    fn update_building_density(
        &self,
        id: BuildingId,
        density: u8,
        floors: u32,
    ) -> impl Future<Output = Result<bool, DbError>> + Send;

    /// Set construction progress. Returns `false` if the building is gone.
    fn update_construction_progress(
        &self,
        id: BuildingId,
        progress: u8,
    ) -> impl Future<Output = Result<bool, DbError>> + Send;

    /// Set `powered` on every building of the city. Returns how many
    /// buildings changed.
    fn set_powered(&self, powered: bool) -> impl Future<Output = Result<u64, DbError>> + Send;

    /// Remove a building. Returns `false` if it did not exist.
    fn delete_building(&self, id: BuildingId)
    -> impl Future<Output = Result<bool, DbError>> + Send;
}

/// Access to roads.
pub trait RoadRepository {
    /// All roads.
    fn list_roads(&self) -> impl Future<Output = Result<Vec<Road>, DbError>> + Send;

    /// Insert a road. Fails with [`DbError::Conflict`] if the parcel already
    /// has one.
    fn create_road(&self, road: &Road) -> impl Future<Output = Result<(), DbError>> + Send;

    /// Remove a road. Returns `false` if it did not exist.
    fn delete_road(&self, id: RoadId) -> impl Future<Output = Result<bool, DbError>> + Send;
}

/// Access to residents.
pub trait ResidentRepository {
    /// All residents in creation order.
    fn list_residents(&self) -> impl Future<Output = Result<Vec<Resident>, DbError>> + Send;

    /// Residents whose home is the building.
    fn list_residents_by_home(
        &self,
        building_id: BuildingId,
    ) -> impl Future<Output = Result<Vec<Resident>, DbError>> + Send;

    /// Residents employed at the building.
    fn list_residents_by_work(
        &self,
        building_id: BuildingId,
    ) -> impl Future<Output = Result<Vec<Resident>, DbError>> + Send;

    /// Insert residents, preserving slice order as creation order.
    fn create_residents(
        &self,
        residents: &[Resident],
    ) -> impl Future<Output = Result<(), DbError>> + Send;

    /// Set a resident's workplace and salary. Returns `false` if the
    /// resident is gone.
    fn update_employment(
        &self,
        id: ResidentId,
        work_building_id: Option<BuildingId>,
        salary: Decimal,
    ) -> impl Future<Output = Result<bool, DbError>> + Send;

    /// Delete every resident whose home is the building. Returns the count.
    fn delete_residents_by_home(
        &self,
        building_id: BuildingId,
    ) -> impl Future<Output = Result<u64, DbError>> + Send;

    /// Unemploy every resident working at the building. Returns the count.
    fn clear_work_for_building(
        &self,
        building_id: BuildingId,
    ) -> impl Future<Output = Result<u64, DbError>> + Send;
}

/// Access to crimes.
pub trait CrimeRepository {
    /// Crimes in a given state, in creation order.
    fn list_crimes_by_status(
        &self,
        status: CrimeStatus,
    ) -> impl Future<Output = Result<Vec<Crime>, DbError>> + Send;

    /// Look up a crime by ID.
    fn get_crime(&self, id: CrimeId)
    -> impl Future<Output = Result<Option<Crime>, DbError>> + Send;

    /// Insert a crime.
    fn create_crime(&self, crime: &Crime) -> impl Future<Output = Result<(), DbError>> + Send;

    /// Replace a crime's mutable fields. Returns `false` if it is gone.
    fn update_crime(&self, crime: &Crime) -> impl Future<Output = Result<bool, DbError>> + Send;
}

/// Access to police officers.
pub trait OfficerRepository {
    /// All officers in creation order.
    fn list_officers(&self) -> impl Future<Output = Result<Vec<PoliceOfficer>, DbError>> + Send;

    /// Officers attached to a station.
    fn list_officers_by_station(
        &self,
        station_id: BuildingId,
    ) -> impl Future<Output = Result<Vec<PoliceOfficer>, DbError>> + Send;

    /// Look up an officer by ID.
    fn get_officer(
        &self,
        id: OfficerId,
    ) -> impl Future<Output = Result<Option<PoliceOfficer>, DbError>> + Send;

    /// Insert an officer.
    fn create_officer(
        &self,
        officer: &PoliceOfficer,
    ) -> impl Future<Output = Result<(), DbError>> + Send;

    /// Replace an officer's mutable fields. Returns `false` if it is gone.
    fn update_officer(
        &self,
        officer: &PoliceOfficer,
    ) -> impl Future<Output = Result<bool, DbError>> + Send;
}

/// Access to owner wallets.
pub trait WalletRepository {
    /// Add `amount` to the owner's wallet, creating it if needed. Returns the
    /// new balance.
    fn credit(
        &self,
        owner_id: OwnerId,
        amount: Decimal,
    ) -> impl Future<Output = Result<Decimal, DbError>> + Send;

    /// Current balance (zero for an unknown owner).
    fn balance(&self, owner_id: OwnerId) -> impl Future<Output = Result<Decimal, DbError>> + Send;
}

/// Append-only activity log.
pub trait ActivityRepository {
    /// Append an entry.
    fn log_activity(
        &self,
        entry: &ActivityEntry,
    ) -> impl Future<Output = Result<(), DbError>> + Send;

    /// Most recent entries, newest first.
    fn recent_activity(
        &self,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<ActivityEntry>, DbError>> + Send;
}

/// The full repository set a simulation runs against.
pub trait CityStore:
    CityRepository
    + ParcelRepository
    + BuildingRepository
    + RoadRepository
    + ResidentRepository
    + CrimeRepository
    + OfficerRepository
    + WalletRepository
    + ActivityRepository
    + Send
    + Sync
    + 'static
{
}

impl<T> CityStore for T where
    T: CityRepository
        + ParcelRepository
        + BuildingRepository
        + RoadRepository
        + ResidentRepository
        + CrimeRepository
        + OfficerRepository
        + WalletRepository
        + ActivityRepository
        + Send
        + Sync
        + 'static
{
}
