//! In-memory store used for tests and database-less runs.
//!
//! Every table lives behind a single [`tokio::sync::RwLock`], so each
//! repository call is atomic with respect to the others. Rows are kept in
//! insertion order, which is the creation order the simulators rely on for
//! their cursors and matching passes.

use std::collections::HashMap;

use citysim_types::{
    ActivityEntry, Building, BuildingId, City, CityTime, Crime, CrimeId, CrimeStatus,
    LandValueUpdate, OfficerId, OwnerId, Parcel, ParcelId, PoliceOfficer, Resident, ResidentId,
    Road, RoadId,
};
use rust_decimal::Decimal;
use tokio::sync::RwLock;

use crate::error::DbError;
use crate::repository::{
    ActivityRepository, BuildingRepository, CityRepository, CrimeRepository, OfficerRepository,
    ParcelRepository, ResidentRepository, RoadRepository, WalletRepository,
};

#[derive(Debug)]
struct Tables {
    city: City,
    parcels: Vec<Parcel>,
    parcel_by_id: HashMap<ParcelId, usize>,
    parcel_by_coord: HashMap<(i32, i32), usize>,
    buildings: Vec<Building>,
    roads: Vec<Road>,
    residents: Vec<Resident>,
    crimes: Vec<Crime>,
    officers: Vec<PoliceOfficer>,
    wallets: HashMap<OwnerId, Decimal>,
    activity: Vec<ActivityEntry>,
}

impl Tables {
    fn new(city: City) -> Self {
        Self {
            city,
            parcels: Vec::new(),
            parcel_by_id: HashMap::new(),
            parcel_by_coord: HashMap::new(),
            buildings: Vec::new(),
            roads: Vec::new(),
            residents: Vec::new(),
            crimes: Vec::new(),
            officers: Vec::new(),
            wallets: HashMap::new(),
            activity: Vec::new(),
        }
    }

    fn parcel(&self, id: ParcelId) -> Option<&Parcel> {
        self.parcel_by_id
            .get(&id)
            .and_then(|&index| self.parcels.get(index))
    }

    fn insert_parcel(&mut self, parcel: Parcel) -> Result<(), DbError> {
        if self.parcel_by_coord.contains_key(&(parcel.x, parcel.y)) {
            return Err(DbError::Conflict(format!(
                "parcel already exists at ({}, {})",
                parcel.x, parcel.y
            )));
        }
        let index = self.parcels.len();
        self.parcel_by_id.insert(parcel.id, index);
        self.parcel_by_coord.insert((parcel.x, parcel.y), index);
        self.parcels.push(parcel);
        Ok(())
    }
}

/// A [`CityStore`](crate::CityStore) that keeps all state in process memory.
#[derive(Debug)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    /// Create an empty store holding the given city record.
    pub fn new(city: City) -> Self {
        Self {
            tables: RwLock::new(Tables::new(city)),
        }
    }
}

impl CityRepository for InMemoryStore {
    async fn load_city(&self) -> Result<City, DbError> {
        Ok(self.tables.read().await.city.clone())
    }

    async fn update_city_time(&self, time: &CityTime) -> Result<(), DbError> {
        let mut tables = self.tables.write().await;
        tables.city.tick = time.tick;
        tables.city.hour = time.hour;
        tables.city.day = time.day;
        tables.city.year = time.year;
        Ok(())
    }
}

impl ParcelRepository for InMemoryStore {
    async fn list_parcels(&self) -> Result<Vec<Parcel>, DbError> {
        Ok(self.tables.read().await.parcels.clone())
    }

    async fn get_parcel(&self, id: ParcelId) -> Result<Option<Parcel>, DbError> {
        Ok(self.tables.read().await.parcel(id).cloned())
    }

    async fn get_parcel_at(&self, x: i32, y: i32) -> Result<Option<Parcel>, DbError> {
        let tables = self.tables.read().await;
        Ok(tables
            .parcel_by_coord
            .get(&(x, y))
            .and_then(|&index| tables.parcels.get(index))
            .cloned())
    }

    async fn get_or_create_parcel(&self, x: i32, y: i32) -> Result<Parcel, DbError> {
        let mut tables = self.tables.write().await;
        if let Some(existing) = tables
            .parcel_by_coord
            .get(&(x, y))
            .and_then(|&index| tables.parcels.get(index))
        {
            return Ok(existing.clone());
        }
        let parcel = Parcel::new(x, y);
        tables.insert_parcel(parcel.clone())?;
        Ok(parcel)
    }

    async fn save_parcel(&self, parcel: &Parcel) -> Result<(), DbError> {
        let mut tables = self.tables.write().await;
        let Some(&index) = tables.parcel_by_id.get(&parcel.id) else {
            return tables.insert_parcel(parcel.clone());
        };

        let coord = (parcel.x, parcel.y);
        if let Some(&holder) = tables.parcel_by_coord.get(&coord) {
            if holder != index {
                return Err(DbError::Conflict(format!(
                    "parcel already exists at ({}, {})",
                    parcel.x, parcel.y
                )));
            }
        }

        let old_coord = tables
            .parcels
            .get(index)
            .map(|existing| (existing.x, existing.y));
        if let Some(old) = old_coord {
            tables.parcel_by_coord.remove(&old);
        }
        tables.parcel_by_coord.insert(coord, index);
        if let Some(slot) = tables.parcels.get_mut(index) {
            *slot = parcel.clone();
        }
        Ok(())
    }

    async fn update_land_values(&self, updates: &[LandValueUpdate]) -> Result<u64, DbError> {
        let mut tables = self.tables.write().await;
        let mut touched: u64 = 0;
        for update in updates {
            let Some(&index) = tables.parcel_by_id.get(&update.parcel_id) else {
                continue;
            };
            if let Some(parcel) = tables.parcels.get_mut(index) {
                parcel.land_value = update.land_value;
                touched = touched.saturating_add(1);
            }
        }
        Ok(touched)
    }
}

impl BuildingRepository for InMemoryStore {
    async fn list_buildings(&self) -> Result<Vec<Building>, DbError> {
        Ok(self.tables.read().await.buildings.clone())
    }

    async fn get_building(&self, id: BuildingId) -> Result<Option<Building>, DbError> {
        let tables = self.tables.read().await;
        Ok(tables.buildings.iter().find(|b| b.id == id).cloned())
    }

    async fn get_building_on_parcel(
        &self,
        parcel_id: ParcelId,
    ) -> Result<Option<Building>, DbError> {
        let tables = self.tables.read().await;
        Ok(tables
            .buildings
            .iter()
            .find(|b| b.parcel_id == parcel_id)
            .cloned())
    }

    async fn create_building(&self, building: &Building) -> Result<(), DbError> {
        let mut tables = self.tables.write().await;
        if tables
            .buildings
            .iter()
            .any(|b| b.parcel_id == building.parcel_id || b.id == building.id)
        {
            return Err(DbError::Conflict(format!(
                "parcel {} is already occupied",
                building.parcel_id
            )));
        }
        tables.buildings.push(building.clone());
        Ok(())
    }

    async fn update_building_density(
        &self,
        id: BuildingId,
        density: u8,
        floors: u32,
    ) -> Result<bool, DbError> {
        let mut tables = self.tables.write().await;
        let Some(building) = tables.buildings.iter_mut().find(|b| b.id == id) else {
            return Ok(false);
        };
        building.density = density;
        building.floors = floors;
        Ok(true)
    }

    async fn update_construction_progress(
        &self,
        id: BuildingId,
        progress: u8,
    ) -> Result<bool, DbError> {
        let mut tables = self.tables.write().await;
        let Some(building) = tables.buildings.iter_mut().find(|b| b.id == id) else {
            return Ok(false);
        };
        building.construction_progress = progress;
        Ok(true)
    }

    async fn set_powered(&self, powered: bool) -> Result<u64, DbError> {
        let mut tables = self.tables.write().await;
        let mut changed: u64 = 0;
        for building in tables.buildings.iter_mut().filter(|b| b.powered != powered) {
            building.powered = powered;
            changed = changed.saturating_add(1);
        }
        Ok(changed)
    }

    async fn delete_building(&self, id: BuildingId) -> Result<bool, DbError> {
        let mut tables = self.tables.write().await;
        let before = tables.buildings.len();
        tables.buildings.retain(|b| b.id != id);
        Ok(tables.buildings.len() != before)
    }
}

impl RoadRepository for InMemoryStore {
    async fn list_roads(&self) -> Result<Vec<Road>, DbError> {
        Ok(self.tables.read().await.roads.clone())
    }

    async fn create_road(&self, road: &Road) -> Result<(), DbError> {
        let mut tables = self.tables.write().await;
        if tables.roads.iter().any(|r| r.parcel_id == road.parcel_id) {
            return Err(DbError::Conflict(format!(
                "parcel {} already has a road",
                road.parcel_id
            )));
        }
        tables.roads.push(road.clone());
        Ok(())
    }

    async fn delete_road(&self, id: RoadId) -> Result<bool, DbError> {
        let mut tables = self.tables.write().await;
        let before = tables.roads.len();
        tables.roads.retain(|r| r.id != id);
        Ok(tables.roads.len() != before)
    }
}

impl ResidentRepository for InMemoryStore {
    async fn list_residents(&self) -> Result<Vec<Resident>, DbError> {
        Ok(self.tables.read().await.residents.clone())
    }

    async fn list_residents_by_home(
        &self,
        building_id: BuildingId,
    ) -> Result<Vec<Resident>, DbError> {
        let tables = self.tables.read().await;
        Ok(tables
            .residents
            .iter()
            .filter(|r| r.home_building_id == building_id)
            .cloned()
            .collect())
    }

    async fn list_residents_by_work(
        &self,
        building_id: BuildingId,
    ) -> Result<Vec<Resident>, DbError> {
        let tables = self.tables.read().await;
        Ok(tables
            .residents
            .iter()
            .filter(|r| r.work_building_id == Some(building_id))
            .cloned()
            .collect())
    }

    async fn create_residents(&self, residents: &[Resident]) -> Result<(), DbError> {
        self.tables
            .write()
            .await
            .residents
            .extend_from_slice(residents);
        Ok(())
    }

    async fn update_employment(
        &self,
        id: ResidentId,
        work_building_id: Option<BuildingId>,
        salary: Decimal,
    ) -> Result<bool, DbError> {
        let mut tables = self.tables.write().await;
        let Some(resident) = tables.residents.iter_mut().find(|r| r.id == id) else {
            return Ok(false);
        };
        resident.work_building_id = work_building_id;
        resident.salary = salary;
        Ok(true)
    }

    async fn delete_residents_by_home(&self, building_id: BuildingId) -> Result<u64, DbError> {
        let mut tables = self.tables.write().await;
        let before = tables.residents.len();
        tables
            .residents
            .retain(|r| r.home_building_id != building_id);
        let removed = before.saturating_sub(tables.residents.len());
        Ok(u64::try_from(removed).unwrap_or(u64::MAX))
    }

    async fn clear_work_for_building(&self, building_id: BuildingId) -> Result<u64, DbError> {
        let mut tables = self.tables.write().await;
        let mut cleared: u64 = 0;
        for resident in tables
            .residents
            .iter_mut()
            .filter(|r| r.work_building_id == Some(building_id))
        {
            resident.work_building_id = None;
            resident.salary = Decimal::ZERO;
            cleared = cleared.saturating_add(1);
        }
        Ok(cleared)
    }
}

impl CrimeRepository for InMemoryStore {
    async fn list_crimes_by_status(&self, status: CrimeStatus) -> Result<Vec<Crime>, DbError> {
        let tables = self.tables.read().await;
        Ok(tables
            .crimes
            .iter()
            .filter(|c| c.status == status)
            .cloned()
            .collect())
    }

    async fn get_crime(&self, id: CrimeId) -> Result<Option<Crime>, DbError> {
        let tables = self.tables.read().await;
        Ok(tables.crimes.iter().find(|c| c.id == id).cloned())
    }

    async fn create_crime(&self, crime: &Crime) -> Result<(), DbError> {
        self.tables.write().await.crimes.push(crime.clone());
        Ok(())
    }

    async fn update_crime(&self, crime: &Crime) -> Result<bool, DbError> {
        let mut tables = self.tables.write().await;
        let Some(slot) = tables.crimes.iter_mut().find(|c| c.id == crime.id) else {
            return Ok(false);
        };
        *slot = crime.clone();
        Ok(true)
    }
}

impl OfficerRepository for InMemoryStore {
    async fn list_officers(&self) -> Result<Vec<PoliceOfficer>, DbError> {
        Ok(self.tables.read().await.officers.clone())
    }

    async fn list_officers_by_station(
        &self,
        station_id: BuildingId,
    ) -> Result<Vec<PoliceOfficer>, DbError> {
        let tables = self.tables.read().await;
        Ok(tables
            .officers
            .iter()
            .filter(|o| o.station_id == station_id)
            .cloned()
            .collect())
    }

    async fn get_officer(&self, id: OfficerId) -> Result<Option<PoliceOfficer>, DbError> {
        let tables = self.tables.read().await;
        Ok(tables.officers.iter().find(|o| o.id == id).cloned())
    }

    async fn create_officer(&self, officer: &PoliceOfficer) -> Result<(), DbError> {
        self.tables.write().await.officers.push(officer.clone());
        Ok(())
    }

    async fn update_officer(&self, officer: &PoliceOfficer) -> Result<bool, DbError> {
        let mut tables = self.tables.write().await;
        let Some(slot) = tables.officers.iter_mut().find(|o| o.id == officer.id) else {
            return Ok(false);
        };
        *slot = officer.clone();
        Ok(true)
    }
}

impl WalletRepository for InMemoryStore {
    async fn credit(&self, owner_id: OwnerId, amount: Decimal) -> Result<Decimal, DbError> {
        let mut tables = self.tables.write().await;
        let balance = tables.wallets.entry(owner_id).or_insert(Decimal::ZERO);
        *balance = balance.saturating_add(amount);
        Ok(*balance)
    }

    async fn balance(&self, owner_id: OwnerId) -> Result<Decimal, DbError> {
        let tables = self.tables.read().await;
        Ok(tables
            .wallets
            .get(&owner_id)
            .copied()
            .unwrap_or(Decimal::ZERO))
    }
}

impl ActivityRepository for InMemoryStore {
    async fn log_activity(&self, entry: &ActivityEntry) -> Result<(), DbError> {
        self.tables.write().await.activity.push(entry.clone());
        Ok(())
    }

    async fn recent_activity(&self, limit: usize) -> Result<Vec<ActivityEntry>, DbError> {
        let tables = self.tables.read().await;
        Ok(tables.activity.iter().rev().take(limit).cloned().collect())
    }
}
