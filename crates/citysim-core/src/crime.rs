//! Crime generation and the police dispatch state machine.
//!
//! Crimes move `active -> responding -> resolved`; officers move
//! `available <-> responding`. The hourly pass releases officers stranded by
//! a half-finished dispatch, staffs stations, rolls new crimes, closes crimes
//! nobody answered, and dispatches free officers. The
//! per-tick pass moves responding officers and resolves crimes they reach.
//!
//! Arrest and escape both end in `resolved`; they differ only in the
//! activity log and the `arrested` flag on the event.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use citysim_db::CityStore;
use citysim_types::{
    ActivityEntry, Building, BuildingType, CityTime, Crime, CrimeId, CrimeReportedDetails,
    CrimeResolvedDetails, CrimeStatus, CrimeType, DomainEvent, OfficerId, OfficerStatus,
    OfficersSpawnedDetails, Parcel, ParcelId, PoliceOfficer, Position,
};
use rand::Rng as _;
use rust_decimal::Decimal;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::catalog::BuildingCatalog;
use crate::config::{CrimeConfig, PopulationConfig};
use crate::error::SimError;
use crate::population::population_stats;
use crate::{SimRng, count_as_f64, every};

/// Inclusive damage range for a crime type.
pub const fn damage_range(crime_type: CrimeType) -> (u32, u32) {
    match crime_type {
        CrimeType::Theft => (50, 200),
        CrimeType::Burglary => (100, 500),
        CrimeType::Vandalism => (20, 100),
        CrimeType::Assault => (10, 80),
    }
}

/// Conditions around one building that scale its crime chance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CrimeRisk {
    /// Whether the sun is up.
    pub is_daylight: bool,
    /// City-wide unemployment rate.
    pub unemployment_rate: f64,
    /// Land value of the building's parcel.
    pub land_value: i32,
    /// Whether any officer is within patrol radius.
    pub police_nearby: bool,
}

/// Generates crimes and drives police response.
#[derive(Debug)]
pub struct CrimeSimulator<S> {
    store: Arc<S>,
    config: CrimeConfig,
    catalog: BuildingCatalog,
    ticks_per_hour: u64,
    last_hourly_tick: Option<u64>,
}

impl<S: CityStore> CrimeSimulator<S> {
    /// Create a simulator over the store.
    pub fn new(
        store: Arc<S>,
        config: &CrimeConfig,
        population: &PopulationConfig,
        ticks_per_hour: u64,
    ) -> Self {
        Self {
            store,
            config: config.clone(),
            catalog: BuildingCatalog::new(population),
            ticks_per_hour,
            last_hourly_tick: None,
        }
    }

    /// Run the hourly pass when due, then advance responding officers.
    pub async fn simulate(
        &mut self,
        time: &CityTime,
        rng: &mut SimRng,
    ) -> Result<Vec<DomainEvent>, SimError> {
        let mut events = Vec::new();

        if every(time.tick, self.ticks_per_hour) && self.last_hourly_tick != Some(time.tick) {
            self.last_hourly_tick = Some(time.tick);
            self.release_stranded_officers().await?;
            events.extend(self.spawn_officers().await?);
            events.extend(self.generate_crimes(time, rng).await?);
            events.extend(self.expire_unattended(time.tick).await?);
            self.dispatch().await?;
        }

        events.extend(self.advance_responses(time.tick, rng).await?);
        Ok(events)
    }

    /// Probability that one building sees a crime this hour.
    pub fn chance(&self, risk: &CrimeRisk) -> f64 {
        let mut chance = self.config.base_rate_per_tick * count_as_f64(self.ticks_per_hour);
        if !risk.is_daylight {
            chance *= self.config.night_multiplier;
        }
        if risk.unemployment_rate > self.config.unemployment_threshold {
            chance *= self.config.unemployment_multiplier;
        }
        if risk.land_value < self.config.low_land_value {
            chance *= self.config.low_land_value_multiplier;
        }
        if !risk.police_nearby {
            chance *= self.config.no_police_multiplier;
        }
        chance
    }

    /// Top up every completed police station to the officer quota.
    pub async fn spawn_officers(&self) -> Result<Vec<DomainEvent>, SimError> {
        let buildings = self.store.list_buildings().await?;
        let quota = u64::from(self.config.officers_per_station);
        let mut events = Vec::new();

        for station in buildings
            .iter()
            .filter(|b| b.building_type == BuildingType::PoliceStation && b.is_complete())
        {
            let Some(parcel) = self.store.get_parcel(station.parcel_id).await? else {
                warn!(station_id = %station.id, "police station parcel missing");
                continue;
            };
            let staffed = self.store.list_officers_by_station(station.id).await?.len();
            let staffed = u64::try_from(staffed).unwrap_or(u64::MAX);
            let missing = quota.saturating_sub(staffed);
            if missing == 0 {
                continue;
            }

            let mut officer_ids = Vec::new();
            for _ in 0..missing {
                let officer = PoliceOfficer {
                    id: OfficerId::new(),
                    station_id: station.id,
                    position: Position::at_tile(parcel.x, parcel.y),
                    status: OfficerStatus::Available,
                    assigned_crime_id: None,
                };
                self.store.create_officer(&officer).await?;
                officer_ids.push(officer.id);
            }
            debug!(station_id = %station.id, count = officer_ids.len(), "officers spawned");
            events.push(DomainEvent::OfficersSpawned(OfficersSpawnedDetails {
                station_id: station.id,
                officer_ids,
            }));
        }
        Ok(events)
    }

    /// Roll a crime for every completed, non-civic building.
    pub async fn generate_crimes(
        &self,
        time: &CityTime,
        rng: &mut SimRng,
    ) -> Result<Vec<DomainEvent>, SimError> {
        let buildings = self.store.list_buildings().await?;
        let residents = self.store.list_residents().await?;
        let parcels: HashMap<ParcelId, Parcel> = self
            .store
            .list_parcels()
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();
        let officers = self.store.list_officers().await?;
        let unemployment_rate =
            population_stats(&self.catalog, &buildings, &residents).unemployment_rate;

        let mut events = Vec::new();
        for building in buildings.iter().filter(|b| {
            b.is_complete() && !BuildingCatalog::spec(b.building_type).infrastructure
        }) {
            let Some(parcel) = parcels.get(&building.parcel_id) else {
                continue;
            };
            let risk = CrimeRisk {
                is_daylight: time.is_daylight,
                unemployment_rate,
                land_value: parcel.land_value,
                police_nearby: officers.iter().any(|o| {
                    o.position.manhattan_to(parcel.x, parcel.y) <= self.config.patrol_radius
                }),
            };
            if rng.random::<f64>() < self.chance(&risk) {
                let crime = roll_crime(building, parcel, time.tick, rng);
                events.push(self.report(&crime).await?);
            }
        }
        Ok(events)
    }

    /// Close active crimes that nobody answered within the timeout.
    pub async fn expire_unattended(&self, tick: u64) -> Result<Vec<DomainEvent>, SimError> {
        let active = self.store.list_crimes_by_status(CrimeStatus::Active).await?;
        let mut events = Vec::new();
        for mut crime in active {
            if tick.saturating_sub(crime.reported_at_tick) <= self.config.unattended_timeout_ticks {
                continue;
            }
            crime.status = CrimeStatus::Resolved;
            crime.resolved_at_tick = Some(tick);
            if self.store.update_crime(&crime).await? {
                events.push(self.resolved(&crime, None, false, tick).await?);
            }
        }
        Ok(events)
    }

    /// Return responding officers to duty when their assigned crime is no
    /// longer being answered by them. Heals state left behind by a dispatch
    /// that failed halfway.
    pub async fn release_stranded_officers(&self) -> Result<u64, SimError> {
        let mut released: u64 = 0;
        for mut officer in self.store.list_officers().await? {
            if officer.status != OfficerStatus::Responding {
                continue;
            }
            let answering = match officer.assigned_crime_id {
                Some(crime_id) => self.store.get_crime(crime_id).await?.is_some_and(|crime| {
                    crime.status == CrimeStatus::Responding
                        && crime.responding_officer_id == Some(officer.id)
                }),
                None => false,
            };
            if answering {
                continue;
            }
            warn!(
                officer_id = %officer.id,
                crime_id = ?officer.assigned_crime_id,
                "stranded officer released"
            );
            officer.status = OfficerStatus::Available;
            officer.assigned_crime_id = None;
            if self.store.update_officer(&officer).await? {
                released = released.saturating_add(1);
            }
        }
        Ok(released)
    }

    /// Assign the nearest available officer to each active crime, in
    /// creation order, until officers run out.
    pub async fn dispatch(&self) -> Result<u64, SimError> {
        let active = self.store.list_crimes_by_status(CrimeStatus::Active).await?;
        if active.is_empty() {
            return Ok(0);
        }
        let mut pool: Vec<PoliceOfficer> = self
            .store
            .list_officers()
            .await?
            .into_iter()
            .filter(|o| o.status == OfficerStatus::Available)
            .collect();

        let mut dispatched: u64 = 0;
        for mut crime in active {
            if pool.is_empty() {
                break;
            }
            if !crime.status.can_transition_to(CrimeStatus::Responding) {
                continue;
            }
            let Some(index) = nearest_officer(&pool, crime.x, crime.y) else {
                break;
            };
            let mut officer = pool.remove(index);
            crime.status = CrimeStatus::Responding;
            crime.responding_officer_id = Some(officer.id);
            if !self.store.update_crime(&crime).await? {
                continue;
            }

            officer.status = OfficerStatus::Responding;
            officer.assigned_crime_id = Some(crime.id);
            self.store.update_officer(&officer).await?;
            dispatched = dispatched.saturating_add(1);
            debug!(crime_id = %crime.id, officer_id = %officer.id, "officer dispatched");
        }
        Ok(dispatched)
    }

    /// Move each responding officer toward its crime, resolving crimes the
    /// officer has reached.
    pub async fn advance_responses(
        &self,
        tick: u64,
        rng: &mut SimRng,
    ) -> Result<Vec<DomainEvent>, SimError> {
        let responding = self
            .store
            .list_crimes_by_status(CrimeStatus::Responding)
            .await?;
        let speed = self.config.response_speed;
        let mut events = Vec::new();

        for mut crime in responding {
            let Some(officer_id) = crime.responding_officer_id else {
                warn!(crime_id = %crime.id, "responding crime without officer");
                continue;
            };
            let Some(mut officer) = self.store.get_officer(officer_id).await? else {
                debug!(crime_id = %crime.id, officer_id = %officer_id, "officer missing; skipped");
                continue;
            };

            let scene = Position::at_tile(crime.x, crime.y);
            let distance = officer.position.distance_to(scene);
            if distance > speed {
                let step = speed / distance;
                officer.position = Position {
                    x: (scene.x - officer.position.x).mul_add(step, officer.position.x),
                    y: (scene.y - officer.position.y).mul_add(step, officer.position.y),
                };
                self.store.update_officer(&officer).await?;
                continue;
            }

            if !crime.status.can_transition_to(CrimeStatus::Resolved) {
                continue;
            }
            let arrested = rng.random::<f64>() < self.config.arrest_chance;
            crime.status = CrimeStatus::Resolved;
            crime.resolved_at_tick = Some(tick);
            officer.position = scene;
            officer.status = OfficerStatus::Available;
            officer.assigned_crime_id = None;
            self.store.update_crime(&crime).await?;
            self.store.update_officer(&officer).await?;
            events.push(self.resolved(&crime, Some(officer.id), arrested, tick).await?);
        }
        Ok(events)
    }

    async fn report(&self, crime: &Crime) -> Result<DomainEvent, SimError> {
        self.store.create_crime(crime).await?;
        info!(
            crime_id = %crime.id,
            crime_type = crime.crime_type.as_str(),
            x = crime.x,
            y = crime.y,
            damage = %crime.damage,
            "crime reported"
        );
        self.store
            .log_activity(&ActivityEntry {
                tick: crime.reported_at_tick,
                kind: "crime_reported".to_owned(),
                message: format!(
                    "{} reported at ({}, {})",
                    crime.crime_type.as_str(),
                    crime.x,
                    crime.y
                ),
                metadata: json!({
                    "crime_id": crime.id,
                    "crime_type": crime.crime_type,
                    "building_id": crime.building_id,
                    "x": crime.x,
                    "y": crime.y,
                    "damage": crime.damage,
                }),
                created_at: Utc::now(),
            })
            .await?;
        Ok(DomainEvent::CrimeReported(CrimeReportedDetails {
            crime_id: crime.id,
            crime_type: crime.crime_type,
            building_id: crime.building_id,
            x: crime.x,
            y: crime.y,
            damage: crime.damage,
        }))
    }

    async fn resolved(
        &self,
        crime: &Crime,
        officer_id: Option<OfficerId>,
        arrested: bool,
        tick: u64,
    ) -> Result<DomainEvent, SimError> {
        let outcome = if arrested { "arrested" } else { "escaped" };
        info!(crime_id = %crime.id, outcome, "crime resolved");
        self.store
            .log_activity(&ActivityEntry {
                tick,
                kind: "crime_resolved".to_owned(),
                message: format!(
                    "{} at ({}, {}): suspect {outcome}",
                    crime.crime_type.as_str(),
                    crime.x,
                    crime.y
                ),
                metadata: json!({
                    "crime_id": crime.id,
                    "officer_id": officer_id,
                    "outcome": outcome,
                    "reported_at_tick": crime.reported_at_tick,
                    "resolved_at_tick": tick,
                }),
                created_at: Utc::now(),
            })
            .await?;
        Ok(DomainEvent::CrimeResolved(CrimeResolvedDetails {
            crime_id: crime.id,
            officer_id,
            arrested,
        }))
    }
}

/// Index of the Manhattan-nearest officer. Ties go to the earliest.
fn nearest_officer(pool: &[PoliceOfficer], x: i32, y: i32) -> Option<usize> {
    pool.iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| {
            a.position
                .manhattan_to(x, y)
                .total_cmp(&b.position.manhattan_to(x, y))
        })
        .map(|(index, _)| index)
}

fn roll_crime(building: &Building, parcel: &Parcel, tick: u64, rng: &mut SimRng) -> Crime {
    let types = CrimeType::ALL;
    let crime_type = types
        .get(rng.random_range(0..types.len()))
        .copied()
        .unwrap_or(CrimeType::Theft);
    let (low, high) = damage_range(crime_type);
    Crime {
        id: CrimeId::new(),
        crime_type,
        parcel_id: parcel.id,
        building_id: building.id,
        x: parcel.x,
        y: parcel.y,
        status: CrimeStatus::Active,
        responding_officer_id: None,
        damage: Decimal::from(rng.random_range(low..=high)),
        reported_at_tick: tick,
        resolved_at_tick: None,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use citysim_db::{
        ActivityRepository, BuildingRepository, CrimeRepository, InMemoryStore,
        OfficerRepository, ParcelRepository,
    };
    use citysim_types::{BuildingId, City, OwnerId};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    const TPH: u64 = 600;

    fn time(tick: u64, is_daylight: bool) -> CityTime {
        CityTime {
            tick,
            hour: 0,
            day: 1,
            year: 1,
            is_daylight,
        }
    }

    fn simulator(config: &CrimeConfig) -> (Arc<InMemoryStore>, CrimeSimulator<InMemoryStore>) {
        let store = Arc::new(InMemoryStore::new(City::founded("Test", Decimal::ZERO)));
        let sim = CrimeSimulator::new(
            Arc::clone(&store),
            config,
            &PopulationConfig::default(),
            TPH,
        );
        (store, sim)
    }

    async fn place(
        store: &InMemoryStore,
        building_type: BuildingType,
        x: i32,
        y: i32,
    ) -> Building {
        let parcel = store.get_or_create_parcel(x, y).await.unwrap();
        let building = Building {
            id: BuildingId::new(),
            parcel_id: parcel.id,
            building_type,
            floors: 1,
            density: 1,
            construction_progress: 100,
            powered: true,
            owner_id: OwnerId::SYSTEM,
        };
        store.create_building(&building).await.unwrap();
        building
    }

    fn officer_at(station_id: BuildingId, x: f64, y: f64) -> PoliceOfficer {
        PoliceOfficer {
            id: OfficerId::new(),
            station_id,
            position: Position { x, y },
            status: OfficerStatus::Available,
            assigned_crime_id: None,
        }
    }

    fn active_crime(x: i32, y: i32, tick: u64) -> Crime {
        Crime {
            id: CrimeId::new(),
            crime_type: CrimeType::Theft,
            parcel_id: ParcelId::new(),
            building_id: BuildingId::new(),
            x,
            y,
            status: CrimeStatus::Active,
            responding_officer_id: None,
            damage: Decimal::from(100),
            reported_at_tick: tick,
            resolved_at_tick: None,
        }
    }

    #[test]
    fn chance_multipliers_stack() {
        let (_store, sim) = simulator(&CrimeConfig::default());
        let calm = CrimeRisk {
            is_daylight: true,
            unemployment_rate: 0.1,
            land_value: 50,
            police_nearby: true,
        };
        let base = sim.chance(&calm);
        assert!((base - 0.03).abs() < 1e-12);

        let worst = CrimeRisk {
            is_daylight: false,
            unemployment_rate: 0.5,
            land_value: 20,
            police_nearby: false,
        };
        let expected = 0.03 * 1.5 * 1.3 * 1.5 * 2.0;
        assert!((sim.chance(&worst) - expected).abs() < 1e-12);
    }

    #[tokio::test]
    async fn stations_are_staffed_to_quota_once() {
        let (store, sim) = simulator(&CrimeConfig::default());
        let station = place(&store, BuildingType::PoliceStation, 2, 3).await;

        let events = sim.spawn_officers().await.unwrap();
        assert_eq!(events.len(), 1);
        let officers = store.list_officers_by_station(station.id).await.unwrap();
        assert_eq!(officers.len(), 3);
        assert!(officers.iter().all(|o| o.position == Position::at_tile(2, 3)));

        assert!(sim.spawn_officers().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn certain_crime_skips_civic_buildings() {
        let config = CrimeConfig {
            base_rate_per_tick: 1.0,
            ..CrimeConfig::default()
        };
        let (store, sim) = simulator(&config);
        let shop = place(&store, BuildingType::Shop, 0, 0).await;
        place(&store, BuildingType::Park, 1, 0).await;
        let mut rng = StdRng::seed_from_u64(4);

        let events = sim.generate_crimes(&time(600, true), &mut rng).await.unwrap();
        assert_eq!(events.len(), 1);
        let crimes = store.list_crimes_by_status(CrimeStatus::Active).await.unwrap();
        let crime = crimes.first().unwrap();
        assert_eq!(crime.building_id, shop.id);
        let (low, high) = damage_range(crime.crime_type);
        assert!(crime.damage >= Decimal::from(low) && crime.damage <= Decimal::from(high));

        let log = store.recent_activity(10).await.unwrap();
        assert_eq!(log.first().map(|e| e.kind.as_str()), Some("crime_reported"));
    }

    #[tokio::test]
    async fn dispatch_picks_nearest_available_officer() {
        let (store, sim) = simulator(&CrimeConfig::default());
        let station = BuildingId::new();
        let far = officer_at(station, 10.0, 10.0);
        let near = officer_at(station, 1.0, 0.0);
        store.create_officer(&far).await.unwrap();
        store.create_officer(&near).await.unwrap();
        let crime = active_crime(0, 0, 0);
        store.create_crime(&crime).await.unwrap();

        assert_eq!(sim.dispatch().await.unwrap(), 1);
        let crime = store.get_crime(crime.id).await.unwrap().unwrap();
        assert_eq!(crime.status, CrimeStatus::Responding);
        assert_eq!(crime.responding_officer_id, Some(near.id));
        let near = store.get_officer(near.id).await.unwrap().unwrap();
        assert_eq!(near.status, OfficerStatus::Responding);
        assert_eq!(near.assigned_crime_id, Some(crime.id));
        let far = store.get_officer(far.id).await.unwrap().unwrap();
        assert_eq!(far.status, OfficerStatus::Available);
    }

    #[tokio::test]
    async fn dispatch_ties_go_to_first_officer() {
        let (store, sim) = simulator(&CrimeConfig::default());
        let station = BuildingId::new();
        let first = officer_at(station, 2.0, 0.0);
        let second = officer_at(station, 0.0, 2.0);
        store.create_officer(&first).await.unwrap();
        store.create_officer(&second).await.unwrap();
        let crime = active_crime(0, 0, 0);
        store.create_crime(&crime).await.unwrap();

        sim.dispatch().await.unwrap();
        let crime = store.get_crime(crime.id).await.unwrap().unwrap();
        assert_eq!(crime.responding_officer_id, Some(first.id));
    }

    #[tokio::test]
    async fn half_finished_dispatch_heals_next_hour() {
        let (store, mut sim) = simulator(&CrimeConfig::default());
        let crime = active_crime(0, 0, 0);
        store.create_crime(&crime).await.unwrap();
        // Officer saved as responding, crime never moved past active.
        let stranded = PoliceOfficer {
            status: OfficerStatus::Responding,
            assigned_crime_id: Some(crime.id),
            ..officer_at(BuildingId::new(), 3.0, 0.0)
        };
        store.create_officer(&stranded).await.unwrap();
        let mut rng = StdRng::seed_from_u64(2);

        sim.simulate(&time(600, true), &mut rng).await.unwrap();

        let crime = store.get_crime(crime.id).await.unwrap().unwrap();
        assert_eq!(crime.status, CrimeStatus::Responding);
        assert_eq!(crime.responding_officer_id, Some(stranded.id));
        let officer = store.get_officer(stranded.id).await.unwrap().unwrap();
        assert_eq!(officer.status, OfficerStatus::Responding);
        assert_eq!(officer.assigned_crime_id, Some(crime.id));
    }

    #[tokio::test]
    async fn officers_on_live_calls_are_not_released() {
        let (store, sim) = simulator(&CrimeConfig::default());
        store.create_officer(&officer_at(BuildingId::new(), 5.0, 0.0)).await.unwrap();
        let crime = active_crime(0, 0, 0);
        store.create_crime(&crime).await.unwrap();
        assert_eq!(sim.dispatch().await.unwrap(), 1);

        assert_eq!(sim.release_stranded_officers().await.unwrap(), 0);

        let orphan = PoliceOfficer {
            status: OfficerStatus::Responding,
            assigned_crime_id: Some(CrimeId::new()),
            ..officer_at(BuildingId::new(), 0.0, 0.0)
        };
        store.create_officer(&orphan).await.unwrap();
        assert_eq!(sim.release_stranded_officers().await.unwrap(), 1);
        let orphan = store.get_officer(orphan.id).await.unwrap().unwrap();
        assert_eq!(orphan.status, OfficerStatus::Available);
        assert_eq!(orphan.assigned_crime_id, None);
    }

    #[tokio::test]
    async fn officer_walks_then_resolves() {
        let (store, sim) = simulator(&CrimeConfig::default());
        let officer = officer_at(BuildingId::new(), 1.0, 0.0);
        store.create_officer(&officer).await.unwrap();
        let crime = active_crime(0, 0, 0);
        store.create_crime(&crime).await.unwrap();
        sim.dispatch().await.unwrap();
        let mut rng = StdRng::seed_from_u64(2);

        // One tile away at half a tile per tick: move, then resolve.
        assert!(sim.advance_responses(1, &mut rng).await.unwrap().is_empty());
        let moved = store.get_officer(officer.id).await.unwrap().unwrap();
        assert!((moved.position.x - 0.5).abs() < 1e-9);

        let events = sim.advance_responses(2, &mut rng).await.unwrap();
        assert_eq!(events.len(), 1);
        let crime = store.get_crime(crime.id).await.unwrap().unwrap();
        assert_eq!(crime.status, CrimeStatus::Resolved);
        assert_eq!(crime.resolved_at_tick, Some(2));
        let officer = store.get_officer(officer.id).await.unwrap().unwrap();
        assert_eq!(officer.status, OfficerStatus::Available);
        assert_eq!(officer.assigned_crime_id, None);
    }

    #[tokio::test]
    async fn missing_officer_is_skipped() {
        let (store, sim) = simulator(&CrimeConfig::default());
        let mut crime = active_crime(0, 0, 0);
        crime.status = CrimeStatus::Responding;
        crime.responding_officer_id = Some(OfficerId::new());
        store.create_crime(&crime).await.unwrap();
        let mut rng = StdRng::seed_from_u64(2);

        assert!(sim.advance_responses(5, &mut rng).await.unwrap().is_empty());
        let crime = store.get_crime(crime.id).await.unwrap().unwrap();
        assert_eq!(crime.status, CrimeStatus::Responding);
    }

    #[tokio::test]
    async fn unattended_crimes_escape() {
        let (store, sim) = simulator(&CrimeConfig::default());
        let old = active_crime(0, 0, 0);
        let fresh = active_crime(1, 1, 10_000);
        store.create_crime(&old).await.unwrap();
        store.create_crime(&fresh).await.unwrap();

        let events = sim.expire_unattended(14_401).await.unwrap();
        assert_eq!(
            events,
            vec![DomainEvent::CrimeResolved(CrimeResolvedDetails {
                crime_id: old.id,
                officer_id: None,
                arrested: false,
            })]
        );
        let fresh = store.get_crime(fresh.id).await.unwrap().unwrap();
        assert_eq!(fresh.status, CrimeStatus::Active);
    }

    #[tokio::test]
    async fn hourly_pass_runs_once_per_boundary() {
        let (store, mut sim) = simulator(&CrimeConfig::default());
        place(&store, BuildingType::PoliceStation, 0, 0).await;
        let mut rng = StdRng::seed_from_u64(5);

        sim.simulate(&time(599, false), &mut rng).await.unwrap();
        assert!(store.list_officers().await.unwrap().is_empty());

        sim.simulate(&time(600, false), &mut rng).await.unwrap();
        assert_eq!(store.list_officers().await.unwrap().len(), 3);
    }
}
