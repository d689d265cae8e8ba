//! Resident spawning and displacement.
//!
//! Population reacts to building lifecycle notices rather than polling:
//! construction and zone evolution queue a [`LifecycleNotice`], and the
//! engine drains the queue into [`PopulationSimulator::process`] once per
//! tick.

use std::collections::HashMap;
use std::sync::Arc;

use citysim_db::CityStore;
use citysim_types::{
    Building, BuildingId, DomainEvent, PopulationStats, Resident, ResidentSpawnedDetails,
    ResidentsDisplacedDetails,
};
use rand::Rng as _;
use tracing::{debug, warn};

use crate::SimRng;
use crate::catalog::{BuildingCatalog, Housing};
use crate::config::PopulationConfig;
use crate::count_as_f64;
use crate::error::SimError;

/// A building lifecycle change the population stage must react to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleNotice {
    /// Construction finished.
    Completed(Building),
    /// The building was removed.
    Demolished(BuildingId),
    /// Zone evolution added floors.
    Expanded {
        /// The building after evolution.
        building: Building,
        /// Floor count before evolution.
        previous_floors: u32,
    },
}

/// Spawns residents into new housing and displaces them on demolition.
#[derive(Debug)]
pub struct PopulationSimulator<S> {
    store: Arc<S>,
    catalog: BuildingCatalog,
    house_min: u32,
    house_max: u32,
}

impl<S: CityStore> PopulationSimulator<S> {
    /// Create a simulator over the store.
    pub fn new(store: Arc<S>, config: &PopulationConfig) -> Self {
        Self {
            store,
            catalog: BuildingCatalog::new(config),
            house_min: config.house_min_residents.min(config.house_max_residents),
            house_max: config.house_max_residents.max(config.house_min_residents),
        }
    }

    /// Populate a finished building.
    ///
    /// Density-scaled housing gets `units_per_floor * floors` residents; a
    /// house gets a uniform draw from the configured household range.
    /// Non-residential buildings produce nothing.
    pub async fn on_building_completed(
        &self,
        building: &Building,
        tick: u64,
        rng: &mut SimRng,
    ) -> Result<Option<DomainEvent>, SimError> {
        let count = match BuildingCatalog::spec(building.building_type).housing {
            Housing::None => return Ok(None),
            Housing::PerFloor => self.catalog.units_for_floors(building.floors),
            Housing::SingleUnit => u64::from(rng.random_range(self.house_min..=self.house_max)),
        };
        self.spawn(building.id, count, tick).await
    }

    /// Remove residents living in a demolished building and unemploy those
    /// working there.
    pub async fn on_building_demolished(
        &self,
        building_id: BuildingId,
    ) -> Result<DomainEvent, SimError> {
        let removed = self.store.delete_residents_by_home(building_id).await?;
        let unemployed = self.store.clear_work_for_building(building_id).await?;
        debug!(
            building_id = %building_id,
            removed,
            unemployed,
            "residents displaced"
        );
        Ok(DomainEvent::ResidentsDisplaced(ResidentsDisplacedDetails {
            building_id,
            removed,
            unemployed,
        }))
    }

    /// Spawn residents for floors added by zone evolution.
    pub async fn on_building_expanded(
        &self,
        building: &Building,
        previous_floors: u32,
        tick: u64,
    ) -> Result<Option<DomainEvent>, SimError> {
        if BuildingCatalog::spec(building.building_type).housing != Housing::PerFloor {
            return Ok(None);
        }
        let added = building.floors.saturating_sub(previous_floors);
        self.spawn(building.id, self.catalog.units_for_floors(added), tick)
            .await
    }

    /// Handle queued notices in order. A failed notice is logged and skipped.
    pub async fn process(
        &self,
        notices: Vec<LifecycleNotice>,
        tick: u64,
        rng: &mut SimRng,
    ) -> Vec<DomainEvent> {
        let mut events = Vec::new();
        for notice in notices {
            let result = match &notice {
                LifecycleNotice::Completed(building) => {
                    self.on_building_completed(building, tick, rng).await
                }
                LifecycleNotice::Demolished(id) => self.on_building_demolished(*id).await.map(Some),
                LifecycleNotice::Expanded {
                    building,
                    previous_floors,
                } => {
                    self.on_building_expanded(building, *previous_floors, tick)
                        .await
                }
            };
            match result {
                Ok(Some(event)) => events.push(event),
                Ok(None) => {}
                Err(e) => warn!(error = %e, ?notice, "population notice failed"),
            }
        }
        events
    }

    async fn spawn(
        &self,
        building_id: BuildingId,
        count: u64,
        tick: u64,
    ) -> Result<Option<DomainEvent>, SimError> {
        if count == 0 {
            return Ok(None);
        }
        let residents: Vec<Resident> = (0..count)
            .map(|_| Resident::new(building_id, tick))
            .collect();
        self.store.create_residents(&residents).await?;
        debug!(building_id = %building_id, count, "residents spawned");
        Ok(Some(DomainEvent::ResidentSpawned(ResidentSpawnedDetails {
            building_id,
            resident_ids: residents.iter().map(|r| r.id).collect(),
        })))
    }
}

/// Aggregate population and capacity figures.
///
/// Capacities count completed buildings only.
pub fn population_stats(
    catalog: &BuildingCatalog,
    buildings: &[Building],
    residents: &[Resident],
) -> PopulationStats {
    let total = u64::try_from(residents.len()).unwrap_or(u64::MAX);
    let employed = u64::try_from(residents.iter().filter(|r| r.is_employed()).count())
        .unwrap_or(u64::MAX);
    let unemployed = total.saturating_sub(employed);
    let unemployment_rate = if total == 0 {
        0.0
    } else {
        count_as_f64(unemployed) / count_as_f64(total)
    };

    let mut households: HashMap<BuildingId, u64> = HashMap::new();
    for resident in residents {
        let count = households.entry(resident.home_building_id).or_insert(0);
        *count = count.saturating_add(1);
    }

    let (housing_capacity, job_capacity) = buildings
        .iter()
        .filter(|b| b.is_complete())
        .fold((0_u64, 0_u64), |(housing, jobs), b| {
            let household = households.get(&b.id).copied().unwrap_or(0);
            (
                housing.saturating_add(catalog.housing_capacity(b, household)),
                jobs.saturating_add(BuildingCatalog::job_capacity(b)),
            )
        });

    PopulationStats {
        total,
        employed,
        unemployed,
        unemployment_rate,
        housing_capacity,
        job_capacity,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use citysim_db::{InMemoryStore, ResidentRepository};
    use citysim_types::{BuildingType, City, OwnerId, ParcelId};
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    use super::*;

    fn building(building_type: BuildingType, floors: u32) -> Building {
        Building {
            id: BuildingId::new(),
            parcel_id: ParcelId::new(),
            building_type,
            floors,
            density: 1,
            construction_progress: 100,
            powered: true,
            owner_id: OwnerId::SYSTEM,
        }
    }

    fn simulator() -> (Arc<InMemoryStore>, PopulationSimulator<InMemoryStore>) {
        let store = Arc::new(InMemoryStore::new(City::founded("Test", Decimal::ZERO)));
        let sim = PopulationSimulator::new(Arc::clone(&store), &PopulationConfig::default());
        (store, sim)
    }

    #[tokio::test]
    async fn apartment_spawns_units_per_floor() {
        let (store, sim) = simulator();
        let apartment = building(BuildingType::Apartment, 2);
        let mut rng = StdRng::seed_from_u64(1);

        let event = sim
            .on_building_completed(&apartment, 5, &mut rng)
            .await
            .unwrap()
            .unwrap();
        let DomainEvent::ResidentSpawned(details) = event else {
            panic!("expected resident_spawned");
        };
        assert_eq!(details.resident_ids.len(), 8);

        let residents = store.list_residents_by_home(apartment.id).await.unwrap();
        assert_eq!(residents.len(), 8);
        assert!(residents.iter().all(|r| !r.is_employed() && r.salary == Decimal::ZERO));
        assert!(residents.iter().all(|r| r.spawned_at_tick == 5));
    }

    #[tokio::test]
    async fn house_spawns_household_in_range() {
        let (store, sim) = simulator();
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..10 {
            let house = building(BuildingType::House, 1);
            sim.on_building_completed(&house, 0, &mut rng).await.unwrap();
            let count = store.list_residents_by_home(house.id).await.unwrap().len();
            assert!((2..=4).contains(&count), "household of {count}");
        }
    }

    #[tokio::test]
    async fn non_residential_spawns_nobody() {
        let (store, sim) = simulator();
        let mut rng = StdRng::seed_from_u64(1);
        let shop = building(BuildingType::Shop, 1);
        assert!(sim.on_building_completed(&shop, 0, &mut rng).await.unwrap().is_none());
        assert!(store.list_residents().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn demolition_removes_homes_and_jobs() {
        let (store, sim) = simulator();
        let home = building(BuildingType::Apartment, 1);
        let work = building(BuildingType::Shop, 1);
        let mut rng = StdRng::seed_from_u64(1);
        sim.on_building_completed(&home, 0, &mut rng).await.unwrap();

        let other_home = BuildingId::new();
        let worker = Resident::new(other_home, 0);
        store.create_residents(std::slice::from_ref(&worker)).await.unwrap();
        store
            .update_employment(worker.id, Some(work.id), dec!(30))
            .await
            .unwrap();

        let DomainEvent::ResidentsDisplaced(home_gone) =
            sim.on_building_demolished(home.id).await.unwrap()
        else {
            panic!("expected residents_displaced");
        };
        assert_eq!(home_gone.removed, 4);

        let DomainEvent::ResidentsDisplaced(work_gone) =
            sim.on_building_demolished(work.id).await.unwrap()
        else {
            panic!("expected residents_displaced");
        };
        assert_eq!(work_gone.unemployed, 1);

        let remaining = store.list_residents().await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert!(remaining.iter().all(|r| r.work_building_id.is_none()));
    }

    #[tokio::test]
    async fn expansion_spawns_added_floors_only() {
        let (store, sim) = simulator();
        let mut apartment = building(BuildingType::Apartment, 1);
        apartment.floors = 4;
        let event = sim.on_building_expanded(&apartment, 1, 0).await.unwrap();
        assert!(event.is_some());
        assert_eq!(
            store.list_residents_by_home(apartment.id).await.unwrap().len(),
            12
        );

        let office = building(BuildingType::OfficeTower, 4);
        assert!(sim.on_building_expanded(&office, 1, 0).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn process_handles_notices_in_order() {
        let (store, sim) = simulator();
        let home = building(BuildingType::Apartment, 1);
        let mut rng = StdRng::seed_from_u64(1);
        let events = sim
            .process(
                vec![
                    LifecycleNotice::Completed(home.clone()),
                    LifecycleNotice::Demolished(home.id),
                ],
                0,
                &mut rng,
            )
            .await;
        assert_eq!(events.len(), 2);
        assert!(store.list_residents().await.unwrap().is_empty());
    }

    #[test]
    fn stats_count_employment_and_capacity() {
        let catalog = BuildingCatalog::new(&PopulationConfig::default());
        let home = building(BuildingType::Apartment, 1);
        let work = building(BuildingType::Factory, 1);
        let mut unfinished = building(BuildingType::OfficeTower, 1);
        unfinished.construction_progress = 50;

        let mut employed = Resident::new(home.id, 0);
        employed.work_building_id = Some(work.id);
        let idle = Resident::new(home.id, 0);

        let stats = population_stats(&catalog, &[home, work, unfinished], &[employed, idle]);
        assert_eq!(stats.total, 2);
        assert_eq!(stats.employed, 1);
        assert_eq!(stats.unemployed, 1);
        assert!((stats.unemployment_rate - 0.5).abs() < f64::EPSILON);
        assert_eq!(stats.housing_capacity, 4);
        assert_eq!(stats.job_capacity, 8);
    }

    #[test]
    fn house_counts_its_household_as_capacity() {
        let catalog = BuildingCatalog::new(&PopulationConfig::default());
        let house = building(BuildingType::House, 1);
        let household: Vec<Resident> = (0..3).map(|_| Resident::new(house.id, 0)).collect();
        let stats = population_stats(&catalog, &[house], &household);
        assert_eq!(stats.housing_capacity, 3);
    }

    #[test]
    fn empty_city_has_zero_rate() {
        let catalog = BuildingCatalog::new(&PopulationConfig::default());
        let stats = population_stats(&catalog, &[], &[]);
        assert_eq!(stats, PopulationStats::default());
    }
}
