//! Daily densification of zoned buildings.
//!
//! At `evolution_hour`, once per day, each eligible building whose land
//! value supports a higher density (and whose category has demand) gains
//! exactly one density level. Eligible means completed, powered, standing
//! on a parcel zoned for its type, orthogonally next to a road, and below
//! the type's maximum density. Suburban zoning never evolves.
//!
//! Power is re-derived at the start of each cycle: every building is powered
//! exactly when the city has a completed power plant.

use std::collections::HashMap;
use std::sync::Arc;

use citysim_db::CityStore;
use citysim_types::{
    Building, CityTime, DemandSignals, DomainEvent, Parcel, ParcelId, Zoning, ZoneEvolvedDetails,
};
use tracing::{debug, info};

use crate::catalog::{BuildingCatalog, Housing};
use crate::config::ZoningConfig;
use crate::demand::for_category;
use crate::error::SimError;
use crate::population::LifecycleNotice;
use crate::roads::RoadIndex;

/// What one evolution cycle produced.
#[derive(Debug, Default)]
pub struct EvolutionOutcome {
    /// `zone_evolved` events.
    pub events: Vec<DomainEvent>,
    /// Expansion notices for residential buildings that gained floors.
    pub expansions: Vec<LifecycleNotice>,
}

/// Densifies buildings once per day.
#[derive(Debug)]
pub struct ZoneEvolutionSimulator<S> {
    store: Arc<S>,
    config: ZoningConfig,
    last_processed_day: Option<u64>,
}

impl<S: CityStore> ZoneEvolutionSimulator<S> {
    /// Create a simulator over the store.
    pub fn new(store: Arc<S>, config: &ZoningConfig) -> Self {
        Self {
            store,
            config: config.clone(),
            last_processed_day: None,
        }
    }

    /// Whether a cycle would run at `time`.
    pub fn is_due(&self, time: &CityTime) -> bool {
        time.hour == self.config.evolution_hour && self.last_processed_day != Some(time.day)
    }

    /// Run the cycle if due.
    pub async fn run_cycle(
        &mut self,
        time: &CityTime,
        roads: &RoadIndex,
        demand: &DemandSignals,
    ) -> Result<EvolutionOutcome, SimError> {
        if !self.is_due(time) {
            return Ok(EvolutionOutcome::default());
        }
        self.last_processed_day = Some(time.day);
        let outcome = self.evolve_all(roads, demand).await?;
        info!(day = time.day, evolved = outcome.events.len(), "zone evolution complete");
        Ok(outcome)
    }

    /// Target density a parcel's land value supports, capped at `max`.
    pub const fn target_density(&self, land_value: i32, max: u8) -> u8 {
        let target = if land_value >= self.config.high_density_land_value {
            3
        } else if land_value >= self.config.medium_density_land_value {
            2
        } else {
            1
        };
        if target < max { target } else { max }
    }

    /// Evolve every eligible building by one level, ignoring the cadence.
    pub async fn evolve_all(
        &self,
        roads: &RoadIndex,
        demand: &DemandSignals,
    ) -> Result<EvolutionOutcome, SimError> {
        let parcels: HashMap<ParcelId, Parcel> = self
            .store
            .list_parcels()
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();
        let mut buildings = self.store.list_buildings().await?;
        self.refresh_power(&mut buildings).await?;

        let mut outcome = EvolutionOutcome::default();
        for building in buildings {
            let Some(parcel) = parcels.get(&building.parcel_id) else {
                continue;
            };
            let Some(to_density) = self.next_density(&building, parcel, roads, demand) else {
                continue;
            };
            let floors = BuildingCatalog::floors_for_density(to_density);
            if !self
                .store
                .update_building_density(building.id, to_density, floors)
                .await?
            {
                continue;
            }

            debug!(
                building_id = %building.id,
                from = building.density,
                to = to_density,
                floors,
                "building evolved"
            );
            outcome
                .events
                .push(DomainEvent::ZoneEvolved(ZoneEvolvedDetails {
                    building_id: building.id,
                    parcel_id: parcel.id,
                    from_density: building.density,
                    to_density,
                    floors,
                }));
            if BuildingCatalog::spec(building.building_type).housing == Housing::PerFloor {
                let previous_floors = building.floors;
                outcome.expansions.push(LifecycleNotice::Expanded {
                    building: Building {
                        density: to_density,
                        floors,
                        ..building
                    },
                    previous_floors,
                });
            }
        }
        Ok(outcome)
    }

    /// The density a building should move to, or `None` if it stays.
    /// Bring every building's `powered` flag in line with whether the city
    /// currently has a completed power plant.
    async fn refresh_power(&self, buildings: &mut [Building]) -> Result<(), SimError> {
        let powered = BuildingCatalog::city_powered(buildings);
        if buildings.iter().all(|b| b.powered == powered) {
            return Ok(());
        }
        let changed = self.store.set_powered(powered).await?;
        for building in buildings.iter_mut() {
            building.powered = powered;
        }
        info!(powered, changed, "building power refreshed");
        Ok(())
    }

    fn next_density(
        &self,
        building: &Building,
        parcel: &Parcel,
        roads: &RoadIndex,
        demand: &DemandSignals,
    ) -> Option<u8> {
        if !building.is_complete() || !building.powered {
            return None;
        }
        if !parcel.zoning.is_zoned() || parcel.zoning == Zoning::Suburban {
            return None;
        }
        if BuildingCatalog::zoned_type(parcel.zoning) != Some(building.building_type) {
            return None;
        }
        if !roads.has_orthogonal_road(parcel.x, parcel.y) {
            return None;
        }

        let max = BuildingCatalog::spec(building.building_type).max_density;
        if building.density >= max {
            return None;
        }
        if building.density >= self.target_density(parcel.land_value, max) {
            return None;
        }

        let category = BuildingCatalog::zoning_category(parcel.zoning)?;
        if for_category(demand, category) < self.config.evolution_demand_threshold {
            return None;
        }
        building.density.checked_add(1)
    }
}
