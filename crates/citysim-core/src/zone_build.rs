//! New buildings on empty zoned parcels.
//!
//! Every `build_interval_ticks`, each empty zoned parcel next to a road gets
//! a chance to start construction of the building type its zoning maps to,
//! unless demand for that category is clearly negative.

use std::collections::HashSet;
use std::sync::Arc;

use citysim_db::{CityStore, DbError};
use citysim_types::{
    Building, BuildingId, DemandSignals, DomainEvent, OwnerId, ParcelId,
    ZoneBuildDetails,
};
use rand::Rng as _;
use tracing::{debug, info};

use crate::catalog::BuildingCatalog;
use crate::config::ZoningConfig;
use crate::demand::for_category;
use crate::error::SimError;
use crate::roads::RoadIndex;
use crate::{SimRng, every};

/// Starts construction on empty zoned parcels.
#[derive(Debug)]
pub struct ZoneBuildSimulator<S> {
    store: Arc<S>,
    config: ZoningConfig,
    last_processed_tick: Option<u64>,
}

impl<S: CityStore> ZoneBuildSimulator<S> {
    /// Create a simulator over the store.
    pub fn new(store: Arc<S>, config: &ZoningConfig) -> Self {
        Self {
            store,
            config: config.clone(),
            last_processed_tick: None,
        }
    }

    /// Whether a build pass would run at `tick`.
    pub fn is_due(&self, tick: u64) -> bool {
        every(tick, self.config.build_interval_ticks) && self.last_processed_tick != Some(tick)
    }

    /// Run a build pass if due.
    pub async fn run_cycle(
        &mut self,
        tick: u64,
        roads: &RoadIndex,
        demand: &DemandSignals,
        rng: &mut SimRng,
    ) -> Result<Vec<DomainEvent>, SimError> {
        if !self.is_due(tick) {
            return Ok(Vec::new());
        }
        self.last_processed_tick = Some(tick);
        self.build_pass(roads, demand, rng).await
    }

    /// Roll every candidate parcel once, ignoring the cadence.
    pub async fn build_pass(
        &self,
        roads: &RoadIndex,
        demand: &DemandSignals,
        rng: &mut SimRng,
    ) -> Result<Vec<DomainEvent>, SimError> {
        let parcels = self.store.list_parcels().await?;
        let buildings = self.store.list_buildings().await?;
        let occupied: HashSet<ParcelId> = buildings.iter().map(|b| b.parcel_id).collect();
        let powered = BuildingCatalog::city_powered(&buildings);

        let mut events = Vec::new();
        for parcel in parcels.iter().filter(|p| !occupied.contains(&p.id)) {
            let (Some(building_type), Some(category)) = (
                BuildingCatalog::zoned_type(parcel.zoning),
                BuildingCatalog::zoning_category(parcel.zoning),
            ) else {
                continue;
            };
            if for_category(demand, category) < self.config.build_demand_floor {
                continue;
            }
            if roads.has_road(parcel.x, parcel.y) || !roads.has_orthogonal_road(parcel.x, parcel.y)
            {
                continue;
            }
            if rng.random::<f64>() > self.config.build_chance {
                continue;
            }
            if self.store.get_building_on_parcel(parcel.id).await?.is_some() {
                continue;
            }

            let building = Building {
                id: BuildingId::new(),
                parcel_id: parcel.id,
                building_type,
                floors: 1,
                density: 1,
                construction_progress: 0,
                powered,
                owner_id: parcel.owner_id.unwrap_or(OwnerId::SYSTEM),
            };
            match self.store.create_building(&building).await {
                Ok(()) => {}
                Err(DbError::Conflict(reason)) => {
                    debug!(parcel_id = %parcel.id, %reason, "parcel taken during build");
                    continue;
                }
                Err(e) => return Err(e.into()),
            }

            debug!(
                building_id = %building.id,
                building_type = building_type.as_str(),
                x = parcel.x,
                y = parcel.y,
                "construction started"
            );
            events.push(DomainEvent::ZoneBuild(ZoneBuildDetails {
                building_id: building.id,
                parcel_id: parcel.id,
                building_type,
                owner_id: building.owner_id,
            }));
        }

        if !events.is_empty() {
            info!(started = events.len(), "zone build pass complete");
        }
        Ok(events)
    }
}
