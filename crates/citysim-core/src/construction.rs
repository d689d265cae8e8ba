//! Construction progress.
//!
//! Every tick, each unfinished building advances by a fixed step. A building
//! that reaches 100 is complete: it emits `building_completed` and hands a
//! completion notice to the population stage.

use std::sync::Arc;

use citysim_db::CityStore;
use citysim_types::{
    Building, BuildingCompletedDetails, CONSTRUCTION_COMPLETE, DomainEvent,
};
use tracing::debug;

use crate::config::ConstructionConfig;
use crate::error::SimError;
use crate::population::LifecycleNotice;

/// What one construction pass produced.
#[derive(Debug, Default)]
pub struct ConstructionOutcome {
    /// `building_completed` events.
    pub events: Vec<DomainEvent>,
    /// Completion notices for the population stage.
    pub notices: Vec<LifecycleNotice>,
}

/// Advances construction on unfinished buildings.
#[derive(Debug)]
pub struct ConstructionSimulator<S> {
    store: Arc<S>,
    progress_per_tick: u8,
}

impl<S: CityStore> ConstructionSimulator<S> {
    /// Create a simulator over the store.
    pub const fn new(store: Arc<S>, config: &ConstructionConfig) -> Self {
        Self {
            store,
            progress_per_tick: config.progress_per_tick,
        }
    }

    /// Advance every unfinished building by one step.
    pub async fn simulate(&self) -> Result<ConstructionOutcome, SimError> {
        let mut outcome = ConstructionOutcome::default();
        if self.progress_per_tick == 0 {
            return Ok(outcome);
        }

        let buildings = self.store.list_buildings().await?;
        for building in buildings.into_iter().filter(|b| !b.is_complete()) {
            let progress = building
                .construction_progress
                .saturating_add(self.progress_per_tick)
                .min(CONSTRUCTION_COMPLETE);

            if !self
                .store
                .update_construction_progress(building.id, progress)
                .await?
            {
                continue;
            }

            if progress >= CONSTRUCTION_COMPLETE {
                debug!(
                    building_id = %building.id,
                    building_type = building.building_type.as_str(),
                    "building completed"
                );
                let completed = Building {
                    construction_progress: progress,
                    ..building
                };
                outcome
                    .events
                    .push(DomainEvent::BuildingCompleted(BuildingCompletedDetails {
                        building_id: completed.id,
                        building_type: completed.building_type,
                    }));
                outcome.notices.push(LifecycleNotice::Completed(completed));
            }
        }
        Ok(outcome)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use citysim_db::{BuildingRepository, InMemoryStore};
    use citysim_types::{BuildingId, BuildingType, City, OwnerId, Parcel};
    use rust_decimal::Decimal;

    use super::*;

    async fn store_with(progress: u8) -> (Arc<InMemoryStore>, BuildingId) {
        let store = Arc::new(InMemoryStore::new(City::founded("Test", Decimal::ZERO)));
        let parcel = Parcel::new(0, 0);
        let building = Building {
            id: BuildingId::new(),
            parcel_id: parcel.id,
            building_type: BuildingType::House,
            floors: 1,
            density: 1,
            construction_progress: progress,
            powered: true,
            owner_id: OwnerId::SYSTEM,
        };
        store.create_building(&building).await.unwrap();
        (store, building.id)
    }

    #[tokio::test]
    async fn progress_advances_without_completing() {
        let (store, id) = store_with(10).await;
        let sim = ConstructionSimulator::new(Arc::clone(&store), &ConstructionConfig::default());
        let outcome = sim.simulate().await.unwrap();
        assert!(outcome.events.is_empty());
        let building = store.get_building(id).await.unwrap().unwrap();
        assert_eq!(building.construction_progress, 11);
    }

    #[tokio::test]
    async fn reaching_100_completes_once() {
        let (store, id) = store_with(99).await;
        let sim = ConstructionSimulator::new(Arc::clone(&store), &ConstructionConfig::default());

        let outcome = sim.simulate().await.unwrap();
        assert_eq!(outcome.events.len(), 1);
        assert!(matches!(
            outcome.notices.first(),
            Some(LifecycleNotice::Completed(b)) if b.id == id && b.is_complete()
        ));

        let again = sim.simulate().await.unwrap();
        assert!(again.events.is_empty());
        assert!(again.notices.is_empty());
    }

    #[tokio::test]
    async fn large_steps_cap_at_100() {
        let (store, id) = store_with(95).await;
        let config = ConstructionConfig {
            progress_per_tick: 20,
        };
        let sim = ConstructionSimulator::new(Arc::clone(&store), &config);
        sim.simulate().await.unwrap();
        let building = store.get_building(id).await.unwrap().unwrap();
        assert_eq!(building.construction_progress, CONSTRUCTION_COMPLETE);
    }
}
