//! Daily land value recompute.
//!
//! Once per day at `run_hour`, every parcel's value is rebuilt from scratch:
//!
//! ```text
//! base
//!   + park_bonus            if a park/plaza is within park_radius
//!   - pollution_penalty     if a factory is within pollution_radius
//!   + station_bonus * n     for n police/fire stations within station_radius
//!   + water_bonus           if water lies in the box around the parcel
//!   + road_bonus            if any of the 8 surrounding tiles is a road
//!   - floor(d / d_max * edge_penalty)
//! ```
//!
//! Distances to buildings are Manhattan; `d` is the Euclidean distance to
//! the centre of the parcel bounding box and `d_max` its half-diagonal. The
//! result is clamped to `[LAND_VALUE_MIN, LAND_VALUE_MAX]`. Only completed
//! buildings count, and only parcels whose value changed are written.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use citysim_db::CityStore;
use citysim_types::{
    Building, BuildingType, CityTime, DomainEvent, LandValueUpdate, LandValueUpdatedDetails,
    Parcel, ParcelId, Terrain,
};
use tracing::info;

use crate::config::LandValueConfig;
use crate::error::SimError;
use crate::roads::RoadIndex;

/// Fixed features of the city that every parcel is scored against.
#[derive(Debug, Default)]
struct Surroundings {
    amenities: Vec<(i32, i32)>,
    polluters: Vec<(i32, i32)>,
    stations: Vec<(i32, i32)>,
    water: HashSet<(i32, i32)>,
    center: (f64, f64),
    max_distance: f64,
}

impl Surroundings {
    fn gather(parcels: &[Parcel], buildings: &[Building]) -> Self {
        let coords: HashMap<ParcelId, (i32, i32)> =
            parcels.iter().map(|p| (p.id, (p.x, p.y))).collect();

        let mut surroundings = Self::default();
        for building in buildings.iter().filter(|b| b.is_complete()) {
            let Some(&tile) = coords.get(&building.parcel_id) else {
                continue;
            };
            match building.building_type {
                BuildingType::Park | BuildingType::Plaza => surroundings.amenities.push(tile),
                BuildingType::Factory => surroundings.polluters.push(tile),
                BuildingType::PoliceStation | BuildingType::FireStation => {
                    surroundings.stations.push(tile);
                }
                _ => {}
            }
        }

        surroundings.water = parcels
            .iter()
            .filter(|p| p.terrain == Terrain::Water)
            .map(|p| (p.x, p.y))
            .collect();

        let bounds = parcels.iter().fold(None, |acc: Option<(i32, i32, i32, i32)>, p| {
            Some(acc.map_or((p.x, p.x, p.y, p.y), |(min_x, max_x, min_y, max_y)| {
                (min_x.min(p.x), max_x.max(p.x), min_y.min(p.y), max_y.max(p.y))
            }))
        });
        if let Some((min_x, max_x, min_y, max_y)) = bounds {
            let (min_x, max_x) = (f64::from(min_x), f64::from(max_x));
            let (min_y, max_y) = (f64::from(min_y), f64::from(max_y));
            surroundings.center = (f64::midpoint(min_x, max_x), f64::midpoint(min_y, max_y));
            surroundings.max_distance = ((max_x - min_x) / 2.0).hypot((max_y - min_y) / 2.0);
        }
        surroundings
    }
}

/// Number of `tiles` within Manhattan `radius` of the parcel.
fn count_within(tiles: &[(i32, i32)], parcel: &Parcel, radius: u32) -> usize {
    tiles
        .iter()
        .filter(|&&(x, y)| parcel.manhattan_to(x, y) <= radius)
        .count()
}

/// Score one parcel. The result is clamped.
fn score(
    config: &LandValueConfig,
    parcel: &Parcel,
    around: &Surroundings,
    roads: &RoadIndex,
) -> i32 {
    let mut value = config.base;
    if count_within(&around.amenities, parcel, config.park_radius) > 0 {
        value = value.saturating_add(config.park_bonus);
    }
    if count_within(&around.polluters, parcel, config.pollution_radius) > 0 {
        value = value.saturating_sub(config.pollution_penalty);
    }
    let stations = count_within(&around.stations, parcel, config.station_radius);
    value = value.saturating_add(
        config
            .station_bonus
            .saturating_mul(i32::try_from(stations).unwrap_or(i32::MAX)),
    );

    let water_radius = config.water_radius;
    let water_nearby = around
        .water
        .iter()
        .any(|&(x, y)| parcel.x.abs_diff(x) <= water_radius && parcel.y.abs_diff(y) <= water_radius);
    if water_nearby {
        value = value.saturating_add(config.water_bonus);
    }

    if roads.has_surrounding_road(parcel.x, parcel.y) {
        value = value.saturating_add(config.road_bonus);
    }

    if around.max_distance > 0.0 {
        let (cx, cy) = around.center;
        let distance = (f64::from(parcel.x) - cx).hypot(f64::from(parcel.y) - cy);
        let penalty = (distance / around.max_distance * f64::from(config.edge_penalty))
            .floor()
            .clamp(0.0, f64::from(config.edge_penalty.max(0)));
        // Clamped into [0, edge_penalty] above.
        #[allow(clippy::cast_possible_truncation)]
        let penalty = penalty as i32;
        value = value.saturating_sub(penalty);
    }

    Parcel::clamp_land_value(value)
}

/// Compute the updates for every parcel whose value changes.
pub fn compute_land_values(
    config: &LandValueConfig,
    parcels: &[Parcel],
    buildings: &[Building],
    roads: &RoadIndex,
) -> Vec<LandValueUpdate> {
    let around = Surroundings::gather(parcels, buildings);
    parcels
        .iter()
        .filter_map(|parcel| {
            let land_value = score(config, parcel, &around, roads);
            (land_value != parcel.land_value).then_some(LandValueUpdate {
                parcel_id: parcel.id,
                land_value,
            })
        })
        .collect()
}

/// Runs the daily recompute.
#[derive(Debug)]
pub struct LandValueSimulator<S> {
    store: Arc<S>,
    config: LandValueConfig,
    last_processed_day: Option<u64>,
}

impl<S: CityStore> LandValueSimulator<S> {
    /// Create a simulator over the store.
    pub fn new(store: Arc<S>, config: &LandValueConfig) -> Self {
        Self {
            store,
            config: config.clone(),
            last_processed_day: None,
        }
    }

    /// Recompute if this is the run hour of a day not yet processed.
    pub async fn simulate(
        &mut self,
        time: &CityTime,
        roads: &RoadIndex,
    ) -> Result<Option<DomainEvent>, SimError> {
        if time.hour != self.config.run_hour || self.last_processed_day == Some(time.day) {
            return Ok(None);
        }
        self.last_processed_day = Some(time.day);
        self.recompute(roads, time.day).await.map(Some)
    }

    /// Recompute every parcel now and batch-write the changes.
    pub async fn recompute(&self, roads: &RoadIndex, day: u64) -> Result<DomainEvent, SimError> {
        let parcels = self.store.list_parcels().await?;
        let buildings = self.store.list_buildings().await?;
        let updates = compute_land_values(&self.config, &parcels, &buildings, roads);
        let changed = if updates.is_empty() {
            0
        } else {
            self.store.update_land_values(&updates).await?
        };
        info!(day, parcels = parcels.len(), changed, "land values updated");
        Ok(DomainEvent::LandValueUpdated(LandValueUpdatedDetails {
            day,
            changed,
        }))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use citysim_db::{BuildingRepository, InMemoryStore, ParcelRepository};
    use citysim_types::{BuildingId, City, LAND_VALUE_MAX, LAND_VALUE_MIN, OwnerId};
    use rust_decimal::Decimal;

    use super::*;

    fn building_on(parcel: &Parcel, building_type: BuildingType) -> Building {
        Building {
            id: BuildingId::new(),
            parcel_id: parcel.id,
            building_type,
            floors: 1,
            density: 1,
            construction_progress: 100,
            powered: true,
            owner_id: OwnerId::SYSTEM,
        }
    }

    fn value_of(updates: &[LandValueUpdate], parcel: &Parcel) -> i32 {
        updates
            .iter()
            .find(|u| u.parcel_id == parcel.id)
            .map_or(parcel.land_value, |u| u.land_value)
    }

    #[test]
    fn count_within_uses_manhattan_radius() {
        let parcel = Parcel::new(0, 0);
        let tiles = [(1, 1), (2, 0), (3, 0), (-1, -2)];
        assert_eq!(count_within(&tiles, &parcel, 2), 2);
        assert_eq!(count_within(&tiles, &parcel, 3), 4);
        assert_eq!(count_within(&[], &parcel, 10), 0);
    }

    #[test]
    fn lone_parcel_keeps_base() {
        let parcel = Parcel::new(0, 0);
        let updates = compute_land_values(
            &LandValueConfig::default(),
            std::slice::from_ref(&parcel),
            &[],
            &RoadIndex::default(),
        );
        assert!(updates.is_empty());
    }

    #[test]
    fn amenities_and_roads_raise_value() {
        let target = Parcel::new(0, 0);
        let park = Parcel::new(3, 0);
        let station = Parcel::new(0, 10);
        let parcels = vec![target.clone(), park.clone(), station.clone()];
        let buildings = vec![
            building_on(&park, BuildingType::Park),
            building_on(&station, BuildingType::PoliceStation),
        ];
        let roads = RoadIndex::from_tiles([(1, 1)]);
        let config = LandValueConfig {
            edge_penalty: 0,
            ..LandValueConfig::default()
        };

        let updates = compute_land_values(&config, &parcels, &buildings, &roads);
        // 50 + 10 park + 5 station + 20 road.
        assert_eq!(value_of(&updates, &target), 85);
    }

    #[test]
    fn factory_pollutes_once() {
        let target = Parcel::new(0, 0);
        let a = Parcel::new(2, 0);
        let b = Parcel::new(0, 2);
        let parcels = vec![target.clone(), a.clone(), b.clone()];
        let buildings = vec![
            building_on(&a, BuildingType::Factory),
            building_on(&b, BuildingType::Factory),
        ];
        let config = LandValueConfig {
            edge_penalty: 0,
            ..LandValueConfig::default()
        };
        let updates = compute_land_values(&config, &parcels, &buildings, &RoadIndex::default());
        assert_eq!(value_of(&updates, &target), 40);
    }

    #[test]
    fn water_box_and_edge_penalty() {
        let center = Parcel::new(0, 0);
        let mut lake = Parcel::new(1, 1);
        lake.terrain = Terrain::Water;
        let corner = Parcel::new(-1, -1);
        let parcels = vec![center.clone(), lake.clone(), corner.clone()];

        let updates = compute_land_values(
            &LandValueConfig::default(),
            &parcels,
            &[],
            &RoadIndex::default(),
        );
        // Centre: no edge penalty, water in its 3x3 box.
        assert_eq!(value_of(&updates, &center), 55);
        // Corner: full edge penalty, water two tiles away on each axis.
        assert_eq!(value_of(&updates, &corner), 20);
    }

    #[test]
    fn unfinished_buildings_are_ignored() {
        let target = Parcel::new(0, 0);
        let park = Parcel::new(1, 0);
        let mut unfinished = building_on(&park, BuildingType::Park);
        unfinished.construction_progress = 10;
        let config = LandValueConfig {
            edge_penalty: 0,
            ..LandValueConfig::default()
        };
        let updates = compute_land_values(
            &config,
            &[target.clone(), park],
            &[unfinished],
            &RoadIndex::default(),
        );
        assert_eq!(value_of(&updates, &target), 50);
    }

    #[test]
    fn values_are_clamped() {
        let target = Parcel::new(0, 0);
        let config = LandValueConfig {
            base: 1_000,
            edge_penalty: 0,
            ..LandValueConfig::default()
        };
        let high = compute_land_values(
            &config,
            std::slice::from_ref(&target),
            &[],
            &RoadIndex::default(),
        );
        assert_eq!(value_of(&high, &target), LAND_VALUE_MAX);

        let config = LandValueConfig {
            base: -50,
            ..config
        };
        let low = compute_land_values(
            &config,
            std::slice::from_ref(&target),
            &[],
            &RoadIndex::default(),
        );
        assert_eq!(value_of(&low, &target), LAND_VALUE_MIN);
    }

    #[tokio::test]
    async fn recompute_runs_once_per_day() {
        let store = Arc::new(InMemoryStore::new(City::founded("Test", Decimal::ZERO)));
        let parcel = store.get_or_create_parcel(0, 0).await.unwrap();
        let park = store.get_or_create_parcel(1, 0).await.unwrap();
        store
            .create_building(&building_on(&park, BuildingType::Park))
            .await
            .unwrap();
        let mut sim = LandValueSimulator::new(Arc::clone(&store), &LandValueConfig::default());
        let time = CityTime {
            tick: 600,
            hour: 1,
            day: 1,
            year: 1,
            is_daylight: false,
        };

        let event = sim.simulate(&time, &RoadIndex::default()).await.unwrap();
        assert!(matches!(
            event,
            Some(DomainEvent::LandValueUpdated(LandValueUpdatedDetails { day: 1, .. }))
        ));
        let updated = store.get_parcel(parcel.id).await.unwrap().unwrap();
        assert_ne!(updated.land_value, parcel.land_value);

        let again = sim.simulate(&time, &RoadIndex::default()).await.unwrap();
        assert!(again.is_none());
    }
}
