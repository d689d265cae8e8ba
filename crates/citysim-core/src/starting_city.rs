//! Seed layout for a freshly founded city.
//!
//! Lays out a square grid of `(2r + 1)^2` parcels around the origin:
//!
//! - a cross of roads along `x = 0` and `y = 0`
//! - a strip of water along the east edge
//! - one zoning per quadrant: residential (NE), suburban (NW),
//!   office (SE), industrial (SW)
//! - completed civic buildings on unzoned tiles next to the crossing:
//!   a police station, a park, and a power plant
//!
//! Everything else is left for the zone builder.

use citysim_db::CityStore;
use citysim_types::{
    Building, BuildingId, BuildingType, CONSTRUCTION_COMPLETE, OwnerId, Parcel, Road,
    RoadDirection, RoadId, Terrain, Zoning,
};
use tracing::info;

use crate::error::SimError;

/// Smallest grid radius that fits the civic buildings.
const MIN_RADIUS: i32 = 2;

/// Civic buildings placed at founding, with their tiles.
const CIVIC: [(BuildingType, i32, i32); 3] = [
    (BuildingType::PoliceStation, 1, 1),
    (BuildingType::Park, 1, -1),
    (BuildingType::PowerPlant, -1, 1),
];

/// IDs of the seeded civic buildings and entity counts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartingCity {
    /// Parcels created.
    pub parcels: u64,
    /// Road tiles created.
    pub roads: u64,
    /// The police station.
    pub police_station: BuildingId,
    /// The park.
    pub park: BuildingId,
    /// The power plant.
    pub power_plant: BuildingId,
}

/// Zoning and terrain for a tile of the starting grid.
fn layout(x: i32, y: i32, radius: i32) -> (Terrain, Zoning) {
    if x == radius {
        return (Terrain::Water, Zoning::None);
    }
    if x == 0 || y == 0 || CIVIC.iter().any(|&(_, cx, cy)| cx == x && cy == y) {
        return (Terrain::Land, Zoning::None);
    }
    let zoning = match (x > 0, y < 0) {
        (true, true) => Zoning::Residential,
        (false, true) => Zoning::Suburban,
        (true, false) => Zoning::Office,
        (false, false) => Zoning::Industrial,
    };
    (Terrain::Land, zoning)
}

fn road_direction(x: i32, y: i32) -> RoadDirection {
    match (x == 0, y == 0) {
        (true, true) => RoadDirection::Intersection,
        (true, false) => RoadDirection::Vertical,
        _ => RoadDirection::Horizontal,
    }
}

/// Seed the starting grid into an empty store.
pub async fn seed_starting_city<S: CityStore>(
    store: &S,
    radius: i32,
) -> Result<StartingCity, SimError> {
    let radius = radius.max(MIN_RADIUS);
    let mut parcels: u64 = 0;
    let mut roads: u64 = 0;
    let mut civic: Vec<(BuildingType, BuildingId)> = Vec::new();

    for y in -radius..=radius {
        for x in -radius..=radius {
            let (terrain, zoning) = layout(x, y, radius);
            let parcel = Parcel {
                terrain,
                zoning,
                ..Parcel::new(x, y)
            };
            store.save_parcel(&parcel).await?;
            parcels = parcels.saturating_add(1);

            if terrain == Terrain::Land && (x == 0 || y == 0) {
                store
                    .create_road(&Road {
                        id: RoadId::new(),
                        parcel_id: parcel.id,
                        direction: road_direction(x, y),
                        lanes: 2,
                    })
                    .await?;
                roads = roads.saturating_add(1);
            }

            if let Some(&(building_type, _, _)) =
                CIVIC.iter().find(|&&(_, cx, cy)| cx == x && cy == y)
            {
                let building = Building {
                    id: BuildingId::new(),
                    parcel_id: parcel.id,
                    building_type,
                    floors: 1,
                    density: 1,
                    construction_progress: CONSTRUCTION_COMPLETE,
                    powered: true,
                    owner_id: OwnerId::SYSTEM,
                };
                store.create_building(&building).await?;
                civic.push((building_type, building.id));
            }
        }
    }

    let find = |wanted: BuildingType| {
        civic
            .iter()
            .find(|(building_type, _)| *building_type == wanted)
            .map(|&(_, id)| id)
            .ok_or_else(|| SimError::missing("building", wanted.as_str()))
    };
    let city = StartingCity {
        parcels,
        roads,
        police_station: find(BuildingType::PoliceStation)?,
        park: find(BuildingType::Park)?,
        power_plant: find(BuildingType::PowerPlant)?,
    };
    info!(radius, parcels, roads, "starting city seeded");
    Ok(city)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use citysim_db::{
        BuildingRepository, InMemoryStore, ParcelRepository, RoadRepository,
    };
    use citysim_types::City;
    use rust_decimal::Decimal;

    use super::*;

    #[tokio::test]
    async fn seeds_grid_roads_and_civic_buildings() {
        let store = InMemoryStore::new(City::founded("Test", Decimal::ZERO));
        let city = seed_starting_city(&store, 3).await.unwrap();

        assert_eq!(city.parcels, 49);
        // Cross of 7 + 7 - 1 tiles, minus the one crossing the water edge.
        assert_eq!(city.roads, 12);
        assert_eq!(store.list_roads().await.unwrap().len(), 12);

        let station = store.get_building(city.police_station).await.unwrap().unwrap();
        assert!(station.is_complete());
        let parcel = store.get_parcel(station.parcel_id).await.unwrap().unwrap();
        assert_eq!((parcel.x, parcel.y, parcel.zoning), (1, 1, Zoning::None));

        let water = store.get_parcel_at(3, -2).await.unwrap().unwrap();
        assert_eq!(water.terrain, Terrain::Water);
    }

    #[test]
    fn quadrants_are_zoned() {
        assert_eq!(layout(2, -2, 5), (Terrain::Land, Zoning::Residential));
        assert_eq!(layout(-2, -2, 5), (Terrain::Land, Zoning::Suburban));
        assert_eq!(layout(2, 2, 5), (Terrain::Land, Zoning::Office));
        assert_eq!(layout(-2, 2, 5), (Terrain::Land, Zoning::Industrial));
        assert_eq!(layout(0, 3, 5), (Terrain::Land, Zoning::None));
        assert_eq!(layout(5, 0, 5), (Terrain::Water, Zoning::None));
    }

    #[test]
    fn road_directions() {
        assert_eq!(road_direction(0, 0), RoadDirection::Intersection);
        assert_eq!(road_direction(0, 4), RoadDirection::Vertical);
        assert_eq!(road_direction(4, 0), RoadDirection::Horizontal);
    }
}
