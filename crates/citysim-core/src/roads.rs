//! Road adjacency index.
//!
//! Roads are stored per parcel; the simulators ask coordinate questions
//! ("is there a road next to this tile?"). [`RoadIndex`] resolves road
//! parcels to coordinates once and answers those queries from a hash set.
//! The engine caches the index and rebuilds it after `on_roads_changed`.

use std::collections::{HashMap, HashSet};

use citysim_db::{CityStore, DbError};
use citysim_types::{Parcel, ParcelId, Road};

/// Orthogonal neighbour offsets.
const ORTHOGONAL: [(i32, i32); 4] = [(0, -1), (1, 0), (0, 1), (-1, 0)];

/// All eight neighbour offsets.
const SURROUNDING: [(i32, i32); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

/// Set of tiles that carry a road.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoadIndex {
    tiles: HashSet<(i32, i32)>,
}

impl RoadIndex {
    /// Build the index from road rows and the parcels they sit on. Roads on
    /// unknown parcels are ignored.
    pub fn build(roads: &[Road], parcels: &[Parcel]) -> Self {
        let coords: HashMap<ParcelId, (i32, i32)> =
            parcels.iter().map(|p| (p.id, (p.x, p.y))).collect();
        let tiles = roads
            .iter()
            .filter_map(|road| coords.get(&road.parcel_id).copied())
            .collect();
        Self { tiles }
    }

    /// Load roads and parcels from the store and build the index.
    pub async fn load<S: CityStore>(store: &S) -> Result<Self, DbError> {
        let roads = store.list_roads().await?;
        let parcels = store.list_parcels().await?;
        Ok(Self::build(&roads, &parcels))
    }

    /// Build an index straight from coordinates.
    pub fn from_tiles(tiles: impl IntoIterator<Item = (i32, i32)>) -> Self {
        Self {
            tiles: tiles.into_iter().collect(),
        }
    }

    /// Whether the tile itself is a road.
    pub fn has_road(&self, x: i32, y: i32) -> bool {
        self.tiles.contains(&(x, y))
    }

    /// Whether any of the four orthogonal neighbours is a road.
    pub fn has_orthogonal_road(&self, x: i32, y: i32) -> bool {
        self.any_offset(x, y, &ORTHOGONAL)
    }

    /// Whether any of the eight surrounding tiles is a road.
    pub fn has_surrounding_road(&self, x: i32, y: i32) -> bool {
        self.any_offset(x, y, &SURROUNDING)
    }

    /// Number of road tiles.
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    /// Whether the city has no roads.
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    fn any_offset(&self, x: i32, y: i32, offsets: &[(i32, i32)]) -> bool {
        offsets.iter().any(|&(dx, dy)| {
            match (x.checked_add(dx), y.checked_add(dy)) {
                (Some(nx), Some(ny)) => self.tiles.contains(&(nx, ny)),
                _ => false,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use citysim_types::{RoadDirection, RoadId};

    use super::*;

    #[test]
    fn orthogonal_excludes_diagonals() {
        let index = RoadIndex::from_tiles([(1, 1)]);
        assert!(index.has_orthogonal_road(1, 0));
        assert!(index.has_orthogonal_road(0, 1));
        assert!(!index.has_orthogonal_road(0, 0));
        assert!(index.has_surrounding_road(0, 0));
        assert!(!index.has_surrounding_road(1, 1));
        assert!(index.has_road(1, 1));
    }

    #[test]
    fn build_resolves_parcel_coordinates() {
        let parcel = Parcel::new(4, -2);
        let road = Road {
            id: RoadId::new(),
            parcel_id: parcel.id,
            direction: RoadDirection::Horizontal,
            lanes: 2,
        };
        let orphan = Road {
            id: RoadId::new(),
            parcel_id: ParcelId::new(),
            direction: RoadDirection::Vertical,
            lanes: 2,
        };
        let index = RoadIndex::build(&[road, orphan], std::slice::from_ref(&parcel));
        assert_eq!(index.len(), 1);
        assert!(index.has_road(4, -2));
        assert!(index.has_orthogonal_road(4, -1));
    }

    #[test]
    fn empty_index() {
        let index = RoadIndex::default();
        assert!(index.is_empty());
        assert!(!index.has_surrounding_road(0, 0));
    }
}
