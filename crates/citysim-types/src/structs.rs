//! Core entity structs for the city simulation.
//!
//! These are the durable records owned by the persistence layer. The
//! simulators read and mutate them only through the repository traits in
//! `citysim-db`.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::enums::{BuildingType, CrimeStatus, CrimeType, OfficerStatus, RoadDirection, Terrain, Zoning};
use crate::ids::{BuildingId, CityId, CrimeId, OfficerId, OwnerId, ParcelId, ResidentId, RoadId};

/// Lowest land value a parcel can hold after a recompute.
pub const LAND_VALUE_MIN: i32 = 10;

/// Highest land value a parcel can hold after a recompute.
pub const LAND_VALUE_MAX: i32 = 300;

/// Land value assigned to a parcel before its first recompute.
pub const LAND_VALUE_DEFAULT: i32 = 50;

/// Construction progress at which a building counts as complete.
pub const CONSTRUCTION_COMPLETE: u8 = 100;

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

/// Calendar position derived from the tick counter.
///
/// `day` is the absolute day number since the city was founded (1-based),
/// so it never wraps at a year boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CityTime {
    /// Tick number this time was derived from.
    pub tick: u64,
    /// Hour of day, `0..hours_per_day`.
    pub hour: u32,
    /// Absolute day number, starting at 1.
    pub day: u64,
    /// Year number, starting at 1.
    pub year: u64,
    /// Whether the sun is up.
    pub is_daylight: bool,
}

// ---------------------------------------------------------------------------
// City
// ---------------------------------------------------------------------------

/// The city record. Exactly one per simulation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct City {
    /// Unique identifier.
    pub id: CityId,
    /// Display name.
    pub name: String,
    /// Last persisted tick.
    pub tick: u64,
    /// Last persisted hour of day.
    pub hour: u32,
    /// Last persisted absolute day.
    pub day: u64,
    /// Last persisted year.
    pub year: u64,
    /// Municipal treasury balance.
    pub treasury: Decimal,
}

impl City {
    /// Create a city at tick 0, day 1 of year 1.
    pub fn founded(name: &str, treasury: Decimal) -> Self {
        Self {
            id: CityId::new(),
            name: name.to_owned(),
            tick: 0,
            hour: 0,
            day: 1,
            year: 1,
            treasury,
        }
    }
}

// ---------------------------------------------------------------------------
// Parcel
// ---------------------------------------------------------------------------

/// One tile of land. Coordinates are unique within a city.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parcel {
    /// Unique identifier.
    pub id: ParcelId,
    /// Grid column.
    pub x: i32,
    /// Grid row.
    pub y: i32,
    /// Natural surface.
    pub terrain: Terrain,
    /// Zoning designation.
    pub zoning: Zoning,
    /// Desirability score in `[LAND_VALUE_MIN, LAND_VALUE_MAX]`.
    pub land_value: i32,
    /// Owner, or `None` when unclaimed.
    pub owner_id: Option<OwnerId>,
}

impl Parcel {
    /// Create an unowned, unzoned land parcel at the default land value.
    pub fn new(x: i32, y: i32) -> Self {
        Self {
            id: ParcelId::new(),
            x,
            y,
            terrain: Terrain::Land,
            zoning: Zoning::None,
            land_value: LAND_VALUE_DEFAULT,
            owner_id: None,
        }
    }

    /// Clamp a raw land value into the legal range.
    pub const fn clamp_land_value(raw: i32) -> i32 {
        if raw < LAND_VALUE_MIN {
            LAND_VALUE_MIN
        } else if raw > LAND_VALUE_MAX {
            LAND_VALUE_MAX
        } else {
            raw
        }
    }

    /// Manhattan distance to another grid coordinate.
    pub const fn manhattan_to(&self, x: i32, y: i32) -> u32 {
        self.x.abs_diff(x).saturating_add(self.y.abs_diff(y))
    }
}

/// A pending land value write produced by the daily recompute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LandValueUpdate {
    /// Parcel being updated.
    pub parcel_id: ParcelId,
    /// New clamped value.
    pub land_value: i32,
}

// ---------------------------------------------------------------------------
// Building
// ---------------------------------------------------------------------------

/// A building occupying a parcel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Building {
    /// Unique identifier.
    pub id: BuildingId,
    /// Parcel the building stands on. One building per parcel.
    pub parcel_id: ParcelId,
    /// Kind of building.
    pub building_type: BuildingType,
    /// Number of floors.
    pub floors: u32,
    /// Zoning density level, `1..=max_density`. Never decreases.
    pub density: u8,
    /// Construction progress in `0..=100`.
    pub construction_progress: u8,
    /// Whether the building receives power.
    pub powered: bool,
    /// Owner credited with payroll from this building.
    pub owner_id: OwnerId,
}

impl Building {
    /// Whether construction has finished.
    pub const fn is_complete(&self) -> bool {
        self.construction_progress >= CONSTRUCTION_COMPLETE
    }
}

// ---------------------------------------------------------------------------
// Resident
// ---------------------------------------------------------------------------

/// A person living in the city.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resident {
    /// Unique identifier.
    pub id: ResidentId,
    /// The building the resident lives in.
    pub home_building_id: BuildingId,
    /// The building the resident works in, if employed.
    pub work_building_id: Option<BuildingId>,
    /// Wage per payroll; zero while unemployed.
    pub salary: Decimal,
    /// Tick the resident moved in.
    pub spawned_at_tick: u64,
}

impl Resident {
    /// Create an unemployed resident living in `home`.
    pub fn new(home: BuildingId, tick: u64) -> Self {
        Self {
            id: ResidentId::new(),
            home_building_id: home,
            work_building_id: None,
            salary: Decimal::ZERO,
            spawned_at_tick: tick,
        }
    }

    /// Whether the resident currently holds a job.
    pub const fn is_employed(&self) -> bool {
        self.work_building_id.is_some()
    }
}

// ---------------------------------------------------------------------------
// Crime and policing
// ---------------------------------------------------------------------------

/// A crime reported at a building.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Crime {
    /// Unique identifier.
    pub id: CrimeId,
    /// Category of crime.
    pub crime_type: CrimeType,
    /// Parcel where the crime happened.
    pub parcel_id: ParcelId,
    /// Building targeted.
    pub building_id: BuildingId,
    /// Grid column of the crime scene.
    pub x: i32,
    /// Grid row of the crime scene.
    pub y: i32,
    /// Lifecycle state.
    pub status: CrimeStatus,
    /// Officer assigned once the crime is being responded to.
    pub responding_officer_id: Option<OfficerId>,
    /// Monetary damage caused.
    pub damage: Decimal,
    /// Tick the crime was reported.
    pub reported_at_tick: u64,
    /// Tick the crime was closed.
    pub resolved_at_tick: Option<u64>,
}

/// A continuous map position in tile units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Horizontal coordinate.
    pub x: f64,
    /// Vertical coordinate.
    pub y: f64,
}

impl Position {
    /// Position at the centre of a grid tile.
    pub fn at_tile(x: i32, y: i32) -> Self {
        Self {
            x: f64::from(x),
            y: f64::from(y),
        }
    }

    /// Manhattan distance to a grid tile.
    pub fn manhattan_to(self, x: i32, y: i32) -> f64 {
        (self.x - f64::from(x)).abs() + (self.y - f64::from(y)).abs()
    }

    /// Straight-line distance to another position.
    pub fn distance_to(self, other: Self) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }
}

/// A police officer attached to a station.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoliceOfficer {
    /// Unique identifier.
    pub id: OfficerId,
    /// Police station building the officer belongs to.
    pub station_id: BuildingId,
    /// Where the officer currently is.
    pub position: Position,
    /// Duty state.
    pub status: OfficerStatus,
    /// The crime being responded to. Set exactly when `status` is responding.
    pub assigned_crime_id: Option<CrimeId>,
}

// ---------------------------------------------------------------------------
// Roads
// ---------------------------------------------------------------------------

/// A road segment occupying a parcel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Road {
    /// Unique identifier.
    pub id: RoadId,
    /// Parcel the road occupies. One road per parcel.
    pub parcel_id: ParcelId,
    /// Orientation.
    pub direction: RoadDirection,
    /// Number of lanes.
    pub lanes: u8,
}

// ---------------------------------------------------------------------------
// Economy and logging
// ---------------------------------------------------------------------------

/// Balance held by an owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallet {
    /// Owner of the funds.
    pub owner_id: OwnerId,
    /// Current balance.
    pub balance: Decimal,
}

/// A structured activity log line (crime reports, resolutions).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityEntry {
    /// Tick the activity happened.
    pub tick: u64,
    /// Machine-readable kind, e.g. `crime_reported`.
    pub kind: String,
    /// Human-readable summary.
    pub message: String,
    /// Structured details.
    pub metadata: serde_json::Value,
    /// Wall-clock time of the entry.
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Aggregates
// ---------------------------------------------------------------------------

/// Population and employment figures.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct PopulationStats {
    /// Residents living in the city.
    pub total: u64,
    /// Residents with a job.
    pub employed: u64,
    /// Residents without a job.
    pub unemployed: u64,
    /// `unemployed / total`, or 0 for an empty city.
    pub unemployment_rate: f64,
    /// Housing units across completed residential buildings.
    pub housing_capacity: u64,
    /// Job slots across completed employers.
    pub job_capacity: u64,
}

/// Per-category supply signals, each roughly in `[-1, 1]`.
///
/// Positive means undersupplied (build more), negative means oversupplied.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct DemandSignals {
    /// Housing demand.
    pub residential: f64,
    /// Office/commercial job demand.
    pub office: f64,
    /// Industrial job demand.
    pub industrial: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn land_value_clamps_to_range() {
        assert_eq!(Parcel::clamp_land_value(-40), LAND_VALUE_MIN);
        assert_eq!(Parcel::clamp_land_value(5), LAND_VALUE_MIN);
        assert_eq!(Parcel::clamp_land_value(120), 120);
        assert_eq!(Parcel::clamp_land_value(999), LAND_VALUE_MAX);
    }

    #[test]
    fn manhattan_distance_is_symmetric() {
        let parcel = Parcel::new(3, -2);
        assert_eq!(parcel.manhattan_to(0, 0), 5);
        assert_eq!(Parcel::new(0, 0).manhattan_to(3, -2), 5);
    }

    #[test]
    fn position_distances() {
        let officer = Position::at_tile(0, 0);
        assert!((officer.manhattan_to(3, 4) - 7.0).abs() < f64::EPSILON);
        assert!((officer.distance_to(Position::at_tile(3, 4)) - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn new_resident_is_unemployed() {
        let resident = Resident::new(BuildingId::new(), 7);
        assert!(!resident.is_employed());
        assert_eq!(resident.salary, Decimal::ZERO);
        assert_eq!(resident.spawned_at_tick, 7);
    }
}
