//! Events published by the simulation engine.
//!
//! The engine publishes [`EngineEvent`] values on a broadcast channel. Each
//! tick produces one [`EngineEvent::Tick`] carrying every [`DomainEvent`]
//! the subsystems emitted during that tick, in subsystem order. Both enums
//! are closed and serialize with a `type` tag so subscribers can forward
//! them to any transport unchanged.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::enums::{BuildingType, CrimeType};
use crate::ids::{BuildingId, CrimeId, OfficerId, OwnerId, ParcelId, ResidentId};
use crate::structs::CityTime;

// ---------------------------------------------------------------------------
// Engine-level events
// ---------------------------------------------------------------------------

/// Top-level message on the engine's broadcast channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineEvent {
    /// A tick completed.
    Tick(TickEvent),
    /// A new day began.
    DayStarted(TimeEvent),
    /// Daylight ended.
    NightStarted(TimeEvent),
    /// The tick loop started.
    Started(LifecycleEvent),
    /// The tick loop stopped.
    Stopped(LifecycleEvent),
}

impl EngineEvent {
    /// Wire name of the event.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Tick(_) => "tick",
            Self::DayStarted(_) => "day_started",
            Self::NightStarted(_) => "night_started",
            Self::Started(_) => "started",
            Self::Stopped(_) => "stopped",
        }
    }
}

/// Payload of [`EngineEvent::Tick`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickEvent {
    /// Tick number that just ran.
    pub tick: u64,
    /// Calendar position after the tick.
    pub time: CityTime,
    /// Domain events emitted during the tick.
    pub events: Vec<DomainEvent>,
}

/// Payload of day/night boundary events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeEvent {
    /// Calendar position at the boundary.
    pub time: CityTime,
}

/// Payload of start/stop events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleEvent {
    /// Tick counter at the moment of the transition.
    pub tick: u64,
}

// ---------------------------------------------------------------------------
// Domain events
// ---------------------------------------------------------------------------

/// Something a subsystem changed in the city.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    /// Construction of a building finished.
    BuildingCompleted(BuildingCompletedDetails),
    /// Residents moved into a building.
    ResidentSpawned(ResidentSpawnedDetails),
    /// Residents lost their home or job to a demolition.
    ResidentsDisplaced(ResidentsDisplacedDetails),
    /// A resident was hired.
    ResidentEmployed(ResidentEmployedDetails),
    /// Daily wages were paid out.
    PayrollProcessed(PayrollProcessedDetails),
    /// Officers joined a police station.
    OfficersSpawned(OfficersSpawnedDetails),
    /// A crime was reported.
    CrimeReported(CrimeReportedDetails),
    /// A crime was closed.
    CrimeResolved(CrimeResolvedDetails),
    /// The daily land value recompute finished.
    LandValueUpdated(LandValueUpdatedDetails),
    /// A building gained one density level.
    ZoneEvolved(ZoneEvolvedDetails),
    /// The zone builder started a new building.
    ZoneBuild(ZoneBuildDetails),
}

impl DomainEvent {
    /// Wire name of the event.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::BuildingCompleted(_) => "building_completed",
            Self::ResidentSpawned(_) => "resident_spawned",
            Self::ResidentsDisplaced(_) => "residents_displaced",
            Self::ResidentEmployed(_) => "resident_employed",
            Self::PayrollProcessed(_) => "payroll_processed",
            Self::OfficersSpawned(_) => "officers_spawned",
            Self::CrimeReported(_) => "crime_reported",
            Self::CrimeResolved(_) => "crime_resolved",
            Self::LandValueUpdated(_) => "land_value_updated",
            Self::ZoneEvolved(_) => "zone_evolved",
            Self::ZoneBuild(_) => "zone_build",
        }
    }
}

/// Details for [`DomainEvent::BuildingCompleted`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildingCompletedDetails {
    /// The finished building.
    pub building_id: BuildingId,
    /// Its type.
    pub building_type: BuildingType,
}

/// Details for [`DomainEvent::ResidentSpawned`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResidentSpawnedDetails {
    /// Home of the new residents.
    pub building_id: BuildingId,
    /// The residents created.
    pub resident_ids: Vec<ResidentId>,
}

/// Details for [`DomainEvent::ResidentsDisplaced`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResidentsDisplacedDetails {
    /// The demolished building.
    pub building_id: BuildingId,
    /// Residents removed because it was their home.
    pub removed: u64,
    /// Residents who lost their job there.
    pub unemployed: u64,
}

/// Details for [`DomainEvent::ResidentEmployed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResidentEmployedDetails {
    /// The hired resident.
    pub resident_id: ResidentId,
    /// The employer.
    pub building_id: BuildingId,
    /// Agreed wage.
    pub salary: Decimal,
}

/// Details for [`DomainEvent::PayrollProcessed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayrollProcessedDetails {
    /// Day the payroll ran on.
    pub day: u64,
    /// Number of wages paid.
    pub employees: u64,
    /// Sum of wages paid.
    pub total: Decimal,
}

/// Details for [`DomainEvent::OfficersSpawned`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfficersSpawnedDetails {
    /// Station that received the officers.
    pub station_id: BuildingId,
    /// The new officers.
    pub officer_ids: Vec<OfficerId>,
}

/// Details for [`DomainEvent::CrimeReported`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrimeReportedDetails {
    /// The new crime.
    pub crime_id: CrimeId,
    /// Its category.
    pub crime_type: CrimeType,
    /// Targeted building.
    pub building_id: BuildingId,
    /// Grid column.
    pub x: i32,
    /// Grid row.
    pub y: i32,
    /// Damage caused.
    pub damage: Decimal,
}

/// Details for [`DomainEvent::CrimeResolved`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrimeResolvedDetails {
    /// The closed crime.
    pub crime_id: CrimeId,
    /// Officer who responded, if any did.
    pub officer_id: Option<OfficerId>,
    /// Whether the suspect was arrested (otherwise they escaped).
    pub arrested: bool,
}

/// Details for [`DomainEvent::LandValueUpdated`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LandValueUpdatedDetails {
    /// Day of the recompute.
    pub day: u64,
    /// Parcels whose value changed.
    pub changed: u64,
}

/// Details for [`DomainEvent::ZoneEvolved`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneEvolvedDetails {
    /// The densified building.
    pub building_id: BuildingId,
    /// Its parcel.
    pub parcel_id: ParcelId,
    /// Density before.
    pub from_density: u8,
    /// Density after.
    pub to_density: u8,
    /// Floor count after.
    pub floors: u32,
}

/// Details for [`DomainEvent::ZoneBuild`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneBuildDetails {
    /// The new building.
    pub building_id: BuildingId,
    /// Parcel it was placed on.
    pub parcel_id: ParcelId,
    /// Its type.
    pub building_type: BuildingType,
    /// Owner of the new building.
    pub owner_id: OwnerId,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn domain_event_serializes_with_type_tag() {
        let event = DomainEvent::ResidentEmployed(ResidentEmployedDetails {
            resident_id: ResidentId::new(),
            building_id: BuildingId::new(),
            salary: dec!(40),
        });
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "resident_employed");
        assert_eq!(json["type"], event.name());
    }

    #[test]
    fn tick_event_nests_domain_events() {
        let time = CityTime {
            tick: 600,
            hour: 1,
            day: 1,
            year: 1,
            is_daylight: false,
        };
        let event = EngineEvent::Tick(TickEvent {
            tick: 600,
            time,
            events: vec![DomainEvent::LandValueUpdated(LandValueUpdatedDetails {
                day: 1,
                changed: 3,
            })],
        });
        let json = serde_json::to_string(&event).unwrap();
        let back: EngineEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
        assert_eq!(back.name(), "tick");
    }
}
