//! Enumeration types for the city simulation.
//!
//! Every enum that is persisted has a stable lowercase string form
//! ([`as_str`] / [`FromStr`]) used as the column value in SQL stores and
//! as the `type` tag in serialized events.
//!
//! [`as_str`]: Terrain::as_str
//! [`FromStr`]: core::str::FromStr

use core::str::FromStr;

use serde::{Deserialize, Serialize};

/// Returned when a stored string does not name a known enum variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} value: {value:?}")]
pub struct UnknownVariant {
    /// Name of the enum being parsed.
    pub kind: &'static str,
    /// The offending input.
    pub value: String,
}

/// Implements `as_str`, `FromStr`, and `Display` for a fieldless enum.
macro_rules! string_enum {
    ($name:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// Stable lowercase name used in storage and event payloads.
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    other => Err(UnknownVariant {
                        kind: $kind,
                        value: other.to_owned(),
                    }),
                }
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Land
// ---------------------------------------------------------------------------

/// The natural surface of a parcel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Terrain {
    /// Buildable dry land.
    Land,
    /// River, lake, or coastline. Raises nearby land value.
    Water,
    /// Wooded land.
    Forest,
}

string_enum!(Terrain, "terrain", {
    Land => "land",
    Water => "water",
    Forest => "forest",
});

/// Zoning designation painted onto a parcel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Zoning {
    /// Not zoned; the zone builder ignores it.
    None,
    /// Density-scaled housing (apartments).
    Residential,
    /// Single-unit detached housing. Never densifies.
    Suburban,
    /// Offices and commerce.
    Office,
    /// Factories and warehouses.
    Industrial,
}

string_enum!(Zoning, "zoning", {
    None => "none",
    Residential => "residential",
    Suburban => "suburban",
    Office => "office",
    Industrial => "industrial",
});

impl Zoning {
    /// Whether the parcel carries any zoning at all.
    pub const fn is_zoned(self) -> bool {
        !matches!(self, Self::None)
    }
}

// ---------------------------------------------------------------------------
// Buildings
// ---------------------------------------------------------------------------

/// The kind of building standing on a parcel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildingType {
    /// Single-unit detached house on suburban zoning.
    House,
    /// Multi-unit housing whose capacity scales with floors.
    Apartment,
    /// Office block on office zoning.
    OfficeTower,
    /// Small storefront. Pays a variable wage.
    Shop,
    /// Industrial building; pollutes its surroundings.
    Factory,
    /// Public green space.
    Park,
    /// Paved public square.
    Plaza,
    /// Houses and dispatches police officers.
    PoliceStation,
    /// Fire service building.
    FireStation,
    /// Supplies power to the city's buildings.
    PowerPlant,
}

string_enum!(BuildingType, "building type", {
    House => "house",
    Apartment => "apartment",
    OfficeTower => "office_tower",
    Shop => "shop",
    Factory => "factory",
    Park => "park",
    Plaza => "plaza",
    PoliceStation => "police_station",
    FireStation => "fire_station",
    PowerPlant => "power_plant",
});

/// Supply/demand category used by the demand calculator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DemandCategory {
    /// Housing.
    Residential,
    /// Office and commercial jobs.
    Office,
    /// Industrial jobs.
    Industrial,
}

string_enum!(DemandCategory, "demand category", {
    Residential => "residential",
    Office => "office",
    Industrial => "industrial",
});

// ---------------------------------------------------------------------------
// Roads
// ---------------------------------------------------------------------------

/// Orientation of a road segment on its parcel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoadDirection {
    /// Runs east-west.
    Horizontal,
    /// Runs north-south.
    Vertical,
    /// Crossing of both directions.
    Intersection,
}

string_enum!(RoadDirection, "road direction", {
    Horizontal => "horizontal",
    Vertical => "vertical",
    Intersection => "intersection",
});

// ---------------------------------------------------------------------------
// Crime and policing
// ---------------------------------------------------------------------------

/// Category of a generated crime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrimeType {
    /// Property taken from a person or storefront.
    Theft,
    /// Break-in at a building.
    Burglary,
    /// Property damage.
    Vandalism,
    /// Physical attack.
    Assault,
}

string_enum!(CrimeType, "crime type", {
    Theft => "theft",
    Burglary => "burglary",
    Vandalism => "vandalism",
    Assault => "assault",
});

/// Lifecycle state of a crime.
///
/// Transitions only move forward: `Active -> Responding -> Resolved`, or
/// `Active -> Resolved` when nobody ever responds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrimeStatus {
    /// Reported, awaiting an officer.
    Active,
    /// An officer is en route.
    Responding,
    /// Closed. Terminal.
    Resolved,
}

string_enum!(CrimeStatus, "crime status", {
    Active => "active",
    Responding => "responding",
    Resolved => "resolved",
});

impl CrimeStatus {
    /// Whether moving from `self` to `next` is a legal forward transition.
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Active, Self::Responding | Self::Resolved) | (Self::Responding, Self::Resolved)
        )
    }
}

/// Duty state of a police officer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OfficerStatus {
    /// Free to be dispatched.
    Available,
    /// Travelling to (or at) an assigned crime.
    Responding,
}

string_enum!(OfficerStatus, "officer status", {
    Available => "available",
    Responding => "responding",
});

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn building_type_string_roundtrip() {
        for ty in BuildingType::ALL {
            assert_eq!(ty.as_str().parse::<BuildingType>().unwrap(), *ty);
        }
    }

    #[test]
    fn unknown_string_is_rejected() {
        let err = "skyscraper".parse::<BuildingType>().unwrap_err();
        assert_eq!(err.kind, "building type");
        assert_eq!(err.value, "skyscraper");
    }

    #[test]
    fn crime_status_only_moves_forward() {
        assert!(CrimeStatus::Active.can_transition_to(CrimeStatus::Responding));
        assert!(CrimeStatus::Active.can_transition_to(CrimeStatus::Resolved));
        assert!(CrimeStatus::Responding.can_transition_to(CrimeStatus::Resolved));
        assert!(!CrimeStatus::Resolved.can_transition_to(CrimeStatus::Active));
        assert!(!CrimeStatus::Resolved.can_transition_to(CrimeStatus::Responding));
        assert!(!CrimeStatus::Responding.can_transition_to(CrimeStatus::Active));
    }

    #[test]
    fn serde_matches_storage_names() {
        let json = serde_json::to_string(&BuildingType::OfficeTower).unwrap();
        assert_eq!(json, "\"office_tower\"");
        let zoning: Zoning = serde_json::from_str("\"suburban\"").unwrap();
        assert_eq!(zoning, Zoning::Suburban);
    }
}
