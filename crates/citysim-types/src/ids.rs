//! Type-safe identifier wrappers around [`Uuid`].
//!
//! Every entity in the city has a strongly-typed ID so a building ID can
//! never be passed where a parcel ID is expected. IDs use UUID v7
//! (time-ordered) for efficient database indexing.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Generates a newtype wrapper around [`Uuid`] with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a new identifier using UUID v7 (time-ordered).
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Return the inner [`Uuid`] value.
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id! {
    /// Unique identifier for a city.
    CityId
}

define_id! {
    /// Unique identifier for a parcel (one grid tile of land).
    ParcelId
}

define_id! {
    /// Unique identifier for a building standing on a parcel.
    BuildingId
}

define_id! {
    /// Unique identifier for a resident.
    ResidentId
}

define_id! {
    /// Unique identifier for a crime record.
    CrimeId
}

define_id! {
    /// Unique identifier for a police officer.
    OfficerId
}

define_id! {
    /// Unique identifier for a road segment.
    RoadId
}

define_id! {
    /// Unique identifier for a wallet owner (player or system).
    OwnerId
}

impl OwnerId {
    /// The system owner that holds unclaimed parcels and the buildings
    /// constructed on them.
    pub const SYSTEM: Self = Self(Uuid::nil());

    /// Whether this is the system owner.
    pub fn is_system(self) -> bool {
        self.0.is_nil()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_distinct_types() {
        let building = BuildingId::new();
        let parcel = ParcelId::new();
        assert_ne!(building.into_inner(), Uuid::nil());
        assert_ne!(parcel.into_inner(), Uuid::nil());
    }

    #[test]
    fn id_serializes_as_bare_uuid() {
        let id = CrimeId::new();
        let json = serde_json::to_string(&id).ok();
        assert_eq!(json, Some(format!("\"{}\"", id.into_inner())));
    }

    #[test]
    fn system_owner_is_nil() {
        assert!(OwnerId::SYSTEM.is_system());
        assert!(!OwnerId::new().is_system());
    }
}
