//! Static per-building-type rules.
//!
//! [`BuildingCatalog`] answers the questions every simulator asks about a
//! building type: how many people it houses, how many jobs it offers and at
//! what wage, how far it can densify, and which demand category it serves.

use citysim_types::{Building, BuildingType, DemandCategory, Zoning};
use rand::Rng as _;
use rust_decimal::Decimal;

use crate::SimRng;
use crate::config::PopulationConfig;

/// Floors reached at each density level (index 0 is density 1).
const DENSITY_FLOORS: [u32; 3] = [1, 4, 10];

/// How a building houses residents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Housing {
    /// Not residential.
    None,
    /// A fixed number of units per floor (apartments).
    PerFloor,
    /// A single household of random size (houses).
    SingleUnit,
}

/// How a job slot's wage is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wage {
    /// The same wage for every hire.
    Fixed(u32),
    /// A fresh uniform draw in `[min, max]` per hire.
    Uniform {
        /// Lowest wage.
        min: u32,
        /// Highest wage.
        max: u32,
    },
}

impl Wage {
    /// Wage for one hire.
    pub fn draw(self, rng: &mut SimRng) -> Decimal {
        match self {
            Self::Fixed(amount) => Decimal::from(amount),
            Self::Uniform { min, max } => Decimal::from(rng.random_range(min..=max)),
        }
    }
}

/// Job table entry for an employer type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobEntry {
    /// Job slots per floor.
    pub jobs_per_unit: u32,
    /// Wage rule.
    pub wage: Wage,
}

/// Rules for one building type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildingSpec {
    /// Highest density the type can reach.
    pub max_density: u8,
    /// Residential capacity rule.
    pub housing: Housing,
    /// Jobs offered, if an employer.
    pub jobs: Option<JobEntry>,
    /// Civic buildings never attract crime.
    pub infrastructure: bool,
    /// Demand category the type supplies, if any.
    pub category: Option<DemandCategory>,
}

/// The building rules table, parameterized by population settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildingCatalog {
    units_per_floor: u32,
}

impl BuildingCatalog {
    /// Build the catalog from population settings.
    pub const fn new(population: &PopulationConfig) -> Self {
        Self {
            units_per_floor: population.units_per_floor,
        }
    }

    /// Rules for a building type.
    pub const fn spec(building_type: BuildingType) -> BuildingSpec {
        match building_type {
            BuildingType::House => BuildingSpec {
                max_density: 1,
                housing: Housing::SingleUnit,
                jobs: None,
                infrastructure: false,
                category: Some(DemandCategory::Residential),
            },
            BuildingType::Apartment => BuildingSpec {
                max_density: 3,
                housing: Housing::PerFloor,
                jobs: None,
                infrastructure: false,
                category: Some(DemandCategory::Residential),
            },
            BuildingType::OfficeTower => BuildingSpec {
                max_density: 3,
                housing: Housing::None,
                jobs: Some(JobEntry {
                    jobs_per_unit: 10,
                    wage: Wage::Fixed(60),
                }),
                infrastructure: false,
                category: Some(DemandCategory::Office),
            },
            BuildingType::Shop => BuildingSpec {
                max_density: 1,
                housing: Housing::None,
                jobs: Some(JobEntry {
                    jobs_per_unit: 4,
                    wage: Wage::Uniform { min: 25, max: 55 },
                }),
                infrastructure: false,
                category: Some(DemandCategory::Office),
            },
            BuildingType::Factory => BuildingSpec {
                max_density: 3,
                housing: Housing::None,
                jobs: Some(JobEntry {
                    jobs_per_unit: 8,
                    wage: Wage::Fixed(40),
                }),
                infrastructure: false,
                category: Some(DemandCategory::Industrial),
            },
            BuildingType::Park | BuildingType::Plaza => BuildingSpec {
                max_density: 1,
                housing: Housing::None,
                jobs: None,
                infrastructure: true,
                category: None,
            },
            BuildingType::PoliceStation | BuildingType::FireStation => BuildingSpec {
                max_density: 1,
                housing: Housing::None,
                jobs: Some(JobEntry {
                    jobs_per_unit: 5,
                    wage: Wage::Fixed(50),
                }),
                infrastructure: true,
                category: None,
            },
            BuildingType::PowerPlant => BuildingSpec {
                max_density: 1,
                housing: Housing::None,
                jobs: Some(JobEntry {
                    jobs_per_unit: 6,
                    wage: Wage::Fixed(55),
                }),
                infrastructure: true,
                category: None,
            },
        }
    }

    /// Building type the zone builder places on a zoned parcel.
    pub const fn zoned_type(zoning: Zoning) -> Option<BuildingType> {
        match zoning {
            Zoning::None => None,
            Zoning::Residential => Some(BuildingType::Apartment),
            Zoning::Suburban => Some(BuildingType::House),
            Zoning::Office => Some(BuildingType::OfficeTower),
            Zoning::Industrial => Some(BuildingType::Factory),
        }
    }

    /// Demand category a zoning serves.
    pub const fn zoning_category(zoning: Zoning) -> Option<DemandCategory> {
        match zoning {
            Zoning::None => None,
            Zoning::Residential | Zoning::Suburban => Some(DemandCategory::Residential),
            Zoning::Office => Some(DemandCategory::Office),
            Zoning::Industrial => Some(DemandCategory::Industrial),
        }
    }

    /// Floor count for a density level. Levels above the table keep the top
    /// entry.
    pub fn floors_for_density(density: u8) -> u32 {
        let index = usize::from(density.saturating_sub(1));
        DENSITY_FLOORS
            .get(index)
            .or_else(|| DENSITY_FLOORS.last())
            .copied()
            .unwrap_or(1)
    }

    /// Housing units in a building (zero for non-residential types).
    ///
    /// A house holds exactly the household that moved in at completion, so
    /// its capacity is `household`, the number of residents living there.
    pub fn housing_capacity(&self, building: &Building, household: u64) -> u64 {
        match Self::spec(building.building_type).housing {
            Housing::None => 0,
            Housing::PerFloor => {
                u64::from(self.units_per_floor).saturating_mul(u64::from(building.floors))
            }
            Housing::SingleUnit => household,
        }
    }

    /// Whether the city has a completed power plant.
    pub fn city_powered(buildings: &[Building]) -> bool {
        buildings
            .iter()
            .any(|b| b.building_type == BuildingType::PowerPlant && b.is_complete())
    }

    /// Residents to spawn when a density-scaled building gains floors.
    pub fn units_for_floors(&self, floors: u32) -> u64 {
        u64::from(self.units_per_floor).saturating_mul(u64::from(floors))
    }

    /// Job slots in a building (zero for non-employers).
    pub fn job_capacity(building: &Building) -> u64 {
        Self::spec(building.building_type)
            .jobs
            .map_or(0, |entry| {
                u64::from(entry.jobs_per_unit).saturating_mul(u64::from(building.floors))
            })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use citysim_types::{BuildingId, OwnerId, ParcelId};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    fn building(building_type: BuildingType, floors: u32) -> Building {
        Building {
            id: BuildingId::new(),
            parcel_id: ParcelId::new(),
            building_type,
            floors,
            density: 1,
            construction_progress: 100,
            powered: true,
            owner_id: OwnerId::SYSTEM,
        }
    }

    #[test]
    fn apartment_capacity_scales_with_floors() {
        let catalog = BuildingCatalog::new(&PopulationConfig::default());
        assert_eq!(
            catalog.housing_capacity(&building(BuildingType::Apartment, 4), 3),
            16
        );
        assert_eq!(catalog.housing_capacity(&building(BuildingType::Shop, 1), 0), 0);
    }

    #[test]
    fn house_capacity_is_its_household() {
        let catalog = BuildingCatalog::new(&PopulationConfig::default());
        let house = building(BuildingType::House, 1);
        assert_eq!(catalog.housing_capacity(&house, 2), 2);
        assert_eq!(catalog.housing_capacity(&house, 4), 4);
    }

    #[test]
    fn power_needs_a_completed_plant() {
        let mut plant = building(BuildingType::PowerPlant, 1);
        let shop = building(BuildingType::Shop, 1);
        assert!(!BuildingCatalog::city_powered(&[shop.clone()]));
        plant.construction_progress = 60;
        assert!(!BuildingCatalog::city_powered(&[shop.clone(), plant.clone()]));
        plant.construction_progress = 100;
        assert!(BuildingCatalog::city_powered(&[shop, plant]));
    }

    #[test]
    fn job_table() {
        assert_eq!(
            BuildingCatalog::job_capacity(&building(BuildingType::OfficeTower, 2)),
            20
        );
        assert_eq!(
            BuildingCatalog::job_capacity(&building(BuildingType::Factory, 1)),
            8
        );
        assert_eq!(
            BuildingCatalog::job_capacity(&building(BuildingType::Park, 1)),
            0
        );
    }

    #[test]
    fn shop_wage_is_drawn_in_range() {
        let mut rng = StdRng::seed_from_u64(9);
        let wage = BuildingCatalog::spec(BuildingType::Shop).jobs.unwrap().wage;
        for _ in 0..50 {
            let salary = wage.draw(&mut rng);
            assert!(salary >= Decimal::from(25) && salary <= Decimal::from(55));
        }
    }

    #[test]
    fn density_floor_table() {
        assert_eq!(BuildingCatalog::floors_for_density(1), 1);
        assert_eq!(BuildingCatalog::floors_for_density(2), 4);
        assert_eq!(BuildingCatalog::floors_for_density(3), 10);
        assert_eq!(BuildingCatalog::floors_for_density(7), 10);
    }

    #[test]
    fn zoning_maps_to_building_types() {
        assert_eq!(
            BuildingCatalog::zoned_type(Zoning::Residential),
            Some(BuildingType::Apartment)
        );
        assert_eq!(
            BuildingCatalog::zoned_type(Zoning::Suburban),
            Some(BuildingType::House)
        );
        assert_eq!(BuildingCatalog::zoned_type(Zoning::None), None);
        assert_eq!(
            BuildingCatalog::zoning_category(Zoning::Industrial),
            Some(DemandCategory::Industrial)
        );
    }

    #[test]
    fn infrastructure_flags() {
        assert!(BuildingCatalog::spec(BuildingType::PoliceStation).infrastructure);
        assert!(BuildingCatalog::spec(BuildingType::Park).infrastructure);
        assert!(!BuildingCatalog::spec(BuildingType::House).infrastructure);
    }
}
