//! Supply/demand signals per zoning category.
//!
//! Each signal compares available capacity against the people who need it:
//!
//! ```text
//! signal = clamp((needing - available) / max(needing, available, 1), -1, 1)
//! ```
//!
//! Positive means undersupplied (build more), negative means oversupplied.
//! Only completed buildings count as capacity. Signals are recomputed on
//! demand and never cached across ticks.

use std::collections::HashMap;

use citysim_db::{CityStore, DbError};
use citysim_types::{Building, BuildingId, DemandCategory, DemandSignals, Resident};

use crate::catalog::BuildingCatalog;
use crate::config::PopulationConfig;
use crate::count_as_f64;

/// Signed demand signal for one category.
pub fn signal(available: f64, needing: f64) -> f64 {
    let scale = needing.max(available).max(1.0);
    ((needing - available) / scale).clamp(-1.0, 1.0)
}

/// Look up the signal for a category.
pub const fn for_category(signals: &DemandSignals, category: DemandCategory) -> f64 {
    match category {
        DemandCategory::Residential => signals.residential,
        DemandCategory::Office => signals.office,
        DemandCategory::Industrial => signals.industrial,
    }
}

/// Computes [`DemandSignals`] from the current building stock and residents.
#[derive(Debug, Clone, PartialEq)]
pub struct DemandCalculator {
    catalog: BuildingCatalog,
    base_inflow: f64,
    office_share: f64,
    industrial_share: f64,
}

impl DemandCalculator {
    /// Create a calculator from population settings.
    pub const fn new(population: &PopulationConfig) -> Self {
        Self {
            catalog: BuildingCatalog::new(population),
            base_inflow: population.base_inflow,
            office_share: population.office_share,
            industrial_share: population.industrial_share,
        }
    }

    /// Compute signals from in-memory rows.
    pub fn from_world(&self, buildings: &[Building], residents: &[Resident]) -> DemandSignals {
        let mut housed: HashMap<BuildingId, u64> = HashMap::new();
        let mut employed: HashMap<BuildingId, u64> = HashMap::new();
        let mut unemployed: u64 = 0;
        for resident in residents {
            let count = housed.entry(resident.home_building_id).or_insert(0);
            *count = count.saturating_add(1);
            match resident.work_building_id {
                Some(work) => {
                    let count = employed.entry(work).or_insert(0);
                    *count = count.saturating_add(1);
                }
                None => unemployed = unemployed.saturating_add(1),
            }
        }

        let mut vacant_housing: u64 = 0;
        let mut open_jobs: u64 = 0;
        let mut open_office: u64 = 0;
        let mut open_industrial: u64 = 0;

        for building in buildings.iter().filter(|b| b.is_complete()) {
            let occupied = housed.get(&building.id).copied().unwrap_or(0);
            let housing = self.catalog.housing_capacity(building, occupied);
            if housing > 0 {
                vacant_housing = vacant_housing.saturating_add(housing.saturating_sub(occupied));
            }

            let jobs = BuildingCatalog::job_capacity(building);
            if jobs > 0 {
                let filled = employed.get(&building.id).copied().unwrap_or(0);
                let open = jobs.saturating_sub(filled);
                open_jobs = open_jobs.saturating_add(open);
                match BuildingCatalog::spec(building.building_type).category {
                    Some(DemandCategory::Office) => open_office = open_office.saturating_add(open),
                    Some(DemandCategory::Industrial) => {
                        open_industrial = open_industrial.saturating_add(open);
                    }
                    Some(DemandCategory::Residential) | None => {}
                }
            }
        }

        let seekers = count_as_f64(unemployed);
        DemandSignals {
            residential: signal(
                count_as_f64(vacant_housing),
                count_as_f64(open_jobs) + self.base_inflow,
            ),
            office: signal(count_as_f64(open_office), seekers * self.office_share),
            industrial: signal(
                count_as_f64(open_industrial),
                seekers * self.industrial_share,
            ),
        }
    }

    /// Compute signals from the store.
    pub async fn compute<S: CityStore>(&self, store: &S) -> Result<DemandSignals, DbError> {
        let buildings = store.list_buildings().await?;
        let residents = store.list_residents().await?;
        Ok(self.from_world(&buildings, &residents))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use citysim_types::{BuildingType, OwnerId, ParcelId};

    use super::*;

    fn building(building_type: BuildingType, floors: u32, progress: u8) -> Building {
        Building {
            id: BuildingId::new(),
            parcel_id: ParcelId::new(),
            building_type,
            floors,
            density: 1,
            construction_progress: progress,
            powered: true,
            owner_id: OwnerId::SYSTEM,
        }
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn signal_formula() {
        assert!(approx(signal(0.0, 10.0), 1.0));
        assert!(approx(signal(10.0, 0.0), -1.0));
        assert!(approx(signal(5.0, 10.0), 0.5));
        assert!(approx(signal(0.0, 0.0), 0.0));
        assert!(approx(signal(0.0, 0.5), 0.5));
    }

    #[test]
    fn empty_city_wants_housing_only() {
        let calc = DemandCalculator::new(&PopulationConfig::default());
        let signals = calc.from_world(&[], &[]);
        assert!(approx(signals.residential, 1.0));
        assert!(approx(signals.office, 0.0));
        assert!(approx(signals.industrial, 0.0));
    }

    #[test]
    fn vacant_office_jobs_lower_office_demand() {
        let calc = DemandCalculator::new(&PopulationConfig::default());
        let office = building(BuildingType::OfficeTower, 1, 100);
        let home = building(BuildingType::Apartment, 1, 100);
        let residents: Vec<Resident> = (0..4).map(|_| Resident::new(home.id, 0)).collect();

        let signals = calc.from_world(&[office, home], &residents);
        // 10 open office jobs vs 4 unemployed * 0.5 = 2 seekers.
        assert!(approx(signals.office, (2.0 - 10.0) / 10.0));
        // No vacant housing; 10 open jobs + 10 inflow need homes.
        assert!(approx(signals.residential, 1.0));
    }

    #[test]
    fn unfinished_buildings_do_not_count() {
        let calc = DemandCalculator::new(&PopulationConfig::default());
        let factory = building(BuildingType::Factory, 1, 40);
        let home = building(BuildingType::Apartment, 1, 100);
        let residents: Vec<Resident> = (0..4).map(|_| Resident::new(home.id, 0)).collect();
        let signals = calc.from_world(&[factory, home], &residents);
        assert!(approx(signals.industrial, 1.0));
    }

    #[test]
    fn occupied_house_has_no_vacancy() {
        let calc = DemandCalculator::new(&PopulationConfig::default());
        let house = building(BuildingType::House, 1, 100);
        let residents: Vec<Resident> = (0..2).map(|_| Resident::new(house.id, 0)).collect();
        let signals = calc.from_world(&[house], &residents);
        // Nothing vacant; only the base inflow needs homes.
        assert!(approx(signals.residential, 1.0));
    }

    #[test]
    fn category_lookup() {
        let signals = DemandSignals {
            residential: 0.1,
            office: 0.2,
            industrial: 0.3,
        };
        assert!(approx(for_category(&signals, DemandCategory::Office), 0.2));
        assert!(approx(for_category(&signals, DemandCategory::Industrial), 0.3));
    }
}
