//! Job matching and daily payroll.
//!
//! One `simulate` call serves two cadences:
//!
//! - **Matching** on every `match_interval_ticks` boundary: unemployed
//!   residents, in creation order, take the first open job slot
//!   (greedy first-fit over buildings in creation order).
//! - **Payroll** at `payroll_hour`, once per day: every paid resident's
//!   wage is credited to the wallet of the building owner that employs them.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use citysim_db::CityStore;
use citysim_types::{
    BuildingId, CityTime, DomainEvent, OwnerId, PayrollProcessedDetails, ResidentEmployedDetails,
};
use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::catalog::{BuildingCatalog, Wage};
use crate::config::EmploymentConfig;
use crate::error::SimError;
use crate::{SimRng, every};

/// Open positions at one employer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobSlot {
    /// The employer.
    pub building_id: BuildingId,
    /// Positions still open.
    pub open: u64,
    /// Wage rule for new hires.
    pub wage: Wage,
}

/// Matches residents to jobs and pays wages.
#[derive(Debug)]
pub struct EmploymentSimulator<S> {
    store: Arc<S>,
    match_interval_ticks: u64,
    payroll_hour: u32,
    last_match_tick: Option<u64>,
    last_payroll_day: Option<u64>,
}

impl<S: CityStore> EmploymentSimulator<S> {
    /// Create a simulator over the store.
    pub const fn new(store: Arc<S>, config: &EmploymentConfig) -> Self {
        Self {
            store,
            match_interval_ticks: config.match_interval_ticks,
            payroll_hour: config.payroll_hour,
            last_match_tick: None,
            last_payroll_day: None,
        }
    }

    /// Run whichever cadences are due at `time`.
    pub async fn simulate(
        &mut self,
        time: &CityTime,
        rng: &mut SimRng,
    ) -> Result<Vec<DomainEvent>, SimError> {
        let mut events = Vec::new();

        if every(time.tick, self.match_interval_ticks) && self.last_match_tick != Some(time.tick) {
            self.last_match_tick = Some(time.tick);
            events.extend(self.match_jobs(rng).await?);
        }

        if time.hour == self.payroll_hour && self.last_payroll_day != Some(time.day) {
            self.last_payroll_day = Some(time.day);
            events.push(self.run_payroll(time.day).await?);
        }

        Ok(events)
    }

    /// Open job slots at completed employers, in building creation order.
    pub async fn open_slots(&self) -> Result<Vec<JobSlot>, SimError> {
        let buildings = self.store.list_buildings().await?;
        let residents = self.store.list_residents().await?;

        let mut filled: HashMap<BuildingId, u64> = HashMap::new();
        for work in residents.iter().filter_map(|r| r.work_building_id) {
            let count = filled.entry(work).or_insert(0);
            *count = count.saturating_add(1);
        }

        Ok(buildings
            .iter()
            .filter(|b| b.is_complete())
            .filter_map(|b| {
                let entry = BuildingCatalog::spec(b.building_type).jobs?;
                let capacity = BuildingCatalog::job_capacity(b);
                let open = capacity.saturating_sub(filled.get(&b.id).copied().unwrap_or(0));
                (open > 0).then_some(JobSlot {
                    building_id: b.id,
                    open,
                    wage: entry.wage,
                })
            })
            .collect())
    }

    /// Assign unemployed residents to open slots. Emits one
    /// `resident_employed` per hire.
    pub async fn match_jobs(&self, rng: &mut SimRng) -> Result<Vec<DomainEvent>, SimError> {
        let mut slots = self.open_slots().await?;
        if slots.is_empty() {
            return Ok(Vec::new());
        }

        let residents = self.store.list_residents().await?;
        let mut events = Vec::new();
        for resident in residents.iter().filter(|r| !r.is_employed()) {
            let Some(slot) = slots.iter_mut().find(|s| s.open > 0) else {
                break;
            };
            let salary = slot.wage.draw(rng);
            if !self
                .store
                .update_employment(resident.id, Some(slot.building_id), salary)
                .await?
            {
                debug!(resident_id = %resident.id, "resident vanished before hire");
                continue;
            }
            slot.open = slot.open.saturating_sub(1);
            events.push(DomainEvent::ResidentEmployed(ResidentEmployedDetails {
                resident_id: resident.id,
                building_id: slot.building_id,
                salary,
            }));
        }

        if !events.is_empty() {
            debug!(hires = events.len(), "job matching complete");
        }
        Ok(events)
    }

    /// Pay every employed resident's salary to their employer's owner.
    ///
    /// Residents whose workplace no longer exists are skipped. Always emits
    /// one `payroll_processed`, even when nobody was paid.
    pub async fn run_payroll(&self, day: u64) -> Result<DomainEvent, SimError> {
        let buildings = self.store.list_buildings().await?;
        let owners: HashMap<BuildingId, OwnerId> =
            buildings.iter().map(|b| (b.id, b.owner_id)).collect();
        let residents = self.store.list_residents().await?;

        let mut per_owner: BTreeMap<OwnerId, Decimal> = BTreeMap::new();
        let mut employees: u64 = 0;
        let mut total = Decimal::ZERO;
        for resident in residents.iter().filter(|r| r.salary > Decimal::ZERO) {
            let Some(owner) = resident
                .work_building_id
                .and_then(|work| owners.get(&work).copied())
            else {
                continue;
            };
            let due = per_owner.entry(owner).or_insert(Decimal::ZERO);
            *due = due.saturating_add(resident.salary);
            employees = employees.saturating_add(1);
            total = total.saturating_add(resident.salary);
        }

        for (owner, amount) in &per_owner {
            self.store.credit(*owner, *amount).await?;
        }

        info!(day, employees, total = %total, "payroll processed");
        Ok(DomainEvent::PayrollProcessed(PayrollProcessedDetails {
            day,
            employees,
            total,
        }))
    }
}
