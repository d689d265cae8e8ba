//! City clock, subsystem simulators, and the tick engine.
//!
//! One logical tick advances the clock and then runs every subsystem in a
//! fixed order: Construction, Population, Employment, Crime, Land value,
//! Zone evolution, Zone build. Subsystems read and write the world only
//! through the [`citysim_db::CityStore`] repositories.
//!
//! # Modules
//!
//! - [`catalog`] -- Per-building-type housing, job, and density rules.
//! - [`clock`] -- Tick counter and calendar derivation.
//! - [`config`] -- Configuration loading from `citysim-config.yaml`.
//! - [`construction`] -- Construction progress.
//! - [`crime`] -- Crime generation and the police dispatch state machine.
//! - [`demand`] -- Supply/demand signals per zoning category.
//! - [`employment`] -- Job matching and daily payroll.
//! - [`engine`] -- [`SimulationEngine`], the tick loop and public surface.
//! - [`land_value`] -- Daily land value recompute.
//! - [`population`] -- Resident spawning and displacement.
//! - [`roads`] -- Road adjacency index.
//! - [`starting_city`] -- Seed layout for a freshly founded city.
//! - [`traffic`] -- Target vehicle counts.
//! - [`zone_build`] -- New buildings on empty zoned parcels.
//! - [`zone_evolution`] -- Daily densification of zoned buildings.
//!
//! [`SimulationEngine`]: engine::SimulationEngine

pub mod catalog;
pub mod clock;
pub mod config;
pub mod construction;
pub mod crime;
pub mod demand;
pub mod employment;
pub mod engine;
pub mod error;
pub mod land_value;
pub mod population;
pub mod roads;
pub mod starting_city;
pub mod traffic;
pub mod zone_build;
pub mod zone_evolution;

pub use engine::{EngineState, SimulationEngine};
pub use error::SimError;

/// Random source handed to every simulator.
///
/// The engine owns one seeded generator; tests pass a seeded `StdRng`.
pub type SimRng = dyn rand::RngCore + Send;

/// Whether a cadence of `interval` ticks fires at `tick`.
pub(crate) const fn every(tick: u64, interval: u64) -> bool {
    match tick.checked_rem(interval) {
        Some(rem) => rem == 0,
        None => false,
    }
}

/// Convert a count to `f64` for ratio math.
pub(crate) fn count_as_f64(count: u64) -> f64 {
    u32::try_from(count).map_or(f64::from(u32::MAX), f64::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cadence_helper() {
        assert!(every(600, 600));
        assert!(every(0, 100));
        assert!(!every(601, 600));
        assert!(!every(5, 0));
    }

    #[test]
    fn counts_convert_to_float() {
        assert!((count_as_f64(42) - 42.0).abs() < f64::EPSILON);
        assert!((count_as_f64(u64::MAX) - f64::from(u32::MAX)).abs() < f64::EPSILON);
    }
}
