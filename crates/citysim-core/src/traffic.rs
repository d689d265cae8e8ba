//! Target vehicle counts for the traffic layer.

use citysim_types::CityTime;

use crate::config::TrafficConfig;
use crate::count_as_f64;

/// Morning rush, `[7, 9]` inclusive.
const MORNING_RUSH: std::ops::RangeInclusive<u32> = 7..=9;

/// Evening rush, `[16, 19]` inclusive.
const EVENING_RUSH: std::ops::RangeInclusive<u32> = 16..=19;

/// Derives how many vehicles should be on the road.
#[derive(Debug, Clone, PartialEq)]
pub struct TrafficModel {
    config: TrafficConfig,
}

impl TrafficModel {
    /// Create a model from traffic settings.
    pub fn new(config: &TrafficConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Share of the base fleet driving at `time`.
    pub fn hour_factor(&self, time: &CityTime) -> f64 {
        if MORNING_RUSH.contains(&time.hour) || EVENING_RUSH.contains(&time.hour) {
            self.config.rush_factor
        } else if time.is_daylight {
            self.config.day_factor
        } else {
            self.config.night_factor
        }
    }

    /// `clamp(population / residents_per_vehicle, min, max) * hour_factor`,
    /// rounded down.
    // The product is non-negative and bounded by `max_vehicles`.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn target_vehicle_count(&self, time: &CityTime, population: u64) -> u64 {
        let min = self.config.min_vehicles.min(self.config.max_vehicles);
        let base = population
            .checked_div(self.config.residents_per_vehicle)
            .unwrap_or(0)
            .clamp(min, self.config.max_vehicles.max(min));
        (count_as_f64(base) * self.hour_factor(time)).floor().max(0.0) as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(hour: u32, is_daylight: bool) -> CityTime {
        CityTime {
            tick: 0,
            hour,
            day: 1,
            year: 1,
            is_daylight,
        }
    }

    #[test]
    fn rush_hour_runs_full_fleet() {
        let model = TrafficModel::new(&TrafficConfig::default());
        assert_eq!(model.target_vehicle_count(&at(8, true), 1_000), 100);
        assert_eq!(model.target_vehicle_count(&at(17, true), 1_000), 100);
    }

    #[test]
    fn daylight_and_night_scale_down() {
        let model = TrafficModel::new(&TrafficConfig::default());
        assert_eq!(model.target_vehicle_count(&at(12, true), 1_000), 60);
        assert_eq!(model.target_vehicle_count(&at(23, false), 1_000), 20);
    }

    #[test]
    fn fleet_is_clamped() {
        let model = TrafficModel::new(&TrafficConfig::default());
        assert_eq!(model.target_vehicle_count(&at(8, true), 0), 5);
        assert_eq!(model.target_vehicle_count(&at(8, true), 1_000_000), 500);
        assert_eq!(model.target_vehicle_count(&at(2, false), 0), 1);
    }
}
