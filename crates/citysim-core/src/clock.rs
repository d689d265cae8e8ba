//! City clock and calendar derivation.
//!
//! The clock is the single source of truth for simulated time. It holds only
//! the tick counter; hour, day, year and the daylight flag are derived from it
//! and the [`TimeConfig`] on every read, never stored independently.
//!
//! All derivations use checked arithmetic. The constructor rejects
//! configurations that would make a derivation divide by zero.

use citysim_types::CityTime;

use crate::config::TimeConfig;

/// Errors that can occur during clock operations.
#[derive(Debug, thiserror::Error)]
pub enum ClockError {
    /// Tick counter would overflow.
    #[error("tick counter overflow: cannot advance beyond u64::MAX")]
    TickOverflow,

    /// Invalid time configuration (e.g. zero ticks per hour).
    #[error("invalid time configuration: {reason}")]
    InvalidConfig {
        /// Explanation of what is wrong with the configuration.
        reason: String,
    },
}

/// Result of advancing the clock by one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockAdvance {
    /// Calendar position after the advance.
    pub time: CityTime,
    /// The absolute day number increased.
    pub day_started: bool,
    /// Daylight switched from on to off.
    pub night_started: bool,
}

/// Tick counter plus the calendar parameters needed to interpret it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CityClock {
    tick: u64,
    ticks_per_hour: u64,
    ticks_per_day: u64,
    hours_per_day: u64,
    days_per_year: u64,
    daylight_start_hour: u32,
    daylight_end_hour: u32,
}

impl CityClock {
    /// Create a clock at tick 0.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::InvalidConfig`] if any calendar unit is zero,
    /// the daylight window is empty or outside the day, or a day has more
    /// ticks than fit in a `u64`.
    pub fn new(config: &TimeConfig) -> Result<Self, ClockError> {
        Self::from_tick(config, 0)
    }

    /// Create a clock restored at a persisted tick.
    ///
    /// # Errors
    ///
    /// Same as [`CityClock::new`].
    pub fn from_tick(config: &TimeConfig, tick: u64) -> Result<Self, ClockError> {
        if config.ticks_per_hour == 0 {
            return Err(invalid("ticks_per_hour must be at least 1"));
        }
        if config.hours_per_day == 0 {
            return Err(invalid("hours_per_day must be at least 1"));
        }
        if config.days_per_year == 0 {
            return Err(invalid("days_per_year must be at least 1"));
        }
        if config.daylight_start_hour >= config.daylight_end_hour
            || config.daylight_end_hour > config.hours_per_day
        {
            return Err(ClockError::InvalidConfig {
                reason: format!(
                    "daylight window [{}, {}) must be non-empty and within {} hours",
                    config.daylight_start_hour, config.daylight_end_hour, config.hours_per_day
                ),
            });
        }

        let hours_per_day = u64::from(config.hours_per_day);
        let ticks_per_day = config
            .ticks_per_hour
            .checked_mul(hours_per_day)
            .ok_or_else(|| invalid("ticks per day overflow"))?;

        Ok(Self {
            tick,
            ticks_per_hour: config.ticks_per_hour,
            ticks_per_day,
            hours_per_day,
            days_per_year: config.days_per_year,
            daylight_start_hour: config.daylight_start_hour,
            daylight_end_hour: config.daylight_end_hour,
        })
    }

    /// Advance the clock by one tick and report day/night boundaries.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::TickOverflow`] if the tick counter would exceed
    /// `u64::MAX`.
    pub fn advance(&mut self) -> Result<ClockAdvance, ClockError> {
        let before = self.time();
        self.tick = self.tick.checked_add(1).ok_or(ClockError::TickOverflow)?;
        let time = self.time();
        Ok(ClockAdvance {
            time,
            day_started: time.day > before.day,
            night_started: before.is_daylight && !time.is_daylight,
        })
    }

    /// Return the current tick number.
    pub const fn tick(&self) -> u64 {
        self.tick
    }

    /// Return the configured number of ticks per hour.
    pub const fn ticks_per_hour(&self) -> u64 {
        self.ticks_per_hour
    }

    /// Calendar position at the current tick.
    pub fn time(&self) -> CityTime {
        self.time_at(self.tick)
    }

    /// Calendar position at an arbitrary tick.
    ///
    /// `hour = (tick / ticks_per_hour) % hours_per_day`,
    /// `day = tick / ticks_per_day + 1`,
    /// `year = (day - 1) / days_per_year + 1`.
    pub fn time_at(&self, tick: u64) -> CityTime {
        // Divisors are non-zero by construction.
        let hours_elapsed = tick.checked_div(self.ticks_per_hour).unwrap_or(0);
        let hour_of_day = hours_elapsed.checked_rem(self.hours_per_day).unwrap_or(0);
        let hour = u32::try_from(hour_of_day).unwrap_or(0);

        let days_elapsed = tick.checked_div(self.ticks_per_day).unwrap_or(0);
        let day = days_elapsed.saturating_add(1);
        let year = days_elapsed
            .checked_div(self.days_per_year)
            .unwrap_or(0)
            .saturating_add(1);

        CityTime {
            tick,
            hour,
            day,
            year,
            is_daylight: hour >= self.daylight_start_hour && hour < self.daylight_end_hour,
        }
    }
}

fn invalid(reason: &str) -> ClockError {
    ClockError::InvalidConfig {
        reason: reason.to_owned(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    /// Small calendar: 10 ticks/hour, 24 hours/day, 3 days/year.
    fn small_config() -> TimeConfig {
        TimeConfig {
            ticks_per_hour: 10,
            hours_per_day: 24,
            days_per_year: 3,
            daylight_start_hour: 6,
            daylight_end_hour: 20,
        }
    }

    #[test]
    fn clock_starts_at_tick_zero() {
        let clock = CityClock::new(&TimeConfig::default()).unwrap();
        let time = clock.time();
        assert_eq!(clock.tick(), 0);
        assert_eq!((time.hour, time.day, time.year), (0, 1, 1));
        assert!(!time.is_daylight);
    }

    #[test]
    fn default_calendar_mapping() {
        let clock = CityClock::new(&TimeConfig::default()).unwrap();
        // 600 ticks/hour, 14_400 ticks/day.
        assert_eq!(clock.time_at(599).hour, 0);
        assert_eq!(clock.time_at(600).hour, 1);
        assert_eq!(clock.time_at(14_399).day, 1);
        let next_day = clock.time_at(14_400);
        assert_eq!((next_day.hour, next_day.day), (0, 2));
        assert!(clock.time_at(6 * 600).is_daylight);
        assert!(!clock.time_at(20 * 600).is_daylight);
    }

    #[test]
    fn day_and_year_are_absolute() {
        let clock = CityClock::new(&small_config()).unwrap();
        let ticks_per_day = 240;
        let day4 = clock.time_at(3 * ticks_per_day);
        assert_eq!(day4.day, 4);
        assert_eq!(day4.year, 2);
    }

    #[test]
    fn advance_reports_day_started() {
        let mut clock = CityClock::from_tick(&small_config(), 239).unwrap();
        let advance = clock.advance().unwrap();
        assert_eq!(advance.time.tick, 240);
        assert_eq!(advance.time.day, 2);
        assert!(advance.day_started);
        assert!(!advance.night_started);

        let next = clock.advance().unwrap();
        assert!(!next.day_started);
    }

    #[test]
    fn advance_reports_night_started() {
        // Tick 199 is hour 19 (daylight); tick 200 is hour 20 (night).
        let mut clock = CityClock::from_tick(&small_config(), 199).unwrap();
        assert!(clock.time().is_daylight);
        let advance = clock.advance().unwrap();
        assert!(advance.night_started);
        assert!(!advance.time.is_daylight);

        let next = clock.advance().unwrap();
        assert!(!next.night_started);
    }

    #[test]
    fn overflow_is_an_error() {
        let mut clock = CityClock::from_tick(&small_config(), u64::MAX).unwrap();
        assert!(matches!(clock.advance(), Err(ClockError::TickOverflow)));
        assert_eq!(clock.tick(), u64::MAX);
    }

    #[test]
    fn invalid_configs_are_rejected() {
        let zero_hour = TimeConfig {
            ticks_per_hour: 0,
            ..small_config()
        };
        assert!(CityClock::new(&zero_hour).is_err());

        let empty_daylight = TimeConfig {
            daylight_start_hour: 10,
            daylight_end_hour: 10,
            ..small_config()
        };
        assert!(CityClock::new(&empty_daylight).is_err());

        let long_daylight = TimeConfig {
            daylight_end_hour: 30,
            ..small_config()
        };
        assert!(CityClock::new(&long_daylight).is_err());
    }
}
