//! World clock for time-of-day tracking
//!
//! A world day lasts [`TICKS_PER_DAY`] ticks and tick 0 corresponds to
//! 06:00. Clock strings use the 24-hour `HH:MM` form.

use serde::{Deserialize, Serialize};

/// Ticks in one world day
pub const TICKS_PER_DAY: u64 = 24_000;

/// Ticks in one world hour
pub const TICKS_PER_HOUR: u64 = 1_000;

/// Hour of day at tick 0
const DAWN_HOUR: u64 = 6;

/// Time of day periods, used for reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimePeriod {
    Morning,   // 06:00-12:00
    Afternoon, // 12:00-18:00
    Evening,   // 18:00-22:00
    Night,     // 22:00-06:00
}

impl TimePeriod {
    pub fn from_hour(hour: u32) -> Self {
        match hour {
            6..=11 => TimePeriod::Morning,
            12..=17 => TimePeriod::Afternoon,
            18..=21 => TimePeriod::Evening,
            _ => TimePeriod::Night, // 22-23, 0-5
        }
    }
}

/// Monotonic world clock
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Calendar {
    tick: u64,
}

impl Calendar {
    pub fn new(start_tick: u64) -> Self {
        Self { tick: start_tick }
    }

    pub fn advance(&mut self, ticks: u64) {
        self.tick += ticks;
    }

    /// Total ticks since the world was created
    pub fn full_time(&self) -> u64 {
        self.tick
    }

    pub fn current_day(&self) -> u64 {
        self.tick / TICKS_PER_DAY
    }

    /// Ticks into the current day, `0..TICKS_PER_DAY`
    pub fn time_of_day(&self) -> u64 {
        self.tick % TICKS_PER_DAY
    }

    pub fn current_hour(&self) -> u32 {
        hour_of(self.time_of_day())
    }

    pub fn current_time_period(&self) -> TimePeriod {
        TimePeriod::from_hour(self.current_hour())
    }
}

impl Default for Calendar {
    fn default() -> Self {
        Self::new(0)
    }
}

fn hour_of(time_of_day: u64) -> u32 {
    (((time_of_day % TICKS_PER_DAY) / TICKS_PER_HOUR + DAWN_HOUR) % 24) as u32
}

/// Ticks until the day wraps around to `target`, starting at `full_time`
///
/// Returns 0 when the clock is exactly at `target`.
pub fn ticks_until(full_time: u64, target: u64) -> u64 {
    let current = full_time % TICKS_PER_DAY;
    if current > target {
        TICKS_PER_DAY - current + target
    } else {
        target - current
    }
}

/// Parse an `HH:MM` clock string into a tick of day
pub fn parse_clock(s: &str) -> Option<u64> {
    let (hour, minute) = s.split_once(':')?;
    let hour: u64 = hour.trim().parse().ok()?;
    let minute: u64 = minute.trim().parse().ok()?;
    if hour > 23 || minute > 59 {
        return None;
    }

    let hour_ticks = ((hour + 24 - DAWN_HOUR) % 24) * TICKS_PER_HOUR;
    let minute_ticks = TICKS_PER_HOUR * minute / 60;
    Some(hour_ticks + minute_ticks)
}

/// Parse either raw ticks (`0..=24000`) or an `HH:MM` clock string
pub fn parse_tick_of_day(s: &str) -> Option<u64> {
    match s.parse::<u64>() {
        Ok(ticks) if ticks <= TICKS_PER_DAY => Some(ticks),
        Ok(_) => None,
        Err(_) => parse_clock(s),
    }
}

/// Render a tick of day as `HH:MM`
pub fn format_clock(ticks: u64) -> String {
    let time = ticks % TICKS_PER_DAY;
    let hours = hour_of(time);
    let minutes = ((time % TICKS_PER_HOUR) * 60 + TICKS_PER_HOUR - 1) / TICKS_PER_HOUR;
    let minutes = minutes.min(59);
    format!("{:02}:{:02}", hours, minutes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_period_from_hour() {
        assert_eq!(TimePeriod::from_hour(6), TimePeriod::Morning);
        assert_eq!(TimePeriod::from_hour(12), TimePeriod::Afternoon);
        assert_eq!(TimePeriod::from_hour(21), TimePeriod::Evening);
        assert_eq!(TimePeriod::from_hour(22), TimePeriod::Night);
        assert_eq!(TimePeriod::from_hour(5), TimePeriod::Night);
    }

    #[test]
    fn test_calendar_starts_at_dawn() {
        let mut cal = Calendar::default();
        assert_eq!(cal.current_hour(), 6);
        assert_eq!(cal.current_time_period(), TimePeriod::Morning);

        cal.advance(18_000);
        assert_eq!(cal.current_hour(), 0);
        assert_eq!(cal.current_time_period(), TimePeriod::Night);

        cal.advance(6_000);
        assert_eq!(cal.current_day(), 1);
        assert_eq!(cal.time_of_day(), 0);
    }

    #[test]
    fn test_ticks_until_wraps() {
        assert_eq!(ticks_until(1_000, 5_000), 4_000);
        assert_eq!(ticks_until(23_000, 1_000), 2_000);
        assert_eq!(ticks_until(24_000 + 500, 500), 0);
    }

    #[test]
    fn test_parse_clock() {
        assert_eq!(parse_clock("06:00"), Some(0));
        assert_eq!(parse_clock("18:00"), Some(12_000));
        assert_eq!(parse_clock("00:00"), Some(18_000));
        assert_eq!(parse_clock("07:30"), Some(1_500));
        assert_eq!(parse_clock("25:00"), None);
        assert_eq!(parse_clock("noon"), None);
    }

    #[test]
    fn test_parse_tick_of_day_accepts_both_forms() {
        assert_eq!(parse_tick_of_day("13000"), Some(13_000));
        assert_eq!(parse_tick_of_day("24000"), Some(24_000));
        assert_eq!(parse_tick_of_day("24001"), None);
        assert_eq!(parse_tick_of_day("12:00"), Some(6_000));
    }

    #[test]
    fn test_format_clock() {
        assert_eq!(format_clock(0), "06:00");
        assert_eq!(format_clock(12_000), "18:00");
        assert_eq!(format_clock(1_500), "07:30");
    }
}
