//! Reminder times and trigger computation.
//!
//! All arithmetic runs on the local wall clock (`NaiveDateTime`), which is
//! what the user configured their reminders against.

use chrono::{
    DateTime, Duration, FixedOffset, Local, NaiveDateTime, NaiveTime, Offset, Timelike, Utc,
};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use skycast_core::TriggerMode;
use std::fmt;
use std::str::FromStr;

use crate::error::ReminderError;

const SECONDS_PER_DAY: i64 = 24 * 3600;
const MILLIS_PER_DAY: i64 = SECONDS_PER_DAY * 1000;

/// Smallest delay handed to the platform; zero would fire immediately.
pub const MIN_DELAY_SECS: u64 = 1;

/// A time of day in 24-hour form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ReminderTime {
    hour: u8,
    minute: u8,
}

impl ReminderTime {
    pub fn new(hour: u32, minute: u32) -> Result<Self, ReminderError> {
        if hour > 23 {
            return Err(ReminderError::invalid_time(
                format!("{}:{:02}", hour, minute),
                "hour must be within 0-23",
            ));
        }
        if minute > 59 {
            return Err(ReminderError::invalid_time(
                format!("{}:{:02}", hour, minute),
                "minute must be within 0-59",
            ));
        }
        Ok(Self {
            hour: hour as u8,
            minute: minute as u8,
        })
    }

    /// Parse "HH:MM" (24-hour) or "hh:mm AM/PM" (12-hour).
    pub fn parse(input: &str) -> Result<Self, ReminderError> {
        let trimmed = input.trim();
        let upper = trimmed.to_ascii_uppercase();

        let (clock, meridiem) = if let Some(rest) = upper.strip_suffix("AM") {
            (rest.trim_end(), Some(false))
        } else if let Some(rest) = upper.strip_suffix("PM") {
            (rest.trim_end(), Some(true))
        } else {
            (upper.as_str(), None)
        };

        let (hour_str, minute_str) = clock
            .split_once(':')
            .ok_or_else(|| ReminderError::invalid_time(input, "expected HH:MM"))?;

        let hour = parse_component(input, hour_str)?;
        let minute = parse_component(input, minute_str)?;

        let hour = match meridiem {
            None => hour,
            Some(pm) => {
                if !(1..=12).contains(&hour) {
                    return Err(ReminderError::invalid_time(
                        input,
                        "12-hour times need an hour within 1-12",
                    ));
                }
                match (hour, pm) {
                    (12, false) => 0,
                    (12, true) => 12,
                    (h, false) => h,
                    (h, true) => h + 12,
                }
            }
        };

        Self::new(hour, minute).map_err(|e| match e {
            ReminderError::InvalidTime { reason, .. } => ReminderError::invalid_time(input, reason),
            other => other,
        })
    }

    pub fn hour(&self) -> u32 {
        self.hour as u32
    }

    pub fn minute(&self) -> u32 {
        self.minute as u32
    }

    pub fn as_naive_time(&self) -> NaiveTime {
        NaiveTime::from_hms_opt(self.hour(), self.minute(), 0).unwrap_or(NaiveTime::MIN)
    }

    fn seconds_from_midnight(&self) -> i64 {
        self.hour as i64 * 3600 + self.minute as i64 * 60
    }
}

fn parse_component(input: &str, part: &str) -> Result<u32, ReminderError> {
    let part = part.trim();
    if part.is_empty() || part.len() > 2 || !part.chars().all(|c| c.is_ascii_digit()) {
        return Err(ReminderError::invalid_time(input, "expected HH:MM"));
    }
    part.parse::<u32>()
        .map_err(|_| ReminderError::invalid_time(input, "expected HH:MM"))
}

impl FromStr for ReminderTime {
    type Err = ReminderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for ReminderTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

/// Source of the local wall-clock time.
pub trait Clock: Send + Sync {
    /// The current instant with the device's UTC offset.
    fn now_zoned(&self) -> DateTime<FixedOffset>;

    /// The device's wall-clock time.
    fn now(&self) -> NaiveDateTime {
        self.now_zoned().naive_local()
    }
}

/// The device clock in the local timezone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_zoned(&self) -> DateTime<FixedOffset> {
        let now = Local::now();
        now.with_timezone(now.offset())
    }
}

/// A clock that only moves when told to.
///
/// Holds a wall-clock time in a fixed offset, UTC unless set otherwise.
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<NaiveDateTime>,
    offset: FixedOffset,
}

impl FixedClock {
    pub fn new(now: NaiveDateTime) -> Self {
        Self::with_offset(now, Utc.fix())
    }

    pub fn with_offset(now: NaiveDateTime, offset: FixedOffset) -> Self {
        Self {
            now: Mutex::new(now),
            offset,
        }
    }

    pub fn set(&self, now: NaiveDateTime) {
        *self.now.lock() = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock();
        *now += by;
    }
}

impl Clock for FixedClock {
    fn now_zoned(&self) -> DateTime<FixedOffset> {
        let local = *self.now.lock();
        let utc = local - Duration::seconds(i64::from(self.offset.local_minus_utc()));
        DateTime::from_naive_utc_and_offset(utc, self.offset)
    }

    fn now(&self) -> NaiveDateTime {
        *self.now.lock()
    }
}

/// When the platform should deliver a notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Trigger {
    /// Fire once after `delay_seconds`.
    OneShot { delay_seconds: u64 },
    /// Fire at hour:minute, every day while `repeats` is set.
    Daily { hour: u32, minute: u32, repeats: bool },
}

impl Trigger {
    pub fn for_mode(mode: TriggerMode, now: NaiveDateTime, time: ReminderTime) -> Self {
        match mode {
            TriggerMode::OneShot => Trigger::OneShot {
                delay_seconds: seconds_until(now.time(), time),
            },
            TriggerMode::Daily => Trigger::Daily {
                hour: time.hour(),
                minute: time.minute(),
                repeats: true,
            },
        }
    }
}

/// Seconds from `now` until the next `target` time of day.
///
/// A target at or before `now` rolls over to tomorrow, so the result is
/// always within `1..=86400`.
pub fn seconds_until(now: NaiveTime, target: ReminderTime) -> u64 {
    let now_ms = now.num_seconds_from_midnight() as i64 * 1000
        + (now.nanosecond().min(999_999_999) / 1_000_000) as i64;
    let mut delta_ms = target.seconds_from_midnight() * 1000 - now_ms;
    if delta_ms <= 0 {
        delta_ms += MILLIS_PER_DAY;
    }
    ((delta_ms / 1000) as u64).max(MIN_DELAY_SECS)
}

/// The next wall-clock moment `target` occurs strictly after `now`.
pub fn next_occurrence(now: NaiveDateTime, target: ReminderTime) -> NaiveDateTime {
    let today = now.date().and_time(target.as_naive_time());
    if today > now {
        today
    } else {
        today + Duration::days(1)
    }
}

/// Whole hours between `now` and `fire_at`, rounded to the nearest hour.
pub fn forecast_offset_hours(now: NaiveDateTime, fire_at: NaiveDateTime) -> i64 {
    let seconds = fire_at.signed_duration_since(now).num_seconds();
    (seconds as f64 / 3600.0).round() as i64
}

/// Clamp an hour offset into an hourly series of `available` entries.
pub fn forecast_index(offset_hours: i64, available: usize) -> Option<usize> {
    if available == 0 {
        return None;
    }
    Some(offset_hours.clamp(0, available as i64 - 1) as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 1)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    fn time(s: &str) -> ReminderTime {
        ReminderTime::parse(s).unwrap()
    }

    #[test]
    fn test_parse_24_hour() {
        assert_eq!(time("06:00"), ReminderTime::new(6, 0).unwrap());
        assert_eq!(time("6:05"), ReminderTime::new(6, 5).unwrap());
        assert_eq!(time(" 23:59 "), ReminderTime::new(23, 59).unwrap());
        assert_eq!(time("00:00"), ReminderTime::new(0, 0).unwrap());
    }

    #[test]
    fn test_parse_12_hour() {
        assert_eq!(time("06:30 AM"), ReminderTime::new(6, 30).unwrap());
        assert_eq!(time("4:00 pm"), ReminderTime::new(16, 0).unwrap());
        assert_eq!(time("12:00 AM"), ReminderTime::new(0, 0).unwrap());
        assert_eq!(time("12:15PM"), ReminderTime::new(12, 15).unwrap());
    }

    #[test]
    fn test_parse_rejects_out_of_range() {
        assert!(ReminderTime::parse("24:00").is_err());
        assert!(ReminderTime::parse("12:60").is_err());
        assert!(ReminderTime::parse("13:00 PM").is_err());
        assert!(ReminderTime::parse("0:30 AM").is_err());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        for input in ["", "0600", "ab:cd", "6:", ":30", "-1:00", "06:00:00", "106:00"] {
            let err = ReminderTime::parse(input).unwrap_err();
            assert!(
                matches!(err, ReminderError::InvalidTime { .. }),
                "{:?} should be rejected",
                input
            );
        }
    }

    #[test]
    fn test_display_is_24_hour() {
        assert_eq!(time("4:05 PM").to_string(), "16:05");
        assert_eq!(time("7:00").to_string(), "07:00");
    }

    #[test]
    fn test_future_today_delay() {
        // 08:00 -> 16:00 is 8 hours
        assert_eq!(seconds_until(at(8, 0, 0).time(), time("16:00")), 8 * 3600);
        // partial minutes and seconds
        assert_eq!(seconds_until(at(15, 58, 30).time(), time("16:00")), 90);
    }

    #[test]
    fn test_past_today_rolls_to_tomorrow() {
        // 18:00 -> 06:00 tomorrow: (24h - 18h) + 6h
        assert_eq!(seconds_until(at(18, 0, 0).time(), time("06:00")), 12 * 3600);
        assert_eq!(seconds_until(at(23, 59, 59).time(), time("00:00")), 1);
    }

    #[test]
    fn test_exact_now_is_a_full_day_away() {
        assert_eq!(seconds_until(at(6, 0, 0).time(), time("06:00")), 86_400);
    }

    #[test]
    fn test_sub_second_delta_floors_to_minimum() {
        let now = NaiveTime::from_hms_milli_opt(5, 59, 59, 600).unwrap();
        assert_eq!(seconds_until(now, time("06:00")), MIN_DELAY_SECS);
    }

    #[test]
    fn test_delay_matches_formula_for_every_minute() {
        let now = at(13, 37, 0);
        let elapsed = 13 * 3600 + 37 * 60;
        for hour in 0..24 {
            for minute in 0..60 {
                let target = ReminderTime::new(hour, minute).unwrap();
                let offset = (hour * 3600 + minute * 60) as i64;
                let expected = if offset > elapsed {
                    offset - elapsed
                } else {
                    (SECONDS_PER_DAY - elapsed) + offset
                };
                let delay = seconds_until(now.time(), target);
                assert_eq!(delay as i64, expected, "target {}", target);
                assert!(delay > 0);
            }
        }
    }

    #[test]
    fn test_next_occurrence() {
        assert_eq!(next_occurrence(at(8, 0, 0), time("16:00")), at(16, 0, 0));
        assert_eq!(
            next_occurrence(at(18, 0, 0), time("06:00")),
            at(6, 0, 0) + Duration::days(1)
        );
        assert_eq!(
            next_occurrence(at(6, 0, 0), time("06:00")),
            at(6, 0, 0) + Duration::days(1)
        );
    }

    #[test]
    fn test_trigger_for_mode() {
        let now = at(8, 0, 0);
        assert_eq!(
            Trigger::for_mode(TriggerMode::OneShot, now, time("09:30")),
            Trigger::OneShot { delay_seconds: 5400 }
        );
        assert_eq!(
            Trigger::for_mode(TriggerMode::Daily, now, time("06:00")),
            Trigger::Daily {
                hour: 6,
                minute: 0,
                repeats: true
            }
        );
    }

    #[test]
    fn test_forecast_offset_rounds_to_nearest_hour() {
        let now = at(8, 20, 0);
        assert_eq!(forecast_offset_hours(now, at(16, 0, 0)), 8);
        assert_eq!(forecast_offset_hours(now, at(8, 45, 0)), 0);
        assert_eq!(forecast_offset_hours(now, at(6, 0, 0) + Duration::days(1)), 22);
    }

    #[test]
    fn test_forecast_index_clamps() {
        assert_eq!(forecast_index(3, 24), Some(3));
        assert_eq!(forecast_index(30, 24), Some(23));
        assert_eq!(forecast_index(-2, 24), Some(0));
        assert_eq!(forecast_index(5, 0), None);
    }

    #[test]
    fn test_fixed_clock_advances() {
        let clock = FixedClock::new(at(8, 0, 0));
        clock.advance(Duration::minutes(90));
        assert_eq!(clock.now(), at(9, 30, 0));
        clock.set(at(1, 0, 0));
        assert_eq!(clock.now(), at(1, 0, 0));
    }

    #[test]
    fn test_fixed_clock_keeps_offset() {
        let bangkok = FixedOffset::east_opt(7 * 3600).unwrap();
        let clock = FixedClock::with_offset(at(8, 0, 0), bangkok);

        let zoned = clock.now_zoned();
        assert_eq!(zoned.naive_local(), at(8, 0, 0));
        assert_eq!(zoned.naive_utc(), at(1, 0, 0));
        assert_eq!(*zoned.offset(), bangkok);
        assert_eq!(FixedClock::new(at(8, 0, 0)).now_zoned().naive_utc(), at(8, 0, 0));
    }
}
