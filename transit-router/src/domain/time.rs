//! Schedule time handling.
//!
//! Every time inside the router is a whole number of minutes relative to the
//! beginning of the loaded schedule. Timetables provide times as "HH:MM"
//! strings where the hour may run past midnight ("25:10" is 01:10 on the
//! following day), so trips crossing midnight keep monotone times.
//! [`ScheduleClock`] converts between schedule minutes and wall-clock
//! date-times.

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Minutes since the beginning of the schedule.
pub type Time = i32;

/// A span of minutes.
pub type Minutes = i32;

/// Sentinel for "no time". Also marks the end of an ontrip interval.
pub const INVALID_TIME: Time = Time::MAX;

/// Minutes in one day.
pub const MINUTES_PER_DAY: Minutes = 1440;

/// Error returned when parsing an invalid time string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid time: {reason}")]
pub struct TimeError {
    reason: &'static str,
}

impl TimeError {
    fn new(reason: &'static str) -> Self {
        Self { reason }
    }
}

/// Parse a schedule time from "HH:MM" format.
///
/// Hours 24 to 47 denote the following day.
///
/// # Examples
///
/// ```
/// use transit_router::domain::parse_hhmm;
///
/// assert_eq!(parse_hhmm("00:00"), Ok(0));
/// assert_eq!(parse_hhmm("14:30"), Ok(870));
/// assert_eq!(parse_hhmm("25:10"), Ok(1510));
///
/// assert!(parse_hhmm("1430").is_err());
/// assert!(parse_hhmm("14:3").is_err());
/// assert!(parse_hhmm("48:00").is_err());
/// ```
pub fn parse_hhmm(s: &str) -> Result<Time, TimeError> {
    if s.len() != 5 {
        return Err(TimeError::new("expected HH:MM format"));
    }

    let bytes = s.as_bytes();
    if bytes[2] != b':' {
        return Err(TimeError::new("expected colon at position 2"));
    }

    let hour =
        parse_two_digits(&bytes[0..2]).ok_or_else(|| TimeError::new("invalid hour digits"))?;
    if hour > 47 {
        return Err(TimeError::new("hour must be 0-47"));
    }

    let minute =
        parse_two_digits(&bytes[3..5]).ok_or_else(|| TimeError::new("invalid minute digits"))?;
    if minute > 59 {
        return Err(TimeError::new("minute must be 0-59"));
    }

    Ok(hour as Time * 60 + minute as Time)
}

/// Format a schedule time as "HH:MM", keeping hours past midnight (e.g. "25:10").
pub fn format_hhmm(time: Time) -> String {
    if time == INVALID_TIME {
        return "--:--".to_string();
    }
    let sign = if time < 0 { "-" } else { "" };
    let abs = time.unsigned_abs();
    format!("{sign}{:02}:{:02}", abs / 60, abs % 60)
}

fn parse_two_digits(bytes: &[u8]) -> Option<u32> {
    if bytes.len() != 2 {
        return None;
    }
    let tens = (bytes[0] as char).to_digit(10)?;
    let ones = (bytes[1] as char).to_digit(10)?;
    Some(tens * 10 + ones)
}

/// Search direction.
///
/// Forward searches start at the origin and move towards later times.
/// Backward searches start at the destination and move towards earlier
/// times. Direction-dependent logic goes through these helpers so the search
/// bodies stay shared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Forward,
    Backward,
}

impl Direction {
    /// Returns true for forward search.
    pub fn is_forward(self) -> bool {
        matches!(self, Direction::Forward)
    }

    /// Returns the opposite direction.
    pub fn reverse(self) -> Self {
        match self {
            Direction::Forward => Direction::Backward,
            Direction::Backward => Direction::Forward,
        }
    }

    /// Moves `time` by `duration` in search direction.
    pub fn advance(self, time: Time, duration: Minutes) -> Time {
        match self {
            Direction::Forward => time + duration,
            Direction::Backward => time - duration,
        }
    }

    /// Minutes spent going from `from` to `to` in search direction.
    pub fn elapsed(self, from: Time, to: Time) -> Minutes {
        match self {
            Direction::Forward => to - from,
            Direction::Backward => from - to,
        }
    }

    /// Returns true if `a` is strictly better than `b`: earlier when searching
    /// forward, later when searching backward.
    pub fn is_better(self, a: Time, b: Time) -> bool {
        match self {
            Direction::Forward => a < b,
            Direction::Backward => a > b,
        }
    }

    /// The worst possible time, used to initialise arrival tables.
    pub fn worst_time(self) -> Time {
        match self {
            Direction::Forward => Time::MAX,
            Direction::Backward => Time::MIN,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Forward => write!(f, "forward"),
            Direction::Backward => write!(f, "backward"),
        }
    }
}

/// Departure (forward) or arrival (backward) interval of a query.
///
/// An interval whose end is [`INVALID_TIME`] is an ontrip query: the search
/// starts at exactly `begin` and the window cannot be extended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchInterval {
    pub begin: Time,
    pub end: Time,
}

impl SearchInterval {
    /// Create a pretrip interval.
    pub fn new(begin: Time, end: Time) -> Self {
        Self { begin, end }
    }

    /// Create an ontrip interval starting at `time`.
    pub fn ontrip(time: Time) -> Self {
        Self {
            begin: time,
            end: INVALID_TIME,
        }
    }

    /// Returns true for ontrip intervals.
    pub fn is_ontrip(&self) -> bool {
        self.end == INVALID_TIME
    }

    /// Returns true if `time` lies inside the interval. Every time is inside
    /// an ontrip interval.
    pub fn contains(&self, time: Time) -> bool {
        self.is_ontrip() || (self.begin <= time && time <= self.end)
    }
}

impl fmt::Display for SearchInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_ontrip() {
            write!(f, "ontrip {}", format_hhmm(self.begin))
        } else {
            write!(f, "{}-{}", format_hhmm(self.begin), format_hhmm(self.end))
        }
    }
}

/// Converts between schedule minutes and wall-clock date-times.
///
/// # Examples
///
/// ```
/// use transit_router::domain::ScheduleClock;
///
/// let clock = ScheduleClock::parse("2024-03-15T00:00").unwrap();
/// let t = clock.to_time(clock.begin() + chrono::Duration::minutes(90)).unwrap();
/// assert_eq!(t, 90);
/// assert_eq!(clock.to_datetime(t).format("%H:%M").to_string(), "01:30");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleClock {
    begin: NaiveDateTime,
}

impl ScheduleClock {
    /// Create a clock for a schedule starting at `begin`.
    pub fn new(begin: NaiveDateTime) -> Self {
        Self { begin }
    }

    /// Parse the schedule begin from "YYYY-MM-DDTHH:MM".
    pub fn parse(s: &str) -> Result<Self, TimeError> {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M")
            .map(Self::new)
            .map_err(|_| TimeError::new("expected YYYY-MM-DDTHH:MM format"))
    }

    /// Returns the first instant of the schedule.
    pub fn begin(&self) -> NaiveDateTime {
        self.begin
    }

    /// Converts schedule minutes to a date-time.
    pub fn to_datetime(&self, time: Time) -> NaiveDateTime {
        self.begin + Duration::minutes(time as i64)
    }

    /// Converts a date-time to schedule minutes.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the date-time lies before the schedule begin or too
    /// far after it to be represented.
    pub fn to_time(&self, datetime: NaiveDateTime) -> Result<Time, TimeError> {
        let minutes = (datetime - self.begin).num_minutes();
        if minutes < 0 {
            return Err(TimeError::new("before schedule begin"));
        }
        Time::try_from(minutes)
            .ok()
            .filter(|t| *t != INVALID_TIME)
            .ok_or_else(|| TimeError::new("after schedule end"))
    }
}
