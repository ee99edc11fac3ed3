//! Clock times at minute resolution.
//!
//! A [`ClockTime`] is a position within a day, stored as minutes since
//! midnight. `00:00` doubles as "midnight of the following day" when used as
//! an interval end, so spans are measured with [`minutes_until`], which wraps.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ScheduleError;

/// Number of minutes in a day.
pub const MINUTES_PER_DAY: u16 = 24 * 60;

/// Accepts `H:MM`, `HH:MM`, `HMM` and `HHMM`.
static CLOCK_TIME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:([0-9]{1,2}):([0-9]{2})|([0-9]{1,2})([0-9]{2}))$").unwrap()
});

const FORMAT_HINT: &str = "use HH:MM, H:MM, HMM, or HHMM";

/// A validated time of day, `00:00` through `23:59`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ClockTime(u16);

impl ClockTime {
    /// Midnight, `00:00`.
    pub const MIDNIGHT: Self = Self(0);

    /// Creates a clock time from an hour and minute.
    ///
    /// Returns `None` unless `hour < 24` and `minute < 60`.
    pub const fn from_hm(hour: u8, minute: u8) -> Option<Self> {
        if hour > 23 || minute > 59 {
            return None;
        }
        Some(Self(hour as u16 * 60 + minute as u16))
    }

    /// Creates a clock time from minutes since midnight.
    pub const fn from_minutes(minutes: u16) -> Option<Self> {
        if minutes >= MINUTES_PER_DAY {
            return None;
        }
        Some(Self(minutes))
    }

    /// Minutes since midnight, in `0..1440`.
    pub const fn minutes(self) -> u16 {
        self.0
    }

    #[expect(clippy::cast_possible_truncation, reason = "hour is always below 24")]
    pub const fn hour(self) -> u8 {
        (self.0 / 60) as u8
    }

    #[expect(clippy::cast_possible_truncation, reason = "minute is always below 60")]
    pub const fn minute(self) -> u8 {
        (self.0 % 60) as u8
    }

    pub const fn is_midnight(self) -> bool {
        self.0 == 0
    }
}

/// Length of the span from `start` to `end` in minutes.
///
/// When `end <= start` the span crosses midnight, so a full day is added to
/// `end` first. `00:00` to `00:00` is therefore a whole day.
pub const fn minutes_until(start: ClockTime, end: ClockTime) -> u16 {
    if end.0 <= start.0 {
        end.0 + MINUTES_PER_DAY - start.0
    } else {
        end.0 - start.0
    }
}

/// Parses a flexible clock-time string.
///
/// Surrounding whitespace is ignored. `"6:30"`, `"06:30"`, `"630"` and
/// `"0630"` all parse to `06:30`.
pub fn parse_clock_time(input: &str) -> Result<ClockTime, ScheduleError> {
    let trimmed = input.trim();
    let invalid = |reason| ScheduleError::InvalidFormat {
        input: input.to_string(),
        reason,
    };

    let caps = CLOCK_TIME_RE
        .captures(trimmed)
        .ok_or_else(|| invalid(FORMAT_HINT))?;
    let (hour, minute) = match (caps.get(1), caps.get(2)) {
        (Some(hour), Some(minute)) => (hour.as_str(), minute.as_str()),
        _ => (&caps[3], &caps[4]),
    };

    // At most two ASCII digits each, so these cannot overflow.
    let hour: u8 = hour.parse().map_err(|_| invalid(FORMAT_HINT))?;
    let minute: u8 = minute.parse().map_err(|_| invalid(FORMAT_HINT))?;
    if hour > 23 {
        return Err(invalid("hours must be 0-23"));
    }
    if minute > 59 {
        return Err(invalid("minutes must be 0-59"));
    }
    ClockTime::from_hm(hour, minute).ok_or_else(|| invalid(FORMAT_HINT))
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

impl FromStr for ClockTime {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_clock_time(s)
    }
}

impl TryFrom<String> for ClockTime {
    type Error = ScheduleError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        parse_clock_time(&value)
    }
}

impl From<ClockTime> for String {
    fn from(time: ClockTime) -> Self {
        time.to_string()
    }
}
