//! Validation errors for clock times, rates and interval sets.

use thiserror::Error;

use crate::clock::ClockTime;

/// The interval field an error refers to.
///
/// Lets a prompting front end re-ask only the field that was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntervalField {
    Start,
    End,
    Rate,
}

/// Errors raised while parsing or validating a basal schedule.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ScheduleError {
    /// A clock time did not match any accepted shape or was out of range.
    #[error("invalid time {input:?}: {reason}")]
    InvalidFormat { input: String, reason: &'static str },

    /// The first interval of the day did not start at midnight.
    #[error("first interval must start at 00:00, got {found}")]
    MissingDayStart { found: ClockTime },

    /// An interval did not start where the previous one ended.
    #[error("interval {} must start at {expected} (previous end), got {found}", .index + 1)]
    DiscontinuousInterval {
        index: usize,
        expected: ClockTime,
        found: ClockTime,
    },

    /// An interval's end was not after its start and was not midnight.
    #[error("interval {} end time {end} must be after start time {start}", .index + 1)]
    NonIncreasingInterval {
        index: usize,
        start: ClockTime,
        end: ClockTime,
    },

    /// The intervals do not reach midnight, so the day is not fully covered.
    #[error("{}", incomplete_message(.covered_until))]
    IncompleteDayCoverage { covered_until: Option<ClockTime> },

    /// A rate was not a finite, non-negative number.
    #[error("invalid units per hour {input:?}: must be a non-negative number")]
    InvalidRate { input: String },

    /// An interval was offered after one already ran to midnight.
    #[error("interval {} is past the end of the day; the previous interval already ends at 00:00", .index + 1)]
    DayAlreadyComplete { index: usize },
}

impl ScheduleError {
    /// Returns the interval field the error should be re-prompted for, if any.
    pub const fn field(&self) -> Option<IntervalField> {
        match self {
            Self::MissingDayStart { .. }
            | Self::DiscontinuousInterval { .. }
            | Self::DayAlreadyComplete { .. } => Some(IntervalField::Start),
            Self::NonIncreasingInterval { .. } => Some(IntervalField::End),
            Self::InvalidRate { .. } => Some(IntervalField::Rate),
            Self::InvalidFormat { .. } | Self::IncompleteDayCoverage { .. } => None,
        }
    }
}

fn incomplete_message(covered_until: &Option<ClockTime>) -> String {
    match covered_until {
        None => "no intervals provided; the day must be covered from 00:00 to 00:00".to_string(),
        Some(end) => format!("intervals only cover 00:00 to {end}; the last interval must end at 00:00"),
    }
}
