//! Basal intervals, day-schedule validation and daily totals.
//!
//! A day schedule is a chain of intervals that starts at `00:00`, where each
//! interval starts exactly where the previous one ended, and the last one runs
//! to `00:00` of the following day. [`ScheduleBuilder`] checks that chain one
//! interval at a time, which is how intervals arrive from an interactive
//! prompt; [`DaySchedule::new`] runs the same checks over a complete list.

use serde::{Deserialize, Serialize};

use crate::clock::{ClockTime, MINUTES_PER_DAY, minutes_until};
use crate::error::ScheduleError;

/// A clock-time span with one constant delivery rate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BasalInterval {
    pub start: ClockTime,
    /// `00:00` means the interval runs to midnight.
    pub end: ClockTime,
    pub units_per_hour: f64,
}

impl BasalInterval {
    /// Creates an interval, rejecting negative or non-finite rates.
    pub fn new(
        start: ClockTime,
        end: ClockTime,
        units_per_hour: f64,
    ) -> Result<Self, ScheduleError> {
        check_rate(units_per_hour)?;
        Ok(Self {
            start,
            end,
            units_per_hour,
        })
    }

    /// Duration in minutes, wrapping past midnight.
    pub const fn duration_minutes(&self) -> u16 {
        minutes_until(self.start, self.end)
    }

    pub fn hours(&self) -> f64 {
        f64::from(self.duration_minutes()) / 60.0
    }

    /// Insulin delivered over the whole interval.
    pub fn units(&self) -> f64 {
        self.hours() * self.units_per_hour
    }

    /// Whether `time` falls within `[start, end)`, treating an end of `00:00`
    /// as the end of the day.
    pub fn contains(&self, time: ClockTime) -> bool {
        let offset = minutes_until(self.start, time) % MINUTES_PER_DAY;
        offset < self.duration_minutes()
    }
}

/// Parses a units-per-hour rate.
pub fn parse_rate(input: &str) -> Result<f64, ScheduleError> {
    let invalid = || ScheduleError::InvalidRate {
        input: input.to_string(),
    };
    let rate: f64 = input.trim().parse().map_err(|_| invalid())?;
    if !rate.is_finite() || rate < 0.0 {
        return Err(invalid());
    }
    // "-0" parses to negative zero
    Ok(rate + 0.0)
}

fn check_rate(rate: f64) -> Result<(), ScheduleError> {
    if rate.is_finite() && rate >= 0.0 {
        Ok(())
    } else {
        Err(ScheduleError::InvalidRate {
            input: rate.to_string(),
        })
    }
}

/// Total units delivered by a set of intervals.
///
/// Each interval contributes `hours * units_per_hour`, where an end at or
/// before the start is taken to be on the following day.
pub fn daily_total(intervals: &[BasalInterval]) -> f64 {
    intervals.iter().map(BasalInterval::units).sum()
}

/// Rate in effect at `time`, if any interval covers it.
pub fn rate_at(intervals: &[BasalInterval], time: ClockTime) -> Option<f64> {
    intervals
        .iter()
        .find(|interval| interval.contains(time))
        .map(|interval| interval.units_per_hour)
}

/// Incremental validator for intervals entered in day order.
#[derive(Debug, Clone, Default)]
pub struct ScheduleBuilder {
    intervals: Vec<BasalInterval>,
}

impl ScheduleBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intervals accepted so far.
    pub fn intervals(&self) -> &[BasalInterval] {
        &self.intervals
    }

    /// True once an accepted interval runs to midnight.
    pub fn is_complete(&self) -> bool {
        self.intervals
            .last()
            .is_some_and(|interval| interval.end.is_midnight())
    }

    /// The start time the next interval must use, or `None` once the day is
    /// complete.
    pub fn next_start(&self) -> Option<ClockTime> {
        match self.intervals.last() {
            None => Some(ClockTime::MIDNIGHT),
            Some(last) if last.end.is_midnight() => None,
            Some(last) => Some(last.end),
        }
    }

    /// Checks a candidate start time against the chain so far.
    pub fn check_start(&self, start: ClockTime) -> Result<(), ScheduleError> {
        let index = self.intervals.len();
        match self.next_start() {
            None => Err(ScheduleError::DayAlreadyComplete { index }),
            Some(expected) if expected == start => Ok(()),
            Some(_) if index == 0 => Err(ScheduleError::MissingDayStart { found: start }),
            Some(expected) => Err(ScheduleError::DiscontinuousInterval {
                index,
                expected,
                found: start,
            }),
        }
    }

    /// Checks that `end` is strictly after `start`, or is midnight.
    pub fn check_end(&self, start: ClockTime, end: ClockTime) -> Result<(), ScheduleError> {
        if end.is_midnight() || end > start {
            Ok(())
        } else {
            Err(ScheduleError::NonIncreasingInterval {
                index: self.intervals.len(),
                start,
                end,
            })
        }
    }

    /// Validates and appends the next interval.
    ///
    /// On error the builder is left unchanged, so the caller can re-prompt.
    pub fn push(&mut self, interval: BasalInterval) -> Result<(), ScheduleError> {
        self.check_start(interval.start)?;
        self.check_end(interval.start, interval.end)?;
        check_rate(interval.units_per_hour)?;
        self.intervals.push(interval);
        Ok(())
    }

    /// Completes the schedule, refusing a day that does not reach midnight.
    pub fn finish(self) -> Result<DaySchedule, ScheduleError> {
        if !self.is_complete() {
            return Err(ScheduleError::IncompleteDayCoverage {
                covered_until: self.intervals.last().map(|interval| interval.end),
            });
        }
        Ok(DaySchedule {
            intervals: self.intervals,
        })
    }
}

/// A validated, complete day of basal intervals.
///
/// The only way to obtain one is through [`ScheduleBuilder::finish`] or
/// [`DaySchedule::new`], so every value covers `00:00` to `00:00` without gaps.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct DaySchedule {
    intervals: Vec<BasalInterval>,
}

impl DaySchedule {
    /// Validates a complete list of intervals in day order.
    pub fn new(intervals: impl IntoIterator<Item = BasalInterval>) -> Result<Self, ScheduleError> {
        let mut builder = ScheduleBuilder::new();
        for interval in intervals {
            builder.push(interval)?;
        }
        builder.finish()
    }

    pub fn intervals(&self) -> &[BasalInterval] {
        &self.intervals
    }

    pub fn total_units(&self) -> f64 {
        daily_total(&self.intervals)
    }

    pub fn rate_at(&self, time: ClockTime) -> f64 {
        rate_at(&self.intervals, time).unwrap_or_default()
    }
}
