//! Core domain logic for basal-rate schedules.
//!
//! This crate contains the fundamental types and logic for:
//! - Clock times: parsing `H:MM`/`HHMM` style input, midnight wraparound
//! - Schedules: validating that intervals partition a day, daily totals
//! - Lookup: resolving a query date to the closest stored schedule

pub mod clock;
mod error;
pub mod lookup;
pub mod schedule;

pub use clock::{ClockTime, MINUTES_PER_DAY, minutes_until, parse_clock_time};
pub use error::{IntervalField, ScheduleError};
pub use lookup::{MatchKind, Resolved, ScheduleLookup, resolve};
pub use schedule::{
    BasalInterval, DaySchedule, ScheduleBuilder, daily_total, parse_rate, rate_at,
};
