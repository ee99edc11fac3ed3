//! Show command for the schedule in effect on a date.
//!
//! This module implements `basal show`, which resolves a date to the exact,
//! closest prior, or earliest schedule and prints its intervals, daily total
//! and an hourly rate profile.

use std::fmt::Write as _;
use std::io::Write;

use anyhow::{Context, Result};
use basal_core::{ClockTime, MatchKind, rate_at};
use basal_db::{Database, ResolvedSchedule, StoredSchedule};
use chrono::NaiveDate;
use serde::Serialize;

use super::util::parse_date;

/// Width of the longest bar in the hourly profile.
const BAR_WIDTH: f64 = 30.0;

// ========== Human-Readable Output ==========

/// Format a resolved schedule for human-readable output.
pub fn format_schedule(resolved: &ResolvedSchedule) -> String {
    let mut output = String::new();
    let schedule = &resolved.entry;

    if resolved.kind.is_fallback() {
        writeln!(
            output,
            "Showing closest record from: {}",
            schedule.record.date
        )
        .unwrap();
        writeln!(output).unwrap();
    }

    writeln!(
        output,
        "Schedule {} for {}",
        schedule.record.id, schedule.record.date
    )
    .unwrap();
    writeln!(output).unwrap();

    writeln!(
        output,
        "{:<5}  {:<5}  {:>8}  {:>6}",
        "Start", "End", "Units/hr", "Units"
    )
    .unwrap();
    writeln!(output, "─────  ─────  ────────  ──────").unwrap();
    for interval in &schedule.intervals {
        writeln!(
            output,
            "{:<5}  {:<5}  {:>8.2}  {:>6.2}",
            interval.start,
            interval.end,
            interval.units_per_hour,
            interval.units()
        )
        .unwrap();
    }

    writeln!(output).unwrap();
    writeln!(
        output,
        "Daily basal: {:.2} units",
        schedule.record.total_units
    )
    .unwrap();
    writeln!(output).unwrap();
    output.push_str(&format_profile(schedule));

    output
}

/// Format the rate in effect at each full hour as a bar chart.
pub fn format_profile(schedule: &StoredSchedule) -> String {
    let rates: Vec<(ClockTime, f64)> = (0..24)
        .filter_map(|hour| ClockTime::from_hm(hour, 0))
        .map(|time| (time, rate_at(&schedule.intervals, time).unwrap_or_default()))
        .collect();
    let max_rate = rates.iter().map(|(_, rate)| *rate).fold(0.0, f64::max);

    let mut output = String::new();
    writeln!(output, "Hourly profile").unwrap();
    for (time, rate) in rates {
        let line = format!("{time}  {rate:>5.2}  {}", "#".repeat(bar_len(rate, max_rate)));
        writeln!(output, "{}", line.trim_end()).unwrap();
    }
    output
}

#[expect(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "bar length is rounded and bounded by BAR_WIDTH"
)]
fn bar_len(rate: f64, max_rate: f64) -> usize {
    if max_rate <= 0.0 {
        return 0;
    }
    (rate / max_rate * BAR_WIDTH).round().clamp(0.0, BAR_WIDTH) as usize
}

// ========== JSON Output ==========

/// JSON output structure.
#[derive(Debug, Serialize)]
pub struct JsonShow<'a> {
    pub requested_date: NaiveDate,
    pub match_kind: MatchKind,
    pub schedule: &'a StoredSchedule,
}

/// Format a resolved schedule as JSON.
pub fn format_schedule_json(resolved: &ResolvedSchedule, requested: NaiveDate) -> Result<String> {
    let json = JsonShow {
        requested_date: requested,
        match_kind: resolved.kind,
        schedule: &resolved.entry,
    };
    Ok(serde_json::to_string_pretty(&json)?)
}

// ========== Public Interface ==========

/// Runs the show command.
pub fn run<W: Write>(
    writer: &mut W,
    db: &Database,
    date: Option<&str>,
    json: bool,
    today: NaiveDate,
) -> Result<()> {
    let requested = match date {
        Some(value) => parse_date(value, today)?,
        None => today,
    };
    let resolved = db
        .schedule_for_date(requested)
        .with_context(|| format!("failed to find a schedule for {requested}"))?;

    if json {
        writeln!(writer, "{}", format_schedule_json(&resolved, requested)?)?;
    } else {
        write!(writer, "{}", format_schedule(&resolved))?;
    }
    Ok(())
}
