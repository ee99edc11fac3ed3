//! Add command for recording a day schedule.
//!
//! Intervals come either from arguments (`START-END@RATE`) or, when none are
//! given, from an interactive prompt that asks for one field at a time and
//! re-asks only the field that was rejected.

use std::io::{BufRead, Write};

use anyhow::{Context, Result};
use basal_core::{
    BasalInterval, DaySchedule, IntervalField, ScheduleBuilder, ScheduleError, parse_clock_time,
    parse_rate,
};
use basal_db::Database;
use chrono::NaiveDate;
use clap::Args;

use super::util::parse_date;

#[derive(Debug, Args)]
pub struct AddArgs {
    /// Date the schedule applies to (default: today).
    #[arg(long)]
    pub date: Option<String>,

    /// Intervals as START-END@RATE, e.g. 00:00-06:00@0.8 (prompts when omitted).
    pub intervals: Vec<String>,
}

pub fn run<R: BufRead, W: Write>(
    writer: &mut W,
    input: &mut R,
    db: &mut Database,
    args: &AddArgs,
    today: NaiveDate,
) -> Result<()> {
    let date = match args.date.as_deref() {
        Some(value) => parse_date(value, today)?,
        None => today,
    };

    let schedule = if args.intervals.is_empty() {
        writeln!(writer, "Enter basal intervals for {date}.")?;
        prompt_schedule(input, writer)?
    } else {
        schedule_from_args(&args.intervals)?
    };

    let id = db
        .create_schedule(date, &schedule)
        .context("failed to save schedule")?;
    writeln!(
        writer,
        "Created schedule {id} for {date}: daily basal {:.2} units",
        schedule.total_units()
    )?;
    Ok(())
}

/// Parses one `START-END@RATE` interval argument.
pub fn parse_interval_arg(value: &str) -> Result<BasalInterval> {
    let (times, rate) = value
        .split_once('@')
        .with_context(|| format!("invalid interval {value:?}: expected START-END@RATE"))?;
    let (start, end) = times
        .split_once('-')
        .with_context(|| format!("invalid interval {value:?}: expected START-END@RATE"))?;
    let start = parse_clock_time(start)?;
    let end = parse_clock_time(end)?;
    let rate = parse_rate(rate)?;
    Ok(BasalInterval::new(start, end, rate)?)
}

fn schedule_from_args(values: &[String]) -> Result<DaySchedule> {
    let mut builder = ScheduleBuilder::new();
    for value in values {
        let interval = parse_interval_arg(value)?;
        builder
            .push(interval)
            .with_context(|| format!("rejected interval {value:?}"))?;
    }
    Ok(builder.finish()?)
}

/// Drives a [`ScheduleBuilder`] from line-based input until the day is covered.
///
/// A blank start line (or end of input) stops early, which fails unless the
/// day is already complete.
pub fn prompt_schedule<R: BufRead, W: Write>(input: &mut R, writer: &mut W) -> Result<DaySchedule> {
    let mut builder = ScheduleBuilder::new();

    'intervals: while let Some(expected) = builder.next_start() {
        writeln!(writer, "Interval {}", builder.intervals().len() + 1)?;

        let start = loop {
            let label = format!("  Start time (must be {expected}, blank to finish): ");
            let Some(line) = prompt(input, writer, &label)? else {
                break 'intervals;
            };
            if line.is_empty() {
                break 'intervals;
            }
            match parse_clock_time(&line).and_then(|start| builder.check_start(start).map(|()| start)) {
                Ok(start) => break start,
                Err(err) => report(writer, &err, IntervalField::Start)?,
            }
        };

        let end = loop {
            let Some(line) = prompt(input, writer, "  End time (00:00 for end of day): ")? else {
                break 'intervals;
            };
            match parse_clock_time(&line).and_then(|end| builder.check_end(start, end).map(|()| end)) {
                Ok(end) => break end,
                Err(err) => report(writer, &err, IntervalField::End)?,
            }
        };

        let units_per_hour = loop {
            let Some(line) = prompt(input, writer, "  Units per hour: ")? else {
                break 'intervals;
            };
            match parse_rate(&line) {
                Ok(rate) => break rate,
                Err(err) => report(writer, &err, IntervalField::Rate)?,
            }
        };

        builder.push(BasalInterval::new(start, end, units_per_hour)?)?;
    }

    Ok(builder.finish()?)
}

fn prompt<R: BufRead, W: Write>(input: &mut R, writer: &mut W, label: &str) -> Result<Option<String>> {
    write!(writer, "{label}")?;
    writer.flush()?;
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        writeln!(writer)?;
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

fn report<W: Write>(writer: &mut W, err: &ScheduleError, asking: IntervalField) -> Result<()> {
    let field = err.field().unwrap_or(asking);
    let name = match field {
        IntervalField::Start => "start time",
        IntervalField::End => "end time",
        IntervalField::Rate => "units per hour",
    };
    writeln!(writer, "  Invalid {name}: {err}")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Cursor;

    use basal_core::MatchKind;
    use insta::assert_snapshot;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn args(date: Option<&str>, intervals: &[&str]) -> AddArgs {
        AddArgs {
            date: date.map(String::from),
            intervals: intervals.iter().map(|s| (*s).to_string()).collect(),
        }
    }

    #[test]
    fn parse_interval_arg_accepts_flexible_times() {
        let interval = parse_interval_arg("0:00-630@0.85").unwrap();
        assert_eq!(interval.start.to_string(), "00:00");
        assert_eq!(interval.end.to_string(), "06:30");
        assert!((interval.units_per_hour - 0.85).abs() < 1e-12);
    }

    #[test]
    fn parse_interval_arg_rejects_malformed_values() {
        for value in ["0:00-600", "0600@1.0", "0:00-2500@1.0", "0:00-600@-1", "0:00-600@abc", "0-600@1.0"] {
            assert!(parse_interval_arg(value).is_err(), "{value:?} should be rejected");
        }
    }

    #[test]
    fn add_from_arguments_stores_schedule() {
        let mut db = Database::open_in_memory().unwrap();
        let mut output = Vec::new();
        run(
            &mut output,
            &mut Cursor::new(""),
            &mut db,
            &args(
                Some("2024-03-01"),
                &["00:00-06:00@0.8", "06:00-18:00@1.0", "18:00-00:00@0.9"],
            ),
            date("2024-06-01"),
        )
        .unwrap();

        let output = String::from_utf8(output).unwrap();
        assert_snapshot!(output, @"Created schedule 1 for 2024-03-01: daily basal 22.20 units");

        let resolved = db.schedule_for_date(date("2024-03-01")).unwrap();
        assert_eq!(resolved.kind, MatchKind::Exact);
        assert_eq!(resolved.entry.intervals.len(), 3);
    }

    #[test]
    fn add_rejects_gap_between_arguments() {
        let mut db = Database::open_in_memory().unwrap();
        let err = run(
            &mut Vec::new(),
            &mut Cursor::new(""),
            &mut db,
            &args(None, &["0:00-6:00@0.8", "7:00-0:00@1.0"]),
            date("2024-06-01"),
        )
        .unwrap_err();
        assert!(format!("{err:#}").contains("interval 2 must start at 06:00"));
        assert!(db.list_schedules().unwrap().is_empty());
    }

    #[test]
    fn add_zero_rate_day_reports_positive_zero() {
        let mut db = Database::open_in_memory().unwrap();
        let mut output = Vec::new();
        run(
            &mut output,
            &mut Cursor::new(""),
            &mut db,
            &args(Some("2024-03-02"), &["0:00-0:00@-0"]),
            date("2024-06-01"),
        )
        .unwrap();

        let output = String::from_utf8(output).unwrap();
        assert_snapshot!(output, @"Created schedule 1 for 2024-03-02: daily basal 0.00 units");
    }

    #[test]
    fn add_rejects_partial_day() {
        let mut db = Database::open_in_memory().unwrap();
        let err = run(
            &mut Vec::new(),
            &mut Cursor::new(""),
            &mut db,
            &args(None, &["0:00-18:00@0.8"]),
            date("2024-06-01"),
        )
        .unwrap_err();
        assert!(err.to_string().contains("only cover 00:00 to 18:00"));
    }

    #[test]
    fn prompt_reasks_only_rejected_field() {
        let input = "\
0:00
25:00
6:00
-1
0.8
0700
600
0:00
1.0
";
        let mut output = Vec::new();
        let schedule = prompt_schedule(&mut Cursor::new(input), &mut output).unwrap();
        assert!((schedule.total_units() - 22.8).abs() < 1e-9);

        let output = String::from_utf8(output).unwrap();
        let errors: Vec<&str> = output
            .lines()
            .filter_map(|line| line.split_once("Invalid ").map(|(_, rest)| rest))
            .collect();
        assert_eq!(
            errors,
            vec![
                r#"end time: invalid time "25:00": hours must be 0-23"#,
                r#"units per hour: invalid units per hour "-1": must be a non-negative number"#,
                "start time: interval 2 must start at 06:00 (previous end), got 07:00",
            ]
        );
        assert_eq!(output.matches("Start time (must be 06:00").count(), 2);
        assert_eq!(output.matches("Interval ").count(), 2);
    }

    #[test]
    fn prompt_blank_start_on_incomplete_day_fails() {
        let input = "0:00\n1200\n1.5\n\n";
        let err = prompt_schedule(&mut Cursor::new(input), &mut Vec::new()).unwrap_err();
        let err = err.downcast::<ScheduleError>().unwrap();
        assert!(matches!(err, ScheduleError::IncompleteDayCoverage { .. }));
    }

    #[test]
    fn prompt_end_of_input_fails_cleanly() {
        let err = prompt_schedule(&mut Cursor::new("0:00\n"), &mut Vec::new()).unwrap_err();
        let err = err.downcast::<ScheduleError>().unwrap();
        assert_eq!(
            err,
            ScheduleError::IncompleteDayCoverage {
                covered_until: None
            }
        );
    }
}
