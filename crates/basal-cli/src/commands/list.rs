//! List command for all recorded schedules.

use std::fmt::Write as _;
use std::io::Write;

use anyhow::Result;
use basal_db::{Database, ScheduleRecord};

/// Format schedules for human-readable output.
pub fn format_schedules(records: &[ScheduleRecord]) -> String {
    let mut output = String::new();

    if records.is_empty() {
        writeln!(output, "No records found.").unwrap();
        return output;
    }

    writeln!(output, "{:<4}  {:<10}  {:>11}", "ID", "Date", "Daily units").unwrap();
    writeln!(output, "────  ──────────  ───────────").unwrap();
    for record in records {
        writeln!(
            output,
            "{:<4}  {:<10}  {:>11.2}",
            record.id,
            record.date.to_string(),
            record.total_units
        )
        .unwrap();
    }

    output
}

/// Runs the list command.
pub fn run<W: Write>(writer: &mut W, db: &Database, json: bool) -> Result<()> {
    let records = db.list_schedules()?;
    if json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&records)?)?;
    } else {
        write!(writer, "{}", format_schedules(&records))?;
    }
    Ok(())
}
