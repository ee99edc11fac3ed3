//! Delete command for removing a schedule.

use std::io::Write;

use anyhow::{Context, Result};
use basal_db::Database;

pub fn run<W: Write>(writer: &mut W, db: &mut Database, id: i64) -> Result<()> {
    db.delete_schedule(id)
        .with_context(|| format!("failed to delete schedule {id}"))?;
    writeln!(writer, "Deleted schedule {id}")?;
    Ok(())
}
