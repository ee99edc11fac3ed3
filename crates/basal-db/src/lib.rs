//! Storage layer for basal schedules.
//!
//! Provides persistence for day schedules and their intervals using `rusqlite`.
//!
//! # Thread Safety
//!
//! The [`Database`] type wraps a `rusqlite::Connection`, which is `Send` but not `Sync`.
//! A `Database` instance can be moved between threads but cannot be shared across
//! threads without external synchronization. The CLI opens one per invocation.
//!
//! # Schema
//!
//! Dates are stored as `YYYY-MM-DD` text and clock times as zero-padded `HH:MM`
//! text, so lexicographic order matches chronological order. `created_at` is an
//! RFC 3339 UTC timestamp (e.g. `2024-01-15T10:30:00Z`).
//!
//! A schedule's `total_units` is computed once on insert and never updated;
//! schedules are immutable after creation.

use std::path::Path;

use basal_core::{
    BasalInterval, ClockTime, DaySchedule, Resolved, ScheduleLookup, resolve,
};
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::fallible_iterator::FallibleIterator;
use rusqlite::types::ValueRef;
use rusqlite::{Batch, Connection, OptionalExtension, params};
use serde::Serialize;
use thiserror::Error;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Table definitions, also handed to the LLM when translating questions to SQL.
pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS basal_schedules (
    id INTEGER PRIMARY KEY AUTOINCREMENT, -- unique identifier for each day schedule
    date TEXT NOT NULL,                   -- day the schedule applies to, YYYY-MM-DD
    total_units REAL NOT NULL,            -- total insulin units delivered over the day
    created_at TEXT NOT NULL              -- when the schedule was recorded, RFC 3339 UTC
);

CREATE TABLE IF NOT EXISTS basal_intervals (
    id INTEGER PRIMARY KEY AUTOINCREMENT, -- unique identifier for each interval
    schedule_id INTEGER NOT NULL,         -- owning schedule
    start_time TEXT NOT NULL,             -- interval start, HH:MM
    end_time TEXT NOT NULL,               -- interval end, HH:MM; 00:00 means midnight at day end
    units_per_hour REAL NOT NULL,         -- basal rate during the interval
    FOREIGN KEY (schedule_id) REFERENCES basal_schedules(id) ON DELETE CASCADE,
    CHECK (start_time GLOB '[0-2][0-9]:[0-5][0-9]' AND start_time BETWEEN '00:00' AND '23:59'),
    CHECK (end_time GLOB '[0-2][0-9]:[0-5][0-9]' AND end_time BETWEEN '00:00' AND '23:59'),
    CHECK (units_per_hour >= 0)
);
";

const INDEXES: &str = "
CREATE INDEX IF NOT EXISTS idx_basal_schedules_date ON basal_schedules(date);
CREATE INDEX IF NOT EXISTS idx_basal_intervals_schedule ON basal_intervals(schedule_id);
";

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// The store holds no schedules at all.
    #[error("no basal records found")]
    NoRecordsExist,
    /// No schedule has the given ID.
    #[error("record with ID {id} not found")]
    RecordNotFound { id: i64 },
    /// A stored value no longer parses.
    #[error("invalid {column} for schedule {schedule_id}: {value:?}")]
    InvalidRow {
        schedule_id: i64,
        column: &'static str,
        value: String,
    },
    /// An ad hoc query was empty.
    #[error("query is empty")]
    EmptyQuery,
    /// An ad hoc query held more than one statement.
    #[error("only a single statement is allowed")]
    MultipleStatements,
    /// An ad hoc query would modify the database.
    #[error("only read-only queries are allowed")]
    NotReadOnly,
}

/// Database connection wrapper.
///
/// See the [module documentation](self) for thread safety considerations.
pub struct Database {
    conn: Connection,
}

/// A stored schedule row, without its intervals.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScheduleRecord {
    pub id: i64,
    pub date: NaiveDate,
    pub total_units: f64,
    pub created_at: DateTime<Utc>,
}

/// A stored schedule with its intervals in day order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredSchedule {
    #[serde(flatten)]
    pub record: ScheduleRecord,
    pub intervals: Vec<BasalInterval>,
}

/// A schedule found by date, tagged exact or fallback.
pub type ResolvedSchedule = Resolved<StoredSchedule>;

/// Result of an ad hoc read-only query, rendered as text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Database {
    /// Opens a database at the given path, creating it if necessary.
    ///
    /// The database schema is automatically initialized on first open.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init()?;
        tracing::debug!(path = %path.display(), "opened database");
        Ok(db)
    }

    /// Opens an in-memory database.
    ///
    /// Useful for testing. The database is destroyed when the connection closes.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Initializes the database schema.
    ///
    /// This is idempotent - safe to call on an already-initialized database.
    fn init(&self) -> Result<(), DbError> {
        self.conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        self.conn.execute_batch(SCHEMA)?;
        self.conn.execute_batch(INDEXES)?;
        Ok(())
    }

    /// Stores a validated day schedule and returns its ID.
    ///
    /// The schedule row and every interval row are written in one transaction.
    pub fn create_schedule(
        &mut self,
        date: NaiveDate,
        schedule: &DaySchedule,
    ) -> Result<i64, DbError> {
        self.create_schedule_at(date, schedule, Utc::now())
    }

    fn create_schedule_at(
        &mut self,
        date: NaiveDate,
        schedule: &DaySchedule,
        now: DateTime<Utc>,
    ) -> Result<i64, DbError> {
        let total_units = schedule.total_units();
        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO basal_schedules (date, total_units, created_at) VALUES (?, ?, ?)",
            params![format_date(date), total_units, format_timestamp(now)],
        )?;
        let schedule_id = tx.last_insert_rowid();
        {
            let mut stmt = tx.prepare(
                "
                INSERT INTO basal_intervals (schedule_id, start_time, end_time, units_per_hour)
                VALUES (?, ?, ?, ?)
                ",
            )?;
            for interval in schedule.intervals() {
                stmt.execute(params![
                    schedule_id,
                    interval.start.to_string(),
                    interval.end.to_string(),
                    interval.units_per_hour,
                ])?;
            }
        }
        tx.commit()?;

        tracing::info!(schedule_id, %date, total_units, "created schedule");
        Ok(schedule_id)
    }

    /// Finds the schedule for `date`, falling back to the closest prior or
    /// earliest schedule.
    pub fn schedule_for_date(&self, date: NaiveDate) -> Result<ResolvedSchedule, DbError> {
        let resolved = resolve(self, date)?.ok_or(DbError::NoRecordsExist)?;
        let id = resolved.entry;
        let kind = resolved.kind;
        let schedule = self
            .get_schedule(id)?
            .ok_or(DbError::RecordNotFound { id })?;
        tracing::debug!(%date, schedule_id = id, %kind, "resolved schedule");
        Ok(Resolved {
            entry: schedule,
            kind,
        })
    }

    /// Loads one schedule and its intervals.
    pub fn get_schedule(&self, id: i64) -> Result<Option<StoredSchedule>, DbError> {
        let row = self
            .conn
            .query_row(
                "SELECT id, date, total_units, created_at FROM basal_schedules WHERE id = ?",
                [id],
                ScheduleRow::from_row,
            )
            .optional()?;
        let Some(row) = row else {
            return Ok(None);
        };
        let record = row.parse()?;
        let intervals = self.intervals_for(id)?;
        Ok(Some(StoredSchedule { record, intervals }))
    }

    fn intervals_for(&self, schedule_id: i64) -> Result<Vec<BasalInterval>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT start_time, end_time, units_per_hour
            FROM basal_intervals
            WHERE schedule_id = ?
            ORDER BY start_time ASC, id ASC
            ",
        )?;
        let rows = stmt.query_map([schedule_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, f64>(2)?,
            ))
        })?;
        let mut intervals = Vec::new();
        for row in rows {
            let (start, end, units_per_hour) = row?;
            intervals.push(BasalInterval {
                start: parse_time(&start, "start_time", schedule_id)?,
                end: parse_time(&end, "end_time", schedule_id)?,
                units_per_hour,
            });
        }
        Ok(intervals)
    }

    /// Lists all schedules, newest date first.
    pub fn list_schedules(&self) -> Result<Vec<ScheduleRecord>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT id, date, total_units, created_at
            FROM basal_schedules
            ORDER BY date DESC, id DESC
            ",
        )?;
        let rows = stmt.query_map([], ScheduleRow::from_row)?;
        let mut schedules = Vec::new();
        for row in rows {
            schedules.push(row?.parse()?);
        }
        Ok(schedules)
    }

    /// Deletes a schedule and all of its intervals.
    pub fn delete_schedule(&mut self, id: i64) -> Result<(), DbError> {
        let tx = self.conn.transaction()?;
        let intervals = tx.execute("DELETE FROM basal_intervals WHERE schedule_id = ?", [id])?;
        let deleted = tx.execute("DELETE FROM basal_schedules WHERE id = ?", [id])?;
        if deleted == 0 {
            return Err(DbError::RecordNotFound { id });
        }
        tx.commit()?;

        tracing::info!(schedule_id = id, intervals, "deleted schedule");
        Ok(())
    }

    /// Runs an ad hoc query, refusing anything that could write.
    ///
    /// The statement must be a single statement that SQLite reports as
    /// read-only, and it runs with `query_only` enabled on the connection.
    pub fn run_read_only_query(&self, sql: &str) -> Result<QueryTable, DbError> {
        let sql = sql.trim().trim_end_matches(';').trim_end();
        if sql.is_empty() {
            return Err(DbError::EmptyQuery);
        }

        self.conn.pragma_update(None, "query_only", true)?;
        let result = self.query_table(sql);
        self.conn.pragma_update(None, "query_only", false)?;
        result
    }

    fn query_table(&self, sql: &str) -> Result<QueryTable, DbError> {
        let mut batch = Batch::new(&self.conn, sql);
        let Some(mut stmt) = batch.next()? else {
            return Err(DbError::EmptyQuery);
        };
        if batch.next()?.is_some() {
            return Err(DbError::MultipleStatements);
        }
        if !stmt.readonly() {
            return Err(DbError::NotReadOnly);
        }
        let columns: Vec<String> = stmt
            .column_names()
            .into_iter()
            .map(String::from)
            .collect();

        let mut rows = stmt.query([])?;
        let mut table_rows = Vec::new();
        while let Some(row) = rows.next()? {
            let mut values = Vec::with_capacity(columns.len());
            for idx in 0..columns.len() {
                values.push(render_value(row.get_ref(idx)?));
            }
            table_rows.push(values);
        }
        Ok(QueryTable {
            columns,
            rows: table_rows,
        })
    }

    fn first_schedule_id(&self, sql: &str, date: Option<String>) -> Result<Option<i64>, DbError> {
        let id = match date {
            Some(date) => self.conn.query_row(sql, [date], |row| row.get(0)),
            None => self.conn.query_row(sql, [], |row| row.get(0)),
        }
        .optional()?;
        Ok(id)
    }
}

impl ScheduleLookup for Database {
    type Entry = i64;
    type Error = DbError;

    fn find_exact(&self, date: NaiveDate) -> Result<Option<i64>, DbError> {
        self.first_schedule_id(
            "SELECT id FROM basal_schedules WHERE date = ? ORDER BY id DESC LIMIT 1",
            Some(format_date(date)),
        )
    }

    fn find_latest_on_or_before(&self, date: NaiveDate) -> Result<Option<i64>, DbError> {
        self.first_schedule_id(
            "SELECT id FROM basal_schedules WHERE date <= ? ORDER BY date DESC, id DESC LIMIT 1",
            Some(format_date(date)),
        )
    }

    fn find_earliest(&self) -> Result<Option<i64>, DbError> {
        self.first_schedule_id(
            "SELECT id FROM basal_schedules ORDER BY date ASC, id DESC LIMIT 1",
            None,
        )
    }
}

/// Raw schedule columns before parsing.
#[derive(Debug)]
struct ScheduleRow {
    id: i64,
    date: String,
    total_units: f64,
    created_at: String,
}

impl ScheduleRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            date: row.get(1)?,
            total_units: row.get(2)?,
            created_at: row.get(3)?,
        })
    }

    fn parse(self) -> Result<ScheduleRecord, DbError> {
        let date = NaiveDate::parse_from_str(&self.date, DATE_FORMAT).map_err(|_| {
            DbError::InvalidRow {
                schedule_id: self.id,
                column: "date",
                value: self.date.clone(),
            }
        })?;
        let created_at = DateTime::parse_from_rfc3339(&self.created_at)
            .map_err(|_| DbError::InvalidRow {
                schedule_id: self.id,
                column: "created_at",
                value: self.created_at.clone(),
            })?
            .with_timezone(&Utc);
        Ok(ScheduleRecord {
            id: self.id,
            date,
            total_units: self.total_units,
            created_at,
        })
    }
}

fn parse_time(value: &str, column: &'static str, schedule_id: i64) -> Result<ClockTime, DbError> {
    value.parse().map_err(|_| DbError::InvalidRow {
        schedule_id,
        column,
        value: value.to_string(),
    })
}

fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn render_value(value: ValueRef<'_>) -> String {
    match value {
        ValueRef::Null => "NULL".to_string(),
        ValueRef::Integer(i) => i.to_string(),
        ValueRef::Real(f) => f.to_string(),
        ValueRef::Text(text) => String::from_utf8_lossy(text).into_owned(),
        ValueRef::Blob(blob) => format!("<{} bytes>", blob.len()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    use basal_core::{MatchKind, daily_total, parse_clock_time};

    fn t(s: &str) -> ClockTime {
        parse_clock_time(s).unwrap()
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, DATE_FORMAT).unwrap()
    }

    fn day(intervals: &[(&str, &str, f64)]) -> DaySchedule {
        DaySchedule::new(
            intervals
                .iter()
                .map(|(start, end, rate)| BasalInterval::new(t(start), t(end), *rate).unwrap()),
        )
        .unwrap()
    }

    fn example_day() -> DaySchedule {
        day(&[
            ("00:00", "06:00", 0.8),
            ("06:00", "18:00", 1.0),
            ("18:00", "00:00", 0.9),
        ])
    }

    fn flat_day(rate: f64) -> DaySchedule {
        day(&[("00:00", "00:00", rate)])
    }

    fn count(db: &Database, table: &str) -> i64 {
        db.conn
            .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn open_in_memory_database() {
        let db = Database::open_in_memory();
        assert!(db.is_ok());
    }

    #[test]
    fn open_creates_file_and_is_idempotent() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("basal.db");
        {
            let mut db = Database::open(&path).unwrap();
            db.create_schedule(date("2024-01-01"), &example_day()).unwrap();
        }
        let db = Database::open(&path).unwrap();
        assert_eq!(db.list_schedules().unwrap().len(), 1);
    }

    #[test]
    fn schema_matches_data_model() {
        let db = Database::open_in_memory().expect("open in-memory db");

        assert_eq!(
            table_columns(&db.conn, "basal_schedules"),
            vec!["id", "date", "total_units", "created_at"]
        );
        assert_eq!(
            table_columns(&db.conn, "basal_intervals"),
            vec!["id", "schedule_id", "start_time", "end_time", "units_per_hour"]
        );

        assert!(index_names(&db.conn, "basal_schedules").contains("idx_basal_schedules_date"));
        assert!(
            index_names(&db.conn, "basal_intervals").contains("idx_basal_intervals_schedule")
        );

        let interval_foreign_keys = foreign_keys(&db.conn, "basal_intervals");
        assert_eq!(
            interval_foreign_keys,
            vec![(
                "basal_schedules".to_string(),
                "schedule_id".to_string(),
                "id".to_string(),
                "CASCADE".to_string(),
            )]
        );
    }

    fn table_columns(conn: &Connection, table: &str) -> Vec<String> {
        let mut stmt = conn
            .prepare(&format!("PRAGMA table_info({table})"))
            .expect("prepare table_info");
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(1))
            .expect("query table_info");
        rows.map(|row| row.expect("table_info row")).collect()
    }

    fn index_names(conn: &Connection, table: &str) -> HashSet<String> {
        let mut stmt = conn
            .prepare(&format!("PRAGMA index_list({table})"))
            .expect("prepare index_list");
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(1))
            .expect("query index_list");
        rows.map(|row| row.expect("index_list row")).collect()
    }

    fn foreign_keys(conn: &Connection, table: &str) -> Vec<(String, String, String, String)> {
        let mut stmt = conn
            .prepare(&format!("PRAGMA foreign_key_list({table})"))
            .expect("prepare foreign_key_list");
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(6)?,
                ))
            })
            .expect("query foreign_key_list");
        rows.map(|row| row.expect("foreign_key_list row")).collect()
    }

    #[test]
    fn create_then_exact_lookup_round_trips() {
        let mut db = Database::open_in_memory().unwrap();
        let schedule = example_day();
        let now = DateTime::parse_from_rfc3339("2024-03-01T08:15:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let id = db
            .create_schedule_at(date("2024-03-01"), &schedule, now)
            .unwrap();

        let resolved = db.schedule_for_date(date("2024-03-01")).unwrap();
        assert_eq!(resolved.kind, MatchKind::Exact);
        let stored = resolved.entry;
        assert_eq!(stored.record.id, id);
        assert_eq!(stored.record.date, date("2024-03-01"));
        assert_eq!(stored.record.created_at, now);
        assert_eq!(stored.intervals, schedule.intervals());
        assert!((stored.record.total_units - daily_total(&stored.intervals)).abs() < 1e-9);
        assert!((stored.record.total_units - 22.2).abs() < 1e-9);
    }

    #[test]
    fn stored_times_are_zero_padded_text() {
        let mut db = Database::open_in_memory().unwrap();
        let id = db
            .create_schedule(
                date("2024-03-01"),
                &day(&[("0:00", "7:30", 0.5), ("7:30", "0:00", 0.7)]),
            )
            .unwrap();
        let times: Vec<(String, String)> = db
            .conn
            .prepare("SELECT start_time, end_time FROM basal_intervals WHERE schedule_id = ? ORDER BY id")
            .unwrap()
            .query_map([id], |row| Ok((row.get(0)?, row.get(1)?)))
            .unwrap()
            .map(Result::unwrap)
            .collect();
        assert_eq!(
            times,
            vec![
                ("00:00".to_string(), "07:30".to_string()),
                ("07:30".to_string(), "00:00".to_string()),
            ]
        );
    }

    #[test]
    fn lookup_falls_back_to_prior_then_earliest() {
        let mut db = Database::open_in_memory().unwrap();
        let first = db.create_schedule(date("2024-01-01"), &flat_day(1.0)).unwrap();
        let tenth = db.create_schedule(date("2024-01-10"), &flat_day(2.0)).unwrap();

        let prior = db.schedule_for_date(date("2024-01-05")).unwrap();
        assert_eq!(prior.kind, MatchKind::Prior);
        assert_eq!(prior.entry.record.id, first);

        let earliest = db.schedule_for_date(date("2023-01-01")).unwrap();
        assert_eq!(earliest.kind, MatchKind::Earliest);
        assert_eq!(earliest.entry.record.id, first);

        let exact = db.schedule_for_date(date("2024-01-10")).unwrap();
        assert_eq!(exact.kind, MatchKind::Exact);
        assert_eq!(exact.entry.record.id, tenth);
    }

    #[test]
    fn lookup_on_empty_store_fails() {
        let db = Database::open_in_memory().unwrap();
        let err = db.schedule_for_date(date("2024-01-01")).unwrap_err();
        assert!(matches!(err, DbError::NoRecordsExist));
    }

    #[test]
    fn newest_insert_wins_for_duplicate_dates() {
        let mut db = Database::open_in_memory().unwrap();
        db.create_schedule(date("2024-01-01"), &flat_day(1.0)).unwrap();
        let newer = db.create_schedule(date("2024-01-01"), &flat_day(1.2)).unwrap();

        let resolved = db.schedule_for_date(date("2024-01-01")).unwrap();
        assert_eq!(resolved.kind, MatchKind::Exact);
        assert_eq!(resolved.entry.record.id, newer);

        let earliest = db.schedule_for_date(date("2020-01-01")).unwrap();
        assert_eq!(earliest.entry.record.id, newer);
        assert_eq!(db.list_schedules().unwrap().len(), 2);
    }

    #[test]
    fn list_schedules_orders_newest_date_first() {
        let mut db = Database::open_in_memory().unwrap();
        db.create_schedule(date("2024-01-10"), &flat_day(1.0)).unwrap();
        db.create_schedule(date("2024-02-01"), &flat_day(1.0)).unwrap();
        db.create_schedule(date("2023-12-31"), &flat_day(1.0)).unwrap();

        let dates: Vec<NaiveDate> = db
            .list_schedules()
            .unwrap()
            .into_iter()
            .map(|record| record.date)
            .collect();
        assert_eq!(
            dates,
            vec![date("2024-02-01"), date("2024-01-10"), date("2023-12-31")]
        );
    }

    #[test]
    fn delete_removes_schedule_and_intervals() {
        let mut db = Database::open_in_memory().unwrap();
        let keep = db.create_schedule(date("2024-01-01"), &example_day()).unwrap();
        let gone = db.create_schedule(date("2024-01-10"), &example_day()).unwrap();
        assert_eq!(count(&db, "basal_intervals"), 6);

        db.delete_schedule(gone).unwrap();

        assert_eq!(count(&db, "basal_schedules"), 1);
        assert_eq!(count(&db, "basal_intervals"), 3);
        assert_eq!(db.get_schedule(gone).unwrap(), None);
        let resolved = db.schedule_for_date(date("2024-01-10")).unwrap();
        assert_eq!(resolved.kind, MatchKind::Prior);
        assert_eq!(resolved.entry.record.id, keep);
    }

    #[test]
    fn delete_missing_id_fails() {
        let mut db = Database::open_in_memory().unwrap();
        db.create_schedule(date("2024-01-01"), &example_day()).unwrap();
        let err = db.delete_schedule(999).unwrap_err();
        assert!(matches!(err, DbError::RecordNotFound { id: 999 }));
        assert_eq!(count(&db, "basal_schedules"), 1);
    }

    #[test]
    fn failed_interval_insert_rolls_back_schedule() {
        let mut db = Database::open_in_memory().unwrap();
        db.conn
            .execute_batch(
                "
                CREATE TRIGGER reject_high_rates BEFORE INSERT ON basal_intervals
                WHEN NEW.units_per_hour > 5
                BEGIN
                    SELECT RAISE(ABORT, 'rate too high');
                END;
                ",
            )
            .unwrap();

        let schedule = day(&[("00:00", "12:00", 1.0), ("12:00", "00:00", 9.0)]);
        let err = db.create_schedule(date("2024-01-01"), &schedule).unwrap_err();
        assert!(matches!(err, DbError::Sqlite(_)));
        assert_eq!(count(&db, "basal_schedules"), 0);
        assert_eq!(count(&db, "basal_intervals"), 0);
    }

    #[test]
    fn corrupt_date_is_reported() {
        let db = Database::open_in_memory().unwrap();
        db.conn
            .execute(
                "INSERT INTO basal_schedules (date, total_units, created_at) VALUES ('Jan 1', 0, '2024-01-01T00:00:00Z')",
                [],
            )
            .unwrap();
        let err = db.list_schedules().unwrap_err();
        assert!(matches!(
            err,
            DbError::InvalidRow {
                column: "date",
                ..
            }
        ));
    }

    #[test]
    fn read_only_query_returns_rendered_rows() {
        let mut db = Database::open_in_memory().unwrap();
        db.create_schedule(date("2024-01-01"), &example_day()).unwrap();

        let table = db
            .run_read_only_query(
                "SELECT date, COUNT(*) AS intervals, NULL AS note
                 FROM basal_schedules s JOIN basal_intervals i ON i.schedule_id = s.id
                 GROUP BY s.id;",
            )
            .unwrap();
        assert_eq!(table.columns, vec!["date", "intervals", "note"]);
        assert_eq!(
            table.rows,
            vec![vec![
                "2024-01-01".to_string(),
                "3".to_string(),
                "NULL".to_string()
            ]]
        );
    }

    #[test]
    fn read_only_query_refuses_writes() {
        let mut db = Database::open_in_memory().unwrap();
        db.create_schedule(date("2024-01-01"), &example_day()).unwrap();

        for sql in [
            "DELETE FROM basal_schedules",
            "UPDATE basal_intervals SET units_per_hour = 0",
            "DROP TABLE basal_intervals",
            "INSERT INTO basal_schedules (date, total_units, created_at) VALUES ('2024-01-02', 1, 'x')",
        ] {
            let err = db.run_read_only_query(sql).unwrap_err();
            assert!(
                matches!(err, DbError::NotReadOnly | DbError::Sqlite(_)),
                "{sql}: {err:?}"
            );
        }
        assert_eq!(count(&db, "basal_schedules"), 1);
        assert_eq!(count(&db, "basal_intervals"), 3);

        // The connection is writable again afterwards.
        db.create_schedule(date("2024-01-02"), &example_day()).unwrap();
    }

    #[test]
    fn read_only_query_refuses_multiple_statements_and_empty_input() {
        let mut db = Database::open_in_memory().unwrap();
        db.create_schedule(date("2024-01-01"), &example_day()).unwrap();

        for sql in [
            "SELECT 1; DELETE FROM basal_schedules",
            "SELECT 1; SELECT 2",
            "SELECT date FROM basal_schedules;\nSELECT 2;",
        ] {
            assert!(
                matches!(
                    db.run_read_only_query(sql).unwrap_err(),
                    DbError::MultipleStatements
                ),
                "{sql}"
            );
        }
        assert_eq!(count(&db, "basal_schedules"), 1);

        assert!(matches!(
            db.run_read_only_query("  ;  ").unwrap_err(),
            DbError::EmptyQuery
        ));
        assert!(matches!(
            db.run_read_only_query("-- nothing here").unwrap_err(),
            DbError::EmptyQuery
        ));

        let table = db.run_read_only_query("SELECT 1;  ").unwrap();
        assert_eq!(table.rows, vec![vec!["1".to_string()]]);
    }
}
