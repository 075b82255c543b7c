//! SQLite-backed visit store.
//!
//! Schema:
//! - visit_events: one row per (assignment_id, visit_date), enforced by a
//!   UNIQUE constraint so concurrent writers, including other processes on
//!   the same file, cannot both insert the same day.
//!
//! The duplicate check, the monthly count and the insert run inside one
//! IMMEDIATE transaction, which takes the write lock before reading.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDate};
use fieldpulse_shared::model::{AssignmentId, VisitEvent};
use fieldpulse_shared::{MetricsError, TimeWindow, VisitStore};
use rusqlite::{params, Connection, ErrorCode, TransactionBehavior};
use tracing::{debug, info};

/// Default visit database path
pub const VISIT_DB_PATH: &str = "/var/lib/fieldpulse/visits.db";

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS visit_events (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        assignment_id INTEGER NOT NULL,
        visit_date TEXT NOT NULL,
        recorded_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
        UNIQUE (assignment_id, visit_date)
    );
"#;

fn storage(e: rusqlite::Error) -> MetricsError {
    MetricsError::Storage(e.to_string())
}

fn is_unique_violation(e: &rusqlite::Error) -> bool {
    matches!(e, rusqlite::Error::SqliteFailure(err, _) if err.code == ErrorCode::ConstraintViolation)
}

pub struct SqliteVisitStore {
    conn: Mutex<Connection>,
}

impl SqliteVisitStore {
    /// Open or create the store at `path`, creating parent directories.
    pub fn open_at<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create database directory {}", parent.display())
                })?;
            }
        }

        info!("Opening visit database at: {}", path.display());
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open SQLite database {}", path.display()))?;
        conn.busy_timeout(Duration::from_secs(5))
            .context("Failed to set busy timeout")?;
        conn.pragma_update(None, "journal_mode", "WAL")
            .context("Failed to enable WAL mode")?;

        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)
            .context("Failed to initialize visit schema")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> std::result::Result<MutexGuard<'_, Connection>, MetricsError> {
        self.conn
            .lock()
            .map_err(|_| MetricsError::Storage("visit database lock poisoned".to_string()))
    }

    #[cfg(test)]
    fn count(&self) -> Result<u64> {
        let conn = self.lock()?;
        let n: i64 = conn.query_row("SELECT COUNT(*) FROM visit_events", [], |row| row.get(0))?;
        Ok(n as u64)
    }
}

impl VisitStore for SqliteVisitStore {
    fn events_for(&self, assignment_id: AssignmentId) -> fieldpulse_shared::Result<Vec<VisitEvent>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, visit_date FROM visit_events
                 WHERE assignment_id = ?1
                 ORDER BY visit_date",
            )
            .map_err(storage)?;
        let rows = stmt
            .query_map(params![assignment_id], |row| {
                Ok(VisitEvent {
                    id: row.get(0)?,
                    assignment_id,
                    date: row.get(1)?,
                })
            })
            .map_err(storage)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(storage)
    }

    fn import(&self, events: &[VisitEvent]) -> fieldpulse_shared::Result<usize> {
        let mut conn = self.lock()?;
        let tx = conn.transaction().map_err(storage)?;
        let mut added = 0;
        {
            let mut stmt = tx
                .prepare(
                    "INSERT OR IGNORE INTO visit_events (assignment_id, visit_date)
                     VALUES (?1, ?2)",
                )
                .map_err(storage)?;
            for ev in events {
                added += stmt.execute(params![ev.assignment_id, ev.date]).map_err(storage)?;
            }
        }
        tx.commit().map_err(storage)?;
        debug!(offered = events.len(), added, "visit events imported");
        Ok(added)
    }

    fn insert_visit(
        &self,
        assignment_id: AssignmentId,
        date: NaiveDate,
        quota: u32,
    ) -> fieldpulse_shared::Result<VisitEvent> {
        let (first, last) = TimeWindow::month_range(date.year(), date.month())?;
        let mut conn = self.lock()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(storage)?;

        let exists: bool = tx
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM visit_events WHERE assignment_id = ?1 AND visit_date = ?2)",
                params![assignment_id, date],
                |row| row.get(0),
            )
            .map_err(storage)?;
        if exists {
            return Err(MetricsError::DuplicateVisit { assignment_id, date });
        }

        let this_month: i64 = tx
            .query_row(
                "SELECT COUNT(*) FROM visit_events
                 WHERE assignment_id = ?1 AND visit_date BETWEEN ?2 AND ?3",
                params![assignment_id, first, last],
                |row| row.get(0),
            )
            .map_err(storage)?;
        if this_month >= quota as i64 {
            return Err(MetricsError::QuotaExceeded {
                assignment_id,
                month: date.month(),
                quota,
            });
        }

        match tx.execute(
            "INSERT INTO visit_events (assignment_id, visit_date) VALUES (?1, ?2)",
            params![assignment_id, date],
        ) {
            Ok(_) => {}
            Err(e) if is_unique_violation(&e) => {
                return Err(MetricsError::DuplicateVisit { assignment_id, date });
            }
            Err(e) => return Err(storage(e)),
        }
        let id = tx.last_insert_rowid() as u64;
        tx.commit().map_err(storage)?;

        Ok(VisitEvent {
            id,
            assignment_id,
            date,
        })
    }
}
