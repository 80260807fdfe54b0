//! SQLite-backed status and schedule storage.
//!
//! One connection guarded by a mutex and only touched from the blocking
//! pool. Every statement is parameterised and the update-then-insert upsert
//! runs in a single transaction, so the (entity, date) key never holds more
//! than one row.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension, params};
use tracing::debug;

use crate::error::StoreError;
use crate::models::eat_out::{EatOutRecord, format_date, parse_date};
use crate::models::time_spec::{TimeSpec, ZeroComponents};
use crate::service::status_store::{ScheduleStore, StatusStore};

const DB_FILENAME: &str = "eatout.db";

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS eat_out (
    entity_id    TEXT    NOT NULL,
    date         TEXT    NOT NULL,
    will_eat_out INTEGER NOT NULL,
    PRIMARY KEY (entity_id, date)
);
CREATE TABLE IF NOT EXISTS reminder_schedules (
    entity_id TEXT    PRIMARY KEY,
    hour      INTEGER NOT NULL,
    minute    INTEGER NOT NULL
);
";

pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

/// `{dir}/eatout.db`
pub fn db_path(dir: &Path) -> PathBuf {
    dir.join(DB_FILENAME)
}

impl SqliteStore {
    /// Opens (or creates) `{dir}/eatout.db` and applies the schema.
    pub fn open(dir: &Path) -> Result<Self, StoreError> {
        std::fs::create_dir_all(dir).map_err(StoreError::CreateDir)?;
        let conn = Connection::open(db_path(dir))?;
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Runs `f` against the connection on the blocking pool, so a slow query
    /// never holds up a runtime worker.
    async fn with_conn<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T, StoreError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn.lock().map_err(|_| StoreError::LockPoisoned)?;
            f(&mut guard)
        })
        .await?
    }
}

#[async_trait]
impl StatusStore for SqliteStore {
    async fn get_status(&self, entity_id: &str, date: NaiveDate) -> Result<Option<bool>, StoreError> {
        let entity_id = entity_id.to_string();
        self.with_conn(move |conn| {
            let status = conn
                .query_row(
                    "SELECT will_eat_out FROM eat_out WHERE entity_id = ?1 AND date = ?2",
                    params![entity_id, format_date(&date)],
                    |row| row.get::<_, bool>(0),
                )
                .optional()?;
            Ok(status)
        })
        .await
    }

    async fn set_status(
        &self,
        entity_id: &str,
        date: NaiveDate,
        will_eat_out: bool,
    ) -> Result<usize, StoreError> {
        let entity_id = entity_id.to_string();
        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            let date = format_date(&date);
            let mut rows = tx.execute(
                "UPDATE eat_out SET will_eat_out = ?3 WHERE entity_id = ?1 AND date = ?2",
                params![entity_id, date, will_eat_out],
            )?;
            if rows == 0 {
                rows = tx.execute(
                    "INSERT INTO eat_out (entity_id, date, will_eat_out) VALUES (?1, ?2, ?3)",
                    params![entity_id, date, will_eat_out],
                )?;
            }
            tx.commit()?;
            debug!(entity_id = %entity_id, %date, will_eat_out, rows, "stored eat-out status");
            Ok(rows)
        })
        .await
    }

    async fn list_statuses(&self, entity_id: &str) -> Result<Vec<EatOutRecord>, StoreError> {
        let entity_id = entity_id.to_string();
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT date, will_eat_out FROM eat_out WHERE entity_id = ?1 ORDER BY date ASC",
            )?;
            let rows = stmt.query_map(params![entity_id], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, bool>(1)?))
            })?;

            let mut records = Vec::new();
            for row in rows {
                let (date, will_eat_out) = row?;
                let date = parse_date(&date).map_err(|e| StoreError::Corrupt(e.to_string()))?;
                records.push(EatOutRecord {
                    entity_id: entity_id.clone(),
                    date,
                    will_eat_out,
                });
            }
            Ok(records)
        })
        .await
    }
}

#[async_trait]
impl ScheduleStore for SqliteStore {
    async fn save_schedule(&self, entity_id: &str, spec: TimeSpec) -> Result<(), StoreError> {
        let entity_id = entity_id.to_string();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO reminder_schedules (entity_id, hour, minute) VALUES (?1, ?2, ?3)
                 ON CONFLICT(entity_id) DO UPDATE SET hour = excluded.hour, minute = excluded.minute",
                params![entity_id, spec.hour(), spec.minute()],
            )?;
            Ok(())
        })
        .await
    }

    async fn delete_schedule(&self, entity_id: &str) -> Result<bool, StoreError> {
        let entity_id = entity_id.to_string();
        self.with_conn(move |conn| {
            let rows = conn.execute(
                "DELETE FROM reminder_schedules WHERE entity_id = ?1",
                params![entity_id],
            )?;
            Ok(rows > 0)
        })
        .await
    }

    async fn load_schedules(&self) -> Result<Vec<(String, TimeSpec)>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare("SELECT entity_id, hour, minute FROM reminder_schedules ORDER BY entity_id")?;
            let rows = stmt.query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, u32>(1)?,
                    row.get::<_, u32>(2)?,
                ))
            })?;

            let mut schedules = Vec::new();
            for row in rows {
                let (entity_id, hour, minute) = row?;
                // Stored rows were accepted once; only the range is re-checked.
                let spec = TimeSpec::new(hour, minute, ZeroComponents::Allow)
                    .map_err(|e| StoreError::Corrupt(e.to_string()))?;
                schedules.push((entity_id, spec));
            }
            Ok(schedules)
        })
        .await
    }
}
