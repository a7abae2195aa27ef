/// SQLite vitals store
///
/// One `vitals` table, WAL journal. The connection sits behind a mutex and
/// every query runs on the blocking pool.
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, Row};
use std::path::Path;
use std::sync::Arc;

use super::{StoredVitals, VitalsSink};
use crate::errors::{RelayError, RelayResult};
use crate::logger::{self, LogTag};
use crate::vitals::{BloodPressure, VitalsSample};

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS vitals (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    oxygen          REAL    NOT NULL,
    systolic        REAL    NOT NULL,
    diastolic       REAL    NOT NULL,
    heart_rate      REAL    NOT NULL,
    avg_heart_rate  REAL    NOT NULL,
    timestamp       TEXT    NOT NULL,
    created_at      TEXT    NOT NULL
)";

pub struct SqliteVitalsStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteVitalsStore {
    /// Open (or create) the database file, creating parent directories
    pub fn open(path: impl AsRef<Path>) -> RelayResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        conn.execute(SCHEMA, [])?;

        logger::info(
            LogTag::Store,
            &format!("Vitals database ready at {}", path.display()),
        );
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_in_memory() -> RelayResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute(SCHEMA, [])?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn count(&self) -> RelayResult<i64> {
        let conn = self.conn.lock();
        Ok(conn.query_row("SELECT COUNT(*) FROM vitals", [], |row| row.get(0))?)
    }

    fn insert(conn: &Connection, sample: &VitalsSample) -> RelayResult<StoredVitals> {
        let created_at = Utc::now();
        let bp = sample.blood_pressure();
        conn.execute(
            "INSERT INTO vitals (oxygen, systolic, diastolic, heart_rate, avg_heart_rate, timestamp, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                sample.oxygen(),
                bp.systolic,
                bp.diastolic,
                sample.heart_rate(),
                sample.avg_heart_rate(),
                sample.timestamp().to_rfc3339(),
                created_at.to_rfc3339(),
            ],
        )?;
        Ok(StoredVitals {
            id: conn.last_insert_rowid(),
            sample: sample.clone(),
            created_at,
        })
    }

    fn select_all(conn: &Connection) -> RelayResult<Vec<StoredVitals>> {
        let mut stmt = conn.prepare(
            "SELECT id, oxygen, systolic, diastolic, heart_rate, avg_heart_rate, timestamp, created_at
             FROM vitals ORDER BY id ASC",
        )?;
        let rows = stmt.query_map([], row_to_stored)?;
        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }
}

fn parse_time(row: &Row, index: usize) -> rusqlite::Result<DateTime<Utc>> {
    let text: String = row.get(index)?;
    DateTime::parse_from_rfc3339(&text)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                index,
                rusqlite::types::Type::Text,
                Box::new(e),
            )
        })
}

fn row_to_stored(row: &Row) -> rusqlite::Result<StoredVitals> {
    let sample = VitalsSample::new(
        row.get(1)?,
        BloodPressure {
            systolic: row.get(2)?,
            diastolic: row.get(3)?,
        },
        row.get(4)?,
        row.get(5)?,
        parse_time(row, 6)?,
    );
    Ok(StoredVitals {
        id: row.get(0)?,
        sample,
        created_at: parse_time(row, 7)?,
    })
}

#[async_trait]
impl VitalsSink for SqliteVitalsStore {
    async fn save(&self, sample: &VitalsSample) -> RelayResult<StoredVitals> {
        sample.validate()?;
        let conn = self.conn.clone();
        let sample = sample.clone();
        tokio::task::spawn_blocking(move || Self::insert(&conn.lock(), &sample))
            .await
            .map_err(|e| RelayError::persistence(format!("store task failed: {}", e)))?
    }

    async fn history(&self) -> RelayResult<Vec<StoredVitals>> {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || Self::select_all(&conn.lock()))
            .await
            .map_err(|e| RelayError::persistence(format!("store task failed: {}", e)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vitals::{normalize, parse_frame};

    fn sample(line: &str) -> VitalsSample {
        normalize(&parse_frame(line).reading().unwrap())
    }

    #[tokio::test]
    async fn test_save_and_history_in_order() {
        let store = SqliteVitalsStore::open_in_memory().unwrap();

        let first = store
            .save(&sample("Oxygen % = 98%, BPM = 70, Avg BPM = 70"))
            .await
            .unwrap();
        let second = store
            .save(&sample("Oxygen % = 95.5%, BPM = 90, Avg BPM = 85"))
            .await
            .unwrap();
        assert!(second.id > first.id);

        let history = store.history().await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0], first);
        assert_eq!(history[1].sample.oxygen(), 95.5);
        assert_eq!(store.count().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("vitals.db");

        {
            let store = SqliteVitalsStore::open(&path).unwrap();
            store
                .save(&sample("Oxygen % = 97%, BPM = 65, Avg BPM = 66"))
                .await
                .unwrap();
        }

        let store = SqliteVitalsStore::open(&path).unwrap();
        let history = store.history().await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].sample.heart_rate(), 65.0);
    }
}
