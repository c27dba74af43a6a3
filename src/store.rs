// SQLite-backed detection history

use crate::error::Result;
use crate::models::{DetectionRecord, Emotion, NewDetection};
use chrono::Local;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::info;

/// Timestamp layout stored with each record
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

impl ToSql for Emotion {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Emotion {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let label = value.as_str()?;
        Emotion::parse(label)
            .ok_or_else(|| FromSqlError::Other(format!("unknown emotion label: {label}").into()))
    }
}

/// Durable store for detection records.
///
/// The single connection is wrapped in a mutex so the store can be shared
/// across threads behind an `Arc`; callers never see the connection itself.
pub struct DetectionStore {
    conn: Mutex<Connection>,
}

impl DetectionStore {
    /// Opens (or creates) the store at `path` and ensures the schema exists
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path.as_ref())?;
        info!("Opened detection store at {:?}", path.as_ref());
        Self::from_connection(conn)
    }

    /// Opens an in-memory store, used by tests
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.ensure_schema()?;
        Ok(store)
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Creates the `image_emotion` table if it does not exist yet.
    /// Safe to call on every start.
    pub fn ensure_schema(&self) -> Result<()> {
        self.conn().execute_batch(
            "CREATE TABLE IF NOT EXISTS image_emotion(
                id               INTEGER PRIMARY KEY AUTOINCREMENT,
                image_name       TEXT    NOT NULL,
                detected_emotion TEXT    NOT NULL,
                confidence       REAL    NOT NULL,
                data             BLOB,
                timestamp        TEXT    NOT NULL
            );",
        )?;
        Ok(())
    }

    /// Appends a record stamped with the current wall-clock time and returns
    /// the assigned id. The timestamp is computed here, at call time.
    pub fn insert(&self, detection: &NewDetection) -> Result<i64> {
        let timestamp = Local::now().format(TIMESTAMP_FORMAT).to_string();
        self.insert_at(detection, &timestamp)
    }

    /// Appends a record with an explicit timestamp
    pub fn insert_at(&self, detection: &NewDetection, timestamp: &str) -> Result<i64> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO image_emotion(image_name, detected_emotion, confidence, data, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                detection.image_name,
                detection.emotion,
                detection.confidence,
                detection.image_data,
                timestamp,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Returns all records, most recent first
    pub fn list_all(&self) -> Result<Vec<DetectionRecord>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, image_name, detected_emotion, confidence, data, timestamp
             FROM image_emotion ORDER BY id DESC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(DetectionRecord {
                id: row.get(0)?,
                image_name: row.get(1)?,
                emotion: row.get(2)?,
                confidence: row.get(3)?,
                image_data: row.get(4)?,
                timestamp: row.get(5)?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Number of stored records
    pub fn count(&self) -> Result<i64> {
        let count = self
            .conn()
            .query_row("SELECT COUNT(*) FROM image_emotion", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Removes the record with the given id. Deleting an id that does not
    /// exist is a no-op, not an error.
    pub fn delete(&self, id: i64) -> Result<()> {
        self.conn()
            .execute("DELETE FROM image_emotion WHERE id = ?1", params![id])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn sample(name: &str, emotion: Emotion, confidence: f32) -> NewDetection {
        NewDetection {
            image_name: name.to_string(),
            emotion,
            confidence,
            image_data: None,
        }
    }

    #[test]
    fn ensure_schema_is_idempotent() {
        let store = DetectionStore::open_in_memory().unwrap();
        store.ensure_schema().unwrap();
        store.ensure_schema().unwrap();
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn insert_assigns_increasing_ids_and_lists_newest_first() {
        let store = DetectionStore::open_in_memory().unwrap();
        let first = store.insert(&sample("a.jpg", Emotion::Happy, 0.9)).unwrap();
        let second = store.insert(&sample("b.jpg", Emotion::Sad, 0.6)).unwrap();
        assert!(second > first);

        let records = store.list_all().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, second);
        assert_eq!(records[0].image_name, "b.jpg");
        assert_eq!(records[1].id, first);
    }

    #[test]
    fn inserted_record_matches_input_with_fresh_timestamp() {
        let store = DetectionStore::open_in_memory().unwrap();
        store.insert(&sample("cat.jpg", Emotion::Happy, 0.93)).unwrap();

        let records = store.list_all().unwrap();
        let record = &records[0];
        assert_eq!(record.image_name, "cat.jpg");
        assert_eq!(record.emotion, Emotion::Happy);
        assert!((record.confidence - 0.93).abs() < 1e-6);
        assert!(
            chrono::NaiveDateTime::parse_from_str(&record.timestamp, TIMESTAMP_FORMAT).is_ok(),
            "unexpected timestamp format: {}",
            record.timestamp
        );
    }

    #[test]
    fn explicit_timestamp_is_stored_verbatim() {
        let store = DetectionStore::open_in_memory().unwrap();
        store
            .insert_at(&sample("old.jpg", Emotion::Neutral, 0.5), "2020-01-01 00:00:00")
            .unwrap();
        assert_eq!(store.list_all().unwrap()[0].timestamp, "2020-01-01 00:00:00");
    }

    #[test]
    fn insert_then_delete_restores_previous_content() {
        let store = DetectionStore::open_in_memory().unwrap();
        store.insert(&sample("keep.jpg", Emotion::Fear, 0.7)).unwrap();
        let before: Vec<i64> = store.list_all().unwrap().iter().map(|r| r.id).collect();

        let id = store.insert(&sample("gone.jpg", Emotion::Angry, 0.8)).unwrap();
        store.delete(id).unwrap();

        let after: Vec<i64> = store.list_all().unwrap().iter().map(|r| r.id).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn deleting_missing_id_is_a_noop() {
        let store = DetectionStore::open_in_memory().unwrap();
        store.insert(&sample("a.jpg", Emotion::Happy, 0.9)).unwrap();
        store.delete(-1).unwrap();
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn ids_are_not_reused_after_deletion() {
        let store = DetectionStore::open_in_memory().unwrap();
        let first = store.insert(&sample("a.jpg", Emotion::Happy, 0.9)).unwrap();
        store.delete(first).unwrap();
        let second = store.insert(&sample("b.jpg", Emotion::Sad, 0.4)).unwrap();
        assert!(second > first);
    }

    #[test]
    fn blob_round_trips() {
        let store = DetectionStore::open_in_memory().unwrap();
        let mut detection = sample("blob.jpg", Emotion::Surprise, 0.99);
        detection.image_data = Some(vec![0xFF, 0xD8, 0xFF, 0xE0]);
        store.insert(&detection).unwrap();

        let records = store.list_all().unwrap();
        assert_eq!(records[0].image_data.as_deref(), Some(&[0xFF, 0xD8, 0xFF, 0xE0][..]));
    }

    #[test]
    fn records_persist_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.db");
        {
            let store = DetectionStore::open(&path).unwrap();
            store.insert(&sample("durable.jpg", Emotion::Happy, 0.8)).unwrap();
        }
        let reopened = DetectionStore::open(&path).unwrap();
        assert_eq!(reopened.count().unwrap(), 1);
        assert_eq!(reopened.list_all().unwrap()[0].image_name, "durable.jpg");
    }

    #[test]
    fn delete_works_from_another_thread() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(DetectionStore::open(dir.path().join("t.db")).unwrap());
        let id = store.insert(&sample("a.jpg", Emotion::Happy, 0.9)).unwrap();

        let remote = Arc::clone(&store);
        std::thread::spawn(move || remote.delete(id).unwrap())
            .join()
            .unwrap();

        assert_eq!(store.count().unwrap(), 0);
    }
}
