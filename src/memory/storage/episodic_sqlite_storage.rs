//! SQLite storage for episodic memory.

use std::collections::HashMap;
use std::path::PathBuf;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use serde_json::Value;

use crate::memory::episodic::MemoryEvent;
use crate::memory::storage::interface::EpisodicStorage;
use crate::utilities::errors::MemoryError;

/// Column values of one row, before decoding.
type RawEvent = (String, String, String, String, String, String);

/// Durable episodic storage backed by a single SQLite file.
///
/// Rows are ordered by their autoincrement id, so events that share a
/// timestamp still come back in insertion order.
#[derive(Debug, Clone)]
pub struct EpisodicSQLiteStorage {
    /// Path to the SQLite database file.
    pub db_path: PathBuf,
    /// Whether to log failures at error level.
    verbose: bool,
}

impl EpisodicSQLiteStorage {
    /// Open (and if necessary create) the database.
    ///
    /// Defaults to `<db_storage_path>/episodic_memory.db`.
    pub fn new(db_path: Option<PathBuf>, verbose: bool) -> Result<Self, MemoryError> {
        let db_path = db_path.unwrap_or_else(crate::utilities::paths::episodic_db_path);

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| MemoryError::Storage {
                message: format!("cannot create {}: {}", parent.display(), e),
            })?;
        }

        let storage = Self { db_path, verbose };
        storage.initialize_db()?;
        Ok(storage)
    }

    fn connect(&self) -> Result<Connection, MemoryError> {
        Connection::open(&self.db_path).map_err(|e| {
            if self.verbose {
                log::error!(
                    "MEMORY ERROR: could not open episodic database {}: {}",
                    self.db_path.display(),
                    e
                );
            }
            e.into()
        })
    }

    fn initialize_db(&self) -> Result<(), MemoryError> {
        let conn = self.connect()?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS episodic_memory (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                event_id TEXT NOT NULL,
                user_id TEXT NOT NULL,
                query TEXT NOT NULL,
                response TEXT NOT NULL,
                metadata TEXT NOT NULL,
                timestamp TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_episodic_user ON episodic_memory (user_id, id);",
        )?;
        Ok(())
    }

    fn read_row(row: &Row<'_>) -> rusqlite::Result<RawEvent> {
        Ok((
            row.get(0)?,
            row.get(1)?,
            row.get(2)?,
            row.get(3)?,
            row.get(4)?,
            row.get(5)?,
        ))
    }

    fn decode(raw: RawEvent) -> Result<MemoryEvent, MemoryError> {
        let (id, user_id, query, response, metadata, timestamp) = raw;
        let metadata: HashMap<String, Value> =
            serde_json::from_str(&metadata).map_err(|e| MemoryError::Corrupt {
                message: format!("metadata of event {}: {}", id, e),
            })?;
        let timestamp = DateTime::parse_from_rfc3339(&timestamp)
            .map_err(|e| MemoryError::Corrupt {
                message: format!("timestamp of event {}: {}", id, e),
            })?
            .with_timezone(&Utc);
        Ok(MemoryEvent {
            id,
            user_id,
            query,
            response,
            metadata,
            timestamp,
        })
    }

    fn query_events(
        &self,
        sql: &str,
        params: &[&dyn rusqlite::ToSql],
    ) -> Result<Vec<MemoryEvent>, MemoryError> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map(params, Self::read_row)?;
        let mut events = Vec::new();
        for row in rows {
            events.push(Self::decode(row?)?);
        }
        Ok(events)
    }
}

impl EpisodicStorage for EpisodicSQLiteStorage {
    fn append(&self, event: &MemoryEvent) -> Result<MemoryEvent, MemoryError> {
        let metadata = serde_json::to_string(&event.metadata).map_err(|e| MemoryError::Storage {
            message: e.to_string(),
        })?;
        let mut conn = self.connect()?;
        let log_failure = |e: rusqlite::Error| {
            if self.verbose {
                log::error!("MEMORY ERROR: failed to append episodic event: {}", e);
            }
            MemoryError::from(e)
        };

        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(log_failure)?;
        let latest: Option<String> = tx
            .query_row(
                "SELECT timestamp FROM episodic_memory WHERE user_id = ?1 ORDER BY id DESC LIMIT 1",
                params![event.user_id],
                |row| row.get(0),
            )
            .optional()
            .map_err(log_failure)?;

        let mut stored = event.clone();
        if let Some(latest) = latest {
            let latest = DateTime::parse_from_rfc3339(&latest)
                .map_err(|e| MemoryError::Corrupt {
                    message: format!("latest timestamp for user {}: {}", event.user_id, e),
                })?
                .with_timezone(&Utc);
            stored.timestamp = stored.timestamp.max(latest);
        }

        tx.execute(
            "INSERT INTO episodic_memory (event_id, user_id, query, response, metadata, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                stored.id,
                stored.user_id,
                stored.query,
                stored.response,
                metadata,
                stored.timestamp.to_rfc3339_opts(SecondsFormat::Nanos, true),
            ],
        )
        .map_err(log_failure)?;
        tx.commit().map_err(log_failure)?;
        Ok(stored)
    }

    fn recent(&self, user_id: &str, limit: usize) -> Result<Vec<MemoryEvent>, MemoryError> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let mut events = self.query_events(
            "SELECT event_id, user_id, query, response, metadata, timestamp
             FROM episodic_memory
             WHERE user_id = ?1
             ORDER BY id DESC
             LIMIT ?2",
            params![user_id, limit],
        )?;
        events.reverse();
        Ok(events)
    }

    fn all(&self, user_id: &str) -> Result<Vec<MemoryEvent>, MemoryError> {
        self.query_events(
            "SELECT event_id, user_id, query, response, metadata, timestamp
             FROM episodic_memory
             WHERE user_id = ?1
             ORDER BY id ASC",
            params![user_id],
        )
    }

    fn count(&self, user_id: &str) -> Result<usize, MemoryError> {
        let conn = self.connect()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM episodic_memory WHERE user_id = ?1",
            params![user_id],
            |row| row.get(0),
        )?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    fn clear(&self, user_id: &str) -> Result<(), MemoryError> {
        let conn = self.connect()?;
        conn.execute(
            "DELETE FROM episodic_memory WHERE user_id = ?1",
            params![user_id],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_storage() -> (tempfile::TempDir, EpisodicSQLiteStorage) {
        let dir = tempfile::tempdir().unwrap();
        let storage =
            EpisodicSQLiteStorage::new(Some(dir.path().join("episodic.db")), true).unwrap();
        (dir, storage)
    }

    #[test]
    fn test_append_and_recent_preserve_order() {
        let (_dir, storage) = temp_storage();
        for i in 0..5 {
            let event = MemoryEvent::new("user1", &format!("q{}", i), &format!("a{}", i), HashMap::new());
            storage.append(&event).unwrap();
        }

        let recent = storage.recent("user1", 3).unwrap();
        let queries: Vec<&str> = recent.iter().map(|e| e.query.as_str()).collect();
        assert_eq!(queries, vec!["q2", "q3", "q4"]);
        assert_eq!(storage.count("user1").unwrap(), 5);
    }

    #[test]
    fn test_round_trips_metadata_and_timestamp() {
        let (_dir, storage) = temp_storage();
        let mut metadata = HashMap::new();
        metadata.insert("source".to_string(), Value::String("test".to_string()));
        let event = MemoryEvent::new("user1", "What is Rome?", "Rome is the capital of Italy.", metadata);
        storage.append(&event).unwrap();

        let stored = storage.all("user1").unwrap();
        assert_eq!(stored, vec![event]);
    }

    #[test]
    fn test_users_are_isolated_and_clear_is_scoped() {
        let (_dir, storage) = temp_storage();
        storage
            .append(&MemoryEvent::new("alice", "qa", "aa", HashMap::new()))
            .unwrap();
        storage
            .append(&MemoryEvent::new("bob", "qb", "ab", HashMap::new()))
            .unwrap();

        storage.clear("alice").unwrap();
        assert!(storage.recent("alice", 10).unwrap().is_empty());
        assert_eq!(storage.all("bob").unwrap().len(), 1);
    }

    #[test]
    fn test_reopen_keeps_events() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("episodic.db");
        {
            let storage = EpisodicSQLiteStorage::new(Some(path.clone()), false).unwrap();
            storage
                .append(&MemoryEvent::new("user1", "q", "a", HashMap::new()))
                .unwrap();
        }
        let reopened = EpisodicSQLiteStorage::new(Some(path), false).unwrap();
        assert_eq!(reopened.count("user1").unwrap(), 1);
    }

    #[test]
    fn test_concurrent_appends_keep_timestamps_ordered() {
        let (_dir, storage) = temp_storage();
        let base = Utc::now();
        let threads: Vec<_> = (0..4)
            .map(|t| {
                let storage = storage.clone();
                std::thread::spawn(move || {
                    for i in 0..10 {
                        let mut event =
                            MemoryEvent::new("user1", &format!("q{}-{}", t, i), "a", HashMap::new());
                        event.timestamp = base - chrono::Duration::seconds(i * 4 + t);
                        storage.append(&event).unwrap();
                    }
                })
            })
            .collect();
        for thread in threads {
            thread.join().unwrap();
        }

        let events = storage.all("user1").unwrap();
        assert_eq!(events.len(), 40);
        assert!(events.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    }
}
