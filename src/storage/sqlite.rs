//! SQLite-backed storage.
//!
//! All collections share one `records` table keyed by `(collection, id)`. The
//! record body is stored as JSON; the `version` column mirrors the record's
//! `version` field so compare-and-swap is a single conditional `UPDATE`.
//!
//! `rusqlite::Connection` isn't `Sync`, so it sits behind a `Mutex`. SQLite
//! operations are quick and writers need exclusive access anyway.

use std::fs;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use rusqlite::{Connection, OptionalExtension, params};
use serde::{Serialize, de::DeserializeOwned};

use super::traits::{Filter, HasId, Storage, record_version};
use crate::error::{Result, ReviewrError};

/// File name of the database inside the data directory.
pub const DB_FILE: &str = "reviewr.db";

/// How long to wait for another process holding the database lock.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Storage backed by a single SQLite database.
pub struct SqliteStorage {
    db: Mutex<Connection>,
}

impl std::fmt::Debug for SqliteStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStorage").finish_non_exhaustive()
    }
}

impl SqliteStorage {
    /// Open or create the database in `data_dir`.
    pub fn open(data_dir: impl AsRef<Path>) -> Result<Self> {
        let data_dir = data_dir.as_ref();
        fs::create_dir_all(data_dir)?;
        let db_path = data_dir.join(DB_FILE);
        let db = Connection::open(&db_path)?;
        db.busy_timeout(BUSY_TIMEOUT)?;
        log::debug!("Opened SQLite storage at {}", db_path.display());
        Self::with_connection(db)
    }

    /// Open a private in-memory database.
    pub fn in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(db: Connection) -> Result<Self> {
        Self::init_schema(&db)?;
        Ok(Self { db: Mutex::new(db) })
    }

    /// Initialize the SQLite schema.
    fn init_schema(db: &Connection) -> Result<()> {
        db.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS records (
                collection TEXT NOT NULL,
                id TEXT NOT NULL,
                version INTEGER NOT NULL DEFAULT 0,
                json_data TEXT NOT NULL,
                PRIMARY KEY (collection, id)
            );

            CREATE INDEX IF NOT EXISTS idx_records_collection ON records(collection);
            "#,
        )?;
        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.db.lock().map_err(|e| ReviewrError::Storage(e.to_string()))
    }

    /// Load every record of a collection, in insertion order.
    fn load_collection(db: &Connection, collection: &str) -> Result<Vec<(String, serde_json::Value)>> {
        let mut stmt = db.prepare("SELECT id, json_data FROM records WHERE collection = ?1 ORDER BY rowid")?;
        let rows = stmt.query_map(params![collection], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (id, json) = row?;
            records.push((id, serde_json::from_str(&json)?));
        }
        Ok(records)
    }
}

fn not_found(collection: &str, id: &str) -> ReviewrError {
    ReviewrError::RecordNotFound {
        collection: collection.to_string(),
        id: id.to_string(),
    }
}

/// SQLite stores integers as i64.
fn version_param(version: u64) -> i64 {
    i64::try_from(version).unwrap_or(i64::MAX)
}

impl Storage for SqliteStorage {
    fn create<T: Serialize + DeserializeOwned + HasId>(&self, collection: &str, record: &T) -> Result<()> {
        let value = serde_json::to_value(record)?;
        let json = serde_json::to_string(&value)?;
        let db = self.conn()?;

        let inserted = db.execute(
            "INSERT OR IGNORE INTO records (collection, id, version, json_data) VALUES (?1, ?2, ?3, ?4)",
            params![collection, record.id(), version_param(record_version(&value)), json],
        )?;
        if inserted == 0 {
            return Err(ReviewrError::Conflict(format!(
                "{}/{} already exists",
                collection,
                record.id()
            )));
        }
        Ok(())
    }

    fn get<T: DeserializeOwned>(&self, collection: &str, id: &str) -> Result<Option<T>> {
        let db = self.conn()?;
        let json: Option<String> = db
            .query_row(
                "SELECT json_data FROM records WHERE collection = ?1 AND id = ?2",
                params![collection, id],
                |row| row.get(0),
            )
            .optional()?;

        match json {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    fn update<T: Serialize + DeserializeOwned + HasId>(&self, collection: &str, id: &str, record: &T) -> Result<()> {
        let value = serde_json::to_value(record)?;
        let json = serde_json::to_string(&value)?;
        let db = self.conn()?;

        let updated = db.execute(
            "UPDATE records SET version = ?3, json_data = ?4 WHERE collection = ?1 AND id = ?2",
            params![collection, id, version_param(record_version(&value)), json],
        )?;
        if updated == 0 {
            return Err(not_found(collection, id));
        }
        Ok(())
    }

    fn compare_and_update<T: Serialize + DeserializeOwned + HasId>(
        &self,
        collection: &str,
        id: &str,
        expected_version: u64,
        record: &T,
    ) -> Result<()> {
        let value = serde_json::to_value(record)?;
        let json = serde_json::to_string(&value)?;
        let db = self.conn()?;

        let updated = db.execute(
            "UPDATE records SET version = ?4, json_data = ?5 WHERE collection = ?1 AND id = ?2 AND version = ?3",
            params![
                collection,
                id,
                version_param(expected_version),
                version_param(record_version(&value)),
                json
            ],
        )?;
        if updated == 1 {
            return Ok(());
        }

        let current: Option<i64> = db
            .query_row(
                "SELECT version FROM records WHERE collection = ?1 AND id = ?2",
                params![collection, id],
                |row| row.get(0),
            )
            .optional()?;
        match current {
            Some(current) => Err(ReviewrError::Conflict(format!(
                "{}/{} is at version {}, expected {}",
                collection, id, current, expected_version
            ))),
            None => Err(not_found(collection, id)),
        }
    }

    fn delete(&self, collection: &str, id: &str) -> Result<()> {
        let db = self.conn()?;
        let deleted = db.execute(
            "DELETE FROM records WHERE collection = ?1 AND id = ?2",
            params![collection, id],
        )?;
        if deleted == 0 {
            return Err(not_found(collection, id));
        }
        Ok(())
    }

    fn delete_where(&self, collection: &str, filters: &[Filter]) -> Result<usize> {
        let mut db = self.conn()?;
        let tx = db.transaction()?;

        let doomed: Vec<String> = Self::load_collection(&tx, collection)?
            .into_iter()
            .filter(|(_, value)| filters.iter().all(|f| f.matches(value)))
            .map(|(id, _)| id)
            .collect();

        for id in &doomed {
            tx.execute(
                "DELETE FROM records WHERE collection = ?1 AND id = ?2",
                params![collection, id],
            )?;
        }
        tx.commit()?;
        Ok(doomed.len())
    }

    fn query<T: DeserializeOwned>(&self, collection: &str, filters: &[Filter]) -> Result<Vec<T>> {
        let db = self.conn()?;
        let mut results = Vec::new();
        for (_, value) in Self::load_collection(&db, collection)? {
            if filters.iter().all(|f| f.matches(&value)) {
                results.push(serde_json::from_value(value)?);
            }
        }
        Ok(results)
    }

    fn list<T: DeserializeOwned>(&self, collection: &str) -> Result<Vec<T>> {
        self.query(collection, &[])
    }
}
