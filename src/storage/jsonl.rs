//! JSONL-based storage implementation with in-memory caching.
//!
//! Each collection is a `<collection>.jsonl` file under the base directory.
//! Every call takes a lock on `.lock` in that directory (shared for reads,
//! exclusive for writes), so instances in other processes see each other's
//! writes. The lock file holds a write generation that every write bumps.
//! Writes re-read the file, apply the change to that copy, write it out and only
//! then refresh the cache. Reads reuse the cache while the generation is unchanged.

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockWriteGuard};

use serde::{Serialize, de::DeserializeOwned};

use super::traits::{Filter, HasId, Storage, record_version};
use crate::error::{Result, ReviewrError};

/// Lock file guarding every collection in a data directory.
const LOCK_FILE: &str = ".lock";

type Records = Vec<serde_json::Value>;

#[derive(Debug)]
struct CachedCollection {
    records: Records,
    /// Directory write generation the records were read at
    generation: u64,
}

/// Directory lock held for the duration of one storage call.
struct DirLock(File);

impl DirLock {
    fn generation(&mut self) -> Result<u64> {
        let mut content = String::new();
        self.0.seek(SeekFrom::Start(0))?;
        self.0.read_to_string(&mut content)?;
        Ok(content.trim().parse().unwrap_or(0))
    }

    /// Advance the generation. Only called under the exclusive lock.
    fn bump(&mut self) -> Result<u64> {
        let next = self.generation()? + 1;
        self.0.set_len(0)?;
        self.0.seek(SeekFrom::Start(0))?;
        write!(self.0, "{}", next)?;
        self.0.flush()?;
        Ok(next)
    }
}

impl Drop for DirLock {
    fn drop(&mut self) {
        if let Err(e) = self.0.unlock() {
            log::warn!("Failed to release storage lock: {}", e);
        }
    }
}

/// JSONL-based storage with in-memory caching.
pub struct JsonlStorage {
    base_path: PathBuf,
    cache: RwLock<HashMap<String, CachedCollection>>,
}

impl std::fmt::Debug for JsonlStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonlStorage")
            .field("base_path", &self.base_path)
            .finish_non_exhaustive()
    }
}

impl JsonlStorage {
    /// Create a new JsonlStorage at the given path.
    pub fn new(base_path: impl AsRef<Path>) -> Result<Self> {
        let base_path = base_path.as_ref().to_path_buf();
        fs::create_dir_all(&base_path)?;
        Ok(Self {
            base_path,
            cache: RwLock::new(HashMap::new()),
        })
    }

    /// Directory holding the collection files.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Get the file path for a collection.
    fn collection_path(&self, collection: &str) -> PathBuf {
        self.base_path.join(format!("{}.jsonl", collection))
    }

    fn open_lock_file(&self) -> Result<File> {
        Ok(OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(self.base_path.join(LOCK_FILE))?)
    }

    fn lock_shared(&self) -> Result<DirLock> {
        let file = self.open_lock_file()?;
        file.lock_shared()?;
        Ok(DirLock(file))
    }

    fn lock_exclusive(&self) -> Result<DirLock> {
        let file = self.open_lock_file()?;
        file.lock()?;
        Ok(DirLock(file))
    }

    fn write_cache(&self) -> Result<RwLockWriteGuard<'_, HashMap<String, CachedCollection>>> {
        self.cache.write().map_err(|e| ReviewrError::Storage(e.to_string()))
    }

    /// Run `f` on the records of `collection`, reloading them first if any
    /// instance wrote to the directory since they were cached.
    fn with_records<R>(&self, collection: &str, f: impl FnOnce(&Records) -> Result<R>) -> Result<R> {
        let mut lock = self.lock_shared()?;
        let generation = lock.generation()?;
        {
            let cache = self.cache.read().map_err(|e| ReviewrError::Storage(e.to_string()))?;
            if let Some(cached) = cache.get(collection)
                && cached.generation == generation
            {
                return f(&cached.records);
            }
        }

        let path = self.collection_path(collection);
        let records = read_records(&path)?;
        log::debug!("Loaded {} records from {}", records.len(), path.display());
        let result = f(&records);
        self.commit(collection, records, generation)?;
        result
    }

    /// Cache records that match the file on disk at `generation`.
    fn commit(&self, collection: &str, records: Records, generation: u64) -> Result<()> {
        self.write_cache()?
            .insert(collection.to_string(), CachedCollection { records, generation });
        Ok(())
    }

    /// Apply `change` to a fresh copy of `collection` and write it back.
    ///
    /// `change` returns its result and whether the file needs rewriting. The
    /// cache is only updated once the new file is in place.
    fn modify<R>(&self, collection: &str, change: impl FnOnce(&mut Records) -> Result<(R, bool)>) -> Result<R> {
        let mut lock = self.lock_exclusive()?;
        let path = self.collection_path(collection);
        let mut records = read_records(&path)?;

        let (result, changed) = change(&mut records)?;
        if changed {
            let generation = lock.bump()?;
            rewrite_file(&path, &records)?;
            self.commit(collection, records, generation)?;
        }
        Ok(result)
    }

    /// Replace the record with `id`, optionally checking its version first.
    fn replace(&self, collection: &str, id: &str, expected_version: Option<u64>, value: serde_json::Value) -> Result<()> {
        self.modify(collection, |records| {
            let slot = records
                .iter_mut()
                .find(|r| record_id(r) == Some(id))
                .ok_or_else(|| not_found(collection, id))?;

            if let Some(expected) = expected_version {
                let current = record_version(slot);
                if current != expected {
                    return Err(ReviewrError::Conflict(format!(
                        "{}/{} is at version {}, expected {}",
                        collection, id, current, expected
                    )));
                }
            }
            *slot = value;
            Ok(((), true))
        })
    }
}

fn read_records(path: &Path) -> Result<Records> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let reader = BufReader::new(File::open(path)?);
    let mut records = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if !line.trim().is_empty() {
            records.push(serde_json::from_str(&line)?);
        }
    }
    Ok(records)
}

/// Append a record to the JSONL file.
fn append_to_file(path: &Path, record: &serde_json::Value) -> Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{}", serde_json::to_string(record)?)?;
    Ok(())
}

/// Rewrite the entire collection file through a temp file and rename.
fn rewrite_file(path: &Path, records: &[serde_json::Value]) -> Result<()> {
    let tmp_path = path.with_extension("jsonl.tmp");
    {
        let mut writer = BufWriter::new(File::create(&tmp_path)?);
        for record in records {
            writeln!(writer, "{}", serde_json::to_string(record)?)?;
        }
        writer.flush()?;
    }
    fs::rename(&tmp_path, path)?;
    Ok(())
}

fn record_id(record: &serde_json::Value) -> Option<&str> {
    record.get("id").and_then(|v| v.as_str())
}

fn not_found(collection: &str, id: &str) -> ReviewrError {
    ReviewrError::RecordNotFound {
        collection: collection.to_string(),
        id: id.to_string(),
    }
}

impl Storage for JsonlStorage {
    fn create<T: Serialize + DeserializeOwned + HasId>(&self, collection: &str, record: &T) -> Result<()> {
        let value = serde_json::to_value(record)?;

        let mut lock = self.lock_exclusive()?;
        let path = self.collection_path(collection);
        let mut records = read_records(&path)?;
        if records.iter().any(|r| record_id(r) == Some(record.id())) {
            return Err(ReviewrError::Conflict(format!(
                "{}/{} already exists",
                collection,
                record.id()
            )));
        }

        let generation = lock.bump()?;
        append_to_file(&path, &value)?;
        records.push(value);
        self.commit(collection, records, generation)
    }

    fn get<T: DeserializeOwned>(&self, collection: &str, id: &str) -> Result<Option<T>> {
        self.with_records(collection, |records| {
            match records.iter().find(|r| record_id(r) == Some(id)) {
                Some(record) => Ok(Some(serde_json::from_value(record.clone())?)),
                None => Ok(None),
            }
        })
    }

    fn update<T: Serialize + DeserializeOwned + HasId>(&self, collection: &str, id: &str, record: &T) -> Result<()> {
        let value = serde_json::to_value(record)?;
        self.replace(collection, id, None, value)
    }

    fn compare_and_update<T: Serialize + DeserializeOwned + HasId>(
        &self,
        collection: &str,
        id: &str,
        expected_version: u64,
        record: &T,
    ) -> Result<()> {
        let value = serde_json::to_value(record)?;
        self.replace(collection, id, Some(expected_version), value)
    }

    fn delete(&self, collection: &str, id: &str) -> Result<()> {
        self.modify(collection, |records| {
            let original_len = records.len();
            records.retain(|r| record_id(r) != Some(id));
            if records.len() == original_len {
                return Err(not_found(collection, id));
            }
            Ok(((), true))
        })
    }

    fn delete_where(&self, collection: &str, filters: &[Filter]) -> Result<usize> {
        self.modify(collection, |records| {
            let original_len = records.len();
            records.retain(|r| !filters.iter().all(|f| f.matches(r)));
            let removed = original_len - records.len();
            Ok((removed, removed > 0))
        })
    }

    fn query<T: DeserializeOwned>(&self, collection: &str, filters: &[Filter]) -> Result<Vec<T>> {
        self.with_records(collection, |records| {
            let mut results = Vec::new();
            for record in records {
                if filters.iter().all(|f| f.matches(record)) {
                    let parsed: T = serde_json::from_value(record.clone())?;
                    results.push(parsed);
                }
            }
            Ok(results)
        })
    }

    fn list<T: DeserializeOwned>(&self, collection: &str) -> Result<Vec<T>> {
        self.query(collection, &[])
    }
}
