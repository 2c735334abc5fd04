pub mod model;
pub mod storage;
pub mod validation;
pub mod enrich;
pub mod clock;
pub mod pdf;
pub mod access_log;
pub mod error;
pub mod service;
pub mod server;
pub mod config;

use std::fmt;
use std::path::Path;
use std::sync::{Mutex, RwLock};
use tracing::{debug, info};
use crate::model::{MovieFields, MovieRecord};
use crate::storage::{CollectionFile, StorageError};

/// Owns the movie collection.
///
/// Reads are served from memory. Every mutation runs under the writer lock:
/// copy the collection, change the copy, rewrite the file, then swap the copy
/// in. A failed write leaves both memory and disk at the previous state, and
/// overlapping writers cannot lose each other's changes.
pub struct MovieDb {
    writer: Mutex<Writer>,
    records: RwLock<Vec<MovieRecord>>,
}

struct Writer {
    file: CollectionFile,
    // High-water mark; ids freed by deletion are not handed out again.
    next_id: u64,
}

impl fmt::Debug for MovieDb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MovieDb")
        .field("record_count", &self.records.read().map(|r| r.len()).unwrap_or(0))
        .finish()
    }
}

impl MovieDb {
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        let file = CollectionFile::new(path);
        let records = file.read_all()?;
        let next_id = records.iter().map(|r| r.id).max().unwrap_or(0) + 1;

        info!("Loaded {} movies from {}", records.len(), path.display());

        Ok(Self {
            writer: Mutex::new(Writer { file, next_id }),
            records: RwLock::new(records),
        })
    }

    pub fn get(&self, id: u64) -> Result<Option<MovieRecord>, StorageError> {
        let records = self.records.read().map_err(|_| StorageError::Poisoned)?;
        Ok(records.iter().find(|r| r.id == id).cloned())
    }

    /// Snapshot of the whole collection in stored order.
    pub fn all(&self) -> Result<Vec<MovieRecord>, StorageError> {
        let records = self.records.read().map_err(|_| StorageError::Poisoned)?;
        Ok(records.clone())
    }

    pub fn len(&self) -> Result<usize, StorageError> {
        let records = self.records.read().map_err(|_| StorageError::Poisoned)?;
        Ok(records.len())
    }

    pub fn is_empty(&self) -> Result<bool, StorageError> {
        Ok(self.len()? == 0)
    }

    pub fn insert(&self, fields: MovieFields) -> Result<MovieRecord, StorageError> {
        self.commit(|records, next_id| {
            let record = MovieRecord::new(*next_id, fields);
            *next_id += 1;
            records.push(record.clone());
            record
        })
    }

    /// Returns `None` when no record has `id`; nothing is written then.
    pub fn update(&self, id: u64, fields: MovieFields) -> Result<Option<MovieRecord>, StorageError> {
        self.commit(|records, _| {
            let record = records.iter_mut().find(|r| r.id == id)?;
            record.merge(fields);
            Some(record.clone())
        })
    }

    pub fn delete(&self, id: u64) -> Result<Option<MovieRecord>, StorageError> {
        self.commit(|records, _| {
            let pos = records.iter().position(|r| r.id == id)?;
            Some(records.remove(pos))
        })
    }

    /// Sets `language` and `updated_at` on every record. Returns how many changed.
    pub fn set_language_all(&self, language: &str, updated_at: &str) -> Result<usize, StorageError> {
        self.commit(|records, _| {
            for record in records.iter_mut() {
                record.language = language.to_owned();
                record.updated_at = Some(updated_at.to_owned());
            }
            records.len()
        })
    }

    /// Runs one read-modify-write cycle. The file is left alone when
    /// `mutate` changes nothing.
    fn commit<R>(
        &self,
        mutate: impl FnOnce(&mut Vec<MovieRecord>, &mut u64) -> R,
    ) -> Result<R, StorageError> {
        let mut writer = self.writer.lock().map_err(|_| StorageError::Poisoned)?;

        let mut next = self.records.read().map_err(|_| StorageError::Poisoned)?.clone();
        let mut next_id = writer.next_id;
        let outcome = mutate(&mut next, &mut next_id);

        if *self.records.read().map_err(|_| StorageError::Poisoned)? == next {
            return Ok(outcome);
        }

        writer.file.write_all(&next)?;
        debug!("Persisted {} movies to {}", next.len(), writer.file.file_path.display());

        writer.next_id = next_id;
        *self.records.write().map_err(|_| StorageError::Poisoned)? = next;
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn fields(title: &str, genre: &str) -> MovieFields {
        MovieFields {
            title: title.into(),
            director: "Dir".into(),
            release_year: 2000,
            genre: genre.into(),
            rating: 7.0,
            duration_minutes: 100,
            language: "en".into(),
            created_at: Some("2024-01-01T00:00:00.000000Z".into()),
            updated_at: None,
            ip: None,
        }
    }

    #[test]
    fn ids_are_sequential_and_never_reused() {
        let dir = tempfile::tempdir().unwrap();
        let db = MovieDb::open(&dir.path().join("movies.json")).unwrap();

        assert_eq!(db.insert(fields("A", "Drama")).unwrap().id, 1);
        assert_eq!(db.insert(fields("B", "Drama")).unwrap().id, 2);
        db.delete(2).unwrap().unwrap();
        db.delete(1).unwrap().unwrap();

        assert_eq!(db.insert(fields("C", "Drama")).unwrap().id, 3);
    }

    #[test]
    fn reopen_continues_after_highest_id() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("movies.json");
        {
            let db = MovieDb::open(&path).unwrap();
            db.insert(fields("A", "Drama")).unwrap();
            db.insert(fields("B", "Drama")).unwrap();
            db.insert(fields("C", "Drama")).unwrap();
            db.delete(1).unwrap();
        }

        let db = MovieDb::open(&path).unwrap();
        assert_eq!(db.len().unwrap(), 2);
        assert_eq!(db.get(2).unwrap().unwrap().title, "B");
        assert_eq!(db.insert(fields("D", "Drama")).unwrap().id, 4);
    }

    #[test]
    fn missing_ids_change_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("movies.json");
        let db = MovieDb::open(&path).unwrap();

        assert!(db.update(9, fields("X", "Drama")).unwrap().is_none());
        assert!(db.delete(9).unwrap().is_none());
        assert!(!path.exists());
    }

    #[test]
    fn bulk_language_touches_every_record() {
        let dir = tempfile::tempdir().unwrap();
        let db = MovieDb::open(&dir.path().join("movies.json")).unwrap();
        db.insert(fields("A", "Drama")).unwrap();
        db.insert(fields("B", "Comedy")).unwrap();

        let count = db.set_language_all("EN", "2024-06-01T00:00:00.000000Z").unwrap();
        assert_eq!(count, 2);
        for record in db.all().unwrap() {
            assert_eq!(record.language, "EN");
            assert_eq!(record.updated_at.as_deref(), Some("2024-06-01T00:00:00.000000Z"));
            assert_eq!(record.created_at.as_deref(), Some("2024-01-01T00:00:00.000000Z"));
        }
    }

    #[test]
    fn failed_write_keeps_previous_state() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("movies.json");
        let db = MovieDb::open(&path).unwrap();
        db.insert(fields("A", "Drama")).unwrap();

        // A directory where the temp file goes makes every write fail.
        let blocker = dir.path().join("movies.tmp");
        std::fs::create_dir(&blocker).unwrap();

        let err = db.insert(fields("B", "Drama")).unwrap_err();
        assert!(matches!(err, StorageError::Io { .. }), "{err:?}");
        let err = db.set_language_all("fr", "2024-06-01T00:00:00.000000Z").unwrap_err();
        assert!(matches!(err, StorageError::Io { .. }), "{err:?}");

        assert_eq!(db.len().unwrap(), 1);
        assert!(db.get(2).unwrap().is_none());
        assert_eq!(db.get(1).unwrap().unwrap().language, "en");
        assert_eq!(MovieDb::open(&path).unwrap().len().unwrap(), 1);

        std::fs::remove_dir(&blocker).unwrap();
        assert_eq!(db.insert(fields("C", "Drama")).unwrap().id, 2);
        assert_eq!(MovieDb::open(&path).unwrap().len().unwrap(), 2);
    }

    #[test]
    fn concurrent_inserts_are_not_lost() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("movies.json");
        let db = Arc::new(MovieDb::open(&path).unwrap());

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let db = db.clone();
                std::thread::spawn(move || {
                    for j in 0..5 {
                        db.insert(fields(&format!("{}-{}", i, j), "Drama")).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(db.len().unwrap(), 40);
        let mut ids: Vec<u64> = MovieDb::open(&path).unwrap().all().unwrap().iter().map(|r| r.id).collect();
        ids.sort_unstable();
        assert_eq!(ids, (1..=40).collect::<Vec<_>>());
    }
}
