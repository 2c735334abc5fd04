use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use crate::model::MovieRecord;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("collection file {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("store lock poisoned")]
    Poisoned,
}

/// The flat file holding the whole collection as one JSON array.
#[derive(Debug)]
pub struct CollectionFile {
    pub file_path: PathBuf,
}

impl CollectionFile {
    pub fn new(path: &Path) -> Self {
        Self { file_path: path.to_path_buf() }
    }

    /// Loads every record. A missing file is an empty collection.
    pub fn read_all(&self) -> Result<Vec<MovieRecord>, StorageError> {
        let file = match File::open(&self.file_path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(self.io_error(e)),
        };

        serde_json::from_reader(BufReader::new(file)).map_err(|source| StorageError::Corrupt {
            path: self.file_path.clone(),
            source,
        })
    }

    /// Overwrites the collection. Writes a sibling temp file and renames it
    /// over the target so readers never observe a half-written array.
    pub fn write_all(&self, records: &[MovieRecord]) -> Result<(), StorageError> {
        if let Some(parent) = self.file_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }

        let temp_path = self.file_path.with_extension("tmp");
        let file = File::create(&temp_path).map_err(|e| self.io_error(e))?;

        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, records).map_err(|source| StorageError::Corrupt {
            path: temp_path.clone(),
            source,
        })?;
        writer.flush().map_err(|e| self.io_error(e))?;
        writer.get_ref().sync_all().map_err(|e| self.io_error(e))?;

        fs::rename(&temp_path, &self.file_path).map_err(|e| self.io_error(e))
    }

    fn io_error(&self, source: io::Error) -> StorageError {
        StorageError::Io { path: self.file_path.clone(), source }
    }
}
