//! Index file persistence
//!
//! The index is one JSON document. Saves go through a temp file in the target
//! directory followed by a rename, so readers see the old file or the new one.
//! Loads never fail on bad content: a missing, corrupt or incompatible file is
//! reported as `LoadOutcome::Absent`.

use crate::Settings;
use crate::indexing::walker::FileDiscoverer;
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::index_data::{INDEX_VERSION, PersistedIndex};
use crate::storage::staleness::{StalenessChecker, StalenessReport};
use crate::storage::validation::validate;
use parking_lot::Mutex;
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Why no usable index was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbsentReason {
    Missing,
    VersionMismatch { found: String, expected: String },
    Corrupt(String),
}

impl fmt::Display for AbsentReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing => write!(f, "no index file"),
            Self::VersionMismatch { found, expected } => {
                write!(f, "index version {found}, expected {expected}")
            }
            Self::Corrupt(reason) => write!(f, "corrupt index: {reason}"),
        }
    }
}

#[derive(Debug)]
pub enum LoadOutcome {
    Loaded(Box<PersistedIndex>),
    Absent(AbsentReason),
}

impl LoadOutcome {
    pub fn into_index(self) -> Option<PersistedIndex> {
        match self {
            Self::Loaded(index) => Some(*index),
            Self::Absent(_) => None,
        }
    }
}

/// Only the version field, so an incompatible file is recognised before a full parse.
#[derive(Deserialize)]
struct VersionHeader {
    version: Option<String>,
}

/// Manages the persisted index file
#[derive(Debug)]
pub struct IndexStorage {
    path: PathBuf,
    max_age: Option<chrono::Duration>,
    write_lock: Mutex<()>,
}

impl IndexStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            max_age: None,
            write_lock: Mutex::new(()),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.index_file()).with_max_age(chrono::Duration::days(i64::from(
            settings.storage.max_age_days,
        )))
    }

    /// Report a soft `index_too_old` reason past this age.
    pub fn with_max_age(mut self, max_age: chrono::Duration) -> Self {
        self.max_age = Some(max_age);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Load the persisted index.
    ///
    /// Errors only when the file exists but cannot be read.
    #[must_use = "Load errors should be handled appropriately"]
    pub fn load(&self) -> StorageResult<LoadOutcome> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Ok(LoadOutcome::Absent(AbsentReason::Missing));
            }
            Err(e) => {
                return Err(StorageError::Read {
                    path: self.path.clone(),
                    source: e,
                });
            }
        };

        let header: VersionHeader = match serde_json::from_slice(&bytes) {
            Ok(header) => header,
            Err(e) => return Ok(self.absent(AbsentReason::Corrupt(e.to_string()))),
        };
        let found = header.version.unwrap_or_default();
        if found != INDEX_VERSION {
            return Ok(self.absent(AbsentReason::VersionMismatch {
                found,
                expected: INDEX_VERSION.to_string(),
            }));
        }

        let index: PersistedIndex = match serde_json::from_slice(&bytes) {
            Ok(index) => index,
            Err(e) => return Ok(self.absent(AbsentReason::Corrupt(e.to_string()))),
        };

        let report = validate(&index);
        if let Some(issue) = report.errors().next() {
            return Ok(self.absent(AbsentReason::Corrupt(issue.message.clone())));
        }

        tracing::debug!(
            "[storage] loaded {} resources from {}",
            index.index.len(),
            self.path.display()
        );
        Ok(LoadOutcome::Loaded(Box::new(index)))
    }

    fn absent(&self, reason: AbsentReason) -> LoadOutcome {
        tracing::warn!("[storage] ignoring {}: {reason}", self.path.display());
        LoadOutcome::Absent(reason)
    }

    /// Atomically replace the index file.
    #[must_use = "Save errors should be handled to ensure data is persisted"]
    pub fn save(&self, index: &PersistedIndex) -> StorageResult<()> {
        let _guard = self.write_lock.lock();

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir).map_err(|e| StorageError::CreateDir {
            path: dir.clone(),
            source: e,
        })?;

        let write_err = |source: std::io::Error| StorageError::Write {
            path: self.path.clone(),
            source,
        };

        let temp = tempfile::Builder::new()
            .prefix(".index.")
            .suffix(".tmp")
            .tempfile_in(&dir)
            .map_err(write_err)?;

        let mut writer = BufWriter::new(temp);
        serde_json::to_writer_pretty(&mut writer, index)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        writer.flush().map_err(write_err)?;
        let temp = writer
            .into_inner()
            .map_err(|e| write_err(e.into_error()))?;
        temp.as_file().sync_all().map_err(write_err)?;
        temp.persist(&self.path).map_err(|e| write_err(e.error))?;

        tracing::info!(
            "[storage] saved {} resources to {}",
            index.index.len(),
            self.path.display()
        );
        Ok(())
    }

    /// Remove the index file; a missing file is not an error.
    pub fn clear(&self) -> StorageResult<()> {
        let _guard = self.write_lock.lock();
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::Remove {
                path: self.path.clone(),
                source: e,
            }),
        }
    }

    /// Re-run discovery and compare file checksums and the configuration fingerprint.
    pub fn is_stale(
        &self,
        index: &PersistedIndex,
        discoverer: &FileDiscoverer,
        config_fingerprint: &str,
    ) -> StalenessReport {
        let discovery = discoverer.discover();
        let current: Vec<_> = discovery.paths().map(Path::to_path_buf).collect();

        let mut checker = StalenessChecker::new().with_config_fingerprint(config_fingerprint);
        if let Some(max_age) = self.max_age {
            checker = checker.with_max_age(max_age);
        }
        checker.check(index, &current)
    }
}
