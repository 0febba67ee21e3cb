//! Content-based staleness detection.
//!
//! A persisted index is stale when the set of discovered files or any file's bytes
//! differ from what was recorded. Modification times are never consulted.

use crate::storage::index_data::PersistedIndex;
use crate::utils::checksum_file;
use rayon::prelude::*;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum StalenessReason {
    FileAdded { path: PathBuf },
    FileModified { path: PathBuf },
    FileDeleted { path: PathBuf },
    ConfigChanged,
    /// Reported but never makes the index stale on its own
    IndexTooOld { age_days: i64 },
}

impl StalenessReason {
    pub fn is_soft(&self) -> bool {
        matches!(self, Self::IndexTooOld { .. })
    }
}

impl fmt::Display for StalenessReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FileAdded { path } => write!(f, "file added: {}", path.display()),
            Self::FileModified { path } => write!(f, "file modified: {}", path.display()),
            Self::FileDeleted { path } => write!(f, "file deleted: {}", path.display()),
            Self::ConfigChanged => write!(f, "scan configuration or rule table changed"),
            Self::IndexTooOld { age_days } => write!(f, "index is {age_days} days old"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StalenessReport {
    pub stale: bool,
    pub reasons: Vec<StalenessReason>,
    pub added: Vec<PathBuf>,
    pub changed: Vec<PathBuf>,
    pub deleted: Vec<PathBuf>,
    /// Files whose checksum was recomputed
    pub checked_files: usize,
}

impl StalenessReport {
    pub fn summary(&self) -> String {
        if !self.stale {
            return match self.reasons.iter().find(|r| r.is_soft()) {
                Some(reason) => format!("fresh ({reason})"),
                None => "fresh".to_string(),
            };
        }
        let mut parts = Vec::new();
        if !self.added.is_empty() {
            parts.push(format!("{} added", self.added.len()));
        }
        if !self.changed.is_empty() {
            parts.push(format!("{} changed", self.changed.len()));
        }
        if !self.deleted.is_empty() {
            parts.push(format!("{} deleted", self.deleted.len()));
        }
        if self.reasons.contains(&StalenessReason::ConfigChanged) {
            parts.push("configuration changed".to_string());
        }
        format!("stale: {}", parts.join(", "))
    }
}

/// Compares a persisted index against the files currently on disk.
#[derive(Debug, Clone, Default)]
pub struct StalenessChecker {
    config_fingerprint: Option<String>,
    max_age: Option<chrono::Duration>,
}

impl StalenessChecker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also report `config_changed` when the fingerprint differs from the recorded one.
    pub fn with_config_fingerprint(mut self, fingerprint: impl Into<String>) -> Self {
        self.config_fingerprint = Some(fingerprint.into());
        self
    }

    /// Report a soft `index_too_old` reason past this age.
    pub fn with_max_age(mut self, max_age: chrono::Duration) -> Self {
        self.max_age = Some(max_age);
        self
    }

    /// `current_files` is the result of a fresh discovery pass.
    pub fn check(&self, index: &PersistedIndex, current_files: &[PathBuf]) -> StalenessReport {
        // Indexed files always have a checksum; skipped ones only when readable
        let mut recorded: BTreeMap<&Path, Option<&str>> = index
            .source_files
            .iter()
            .map(|(path, info)| (path.as_path(), Some(info.checksum.as_str())))
            .collect();
        for skipped in &index.metadata.skipped_files {
            recorded.insert(skipped.path.as_path(), skipped.checksum.as_deref());
        }

        let current: BTreeSet<&Path> = current_files.iter().map(PathBuf::as_path).collect();

        let added: Vec<PathBuf> = current
            .iter()
            .filter(|path| !recorded.contains_key(*path))
            .map(|path| path.to_path_buf())
            .collect();
        let deleted: Vec<PathBuf> = recorded
            .keys()
            .filter(|path| !current.contains(*path))
            .map(|path| path.to_path_buf())
            .collect();

        let common: Vec<(&Path, Option<&str>)> = recorded
            .iter()
            .filter(|(path, _)| current.contains(*path))
            .map(|(path, checksum)| (*path, *checksum))
            .collect();
        let mut changed: Vec<PathBuf> = common
            .par_iter()
            .filter(|(path, expected)| checksum_file(path).ok().as_deref() != *expected)
            .map(|(path, _)| path.to_path_buf())
            .collect();
        changed.sort();

        let mut reasons: Vec<StalenessReason> = Vec::new();
        reasons.extend(added.iter().map(|path| StalenessReason::FileAdded { path: path.clone() }));
        reasons.extend(
            changed
                .iter()
                .map(|path| StalenessReason::FileModified { path: path.clone() }),
        );
        reasons.extend(
            deleted
                .iter()
                .map(|path| StalenessReason::FileDeleted { path: path.clone() }),
        );
        if let Some(fingerprint) = &self.config_fingerprint {
            if *fingerprint != index.metadata.config_fingerprint {
                reasons.push(StalenessReason::ConfigChanged);
            }
        }

        let stale = !reasons.is_empty();

        if let Some(max_age) = self.max_age {
            let age = index.age();
            if age > max_age {
                reasons.push(StalenessReason::IndexTooOld {
                    age_days: age.num_days(),
                });
            }
        }

        tracing::debug!(
            "[storage] staleness: {} checked, {} added, {} changed, {} deleted",
            common.len(),
            added.len(),
            changed.len(),
            deleted.len()
        );

        StalenessReport {
            stale,
            reasons,
            added,
            changed,
            deleted,
            checked_files: common.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::index_data::{
        INDEX_VERSION, IndexMetadata, IndexStatistics, ResourceIndex, SkippedFile,
    };
    use crate::types::SourceFileInfo;
    use chrono::Utc;
    use std::fs;
    use tempfile::TempDir;

    fn index_of(files: &[&Path], skipped: &[&Path]) -> PersistedIndex {
        let source_files = files
            .iter()
            .map(|path| {
                let info = SourceFileInfo {
                    path: path.to_path_buf(),
                    checksum: checksum_file(path).unwrap(),
                    size_bytes: 0,
                    resources_found: 0,
                };
                (path.to_path_buf(), info)
            })
            .collect();
        let skipped_files = skipped
            .iter()
            .map(|path| SkippedFile {
                path: path.to_path_buf(),
                checksum: checksum_file(path).ok(),
                reason: "syntax error".into(),
            })
            .collect();

        PersistedIndex {
            version: INDEX_VERSION.to_string(),
            indexed_at: Utc::now(),
            metadata: IndexMetadata {
                total_resources: 0,
                total_files: files.len(),
                scan_duration_ms: 0,
                files_discovered: files.len() + skipped.len(),
                source_directories: Vec::new(),
                include_patterns: Vec::new(),
                exclude_patterns: Vec::new(),
                config_fingerprint: "cfg".into(),
                skipped_files,
            },
            source_files,
            index: ResourceIndex::default(),
            statistics: IndexStatistics::default(),
        }
    }

    #[test]
    fn test_unchanged_files_are_fresh() {
        let temp_dir = TempDir::new().unwrap();
        let a = temp_dir.path().join("a.tf");
        fs::write(&a, "resource \"aws_vpc\" \"a\" {}").unwrap();

        let index = index_of(&[&a], &[]);
        let report = StalenessChecker::new().check(&index, &[a.clone()]);

        assert!(!report.stale, "{}", report.summary());
        assert_eq!(report.checked_files, 1);
    }

    #[test]
    fn test_added_changed_deleted() {
        let temp_dir = TempDir::new().unwrap();
        let a = temp_dir.path().join("a.tf");
        let b = temp_dir.path().join("b.tf");
        let c = temp_dir.path().join("c.tf");
        fs::write(&a, "a").unwrap();
        fs::write(&b, "b").unwrap();

        let index = index_of(&[&a, &b], &[]);
        fs::write(&a, "a changed").unwrap();
        fs::write(&c, "c").unwrap();

        let report = StalenessChecker::new().check(&index, &[a.clone(), c.clone()]);
        println!("Summary: {}", report.summary());

        assert!(report.stale);
        assert_eq!(report.added, vec![c]);
        assert_eq!(report.changed, vec![a]);
        assert_eq!(report.deleted, vec![b]);
    }

    #[test]
    fn test_unchanged_broken_file_is_not_new() {
        let temp_dir = TempDir::new().unwrap();
        let good = temp_dir.path().join("good.tf");
        let broken = temp_dir.path().join("broken.tf");
        fs::write(&good, "resource \"aws_vpc\" \"a\" {}").unwrap();
        fs::write(&broken, "resource {").unwrap();

        let index = index_of(&[&good], &[&broken]);
        let files = vec![broken.clone(), good.clone()];
        assert!(!StalenessChecker::new().check(&index, &files).stale);

        fs::write(&broken, "resource \"aws_vpc\" \"b\" {}").unwrap();
        let report = StalenessChecker::new().check(&index, &files);
        assert_eq!(report.changed, vec![broken]);
    }

    #[test]
    fn test_config_change_and_soft_age() {
        let temp_dir = TempDir::new().unwrap();
        let a = temp_dir.path().join("a.tf");
        fs::write(&a, "a").unwrap();

        let mut index = index_of(&[&a], &[]);
        index.indexed_at = Utc::now() - chrono::Duration::days(30);

        let report = StalenessChecker::new()
            .with_config_fingerprint("cfg")
            .with_max_age(chrono::Duration::days(7))
            .check(&index, &[a.clone()]);
        assert!(!report.stale, "age alone never makes an index stale");
        assert!(matches!(
            report.reasons.as_slice(),
            [StalenessReason::IndexTooOld { age_days: 30 }]
        ));

        let report = StalenessChecker::new()
            .with_config_fingerprint("other")
            .check(&index, &[a]);
        assert!(report.stale);
        assert_eq!(report.reasons, vec![StalenessReason::ConfigChanged]);
    }
}
