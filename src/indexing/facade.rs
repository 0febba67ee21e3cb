//! SecurityIndexer - entry points over builder and storage
//!
//! `build_and_persist` always rebuilds. `load_or_build` is the steady-state entry
//! point: it reuses a compatible, fresh index and rebuilds otherwise.

use crate::classify::{Classifier, RuleTable};
use crate::error::IndexResult;
use crate::indexing::builder::{BuildOutput, IndexBuilder};
use crate::indexing::warning::BuildWarning;
use crate::storage::{
    AbsentReason, IndexStorage, LoadOutcome, PersistedIndex, StalenessReport,
};
use crate::Settings;
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Why `load_or_build` did not reuse the cached index.
#[derive(Debug, Clone)]
pub enum RebuildReason {
    Absent(AbsentReason),
    Stale(StalenessReport),
    LoadFailed(String),
}

impl fmt::Display for RebuildReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Absent(reason) => write!(f, "{reason}"),
            Self::Stale(report) => write!(f, "{}", report.summary()),
            Self::LoadFailed(error) => write!(f, "load failed: {error}"),
        }
    }
}

#[derive(Debug, Clone)]
pub enum IndexSource {
    Cache,
    Rebuilt(RebuildReason),
}

/// Result of `load_or_build`.
#[derive(Debug, Clone)]
pub struct LoadedIndex {
    pub index: Arc<PersistedIndex>,
    pub source: IndexSource,
    /// Build warnings; empty when the index came from cache
    pub warnings: Vec<BuildWarning>,
}

impl LoadedIndex {
    pub fn from_cache(&self) -> bool {
        matches!(self.source, IndexSource::Cache)
    }
}

pub struct SecurityIndexer {
    settings: Settings,
    builder: IndexBuilder,
    storage: IndexStorage,
}

impl SecurityIndexer {
    pub fn new(settings: Settings, builder: IndexBuilder, storage: IndexStorage) -> Self {
        Self {
            settings,
            builder,
            storage,
        }
    }

    /// Assemble an indexer from configuration.
    ///
    /// Relative scan roots are resolved against the workspace root when one is known.
    pub fn from_settings(mut settings: Settings) -> IndexResult<Self> {
        if let Some(workspace) = settings.workspace_root.clone() {
            for root in &mut settings.scan.roots {
                if root.is_relative() {
                    *root = workspace.join(&*root);
                }
            }
        }

        let table = RuleTable::from_config(&settings.classifier)?;
        let builder = IndexBuilder::from_settings(&settings, Classifier::new(table));
        let storage = IndexStorage::from_settings(&settings);
        Ok(Self::new(settings, builder, storage))
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn builder(&self) -> &IndexBuilder {
        &self.builder
    }

    pub fn storage(&self) -> &IndexStorage {
        &self.storage
    }

    /// Build without writing anything.
    pub fn build(&self, cancel: &CancellationToken) -> IndexResult<BuildOutput> {
        self.builder.build(cancel)
    }

    /// Always rebuild and persist.
    pub fn build_and_persist(&self, cancel: &CancellationToken) -> IndexResult<BuildOutput> {
        let output = self.builder.build(cancel)?;
        self.storage.save(&output.index)?;
        Ok(output)
    }

    /// Reuse the persisted index when present, compatible and fresh; rebuild otherwise.
    pub fn load_or_build(&self, cancel: &CancellationToken) -> IndexResult<LoadedIndex> {
        let reason = match self.storage.load() {
            Ok(LoadOutcome::Loaded(index)) => {
                let report = self.check_staleness(&index);
                if !report.stale {
                    crate::debug_event!("storage", "using cached index", "{}", report.summary());
                    return Ok(LoadedIndex {
                        index: Arc::new(*index),
                        source: IndexSource::Cache,
                        warnings: Vec::new(),
                    });
                }
                RebuildReason::Stale(report)
            }
            Ok(LoadOutcome::Absent(reason)) => RebuildReason::Absent(reason),
            Err(e) => {
                tracing::warn!("[storage] {e}");
                RebuildReason::LoadFailed(e.to_string())
            }
        };

        tracing::info!("[storage] rebuilding index: {reason}");
        let output = self.build_and_persist(cancel)?;
        Ok(LoadedIndex {
            index: Arc::new(output.index),
            source: IndexSource::Rebuilt(reason),
            warnings: output.warnings,
        })
    }

    /// Re-run discovery and compare checksums, configuration and age.
    pub fn check_staleness(&self, index: &PersistedIndex) -> StalenessReport {
        self.storage.is_stale(
            index,
            self.builder.discoverer(),
            &self.builder.config_fingerprint(),
        )
    }
}
