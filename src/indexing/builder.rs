//! Index builder: discovery, extraction and classification into a `PersistedIndex`.
//!
//! Building has no side effects. Persisting the result is a separate step.

use crate::classify::Classifier;
use crate::config::ScanConfig;
use crate::error::{IndexError, IndexResult};
use crate::indexing::pipeline::{Pipeline, PipelineConfig, PipelineError};
use crate::indexing::walker::FileDiscoverer;
use crate::indexing::warning::BuildWarning;
use crate::storage::{INDEX_VERSION, IndexMetadata, IndexStatistics, PersistedIndex};
use crate::utils::compute_checksum;
use crate::Settings;
use chrono::Utc;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

/// A freshly built index plus everything that went wrong along the way.
#[derive(Debug, Clone)]
pub struct BuildOutput {
    pub index: PersistedIndex,
    pub warnings: Vec<BuildWarning>,
}

pub struct IndexBuilder {
    discoverer: FileDiscoverer,
    classifier: Arc<Classifier>,
    config: PipelineConfig,
}

impl IndexBuilder {
    pub fn new(scan: ScanConfig, classifier: Classifier, config: PipelineConfig) -> Self {
        Self {
            discoverer: FileDiscoverer::new(scan),
            classifier: Arc::new(classifier),
            config,
        }
    }

    /// Builder for the scan and indexing sections of `settings`.
    pub fn from_settings(settings: &Settings, classifier: Classifier) -> Self {
        Self::new(
            settings.scan.clone(),
            classifier,
            PipelineConfig::from_settings(settings),
        )
    }

    pub fn discoverer(&self) -> &FileDiscoverer {
        &self.discoverer
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    pub fn pipeline_config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Hash of the scan configuration and the rule table.
    ///
    /// An index built under a different fingerprint no longer reflects the current setup.
    pub fn config_fingerprint(&self) -> String {
        let combined = format!(
            "scan:{}\nrules:{}",
            self.discoverer.scan_config().fingerprint(),
            self.classifier.table().fingerprint()
        );
        compute_checksum(combined.as_bytes())
    }

    /// Run the full build. Returns `IndexError::Cancelled` if `cancel` fires before completion.
    pub fn build(&self, cancel: &CancellationToken) -> IndexResult<BuildOutput> {
        let start = Instant::now();
        if cancel.is_cancelled() {
            return Err(IndexError::Cancelled);
        }

        let discovery = self.discoverer.discover();
        let files_discovered = discovery.files.len();
        let paths: Vec<PathBuf> = discovery.paths().map(|p| p.to_path_buf()).collect();
        let scan = self.discoverer.scan_config();
        let roots: Vec<PathBuf> = scan
            .roots
            .iter()
            .filter_map(|root| fs::canonicalize(root).ok())
            .collect();

        let pipeline = Pipeline::new(self.config.clone(), Arc::clone(&self.classifier));
        let collected = pipeline.run(paths, roots, cancel).map_err(|e| match e {
            PipelineError::Cancelled => IndexError::Cancelled,
            other => IndexError::Pipeline(other),
        })?;

        let mut warnings = discovery.warnings;
        warnings.extend(collected.warnings);
        for warning in &warnings {
            tracing::warn!("[pipeline] {warning}");
        }

        let statistics = IndexStatistics::compute(&collected.index, collected.skipped.len());
        let metadata = IndexMetadata {
            total_resources: collected.index.len(),
            total_files: collected.source_files.len(),
            scan_duration_ms: start.elapsed().as_millis() as u64,
            files_discovered,
            source_directories: scan.roots.clone(),
            include_patterns: scan.include_patterns.clone(),
            exclude_patterns: scan.exclude_patterns.clone(),
            config_fingerprint: self.config_fingerprint(),
            skipped_files: collected.skipped,
        };

        tracing::info!(
            "[pipeline] indexed {} resources from {} files ({} discovered, {} warnings) in {}ms",
            metadata.total_resources,
            metadata.total_files,
            files_discovered,
            warnings.len(),
            metadata.scan_duration_ms
        );

        Ok(BuildOutput {
            index: PersistedIndex {
                version: INDEX_VERSION.to_string(),
                indexed_at: Utc::now(),
                metadata,
                source_files: collected.source_files,
                index: collected.index,
                statistics,
            },
            warnings,
        })
    }
}
