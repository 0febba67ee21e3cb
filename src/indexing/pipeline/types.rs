//! Data types flowing through the pipeline.

use crate::indexing::warning::{BuildWarning, WarningKind};
use crate::storage::SkippedFile;
use crate::types::{IndexedResource, SourceFileInfo};
use std::path::PathBuf;
use thiserror::Error;

/// File content read from disk.
#[derive(Debug, Clone)]
pub struct FileContent {
    pub path: PathBuf,
    pub bytes: Vec<u8>,
    /// SHA-256 of `bytes`
    pub checksum: String,
}

impl FileContent {
    pub fn size_bytes(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// What one worker produced for one file.
#[derive(Debug, Clone)]
pub enum FileOutcome {
    Indexed {
        info: SourceFileInfo,
        resources: Vec<IndexedResource>,
    },
    Skipped {
        skipped: SkippedFile,
        warning: BuildWarning,
    },
}

impl FileOutcome {
    /// Skip record plus warning for a file that contributed nothing.
    pub fn skipped(
        path: PathBuf,
        checksum: Option<String>,
        kind: WarningKind,
        reason: impl Into<String>,
    ) -> Self {
        let reason = reason.into();
        Self::Skipped {
            warning: BuildWarning::for_path(kind, path.clone(), reason.clone()),
            skipped: SkippedFile {
                path,
                checksum,
                reason,
            },
        }
    }
}

/// Partial result owned by a single worker.
#[derive(Debug, Default)]
pub struct IndexFragment {
    pub files: Vec<SourceFileInfo>,
    pub resources: Vec<IndexedResource>,
    pub skipped: Vec<SkippedFile>,
    pub warnings: Vec<BuildWarning>,
}

impl IndexFragment {
    pub fn record(&mut self, outcome: FileOutcome) {
        match outcome {
            FileOutcome::Indexed { info, resources } => {
                self.files.push(info);
                self.resources.extend(resources);
            }
            FileOutcome::Skipped { skipped, warning } => {
                self.skipped.push(skipped);
                self.warnings.push(warning);
            }
        }
    }

    /// Files seen by this worker, indexed or skipped.
    pub fn processed(&self) -> usize {
        self.files.len() + self.skipped.len()
    }
}

/// Pipeline errors
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("File {path} is {size} bytes, limit is {limit}")]
    FileTooLarge { path: PathBuf, size: u64, limit: u64 },

    #[error("Parser initialization failed: {0}")]
    ParserInit(String),

    #[error("Only {processed} of {total} files were processed")]
    Incomplete { processed: usize, total: usize },

    #[error("{0} thread panicked")]
    WorkerPanicked(String),

    #[error("Build cancelled")]
    Cancelled,
}

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;
