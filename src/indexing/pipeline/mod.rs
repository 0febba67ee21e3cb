//! Parallel indexing pipeline
//!
//! ## Architecture
//!
//! ```text
//! FEED → [READ → EXTRACT → CLASSIFY] x N → COLLECT
//!   │                 │                       │
//!   ▼                 ▼                       ▼
//! [paths]        [fragments]            ResourceIndex
//! ```
//!
//! - **FEED**: one thread pushes discovered paths into a bounded channel
//! - **WORKERS**: each owns a parser and builds its own `IndexFragment`
//! - **COLLECT**: single-threaded merge after every worker has joined
//!
//! Workers share nothing mutable. Cancellation is checked before every file and
//! a cancelled run returns `PipelineError::Cancelled` instead of a partial result.

pub mod config;
pub mod stages;
pub mod types;

pub use config::PipelineConfig;
pub use stages::{CollectStage, Collected, ExtractStage};
pub use types::{FileContent, FileOutcome, IndexFragment, PipelineError, PipelineResult};

use crate::classify::Classifier;
use crossbeam_channel::bounded;
use stages::{read_failure, read_file};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

/// The parallel indexing pipeline.
pub struct Pipeline {
    config: PipelineConfig,
    classifier: Arc<Classifier>,
}

impl Pipeline {
    pub fn new(config: PipelineConfig, classifier: Arc<Classifier>) -> Self {
        Self { config, classifier }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Process `files` on the worker pool and merge the fragments.
    ///
    /// `roots` are the canonical scan roots used for environment detection.
    pub fn run(
        &self,
        files: Vec<PathBuf>,
        roots: Vec<PathBuf>,
        cancel: &CancellationToken,
    ) -> PipelineResult<Collected> {
        let start = Instant::now();
        let total = files.len();
        let workers = self.config.workers.min(total.max(1));

        let (path_tx, path_rx) = bounded::<PathBuf>(self.config.channel_size);

        // Stage 1: FEED
        let feed_cancel = cancel.clone();
        let feed_handle = thread::spawn(move || {
            let mut sent = 0usize;
            for path in files {
                if feed_cancel.is_cancelled() || path_tx.send(path).is_err() {
                    break;
                }
                sent += 1;
            }
            sent
        });

        // Stage 2: WORKERS
        let roots = Arc::new(roots);
        let max_file_size = self.config.max_file_size;
        let worker_handles: Vec<_> = (0..workers)
            .map(|_| {
                let rx = path_rx.clone();
                let classifier = Arc::clone(&self.classifier);
                let roots = Arc::clone(&roots);
                let cancel = cancel.clone();
                thread::spawn(move || -> PipelineResult<IndexFragment> {
                    let mut stage = ExtractStage::new(classifier, roots)?;
                    let mut fragment = IndexFragment::default();

                    for path in rx {
                        if cancel.is_cancelled() {
                            break;
                        }
                        let outcome = match read_file(&path, max_file_size) {
                            Ok(content) => stage.process(content),
                            Err(e) => read_failure(&path, e),
                        };
                        fragment.record(outcome);
                    }
                    Ok(fragment)
                })
            })
            .collect();
        drop(path_rx);

        let sent = feed_handle
            .join()
            .map_err(|_| PipelineError::WorkerPanicked("FEED".to_string()))?;

        let mut fragments = Vec::with_capacity(worker_handles.len());
        let mut first_error = None;
        for handle in worker_handles {
            let result = handle
                .join()
                .map_err(|_| PipelineError::WorkerPanicked("WORKER".to_string()))?;
            match result {
                Ok(fragment) => fragments.push(fragment),
                Err(e) => {
                    tracing::error!("[pipeline] worker failed: {e}");
                    first_error.get_or_insert(e);
                }
            }
        }

        if cancel.is_cancelled() {
            tracing::info!("[pipeline] cancelled after {sent}/{total} files were queued");
            return Err(PipelineError::Cancelled);
        }

        let processed: usize = fragments.iter().map(IndexFragment::processed).sum();
        if processed < total {
            // Every worker failed to start, or the ones that did could not drain the queue
            return Err(first_error.unwrap_or_else(|| {
                PipelineError::Incomplete { processed, total }
            }));
        }

        // Stage 3: COLLECT
        let collected = CollectStage::merge(fragments);

        tracing::info!(
            "[pipeline] {} files, {} resources, {} skipped in {:.2?} ({} workers)",
            collected.source_files.len(),
            collected.index.len(),
            collected.skipped.len(),
            start.elapsed(),
            workers
        );

        Ok(collected)
    }
}
