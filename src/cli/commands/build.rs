//! Build command.

use crate::Settings;
use crate::cli::output::{emit, fail, print_pairs};
use crate::indexing::{BuildWarning, IndexSource, SecurityIndexer};
use crate::io::{EntityType, Envelope, ExitCode, ResultCode};
use crate::storage::PersistedIndex;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;

/// Warnings printed in text mode before the rest are summarized.
const MAX_WARNINGS_SHOWN: usize = 20;

#[derive(Debug, Clone, Default)]
pub struct BuildArgs {
    pub paths: Vec<PathBuf>,
    pub threads: Option<usize>,
    pub force: bool,
    pub dry_run: bool,
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct BuildSummary<'a> {
    /// `rebuilt`, `cache` or `dry_run`
    source: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
    persisted: bool,
    index_path: PathBuf,
    files_discovered: usize,
    total_files: usize,
    files_skipped: usize,
    total_resources: usize,
    compliance_coverage: f64,
    scan_duration_ms: u64,
    warnings: &'a [BuildWarning],
}

fn resolve_paths(cwd: &Path, paths: &[PathBuf]) -> Vec<PathBuf> {
    paths
        .iter()
        .map(|path| {
            if path.is_absolute() {
                path.clone()
            } else {
                cwd.join(path)
            }
        })
        .collect()
}

pub fn run(mut settings: Settings, args: BuildArgs, cancel: &CancellationToken) -> ExitCode {
    if !args.paths.is_empty() {
        // Command-line paths are relative to where the user is, not the workspace root
        let cwd = match std::env::current_dir() {
            Ok(cwd) => cwd,
            Err(e) => {
                return fail(
                    args.json,
                    ResultCode::ConfigError,
                    format!("cannot resolve current directory: {e}"),
                );
            }
        };
        settings.scan.roots = resolve_paths(&cwd, &args.paths);
    }
    if let Some(threads) = args.threads {
        settings.indexing.parallel_threads = threads;
    }

    let indexer = match SecurityIndexer::from_settings(settings) {
        Ok(indexer) => indexer,
        Err(e) => return fail(args.json, ResultCode::ConfigError, e.to_string()),
    };
    let index_path = indexer.storage().path().to_path_buf();

    let result = if args.dry_run {
        indexer
            .build(cancel)
            .map(|output| (output.index, output.warnings, "dry_run", None))
    } else if args.force {
        indexer
            .build_and_persist(cancel)
            .map(|output| (output.index, output.warnings, "rebuilt", Some("forced".to_string())))
    } else {
        indexer.load_or_build(cancel).map(|loaded| {
            let (source, reason) = match loaded.source {
                IndexSource::Cache => ("cache", None),
                IndexSource::Rebuilt(reason) => ("rebuilt", Some(reason.to_string())),
            };
            let index = std::sync::Arc::unwrap_or_clone(loaded.index);
            (index, loaded.warnings, source, reason)
        })
    };

    let (index, warnings, source, reason) = match result {
        Ok(parts) => parts,
        Err(e) if e.is_cancelled() => {
            crate::log_event!("build", "cancelled");
            return fail(
                args.json,
                ResultCode::Cancelled,
                "Build cancelled; the existing index was left unchanged".to_string(),
            );
        }
        Err(e) => return fail(args.json, ResultCode::BuildFailed, e.to_string()),
    };

    let summary = summarize(&index, &warnings, source, reason, index_path, !args.dry_run);

    if args.json {
        let message = match source {
            "cache" => "Index is up to date".to_string(),
            _ => format!(
                "Indexed {} resources from {} files",
                summary.total_resources, summary.total_files
            ),
        };
        let duration_ms = summary.scan_duration_ms;
        return emit(
            Envelope::success(summary)
                .with_entity_type(EntityType::BuildSummary)
                .with_duration_ms(duration_ms)
                .with_message(message),
        );
    }

    print_text(&summary);
    ExitCode::Success
}

fn summarize<'a>(
    index: &PersistedIndex,
    warnings: &'a [BuildWarning],
    source: &'static str,
    reason: Option<String>,
    index_path: PathBuf,
    persisted: bool,
) -> BuildSummary<'a> {
    BuildSummary {
        source,
        reason,
        persisted: persisted && source != "dry_run",
        index_path,
        files_discovered: index.metadata.files_discovered,
        total_files: index.metadata.total_files,
        files_skipped: index.metadata.skipped_files.len(),
        total_resources: index.metadata.total_resources,
        compliance_coverage: index.statistics.compliance_coverage,
        scan_duration_ms: index.metadata.scan_duration_ms,
        warnings,
    }
}

fn print_text(summary: &BuildSummary<'_>) {
    match (summary.source, &summary.reason) {
        ("cache", _) => println!("Index is up to date"),
        ("dry_run", _) => println!("Dry run: nothing was written"),
        (_, Some(reason)) => println!("Rebuilt index ({reason})"),
        _ => println!("Rebuilt index"),
    }

    print_pairs(vec![
        ("Files discovered", summary.files_discovered.to_string()),
        ("Files indexed", summary.total_files.to_string()),
        ("Files skipped", summary.files_skipped.to_string()),
        ("Resources", summary.total_resources.to_string()),
        (
            "Compliance coverage",
            format!("{:.1}%", summary.compliance_coverage * 100.0),
        ),
        ("Scan time", format!("{} ms", summary.scan_duration_ms)),
        ("Index file", summary.index_path.display().to_string()),
    ]);

    if !summary.warnings.is_empty() {
        eprintln!("\n{} warnings:", summary.warnings.len());
        for warning in summary.warnings.iter().take(MAX_WARNINGS_SHOWN) {
            eprintln!("  {warning}");
        }
        if summary.warnings.len() > MAX_WARNINGS_SHOWN {
            eprintln!("  ... and {} more", summary.warnings.len() - MAX_WARNINGS_SHOWN);
        }
    }
}
