//! Status command.

use crate::Settings;
use crate::cli::commands::load_index;
use crate::cli::output::{emit, fail, format_size, print_pairs, print_table};
use crate::indexing::SecurityIndexer;
use crate::io::{EntityType, Envelope, ExitCode, ResultCode};
use crate::storage::{IndexMetadata, IndexStatistics, StalenessReport};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Debug, Serialize)]
struct StatusData<'a> {
    index_path: PathBuf,
    version: &'a str,
    indexed_at: String,
    metadata: &'a IndexMetadata,
    statistics: &'a IndexStatistics,
    #[serde(skip_serializing_if = "Option::is_none")]
    staleness: Option<StalenessReport>,
}

pub fn run(settings: Settings, check: bool, json: bool) -> ExitCode {
    let indexer = match SecurityIndexer::from_settings(settings) {
        Ok(indexer) => indexer,
        Err(e) => return fail(json, ResultCode::ConfigError, e.to_string()),
    };
    let index = match load_index(indexer.storage()) {
        Ok(index) => index,
        Err(unavailable) => return fail(json, unavailable.code, unavailable.message),
    };

    let staleness = check.then(|| indexer.check_staleness(&index));
    let stale = staleness.as_ref().is_some_and(|report| report.stale);
    let data = StatusData {
        index_path: indexer.storage().path().to_path_buf(),
        version: &index.version,
        indexed_at: index.indexed_at.to_rfc3339(),
        metadata: &index.metadata,
        statistics: &index.statistics,
        staleness,
    };

    if json {
        let mut envelope = Envelope::success(&data).with_entity_type(EntityType::IndexStatus);
        if stale {
            envelope = envelope
                .with_result_code(ResultCode::IndexStale)
                .with_message("Index is stale");
        }
        return emit(envelope);
    }

    let size = std::fs::metadata(&data.index_path)
        .map(|m| format_size(m.len()))
        .unwrap_or_else(|_| "-".to_string());
    print_pairs(vec![
        ("Index file", data.index_path.display().to_string()),
        ("Size", size),
        ("Version", data.version.to_string()),
        ("Indexed at", data.indexed_at.clone()),
        ("Files", index.metadata.total_files.to_string()),
        ("Skipped files", index.metadata.skipped_files.len().to_string()),
        ("Resources", index.metadata.total_resources.to_string()),
        (
            "Compliance coverage",
            format!("{:.1}%", index.statistics.compliance_coverage * 100.0),
        ),
    ]);

    if !index.statistics.control_counts.is_empty() {
        print_table(
            &["Control", "Resources"],
            index
                .statistics
                .control_counts
                .iter()
                .map(|(control, count)| vec![control.clone(), count.to_string()])
                .collect(),
        );
    }

    let stats = &index.statistics;
    if !stats.risk_distribution.is_empty() {
        print_table(
            &["Risk", "Resources", "Non-compliant"],
            stats
                .risk_distribution
                .iter()
                .map(|(level, count)| {
                    let findings = stats.security_findings.get(level).copied().unwrap_or(0);
                    vec![level.clone(), count.to_string(), findings.to_string()]
                })
                .collect(),
        );
    }

    match &data.staleness {
        Some(report) => {
            println!("Freshness: {}", report.summary());
            for reason in report.reasons.iter().take(20) {
                println!("  {reason}");
            }
        }
        None => println!("Run with --check to compare against files on disk"),
    }

    if stale {
        ExitCode::Stale
    } else {
        ExitCode::Success
    }
}
