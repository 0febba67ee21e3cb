//! Structural checks on a loaded index.

use crate::storage::index_data::{PersistedIndex, RefMap};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    pub severity: Severity,
    pub message: String,
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{label}: {}", self.message)
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationReport {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    /// No error-level issues.
    pub fn is_valid(&self) -> bool {
        !self.issues.iter().any(|i| i.severity == Severity::Error)
    }

    pub fn errors(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(|i| i.severity == Severity::Error)
    }

    fn error(&mut self, message: String) {
        self.issues.push(ValidationIssue {
            severity: Severity::Error,
            message,
        });
    }

    fn warning(&mut self, message: String) {
        self.issues.push(ValidationIssue {
            severity: Severity::Warning,
            message,
        });
    }
}

/// Check reference bounds and that metadata agrees with content.
pub fn validate(index: &PersistedIndex) -> ValidationReport {
    let mut report = ValidationReport::default();
    let resources = &index.index.indexed_resources;
    let len = resources.len();

    let maps: [(&str, &RefMap); 6] = [
        ("control_mapping", &index.index.control_mapping),
        ("security_attributes", &index.index.security_attributes),
        ("resource_types", &index.index.resource_types),
        ("environments", &index.index.environments),
        ("risk_levels", &index.index.risk_levels),
        ("compliance_statuses", &index.index.compliance_statuses),
    ];
    for (name, map) in maps {
        for (key, refs) in map {
            if let Some(bad) = refs.iter().find(|&&r| r >= len) {
                report.error(format!(
                    "{name}[{key}] references resource {bad} but only {len} exist"
                ));
            }
        }
    }

    for (reference, resource) in resources.iter().enumerate() {
        for control in &resource.control_ids {
            let listed = index
                .index
                .control_mapping
                .get(control)
                .is_some_and(|refs| refs.contains(&reference));
            if !listed {
                report.warning(format!(
                    "{} has control {control} but is missing from control_mapping",
                    resource.id
                ));
            }
        }
        if !index.source_files.contains_key(&resource.source_file) {
            report.error(format!(
                "{} comes from {} which is not a recorded source file",
                resource.id,
                resource.source_file.display()
            ));
        }
    }

    if index.metadata.total_resources != len {
        report.error(format!(
            "metadata.total_resources is {} but the index holds {len}",
            index.metadata.total_resources
        ));
    }
    if index.metadata.total_files != index.source_files.len() {
        report.error(format!(
            "metadata.total_files is {} but {} source files are recorded",
            index.metadata.total_files,
            index.source_files.len()
        ));
    }

    let found: usize = index.source_files.values().map(|f| f.resources_found).sum();
    if found != len {
        report.warning(format!(
            "source files report {found} resources but the index holds {len}"
        ));
    }

    let coverage = index.statistics.compliance_coverage;
    if !(0.0..=1.0).contains(&coverage) {
        report.error(format!("compliance_coverage {coverage} is outside [0, 1]"));
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::index_data::{
        INDEX_VERSION, IndexMetadata, IndexStatistics, ResourceIndex,
    };
    use crate::types::{IndexedResource, SourceFileInfo};
    use chrono::Utc;
    use std::collections::{BTreeMap, BTreeSet};
    use std::path::PathBuf;

    fn sample() -> PersistedIndex {
        let mut key = IndexedResource::new("aws_kms_key", "k", "/w/kms.tf", 1, 4);
        key.control_ids.insert("CC6.8".into());
        let index = ResourceIndex::from_resources(vec![key]);
        let statistics = IndexStatistics::compute(&index, 0);
        let source_files = BTreeMap::from([(
            PathBuf::from("/w/kms.tf"),
            SourceFileInfo {
                path: PathBuf::from("/w/kms.tf"),
                checksum: "ab".into(),
                size_bytes: 10,
                resources_found: 1,
            },
        )]);

        PersistedIndex {
            version: INDEX_VERSION.to_string(),
            indexed_at: Utc::now(),
            metadata: IndexMetadata {
                total_resources: 1,
                total_files: 1,
                scan_duration_ms: 1,
                files_discovered: 1,
                source_directories: vec![PathBuf::from("/w")],
                include_patterns: vec!["*.tf".into()],
                exclude_patterns: Vec::new(),
                config_fingerprint: String::new(),
                skipped_files: Vec::new(),
            },
            source_files,
            index,
            statistics,
        }
    }

    #[test]
    fn test_consistent_index_is_valid() {
        let report = validate(&sample());
        assert!(report.is_valid(), "{:?}", report.issues);
        assert!(report.issues.is_empty());
    }

    #[test]
    fn test_out_of_bounds_reference() {
        let mut index = sample();
        index
            .index
            .control_mapping
            .insert("CC1.1".into(), BTreeSet::from([7]));

        let report = validate(&index);
        assert!(!report.is_valid());
        assert!(report.errors().any(|i| i.message.contains("CC1.1")));
    }

    #[test]
    fn test_count_mismatch() {
        let mut index = sample();
        index.metadata.total_files = 3;

        let report = validate(&index);
        assert_eq!(report.errors().count(), 1);
    }
}
