//! Persisted index shape
//!
//! Everything here is plain serializable data. Maps are `BTreeMap`/`BTreeSet` so the
//! JSON form is byte-stable for a given index.

use crate::types::{ComplianceStatus, IndexedResource, ResourceRef, SourceFileInfo};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

/// Format version written to and required from index files.
pub const INDEX_VERSION: &str = "1.1.0";

/// Reference sets keyed by control id, tag, type, environment, risk level or compliance status.
pub type RefMap = BTreeMap<String, BTreeSet<ResourceRef>>;

/// The serializable root object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedIndex {
    pub version: String,
    /// Build completion time
    pub indexed_at: DateTime<Utc>,
    pub metadata: IndexMetadata,
    pub source_files: BTreeMap<PathBuf, SourceFileInfo>,
    pub index: ResourceIndex,
    pub statistics: IndexStatistics,
}

impl PersistedIndex {
    pub fn resource(&self, reference: ResourceRef) -> Option<&IndexedResource> {
        self.index.indexed_resources.get(reference)
    }

    /// Time since the build completed.
    pub fn age(&self) -> chrono::Duration {
        Utc::now().signed_duration_since(self.indexed_at)
    }

    /// Whether `path` was indexed or skipped by the build that produced this index.
    pub fn knows_file(&self, path: &std::path::Path) -> bool {
        self.source_files.contains_key(path)
            || self.metadata.skipped_files.iter().any(|s| s.path == path)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexMetadata {
    pub total_resources: usize,
    /// Files actually indexed (skipped files are not counted)
    pub total_files: usize,
    pub scan_duration_ms: u64,
    #[serde(default)]
    pub files_discovered: usize,
    #[serde(default)]
    pub source_directories: Vec<PathBuf>,
    #[serde(default)]
    pub include_patterns: Vec<String>,
    #[serde(default)]
    pub exclude_patterns: Vec<String>,
    /// Hash of scan configuration and rule table
    #[serde(default)]
    pub config_fingerprint: String,
    #[serde(default)]
    pub skipped_files: Vec<SkippedFile>,
}

/// A discovered file that contributed nothing to the index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedFile {
    pub path: PathBuf,
    /// Present when the bytes could be read, so a fix to the file is detected as a change
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
    pub reason: String,
}

/// The lookup structures.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceIndex {
    pub indexed_resources: Vec<IndexedResource>,
    pub control_mapping: RefMap,
    pub security_attributes: RefMap,
    #[serde(default)]
    pub resource_types: RefMap,
    #[serde(default)]
    pub environments: RefMap,
    #[serde(default)]
    pub risk_levels: RefMap,
    #[serde(default)]
    pub compliance_statuses: RefMap,
}

impl ResourceIndex {
    /// Build every lookup map from an ordered resource list.
    pub fn from_resources(resources: Vec<IndexedResource>) -> Self {
        let mut index = Self::default();

        for (reference, resource) in resources.iter().enumerate() {
            index
                .resource_types
                .entry(resource.resource_type.clone())
                .or_default()
                .insert(reference);

            for control in &resource.control_ids {
                index
                    .control_mapping
                    .entry(control.clone())
                    .or_default()
                    .insert(reference);
            }
            for tag in &resource.security_attributes {
                index
                    .security_attributes
                    .entry(tag.clone())
                    .or_default()
                    .insert(reference);
            }
            index
                .risk_levels
                .entry(resource.risk_level.as_str().to_string())
                .or_default()
                .insert(reference);
            index
                .compliance_statuses
                .entry(resource.compliance_status.as_str().to_string())
                .or_default()
                .insert(reference);
            if let Some(environment) = &resource.environment {
                index
                    .environments
                    .entry(environment.clone())
                    .or_default()
                    .insert(reference);
            }
        }

        index.indexed_resources = resources;
        index
    }

    pub fn len(&self) -> usize {
        self.indexed_resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indexed_resources.is_empty()
    }
}

/// Derived metrics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexStatistics {
    /// Resources with at least one control over all resources; 0.0 when empty
    pub compliance_coverage: f64,
    #[serde(default)]
    pub resources_with_controls: usize,
    #[serde(default)]
    pub resources_without_controls: usize,
    #[serde(default)]
    pub files_skipped: usize,
    #[serde(default)]
    pub control_counts: BTreeMap<String, usize>,
    #[serde(default)]
    pub attribute_counts: BTreeMap<String, usize>,
    #[serde(default)]
    pub resource_type_counts: BTreeMap<String, usize>,
    #[serde(default)]
    pub environment_counts: BTreeMap<String, usize>,
    #[serde(default)]
    pub risk_distribution: BTreeMap<String, usize>,
    #[serde(default)]
    pub compliance_distribution: BTreeMap<String, usize>,
    /// Non-compliant resources by risk level
    #[serde(default)]
    pub security_findings: BTreeMap<String, usize>,
}

impl IndexStatistics {
    pub fn compute(index: &ResourceIndex, files_skipped: usize) -> Self {
        let total = index.len();
        let resources_with_controls = index
            .indexed_resources
            .iter()
            .filter(|r| r.has_controls())
            .count();
        let compliance_coverage = if total == 0 {
            0.0
        } else {
            resources_with_controls as f64 / total as f64
        };
        let counts = |map: &RefMap| -> BTreeMap<String, usize> {
            map.iter().map(|(key, refs)| (key.clone(), refs.len())).collect()
        };
        let mut security_findings = BTreeMap::new();
        for resource in &index.indexed_resources {
            if resource.compliance_status == ComplianceStatus::NonCompliant {
                *security_findings
                    .entry(resource.risk_level.as_str().to_string())
                    .or_insert(0) += 1;
            }
        }

        Self {
            compliance_coverage,
            resources_with_controls,
            resources_without_controls: total - resources_with_controls,
            files_skipped,
            control_counts: counts(&index.control_mapping),
            attribute_counts: counts(&index.security_attributes),
            resource_type_counts: counts(&index.resource_types),
            environment_counts: counts(&index.environments),
            risk_distribution: counts(&index.risk_levels),
            compliance_distribution: counts(&index.compliance_statuses),
            security_findings,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RiskLevel;

    fn resource(ty: &str, name: &str, controls: &[&str], tags: &[&str]) -> IndexedResource {
        let mut r = IndexedResource::new(ty, name, "main.tf", 1, 3);
        r.control_ids = controls.iter().map(|c| c.to_string()).collect();
        r.security_attributes = tags.iter().map(|t| t.to_string()).collect();
        r
    }

    #[test]
    fn test_lookup_maps() {
        let index = ResourceIndex::from_resources(vec![
            resource("aws_kms_key", "a", &["CC6.8"], &["encryption"]),
            resource("aws_vpc", "main", &["CC6.6", "CC7.1"], &["network_security"]),
            resource("random_pet", "name", &[], &[]),
        ]);

        assert_eq!(index.control_mapping["CC6.8"], BTreeSet::from([0]));
        assert_eq!(index.control_mapping["CC7.1"], BTreeSet::from([1]));
        assert_eq!(index.security_attributes["encryption"], BTreeSet::from([0]));
        // Unclassified resources only show up by type
        assert_eq!(index.resource_types["random_pet"], BTreeSet::from([2]));
        assert!(!index.control_mapping.values().any(|refs| refs.contains(&2)));
    }

    #[test]
    fn test_statistics() {
        let index = ResourceIndex::from_resources(vec![
            resource("aws_kms_key", "a", &["CC6.8"], &["encryption"]),
            resource("aws_kms_key", "b", &["CC6.8"], &["encryption"]),
            resource("aws_vpc", "main", &["CC6.6"], &[]),
            resource("random_pet", "name", &[], &[]),
        ]);
        let stats = IndexStatistics::compute(&index, 1);

        assert_eq!(stats.compliance_coverage, 0.75);
        assert_eq!(stats.resources_with_controls, 3);
        assert_eq!(stats.resources_without_controls, 1);
        assert_eq!(stats.control_counts["CC6.8"], 2);
        assert_eq!(stats.resource_type_counts["aws_kms_key"], 2);
        assert_eq!(stats.files_skipped, 1);
    }

    #[test]
    fn test_risk_and_compliance_maps() {
        let mut open_group = resource("aws_security_group", "web", &["CC6.6"], &[]);
        open_group.risk_level = RiskLevel::High;
        open_group.compliance_status = ComplianceStatus::NonCompliant;
        let mut key = resource("aws_kms_key", "a", &["CC6.8"], &["encryption"]);
        key.risk_level = RiskLevel::Medium;
        key.compliance_status = ComplianceStatus::Compliant;
        let pet = resource("random_pet", "name", &[], &[]);

        let index = ResourceIndex::from_resources(vec![open_group, key, pet]);
        assert_eq!(index.risk_levels["high"], BTreeSet::from([0]));
        assert_eq!(index.risk_levels["low"], BTreeSet::from([2]));
        assert_eq!(index.compliance_statuses["non_compliant"], BTreeSet::from([0]));
        assert_eq!(index.compliance_statuses["not_applicable"], BTreeSet::from([2]));

        let stats = IndexStatistics::compute(&index, 0);
        assert_eq!(stats.risk_distribution["medium"], 1);
        assert_eq!(stats.compliance_distribution["compliant"], 1);
        assert_eq!(stats.security_findings, BTreeMap::from([("high".to_string(), 1)]));
    }

    #[test]
    fn test_empty_statistics_do_not_divide_by_zero() {
        let stats = IndexStatistics::compute(&ResourceIndex::default(), 0);
        assert_eq!(stats.compliance_coverage, 0.0);
        assert!(!stats.compliance_coverage.is_nan());
    }
}
