use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::PathBuf;

/// Position of a resource inside `ResourceIndex::indexed_resources`.
pub type ResourceRef = usize;

/// Coarse exposure rating of one resource.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    #[default]
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether the controls a resource type calls for are configured.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplianceStatus {
    Compliant,
    PartiallyCompliant,
    NonCompliant,
    /// The type calls for no specific control
    #[default]
    NotApplicable,
}

impl ComplianceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Compliant => "compliant",
            Self::PartiallyCompliant => "partially_compliant",
            Self::NonCompliant => "non_compliant",
            Self::NotApplicable => "not_applicable",
        }
    }
}

impl fmt::Display for ComplianceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One classified resource declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexedResource {
    /// `"<type>.<name>"`, unique per file but not across files
    pub id: String,
    pub resource_type: String,
    pub resource_name: String,
    pub source_file: PathBuf,
    /// 1-based, inclusive
    pub line_start: usize,
    pub line_end: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
    #[serde(default)]
    pub security_attributes: BTreeSet<String>,
    #[serde(default)]
    pub control_ids: BTreeSet<String>,
    #[serde(default)]
    pub risk_level: RiskLevel,
    #[serde(default)]
    pub compliance_status: ComplianceStatus,
    /// Canonical values of the attributes a rule condition looked at
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub configuration: BTreeMap<String, String>,
}

impl IndexedResource {
    pub fn new(
        resource_type: impl Into<String>,
        resource_name: impl Into<String>,
        source_file: impl Into<PathBuf>,
        line_start: usize,
        line_end: usize,
    ) -> Self {
        let resource_type = resource_type.into();
        let resource_name = resource_name.into();
        Self {
            id: format!("{resource_type}.{resource_name}"),
            resource_type,
            resource_name,
            source_file: source_file.into(),
            line_start,
            line_end: line_end.max(line_start),
            environment: None,
            security_attributes: BTreeSet::new(),
            control_ids: BTreeSet::new(),
            risk_level: RiskLevel::default(),
            compliance_status: ComplianceStatus::default(),
            configuration: BTreeMap::new(),
        }
    }

    /// True when the resource maps to at least one control.
    pub fn has_controls(&self) -> bool {
        !self.control_ids.is_empty()
    }

    /// Citation string: `path:start-end`
    pub fn location(&self) -> String {
        format!(
            "{}:{}-{}",
            self.source_file.display(),
            self.line_start,
            self.line_end
        )
    }

    /// Ordering key that makes merged output independent of worker scheduling.
    pub(crate) fn sort_key(&self) -> (&PathBuf, usize, &str, &str) {
        (
            &self.source_file,
            self.line_start,
            &self.resource_type,
            &self.resource_name,
        )
    }
}

impl fmt::Display for IndexedResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.id, self.location())
    }
}

/// Provenance record for one indexed file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFileInfo {
    pub path: PathBuf,
    /// SHA-256 of the file bytes
    pub checksum: String,
    pub size_bytes: u64,
    pub resources_found: usize,
}
