//! Read-only queries over a loaded index.
//!
//! A `QueryEngine` never touches the file system and never mutates the index, so
//! one engine (or clones of it) can serve any number of threads.

use crate::storage::{PersistedIndex, RefMap, ResourceIndex};
use crate::types::{IndexedResource, ResourceRef};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryKind {
    Control,
    Attribute,
    ResourceType,
    Environment,
    RiskLevel,
    ComplianceStatus,
    Combined,
}

impl fmt::Display for QueryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Control => "control",
            Self::Attribute => "attribute",
            Self::ResourceType => "resource_type",
            Self::Environment => "environment",
            Self::RiskLevel => "risk_level",
            Self::ComplianceStatus => "compliance_status",
            Self::Combined => "combined",
        };
        f.write_str(name)
    }
}

/// Matching resources for one lookup, in index order.
#[derive(Debug, Clone, Serialize)]
pub struct QueryResult<'a> {
    pub kind: QueryKind,
    pub key: String,
    pub count: usize,
    pub resources: Vec<&'a IndexedResource>,
    #[serde(skip)]
    refs: BTreeSet<ResourceRef>,
    #[serde(skip)]
    source: &'a ResourceIndex,
}

impl<'a> QueryResult<'a> {
    fn new(
        kind: QueryKind,
        key: impl Into<String>,
        refs: BTreeSet<ResourceRef>,
        source: &'a ResourceIndex,
    ) -> Self {
        let resources: Vec<_> = refs
            .iter()
            .filter_map(|&r| source.indexed_resources.get(r))
            .collect();
        Self {
            kind,
            key: key.into(),
            count: resources.len(),
            resources,
            refs,
            source,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn refs(&self) -> &BTreeSet<ResourceRef> {
        &self.refs
    }

    /// Resources present in both results.
    pub fn intersect(self, other: &QueryResult<'_>) -> Self {
        let refs = self.refs.intersection(&other.refs).copied().collect();
        let key = format!("{} & {}", self.label(), other.label());
        Self::new(QueryKind::Combined, key, refs, self.source)
    }

    /// Resources present in either result.
    pub fn union(self, other: &QueryResult<'_>) -> Self {
        let refs = self.refs.union(&other.refs).copied().collect();
        let key = format!("{} | {}", self.label(), other.label());
        Self::new(QueryKind::Combined, key, refs, self.source)
    }

    /// Resources in this result but not in `other`.
    pub fn exclude(self, other: &QueryResult<'_>) -> Self {
        let refs = self.refs.difference(&other.refs).copied().collect();
        let key = format!("{} - {}", self.label(), other.label());
        Self::new(QueryKind::Combined, key, refs, self.source)
    }

    /// Keep the first `n` resources. `count` still reports the full match count.
    pub fn limit(mut self, n: usize) -> Self {
        self.resources.truncate(n);
        self
    }

    fn label(&self) -> String {
        match self.kind {
            QueryKind::Combined => format!("({})", self.key),
            kind => format!("{kind}:{}", self.key),
        }
    }
}

/// Lookups over one immutable index.
#[derive(Debug, Clone)]
pub struct QueryEngine {
    index: Arc<PersistedIndex>,
}

impl QueryEngine {
    pub fn new(index: Arc<PersistedIndex>) -> Self {
        Self { index }
    }

    pub fn index(&self) -> &PersistedIndex {
        &self.index
    }

    pub fn by_control(&self, control_id: &str) -> QueryResult<'_> {
        self.lookup(QueryKind::Control, control_id, &self.index.index.control_mapping)
    }

    pub fn by_attribute(&self, tag: &str) -> QueryResult<'_> {
        self.lookup(
            QueryKind::Attribute,
            tag,
            &self.index.index.security_attributes,
        )
    }

    pub fn by_resource_type(&self, resource_type: &str) -> QueryResult<'_> {
        self.lookup(
            QueryKind::ResourceType,
            resource_type,
            &self.index.index.resource_types,
        )
    }

    pub fn by_environment(&self, environment: &str) -> QueryResult<'_> {
        self.lookup(
            QueryKind::Environment,
            environment,
            &self.index.index.environments,
        )
    }

    /// `level` is the snake_case name: `low`, `medium` or `high`.
    pub fn by_risk_level(&self, level: &str) -> QueryResult<'_> {
        self.lookup(QueryKind::RiskLevel, level, &self.index.index.risk_levels)
    }

    pub fn by_compliance_status(&self, status: &str) -> QueryResult<'_> {
        self.lookup(
            QueryKind::ComplianceStatus,
            status,
            &self.index.index.compliance_statuses,
        )
    }

    /// All resources with the given `"<type>.<name>"` id; ids repeat across files.
    pub fn resource(&self, id: &str) -> Vec<&IndexedResource> {
        let Some((resource_type, _)) = id.split_once('.') else {
            return Vec::new();
        };
        self.by_resource_type(resource_type)
            .resources
            .into_iter()
            .filter(|r| r.id == id)
            .collect()
    }

    /// Control ids with their resource counts.
    pub fn controls(&self) -> impl Iterator<Item = (&str, usize)> {
        key_counts(&self.index.index.control_mapping)
    }

    pub fn attributes(&self) -> impl Iterator<Item = (&str, usize)> {
        key_counts(&self.index.index.security_attributes)
    }

    pub fn resource_types(&self) -> impl Iterator<Item = (&str, usize)> {
        key_counts(&self.index.index.resource_types)
    }

    pub fn environments(&self) -> impl Iterator<Item = (&str, usize)> {
        key_counts(&self.index.index.environments)
    }

    pub fn risk_levels(&self) -> impl Iterator<Item = (&str, usize)> {
        key_counts(&self.index.index.risk_levels)
    }

    pub fn compliance_statuses(&self) -> impl Iterator<Item = (&str, usize)> {
        key_counts(&self.index.index.compliance_statuses)
    }

    fn lookup(&self, kind: QueryKind, key: &str, map: &RefMap) -> QueryResult<'_> {
        let refs = map.get(key).cloned().unwrap_or_default();
        tracing::trace!("[query] {kind}:{key} -> {}", refs.len());
        QueryResult::new(kind, key, refs, &self.index.index)
    }
}

fn key_counts(map: &RefMap) -> impl Iterator<Item = (&str, usize)> {
    map.iter().map(|(key, refs)| (key.as_str(), refs.len()))
}
