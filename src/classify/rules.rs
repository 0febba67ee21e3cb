//! Rule table types
//!
//! A rule table is plain data: it can be built in code, loaded from TOML, or both.
//!
//! ```toml
//! [[rule]]
//! name = "kms-rotation"
//! resource_type = { prefix = "aws_kms" }
//! when = { truthy = "enable_key_rotation" }
//! tags = ["encryption", "key_rotation"]
//! controls = ["CC6.8"]
//!
//! [[rule]]
//! name = "any-encrypt-type"
//! resource_type = { glob = "*encrypt*" }
//! tags = ["encryption"]
//! ```

use crate::parsing::AttributeMap;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RuleError {
    #[error("Failed to read rule file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid rule table: {0}")]
    Invalid(#[from] toml::de::Error),

    #[error("Rule '{name}' contributes no tags or controls")]
    EmptyRule { name: String },

    #[error("Rule #{position} has no name")]
    Unnamed { position: usize },
}

pub type RuleResult<T> = Result<T, RuleError>;

/// Glob pattern compiled on deserialization.
#[derive(Clone, Debug)]
pub struct GlobPattern(glob::Pattern);

impl GlobPattern {
    pub fn new(pattern: &str) -> Result<Self, glob::PatternError> {
        glob::Pattern::new(pattern).map(Self)
    }

    pub fn matches(&self, value: &str) -> bool {
        self.0.matches(value)
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl PartialEq for GlobPattern {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Serialize for GlobPattern {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for GlobPattern {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::new(&raw).map_err(|e| D::Error::custom(format!("invalid glob '{raw}': {e}")))
    }
}

/// Regular expression compiled on deserialization.
#[derive(Clone, Debug)]
pub struct RegexPattern(regex::Regex);

impl RegexPattern {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        regex::Regex::new(pattern).map(Self)
    }

    pub fn is_match(&self, value: &str) -> bool {
        self.0.is_match(value)
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl PartialEq for RegexPattern {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Serialize for RegexPattern {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for RegexPattern {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::new(&raw).map_err(|e| D::Error::custom(format!("invalid regex '{raw}': {e}")))
    }
}

/// Predicate over the resource type name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TypeMatcher {
    #[default]
    Any,
    Exact(String),
    Prefix(String),
    /// Case-insensitive substring
    Contains(String),
    Glob(GlobPattern),
}

impl TypeMatcher {
    pub fn matches(&self, resource_type: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Exact(name) => resource_type == name,
            Self::Prefix(prefix) => resource_type.starts_with(prefix.as_str()),
            Self::Contains(needle) => resource_type
                .to_ascii_lowercase()
                .contains(&needle.to_ascii_lowercase()),
            Self::Glob(pattern) => pattern.matches(resource_type),
        }
    }
}

impl fmt::Display for TypeMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str("any"),
            Self::Exact(name) => write!(f, "= {name}"),
            Self::Prefix(prefix) => write!(f, "{prefix}*"),
            Self::Contains(needle) => write!(f, "*{needle}*"),
            Self::Glob(pattern) => write!(f, "glob {}", pattern.as_str()),
        }
    }
}

/// Predicate over the flattened attribute map.
///
/// A condition key matches a flattened key exactly or as its trailing dotted
/// segments, so `sse_algorithm` matches `rule.apply_server_side_encryption_by_default.sse_algorithm`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    #[default]
    Always,
    Present(String),
    Truthy(String),
    /// Canonical value equals `value` (case-insensitive)
    Equals { key: String, value: String },
    /// Some attribute key contains one of the needles (case-insensitive)
    KeyContains(Vec<String>),
    /// Canonical value matches; `key = None` tests every attribute
    ValueMatches {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        key: Option<String>,
        pattern: RegexPattern,
    },
    AnyOf(Vec<Condition>),
    AllOf(Vec<Condition>),
}

impl Condition {
    /// Evaluate against `attributes`, appending the keys that satisfied the condition.
    pub fn evaluate(&self, attributes: &AttributeMap, matched_keys: &mut Vec<String>) -> bool {
        match self {
            Self::Always => true,
            Self::Present(key) => collect(attributes, matched_keys, |k, _| key_matches(k, key)),
            Self::Truthy(key) => collect(attributes, matched_keys, |k, v| {
                key_matches(k, key) && v.is_truthy()
            }),
            Self::Equals { key, value } => collect(attributes, matched_keys, |k, v| {
                key_matches(k, key) && v.canonical().eq_ignore_ascii_case(value)
            }),
            Self::KeyContains(needles) => collect(attributes, matched_keys, |k, _| {
                let k = k.to_ascii_lowercase();
                needles
                    .iter()
                    .any(|needle| k.contains(&needle.to_ascii_lowercase()))
            }),
            Self::ValueMatches { key, pattern } => collect(attributes, matched_keys, |k, v| {
                key.as_deref().is_none_or(|key| key_matches(k, key))
                    && pattern.is_match(&v.canonical())
            }),
            Self::AnyOf(conditions) => {
                // Every branch runs so evidence is complete
                let mut any = false;
                for condition in conditions {
                    any |= condition.evaluate(attributes, matched_keys);
                }
                any
            }
            Self::AllOf(conditions) => {
                let mut local = Vec::new();
                let all = conditions
                    .iter()
                    .all(|condition| condition.evaluate(attributes, &mut local));
                if all {
                    matched_keys.extend(local);
                }
                all
            }
        }
    }
}

fn collect<F>(attributes: &AttributeMap, matched_keys: &mut Vec<String>, predicate: F) -> bool
where
    F: Fn(&str, &crate::parsing::AttributeValue) -> bool,
{
    let before = matched_keys.len();
    matched_keys.extend(
        attributes
            .iter()
            .filter(|(key, value)| predicate(key, value))
            .map(|(key, _)| key.clone()),
    );
    matched_keys.len() > before
}

/// `flat` is `wanted` or ends with `.wanted`.
pub fn key_matches(flat: &str, wanted: &str) -> bool {
    flat == wanted
        || flat
            .strip_suffix(wanted)
            .is_some_and(|head| head.ends_with('.'))
}

/// One classification rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub name: String,
    #[serde(default)]
    pub resource_type: TypeMatcher,
    #[serde(default)]
    pub when: Condition,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub controls: Vec<String>,
}

impl Rule {
    pub fn new(name: impl Into<String>, resource_type: TypeMatcher) -> Self {
        Self {
            name: name.into(),
            resource_type,
            when: Condition::Always,
            tags: Vec::new(),
            controls: Vec::new(),
        }
    }

    pub fn when(mut self, condition: Condition) -> Self {
        self.when = condition;
        self
    }

    pub fn tags(mut self, tags: &[&str]) -> Self {
        self.tags = tags.iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn controls(mut self, controls: &[&str]) -> Self {
        self.controls = controls.iter().map(|c| c.to_string()).collect();
        self
    }
}

/// Ordered, immutable rule table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct RuleTable {
    #[serde(default, rename = "rule")]
    rules: Vec<Rule>,
}

impl RuleTable {
    pub fn new(rules: Vec<Rule>) -> RuleResult<Self> {
        let table = Self { rules };
        table.validate()?;
        Ok(table)
    }

    /// Parse a TOML rule table (`[[rule]]` entries).
    pub fn from_toml_str(source: &str) -> RuleResult<Self> {
        let table: RuleTable = toml::from_str(source)?;
        table.validate()?;
        Ok(table)
    }

    /// Load a TOML rule table from disk.
    pub fn load(path: &Path) -> RuleResult<Self> {
        let source = std::fs::read_to_string(path).map_err(|source| RuleError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    /// Append another table's rules after this table's rules.
    pub fn extend(mut self, other: RuleTable) -> Self {
        self.rules.extend(other.rules);
        self
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// SHA-256 over the canonical JSON form; changes whenever any rule changes.
    pub fn fingerprint(&self) -> String {
        let canonical = serde_json::to_vec(self).unwrap_or_default();
        format!("{:x}", Sha256::digest(&canonical))
    }

    fn validate(&self) -> RuleResult<()> {
        for (position, rule) in self.rules.iter().enumerate() {
            if rule.name.trim().is_empty() {
                return Err(RuleError::Unnamed { position });
            }
            if rule.tags.is_empty() && rule.controls.is_empty() {
                return Err(RuleError::EmptyRule {
                    name: rule.name.clone(),
                });
            }
        }
        Ok(())
    }
}
