//! Security classification of extracted resources.
//!
//! The classifier is a pure function of `(resource_type, attributes)` over an
//! injected [`RuleTable`]: every matching rule contributes its tags and controls
//! and the result is their union.

mod builtin;
pub mod posture;
pub mod rules;

pub use posture::Posture;
pub use rules::{
    Condition, GlobPattern, RegexPattern, Rule, RuleError, RuleResult, RuleTable, TypeMatcher,
};

use crate::config::ClassifierConfig;
use crate::parsing::AttributeMap;
use std::collections::{BTreeMap, BTreeSet};

impl RuleTable {
    /// The builtin rule table.
    pub fn builtin() -> Self {
        // Builtin rules always carry a name and at least one tag or control
        Self::new(builtin::builtin_rules()).unwrap_or_default()
    }

    /// Rule table selected by configuration: builtin, file, or builtin followed by file.
    ///
    /// `include_builtin = false` without a rules file leaves the table empty.
    pub fn from_config(config: &ClassifierConfig) -> RuleResult<Self> {
        let Some(path) = &config.rules_file else {
            if config.include_builtin {
                return Ok(Self::builtin());
            }
            tracing::warn!(
                "[classify] builtin rules disabled and no rules_file set; nothing will be classified"
            );
            return Ok(Self::default());
        };
        let custom = Self::load(path)?;
        tracing::info!(
            "[classify] loaded {} rules from {}",
            custom.len(),
            path.display()
        );
        if config.include_builtin {
            Ok(Self::builtin().extend(custom))
        } else {
            Ok(custom)
        }
    }
}

/// Tags and controls assigned to one resource.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    pub security_attributes: BTreeSet<String>,
    pub control_ids: BTreeSet<String>,
    /// Names of the rules that matched, in table order
    pub matched_rules: Vec<String>,
    /// Attribute keys that satisfied a rule condition
    pub evidence_keys: BTreeSet<String>,
}

impl Classification {
    pub fn is_empty(&self) -> bool {
        self.security_attributes.is_empty() && self.control_ids.is_empty()
    }

    /// Canonical values of the evidence keys.
    pub fn evidence(&self, attributes: &AttributeMap) -> BTreeMap<String, String> {
        self.evidence_keys
            .iter()
            .filter_map(|key| {
                attributes
                    .get(key)
                    .map(|value| (key.clone(), value.canonical()))
            })
            .collect()
    }
}

/// Evaluates a rule table against resources.
#[derive(Debug, Clone)]
pub struct Classifier {
    table: RuleTable,
}

impl Classifier {
    pub fn new(table: RuleTable) -> Self {
        Self { table }
    }

    /// Classifier over the builtin rule table.
    pub fn builtin() -> Self {
        Self::new(RuleTable::builtin())
    }

    pub fn table(&self) -> &RuleTable {
        &self.table
    }

    /// Union of the tags and controls of every matching rule.
    pub fn classify(&self, resource_type: &str, attributes: &AttributeMap) -> Classification {
        let mut result = Classification::default();
        let mut matched_keys = Vec::new();

        for rule in self.table.rules() {
            if !rule.resource_type.matches(resource_type) {
                continue;
            }
            matched_keys.clear();
            if !rule.when.evaluate(attributes, &mut matched_keys) {
                continue;
            }

            result.security_attributes.extend(rule.tags.iter().cloned());
            result.control_ids.extend(rule.controls.iter().cloned());
            result.matched_rules.push(rule.name.clone());
            result.evidence_keys.extend(matched_keys.drain(..));
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsing::AttributeValue;

    fn attrs(pairs: &[(&str, AttributeValue)]) -> AttributeMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_kms_key_with_rotation() {
        let classifier = Classifier::builtin();
        let result = classifier.classify(
            "aws_kms_key",
            &attrs(&[
                ("description", AttributeValue::String("primary".into())),
                ("enable_key_rotation", AttributeValue::Bool(true)),
            ]),
        );

        println!("Matched rules: {:?}", result.matched_rules);
        assert!(result.control_ids.contains("CC6.8"));
        assert!(result.security_attributes.contains("encryption"));
        assert!(result.security_attributes.contains("key_rotation"));
        assert!(result.evidence_keys.contains("enable_key_rotation"));
    }

    #[test]
    fn test_unknown_type_without_attributes_is_empty() {
        let classifier = Classifier::builtin();
        let result = classifier.classify("random_pet", &AttributeMap::new());
        assert!(result.is_empty(), "got {result:?}");
        assert!(result.matched_rules.is_empty());
    }

    #[test]
    fn test_union_of_overlapping_rules() {
        let table = RuleTable::new(vec![
            Rule::new("a", TypeMatcher::Prefix("aws_s3".into())).controls(&["CC6.8"]),
            Rule::new("b", TypeMatcher::Exact("aws_s3_bucket".into()))
                .controls(&["CC6.8", "CC7.2"])
                .tags(&["data_protection"]),
            Rule::new("c", TypeMatcher::Any)
                .when(Condition::Truthy("force_destroy".into()))
                .tags(&["never"]),
        ])
        .unwrap();
        let classifier = Classifier::new(table);

        let result = classifier.classify(
            "aws_s3_bucket",
            &attrs(&[("force_destroy", AttributeValue::Bool(false))]),
        );
        assert_eq!(
            result.control_ids.iter().collect::<Vec<_>>(),
            vec!["CC6.8", "CC7.2"]
        );
        assert_eq!(result.matched_rules, vec!["a", "b"]);
        assert!(!result.security_attributes.contains("never"));
    }

    #[test]
    fn test_classification_is_deterministic() {
        let classifier = Classifier::builtin();
        let attributes = attrs(&[
            ("bucket", AttributeValue::String("audit-logs".into())),
            ("versioning.enabled", AttributeValue::Bool(true)),
            ("logging.target_bucket", AttributeValue::Expression("aws_s3_bucket.x.id".into())),
        ]);

        let first = classifier.classify("aws_s3_bucket", &attributes);
        for _ in 0..50 {
            assert_eq!(classifier.classify("aws_s3_bucket", &attributes), first);
        }
        assert!(first.security_attributes.contains("backup"));
        assert!(first.security_attributes.contains("monitoring"));
    }

    #[test]
    fn test_evidence_uses_canonical_values() {
        let attributes = attrs(&[
            (
                "rule.apply_server_side_encryption_by_default.sse_algorithm",
                AttributeValue::String("aws:kms".into()),
            ),
            ("bucket", AttributeValue::String("b".into())),
        ]);
        let classifier = Classifier::builtin();
        let result = classifier.classify(
            "aws_s3_bucket_server_side_encryption_configuration",
            &attributes,
        );
        let evidence = result.evidence(&attributes);

        assert_eq!(
            evidence.get("rule.apply_server_side_encryption_by_default.sse_algorithm"),
            Some(&"aws:kms".to_string())
        );
        assert!(!evidence.contains_key("bucket"));
    }

    #[test]
    fn test_from_config_appends_custom_rules() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("rules.toml");
        std::fs::write(
            &path,
            r#"
[[rule]]
name = "custom-pet"
resource_type = { exact = "random_pet" }
tags = ["naming"]
"#,
        )
        .unwrap();

        let mut config = ClassifierConfig {
            rules_file: Some(path),
            include_builtin: true,
        };
        let combined = RuleTable::from_config(&config).unwrap();
        assert_eq!(combined.len(), RuleTable::builtin().len() + 1);

        config.include_builtin = false;
        let custom_only = RuleTable::from_config(&config).unwrap();
        assert_eq!(custom_only.len(), 1);
    }

    #[test]
    fn test_builtin_disabled_without_rules_file_is_empty() {
        let config = ClassifierConfig {
            rules_file: None,
            include_builtin: false,
        };
        let table = RuleTable::from_config(&config).unwrap();
        assert!(table.is_empty());

        let classifier = Classifier::new(table);
        let classification = classifier.classify(
            "aws_kms_key",
            &attrs(&[("enable_key_rotation", AttributeValue::Bool(true))]),
        );
        assert!(classification.is_empty());

        let default_config = ClassifierConfig {
            rules_file: None,
            include_builtin: true,
        };
        assert_eq!(
            RuleTable::from_config(&default_config).unwrap().len(),
            RuleTable::builtin().len()
        );
    }
}
