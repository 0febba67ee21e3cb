//! Risk level and compliance status of one resource.
//!
//! Both are heuristics over the resource type and its flattened attributes. They sit
//! next to the rule table rather than in it because they score what is *missing*
//! as well as what is present.

use crate::parsing::{AttributeMap, AttributeValue};
use crate::types::{ComplianceStatus, RiskLevel};

/// Types that hold identities, data or keys.
const HIGH_RISK_TYPES: &[&str] = &[
    "aws_iam_user",
    "aws_iam_role",
    "aws_s3_bucket",
    "aws_security_group",
    "aws_db_instance",
    "aws_rds_cluster",
    "aws_kms_key",
];

const OPEN_CIDR: &str = "0.0.0.0/0";

/// Score at or above which a resource is `High`.
const HIGH_RISK_SCORE: u32 = 5;
/// Score at or above which a resource is `Medium`.
const MEDIUM_RISK_SCORE: u32 = 3;
/// Fraction of required controls that still counts as partially compliant.
const PARTIAL_COMPLIANCE: f64 = 0.7;

/// Risk and compliance assessment of one resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Posture {
    pub risk_level: RiskLevel,
    pub compliance_status: ComplianceStatus,
}

impl Posture {
    /// `has_controls` is whether the classifier mapped the resource to any control.
    pub fn assess(resource_type: &str, attributes: &AttributeMap, has_controls: bool) -> Self {
        let resource_type = resource_type.to_ascii_lowercase();
        Self {
            risk_level: risk_level(&resource_type, attributes, has_controls),
            compliance_status: compliance_status(&resource_type, attributes),
        }
    }
}

fn risk_level(resource_type: &str, attributes: &AttributeMap, has_controls: bool) -> RiskLevel {
    let mut score = 0;
    if HIGH_RISK_TYPES.iter().any(|ty| resource_type.contains(ty)) {
        score += 3;
    }
    if is_misconfigured(resource_type, attributes) {
        score += 2;
    }
    if !has_controls {
        score += 1;
    }
    if is_publicly_reachable(attributes) {
        score += 3;
    }

    match score {
        s if s >= HIGH_RISK_SCORE => RiskLevel::High,
        s if s >= MEDIUM_RISK_SCORE => RiskLevel::Medium,
        _ => RiskLevel::Low,
    }
}

fn is_misconfigured(resource_type: &str, attributes: &AttributeMap) -> bool {
    // Bucket encryption is configured through a separate resource
    if resource_type.contains("s3_bucket") && !resource_type.contains("encryption") {
        return true;
    }
    if (resource_type.contains("rds") || resource_type.contains("db_instance"))
        && !matches!(
            attributes.get("storage_encrypted"),
            Some(AttributeValue::Bool(true))
        )
    {
        return true;
    }
    resource_type.contains("security_group")
        && attributes
            .iter()
            .any(|(key, value)| key.to_ascii_lowercase().contains("cidr") && opens_to_world(value))
}

fn is_publicly_reachable(attributes: &AttributeMap) -> bool {
    attributes.iter().any(|(key, value)| {
        let key = key.to_ascii_lowercase();
        let canonical = value.canonical().to_ascii_lowercase();

        // `block_public_*` and `restrict_public_*` close access when set
        let grants_public = key.contains("public")
            && !key.contains("block_public")
            && !key.contains("restrict_public");

        (grants_public && (canonical == "true" || canonical == "1"))
            || (key.contains("cidr") && opens_to_world(value))
            || (key.contains("policy") && canonical.contains('*'))
    })
}

fn opens_to_world(value: &AttributeValue) -> bool {
    value.canonical().contains(OPEN_CIDR)
}

fn compliance_status(resource_type: &str, attributes: &AttributeMap) -> ComplianceStatus {
    let has = |needles: &[&str]| needles.iter().any(|n| resource_type.contains(n));
    let requirements = [
        (
            has(&["s3", "rds", "db_instance", "kms"]),
            any_set(attributes, &["encrypt", "kms", "key_rotation"]),
        ),
        (
            has(&["iam", "security_group"]),
            any_set(attributes, &["policy", "role", "permission"]),
        ),
        (
            has(&["cloudtrail", "cloudwatch"]),
            any_set(attributes, &["log", "monitor"]),
        ),
    ];

    let required = requirements.iter().filter(|(applies, _)| *applies).count();
    if required == 0 {
        return ComplianceStatus::NotApplicable;
    }
    let implemented = requirements
        .iter()
        .filter(|(applies, met)| *applies && *met)
        .count();

    let ratio = implemented as f64 / required as f64;
    if ratio >= 1.0 {
        ComplianceStatus::Compliant
    } else if ratio >= PARTIAL_COMPLIANCE {
        ComplianceStatus::PartiallyCompliant
    } else {
        ComplianceStatus::NonCompliant
    }
}

/// Some attribute whose key contains a needle carries a non-empty, non-false value.
fn any_set(attributes: &AttributeMap, needles: &[&str]) -> bool {
    attributes.iter().any(|(key, value)| {
        let key = key.to_ascii_lowercase();
        needles.iter().any(|n| key.contains(n)) && is_set(value)
    })
}

fn is_set(value: &AttributeValue) -> bool {
    match value {
        AttributeValue::Bool(b) => *b,
        AttributeValue::Number(n) => *n != 0.0,
        AttributeValue::String(s) | AttributeValue::Expression(s) => {
            !s.trim().is_empty() && !s.trim().eq_ignore_ascii_case("false")
        }
        AttributeValue::List(items) => !items.is_empty(),
        AttributeValue::Map(entries) => !entries.is_empty(),
        AttributeValue::Null => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs(pairs: &[(&str, AttributeValue)]) -> AttributeMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn string(s: &str) -> AttributeValue {
        AttributeValue::String(s.to_string())
    }

    #[test]
    fn test_rotated_kms_key_is_compliant_medium_risk() {
        let posture = Posture::assess(
            "aws_kms_key",
            &attrs(&[("enable_key_rotation", AttributeValue::Bool(true))]),
            true,
        );

        assert_eq!(posture.compliance_status, ComplianceStatus::Compliant);
        assert_eq!(posture.risk_level, RiskLevel::Medium);
    }

    #[test]
    fn test_open_security_group_is_high_risk() {
        let posture = Posture::assess(
            "aws_security_group",
            &attrs(&[(
                "ingress.cidr_blocks",
                AttributeValue::List(vec![string("0.0.0.0/0")]),
            )]),
            true,
        );

        println!("Posture: {posture:?}");
        assert_eq!(posture.risk_level, RiskLevel::High);
        assert_eq!(posture.compliance_status, ComplianceStatus::NonCompliant);
    }

    #[test]
    fn test_unencrypted_database_is_non_compliant() {
        let unencrypted = Posture::assess(
            "aws_db_instance",
            &attrs(&[("storage_encrypted", AttributeValue::Bool(false))]),
            true,
        );
        assert_eq!(unencrypted.risk_level, RiskLevel::High);
        assert_eq!(unencrypted.compliance_status, ComplianceStatus::NonCompliant);

        let encrypted = Posture::assess(
            "aws_db_instance",
            &attrs(&[("storage_encrypted", AttributeValue::Bool(true))]),
            true,
        );
        assert_eq!(encrypted.risk_level, RiskLevel::Medium);
        assert_eq!(encrypted.compliance_status, ComplianceStatus::Compliant);
    }

    #[test]
    fn test_unrelated_type_is_not_applicable_low_risk() {
        let posture = Posture::assess("random_pet", &AttributeMap::new(), false);

        assert_eq!(posture.risk_level, RiskLevel::Low);
        assert_eq!(posture.compliance_status, ComplianceStatus::NotApplicable);
    }

    #[test]
    fn test_public_flags() {
        let blocked = attrs(&[("block_public_acls", AttributeValue::Bool(true))]);
        assert!(!is_publicly_reachable(&blocked));

        let open = attrs(&[("publicly_accessible", AttributeValue::Bool(true))]);
        assert!(is_publicly_reachable(&open));

        let wildcard = attrs(&[("policy", string(r#"{"Action": "s3:*"}"#))]);
        assert!(is_publicly_reachable(&wildcard));
    }

    #[test]
    fn test_expression_reference_counts_as_configured() {
        let posture = Posture::assess(
            "aws_s3_bucket_server_side_encryption_configuration",
            &attrs(&[(
                "rule.apply_server_side_encryption_by_default.kms_master_key_id",
                AttributeValue::Expression("aws_kms_key.main.arn".into()),
            )]),
            true,
        );
        assert_eq!(posture.compliance_status, ComplianceStatus::Compliant);
    }
}
