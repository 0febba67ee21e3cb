//! Builtin rule table covering common AWS, Azure and Google resource families.
//!
//! Order: exact type to control mappings, type-name heuristics, type to tag mappings,
//! then attribute keyword rules.

use super::rules::{Condition, Rule, TypeMatcher};

fn exact(name: &str) -> TypeMatcher {
    TypeMatcher::Exact(name.to_string())
}

fn prefix(name: &str) -> TypeMatcher {
    TypeMatcher::Prefix(name.to_string())
}

fn contains(needle: &str) -> TypeMatcher {
    TypeMatcher::Contains(needle.to_string())
}

/// Same controls for a group of exact type names.
fn control_group(family: &str, types: &[&str], controls: &[&str]) -> Vec<Rule> {
    types
        .iter()
        .map(|ty| Rule::new(format!("{family}:{ty}"), exact(ty)).controls(controls))
        .collect()
}

fn type_controls() -> Vec<Rule> {
    let mut rules = Vec::new();

    // Identity and access
    rules.extend(control_group(
        "iam",
        &[
            "aws_iam_role",
            "aws_iam_policy",
            "aws_iam_group",
            "aws_iam_role_policy_attachment",
        ],
        &["CC6.1", "CC6.3"],
    ));
    rules.extend(control_group(
        "iam",
        &["aws_iam_user", "aws_iam_access_key"],
        &["CC6.1", "CC6.2"],
    ));

    // Network boundaries
    rules.extend(control_group(
        "network",
        &[
            "aws_vpc",
            "aws_security_group",
            "aws_network_acl",
            "aws_subnet",
            "aws_route_table",
            "aws_internet_gateway",
            "aws_nat_gateway",
        ],
        &["CC6.6", "CC7.1"],
    ));

    // Transport security
    rules.extend(control_group(
        "tls",
        &["aws_lb", "aws_alb", "aws_lb_listener"],
        &["CC6.7", "CC6.6"],
    ));
    rules.extend(control_group(
        "tls",
        &["aws_cloudfront_distribution", "aws_acm_certificate"],
        &["CC6.7", "CC6.8"],
    ));

    // Encryption and data protection
    rules.extend(control_group(
        "encryption",
        &[
            "aws_kms_key",
            "aws_kms_alias",
            "aws_s3_bucket_server_side_encryption_configuration",
            "aws_ebs_encryption_by_default",
        ],
        &["CC6.8"],
    ));
    rules.extend(control_group(
        "data",
        &["aws_s3_bucket", "aws_rds_cluster", "aws_db_instance"],
        &["CC6.8", "CC7.2"],
    ));
    rules.extend(control_group(
        "data",
        &["aws_s3_bucket_policy", "aws_s3_bucket_public_access_block"],
        &["CC6.8", "CC6.3"],
    ));

    // Monitoring and detection
    rules.extend(control_group(
        "monitoring",
        &["aws_cloudtrail"],
        &["CC7.2", "CC7.4"],
    ));
    rules.extend(control_group(
        "monitoring",
        &["aws_cloudwatch_log_group", "aws_cloudwatch_metric_alarm"],
        &["CC7.2"],
    ));
    rules.extend(control_group(
        "monitoring",
        &["aws_config_configuration_recorder", "aws_config_config_rule"],
        &["CC7.2", "CC8.1"],
    ));
    rules.extend(control_group(
        "monitoring",
        &["aws_guardduty_detector", "aws_securityhub_account"],
        &["CC7.3", "CC7.4"],
    ));

    // Capacity and availability
    rules.push(Rule::new("availability:aws_autoscaling", prefix("aws_autoscaling_")).controls(&["A1.1"]));
    rules.push(Rule::new("availability:aws_appautoscaling", prefix("aws_appautoscaling_")).controls(&["A1.1"]));
    rules.extend(control_group(
        "availability",
        &["aws_ecs_service", "aws_eks_node_group"],
        &["A1.1"],
    ));

    // Azure
    rules.extend(control_group("azure", &["azurerm_resource_group"], &["CC6.3"]));
    rules.extend(control_group(
        "azure",
        &["azurerm_virtual_network", "azurerm_network_security_group"],
        &["CC6.6", "CC7.1"],
    ));
    rules.extend(control_group("azure", &["azurerm_key_vault"], &["CC6.8"]));
    rules.extend(control_group(
        "azure",
        &["azurerm_storage_account"],
        &["CC6.8", "CC7.2"],
    ));

    // Google Cloud
    rules.extend(control_group(
        "google",
        &["google_compute_network", "google_compute_firewall"],
        &["CC6.6", "CC7.1"],
    ));
    rules.extend(control_group("google", &["google_kms_crypto_key"], &["CC6.8"]));
    rules.extend(control_group(
        "google",
        &["google_storage_bucket"],
        &["CC6.8", "CC7.2"],
    ));
    rules.extend(control_group(
        "google",
        &["google_project_iam_binding", "google_project_iam_member"],
        &["CC6.1", "CC6.3"],
    ));

    rules
}

/// Type-name heuristics for providers without explicit mappings.
fn type_heuristics() -> Vec<Rule> {
    let heuristic = |name: &str, needles: &[&str], controls: &[&str]| {
        needles
            .iter()
            .map(|needle| {
                Rule::new(format!("heuristic:{name}:{needle}"), contains(needle)).controls(controls)
            })
            .collect::<Vec<_>>()
    };

    let mut rules = Vec::new();
    rules.extend(heuristic("identity", &["iam", "auth"], &["CC6.1", "CC6.3"]));
    rules.extend(heuristic(
        "network",
        &["firewall", "security_group", "network_acl"],
        &["CC6.6", "CC7.1"],
    ));
    rules.extend(heuristic("encryption", &["encrypt", "kms"], &["CC6.8"]));
    rules.extend(heuristic("logging", &["log", "monitor", "audit"], &["CC7.2"]));
    rules.extend(heuristic("scaling", &["autoscal", "scale_set"], &["A1.1"]));
    rules
}

fn type_tags() -> Vec<Rule> {
    let tagged = |ty: TypeMatcher, tags: &[&str]| {
        let name = format!("tags:{ty}");
        Rule::new(name, ty).tags(tags)
    };

    vec![
        // Encryption
        tagged(prefix("aws_kms"), &["encryption", "key_management"]),
        tagged(prefix("aws_s3_bucket_server_side_encryption"), &["encryption", "data_protection"]),
        tagged(prefix("aws_ebs_encryption"), &["encryption", "storage_security"]),
        tagged(prefix("aws_acm_certificate"), &["encryption", "ssl_tls"]),
        tagged(prefix("azurerm_key_vault"), &["encryption", "key_management"]),
        tagged(prefix("google_kms"), &["encryption", "key_management"]),
        // Access control
        tagged(prefix("aws_iam"), &["access_control", "identity_management"]),
        tagged(prefix("aws_security_group"), &["access_control", "network_security"]),
        tagged(prefix("aws_network_acl"), &["access_control", "network_security"]),
        tagged(prefix("aws_s3_bucket_policy"), &["access_control", "data_protection"]),
        tagged(prefix("aws_s3_bucket_public_access_block"), &["access_control", "data_protection"]),
        tagged(prefix("google_project_iam"), &["access_control", "identity_management"]),
        // Monitoring
        tagged(prefix("aws_cloudtrail"), &["monitoring", "audit_logging"]),
        tagged(prefix("aws_cloudwatch"), &["monitoring", "observability"]),
        tagged(prefix("aws_config_"), &["monitoring", "compliance_tracking"]),
        tagged(prefix("aws_guardduty"), &["monitoring", "threat_detection"]),
        // Backup and recovery
        tagged(prefix("aws_backup"), &["backup", "disaster_recovery"]),
        tagged(prefix("aws_s3_bucket_versioning"), &["backup", "data_versioning"]),
        tagged(prefix("aws_db_snapshot"), &["backup", "database_backup"]),
        // Network
        tagged(exact("aws_vpc"), &["network_security", "network_isolation"]),
        tagged(prefix("aws_subnet"), &["network_security", "network_segmentation"]),
        tagged(prefix("aws_lb"), &["network_security", "load_balancing"]),
        tagged(prefix("aws_alb"), &["network_security", "load_balancing"]),
        tagged(prefix("aws_cloudfront"), &["network_security", "cdn_security"]),
        tagged(prefix("azurerm_network_security_group"), &["access_control", "network_security"]),
        tagged(prefix("google_compute_firewall"), &["access_control", "network_security"]),
        // Availability
        tagged(prefix("aws_autoscaling_group"), &["high_availability", "auto_scaling"]),
        tagged(prefix("aws_rds_cluster"), &["high_availability", "database_clustering"]),
        tagged(prefix("aws_elasticache"), &["high_availability", "caching"]),
        // Databases
        tagged(prefix("aws_rds"), &["database_security"]),
        tagged(prefix("aws_db_instance"), &["database_security"]),
    ]
}

/// Rules that look at attribute keys and values, for any resource type.
fn attribute_rules() -> Vec<Rule> {
    let keywords = |words: &[&str]| Condition::KeyContains(words.iter().map(|w| w.to_string()).collect());

    vec![
        Rule::new("attr:key-rotation", TypeMatcher::Any)
            .when(Condition::AnyOf(vec![
                Condition::Truthy("enable_key_rotation".to_string()),
                Condition::Present("rotation_period".to_string()),
            ]))
            .tags(&["encryption", "key_rotation"])
            .controls(&["CC6.8"]),
        Rule::new("attr:storage-encrypted", TypeMatcher::Any)
            .when(Condition::AnyOf(vec![
                Condition::Truthy("encrypted".to_string()),
                Condition::Truthy("storage_encrypted".to_string()),
                Condition::Present("sse_algorithm".to_string()),
            ]))
            .tags(&["encryption", "data_protection"])
            .controls(&["CC6.8"]),
        Rule::new("attr:encryption-keywords", TypeMatcher::Any)
            .when(keywords(&["encrypt", "kms", "ssl", "tls"]))
            .tags(&["encryption"]),
        Rule::new("attr:access-keywords", TypeMatcher::Any)
            .when(keywords(&["policy", "permission", "role", "access"]))
            .tags(&["access_control"]),
        Rule::new("attr:monitoring-keywords", TypeMatcher::Any)
            .when(keywords(&["logging", "log_", "monitor", "alert", "audit"]))
            .tags(&["monitoring"]),
        Rule::new("attr:backup-keywords", TypeMatcher::Any)
            .when(keywords(&["backup", "snapshot", "versioning", "retention"]))
            .tags(&["backup"]),
        Rule::new("attr:mfa", TypeMatcher::Any)
            .when(Condition::AnyOf(vec![
                keywords(&["mfa", "2fa"]),
                Condition::Equals {
                    key: "mfa_delete".to_string(),
                    value: "Enabled".to_string(),
                },
            ]))
            .tags(&["multi_factor_auth"])
            .controls(&["CC6.1"]),
        Rule::new("attr:public-access-blocked", TypeMatcher::Any)
            .when(Condition::AllOf(vec![
                Condition::Truthy("block_public_acls".to_string()),
                Condition::Truthy("block_public_policy".to_string()),
            ]))
            .tags(&["access_control", "data_protection"])
            .controls(&["CC6.3"]),
    ]
}

/// The full builtin rule list, in evaluation order.
pub(crate) fn builtin_rules() -> Vec<Rule> {
    let mut rules = type_controls();
    rules.extend(type_heuristics());
    rules.extend(type_tags());
    rules.extend(attribute_rules());
    rules
}
