//! Tagged attribute values extracted from resource bodies.

use std::collections::BTreeMap;
use std::fmt;

/// Flattened attribute map: dotted key path to value.
pub type AttributeMap = BTreeMap<String, AttributeValue>;

/// A literal value as written in the configuration, without evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    String(String),
    Number(f64),
    Bool(bool),
    Null,
    List(Vec<AttributeValue>),
    Map(BTreeMap<String, AttributeValue>),
    /// References, function calls, interpolations and operators, kept as source text
    Expression(String),
}

impl AttributeValue {
    /// Canonical string used for classification and evidence.
    ///
    /// Top-level strings are unquoted; strings nested in lists or maps are quoted.
    pub fn canonical(&self) -> String {
        match self {
            Self::String(s) | Self::Expression(s) => s.clone(),
            _ => self.canonical_nested(),
        }
    }

    fn canonical_nested(&self) -> String {
        match self {
            Self::String(s) => format!("{s:?}"),
            Self::Expression(s) => s.clone(),
            Self::Number(n) => format_number(*n),
            Self::Bool(b) => b.to_string(),
            Self::Null => "null".to_string(),
            Self::List(items) => {
                let items: Vec<_> = items.iter().map(Self::canonical_nested).collect();
                format!("[{}]", items.join(", "))
            }
            Self::Map(entries) => {
                let entries: Vec<_> = entries
                    .iter()
                    .map(|(key, value)| format!("{key} = {}", value.canonical_nested()))
                    .collect();
                format!("{{{}}}", entries.join(", "))
            }
        }
    }

    /// Whether the value reads as "enabled".
    ///
    /// Expressions are never truthy since nothing is evaluated.
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Bool(b) => *b,
            Self::Number(n) => *n != 0.0,
            Self::String(s) => matches!(
                s.trim().to_ascii_lowercase().as_str(),
                "true" | "yes" | "on" | "enabled" | "1"
            ),
            _ => false,
        }
    }

    /// Short name of the variant, used in debug output.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::String(_) => "string",
            Self::Number(_) => "number",
            Self::Bool(_) => "bool",
            Self::Null => "null",
            Self::List(_) => "list",
            Self::Map(_) => "map",
            Self::Expression(_) => "expression",
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical())
    }
}

fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_scalars() {
        assert_eq!(AttributeValue::String("AES256".into()).canonical(), "AES256");
        assert_eq!(AttributeValue::Number(30.0).canonical(), "30");
        assert_eq!(AttributeValue::Number(0.5).canonical(), "0.5");
        assert_eq!(AttributeValue::Bool(true).canonical(), "true");
        assert_eq!(AttributeValue::Null.canonical(), "null");
        assert_eq!(
            AttributeValue::Expression("aws_kms_key.main.arn".into()).canonical(),
            "aws_kms_key.main.arn"
        );
    }

    #[test]
    fn test_canonical_collections_are_sorted_and_quoted() {
        let map = AttributeValue::Map(BTreeMap::from([
            ("team".to_string(), AttributeValue::String("sec".into())),
            ("env".to_string(), AttributeValue::String("prod".into())),
        ]));
        assert_eq!(map.canonical(), r#"{env = "prod", team = "sec"}"#);

        let list = AttributeValue::List(vec![
            AttributeValue::String("10.0.0.0/8".into()),
            AttributeValue::Number(443.0),
        ]);
        assert_eq!(list.canonical(), r#"["10.0.0.0/8", 443]"#);
    }

    #[test]
    fn test_truthiness() {
        assert!(AttributeValue::Bool(true).is_truthy());
        assert!(!AttributeValue::Bool(false).is_truthy());
        assert!(AttributeValue::String("Enabled".into()).is_truthy());
        assert!(!AttributeValue::String("disabled".into()).is_truthy());
        assert!(AttributeValue::Number(1.0).is_truthy());
        assert!(!AttributeValue::Expression("var.rotate".into()).is_truthy());
        assert!(!AttributeValue::Null.is_truthy());
    }
}
