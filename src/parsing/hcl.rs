//! HCL resource extractor
//!
//! Uses tree-sitter-hcl crate's LANGUAGE constant to parse Terraform-style configuration
//! and emits one `RawResource` per top-level `resource "<type>" "<name>" { ... }` block.
//! Nothing is evaluated: references, function calls and interpolations are kept as
//! `AttributeValue::Expression` with their source text.

use crate::parsing::value::{AttributeMap, AttributeValue};
use crate::parsing::{ParseError, RawResource};
use std::collections::{BTreeMap, HashMap};
use tree_sitter::{Node, Parser};

/// Nesting deeper than this is kept as raw text instead of being converted.
const MAX_DEPTH: usize = 64;

/// Wrapper nodes that carry a single meaningful child.
const WRAPPER_KINDS: &[&str] = &[
    "expression",
    "expr_term",
    "literal_value",
    "collection_value",
    "template_expr",
];

/// Extracts resource blocks from HCL source.
///
/// Holds a tree-sitter parser, so each worker thread owns its own extractor.
pub struct HclExtractor {
    parser: Parser,
}

impl HclExtractor {
    /// Create a new HCL extractor
    pub fn new() -> Result<Self, ParseError> {
        let mut parser = Parser::new();
        let lang = tree_sitter_hcl::LANGUAGE;
        parser
            .set_language(&lang.into())
            .map_err(|e| ParseError::Language(format!("Failed to set HCL language: {e}")))?;

        Ok(Self { parser })
    }

    /// Extract all top-level resource declarations from `code`.
    ///
    /// A file containing any syntax error yields `ParseError::Syntax` and no resources.
    pub fn extract(&mut self, code: &str) -> Result<Vec<RawResource>, ParseError> {
        let tree = self.parser.parse(code, None).ok_or(ParseError::Aborted)?;
        let root = tree.root_node();

        if root.has_error() {
            let (line, column) = first_error(root)
                .map(|node| {
                    let pos = node.start_position();
                    (pos.row + 1, pos.column + 1)
                })
                .unwrap_or((1, 1));
            return Err(ParseError::Syntax { line, column });
        }

        let mut resources = Vec::new();
        for block in top_level_blocks(root) {
            if let Some(resource) = resource_from_block(block, code) {
                resources.push(resource);
            }
        }
        Ok(resources)
    }
}

/// Depth-first search for the first ERROR or MISSING node.
fn first_error(node: Node) -> Option<Node> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    if !node.has_error() {
        return None;
    }
    let mut cursor = node.walk();
    let children: Vec<_> = node.children(&mut cursor).collect();
    children.into_iter().find_map(first_error)
}

/// Blocks directly under the file body.
fn top_level_blocks(root: Node) -> Vec<Node> {
    let mut blocks = Vec::new();
    let mut cursor = root.walk();
    for child in root.named_children(&mut cursor) {
        match child.kind() {
            "block" => blocks.push(child),
            "body" => {
                let mut body_cursor = child.walk();
                blocks.extend(
                    child
                        .named_children(&mut body_cursor)
                        .filter(|n| n.kind() == "block"),
                );
            }
            _ => {}
        }
    }
    blocks
}

/// Parts of a block: identifier, labels and optional body.
struct BlockParts<'tree> {
    name: String,
    labels: Vec<String>,
    body: Option<Node<'tree>>,
}

fn block_parts<'tree>(block: Node<'tree>, code: &str) -> Option<BlockParts<'tree>> {
    let mut cursor = block.walk();
    let mut name = None;
    let mut labels = Vec::new();
    let mut body = None;

    for child in block.named_children(&mut cursor) {
        match child.kind() {
            "identifier" if name.is_none() => name = Some(node_text(child, code).to_string()),
            "identifier" if body.is_none() => labels.push(node_text(child, code).to_string()),
            "string_lit" if body.is_none() => labels.push(unquote(node_text(child, code))),
            "body" => body = Some(child),
            _ => {}
        }
    }

    Some(BlockParts {
        name: name?,
        labels,
        body,
    })
}

fn resource_from_block(block: Node, code: &str) -> Option<RawResource> {
    let parts = block_parts(block, code)?;
    if parts.name != "resource" {
        return None;
    }
    let [resource_type, resource_name] = parts.labels.as_slice() else {
        tracing::debug!(
            "[extract] resource block at line {} has {} labels, expected 2",
            block.start_position().row + 1,
            parts.labels.len()
        );
        return None;
    };
    if resource_type.is_empty() {
        return None;
    }

    let mut attributes = AttributeMap::new();
    if let Some(body) = parts.body {
        flatten_body(body, code, "", &mut attributes, 0);
    }

    Some(RawResource {
        resource_type: resource_type.clone(),
        resource_name: resource_name.clone(),
        line_start: block.start_position().row + 1,
        line_end: block.end_position().row + 1,
        attributes,
    })
}

/// Flatten a block body into dotted keys.
///
/// A nested block repeated under the same key gets its position appended from the
/// second occurrence on: `ingress.from_port`, `ingress.1.from_port`.
fn flatten_body(body: Node, code: &str, prefix: &str, out: &mut AttributeMap, depth: usize) {
    if depth > MAX_DEPTH {
        return;
    }

    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut cursor = body.walk();
    for child in body.named_children(&mut cursor) {
        match child.kind() {
            "attribute" => {
                let mut attr_cursor = child.walk();
                let named: Vec<_> = child
                    .named_children(&mut attr_cursor)
                    .filter(|n| n.kind() != "comment")
                    .collect();
                let (Some(key), Some(value)) = (named.first(), named.last()) else {
                    continue;
                };
                if key.id() == value.id() {
                    continue;
                }
                let key = join_key(prefix, node_text(*key, code));
                out.insert(key, convert_value(*value, code, depth + 1));
            }
            "block" => {
                let Some(parts) = block_parts(child, code) else {
                    continue;
                };
                let mut key = parts.name;
                for label in &parts.labels {
                    key.push('.');
                    key.push_str(label);
                }
                let occurrence = seen.entry(key.clone()).or_insert(0);
                if *occurrence > 0 {
                    key = format!("{key}.{occurrence}");
                }
                *occurrence += 1;

                let nested_prefix = join_key(prefix, &key);
                if let Some(nested) = parts.body {
                    flatten_body(nested, code, &nested_prefix, out, depth + 1);
                }
            }
            _ => {}
        }
    }
}

fn convert_value(node: Node, code: &str, depth: usize) -> AttributeValue {
    let text = node_text(node, code);
    if depth > MAX_DEPTH {
        return AttributeValue::Expression(text.to_string());
    }

    match node.kind() {
        kind if WRAPPER_KINDS.contains(&kind) => {
            let mut cursor = node.walk();
            let named: Vec<_> = node
                .named_children(&mut cursor)
                .filter(|n| n.kind() != "comment")
                .collect();
            match named.as_slice() {
                [only] => convert_value(*only, code, depth + 1),
                _ => AttributeValue::Expression(text.to_string()),
            }
        }
        "numeric_lit" => text
            .parse::<f64>()
            .map(AttributeValue::Number)
            .unwrap_or_else(|_| AttributeValue::Expression(text.to_string())),
        "bool_lit" => AttributeValue::Bool(text == "true"),
        "null_lit" => AttributeValue::Null,
        "string_lit" | "quoted_template" => {
            if contains_kind(node, "template_interpolation") {
                AttributeValue::Expression(text.to_string())
            } else {
                AttributeValue::String(unquote(text))
            }
        }
        "heredoc_template" => {
            if contains_kind(node, "template_interpolation") {
                AttributeValue::Expression(text.to_string())
            } else {
                AttributeValue::String(heredoc_body(text))
            }
        }
        "tuple" => {
            let mut cursor = node.walk();
            // `tuple_start` and `tuple_end` are named nodes too
            let items = node
                .named_children(&mut cursor)
                .filter(|n| n.kind() == "expression")
                .map(|item| convert_value(item, code, depth + 1))
                .collect();
            AttributeValue::List(items)
        }
        "object" => {
            let mut entries = BTreeMap::new();
            let mut cursor = node.walk();
            for elem in node
                .named_children(&mut cursor)
                .filter(|n| n.kind() == "object_elem")
            {
                if let Some((key, value)) = object_entry(elem, code, depth + 1) {
                    entries.insert(key, value);
                }
            }
            AttributeValue::Map(entries)
        }
        _ => AttributeValue::Expression(text.to_string()),
    }
}

fn object_entry(elem: Node, code: &str, depth: usize) -> Option<(String, AttributeValue)> {
    let (key, value) = match (
        elem.child_by_field_name("key"),
        elem.child_by_field_name("val"),
    ) {
        (Some(key), Some(value)) => (key, value),
        _ => {
            let mut cursor = elem.walk();
            let named: Vec<_> = elem.named_children(&mut cursor).collect();
            (*named.first()?, *named.last()?)
        }
    };

    let key = match convert_value(key, code, depth) {
        AttributeValue::String(s) | AttributeValue::Expression(s) => s,
        other => other.canonical(),
    };
    Some((key, convert_value(value, code, depth)))
}

fn contains_kind(node: Node, kind: &str) -> bool {
    if node.kind() == kind {
        return true;
    }
    let mut cursor = node.walk();
    let children: Vec<_> = node.named_children(&mut cursor).collect();
    children.into_iter().any(|child| contains_kind(child, kind))
}

fn node_text<'a>(node: Node, code: &'a str) -> &'a str {
    code.get(node.byte_range()).unwrap_or_default()
}

fn join_key(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}.{key}")
    }
}

fn unquote(text: &str) -> String {
    let trimmed = text.trim();
    trimmed
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(trimmed)
        .replace("\\\"", "\"")
}

/// Lines between the `<<EOF` opener and the closing marker.
fn heredoc_body(text: &str) -> String {
    let lines: Vec<_> = text.lines().collect();
    match lines.as_slice() {
        [_, body @ .., _] => body.join("\n"),
        _ => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(code: &str) -> Vec<RawResource> {
        let mut extractor = HclExtractor::new().unwrap();
        extractor.extract(code).unwrap()
    }

    #[test]
    fn test_extracts_top_level_resources_only() {
        let code = r#"
provider "aws" {
  region = "us-east-1"
}

variable "rotation" {
  default = true
}

resource "aws_kms_key" "main" {
  description         = "primary key"
  enable_key_rotation = true
}

data "aws_caller_identity" "current" {}

module "network" {
  source = "./network"
}

resource "aws_s3_bucket" "logs" {
  bucket = "company-logs"
}
"#;
        let resources = extract(code);
        println!("Extracted {} resources:", resources.len());
        for r in &resources {
            println!("  - {}.{} lines {}-{}", r.resource_type, r.resource_name, r.line_start, r.line_end);
        }

        assert_eq!(resources.len(), 2);
        assert_eq!(resources[0].resource_type, "aws_kms_key");
        assert_eq!(resources[0].resource_name, "main");
        assert_eq!(resources[0].line_start, 10);
        assert_eq!(resources[0].line_end, 13);
        assert_eq!(
            resources[0].attributes.get("enable_key_rotation"),
            Some(&AttributeValue::Bool(true))
        );
        assert_eq!(
            resources[0].attributes.get("description"),
            Some(&AttributeValue::String("primary key".into()))
        );
        assert_eq!(resources[1].resource_type, "aws_s3_bucket");
    }

    #[test]
    fn test_nested_blocks_flatten_to_dotted_keys() {
        let code = r#"
resource "aws_s3_bucket_server_side_encryption_configuration" "logs" {
  bucket = aws_s3_bucket.logs.id

  rule {
    apply_server_side_encryption_by_default {
      sse_algorithm     = "aws:kms"
      kms_master_key_id = aws_kms_key.main.arn
    }
  }
}
"#;
        let resources = extract(code);
        assert_eq!(resources.len(), 1);
        let attrs = &resources[0].attributes;
        for (key, value) in attrs {
            println!("  {key} = {value} ({})", value.kind());
        }

        assert_eq!(
            attrs.get("rule.apply_server_side_encryption_by_default.sse_algorithm"),
            Some(&AttributeValue::String("aws:kms".into()))
        );
        assert_eq!(
            attrs.get("rule.apply_server_side_encryption_by_default.kms_master_key_id"),
            Some(&AttributeValue::Expression("aws_kms_key.main.arn".into()))
        );
        assert_eq!(
            attrs.get("bucket"),
            Some(&AttributeValue::Expression("aws_s3_bucket.logs.id".into()))
        );
    }

    #[test]
    fn test_repeated_blocks_are_numbered() {
        let code = r#"
resource "aws_security_group" "web" {
  name = "web"

  ingress {
    from_port   = 443
    cidr_blocks = ["10.0.0.0/8"]
  }

  ingress {
    from_port   = 80
    cidr_blocks = ["0.0.0.0/0"]
  }
}
"#;
        let resources = extract(code);
        let attrs = &resources[0].attributes;

        assert_eq!(attrs.get("ingress.from_port"), Some(&AttributeValue::Number(443.0)));
        assert_eq!(attrs.get("ingress.1.from_port"), Some(&AttributeValue::Number(80.0)));
        assert_eq!(
            attrs.get("ingress.1.cidr_blocks").map(AttributeValue::canonical),
            Some(r#"["0.0.0.0/0"]"#.to_string())
        );
    }

    #[test]
    fn test_object_literal_is_a_map_value() {
        let code = r#"
resource "aws_instance" "app" {
  ami = "ami-123"
  tags = {
    Name        = "app"
    Environment = "prod"
  }
}
"#;
        let resources = extract(code);
        let tags = resources[0].attributes.get("tags").unwrap();
        match tags {
            AttributeValue::Map(entries) => {
                assert_eq!(entries.len(), 2);
                assert_eq!(entries.get("Name"), Some(&AttributeValue::String("app".into())));
            }
            other => panic!("expected map, got {other:?}"),
        }
    }

    #[test]
    fn test_interpolated_string_stays_an_expression() {
        let code = r#"
resource "aws_s3_bucket" "b" {
  bucket = "logs-${var.env}"
}
"#;
        let resources = extract(code);
        assert_eq!(
            resources[0].attributes.get("bucket"),
            Some(&AttributeValue::Expression("\"logs-${var.env}\"".into()))
        );
    }

    #[test]
    fn test_syntax_error_is_reported() {
        let code = r#"
resource "aws_kms_key" "broken" {
  enable_key_rotation =
"#;
        let mut extractor = HclExtractor::new().unwrap();
        let result = extractor.extract(code);
        println!("Parse result: {result:?}");
        assert!(matches!(result, Err(ParseError::Syntax { .. })));
    }

    #[test]
    fn test_empty_file_has_no_resources() {
        assert!(extract("").is_empty());
        assert!(extract("# only a comment\n").is_empty());
    }
}
