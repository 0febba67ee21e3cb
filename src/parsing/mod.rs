//! Shallow extraction of resource declarations from configuration files.

pub mod hcl;
pub mod value;

pub use hcl::HclExtractor;
pub use value::{AttributeMap, AttributeValue};

use thiserror::Error;

/// One resource block as written in a file, before classification.
#[derive(Debug, Clone, PartialEq)]
pub struct RawResource {
    pub resource_type: String,
    pub resource_name: String,
    /// 1-based, inclusive
    pub line_start: usize,
    pub line_end: usize,
    pub attributes: AttributeMap,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("syntax error at line {line}, column {column}")]
    Syntax { line: usize, column: usize },

    #[error("file is not valid UTF-8: {0}")]
    Encoding(String),

    #[error("parser gave up before producing a tree")]
    Aborted,

    #[error("{0}")]
    Language(String),
}
