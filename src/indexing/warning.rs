//! Per-item recoverable problems collected during a build.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    InvalidPattern,
    MissingRoot,
    WalkError,
    ReadError,
    TooLarge,
    SyntaxError,
}

impl WarningKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidPattern => "invalid_pattern",
            Self::MissingRoot => "missing_root",
            Self::WalkError => "walk_error",
            Self::ReadError => "read_error",
            Self::TooLarge => "too_large",
            Self::SyntaxError => "syntax_error",
        }
    }
}

/// A warning attached to a build result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildWarning {
    pub kind: WarningKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    pub message: String,
}

impl BuildWarning {
    pub fn new(kind: WarningKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            path: None,
            message: message.into(),
        }
    }

    pub fn for_path(kind: WarningKind, path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self {
            kind,
            path: Some(path.into()),
            message: message.into(),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

impl fmt::Display for BuildWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.path {
            Some(path) => write!(f, "{}: {} ({})", path.display(), self.message, self.kind.as_str()),
            None => write!(f, "{} ({})", self.message, self.kind.as_str()),
        }
    }
}
