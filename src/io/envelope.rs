//! JSON output envelope for CLI commands.
//!
//! Every command run with `--json` prints exactly one envelope to stdout.

use crate::io::exit_code::ExitCode;
use serde::{Deserialize, Serialize};

/// Schema version for this envelope format.
pub const SCHEMA_VERSION: &str = "1.0.0";

/// Operation outcome status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// Operation succeeded with results
    Success,
    /// Operation succeeded but found nothing
    NotFound,
    /// Operation failed
    Error,
}

/// Machine-readable result codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResultCode {
    Ok,
    NotFound,
    IndexMissing,
    IndexStale,
    InvalidIndex,
    ConfigError,
    BuildFailed,
    Cancelled,
    InternalError,
}

impl ResultCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::NotFound => "NOT_FOUND",
            Self::IndexMissing => "INDEX_MISSING",
            Self::IndexStale => "INDEX_STALE",
            Self::InvalidIndex => "INVALID_INDEX",
            Self::ConfigError => "CONFIG_ERROR",
            Self::BuildFailed => "BUILD_FAILED",
            Self::Cancelled => "CANCELLED",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }

    pub fn exit_code(&self) -> ExitCode {
        match self {
            Self::Ok => ExitCode::Success,
            Self::NotFound => ExitCode::NotFound,
            Self::IndexMissing => ExitCode::IndexMissing,
            Self::IndexStale => ExitCode::Stale,
            Self::InvalidIndex => ExitCode::InvalidIndex,
            Self::ConfigError => ExitCode::ConfigError,
            Self::BuildFailed | Self::InternalError => ExitCode::GeneralError,
            Self::Cancelled => ExitCode::Cancelled,
        }
    }
}

/// Entity type in the data payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Resource,
    QueryResult,
    BuildSummary,
    IndexStatus,
    Validation,
    RuleTable,
}

/// Output envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T = serde_json::Value> {
    /// Operation outcome
    pub status: Status,

    /// Machine-readable result code
    pub code: ResultCode,

    /// Process exit code
    pub exit_code: u8,

    /// Human-readable message
    pub message: String,

    /// Result payload (null on error)
    pub data: Option<T>,

    /// Response metadata
    pub meta: Meta,
}

/// Response metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Meta {
    /// Schema version (semver)
    pub schema_version: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_type: Option<EntityType>,

    /// Number of items in data
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,

    /// Original query string
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,

    /// True if results were truncated
    #[serde(skip_serializing_if = "Option::is_none")]
    pub truncated: Option<bool>,
}

impl Default for Meta {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            entity_type: None,
            count: None,
            query: None,
            duration_ms: None,
            truncated: None,
        }
    }
}

impl<T> Envelope<T> {
    fn with_code(status: Status, code: ResultCode, message: String, data: Option<T>) -> Self {
        Self {
            status,
            code,
            exit_code: code.exit_code() as u8,
            message,
            data,
            meta: Meta::default(),
        }
    }

    pub fn success(data: T) -> Self {
        Self::with_code(
            Status::Success,
            ResultCode::Ok,
            "Operation completed successfully".to_string(),
            Some(data),
        )
    }

    /// A lookup that found nothing. Data is still attached so the shape stays stable.
    pub fn not_found(data: T, message: impl Into<String>) -> Self {
        Self::with_code(
            Status::NotFound,
            ResultCode::NotFound,
            message.into(),
            Some(data),
        )
    }

    pub fn error(code: ResultCode, message: impl Into<String>) -> Self {
        Self::with_code(Status::Error, code, message.into(), None)
    }

    /// Replace the result code, keeping status and data.
    pub fn with_result_code(mut self, code: ResultCode) -> Self {
        self.code = code;
        self.exit_code = code.exit_code() as u8;
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn with_entity_type(mut self, entity_type: EntityType) -> Self {
        self.meta.entity_type = Some(entity_type);
        self
    }

    pub fn with_count(mut self, count: usize) -> Self {
        self.meta.count = Some(count);
        self
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.meta.query = Some(query.into());
        self
    }

    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.meta.duration_ms = Some(duration_ms);
        self
    }

    pub fn with_truncated(mut self, truncated: bool) -> Self {
        self.meta.truncated = Some(truncated);
        self
    }

    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error>
    where
        T: Serialize,
    {
        serde_json::to_string_pretty(self)
    }
}
