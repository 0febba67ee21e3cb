//! Security-attribute index for infrastructure-as-code.
//!
//! Discovers configuration files, extracts resource declarations, classifies them
//! against a rule table of security attributes and compliance controls, and persists
//! the result as one JSON index that answers control, attribute and type lookups.

pub mod classify;
pub mod cli;
pub mod config;
pub mod error;
pub mod indexing;
pub mod io;
pub mod logging;
pub mod parsing;
pub mod query;
pub mod storage;
pub mod types;
pub mod utils;

pub use classify::{Classification, Classifier, Rule, RuleTable};
pub use config::Settings;
pub use error::{IndexError, IndexResult};
pub use indexing::{
    BuildOutput, BuildWarning, FileDiscoverer, IndexBuilder, IndexSource, LoadedIndex,
    SecurityIndexer, WarningKind,
};
pub use query::{QueryEngine, QueryResult};
pub use storage::{IndexStorage, LoadOutcome, PersistedIndex, StalenessReport};
pub use types::{ComplianceStatus, IndexedResource, ResourceRef, RiskLevel, SourceFileInfo};
