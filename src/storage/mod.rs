pub mod error;
pub mod index_data;
pub mod persistence;
pub mod staleness;
pub mod validation;

pub use error::{StorageError, StorageResult};
pub use index_data::{
    INDEX_VERSION, IndexMetadata, IndexStatistics, PersistedIndex, RefMap, ResourceIndex,
    SkippedFile,
};
pub use persistence::{AbsentReason, IndexStorage, LoadOutcome};
pub use staleness::{StalenessChecker, StalenessReason, StalenessReport};
pub use validation::{Severity, ValidationIssue, ValidationReport, validate};
