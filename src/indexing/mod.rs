pub mod builder;
pub mod facade;
pub mod pipeline;
pub mod walker;
pub mod warning;

pub use builder::{BuildOutput, IndexBuilder};
pub use facade::{IndexSource, LoadedIndex, RebuildReason, SecurityIndexer};
pub use pipeline::{Pipeline, PipelineConfig, PipelineError, PipelineResult};
pub use walker::{DiscoveredFile, Discovery, FileDiscoverer};
pub use warning::{BuildWarning, WarningKind};
