//! Collect stage - single-threaded merge
//!
//! Combines worker fragments into one ordered result. Workers finish in any order,
//! so everything is sorted here before reference ids are assigned.

use crate::indexing::pipeline::types::IndexFragment;
use crate::indexing::warning::BuildWarning;
use crate::storage::{ResourceIndex, SkippedFile};
use crate::types::SourceFileInfo;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Merged output of every worker.
#[derive(Debug, Default)]
pub struct Collected {
    pub index: ResourceIndex,
    pub source_files: BTreeMap<PathBuf, SourceFileInfo>,
    pub skipped: Vec<SkippedFile>,
    pub warnings: Vec<BuildWarning>,
}

pub struct CollectStage;

impl CollectStage {
    pub fn merge(fragments: Vec<IndexFragment>) -> Collected {
        let mut resources = Vec::new();
        let mut source_files = BTreeMap::new();
        let mut skipped = Vec::new();
        let mut warnings = Vec::new();

        for fragment in fragments {
            resources.extend(fragment.resources);
            source_files.extend(fragment.files.into_iter().map(|info| (info.path.clone(), info)));
            skipped.extend(fragment.skipped);
            warnings.extend(fragment.warnings);
        }

        resources.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
        skipped.sort_by(|a: &SkippedFile, b| a.path.cmp(&b.path));
        warnings.sort_by(|a: &BuildWarning, b| a.path.cmp(&b.path).then(a.kind.cmp(&b.kind)));

        Collected {
            index: ResourceIndex::from_resources(resources),
            source_files,
            skipped,
            warnings,
        }
    }
}
