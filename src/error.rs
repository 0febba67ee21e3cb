//! Build and facade errors.

use crate::classify::RuleError;
use crate::indexing::pipeline::PipelineError;
use crate::storage::StorageError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Rule table error: {0}")]
    Rules(#[from] RuleError),

    #[error("Build cancelled")]
    Cancelled,
}

impl IndexError {
    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            Self::Cancelled | Self::Pipeline(PipelineError::Cancelled)
        )
    }
}

pub type IndexResult<T> = Result<T, IndexError>;
