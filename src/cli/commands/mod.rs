//! Command implementations for the CLI.
//!
//! Each command is implemented in its own module and returns the process exit code.

pub mod build;
pub mod clear;
pub mod init;
pub mod query;
pub mod rules;
pub mod status;
pub mod validate;

use crate::io::ResultCode;
use crate::storage::{AbsentReason, IndexStorage, LoadOutcome, PersistedIndex};

/// Why a command that needs an index could not get one.
#[derive(Debug)]
pub struct Unavailable {
    pub code: ResultCode,
    pub message: String,
}

/// Load the persisted index for a read-only command. Never rebuilds.
pub fn load_index(storage: &IndexStorage) -> Result<PersistedIndex, Unavailable> {
    match storage.load() {
        Ok(LoadOutcome::Loaded(index)) => Ok(*index),
        Ok(LoadOutcome::Absent(AbsentReason::Missing)) => Err(Unavailable {
            code: ResultCode::IndexMissing,
            message: format!(
                "No index at {}. Run 'iacindex build' first.",
                storage.path().display()
            ),
        }),
        Ok(LoadOutcome::Absent(reason)) => Err(Unavailable {
            code: ResultCode::InvalidIndex,
            message: format!("{reason}. Run 'iacindex build' to rebuild."),
        }),
        Err(e) => Err(Unavailable {
            code: ResultCode::InternalError,
            message: e.to_string(),
        }),
    }
}
