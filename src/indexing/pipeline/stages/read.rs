//! Read stage - file content reading
//!
//! Reads file bytes and computes the content checksum.

use crate::indexing::pipeline::types::{FileContent, FileOutcome, PipelineError, PipelineResult};
use crate::indexing::warning::WarningKind;
use crate::utils::{checksum_file, compute_checksum};
use std::fs;
use std::path::Path;

/// Read a single file and compute its checksum.
///
/// The size limit is checked from metadata before any bytes are loaded.
pub fn read_file(path: &Path, max_file_size: u64) -> PipelineResult<FileContent> {
    let meta = fs::metadata(path).map_err(|e| PipelineError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;
    if meta.len() > max_file_size {
        return Err(PipelineError::FileTooLarge {
            path: path.to_path_buf(),
            size: meta.len(),
            limit: max_file_size,
        });
    }

    let bytes = fs::read(path).map_err(|e| PipelineError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;
    let checksum = compute_checksum(&bytes);

    Ok(FileContent {
        path: path.to_path_buf(),
        bytes,
        checksum,
    })
}

/// Turn a read failure into a skip record.
///
/// Oversized files still get a streamed checksum so staleness can see them change.
pub fn read_failure(path: &Path, error: PipelineError) -> FileOutcome {
    match error {
        PipelineError::FileTooLarge { size, limit, .. } => FileOutcome::skipped(
            path.to_path_buf(),
            checksum_file(path).ok(),
            WarningKind::TooLarge,
            format!("file is {size} bytes, limit is {limit}"),
        ),
        other => FileOutcome::skipped(
            path.to_path_buf(),
            None,
            WarningKind::ReadError,
            other.to_string(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_read_file_checksums_bytes() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("main.tf");
        fs::write(&path, "resource \"aws_vpc\" \"main\" {}\n").unwrap();

        let content = read_file(&path, 1024).unwrap();
        assert_eq!(content.checksum, compute_checksum(&content.bytes));
        assert_eq!(content.size_bytes(), 29);
    }

    #[test]
    fn test_oversized_file_is_skipped_with_checksum() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("huge.tf");
        fs::write(&path, "x".repeat(100)).unwrap();

        let error = read_file(&path, 10).unwrap_err();
        assert!(matches!(error, PipelineError::FileTooLarge { size: 100, .. }));

        match read_failure(&path, error) {
            FileOutcome::Skipped { skipped, warning } => {
                assert_eq!(warning.kind, WarningKind::TooLarge);
                assert_eq!(skipped.checksum, checksum_file(&path).ok());
            }
            other => panic!("expected skip, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("gone.tf");

        let error = read_file(&path, 1024).unwrap_err();
        match read_failure(&path, error) {
            FileOutcome::Skipped { skipped, warning } => {
                assert_eq!(warning.kind, WarningKind::ReadError);
                assert_eq!(warning.path(), Some(path.as_path()));
                assert!(skipped.checksum.is_none());
            }
            other => panic!("expected skip, got {other:?}"),
        }
    }
}
