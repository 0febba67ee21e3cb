//! Common utilities shared across modules.

use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Component, Path};

/// SHA-256 of a byte slice, lowercase hex.
pub fn compute_checksum(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// SHA-256 of a file's content, streamed so memory stays flat for large files.
pub fn checksum_file(path: &Path) -> io::Result<String> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut hasher = Sha256::new();
    io::copy(&mut reader, &mut hasher)?;
    Ok(format!("{:x}", hasher.finalize()))
}

/// Deployment environment implied by a path segment, if any.
///
/// Only whole directory or file-stem segments count, so `product/` is not `prod`.
pub fn detect_environment(path: &Path) -> Option<&'static str> {
    path.components().rev().find_map(|component| {
        let Component::Normal(segment) = component else {
            return None;
        };
        let segment = segment.to_str()?;
        let stem = segment.split('.').next().unwrap_or(segment);
        match stem.to_ascii_lowercase().as_str() {
            "prod" | "production" | "prd" => Some("production"),
            "staging" | "stage" | "stg" => Some("staging"),
            "dev" | "development" => Some("development"),
            "test" | "testing" | "qa" => Some("test"),
            _ => None,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn test_checksum_is_content_addressed() {
        let a = compute_checksum(b"resource \"aws_kms_key\" \"k\" {}");
        let b = compute_checksum(b"resource \"aws_kms_key\" \"k\" {}");
        let c = compute_checksum(b"resource \"aws_kms_key\" \"j\" {}");

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_streamed_checksum_matches_in_memory() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("main.tf");
        let content = "variable \"region\" {}\n".repeat(10_000);
        fs::write(&path, &content).unwrap();

        assert_eq!(
            checksum_file(&path).unwrap(),
            compute_checksum(content.as_bytes())
        );
    }

    #[test]
    fn test_detect_environment() {
        let cases = [
            ("infra/prod/main.tf", Some("production")),
            ("infra/environments/staging/network.tf", Some("staging")),
            ("dev.tf", Some("development")),
            ("modules/product/main.tf", None),
            ("modules/kms/main.tf", None),
        ];
        for (path, expected) in cases {
            assert_eq!(
                detect_environment(&PathBuf::from(path)),
                expected,
                "path: {path}"
            );
        }
    }
}
