use iacindex::storage::StalenessReason;
use iacindex::{IndexSource, SecurityIndexer, Settings};
use std::fs;
use std::path::Path;
use std::time::{Duration, SystemTime};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

const KMS_TF: &str = "resource \"aws_kms_key\" \"k\" {\n  enable_key_rotation = true\n}\n";

fn settings(workspace: &Path) -> Settings {
    let mut settings = Settings::default();
    settings.workspace_root = Some(workspace.to_path_buf());
    settings.indexing.parallel_threads = 2;
    settings
}

fn indexer(workspace: &Path) -> SecurityIndexer {
    SecurityIndexer::from_settings(settings(workspace)).unwrap()
}

#[test]
fn test_touch_without_content_change_is_fresh() {
    let temp_dir = TempDir::new().unwrap();
    let file = temp_dir.path().join("kms.tf");
    fs::write(&file, KMS_TF).unwrap();

    let indexer = indexer(temp_dir.path());
    let index = indexer
        .build_and_persist(&CancellationToken::new())
        .unwrap()
        .index;

    // Same bytes, newer mtime
    let handle = fs::File::options().write(true).open(&file).unwrap();
    handle
        .set_modified(SystemTime::now() + Duration::from_secs(3600))
        .unwrap();
    drop(handle);

    let report = indexer.check_staleness(&index);
    println!("{}", report.summary());
    assert!(!report.stale);
    assert!(report.reasons.is_empty());
    assert_eq!(report.checked_files, 1);
}

#[test]
fn test_added_changed_and_deleted_files() {
    let temp_dir = TempDir::new().unwrap();
    // Discovery reports canonical paths
    let root = fs::canonicalize(temp_dir.path()).unwrap();
    let kept = root.join("kms.tf");
    let removed = root.join("vpc.tf");
    fs::write(&kept, KMS_TF).unwrap();
    fs::write(&removed, "resource \"aws_vpc\" \"main\" {}\n").unwrap();

    let indexer = indexer(temp_dir.path());
    let index = indexer
        .build_and_persist(&CancellationToken::new())
        .unwrap()
        .index;

    fs::write(&kept, "resource \"aws_kms_key\" \"k\" {}\n").unwrap();
    fs::remove_file(&removed).unwrap();
    let added = root.join("bucket.tf");
    fs::write(&added, "resource \"aws_s3_bucket\" \"b\" {}\n").unwrap();

    let report = indexer.check_staleness(&index);
    for reason in &report.reasons {
        println!("{reason}");
    }

    assert!(report.stale);
    assert_eq!(report.changed, vec![kept.clone()]);
    assert_eq!(report.deleted, vec![removed.clone()]);
    assert_eq!(report.added, vec![added.clone()]);
    assert!(report
        .reasons
        .iter()
        .any(|r| matches!(r, StalenessReason::FileAdded { path } if *path == added)));
}

#[test]
fn test_unchanged_broken_file_does_not_trigger_rebuild() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("kms.tf"), KMS_TF).unwrap();
    fs::write(temp_dir.path().join("broken.tf"), "resource \"x\" \"y\" {\n").unwrap();

    let indexer = indexer(temp_dir.path());
    let first = indexer.load_or_build(&CancellationToken::new()).unwrap();
    assert!(!first.from_cache());
    assert_eq!(first.warnings.len(), 1);

    let second = indexer.load_or_build(&CancellationToken::new()).unwrap();
    assert!(second.from_cache());
    assert!(second.warnings.is_empty());
    assert_eq!(second.index.metadata.total_files, 1);
}

#[test]
fn test_config_change_forces_rebuild() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("kms.tf"), KMS_TF).unwrap();
    fs::write(temp_dir.path().join("extra.hcl"), KMS_TF).unwrap();

    indexer(temp_dir.path())
        .build_and_persist(&CancellationToken::new())
        .unwrap();

    let mut changed = settings(temp_dir.path());
    changed.scan.include_patterns = vec!["*.tf".to_string(), "*.hcl".to_string()];
    let indexer = SecurityIndexer::from_settings(changed).unwrap();

    let index = indexer.storage().load().unwrap().into_index().unwrap();
    let report = indexer.check_staleness(&index);
    assert!(report.stale);
    assert!(report.reasons.contains(&StalenessReason::ConfigChanged));

    let loaded = indexer.load_or_build(&CancellationToken::new()).unwrap();
    assert!(matches!(loaded.source, IndexSource::Rebuilt(_)));
    assert_eq!(loaded.index.metadata.total_files, 2);
}
