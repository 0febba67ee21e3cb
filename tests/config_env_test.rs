use iacindex::Settings;
use std::env;
use std::path::PathBuf;
use tempfile::TempDir;

// Environment variables are process-wide, so every override check lives in one test.
#[test]
fn test_env_override_with_double_underscore() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("settings.toml");
    std::fs::write(
        &config_path,
        r#"
[indexing]
parallel_threads = 3

[storage]
max_age_days = 30
"#,
    )
    .unwrap();

    unsafe {
        // Double underscore separates nested levels
        env::set_var("IACINDEX_INDEXING__PARALLEL_THREADS", "42");
        env::set_var("IACINDEX_STORAGE__CACHE_DIR", "/tmp/iacindex-cache");
        env::set_var("IACINDEX_SCAN__RESPECT_GITIGNORE", "false");
    }

    let settings = Settings::load_from(&config_path);

    unsafe {
        env::remove_var("IACINDEX_INDEXING__PARALLEL_THREADS");
        env::remove_var("IACINDEX_STORAGE__CACHE_DIR");
        env::remove_var("IACINDEX_SCAN__RESPECT_GITIGNORE");
    }

    let settings = settings.unwrap();
    println!("Parallel threads: {}", settings.indexing.parallel_threads);
    println!("Cache dir: {}", settings.storage.cache_dir.display());

    assert_eq!(settings.indexing.parallel_threads, 42, "env beats the file");
    assert_eq!(settings.storage.cache_dir, PathBuf::from("/tmp/iacindex-cache"));
    assert!(!settings.scan.respect_gitignore);
    // Values only present in the file survive
    assert_eq!(settings.storage.max_age_days, 30);
    assert_eq!(settings.scan.include_patterns, vec!["*.tf"]);
}
