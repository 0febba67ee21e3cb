//! Configuration module for the security-attribute index.
//!
//! This module provides a layered configuration system that supports:
//! - Default values
//! - TOML configuration file (`.iacindex/settings.toml`)
//! - Environment variable overrides
//! - CLI argument overrides (applied by the caller after loading)
//!
//! # Environment Variables
//!
//! Environment variables must be prefixed with `IACINDEX_` and use double underscores
//! to separate nested levels:
//! - `IACINDEX_INDEXING__PARALLEL_THREADS=8` sets `indexing.parallel_threads`
//! - `IACINDEX_STORAGE__CACHE_DIR=/tmp/cache` sets `storage.cache_dir`
//! - `IACINDEX_SCAN__RESPECT_GITIGNORE=false` sets `scan.respect_gitignore`

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Directory holding the workspace configuration.
pub const CONFIG_DIR: &str = ".iacindex";

/// Prefix for environment variable overrides.
pub const ENV_PREFIX: &str = "IACINDEX_";

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    /// Version of the configuration schema
    #[serde(default = "default_version")]
    pub version: u32,

    /// Workspace root directory (where .iacindex is located)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace_root: Option<PathBuf>,

    /// Which files make up the scanned corpus
    #[serde(default)]
    pub scan: ScanConfig,

    /// Worker pool and per-file limits
    #[serde(default)]
    pub indexing: IndexingConfig,

    /// Where the persisted index lives
    #[serde(default)]
    pub storage: StorageConfig,

    /// Rule table selection
    #[serde(default)]
    pub classifier: ClassifierConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Scan configuration: root paths plus include/exclude globs.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct ScanConfig {
    /// Root directories (or single files) to scan
    #[serde(default = "default_roots")]
    pub roots: Vec<PathBuf>,

    /// A file is a candidate only if it matches at least one of these
    #[serde(default = "default_include_patterns")]
    pub include_patterns: Vec<String>,

    /// A file matching any of these is never a candidate
    #[serde(default = "default_exclude_patterns")]
    pub exclude_patterns: Vec<String>,

    /// Honour .gitignore files found under the roots
    #[serde(default = "default_true")]
    pub respect_gitignore: bool,

    /// Follow symbolic links (each target is visited once)
    #[serde(default = "default_true")]
    pub follow_links: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct IndexingConfig {
    /// Number of worker threads extracting and classifying files
    #[serde(default = "default_parallel_threads")]
    pub parallel_threads: usize,

    /// Capacity of the bounded work queue feeding the workers
    #[serde(default = "default_channel_size")]
    pub channel_size: usize,

    /// Files larger than this many bytes are skipped with a warning
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct StorageConfig {
    /// Cache directory; the index is written to `{cache_dir}/iac/index.json`
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,

    /// Age after which an index is reported as old (does not force a rebuild)
    #[serde(default = "default_max_age_days")]
    pub max_age_days: u32,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ClassifierConfig {
    /// Optional TOML rule table
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rules_file: Option<PathBuf>,

    /// Use the builtin rules, alone or ahead of `rules_file`
    #[serde(default = "default_true")]
    pub include_builtin: bool,
}

/// Logging configuration with per-module level overrides.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    /// Default level for all modules
    #[serde(default = "default_log_level")]
    pub default: String,

    /// Per-module overrides, e.g. `iacindex::indexing = "debug"`
    #[serde(default)]
    pub modules: HashMap<String, String>,
}

// Default value functions
fn default_version() -> u32 {
    1
}
fn default_true() -> bool {
    true
}
fn default_roots() -> Vec<PathBuf> {
    vec![PathBuf::from(".")]
}
fn default_include_patterns() -> Vec<String> {
    vec!["*.tf".to_string()]
}
fn default_exclude_patterns() -> Vec<String> {
    vec!["**/.terraform/**".to_string(), "**/.git/**".to_string()]
}
fn default_parallel_threads() -> usize {
    num_cpus::get()
}
fn default_channel_size() -> usize {
    256
}
fn default_max_file_size() -> u64 {
    10 * 1024 * 1024
}
fn default_cache_dir() -> PathBuf {
    PathBuf::from(".cache")
}
fn default_max_age_days() -> u32 {
    7
}
fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: default_version(),
            workspace_root: None,
            scan: ScanConfig::default(),
            indexing: IndexingConfig::default(),
            storage: StorageConfig::default(),
            classifier: ClassifierConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            roots: default_roots(),
            include_patterns: default_include_patterns(),
            exclude_patterns: default_exclude_patterns(),
            respect_gitignore: true,
            follow_links: true,
        }
    }
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            parallel_threads: default_parallel_threads(),
            channel_size: default_channel_size(),
            max_file_size: default_max_file_size(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            cache_dir: default_cache_dir(),
            max_age_days: default_max_age_days(),
        }
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            rules_file: None,
            include_builtin: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default: default_log_level(),
            modules: HashMap::new(),
        }
    }
}

impl ScanConfig {
    /// Scan the given roots with the default include/exclude patterns.
    pub fn new<I, P>(roots: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            roots: roots.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Replace the include patterns
    pub fn with_include<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.include_patterns = patterns.into_iter().map(Into::into).collect();
        self
    }

    /// Replace the exclude patterns
    pub fn with_exclude<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude_patterns = patterns.into_iter().map(Into::into).collect();
        self
    }

    /// Stable hash of everything that changes which files are scanned.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for root in &self.roots {
            hasher.update(b"root:");
            hasher.update(root.to_string_lossy().as_bytes());
            hasher.update([0]);
        }
        for pattern in &self.include_patterns {
            hasher.update(b"include:");
            hasher.update(pattern.as_bytes());
            hasher.update([0]);
        }
        for pattern in &self.exclude_patterns {
            hasher.update(b"exclude:");
            hasher.update(pattern.as_bytes());
            hasher.update([0]);
        }
        hasher.update([self.respect_gitignore as u8, self.follow_links as u8]);
        format!("{:x}", hasher.finalize())
    }
}

impl Settings {
    /// Load configuration from all sources
    pub fn load() -> Result<Self, Box<figment::Error>> {
        // Try to find the workspace root by looking for .iacindex directory
        let config_path = Self::find_workspace_config()
            .unwrap_or_else(|| PathBuf::from(CONFIG_DIR).join("settings.toml"));

        Self::figment(&config_path)
            .extract()
            .map_err(Box::new)
            .map(|mut settings: Settings| {
                if settings.workspace_root.is_none() {
                    settings.workspace_root = Self::workspace_root();
                }
                settings
            })
    }

    /// Load configuration from a specific file
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, Box<figment::Error>> {
        Self::figment(path.as_ref()).extract().map_err(Box::new)
    }

    fn figment(config_path: &Path) -> Figment {
        Figment::new()
            // Start with defaults
            .merge(Serialized::defaults(Settings::default()))
            // Layer in config file if it exists
            .merge(Toml::file(config_path))
            // Double underscore separates nested levels; single underscores stay in field names
            .merge(Env::prefixed(ENV_PREFIX).map(|key| {
                key.as_str().to_lowercase().replace("__", ".").into()
            }))
    }

    /// Find the workspace config by looking for a .iacindex directory
    /// from the current directory up to the filesystem root.
    pub fn find_workspace_config() -> Option<PathBuf> {
        Self::workspace_root().map(|root| root.join(CONFIG_DIR).join("settings.toml"))
    }

    /// Get the workspace root directory (where .iacindex is located)
    pub fn workspace_root() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;

        current
            .ancestors()
            .find(|ancestor| ancestor.join(CONFIG_DIR).is_dir())
            .map(Path::to_path_buf)
    }

    /// Location of the persisted index file.
    ///
    /// A relative cache directory is resolved against the workspace root when one is known.
    pub fn index_file(&self) -> PathBuf {
        let cache_dir = match &self.workspace_root {
            Some(root) if self.storage.cache_dir.is_relative() => root.join(&self.storage.cache_dir),
            _ => self.storage.cache_dir.clone(),
        };
        cache_dir.join("iac").join("index.json")
    }

    /// Save current configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }

        let toml_string = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_string)?;

        Ok(())
    }

    /// Create a default settings file in the current directory
    pub fn init_config_file(force: bool) -> Result<PathBuf, Box<dyn std::error::Error>> {
        let config_path = PathBuf::from(CONFIG_DIR).join("settings.toml");

        if !force && config_path.exists() {
            return Err("Configuration file already exists. Use --force to overwrite".into());
        }

        let settings = Settings::default();
        settings.save(&config_path)?;

        Ok(config_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.version, 1);
        assert_eq!(settings.scan.include_patterns, vec!["*.tf"]);
        assert!(settings.indexing.parallel_threads > 0);
        assert_eq!(settings.storage.cache_dir, PathBuf::from(".cache"));
        assert!(settings.classifier.include_builtin);
        assert_eq!(settings.logging.default, "warn");
    }

    #[test]
    fn test_index_file_location() {
        let mut settings = Settings::default();
        assert_eq!(
            settings.index_file(),
            PathBuf::from(".cache").join("iac").join("index.json")
        );

        settings.workspace_root = Some(PathBuf::from("/work"));
        assert_eq!(
            settings.index_file(),
            PathBuf::from("/work/.cache/iac/index.json")
        );

        settings.storage.cache_dir = PathBuf::from("/var/cache/iacindex");
        assert_eq!(
            settings.index_file(),
            PathBuf::from("/var/cache/iacindex/iac/index.json")
        );
    }

    #[test]
    fn test_load_from_toml() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("settings.toml");

        let toml_content = r#"
[scan]
roots = ["infra", "modules"]
include_patterns = ["*.tf", "*.tf.json"]

[indexing]
parallel_threads = 4
max_file_size = 2048

[storage]
cache_dir = "/tmp/iac-cache"

[logging]
default = "info"

[logging.modules]
"iacindex::indexing" = "debug"
"#;

        fs::write(&config_path, toml_content).unwrap();

        let settings = Settings::load_from(&config_path).unwrap();
        assert_eq!(
            settings.scan.roots,
            vec![PathBuf::from("infra"), PathBuf::from("modules")]
        );
        assert_eq!(settings.scan.include_patterns.len(), 2);
        // Exclude patterns were not given, so the defaults remain
        assert_eq!(settings.scan.exclude_patterns, default_exclude_patterns());
        assert_eq!(settings.indexing.parallel_threads, 4);
        assert_eq!(settings.indexing.max_file_size, 2048);
        assert_eq!(settings.storage.cache_dir, PathBuf::from("/tmp/iac-cache"));
        assert_eq!(settings.logging.default, "info");
        assert_eq!(
            settings.logging.modules.get("iacindex::indexing").map(String::as_str),
            Some("debug")
        );
    }

    #[test]
    fn test_save_settings() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nested").join("settings.toml");

        let mut settings = Settings::default();
        settings.indexing.parallel_threads = 2;
        settings.scan.exclude_patterns = vec!["**/vendor/**".to_string()];

        settings.save(&config_path).unwrap();

        let loaded = Settings::load_from(&config_path).unwrap();
        assert_eq!(loaded.indexing.parallel_threads, 2);
        assert_eq!(loaded.scan.exclude_patterns, vec!["**/vendor/**"]);
    }

    #[test]
    fn test_scan_fingerprint_tracks_patterns() {
        let base = ScanConfig::new(["infra"]);
        let same = ScanConfig::new(["infra"]);
        let other = ScanConfig::new(["infra"]).with_exclude(["**/legacy/**"]);

        assert_eq!(base.fingerprint(), same.fingerprint());
        assert_ne!(base.fingerprint(), other.fingerprint());
        assert_eq!(base.fingerprint().len(), 64);
    }
}
