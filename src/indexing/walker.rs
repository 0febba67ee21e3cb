//! File system walker for discovering configuration files to index
//!
//! This module provides directory traversal with support for:
//! - Include/exclude glob patterns from the scan configuration
//! - .gitignore rules
//! - Symlink following with loop protection
//! - Deduplication across overlapping roots

use crate::config::ScanConfig;
use crate::indexing::warning::{BuildWarning, WarningKind};
use glob::{MatchOptions, Pattern};
use ignore::WalkBuilder;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// A candidate file with the metadata seen at discovery time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredFile {
    /// Canonical path
    pub path: PathBuf,
    pub size_bytes: u64,
    pub modified: Option<SystemTime>,
}

/// Result of one discovery pass.
#[derive(Debug, Clone, Default)]
pub struct Discovery {
    /// Sorted by path, no duplicates
    pub files: Vec<DiscoveredFile>,
    pub warnings: Vec<BuildWarning>,
}

impl Discovery {
    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.files.iter().map(|f| f.path.as_path())
    }
}

/// Walks scan roots to find configuration files to index
#[derive(Debug, Clone)]
pub struct FileDiscoverer {
    scan: ScanConfig,
    include: Vec<Pattern>,
    exclude: Vec<Pattern>,
    pattern_warnings: Vec<BuildWarning>,
}

impl FileDiscoverer {
    /// Create a discoverer, compiling the glob patterns.
    ///
    /// Invalid patterns are dropped and reported with every discovery.
    pub fn new(scan: ScanConfig) -> Self {
        let mut pattern_warnings = Vec::new();
        let include = compile_patterns(&scan.include_patterns, &mut pattern_warnings);
        let exclude = compile_patterns(&scan.exclude_patterns, &mut pattern_warnings);

        Self {
            scan,
            include,
            exclude,
            pattern_warnings,
        }
    }

    pub fn scan_config(&self) -> &ScanConfig {
        &self.scan
    }

    /// Walk every root and return the deduplicated, sorted candidate list.
    pub fn discover(&self) -> Discovery {
        let mut warnings = self.pattern_warnings.clone();
        let mut files: BTreeMap<PathBuf, DiscoveredFile> = BTreeMap::new();

        for root in &self.scan.roots {
            if !root.exists() {
                tracing::warn!("[discover] scan root does not exist: {}", root.display());
                warnings.push(BuildWarning::for_path(
                    WarningKind::MissingRoot,
                    root,
                    "scan root does not exist",
                ));
                continue;
            }
            self.walk_root(root, &mut files, &mut warnings);
        }

        tracing::debug!(
            "[discover] {} files from {} roots, {} warnings",
            files.len(),
            self.scan.roots.len(),
            warnings.len()
        );

        Discovery {
            files: files.into_values().collect(),
            warnings,
        }
    }

    fn walk_root(
        &self,
        root: &Path,
        files: &mut BTreeMap<PathBuf, DiscoveredFile>,
        warnings: &mut Vec<BuildWarning>,
    ) {
        let respect_gitignore = self.scan.respect_gitignore;
        let mut builder = WalkBuilder::new(root);
        builder
            .hidden(false) // .terraform and friends are handled by exclude patterns
            .parents(respect_gitignore)
            .ignore(false)
            .git_ignore(respect_gitignore)
            .git_global(respect_gitignore)
            .git_exclude(respect_gitignore)
            .follow_links(self.scan.follow_links)
            .require_git(false)
            .sort_by_file_path(|a, b| a.cmp(b));

        for result in builder.build() {
            let entry = match result {
                Ok(entry) => entry,
                Err(err) => {
                    tracing::warn!("[discover] skipping entry: {err}");
                    warnings.push(walk_warning(&err));
                    continue;
                }
            };

            if !entry.file_type().is_some_and(|ft| ft.is_file()) {
                continue;
            }

            let path = entry.path();
            if !self.is_candidate(root, path) {
                continue;
            }

            let canonical = match fs::canonicalize(path) {
                Ok(canonical) => canonical,
                Err(e) => {
                    warnings.push(BuildWarning::for_path(
                        WarningKind::WalkError,
                        path,
                        format!("cannot resolve path: {e}"),
                    ));
                    continue;
                }
            };
            if files.contains_key(&canonical) {
                continue;
            }

            match fs::metadata(&canonical) {
                Ok(meta) if meta.is_file() => {
                    files.insert(
                        canonical.clone(),
                        DiscoveredFile {
                            path: canonical,
                            size_bytes: meta.len(),
                            modified: meta.modified().ok(),
                        },
                    );
                }
                Ok(_) => {}
                Err(e) => warnings.push(BuildWarning::for_path(
                    WarningKind::WalkError,
                    path,
                    format!("cannot read metadata: {e}"),
                )),
            }
        }
    }

    /// Matches an include pattern and no exclude pattern.
    pub fn is_candidate(&self, root: &Path, path: &Path) -> bool {
        let relative = path.strip_prefix(root).unwrap_or(path);
        self.include
            .iter()
            .any(|pattern| pattern_matches(pattern, relative, path))
            && !self
                .exclude
                .iter()
                .any(|pattern| pattern_matches(pattern, relative, path))
    }
}

fn compile_patterns(raw: &[String], warnings: &mut Vec<BuildWarning>) -> Vec<Pattern> {
    raw.iter()
        .filter_map(|pattern| match Pattern::new(pattern) {
            Ok(compiled) => Some(compiled),
            Err(e) => {
                tracing::warn!("[discover] ignoring invalid glob pattern '{pattern}': {e}");
                warnings.push(BuildWarning::new(
                    WarningKind::InvalidPattern,
                    format!("invalid glob pattern '{pattern}': {e}"),
                ));
                None
            }
        })
        .collect()
}

/// Where a pattern applies:
/// - no `/` and no `**`: the file name only
/// - absolute: the full path
/// - otherwise: the path relative to the scan root
///
/// `*` never crosses a separator, so nothing above the scan root can match.
fn pattern_matches(pattern: &Pattern, relative: &Path, full: &Path) -> bool {
    let options = MatchOptions {
        case_sensitive: true,
        require_literal_separator: true,
        require_literal_leading_dot: false,
    };

    let raw = pattern.as_str();
    if !raw.contains('/') && !raw.contains("**") {
        return full
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| pattern.matches_with(name, options));
    }
    if Path::new(raw).is_absolute() {
        return pattern.matches_path_with(full, options);
    }
    pattern.matches_path_with(relative, options)
}

fn walk_warning(err: &ignore::Error) -> BuildWarning {
    match error_path(err) {
        Some(path) => BuildWarning::for_path(WarningKind::WalkError, path, err.to_string()),
        None => BuildWarning::new(WarningKind::WalkError, err.to_string()),
    }
}

fn error_path(err: &ignore::Error) -> Option<PathBuf> {
    match err {
        ignore::Error::WithPath { path, .. } => Some(path.clone()),
        ignore::Error::WithDepth { err, .. } | ignore::Error::WithLineNumber { err, .. } => {
            error_path(err)
        }
        ignore::Error::Loop { child, .. } => Some(child.clone()),
        ignore::Error::Partial(errors) => errors.iter().find_map(error_path),
        _ => None,
    }
}
