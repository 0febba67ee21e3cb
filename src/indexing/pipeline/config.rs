//! Pipeline configuration
//!
//! Controls worker count, channel capacity and the per-file size limit.
//! Reads from Settings (.iacindex/settings.toml).

use crate::Settings;

/// Configuration for the parallel indexing pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Number of extraction workers (default: CPU count)
    pub workers: usize,

    /// Channel capacity for file paths (FEED → WORKERS)
    pub channel_size: usize,

    /// Files larger than this are skipped with a warning
    pub max_file_size: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: num_cpus::get().max(1),
            channel_size: 256,
            max_file_size: 10 * 1024 * 1024,
        }
    }
}

impl PipelineConfig {
    /// Create config from Settings.
    ///
    /// - `indexing.parallel_threads` -> workers
    /// - `indexing.channel_size` -> channel_size
    /// - `indexing.max_file_size` -> max_file_size
    pub fn from_settings(settings: &Settings) -> Self {
        let indexing = &settings.indexing;
        Self {
            workers: indexing.parallel_threads.max(1),
            channel_size: indexing.channel_size.max(1),
            max_file_size: indexing.max_file_size,
        }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_channel_size(mut self, size: usize) -> Self {
        self.channel_size = size.max(1);
        self
    }

    pub fn with_max_file_size(mut self, bytes: u64) -> Self {
        self.max_file_size = bytes;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_settings() {
        let mut settings = Settings::default();
        settings.indexing.parallel_threads = 0;
        settings.indexing.channel_size = 32;
        settings.indexing.max_file_size = 1024;

        let config = PipelineConfig::from_settings(&settings);
        assert_eq!(config.workers, 1, "zero threads clamps to one worker");
        assert_eq!(config.channel_size, 32);
        assert_eq!(config.max_file_size, 1024);
    }

    #[test]
    fn test_builders_clamp() {
        let config = PipelineConfig::default().with_workers(0).with_channel_size(0);
        assert_eq!(config.workers, 1);
        assert_eq!(config.channel_size, 1);
    }
}
