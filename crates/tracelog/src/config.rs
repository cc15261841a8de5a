//! Trace log configuration
//!
//! Only `filename` is required; everything else has a sensible default.

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Result, TraceLogError};

/// Default rotation threshold in bytes (100 MB).
pub const DEFAULT_MAX_FILE_SIZE: u64 = 100_000_000;

/// Default delay before re-attempting a failed open or rename.
pub const DEFAULT_RETRY_DELAY_MS: u64 = 1000;

/// Default interval for periodic flushing and sink error polling.
pub const DEFAULT_FLUSH_INTERVAL_MS: u64 = 100;

/// Default command channel capacity for the writer task.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// Configuration for a rotating trace log
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TraceLogConfig {
    /// Path of the active trace file. Required.
    pub filename: PathBuf,

    /// Rotation threshold in bytes.
    pub max_file_size: u64,

    /// Declared retention cap on rotated files.
    ///
    /// Accepted but not enforced: no pruning of rotated files is
    /// performed. Reserved for a future retention pass.
    pub max_files: Option<u32>,

    /// Delay in milliseconds before re-attempting a failed open.
    pub retry_delay_ms: u64,

    /// Interval in milliseconds for periodic flushing.
    pub flush_interval_ms: u64,

    /// Command channel capacity for the writer task.
    pub channel_capacity: usize,
}

impl Default for TraceLogConfig {
    fn default() -> Self {
        Self {
            filename: PathBuf::new(),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            max_files: None,
            retry_delay_ms: DEFAULT_RETRY_DELAY_MS,
            flush_interval_ms: DEFAULT_FLUSH_INTERVAL_MS,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

impl TraceLogConfig {
    /// Create a config for the given active-file path.
    pub fn new(filename: impl Into<PathBuf>) -> Self {
        Self {
            filename: filename.into(),
            ..Self::default()
        }
    }

    /// Set the rotation threshold in bytes.
    pub fn with_max_file_size(mut self, bytes: u64) -> Self {
        self.max_file_size = bytes;
        self
    }

    /// Declare a retention cap (currently unenforced).
    pub fn with_max_files(mut self, files: u32) -> Self {
        self.max_files = Some(files);
        self
    }

    /// Set the open-retry delay.
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay_ms = delay.as_millis() as u64;
        self
    }

    /// Set the periodic flush interval.
    pub fn with_flush_interval(mut self, interval: Duration) -> Self {
        self.flush_interval_ms = interval.as_millis() as u64;
        self
    }

    /// Open-retry delay as a `Duration`.
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    /// Flush interval as a `Duration`.
    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.filename.as_os_str().is_empty() {
            return Err(TraceLogError::MissingFilename);
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;
