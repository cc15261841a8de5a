//! Error types for the trace log
//!
//! Only failures the caller can act on surface here. Transient I/O
//! failures (a failed open, an asynchronous sink error, a failed rotation
//! rename) are logged and retried internally and never reach this enum.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for trace log operations
pub type Result<T> = std::result::Result<T, TraceLogError>;

/// Errors raised out of the trace log
#[derive(Debug, Error)]
pub enum TraceLogError {
    /// Configuration rejected at construction; never retried.
    #[error("trace log requires a filename")]
    MissingFilename,

    /// Stat of the target path failed with something other than NotFound.
    ///
    /// This is the one open-time failure that propagates instead of being
    /// absorbed into the retry cycle.
    #[error("failed to stat '{path}': {source}")]
    Stat {
        /// Path that was statted
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// The close sequence failed. Internal flags are still reset, so the
    /// writer can be reopened afterwards.
    #[error("close failed: {0}")]
    Close(#[source] io::Error),

    /// The writer task is no longer running.
    #[error("trace log task is no longer running")]
    ChannelClosed,
}
