//! Tracelog - rotating trace-event log
//!
//! A durable sink for structured trace events: short timestamped records
//! describing the start and end of timed operations, appended continuously
//! to disk in the streaming Trace Event JSON format, with automatic
//! rotation once the active file grows past a size threshold.
//!
//! # Architecture
//!
//! ```text
//! [emitter] --TraceRecord--> [TraceLog handle] --mpsc--> [writer task]
//!                                                             |
//!                                               [RotatingTraceWriter]
//!                                                             |
//!                                                   [AppendSink (file)]
//! ```
//!
//! The writer's state is only ever mutated from the task that owns it.
//! The hot path (`TraceLog::write_trace`) is a non-blocking channel send;
//! buffering, rotation and open-retry all happen on the writer task.
//!
//! # Example
//!
//! ```ignore
//! use tracelog::{Phase, TraceLog, TraceLogConfig, TraceRecord};
//!
//! let config = TraceLogConfig::new("logs/trace.json").with_max_file_size(10_000_000);
//! let log = TraceLog::spawn(config)?;
//!
//! log.write_trace(TraceRecord::new(1234, 0, 0.0, "startup", Phase::Begin));
//! log.write_trace(TraceRecord::new(1234, 0, 4.25, "startup", Phase::End));
//!
//! log.close().await?;
//! ```
//!
//! # File format
//!
//! Each file holds a single growing JSON object,
//! `{"traceEvents": [r0,r1,...,rn]}`, written incrementally: the array
//! prefix before the first record, a comma before every later record, and
//! the `]}` footer at close time. Completed rotations are renamed to
//! `<stem>.<sequence_id>.<ext>` next to the active (unsuffixed) file.

/// Trace log configuration (filename, rotation threshold, retry timing)
pub mod config;

/// Error types
pub mod error;

/// Reading completed trace files (tests and tooling)
pub mod reader;

/// Trace records and on-disk format constants
pub mod record;

/// Append-sink abstraction over the filesystem
pub mod sink;

/// Writer task and the cloneable `TraceLog` handle
pub mod task;

/// The rotating writer state machine
pub mod writer;

#[cfg(test)]
pub(crate) mod testutil;

pub use config::TraceLogConfig;
pub use error::{Result, TraceLogError};
pub use reader::read_trace_file;
pub use record::{Phase, TraceRecord, FILE_FOOTER, FILE_HEADER, RECORD_DELIMITER};
pub use sink::{AppendSink, FsSinkFactory, SinkFactory};
pub use task::{TraceLog, TraceLogMetrics, TraceLogMetricsSnapshot};
pub use writer::RotatingTraceWriter;
