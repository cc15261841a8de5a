//! Tracemark - trace emitter
//!
//! Produces [`tracelog::TraceRecord`]s from timed operations and hands
//! them to the rotating writer, or prints them on stdout when the console
//! bypass is enabled. Instrumentation is explicit: wrap the timed region
//! in a [`TraceSession::span`] guard, drive begin/end by hand, or run a
//! closure through [`TraceSession::trace`]. There is no interception of
//! arbitrary calls.
//!
//! # Example
//!
//! ```ignore
//! use tracemark::{TraceSession, TracerConfig};
//! use tracelog::TraceLogConfig;
//!
//! let config = TracerConfig::new(TraceLogConfig::new("logs/trace.json"));
//! let session = TraceSession::new(config)?;
//!
//! let result = session.trace("load-index", || load_index());
//!
//! session.close().await?;
//! ```

/// Console bypass formatting
mod console;

/// Trace sessions and instrumentation guards
pub mod session;

pub use session::{SpanGuard, TraceSession, TracerConfig};

// Re-exported so emitter users don't need a direct tracelog dependency.
pub use tracelog::{Phase, TraceLogConfig, TraceRecord};
