//! Trace sessions
//!
//! A [`TraceSession`] owns everything an instrumented program needs to
//! emit begin/end records: the process id, a logical worker id, a
//! monotonic clock anchored at session start, and a sequence generator
//! for disambiguating mark names. Records go to a [`tracelog::TraceLog`]
//! writer, or straight to stdout when the console bypass is enabled.
//!
//! Emission never blocks: the writer handle is a non-blocking channel
//! send, and the console path is plain formatted output.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use serde::Deserialize;

use tracelog::{Phase, Result, TraceLog, TraceLogConfig, TraceRecord};

use crate::console;

/// Configuration for a trace session
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TracerConfig {
    /// Print records to stdout instead of writing them to disk.
    pub console: bool,

    /// Logical worker id stamped on every record.
    pub tid: u32,

    /// Writer configuration; ignored when `console` is set.
    pub log: TraceLogConfig,
}

impl TracerConfig {
    /// Session that writes to the given rotating log.
    pub fn new(log: TraceLogConfig) -> Self {
        Self {
            console: false,
            tid: 0,
            log,
        }
    }

    /// Session that only prints to stdout.
    pub fn console_only() -> Self {
        Self {
            console: true,
            ..Self::default()
        }
    }

    /// Set the logical worker id.
    pub fn with_tid(mut self, tid: u32) -> Self {
        self.tid = tid;
        self
    }
}

enum Output {
    Log(TraceLog),
    Console,
}

/// Produces trace records from timed operations.
pub struct TraceSession {
    pid: u32,
    tid: u32,
    epoch: Instant,
    mark_seq: AtomicU64,
    output: Output,
}

impl TraceSession {
    /// Create a session.
    ///
    /// Spawns the writer task unless the console bypass is enabled, so a
    /// tokio runtime must be current for file-backed sessions. Fails only
    /// on configuration errors.
    pub fn new(config: TracerConfig) -> Result<Self> {
        let output = if config.console {
            Output::Console
        } else {
            Output::Log(TraceLog::spawn(config.log)?)
        };
        Ok(Self {
            pid: std::process::id(),
            tid: config.tid,
            epoch: Instant::now(),
            mark_seq: AtomicU64::new(0),
            output,
        })
    }

    /// Create a session over an already-running writer.
    pub fn with_log(log: TraceLog, tid: u32) -> Self {
        Self {
            pid: std::process::id(),
            tid,
            epoch: Instant::now(),
            mark_seq: AtomicU64::new(0),
            output: Output::Log(log),
        }
    }

    /// Milliseconds since session start, fractional.
    pub fn now_ms(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64() * 1000.0
    }

    /// Emit a begin record.
    pub fn begin(&self, name: &str) -> bool {
        self.emit(name.to_owned(), Phase::Begin)
    }

    /// Emit an end record.
    pub fn end(&self, name: &str) -> bool {
        self.emit(name.to_owned(), Phase::End)
    }

    /// Emit a single mark with a session-unique suffix.
    ///
    /// Returns the suffixed label (`"<name>-<seq>"`) so callers can
    /// correlate later events with it.
    pub fn mark(&self, name: &str) -> String {
        let seq = self.mark_seq.fetch_add(1, Ordering::Relaxed);
        let label = format!("{name}-{seq}");
        self.emit(label.clone(), Phase::Begin);
        label
    }

    /// Begin a timed region, ended explicitly or when the guard drops.
    pub fn span(&self, name: &str) -> SpanGuard<'_> {
        self.begin(name);
        SpanGuard {
            session: self,
            name: name.to_owned(),
            done: false,
        }
    }

    /// Run a closure inside a span. The explicit replacement for
    /// call-interception style auto-instrumentation.
    pub fn trace<F, T>(&self, name: &str, f: F) -> T
    where
        F: FnOnce() -> T,
    {
        let _span = self.span(name);
        f()
    }

    /// Finalize the backing writer, if any.
    pub async fn close(&self) -> Result<()> {
        match &self.output {
            Output::Log(log) => log.close().await,
            Output::Console => Ok(()),
        }
    }

    fn emit(&self, name: String, ph: Phase) -> bool {
        let record = TraceRecord::new(self.pid, self.tid, self.now_ms(), name, ph);
        match &self.output {
            Output::Log(log) => {
                let accepted = log.write_trace(record);
                if !accepted {
                    tracing::debug!("trace record dropped by writer");
                }
                accepted
            }
            Output::Console => {
                console::print_record(&record);
                true
            }
        }
    }
}

/// Ends its span when dropped.
pub struct SpanGuard<'a> {
    session: &'a TraceSession,
    name: String,
    done: bool,
}

impl SpanGuard<'_> {
    /// End the span now instead of at drop.
    pub fn end(mut self) {
        self.finish();
    }

    fn finish(&mut self) {
        if !self.done {
            self.done = true;
            self.session.end(&self.name);
        }
    }
}

impl Drop for SpanGuard<'_> {
    fn drop(&mut self) {
        self.finish();
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;
