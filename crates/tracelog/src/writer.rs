//! Rotating trace-log writer
//!
//! Owns one logical "current file" at a time and appends trace records in
//! the streaming `{"traceEvents": [...]}` format. Once the file grows past
//! the configured threshold it is closed, renamed with a sequence suffix,
//! and a fresh active file is opened. Records that arrive while no file is
//! writable (before the first open succeeds, or during a rotation) are
//! buffered FIFO and drained once the sink comes back, so accepted records
//! always reach disk in submission order.
//!
//! # States
//!
//! ```text
//! Closed --open()--> Active --close()--> Closing --> Closed
//!    \--open() fails--> Opening --retry--> Active
//! ```
//!
//! `rotating` is an orthogonal overlay entered only from `Active`; it
//! routes writes into the pending queue while the close/rename/reopen
//! cycle runs and always returns to `Active` through `open()`.
//!
//! # Failure handling
//!
//! A failed open is never surfaced: the writer schedules a single retry
//! after a fixed delay and keeps buffering. An asynchronous sink error
//! force-closes the sink and takes the same retry path; writes submitted
//! in that window are rejected. A failed rotation rename keeps `rotating`
//! set (the already-footered file is never appended to again) and retries
//! the rename before reopening. Only close-time failures propagate.
//!
//! The writer is not a synchronization point: all methods take `&mut
//! self` and are expected to run on a single owning task (see
//! [`crate::task`]).

use std::collections::VecDeque;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use crate::config::TraceLogConfig;
use crate::error::{Result, TraceLogError};
use crate::record::{TraceRecord, FILE_FOOTER, FILE_HEADER, RECORD_DELIMITER};
use crate::sink::{AppendSink, FsSinkFactory, SinkFactory};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Initial and terminal: no sink, writes rejected.
    Closed,
    /// An open was requested but the sink is not available yet; writes
    /// are buffered until the retry succeeds.
    Opening,
    /// Sink open, direct writes flow.
    Active,
    /// An in-flight close.
    Closing,
}

/// Outcome of a direct write, used to steer the pending-queue drain.
enum WriteStatus {
    Accepted,
    /// The sink kept the bytes but signalled backpressure.
    Saturated,
    Failed,
}

/// The rotating writer state machine.
///
/// See the module docs for the state/failure model. For the task-owned
/// wrapper most callers want, see [`crate::task::TraceLog`].
pub struct RotatingTraceWriter {
    path: PathBuf,
    max_file_size: u64,
    retry_delay: Duration,
    factory: Arc<dyn SinkFactory>,

    sink: Option<Box<dyn AppendSink>>,
    state: State,
    rotating: bool,

    /// Records awaiting a writable sink, strict FIFO.
    pending: VecDeque<TraceRecord>,

    /// Destination of a rotation rename that failed and will be retried.
    pending_rename: Option<PathBuf>,

    /// Completed rotations; embedded in rotated file names.
    sequence_id: u64,

    /// Bytes of record payload accounted to the active file. Seeded from
    /// the on-disk size on (re)open so an existing file resumes where it
    /// left off.
    current_size: u64,

    /// Controls the JSON delimiter: array prefix vs comma.
    first_entry_written: bool,

    /// Deadline of the scheduled retry, if one is pending.
    retry_at: Option<Instant>,

    /// I/O errors absorbed by the recovery path.
    write_errors: u64,
}

impl RotatingTraceWriter {
    /// Create a writer over the real filesystem.
    pub fn new(config: &TraceLogConfig) -> Result<Self> {
        Self::with_factory(config, Arc::new(FsSinkFactory::new()))
    }

    /// Create a writer with a custom sink factory.
    pub fn with_factory(config: &TraceLogConfig, factory: Arc<dyn SinkFactory>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            path: config.filename.clone(),
            max_file_size: config.max_file_size,
            retry_delay: config.retry_delay(),
            factory,
            sink: None,
            state: State::Closed,
            rotating: false,
            pending: VecDeque::new(),
            pending_rename: None,
            sequence_id: 0,
            current_size: 0,
            first_entry_written: false,
            retry_at: None,
            write_errors: 0,
        })
    }

    /// Open the active file in append mode.
    ///
    /// Seeds `current_size` from the existing file (absent file counts as
    /// empty; any other stat failure propagates, with a retry scheduled so
    /// the writer recovers if the failure was transient). A failed open is
    /// not raised: a retry is scheduled and submitted records keep buffering.
    /// On success the pending queue is drained FIFO; the drain stops early
    /// on backpressure or when a rotation begins mid-drain.
    pub fn open(&mut self) -> Result<()> {
        if self.sink.is_some() {
            return Ok(());
        }

        let seeded = match self.factory.len(&self.path) {
            Ok(size) => size.unwrap_or(0),
            Err(source) => {
                // Surfaced to the caller, but the retry is still armed so
                // a transient stat failure heals on the timer.
                self.state = State::Opening;
                self.schedule_retry();
                return Err(TraceLogError::Stat {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        match self.factory.open(&self.path) {
            Ok(sink) => {
                self.sink = Some(sink);
                self.state = State::Active;
                self.current_size = seeded;
                self.first_entry_written = seeded > 0;
                tracing::debug!(
                    path = %self.path.display(),
                    size = seeded,
                    sequence_id = self.sequence_id,
                    "trace file opened"
                );
                self.drain_pending();
                Ok(())
            }
            Err(error) => {
                tracing::warn!(
                    path = %self.path.display(),
                    %error,
                    "trace file open failed, scheduling retry"
                );
                self.state = State::Opening;
                self.schedule_retry();
                Ok(())
            }
        }
    }

    /// Submit a record.
    ///
    /// Never suspends. Returns `false` when the writer is closed or
    /// closing and the record was dropped. While rotating or waiting for
    /// an open to succeed, records are buffered and `true` is returned.
    pub fn write_trace(&mut self, record: TraceRecord) -> bool {
        if self.rotating {
            self.pending.push_back(record);
            return true;
        }
        match self.state {
            State::Opening => {
                self.pending.push_back(record);
                true
            }
            State::Active => {
                if self.pending.is_empty() {
                    self.write_record(record);
                } else {
                    // A saturated drain left records parked; keep FIFO.
                    self.pending.push_back(record);
                }
                true
            }
            State::Closed | State::Closing => false,
        }
    }

    /// Rotate the active file: close it (footer included), rename it with
    /// the current sequence id, and reopen a fresh active file, draining
    /// whatever buffered in the meantime.
    ///
    /// No-op unless the writer is active. A size-triggered request and an
    /// explicit call collapse into a single rotation.
    pub fn rotate(&mut self) -> Result<()> {
        if self.state != State::Active {
            return Ok(());
        }
        self.rotating = true;

        if let Err(error) = self.close_current() {
            // The footer may or may not have made it out; resume appending
            // to the same file after the delay rather than renaming a file
            // in an unknown state.
            tracing::error!(%error, "close during rotation failed, will reopen after delay");
            self.rotating = false;
            self.schedule_retry();
            return Ok(());
        }

        let rotated = rotated_path(&self.path, self.sequence_id);
        if let Err(error) = self.factory.rename(&self.path, &rotated) {
            tracing::warn!(
                from = %self.path.display(),
                to = %rotated.display(),
                %error,
                "rotation rename failed, will retry"
            );
            self.pending_rename = Some(rotated);
            self.schedule_retry();
            return Ok(());
        }

        self.finish_rotation(&rotated)
    }

    fn finish_rotation(&mut self, rotated: &Path) -> Result<()> {
        self.sequence_id += 1;
        self.rotating = false;
        tracing::info!(
            rotated = %rotated.display(),
            sequence_id = self.sequence_id,
            "trace file rotated"
        );
        self.open()
    }

    /// Close the active file, writing the `]}` footer and flushing to EOF.
    ///
    /// Buffered records are written out first: accepted records must reach
    /// the output, so the size threshold and backpressure are ignored for
    /// a file being finalized. Failures propagate, but the sink and flags
    /// are reset either way so a subsequent `open()` starts from a
    /// consistent state. Closing a file that never received an entry
    /// writes the complete empty document so the output is valid JSON.
    pub fn close(&mut self) -> Result<()> {
        if self.sink.is_some() {
            self.drain_for_close();
        }
        self.close_current()
    }

    /// Footer-and-close without touching the pending queue. The rotation
    /// path uses this directly: records buffered during a rotation belong
    /// to the next file, not the one being finalized.
    fn close_current(&mut self) -> Result<()> {
        let Some(sink) = self.sink.take() else {
            return Ok(());
        };
        self.state = State::Closing;
        let result = Self::finalize(sink, self.first_entry_written);
        // Cleanup runs regardless of the outcome above.
        self.state = State::Closed;
        result.map_err(TraceLogError::Close)
    }

    fn finalize(mut sink: Box<dyn AppendSink>, first_entry_written: bool) -> io::Result<()> {
        if !first_entry_written {
            sink.write(FILE_HEADER)?;
        }
        sink.write(FILE_FOOTER)?;
        sink.flush()?;
        sink.close()
    }

    /// React to an error the sink reported outside any writer operation.
    ///
    /// Force-closes the sink (secondary close errors are swallowed), marks
    /// the writer closed and schedules a retry through the same path as a
    /// failed open. Bookkeeping already applied to in-flight records is
    /// not rolled back.
    pub fn handle_error(&mut self, error: io::Error) {
        tracing::error!(path = %self.path.display(), %error, "trace sink failed");
        self.write_errors += 1;
        if let Some(sink) = self.sink.take() {
            if let Err(close_error) = sink.close() {
                tracing::debug!(%close_error, "sink close after failure also failed");
            }
        }
        self.state = State::Closed;
        self.schedule_retry();
    }

    /// Periodic housekeeping: poll the sink for asynchronous errors, flush
    /// buffered bytes, and resume a drain parked by backpressure.
    pub fn maintain(&mut self) {
        let polled = self.sink.as_mut().and_then(|sink| sink.take_error());
        if let Some(error) = polled {
            self.handle_error(error);
            return;
        }
        if let Some(Err(error)) = self.sink.as_mut().map(|sink| sink.flush()) {
            self.handle_error(error);
            return;
        }
        if self.state == State::Active && !self.rotating && !self.pending.is_empty() {
            self.drain_pending();
        }
    }

    /// Run the scheduled retry: finish a stalled rotation rename first,
    /// then reopen. Clears the pending-retry marker when it fires.
    pub fn retry_open(&mut self) -> Result<()> {
        self.retry_at = None;

        if let Some(rotated) = self.pending_rename.clone() {
            match self.factory.rename(&self.path, &rotated) {
                Ok(()) => {
                    self.pending_rename = None;
                    return self.finish_rotation(&rotated);
                }
                Err(error) => {
                    tracing::warn!(
                        to = %rotated.display(),
                        %error,
                        "rotation rename still failing"
                    );
                    self.schedule_retry();
                    return Ok(());
                }
            }
        }

        self.open()
    }

    /// Deadline of the scheduled retry, if any. The owning task sleeps
    /// until this and then calls [`Self::retry_open`].
    pub fn retry_deadline(&self) -> Option<Instant> {
        self.retry_at
    }

    /// Whether a size-triggered rotation is waiting to be performed.
    pub fn rotation_requested(&self) -> bool {
        self.rotating && self.state == State::Active
    }

    /// Whether direct writes currently flow.
    pub fn is_active(&self) -> bool {
        self.state == State::Active
    }

    /// Whether the rotation overlay is engaged.
    pub fn is_rotating(&self) -> bool {
        self.rotating
    }

    /// Completed rotations so far.
    pub fn sequence_id(&self) -> u64 {
        self.sequence_id
    }

    /// Record bytes accounted to the active file.
    pub fn current_size(&self) -> u64 {
        self.current_size
    }

    /// Records buffered awaiting a writable sink.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// I/O errors absorbed by the recovery path so far.
    pub fn write_errors(&self) -> u64 {
        self.write_errors
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    /// Idempotent: a retry already on the clock is left alone.
    fn schedule_retry(&mut self) {
        if self.retry_at.is_none() {
            self.retry_at = Some(Instant::now() + self.retry_delay);
        }
    }

    /// Unconditional drain for [`Self::close`]: a mid-drain threshold
    /// crossing or a backpressure signal must not strand records when the
    /// file is about to be finalized.
    fn drain_for_close(&mut self) {
        while let Some(record) = self.pending.pop_front() {
            if self.sink.is_none() {
                self.pending.push_front(record);
                break;
            }
            if matches!(self.write_record(record), WriteStatus::Failed) {
                break;
            }
        }
        self.rotating = false;
    }

    fn drain_pending(&mut self) {
        while !self.rotating {
            let Some(record) = self.pending.pop_front() else {
                break;
            };
            match self.write_record(record) {
                WriteStatus::Accepted => {}
                WriteStatus::Saturated | WriteStatus::Failed => break,
            }
        }
    }

    fn write_record(&mut self, record: TraceRecord) -> WriteStatus {
        let payload = match record.to_json() {
            Ok(payload) => payload,
            Err(error) => {
                tracing::error!(%error, name = %record.name, "trace record failed to serialize");
                return WriteStatus::Accepted;
            }
        };

        let delimiter: &[u8] = if self.first_entry_written {
            RECORD_DELIMITER
        } else {
            FILE_HEADER
        };

        let outcome = {
            let Some(sink) = self.sink.as_mut() else {
                // Keep the record at the head so a later drain preserves order.
                self.pending.push_front(record);
                return WriteStatus::Saturated;
            };
            sink.write(delimiter)
                .and_then(|_| sink.write(&payload))
        };

        match outcome {
            Ok(accepted) => {
                self.first_entry_written = true;
                self.current_size += payload.len() as u64;
                if self.current_size >= self.max_file_size {
                    // Engage buffering right away; the owning task performs
                    // the close/rename/reopen via `rotate`.
                    self.rotating = true;
                }
                if accepted {
                    WriteStatus::Accepted
                } else {
                    WriteStatus::Saturated
                }
            }
            Err(error) => {
                self.handle_error(error);
                WriteStatus::Failed
            }
        }
    }
}

/// Compute the rotated name: the sequence id goes before the extension,
/// so `trace.json` becomes `trace.0.json` and a bare `trace` becomes
/// `trace.0`.
pub(crate) fn rotated_path(path: &Path, sequence_id: u64) -> PathBuf {
    let mut name = path
        .file_stem()
        .map(|stem| stem.to_os_string())
        .unwrap_or_default();
    name.push(format!(".{sequence_id}"));
    if let Some(ext) = path.extension() {
        name.push(".");
        name.push(ext);
    }
    path.with_file_name(name)
}

#[cfg(test)]
#[path = "writer_test.rs"]
mod writer_test;
