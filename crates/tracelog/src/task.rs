//! Writer task and handle
//!
//! The rotating writer is owned by exactly one tokio task; callers hold a
//! cheap cloneable [`TraceLog`] handle backed by an mpsc channel. The hot
//! path (`write_trace`) is a non-blocking `try_send`, so instrumented code
//! never waits on file I/O, while the task serializes every state
//! mutation: commands, the open-retry timer and the flush ticker are
//! multiplexed with `select!` and each runs to completion before the next.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, MissedTickBehavior};

use crate::config::TraceLogConfig;
use crate::error::{Result, TraceLogError};
use crate::record::TraceRecord;
use crate::sink::{FsSinkFactory, SinkFactory};
use crate::writer::RotatingTraceWriter;

enum Command {
    Write(TraceRecord),
    Rotate,
    Close(oneshot::Sender<Result<()>>),
}

/// Handle to a spawned trace log writer task.
///
/// Clones share the same underlying writer. Dropping the last handle
/// closes the channel; the task then finalizes the active file and exits.
#[derive(Clone)]
pub struct TraceLog {
    sender: mpsc::Sender<Command>,
    metrics: Arc<TraceLogMetrics>,
}

impl TraceLog {
    /// Spawn a writer task over the real filesystem.
    ///
    /// Fails only on configuration errors; I/O trouble is absorbed into
    /// the writer's retry cycle. Must be called from a tokio runtime.
    pub fn spawn(config: TraceLogConfig) -> Result<Self> {
        Self::spawn_with_factory(config, Arc::new(FsSinkFactory::new()))
    }

    /// Spawn a writer task with a custom sink factory.
    pub fn spawn_with_factory(
        config: TraceLogConfig,
        factory: Arc<dyn SinkFactory>,
    ) -> Result<Self> {
        let writer = RotatingTraceWriter::with_factory(&config, factory)?;
        let (sender, receiver) = mpsc::channel(config.channel_capacity);
        let metrics = Arc::new(TraceLogMetrics::new());

        let task = TraceLogTask {
            writer,
            receiver,
            flush_interval: config.flush_interval(),
            metrics: Arc::clone(&metrics),
        };
        tokio::spawn(task.run());

        Ok(Self { sender, metrics })
    }

    /// Submit a record. Non-blocking.
    ///
    /// Returns `false` when the command queue is full or the task is gone;
    /// the record was dropped and the caller may re-buffer it itself.
    pub fn write_trace(&self, record: TraceRecord) -> bool {
        match self.sender.try_send(Command::Write(record)) {
            Ok(()) => true,
            Err(_) => {
                self.metrics.records_dropped.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    /// Request a rotation regardless of the size threshold.
    pub async fn rotate(&self) -> Result<()> {
        self.sender
            .send(Command::Rotate)
            .await
            .map_err(|_| TraceLogError::ChannelClosed)
    }

    /// Finalize the active file and stop the writer task.
    ///
    /// All records submitted before this call are processed first (the
    /// command channel is FIFO). Close-time I/O failures propagate.
    pub async fn close(&self) -> Result<()> {
        let (reply, confirmed) = oneshot::channel();
        self.sender
            .send(Command::Close(reply))
            .await
            .map_err(|_| TraceLogError::ChannelClosed)?;
        confirmed.await.map_err(|_| TraceLogError::ChannelClosed)?
    }

    /// Point-in-time metrics snapshot.
    pub fn metrics(&self) -> TraceLogMetricsSnapshot {
        self.metrics.snapshot()
    }
}

// ============================================================================
// Metrics
// ============================================================================

/// Counters for a trace log writer
#[derive(Debug, Default)]
pub struct TraceLogMetrics {
    /// Records the writer accepted (written or buffered).
    pub records_accepted: AtomicU64,

    /// Records the writer rejected (closed or closing).
    pub records_rejected: AtomicU64,

    /// Records dropped before reaching the writer (queue full / task gone).
    pub records_dropped: AtomicU64,

    /// Completed rotations.
    pub rotations: AtomicU64,

    /// I/O errors absorbed by the writer's recovery path.
    pub write_errors: AtomicU64,

    /// Open retries that fired.
    pub retries: AtomicU64,
}

impl TraceLogMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get snapshot of all counters.
    pub fn snapshot(&self) -> TraceLogMetricsSnapshot {
        TraceLogMetricsSnapshot {
            records_accepted: self.records_accepted.load(Ordering::Relaxed),
            records_rejected: self.records_rejected.load(Ordering::Relaxed),
            records_dropped: self.records_dropped.load(Ordering::Relaxed),
            rotations: self.rotations.load(Ordering::Relaxed),
            write_errors: self.write_errors.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time snapshot of [`TraceLogMetrics`]
#[derive(Debug, Clone, Copy, Default)]
pub struct TraceLogMetricsSnapshot {
    pub records_accepted: u64,
    pub records_rejected: u64,
    pub records_dropped: u64,
    pub rotations: u64,
    pub write_errors: u64,
    pub retries: u64,
}

// ============================================================================
// Task
// ============================================================================

struct TraceLogTask {
    writer: RotatingTraceWriter,
    receiver: mpsc::Receiver<Command>,
    flush_interval: Duration,
    metrics: Arc<TraceLogMetrics>,
}

impl TraceLogTask {
    async fn run(mut self) {
        // A surfaced error here still leaves the retry timer armed.
        if let Err(error) = self.writer.open() {
            tracing::error!(%error, "initial trace file open failed");
        }

        let mut flush_ticker = tokio::time::interval(self.flush_interval);
        flush_ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            self.publish_write_errors();
            let retry_at = self.writer.retry_deadline();
            tokio::select! {
                command = self.receiver.recv() => {
                    match command {
                        Some(Command::Write(record)) => {
                            if self.writer.write_trace(record) {
                                self.metrics.records_accepted.fetch_add(1, Ordering::Relaxed);
                            } else {
                                self.metrics.records_rejected.fetch_add(1, Ordering::Relaxed);
                            }
                            self.rotate_if_requested();
                        }
                        Some(Command::Rotate) => {
                            self.rotate_now();
                        }
                        Some(Command::Close(reply)) => {
                            let result = self.writer.close();
                            let _ = reply.send(result);
                            break;
                        }
                        None => {
                            // Last handle dropped: finalize and exit.
                            if let Err(error) = self.writer.close() {
                                tracing::error!(%error, "trace file close on shutdown failed");
                            }
                            break;
                        }
                    }
                }
                _ = sleep_until_deadline(retry_at), if retry_at.is_some() => {
                    self.metrics.retries.fetch_add(1, Ordering::Relaxed);
                    if let Err(error) = self.writer.retry_open() {
                        tracing::error!(%error, "trace file reopen failed");
                    }
                    // The reopen drain may have crossed the threshold.
                    self.rotate_if_requested();
                }
                _ = flush_ticker.tick() => {
                    self.writer.maintain();
                    // Same for a drain resumed after backpressure.
                    self.rotate_if_requested();
                }
            }
        }

        self.publish_write_errors();
        tracing::debug!("trace log task finished");
    }

    fn rotate_if_requested(&mut self) {
        if self.writer.rotation_requested() {
            self.rotate_now();
        }
    }

    fn rotate_now(&mut self) {
        // The drain after reopening can itself cross the threshold, so
        // keep rotating until the request clears.
        loop {
            let before = self.writer.sequence_id();
            if let Err(error) = self.writer.rotate() {
                tracing::error!(%error, "trace file rotation failed");
            }
            if self.writer.sequence_id() > before {
                self.metrics.rotations.fetch_add(1, Ordering::Relaxed);
            }
            if !self.writer.rotation_requested() {
                break;
            }
        }
    }

    fn publish_write_errors(&self) {
        self.metrics
            .write_errors
            .store(self.writer.write_errors(), Ordering::Relaxed);
    }
}

async fn sleep_until_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
#[path = "task_test.rs"]
mod task_test;
