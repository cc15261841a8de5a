//! Append-sink abstraction
//!
//! The writer consumes a sequential append-mode byte sink: open, write
//! with a backpressure signal, flush, close, plus an asynchronous error
//! channel that is polled between operations. A factory trait covers the
//! filesystem operations the writer needs around the sink itself (stat,
//! rename), so tests can inject failures without touching a real disk.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Default buffer size for file sinks (64 KB).
pub const DEFAULT_SINK_BUFFER_SIZE: usize = 64 * 1024;

/// A sequential append-mode byte sink.
pub trait AppendSink: Send {
    /// Append bytes.
    ///
    /// `Ok(false)` signals backpressure: the bytes were retained by the
    /// sink, but the producer should stop pushing more for now.
    fn write(&mut self, bytes: &[u8]) -> io::Result<bool>;

    /// Flush buffered data to the underlying file.
    fn flush(&mut self) -> io::Result<()>;

    /// Flush to EOF and close, awaiting OS-level confirmation.
    fn close(self: Box<Self>) -> io::Result<()>;

    /// Take an error reported outside the call stack of any operation.
    fn take_error(&mut self) -> Option<io::Error> {
        None
    }

    /// Bytes handed to this sink since it was opened.
    fn bytes_written(&self) -> u64;
}

/// Factory for append sinks plus the filesystem operations around them.
pub trait SinkFactory: Send + Sync {
    /// Open the path in append mode, creating it if absent.
    fn open(&self, path: &Path) -> io::Result<Box<dyn AppendSink>>;

    /// Size of an existing file, or `None` if it does not exist.
    fn len(&self, path: &Path) -> io::Result<Option<u64>>;

    /// Rename a file within the same directory.
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;
}

// ============================================================================
// Filesystem implementation
// ============================================================================

/// Factory producing buffered append sinks over real files.
#[derive(Debug, Clone)]
pub struct FsSinkFactory {
    buffer_size: usize,
}

impl FsSinkFactory {
    /// Create a factory with the default buffer size.
    pub fn new() -> Self {
        Self {
            buffer_size: DEFAULT_SINK_BUFFER_SIZE,
        }
    }

    /// Create a factory with a custom buffer size.
    pub fn with_buffer_size(buffer_size: usize) -> Self {
        Self { buffer_size }
    }
}

impl Default for FsSinkFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl SinkFactory for FsSinkFactory {
    fn open(&self, path: &Path) -> io::Result<Box<dyn AppendSink>> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Box::new(FsSink {
            writer: BufWriter::with_capacity(self.buffer_size, file),
            bytes_written: 0,
        }))
    }

    fn len(&self, path: &Path) -> io::Result<Option<u64>> {
        match fs::metadata(path) {
            Ok(meta) => Ok(Some(meta.len())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        fs::rename(from, to)
    }
}

struct FsSink {
    writer: BufWriter<File>,
    bytes_written: u64,
}

impl AppendSink for FsSink {
    fn write(&mut self, bytes: &[u8]) -> io::Result<bool> {
        self.writer.write_all(bytes)?;
        self.bytes_written += bytes.len() as u64;
        // BufWriter never pushes back; the buffer absorbs bursts.
        Ok(true)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }

    fn close(mut self: Box<Self>) -> io::Result<()> {
        self.writer.flush()?;
        let file = self.writer.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()
    }

    fn bytes_written(&self) -> u64 {
        self.bytes_written
    }
}

#[cfg(test)]
#[path = "sink_test.rs"]
mod sink_test;
