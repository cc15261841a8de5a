//! In-memory sink factory with failure injection, for tests only.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::sink::{AppendSink, SinkFactory};

#[derive(Default)]
struct MemFsInner {
    files: Mutex<HashMap<PathBuf, Vec<u8>>>,
    /// Number of upcoming opens that fail.
    fail_opens: AtomicUsize,
    /// Number of upcoming renames that fail.
    fail_renames: AtomicUsize,
    /// Number of upcoming stats that fail.
    fail_stats: AtomicUsize,
    /// When false, writes return the backpressure signal.
    accept_writes: AtomicBool,
    /// Error delivered through `take_error` on the next poll.
    injected_error: Mutex<Option<io::Error>>,
}

/// Shared in-memory filesystem; clones see the same files.
#[derive(Clone, Default)]
pub(crate) struct MemFs(Arc<MemFsInner>);

impl MemFs {
    pub fn new() -> Self {
        let fs = Self::default();
        fs.0.accept_writes.store(true, Ordering::SeqCst);
        fs
    }

    pub fn fail_next_opens(&self, count: usize) {
        self.0.fail_opens.store(count, Ordering::SeqCst);
    }

    pub fn fail_next_renames(&self, count: usize) {
        self.0.fail_renames.store(count, Ordering::SeqCst);
    }

    pub fn fail_next_stats(&self, count: usize) {
        self.0.fail_stats.store(count, Ordering::SeqCst);
    }

    pub fn set_accept_writes(&self, accept: bool) {
        self.0.accept_writes.store(accept, Ordering::SeqCst);
    }

    pub fn inject_error(&self, error: io::Error) {
        *self.0.injected_error.lock().unwrap() = Some(error);
    }

    /// Pre-populate a file, as if a previous run left it behind.
    pub fn seed(&self, path: impl Into<PathBuf>, contents: &[u8]) {
        self.0
            .files
            .lock()
            .unwrap()
            .insert(path.into(), contents.to_vec());
    }

    pub fn contents(&self, path: impl AsRef<Path>) -> Option<Vec<u8>> {
        self.0.files.lock().unwrap().get(path.as_ref()).cloned()
    }

    pub fn string(&self, path: impl AsRef<Path>) -> Option<String> {
        self.contents(path)
            .map(|bytes| String::from_utf8(bytes).unwrap())
    }

    pub fn file_count(&self) -> usize {
        self.0.files.lock().unwrap().len()
    }

    fn take_fail(counter: &AtomicUsize) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

impl SinkFactory for MemFs {
    fn open(&self, path: &Path) -> io::Result<Box<dyn AppendSink>> {
        if Self::take_fail(&self.0.fail_opens) {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "open refused"));
        }
        self.0
            .files
            .lock()
            .unwrap()
            .entry(path.to_path_buf())
            .or_default();
        Ok(Box::new(MemSink {
            fs: self.clone(),
            path: path.to_path_buf(),
            bytes_written: 0,
        }))
    }

    fn len(&self, path: &Path) -> io::Result<Option<u64>> {
        if Self::take_fail(&self.0.fail_stats) {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "stat refused"));
        }
        Ok(self
            .0
            .files
            .lock()
            .unwrap()
            .get(path)
            .map(|bytes| bytes.len() as u64))
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        if Self::take_fail(&self.0.fail_renames) {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "rename refused"));
        }
        let mut files = self.0.files.lock().unwrap();
        let contents = files
            .remove(from)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no such file"))?;
        files.insert(to.to_path_buf(), contents);
        Ok(())
    }
}

struct MemSink {
    fs: MemFs,
    path: PathBuf,
    bytes_written: u64,
}

impl AppendSink for MemSink {
    fn write(&mut self, bytes: &[u8]) -> io::Result<bool> {
        let mut files = self.fs.0.files.lock().unwrap();
        files
            .get_mut(&self.path)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "file vanished"))?
            .extend_from_slice(bytes);
        self.bytes_written += bytes.len() as u64;
        Ok(self.fs.0.accept_writes.load(Ordering::SeqCst))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn close(self: Box<Self>) -> io::Result<()> {
        Ok(())
    }

    fn take_error(&mut self) -> Option<io::Error> {
        self.fs.0.injected_error.lock().unwrap().take()
    }

    fn bytes_written(&self) -> u64 {
        self.bytes_written
    }
}
