//! Trace records and on-disk format constants
//!
//! Records follow the Trace Event interchange format understood by
//! `chrome://tracing` and compatible viewers: a single JSON object with a
//! growing `traceEvents` array. The file is written incrementally, so the
//! array prefix, the per-record comma and the closing `]}` are emitted as
//! separate literals rather than by re-serializing the whole array.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Literal prefix written before the first record of a file.
pub const FILE_HEADER: &[u8] = b"{\"traceEvents\": [";

/// Delimiter written before every record after the first.
pub const RECORD_DELIMITER: &[u8] = b",";

/// Footer appended when a file is finalized.
pub const FILE_FOOTER: &[u8] = b"]}";

/// Single-character phase marker distinguishing begin and end events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    /// Start of a timed operation.
    #[serde(rename = "B")]
    Begin,

    /// End of a timed operation.
    #[serde(rename = "E")]
    End,
}

impl Phase {
    /// The one-character marker used on disk.
    pub fn as_char(self) -> char {
        match self {
            Phase::Begin => 'B',
            Phase::End => 'E',
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// A single timed-operation event.
///
/// Immutable once created; ownership transfers to the writer on
/// submission. Field order matters: serialization preserves declaration
/// order and the on-disk format expects `pid, tid, ts, name, ph`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceRecord {
    /// Originating process identifier.
    pub pid: u32,

    /// Thread / logical-worker identifier.
    pub tid: u32,

    /// Monotonic timestamp, fractional milliseconds since an arbitrary
    /// epoch (typically session start).
    pub ts: f64,

    /// Operation label, including any caller-supplied disambiguating
    /// suffix.
    pub name: String,

    /// Phase marker.
    pub ph: Phase,
}

impl TraceRecord {
    /// Create a new record.
    pub fn new(pid: u32, tid: u32, ts: f64, name: impl Into<String>, ph: Phase) -> Self {
        Self {
            pid,
            tid,
            ts,
            name: name.into(),
            ph,
        }
    }

    /// Serialize to the JSON bytes written to disk.
    pub fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}

#[cfg(test)]
#[path = "record_test.rs"]
mod record_test;
