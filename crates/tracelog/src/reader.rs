//! Reading completed trace files
//!
//! Counterpart to the writer for tests and tooling: parses a finalized
//! `{"traceEvents": [...]}` document back into records. Only complete
//! files (ones that received their `]}` footer) parse; the active file is
//! by definition unterminated until it is closed or rotated.

use std::fs::File;
use std::io::{self, BufReader};
use std::path::Path;

use serde::Deserialize;

use crate::record::TraceRecord;

#[derive(Debug, Deserialize)]
struct TraceDocument {
    #[serde(rename = "traceEvents")]
    trace_events: Vec<TraceRecord>,
}

/// Read every record from a finalized trace file, in file order.
pub fn read_trace_file(path: impl AsRef<Path>) -> io::Result<Vec<TraceRecord>> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let document: TraceDocument = serde_json::from_reader(reader)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    Ok(document.trace_events)
}

#[cfg(test)]
#[path = "reader_test.rs"]
mod reader_test;
