//! Console bypass
//!
//! Formats records as one human-readable line per event on stdout,
//! skipping the rotating writer entirely. Debug aid; not a durable sink
//! and not intended for high event rates.
//!
//! # Example output
//!
//! ```text
//!        0.112 B pid:4242 tid:0 load-config
//!        3.940 E pid:4242 tid:0 load-config
//! ```

use tracelog::TraceRecord;

pub(crate) fn print_record(record: &TraceRecord) {
    println!("{}", format_record(record));
}

pub(crate) fn format_record(record: &TraceRecord) -> String {
    format!(
        "{:>12.3} {} pid:{} tid:{} {}",
        record.ts, record.ph, record.pid, record.tid, record.name
    )
}

#[cfg(test)]
#[path = "console_test.rs"]
mod console_test;
