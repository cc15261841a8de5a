//! Tests for console formatting

use tracelog::{Phase, TraceRecord};

use crate::console::format_record;

#[test]
fn test_format_line_shape() {
    let record = TraceRecord::new(4242, 0, 0.112, "load-config", Phase::Begin);
    assert_eq!(format_record(&record), "       0.112 B pid:4242 tid:0 load-config");
}

#[test]
fn test_format_end_phase() {
    let record = TraceRecord::new(7, 3, 1234.5, "flush", Phase::End);
    let line = format_record(&record);
    assert!(line.contains(" E pid:7 tid:3 flush"));
    assert!(line.trim_start().starts_with("1234.500"));
}
