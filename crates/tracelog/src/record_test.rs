//! Tests for trace records and format constants

use crate::record::{Phase, TraceRecord, FILE_FOOTER, FILE_HEADER, RECORD_DELIMITER};

#[test]
fn test_record_serializes_with_exact_key_order() {
    let record = TraceRecord::new(1234, 7, 3.5, "parse", Phase::Begin);
    let bytes = record.to_json().unwrap();
    assert_eq!(
        String::from_utf8(bytes).unwrap(),
        r#"{"pid":1234,"tid":7,"ts":3.5,"name":"parse","ph":"B"}"#
    );
}

#[test]
fn test_record_roundtrip() {
    let record = TraceRecord::new(42, 0, 100.125, "compile-3", Phase::End);
    let bytes = record.to_json().unwrap();
    let decoded: TraceRecord = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(decoded, record);
}

#[test]
fn test_phase_markers() {
    assert_eq!(Phase::Begin.as_char(), 'B');
    assert_eq!(Phase::End.as_char(), 'E');
    assert_eq!(Phase::Begin.to_string(), "B");
    assert_eq!(serde_json::to_string(&Phase::End).unwrap(), "\"E\"");
}

#[test]
fn test_format_literals() {
    assert_eq!(FILE_HEADER, b"{\"traceEvents\": [");
    assert_eq!(RECORD_DELIMITER, b",");
    assert_eq!(FILE_FOOTER, b"]}");

    // Header + one record + footer must be a valid document.
    let record = TraceRecord::new(1, 1, 0.0, "x", Phase::Begin);
    let mut doc = FILE_HEADER.to_vec();
    doc.extend_from_slice(&record.to_json().unwrap());
    doc.extend_from_slice(FILE_FOOTER);
    let parsed: serde_json::Value = serde_json::from_slice(&doc).unwrap();
    assert_eq!(parsed["traceEvents"].as_array().unwrap().len(), 1);
}
