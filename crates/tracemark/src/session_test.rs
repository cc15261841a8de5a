//! Tests for trace sessions

use tempfile::TempDir;

use tracelog::{read_trace_file, Phase, TraceLog, TraceLogConfig};

use crate::session::{TraceSession, TracerConfig};

fn file_session(dir: &TempDir) -> (TraceSession, std::path::PathBuf) {
    let path = dir.path().join("trace.json");
    let log = TraceLog::spawn(TraceLogConfig::new(&path)).unwrap();
    (TraceSession::with_log(log, 1), path)
}

#[tokio::test]
async fn test_begin_end_pair() {
    let dir = TempDir::new().unwrap();
    let (session, path) = file_session(&dir);

    assert!(session.begin("compile"));
    assert!(session.end("compile"));
    session.close().await.unwrap();

    let records = read_trace_file(&path).unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].ph, Phase::Begin);
    assert_eq!(records[1].ph, Phase::End);
    assert_eq!(records[0].name, "compile");
    assert_eq!(records[0].pid, std::process::id());
    assert_eq!(records[0].tid, 1);
    assert!(records[1].ts >= records[0].ts);
}

#[tokio::test]
async fn test_mark_suffixes_are_session_unique() {
    let dir = TempDir::new().unwrap();
    let (session, path) = file_session(&dir);

    assert_eq!(session.mark("load"), "load-0");
    assert_eq!(session.mark("load"), "load-1");
    assert_eq!(session.mark("store"), "store-2");
    session.close().await.unwrap();

    let names: Vec<_> = read_trace_file(&path)
        .unwrap()
        .into_iter()
        .map(|r| r.name)
        .collect();
    assert_eq!(names, ["load-0", "load-1", "store-2"]);
}

#[tokio::test]
async fn test_span_guard_ends_on_drop() {
    let dir = TempDir::new().unwrap();
    let (session, path) = file_session(&dir);

    {
        let _span = session.span("scoped");
    }
    session.close().await.unwrap();

    let records = read_trace_file(&path).unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].ph, Phase::Begin);
    assert_eq!(records[1].ph, Phase::End);
    assert_eq!(records[1].name, "scoped");
}

#[tokio::test]
async fn test_span_explicit_end_emits_once() {
    let dir = TempDir::new().unwrap();
    let (session, path) = file_session(&dir);

    let span = session.span("once");
    span.end();
    session.close().await.unwrap();

    let records = read_trace_file(&path).unwrap();
    assert_eq!(records.len(), 2);
}

#[tokio::test]
async fn test_trace_wraps_closure() {
    let dir = TempDir::new().unwrap();
    let (session, path) = file_session(&dir);

    let result = session.trace("add", || 2 + 2);
    assert_eq!(result, 4);
    session.close().await.unwrap();

    let records = read_trace_file(&path).unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].name, "add");
}

#[test]
fn test_console_session_needs_no_writer() {
    let session = TraceSession::new(TracerConfig::console_only()).unwrap();
    assert!(session.begin("console-op"));
    assert!(session.end("console-op"));
    assert_eq!(session.mark("m"), "m-0");
}

#[test]
fn test_now_ms_is_monotonic() {
    let session = TraceSession::new(TracerConfig::console_only()).unwrap();
    let a = session.now_ms();
    let b = session.now_ms();
    assert!(b >= a);
    assert!(a >= 0.0);
}

#[test]
fn test_config_deserialize() {
    let config: TracerConfig = serde_json::from_str(
        r#"{"console": false, "tid": 3, "log": {"filename": "t.json"}}"#,
    )
    .unwrap();
    assert_eq!(config.tid, 3);
    assert!(!config.console);
    assert_eq!(config.log.filename.to_str().unwrap(), "t.json");
}
