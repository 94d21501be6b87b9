//! Integration tests for runlog.

use runlog::{configure_logger, Exclude, Image, Level, RunlogError, Tensor, Value};
use tempfile::TempDir;

#[test]
fn test_configure_creates_dir_and_run_info() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path().join("exp").join("run0");
    let mut logger = configure_logger(&dir, &["log", "json", "csv"]).unwrap();
    assert!(dir.is_dir(), "output directory should be created");
    assert!(dir.join("run.yaml").exists(), "run.yaml should exist");
    assert_eq!(logger.dir(), Some(dir.as_path()));

    let info: runlog::RunInfo =
        serde_yaml::from_str(&std::fs::read_to_string(dir.join("run.yaml")).unwrap()).unwrap();
    assert_eq!(info.formats, vec!["log", "json", "csv"]);
    logger.close().unwrap();
}

#[test]
fn test_unknown_backend_aborts_configuration() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path().join("run");
    let err = configure_logger(&dir, &["log", "nonexistent"]).unwrap_err();
    assert!(matches!(err, RunlogError::UnknownFormat(name) if name == "nonexistent"));
    // Directory creation is the only side effect of the failed attempt.
    assert!(dir.is_dir());
    assert!(!dir.join("run.yaml").exists());
}

#[test]
fn test_log_file_table_grouping_and_float_format() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path().join("run");
    let mut logger = configure_logger(&dir, &["log"]).unwrap();
    logger.record("a/b", 1.0, None);
    logger.dump(0).unwrap();
    logger.close().unwrap();

    let content = std::fs::read_to_string(dir.join("log.txt")).unwrap();
    assert!(content.contains("Logging to"), "banner missing in:\n{content}");
    assert!(content.contains("| a/"), "tag header missing in:\n{content}");
    assert!(
        content.contains("|    b | 1        |"),
        "expected 8-char left-aligned value row in:\n{content}"
    );
}

#[test]
fn test_excluded_key_absent_from_named_backend_only() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path().join("run");
    let mut logger = configure_logger(&dir, &["log", "json"]).unwrap();
    logger.record("train/loss", 0.5, None);
    logger.record("train/secret", 0.9, Some(Exclude::from("json")));
    logger.dump(1).unwrap();
    logger.close().unwrap();

    let table = std::fs::read_to_string(dir.join("log.txt")).unwrap();
    assert!(table.contains("secret"));

    let line = std::fs::read_to_string(dir.join("progress.json")).unwrap();
    let record: serde_json::Value = serde_json::from_str(line.trim()).unwrap();
    assert_eq!(record["values"]["train/loss"], 0.5);
    assert!(record["values"].get("train/secret").is_none());
}

#[test]
fn test_csv_rows_accumulate_across_dumps() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path().join("run");
    let mut logger = configure_logger(&dir, &["csv"]).unwrap();
    logger.record("loss", 0.5, None);
    logger.dump(0).unwrap();
    logger.record("loss", 0.25, None);
    logger.record("acc", 0.75, None);
    logger.dump(1).unwrap();
    logger.close().unwrap();

    let content = std::fs::read_to_string(dir.join("progress.csv")).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines, vec!["step,loss,acc", "0,0.5,", "1,0.25,0.75"]);
}

#[test]
fn test_backend_failure_surfaces_but_next_step_is_clean() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path().join("run");
    let mut logger = configure_logger(&dir, &["json"]).unwrap();

    logger.record("img", Image::from_path("img.png", "HWC"), None);
    let err = logger.dump(0).unwrap_err();
    assert!(matches!(err, RunlogError::UnsupportedValue { value_kind: "image", .. }));

    // The failed cycle was cleared; the next dump carries only fresh keys.
    logger.record("loss", 1.0, None);
    logger.dump(1).unwrap();
    logger.close().unwrap();

    let content = std::fs::read_to_string(dir.join("progress.json")).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 1);
    let record: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
    assert_eq!(record["step"], 1);
    assert!(record["values"].get("img").is_none());
}

#[test]
fn test_second_dump_without_records_writes_nothing() {
    // The empty dump is surfaced through tracing as a warning, not an error.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new("warn"))
        .try_init();
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path().join("run");
    let mut logger = configure_logger(&dir, &["json"]).unwrap();
    logger.record("x", 1, None);
    logger.dump(0).unwrap();
    logger.dump(1).unwrap();
    logger.close().unwrap();

    let content = std::fs::read_to_string(dir.join("progress.json")).unwrap();
    assert_eq!(content.lines().count(), 1);
}

#[test]
fn test_leveled_logging_respects_threshold() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path().join("run");
    let mut logger = configure_logger(&dir, &["log"]).unwrap();
    logger.set_level(Level::Warn);
    logger.debug(&[&"not this"]).unwrap();
    logger.info(&[&"nor this"]).unwrap();
    logger.warn(&[&"but this", &1]).unwrap();
    logger.close().unwrap();

    let content = std::fs::read_to_string(dir.join("log.txt")).unwrap();
    assert!(!content.contains("not this"));
    assert!(!content.contains("nor this"));
    assert!(content.contains("but this 1"));
}

#[test]
fn test_tracker_requires_active_session() {
    // Both halves live in one test: the env var is process-global.
    std::env::remove_var(runlog::formats::SESSION_ENV);
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path().join("run");
    let err = configure_logger(&dir, &["tracker"]).unwrap_err();
    assert!(matches!(err, RunlogError::SessionNotActive(_)));

    let session = tmp.path().join("session");
    std::fs::create_dir_all(&session).unwrap();
    std::env::set_var(runlog::formats::SESSION_ENV, &session);
    let mut logger = configure_logger(&dir, &["tracker"]).unwrap();
    logger.record("loss", 0.125, None);
    logger.record_mean("reward", Some(2.0), None);
    logger.record_mean("reward", Some(4.0), None);
    logger.dump(3).unwrap();
    logger.close().unwrap();
    std::env::remove_var(runlog::formats::SESSION_ENV);

    let content = std::fs::read_to_string(session.join("events.jsonl")).unwrap();
    let record: serde_json::Value = serde_json::from_str(content.trim()).unwrap();
    assert_eq!(record["step"], 3);
    assert_eq!(record["values"]["loss"], 0.125);
    assert_eq!(record["values"]["reward"], 3.0);
}

#[test]
fn test_record_mean_then_dump_round_trip() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path().join("run");
    let mut logger = configure_logger(&dir, &["json"]).unwrap();
    for v in [1.0, 2.0, 3.0, 4.0] {
        logger.record_mean("rollout/ep_len_mean", Some(v), None);
    }
    logger.record_mean("rollout/success_rate", None, None);
    logger.dump(10).unwrap();
    logger.close().unwrap();

    let content = std::fs::read_to_string(dir.join("progress.json")).unwrap();
    let record: serde_json::Value = serde_json::from_str(content.trim()).unwrap();
    assert_eq!(record["values"]["rollout/ep_len_mean"], 2.5);
    assert!(record["values"]["rollout/success_rate"].is_null());
}

#[cfg(feature = "tensorboard")]
#[test]
fn test_tensorboard_event_files_written() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path().join("run");
    let mut logger = configure_logger(&dir, &["tensorboard"]).unwrap();
    logger.record("train/loss", 0.5, None);
    logger.record("train/noise", Tensor::from_vec((0..64).map(f64::from).collect()), None);
    logger.dump(0).unwrap();
    logger.close().unwrap();

    let has_event_file = std::fs::read_dir(&dir)
        .unwrap()
        .filter_map(|entry| entry.ok())
        .any(|entry| entry.file_name().to_string_lossy().contains("tfevents"));
    assert!(has_event_file, "no event file written under {}", dir.display());
}

#[test]
fn test_record_accepts_heterogeneous_values() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path().join("run");
    let mut logger = configure_logger(&dir, &["log"]).unwrap();
    logger.record("status", "warming up", None);
    logger.record("epoch", 3usize, None);
    logger.record("train/grads", Tensor::from_vec(vec![0.5, 1.5]), None);
    logger.dump(0).unwrap();
    logger.close().unwrap();

    let content = std::fs::read_to_string(dir.join("log.txt")).unwrap();
    assert!(content.contains("warming up"));
    assert!(content.contains("| epoch"));
    assert!(content.contains("tensor([0.5, 1.5]"));
}

#[test]
fn test_value_conversions() {
    assert!(matches!(Value::from(1.5f32), Value::Float(_)));
    assert!(matches!(Value::from(1i32), Value::Int(1)));
    assert!(matches!(Value::from("s".to_string()), Value::Str(_)));
}
