//! Integration test: structured logging contract.
//!
//! Validates that:
//! 1. LogEmitter writes valid JSONL to files.
//! 2. validate_log_file counts lines and reports every bad line.
//! 3. ArtifactIndex hashes files and detects tampering.
//! 4. A replay log on disk passes validation end to end.
//!
//! Run: cargo test -p adaptdiff-harness --test structured_log_test

use std::path::PathBuf;

use adaptdiff_harness::scenario::{Scenario, ScenarioRunner};
use adaptdiff_harness::structured_log::{
    ArtifactIndex, LogEmitter, LogEntry, LogLevel, Outcome, sha256_hex, validate_log_file,
};

fn temp_dir(prefix: &str) -> PathBuf {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    let dir = std::env::temp_dir().join(format!("{prefix}-{}-{nanos}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn emitter_writes_valid_jsonl() {
    let dir = temp_dir("adaptdiff_log_test");
    let log_path = dir.join("run.jsonl");

    {
        let mut emitter = LogEmitter::to_file(&log_path, "sim", "run-1").unwrap();
        emitter.emit(LogLevel::Info, "run_start").unwrap();
        let entry = emitter
            .entry(LogLevel::Debug, "axis_step")
            .with_mode("adaptive")
            .with_axis("max_health")
            .with_step(1)
            .with_sim_time(10.0)
            .with_outcome(Outcome::Changed)
            .with_details(serde_json::json!({ "multiplier": 1.05 }));
        emitter.emit_entry(entry).unwrap();
        emitter
            .emit_entry(LogEntry::new("", LogLevel::Info, "run_end").with_outcome(Outcome::Pass))
            .unwrap();
        assert_eq!(emitter.emitted(), 3);
        emitter.flush().unwrap();
    }

    let (lines, errors) = validate_log_file(&log_path).unwrap();
    assert_eq!(lines, 3);
    assert!(errors.is_empty(), "{errors:?}");

    let content = std::fs::read_to_string(&log_path).unwrap();
    let last: serde_json::Value = serde_json::from_str(content.lines().last().unwrap()).unwrap();
    assert_eq!(last["trace_id"], "sim::run-1::0003");
    assert_eq!(last["run_id"], "run-1");

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn file_validation_reports_line_numbers() {
    let dir = temp_dir("adaptdiff_log_validate");
    let log_path = dir.join("mixed.jsonl");
    let good = LogEntry::new("a::b::0001", LogLevel::Info, "run_start")
        .to_jsonl()
        .unwrap();
    let bad_mode = r#"{"timestamp":"t","trace_id":"a::b::0002","level":"info","event":"x","mode":"hardened"}"#;
    let orphan_axis = r#"{"timestamp":"t","trace_id":"a::b::0003","level":"info","event":"x","axis":"max_health"}"#;
    std::fs::write(
        &log_path,
        format!("{good}\n\n{bad_mode}\n{orphan_axis}\nnot json\n"),
    )
    .unwrap();

    let (lines, errors) = validate_log_file(&log_path).unwrap();
    assert_eq!(lines, 4);
    let lines_with_errors: Vec<usize> = errors.iter().map(|e| e.line_number).collect();
    assert_eq!(lines_with_errors, vec![3, 4, 5]);
    assert_eq!(errors[0].field, "mode");
    assert_eq!(errors[1].field, "controller_id");
    assert!(errors[2].to_string().starts_with("line 5: field '<json>'"));

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn artifact_index_hashes_and_verifies() {
    let dir = temp_dir("adaptdiff_artifacts");
    let report = dir.join("report.json");
    std::fs::write(&report, b"{\"frames\":1}").unwrap();

    let mut index = ArtifactIndex::new("run-7");
    index.add_file(&report, "run_report").unwrap();
    assert_eq!(index.artifacts.len(), 1);
    let entry = &index.artifacts[0];
    assert_eq!(entry.sha256, sha256_hex(b"{\"frames\":1}"));
    assert_eq!(entry.size_bytes, Some(12));
    assert!(index.verify().is_empty());

    let json = index.to_json().unwrap();
    let back: ArtifactIndex = serde_json::from_str(&json).unwrap();
    assert_eq!(back.run_id, "run-7");
    assert_eq!(back.artifacts, index.artifacts);

    std::fs::write(&report, b"{\"frames\":2}").unwrap();
    assert_eq!(index.verify(), vec![entry.path.clone()]);
    assert!(index.add_file(&dir.join("missing.json"), "run_report").is_err());

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn replay_log_on_disk_validates() {
    let dir = temp_dir("adaptdiff_replay_log");
    let log_path = dir.join("replay.jsonl");
    let scenario =
        Scenario::from_json_str(include_str!("../scenarios/dominant_duel.json")).unwrap();

    let emitter = LogEmitter::to_file(&log_path, "replay", "duel").unwrap();
    let (report, _) = ScenarioRunner::run(&scenario, Some(emitter)).unwrap();

    let (lines, errors) = validate_log_file(&log_path).unwrap();
    assert!(errors.is_empty(), "{errors:?}");
    // run_start, run_end, one command, one reset, plus the step records.
    assert!(lines >= 4 + report.steps.len());

    let mut index = ArtifactIndex::new("duel");
    index.add_file(&log_path, "structured_log").unwrap();
    assert_eq!(index.artifacts[0].sha256.len(), 64);

    std::fs::remove_dir_all(&dir).ok();
}
