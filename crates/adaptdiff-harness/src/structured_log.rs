//! Structured JSONL logging for director runs.
//!
//! Provides:
//! - [`LogEntry`]: canonical JSONL record with required + optional fields.
//! - [`ArtifactIndex`]: links run logs and reports with SHA-256 integrity.
//! - [`LogEmitter`]: writes JSONL lines to a file or an in-memory buffer.
//! - [`validate_log_line`]: validates a single JSONL line against the schema.
//! - [`validate_log_file`]: validates an entire JSONL file.

use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::Digest;

// ---------------------------------------------------------------------------
// Log entry
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

const LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Result attached to step, command and run events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// At least one multiplier moved.
    Changed,
    /// Step ran but nothing moved past the change threshold.
    Unchanged,
    /// Gated out (inactive, not adaptive, not due).
    Skipped,
    /// Input discarded by sanitization.
    Rejected,
    Pass,
    Fail,
}

const OUTCOMES: [&str; 6] = ["changed", "unchanged", "skipped", "rejected", "pass", "fail"];
const MODES: [&str; 3] = ["off", "observe", "adaptive"];
const AXES: [&str; 4] = ["max_health", "move_speed", "attack_speed", "attack_damage"];

/// Canonical structured log entry.
///
/// Required fields: `timestamp`, `trace_id`, `level`, `event`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: String,
    pub trace_id: String,
    pub level: LogLevel,
    pub event: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    /// Simulated seconds since the start of the run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sim_time: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub axis: Option<String>,
    /// Controller identity, e.g. `axis_sgd::attack_speed`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub controller_id: Option<String>,
    /// Decision step counter (orchestrator-wide).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<Outcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entities_updated: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact_refs: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl LogEntry {
    #[must_use]
    pub fn new(trace_id: impl Into<String>, level: LogLevel, event: impl Into<String>) -> Self {
        Self {
            timestamp: now_utc(),
            trace_id: trace_id.into(),
            level,
            event: event.into(),
            run_id: None,
            mode: None,
            sim_time: None,
            axis: None,
            controller_id: None,
            step: None,
            outcome: None,
            entities_updated: None,
            artifact_refs: None,
            details: None,
        }
    }

    #[must_use]
    pub fn with_mode(mut self, mode: impl Into<String>) -> Self {
        self.mode = Some(mode.into());
        self
    }

    #[must_use]
    pub fn with_sim_time(mut self, seconds: f64) -> Self {
        self.sim_time = Some(seconds);
        self
    }

    /// Set the axis and derive its controller id.
    #[must_use]
    pub fn with_axis(mut self, axis: impl Into<String>) -> Self {
        let axis = axis.into();
        self.controller_id = Some(format!("axis_sgd::{axis}"));
        self.axis = Some(axis);
        self
    }

    #[must_use]
    pub fn with_step(mut self, step: u64) -> Self {
        self.step = Some(step);
        self
    }

    #[must_use]
    pub fn with_outcome(mut self, outcome: Outcome) -> Self {
        self.outcome = Some(outcome);
        self
    }

    #[must_use]
    pub fn with_entities_updated(mut self, n: u64) -> Self {
        self.entities_updated = Some(n);
        self
    }

    #[must_use]
    pub fn with_artifacts(mut self, refs: Vec<String>) -> Self {
        self.artifact_refs = Some(refs);
        self
    }

    #[must_use]
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Serialize to a single JSONL line (no trailing newline).
    pub fn to_jsonl(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

// ---------------------------------------------------------------------------
// Artifact index
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactEntry {
    pub path: String,
    pub kind: String,
    pub sha256: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
}

/// Index linking one run's logs and reports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactIndex {
    pub index_version: u32,
    pub run_id: String,
    pub generated_utc: String,
    pub artifacts: Vec<ArtifactEntry>,
}

impl ArtifactIndex {
    #[must_use]
    pub fn new(run_id: impl Into<String>) -> Self {
        Self {
            index_version: 1,
            run_id: run_id.into(),
            generated_utc: now_utc(),
            artifacts: Vec::new(),
        }
    }

    /// Hash `path` and add it to the index.
    pub fn add_file(&mut self, path: &Path, kind: impl Into<String>) -> std::io::Result<&mut Self> {
        let data = std::fs::read(path)?;
        self.artifacts.push(ArtifactEntry {
            path: path.display().to_string(),
            kind: kind.into(),
            sha256: sha256_hex(&data),
            size_bytes: Some(data.len() as u64),
        });
        Ok(self)
    }

    /// Re-hash every entry. Returns the paths whose content no longer matches.
    #[must_use]
    pub fn verify(&self) -> Vec<String> {
        self.artifacts
            .iter()
            .filter(|entry| {
                std::fs::read(&entry.path).map_or(true, |data| sha256_hex(&data) != entry.sha256)
            })
            .map(|entry| entry.path.clone())
            .collect()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Lowercase hex SHA-256 of `data`.
#[must_use]
pub fn sha256_hex(data: &[u8]) -> String {
    use std::fmt::Write as _;
    let digest = sha2::Sha256::digest(data);
    let mut out = String::with_capacity(digest.len() * 2);
    for b in digest {
        let _ = write!(out, "{b:02x}");
    }
    out
}

// ---------------------------------------------------------------------------
// Log emitter
// ---------------------------------------------------------------------------

enum Sink {
    File(std::io::BufWriter<std::fs::File>),
    Buffer(Vec<u8>),
}

/// Writes structured JSONL entries with sequential trace ids
/// (`<scope>::<run_id>::<seq>`).
pub struct LogEmitter {
    sink: Sink,
    seq: u64,
    scope: String,
    run_id: String,
}

impl LogEmitter {
    pub fn to_file(path: &Path, scope: &str, run_id: &str) -> std::io::Result<Self> {
        let file = std::fs::File::create(path)?;
        Ok(Self {
            sink: Sink::File(std::io::BufWriter::new(file)),
            seq: 0,
            scope: scope.to_string(),
            run_id: run_id.to_string(),
        })
    }

    /// In-memory emitter; read back with [`LogEmitter::buffered_lines`].
    #[must_use]
    pub fn to_buffer(scope: &str, run_id: &str) -> Self {
        Self {
            sink: Sink::Buffer(Vec::new()),
            seq: 0,
            scope: scope.to_string(),
            run_id: run_id.to_string(),
        }
    }

    #[must_use]
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    #[must_use]
    pub fn emitted(&self) -> u64 {
        self.seq
    }

    fn next_trace_id(&mut self) -> String {
        self.seq += 1;
        format!("{}::{}::{:04}", self.scope, self.run_id, self.seq)
    }

    /// Start an entry with the next trace id and this run's id.
    pub fn entry(&mut self, level: LogLevel, event: &str) -> LogEntry {
        let trace_id = self.next_trace_id();
        let mut entry = LogEntry::new(trace_id, level, event);
        entry.run_id = Some(self.run_id.clone());
        entry
    }

    /// Emit a bare entry.
    pub fn emit(&mut self, level: LogLevel, event: &str) -> std::io::Result<LogEntry> {
        let entry = self.entry(level, event);
        self.write_line(&entry)?;
        Ok(entry)
    }

    /// Emit a populated entry. An empty trace id is filled in.
    pub fn emit_entry(&mut self, mut entry: LogEntry) -> std::io::Result<()> {
        if entry.trace_id.is_empty() {
            entry.trace_id = self.next_trace_id();
        }
        if entry.run_id.is_none() {
            entry.run_id = Some(self.run_id.clone());
        }
        self.write_line(&entry)
    }

    fn write_line(&mut self, entry: &LogEntry) -> std::io::Result<()> {
        let line = serde_json::to_string(entry).map_err(std::io::Error::other)?;
        match &mut self.sink {
            Sink::File(w) => writeln!(w, "{line}"),
            Sink::Buffer(buf) => writeln!(buf, "{line}"),
        }
    }

    /// Lines written so far when buffering; empty for file sinks.
    #[must_use]
    pub fn buffered_lines(&self) -> Vec<String> {
        match &self.sink {
            Sink::Buffer(buf) => String::from_utf8_lossy(buf)
                .lines()
                .map(str::to_string)
                .collect(),
            Sink::File(_) => Vec::new(),
        }
    }

    pub fn flush(&mut self) -> std::io::Result<()> {
        match &mut self.sink {
            Sink::File(w) => w.flush(),
            Sink::Buffer(_) => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogValidationError {
    pub line_number: usize,
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for LogValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "line {}: field '{}': {}",
            self.line_number, self.field, self.message
        )
    }
}

fn check_enum(
    obj: &serde_json::Map<String, serde_json::Value>,
    field: &str,
    allowed: &[&str],
    line_number: usize,
    errors: &mut Vec<LogValidationError>,
) {
    if let Some(value) = obj.get(field).and_then(|v| v.as_str())
        && !allowed.contains(&value)
    {
        errors.push(LogValidationError {
            line_number,
            field: field.to_string(),
            message: format!("invalid {field}: '{value}'"),
        });
    }
}

/// Validate a single JSONL line against the schema.
pub fn validate_log_line(
    line: &str,
    line_number: usize,
) -> Result<LogEntry, Vec<LogValidationError>> {
    let mut errors = Vec::new();

    let value: serde_json::Value = match serde_json::from_str(line) {
        Ok(v) => v,
        Err(e) => {
            errors.push(LogValidationError {
                line_number,
                field: "<json>".to_string(),
                message: format!("invalid JSON: {e}"),
            });
            return Err(errors);
        }
    };

    let Some(obj) = value.as_object() else {
        errors.push(LogValidationError {
            line_number,
            field: "<root>".to_string(),
            message: "expected JSON object".to_string(),
        });
        return Err(errors);
    };

    for field in ["timestamp", "trace_id", "level", "event"] {
        if !obj.contains_key(field) {
            errors.push(LogValidationError {
                line_number,
                field: field.to_string(),
                message: "required field missing".to_string(),
            });
        }
    }

    check_enum(obj, "level", &LEVELS, line_number, &mut errors);
    check_enum(obj, "mode", &MODES, line_number, &mut errors);
    check_enum(obj, "outcome", &OUTCOMES, line_number, &mut errors);
    check_enum(obj, "axis", &AXES, line_number, &mut errors);

    // Axis events must name their controller.
    if obj.contains_key("axis") {
        match obj.get("controller_id").and_then(|v| v.as_str()) {
            Some(id) if !id.trim().is_empty() => {}
            _ => errors.push(LogValidationError {
                line_number,
                field: "controller_id".to_string(),
                message: "axis events must include a non-empty controller_id".to_string(),
            }),
        }
    }

    if let Some(sim_time) = obj.get("sim_time")
        && !sim_time.as_f64().is_some_and(|t| t.is_finite() && t >= 0.0)
    {
        errors.push(LogValidationError {
            line_number,
            field: "sim_time".to_string(),
            message: "sim_time must be a non-negative number".to_string(),
        });
    }

    if let Some(trace_id) = obj.get("trace_id").and_then(|v| v.as_str())
        && trace_id.split("::").count() != 3
    {
        errors.push(LogValidationError {
            line_number,
            field: "trace_id".to_string(),
            message: format!("trace_id should follow <scope>::<run_id>::<seq>, got: '{trace_id}'"),
        });
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    serde_json::from_value::<LogEntry>(value).map_err(|e| {
        vec![LogValidationError {
            line_number,
            field: "<deserialization>".to_string(),
            message: format!("failed to deserialize: {e}"),
        }]
    })
}

/// Validate an entire JSONL file. Returns the non-empty line count and all
/// validation errors found.
pub fn validate_log_file(path: &Path) -> std::io::Result<(usize, Vec<LogValidationError>)> {
    let content = std::fs::read_to_string(path)?;
    let mut all_errors = Vec::new();
    let mut line_count = 0;

    for (i, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        line_count += 1;
        if let Err(errs) = validate_log_line(line, i + 1) {
            all_errors.extend(errs);
        }
    }

    Ok((line_count, all_errors))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// RFC 3339 UTC timestamp with millisecond precision.
fn now_utc() -> String {
    let duration = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default();
    format_utc(duration.as_secs(), duration.subsec_millis())
}

fn format_utc(secs: u64, millis: u32) -> String {
    let days = (secs / 86_400) as i64;
    let rem = secs % 86_400;
    let (year, month, day) = civil_from_days(days);
    format!(
        "{year:04}-{month:02}-{day:02}T{:02}:{:02}:{:02}.{millis:03}Z",
        rem / 3600,
        (rem % 3600) / 60,
        rem % 60,
    )
}

/// Days since 1970-01-01 to a proleptic Gregorian date.
fn civil_from_days(days: i64) -> (i64, u32, u32) {
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let month = (if mp < 10 { mp + 3 } else { mp - 9 }) as u32;
    let year = yoe + era * 400 + i64::from(month <= 2);
    (year, month, day)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_serializes_required_fields_only() {
        let entry = LogEntry::new("replay::run-1::0001", LogLevel::Info, "run_start");
        let json = entry.to_jsonl().unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(parsed["timestamp"].is_string());
        assert_eq!(parsed["trace_id"], "replay::run-1::0001");
        assert_eq!(parsed["level"], "info");
        assert!(parsed.get("axis").is_none());
        assert!(parsed.get("mode").is_none());
    }

    #[test]
    fn axis_entry_carries_controller_id() {
        let entry = LogEntry::new("replay::run-1::0002", LogLevel::Debug, "axis_step")
            .with_mode("adaptive")
            .with_axis("attack_speed")
            .with_step(4)
            .with_sim_time(40.0)
            .with_outcome(Outcome::Changed)
            .with_details(serde_json::json!({"multiplier": 1.08}));
        let json = entry.to_jsonl().unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["controller_id"], "axis_sgd::attack_speed");
        assert_eq!(parsed["outcome"], "changed");
        assert_eq!(parsed["step"], 4);
        assert!(validate_log_line(&json, 1).is_ok());
    }

    #[test]
    fn validation_reports_each_bad_field() {
        let json = r#"{"timestamp":"t","trace_id":"a::b::c","level":"loud","event":"x","mode":"turbo","axis":"armor","sim_time":-1}"#;
        let errors = validate_log_line(json, 3).unwrap_err();
        for field in ["level", "mode", "axis", "controller_id", "sim_time"] {
            assert!(errors.iter().any(|e| e.field == field), "missing {field}");
        }
        assert!(errors.iter().all(|e| e.line_number == 3));
    }

    #[test]
    fn validation_rejects_structure_errors() {
        assert!(validate_log_line("not json", 1).unwrap_err()[0].field == "<json>");
        assert!(validate_log_line("[1,2]", 1).unwrap_err()[0].field == "<root>");
        let missing = r#"{"timestamp":"t","level":"info","event":"x"}"#;
        assert!(validate_log_line(missing, 1)
            .unwrap_err()
            .iter()
            .any(|e| e.field == "trace_id"));
        let bad_trace = r#"{"timestamp":"t","trace_id":"flat","level":"info","event":"x"}"#;
        assert!(validate_log_line(bad_trace, 1)
            .unwrap_err()
            .iter()
            .any(|e| e.field == "trace_id"));
    }

    #[test]
    fn emitter_numbers_trace_ids() {
        let mut emitter = LogEmitter::to_buffer("sim", "run-42");
        let e1 = emitter.emit(LogLevel::Info, "start").unwrap();
        let e2 = emitter.emit(LogLevel::Info, "end").unwrap();
        assert_eq!(e1.trace_id, "sim::run-42::0001");
        assert_eq!(e2.trace_id, "sim::run-42::0002");
        let lines = emitter.buffered_lines();
        assert_eq!(lines.len(), 2);
        for (i, line) in lines.iter().enumerate() {
            assert!(validate_log_line(line, i + 1).is_ok());
        }
    }

    #[test]
    fn sha256_of_known_input() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn utc_formatting() {
        assert_eq!(format_utc(0, 0), "1970-01-01T00:00:00.000Z");
        assert_eq!(format_utc(951_782_400, 5), "2000-02-29T00:00:00.005Z");
        assert_eq!(format_utc(1_767_225_599, 999), "2025-12-31T23:59:59.999Z");
    }
}
