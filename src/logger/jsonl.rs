//! JSONL activity log: append-only line-delimited JSON.
//!
//! Each line is a self-contained JSON object. Lines are assembled in memory
//! and written atomically via `write_all` to prevent interleaved partial
//! lines when the file is being tailed by another process.
//!
//! Three-level fallback chain:
//! 1. Primary file path
//! 2. stderr with `[FSN-JSONL]` prefix
//! 3. Silent discard (a scan must never fail because logging failed)

#![allow(missing_docs)]

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Severity level for log events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

/// Log event types matching the scan activity model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    ScanComplete,
    StateSaved,
    StateDiscarded,
    SecurityAlert,
    Error,
}

/// A single JSONL log entry — all fields optional except `ts`, `event`,
/// `severity`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    /// RFC 3339 UTC timestamp.
    pub ts: String,
    /// Event type identifier.
    pub event: EventType,
    /// Severity level.
    pub severity: Severity,
    /// Scan root or affected path.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Files in the scanned set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_count: Option<usize>,
    /// Total changes detected.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_changes: Option<usize>,
    /// Files pruned by the incremental walk.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub files_skipped: Option<usize>,
    /// Duration of the scan in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    /// FSN error code if the event records a failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    /// Human-readable error message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Freeform details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl LogEntry {
    /// Create a new entry stamped with the current UTC time.
    #[must_use]
    pub fn new(event: EventType, severity: Severity) -> Self {
        Self {
            ts: Utc::now().to_rfc3339(),
            event,
            severity,
            path: None,
            file_count: None,
            total_changes: None,
            files_skipped: None,
            duration_ms: None,
            error_code: None,
            error_message: None,
            details: None,
        }
    }

    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    #[must_use]
    pub fn with_file_count(mut self, count: usize) -> Self {
        self.file_count = Some(count);
        self
    }

    #[must_use]
    pub fn with_total_changes(mut self, total: usize) -> Self {
        self.total_changes = Some(total);
        self
    }

    #[must_use]
    pub fn with_files_skipped(mut self, skipped: usize) -> Self {
        self.files_skipped = Some(skipped);
        self
    }

    #[must_use]
    pub fn with_duration_ms(mut self, ms: u64) -> Self {
        self.duration_ms = Some(ms);
        self
    }

    #[must_use]
    pub fn with_error(mut self, code: impl Into<String>, message: impl Into<String>) -> Self {
        self.error_code = Some(code.into());
        self.error_message = Some(message.into());
        self
    }

    #[must_use]
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

/// Append-only JSONL writer with graceful degradation.
#[derive(Debug, Clone)]
pub struct JsonlLogger {
    path: PathBuf,
}

impl JsonlLogger {
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Append one entry. Never fails: on any IO problem the line goes to
    /// stderr, and if serialization itself fails the entry is discarded.
    pub fn log(&self, entry: &LogEntry) {
        let Ok(mut line) = serde_json::to_string(entry) else {
            return;
        };
        line.push('\n');

        if self.append(&line) {
            return;
        }
        eprint!("[FSN-JSONL] {line}");
    }

    fn append(&self, line: &str) -> bool {
        if let Some(parent) = self.path.parent() {
            if fs::create_dir_all(parent).is_err() {
                return false;
            }
        }
        let Ok(mut file) = OpenOptions::new().create(true).append(true).open(&self.path) else {
            return false;
        };
        file.write_all(line.as_bytes()).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn appends_one_json_object_per_line() {
        let tmp = TempDir::new().unwrap();
        let logger = JsonlLogger::new(tmp.path().join("activity.jsonl"));

        logger.log(
            &LogEntry::new(EventType::ScanComplete, Severity::Info)
                .with_path("/scan")
                .with_file_count(42)
                .with_total_changes(3),
        );
        logger.log(&LogEntry::new(EventType::StateSaved, Severity::Info).with_path("/scan"));

        let body = fs::read_to_string(tmp.path().join("activity.jsonl")).unwrap();
        let lines: Vec<&str> = body.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: LogEntry = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first.event, EventType::ScanComplete);
        assert_eq!(first.file_count, Some(42));
    }

    #[test]
    fn unset_fields_are_omitted_from_json() {
        let entry = LogEntry::new(EventType::Error, Severity::Critical)
            .with_error("FSN-2103", "disk full");
        let json = serde_json::to_string(&entry).unwrap();

        assert!(json.contains("\"error_code\":\"FSN-2103\""));
        assert!(!json.contains("file_count"));
        assert!(!json.contains("duration_ms"));
    }

    #[test]
    fn event_names_are_snake_case() {
        let entry = LogEntry::new(EventType::SecurityAlert, Severity::Warning);
        let json = serde_json::to_string(&entry).unwrap();
        assert!(json.contains("\"event\":\"security_alert\""));
        assert!(json.contains("\"severity\":\"warning\""));
    }

    #[test]
    fn creates_parent_directories() {
        let tmp = TempDir::new().unwrap();
        let nested = tmp.path().join("a/b/activity.jsonl");
        let logger = JsonlLogger::new(nested.clone());
        logger.log(&LogEntry::new(EventType::StateSaved, Severity::Info));
        assert!(nested.exists());
    }

    #[test]
    fn unwritable_path_degrades_without_panicking() {
        // A path under a file cannot be created; the entry goes to stderr.
        let tmp = TempDir::new().unwrap();
        let blocker = tmp.path().join("not_a_dir");
        fs::write(&blocker, "x").unwrap();
        let logger = JsonlLogger::new(blocker.join("activity.jsonl"));
        logger.log(&LogEntry::new(EventType::Error, Severity::Warning));
    }
}
