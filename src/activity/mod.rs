//! Structured activity log: one JSONL line per backend operation.
//!
//! Log file: `~/.lotadmin/activity.jsonl` (see `[logging]` in the config).
//! Writes are best-effort and never fail the operation being logged.
//! Token secrets must never reach this module; refer to tokens by id or name.

use std::collections::BTreeMap;
use std::fs::{self, OpenOptions, create_dir_all};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Result;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::api::ApiError;
use crate::config::schema::LoggingConfig;

// ---------------------------------------------------------------------------
// Entry
// ---------------------------------------------------------------------------

/// A single activity log line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub timestamp: String,
    /// Operation name, e.g. `"lots.delete"` or `"tokens.create"`.
    pub operation: String,
    /// Affected resource (`"lot:42"`, `"token:7"`), when there is one.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub target: Option<String>,
    #[serde(default = "default_true")]
    pub success: bool,
    /// [`ApiError::kind`] of the failure.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error_kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub message: Option<String>,
    #[serde(default)]
    pub duration_ms: u64,
}

fn default_true() -> bool {
    true
}

// ---------------------------------------------------------------------------
// Log handle
// ---------------------------------------------------------------------------

/// Handle to the activity log file.
#[derive(Debug, Clone)]
pub struct ActivityLog {
    path: Option<PathBuf>,
}

impl ActivityLog {
    pub fn from_config(config: &LoggingConfig) -> Self {
        Self {
            path: config.enabled.then(|| config.log_path()),
        }
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    /// A log that drops everything.
    pub fn disabled() -> Self {
        Self { path: None }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Time `f` and record its outcome under `operation`.
    pub fn track<T>(
        &self,
        operation: &str,
        target: Option<String>,
        f: impl FnOnce() -> Result<T, ApiError>,
    ) -> Result<T, ApiError> {
        let start = Instant::now();
        let result = f();
        let duration_ms = start.elapsed().as_millis() as u64;
        let (success, error_kind, message) = match &result {
            Ok(_) => (true, None, None),
            Err(e) => (
                false,
                Some(e.kind().to_string()),
                Some(e.message().to_string()),
            ),
        };
        self.append(&ActivityEntry {
            timestamp: Utc::now().to_rfc3339(),
            operation: operation.to_string(),
            target,
            success,
            error_kind,
            message,
            duration_ms,
        });
        result
    }

    /// Record a finished operation with a free-form message.
    pub fn note(&self, operation: &str, target: Option<String>, success: bool, message: &str) {
        self.append(&ActivityEntry {
            timestamp: Utc::now().to_rfc3339(),
            operation: operation.to_string(),
            target,
            success,
            error_kind: None,
            message: (!message.is_empty()).then(|| message.to_string()),
            duration_ms: 0,
        });
    }

    /// Best-effort append; failures are silently ignored.
    pub fn append(&self, entry: &ActivityEntry) {
        if let Some(ref path) = self.path {
            let _ = append_entry(path, entry);
        }
    }

    /// Read all entries, skipping malformed lines.
    pub fn read_all(&self) -> Vec<ActivityEntry> {
        let Some(ref path) = self.path else {
            return Vec::new();
        };
        let Ok(file) = fs::File::open(path) else {
            return Vec::new();
        };
        BufReader::new(file)
            .lines()
            .map_while(Result::ok)
            .filter_map(|line| serde_json::from_str::<ActivityEntry>(&line).ok())
            .collect()
    }

    /// The newest `limit` entries, oldest first.
    pub fn read_recent(&self, limit: usize) -> Vec<ActivityEntry> {
        let mut entries = self.read_all();
        let skip = entries.len().saturating_sub(limit);
        entries.drain(..skip);
        entries
    }
}

fn append_entry(path: &Path, entry: &ActivityEntry) -> Result<()> {
    if let Some(parent) = path.parent() {
        create_dir_all(parent)?;
    }
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    let json = serde_json::to_string(entry)?;
    writeln!(file, "{json}")?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Reporting
// ---------------------------------------------------------------------------

/// Per-operation success/failure counts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperationSummary {
    pub operation: String,
    pub succeeded: usize,
    pub failed: usize,
}

/// Aggregate entries by operation, sorted by operation name.
pub fn summarize(entries: &[ActivityEntry]) -> Vec<OperationSummary> {
    let mut by_op: BTreeMap<&str, OperationSummary> = BTreeMap::new();
    for entry in entries {
        let summary = by_op
            .entry(entry.operation.as_str())
            .or_insert_with(|| OperationSummary {
                operation: entry.operation.clone(),
                ..OperationSummary::default()
            });
        if entry.success {
            summary.succeeded += 1;
        } else {
            summary.failed += 1;
        }
    }
    by_op.into_values().collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
