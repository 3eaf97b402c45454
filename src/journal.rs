// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Change journal for undo support
//!
//! One JSON document per session under `<root>/nomnom/logs`. The whole
//! document is rewritten through a temporary file after every append, so a
//! crash leaves the last complete state on disk.
//!
//! Write cost is quadratic in the entry count: the n-th append rewrites all
//! n entries. A session holds at most one entry per scanned file.

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info};

use crate::{NomnomError, Result};

/// Kind of a journaled operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Rename,
    Revert,
}

/// A single operation in the journal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeLogEntry {
    pub timestamp: DateTime<Utc>,
    pub operation: OperationKind,
    pub original_path: PathBuf,
    pub new_path: PathBuf,
    /// Root the run was started on
    pub base_dir: PathBuf,
    /// Original location relative to `base_dir`
    pub relative_path: PathBuf,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// blake3 of the file at `new_path` after the operation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
}

impl ChangeLogEntry {
    /// Entry for a finished operation. The relative path falls back to the
    /// bare file name when `original` is not below `base_dir`.
    pub fn new(
        operation: OperationKind,
        original: &Path,
        new_path: &Path,
        base_dir: &Path,
        outcome: std::result::Result<Option<String>, String>,
    ) -> Self {
        let relative_path = original
            .strip_prefix(base_dir)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| original.file_name().map(PathBuf::from).unwrap_or_default());

        let (success, checksum, error) = match outcome {
            Ok(checksum) => (true, checksum, None),
            Err(error) => (false, None, Some(error)),
        };

        Self {
            timestamp: Utc::now(),
            operation,
            original_path: original.to_path_buf(),
            new_path: new_path.to_path_buf(),
            base_dir: base_dir.to_path_buf(),
            relative_path,
            success,
            error,
            checksum,
        }
    }
}

/// A complete session log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeLog {
    pub session_id: String,
    pub start_time: DateTime<Utc>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub entries: Vec<ChangeLogEntry>,
}

impl ChangeLog {
    pub fn new(session_id: String) -> Self {
        Self {
            session_id,
            start_time: Utc::now(),
            end_time: None,
            entries: Vec::new(),
        }
    }

    pub fn successful(&self) -> impl Iterator<Item = &ChangeLogEntry> {
        self.entries.iter().filter(|e| e.success)
    }
}

/// Journal directory for a scan root
pub fn default_log_dir(base_dir: &Path) -> PathBuf {
    base_dir.join("nomnom").join("logs")
}

/// Single-writer journal for one session
pub struct Journal {
    path: PathBuf,
    log: Mutex<ChangeLog>,
}

impl Journal {
    /// Start a session journal under `<base_dir>/nomnom/logs`
    pub fn create(base_dir: &Path) -> Result<Self> {
        Self::create_in(&default_log_dir(base_dir))
    }

    /// Start a session journal in an explicit directory
    pub fn create_in(log_dir: &Path) -> Result<Self> {
        fs::create_dir_all(log_dir).map_err(|e| {
            NomnomError::Journal(format!("Cannot create log directory {:?}: {}", log_dir, e))
        })?;

        let stamp = Local::now().format("%Y%m%d%H%M%S%3f").to_string();
        let mut session_id = stamp.clone();
        let mut counter = 1;
        while log_dir.join(log_file_name(&session_id)).exists() {
            session_id = format!("{}-{}", stamp, counter);
            counter += 1;
        }

        let journal = Self {
            path: log_dir.join(log_file_name(&session_id)),
            log: Mutex::new(ChangeLog::new(session_id)),
        };
        journal.persist(&journal.snapshot())?;
        info!("Journal: {:?}", journal.path);
        Ok(journal)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn session_id(&self) -> String {
        self.snapshot().session_id
    }

    /// Copy of the current document
    pub fn snapshot(&self) -> ChangeLog {
        self.log.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Append an entry and flush. The entry stays in memory even when the
    /// write fails, so a later flush can still save it.
    pub fn record(&self, entry: ChangeLogEntry) -> Result<()> {
        let mut log = self.log.lock().unwrap_or_else(|e| e.into_inner());
        debug!(
            "Journal {:?}: {:?} -> {:?} ({})",
            entry.operation,
            entry.original_path,
            entry.new_path,
            if entry.success { "ok" } else { "failed" }
        );
        log.entries.push(entry);
        self.persist(&log)
    }

    /// Stamp the end time and write the final document
    pub fn finalize(&self) -> Result<ChangeLog> {
        let mut log = self.log.lock().unwrap_or_else(|e| e.into_inner());
        log.end_time = Some(Utc::now());
        self.persist(&log)?;
        info!(
            "Journal {} closed with {} entries",
            log.session_id,
            log.entries.len()
        );
        Ok(log.clone())
    }

    fn persist(&self, log: &ChangeLog) -> Result<()> {
        let json = serde_json::to_string_pretty(log)?;
        let temp_path = self.path.with_extension("json.tmp");

        fs::write(&temp_path, json)
            .and_then(|_| fs::rename(&temp_path, &self.path))
            .map_err(|e| NomnomError::Journal(format!("Cannot write {:?}: {}", self.path, e)))
    }
}

/// blake3 hex digest of a file's contents
pub fn file_checksum(path: &Path) -> Result<String> {
    let data = fs::read(path)?;
    Ok(blake3::hash(&data).to_hex().to_string())
}

fn log_file_name(session_id: &str) -> String {
    format!("changes_{}.json", session_id)
}

/// Load a journal document
pub fn load(path: &Path) -> Result<ChangeLog> {
    let json = fs::read_to_string(path)
        .map_err(|e| NomnomError::Journal(format!("Cannot read {:?}: {}", path, e)))?;
    serde_json::from_str(&json)
        .map_err(|e| NomnomError::Journal(format!("Cannot parse {:?}: {}", path, e)))
}

/// All journal files in a log directory, oldest first. A missing directory
/// has no logs.
pub fn list_logs(log_dir: &Path) -> Result<Vec<PathBuf>> {
    if !log_dir.exists() {
        return Ok(Vec::new());
    }

    let mut logs: Vec<PathBuf> = fs::read_dir(log_dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.is_file()
                && p.extension().is_some_and(|e| e == "json")
                && p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with("changes_"))
        })
        .collect();
    logs.sort();
    Ok(logs)
}
