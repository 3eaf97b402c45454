// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Undo support: replaying a journal into a fresh directory
//!
//! [`plan_revert`] turns a loaded journal into a list of copy actions
//! without touching the disk. [`execute`] performs them. Restored files go
//! to `<root>/nomnom/reverted/<session>/<original relative path>`; live
//! files are never overwritten or removed.

use serde::Serialize;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use crate::approval::{ApprovalGate, ApprovalOracle};
use crate::journal::{self, file_checksum, ChangeLog, ChangeLogEntry, Journal, OperationKind};
use crate::naming::unique_path;
use crate::{NomnomError, Result};

/// One file to restore
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RevertAction {
    /// Renamed file to copy from
    pub source: PathBuf,
    /// Where the copy goes
    pub target: PathBuf,
    pub original_path: PathBuf,
    pub relative_path: PathBuf,
    pub base_dir: PathBuf,
    pub checksum: Option<String>,
}

/// Journal entries that cannot be replayed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedEntry {
    pub original_path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RevertPlan {
    pub session_id: String,
    pub actions: Vec<RevertAction>,
    pub skipped: Vec<SkippedEntry>,
}

/// Directory restored files of a session are copied into
pub fn revert_dir(base_dir: &Path, session_id: &str) -> PathBuf {
    base_dir.join("nomnom").join("reverted").join(session_id)
}

/// Build the copy actions for every successful rename in `log`. Failed
/// entries and earlier reverts are ignored.
pub fn plan_revert(log: &ChangeLog) -> RevertPlan {
    let mut actions = Vec::new();
    let mut skipped = Vec::new();

    for entry in log.entries.iter().filter(|e| e.success && e.operation == OperationKind::Rename) {
        if !is_safe_relative(&entry.relative_path) {
            skipped.push(SkippedEntry {
                original_path: entry.original_path.clone(),
                reason: format!("unsafe relative path {:?}", entry.relative_path),
            });
            continue;
        }

        actions.push(RevertAction {
            source: entry.new_path.clone(),
            target: revert_dir(&entry.base_dir, &log.session_id).join(&entry.relative_path),
            original_path: entry.original_path.clone(),
            relative_path: entry.relative_path.clone(),
            base_dir: entry.base_dir.clone(),
            checksum: entry.checksum.clone(),
        });
    }

    RevertPlan {
        session_id: log.session_id.clone(),
        actions,
        skipped,
    }
}

fn is_safe_relative(path: &Path) -> bool {
    !path.as_os_str().is_empty() && path.components().all(|c| matches!(c, Component::Normal(_)))
}

pub struct RevertOptions {
    pub journal_path: PathBuf,
    /// Record the restores in a new journal
    pub logging: bool,
    pub auto_approve: bool,
    pub dry_run: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum RevertStatus {
    Restored(PathBuf),
    /// Dry run only
    Planned,
    NotApproved,
    Failed(String),
}

#[derive(Debug)]
pub struct RevertReport {
    pub plan: RevertPlan,
    pub statuses: Vec<RevertStatus>,
    pub journal_path: Option<PathBuf>,
    pub journal_error: Option<NomnomError>,
}

impl RevertReport {
    pub fn restored(&self) -> usize {
        self.statuses
            .iter()
            .filter(|s| matches!(s, RevertStatus::Restored(_)))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.statuses
            .iter()
            .filter(|s| matches!(s, RevertStatus::Failed(_)))
            .count()
    }
}

/// Load a journal and restore its renames
pub fn revert(options: &RevertOptions, oracle: Arc<dyn ApprovalOracle>) -> Result<RevertReport> {
    info!("Loading {:?}", options.journal_path);
    let log = journal::load(&options.journal_path)?;
    let plan = plan_revert(&log);

    for skipped in &plan.skipped {
        warn!("Cannot revert {:?}: {}", skipped.original_path, skipped.reason);
    }
    info!(
        "Session {}: {} files to restore",
        plan.session_id,
        plan.actions.len()
    );

    let journal = match plan.actions.first() {
        Some(first) if options.logging && !options.dry_run => Some(Journal::create(&first.base_dir)?),
        _ => None,
    };

    let gate = ApprovalGate::new(oracle, options.auto_approve);
    let mut statuses = Vec::with_capacity(plan.actions.len());
    let mut journal_error = None;

    for action in &plan.actions {
        let status = execute(action, options.dry_run, &gate);

        if let Some(journal) = &journal {
            if let Some(entry) = journal_entry(action, &status) {
                if let Err(e) = journal.record(entry) {
                    warn!("{}", e);
                    journal_error.get_or_insert(e);
                }
            }
        }
        statuses.push(status);
    }

    let journal_path = match &journal {
        Some(journal) => {
            if let Err(e) = journal.finalize() {
                journal_error.get_or_insert(e);
            }
            Some(journal.path().to_path_buf())
        }
        None => None,
    };

    if let Some(first) = plan.actions.first() {
        info!(
            "Revert finished, files are in {:?}",
            revert_dir(&first.base_dir, &plan.session_id)
        );
    }

    Ok(RevertReport {
        plan,
        statuses,
        journal_path,
        journal_error,
    })
}

/// Carry out one action
pub fn execute(action: &RevertAction, dry_run: bool, gate: &ApprovalGate) -> RevertStatus {
    if dry_run {
        info!("[dry run] {:?} -> {:?}", action.source, action.target);
        return RevertStatus::Planned;
    }

    let source_name = display_name(&action.source);
    let target_name = display_name(&action.target);
    if !gate.check(&source_name, &target_name) {
        info!("Skipped revert of {}", source_name);
        return RevertStatus::NotApproved;
    }

    match copy_without_overwrite(action) {
        Ok(target) => {
            info!("Restored {} -> {:?}", source_name, target);
            if let Some(expected) = &action.checksum {
                match file_checksum(&target) {
                    Ok(actual) if &actual == expected => {}
                    Ok(_) => warn!("{:?} changed since it was renamed", action.source),
                    Err(e) => warn!("Cannot verify {:?}: {}", target, e),
                }
            }
            RevertStatus::Restored(target)
        }
        Err(e) => {
            warn!("Cannot restore {:?}: {}", action.source, e);
            RevertStatus::Failed(e.to_string())
        }
    }
}

fn copy_without_overwrite(action: &RevertAction) -> Result<PathBuf> {
    if let Some(parent) = action.target.parent() {
        fs::create_dir_all(parent)?;
    }
    let target = unique_path(&action.target, |p| p.exists());
    fs::copy(&action.source, &target)
        .map_err(|e| NomnomError::Rename(format!("{:?} -> {:?}: {}", action.source, target, e)))?;
    Ok(target)
}

fn journal_entry(action: &RevertAction, status: &RevertStatus) -> Option<ChangeLogEntry> {
    let (target, outcome) = match status {
        RevertStatus::Restored(target) => (target.clone(), Ok(file_checksum(target).ok())),
        RevertStatus::Failed(error) => (action.target.clone(), Err(error.clone())),
        RevertStatus::Planned | RevertStatus::NotApproved => return None,
    };

    let mut entry = ChangeLogEntry::new(
        OperationKind::Revert,
        &action.source,
        &target,
        &action.base_dir,
        outcome,
    );
    entry.relative_path = action.relative_path.clone();
    Some(entry)
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
