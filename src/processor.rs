// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Safe application of suggested names
//!
//! Processing happens on a copy of the tree in two phases. The first copies
//! every source file into the output root (mirrored, or bucketed by
//! category). The second renames each copy to its suggested name. Source
//! files are never touched. A dry run walks both phases against predicted
//! paths in the output root without writing anything, so it reports the
//! same destinations and collisions a real run would produce.

use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::approval::ApprovalGate;
use crate::journal::{file_checksum, ChangeLogEntry, Journal, OperationKind};
use crate::naming::unique_path;
use crate::tree::{FileRecord, FolderNode};
use crate::NomnomError;

const IMAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "webp", "bmp", "tiff", "tif", "heic", "heif", "avif", "svg", "ico",
];
const DOCUMENT_EXTENSIONS: &[&str] = &[
    "pdf", "doc", "docx", "txt", "md", "rtf", "odt", "epub", "html", "htm", "csv", "tsv", "xls",
    "xlsx", "ods", "ppt", "pptx", "odp", "json", "xml", "yaml", "yml",
];
const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "flac", "ogg", "m4a", "aac", "wma", "opus"];
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mkv", "mov", "avi", "webm", "wmv", "flv", "m4v"];

/// Bucket folder name for organize mode
pub fn category_for(extension: Option<&str>) -> &'static str {
    let ext = match extension {
        Some(ext) => ext.to_lowercase(),
        None => return "Others",
    };
    let is = |list: &[&str]| list.contains(&ext.as_str());

    if is(IMAGE_EXTENSIONS) {
        "Images"
    } else if is(DOCUMENT_EXTENSIONS) {
        "Documents"
    } else if is(AUDIO_EXTENSIONS) {
        "Audios"
    } else if is(VIDEO_EXTENSIONS) {
        "Videos"
    } else {
        "Others"
    }
}

#[derive(Debug, Clone)]
pub struct ProcessOptions {
    /// Output root for copied files
    pub output: PathBuf,
    pub dry_run: bool,
    /// Bucket files by category instead of mirroring the source layout
    pub organize: bool,
}

/// Final state of one file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Renamed, or would be in a dry run
    Renamed,
    /// The suggestion equals the current name
    Unchanged,
    /// Declined at the approval prompt
    Rejected,
    /// No valid name came back from the completion service
    NoSuggestion,
    /// Copy or rename failed
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessResult {
    pub original_path: PathBuf,
    pub new_path: PathBuf,
    pub success: bool,
    pub error: Option<String>,
    pub outcome: Outcome,
}

/// Counts shown at the end of a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub renamed: usize,
    pub failed: usize,
    pub unchanged: usize,
}

impl RunSummary {
    pub fn from_results(results: &[ProcessResult]) -> Self {
        let mut summary = Self::default();
        for result in results {
            match result.outcome {
                Outcome::Renamed => summary.renamed += 1,
                Outcome::Failed | Outcome::NoSuggestion => summary.failed += 1,
                Outcome::Unchanged | Outcome::Rejected => summary.unchanged += 1,
            }
        }
        summary
    }
}

/// Everything the processor produced
#[derive(Debug)]
pub struct ProcessReport {
    pub results: Vec<ProcessResult>,
    /// First journal write failure, if any
    pub journal_error: Option<NomnomError>,
}

pub struct SafeProcessor {
    options: ProcessOptions,
    gate: Arc<ApprovalGate>,
    journal: Option<Arc<Journal>>,
}

impl SafeProcessor {
    /// `journal` is ignored for dry runs
    pub fn new(options: ProcessOptions, gate: Arc<ApprovalGate>, journal: Option<Arc<Journal>>) -> Self {
        Self {
            options,
            gate,
            journal,
        }
    }

    /// Apply the suggestions in `tree`. The tree itself is left untouched,
    /// so repeated dry runs see the same input.
    pub fn process(&self, tree: &FolderNode) -> ProcessReport {
        let root = tree.path.clone();
        let mut working = tree.clone();
        let mut failures: HashMap<PathBuf, String> = HashMap::new();

        if self.options.dry_run {
            info!("Dry run: nothing will be written");
        }
        self.materialize(&root, &mut working, &mut failures);

        let mut files: Vec<&FileRecord> = working.all_files();
        // every path this run's files occupy, or would occupy in a dry run
        let known: HashSet<PathBuf> = files.iter().map(|f| f.path.clone()).collect();
        let mut claimed: HashSet<PathBuf> = known.clone();

        let mut state = RenameState {
            root: &root,
            known: &known,
            claimed: &mut claimed,
            journal_error: None,
        };

        let mut results = Vec::with_capacity(files.len());
        for file in files.drain(..) {
            let result = match failures.get(&file.unchanged_path) {
                Some(error) => ProcessResult {
                    original_path: file.unchanged_path.clone(),
                    new_path: file.unchanged_path.clone(),
                    success: false,
                    error: Some(error.clone()),
                    outcome: Outcome::Failed,
                },
                None => self.rename(file, &mut state),
            };
            results.push(result);
        }

        let summary = RunSummary::from_results(&results);
        info!(
            "{} renamed, {} failed, {} unchanged{}",
            summary.renamed,
            summary.failed,
            summary.unchanged,
            if self.options.dry_run { " (dry run)" } else { "" }
        );

        ProcessReport {
            results,
            journal_error: state.journal_error,
        }
    }

    /// Copy every file into the output root and point `path` at the copy.
    /// A dry run only points `path` at where the copy would land.
    fn materialize(&self, root: &Path, tree: &mut FolderNode, failures: &mut HashMap<PathBuf, String>) {
        let mut claimed: HashSet<PathBuf> = HashSet::new();
        self.materialize_folder(root, tree, &mut claimed, failures);
    }

    fn materialize_folder(
        &self,
        root: &Path,
        folder: &mut FolderNode,
        claimed: &mut HashSet<PathBuf>,
        failures: &mut HashMap<PathBuf, String>,
    ) {
        let mirrored = self
            .options
            .output
            .join(folder.path.strip_prefix(root).unwrap_or(Path::new("")));

        for file in &mut folder.files {
            let dir = if self.options.organize {
                self.options.output.join(category_for(file.extension()))
            } else {
                mirrored.clone()
            };

            let dest = unique_path(&dir.join(&file.name), |p| claimed.contains(p) || p.exists());
            if self.options.dry_run {
                claimed.insert(dest.clone());
                file.path = dest;
                continue;
            }

            if let Err(e) = fs::create_dir_all(&dir) {
                warn!("Cannot create {:?}: {}", dir, e);
                failures.insert(file.unchanged_path.clone(), format!("cannot create {:?}: {}", dir, e));
                continue;
            }

            match fs::copy(&file.path, &dest) {
                Ok(_) => {
                    debug!("Copied {:?} -> {:?}", file.path, dest);
                    claimed.insert(dest.clone());
                    file.path = dest;
                }
                Err(e) => {
                    warn!("Cannot copy {:?}: {}", file.path, e);
                    failures.insert(file.unchanged_path.clone(), format!("copy failed: {}", e));
                }
            }
        }

        for sub in &mut folder.subfolders {
            self.materialize_folder(root, sub, claimed, failures);
        }
    }

    fn rename(&self, file: &FileRecord, state: &mut RenameState<'_>) -> ProcessResult {
        let current = file.path.clone();
        let unchanged = |outcome, error: Option<String>| ProcessResult {
            original_path: file.unchanged_path.clone(),
            new_path: current.clone(),
            success: true,
            error,
            outcome,
        };

        let new_name = match &file.new_name {
            Some(name) => name,
            None => {
                let reason = file
                    .failed_reason
                    .clone()
                    .unwrap_or_else(|| "no name suggested".to_string());
                return unchanged(Outcome::NoSuggestion, Some(reason));
            }
        };

        let parent = current.parent().unwrap_or_else(|| Path::new(""));
        let target = parent.join(new_name);
        if target == current {
            return unchanged(Outcome::Unchanged, None);
        }

        let known = state.known;
        let claimed = &*state.claimed;
        let dest = unique_path(&target, |p| {
            p != current && (claimed.contains(p) || (!known.contains(p) && p.exists()))
        });
        if dest == current {
            return unchanged(Outcome::Unchanged, None);
        }

        let dest_name = dest
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        if self.options.dry_run {
            info!("[dry run] {} -> {}", file.name, dest_name);
            state.claim(&current, &dest);
            return ProcessResult {
                original_path: file.unchanged_path.clone(),
                new_path: dest,
                success: true,
                error: None,
                outcome: Outcome::Renamed,
            };
        }

        if !self.gate.check(&file.name, &dest_name) {
            info!("Skipped {} (not approved)", file.name);
            return unchanged(Outcome::Rejected, None);
        }

        match fs::rename(&current, &dest) {
            Ok(()) => {
                info!("Renamed {} -> {}", file.name, dest_name);
                state.claim(&current, &dest);
                let checksum = match file_checksum(&dest) {
                    Ok(sum) => Some(sum),
                    Err(e) => {
                        warn!("Cannot checksum {:?}: {}", dest, e);
                        None
                    }
                };
                self.log(state, file, &dest, Ok(checksum));
                ProcessResult {
                    original_path: file.unchanged_path.clone(),
                    new_path: dest,
                    success: true,
                    error: None,
                    outcome: Outcome::Renamed,
                }
            }
            Err(e) => {
                let error = NomnomError::Rename(format!("{:?} -> {:?}: {}", current, dest, e)).to_string();
                warn!("{}", error);
                self.log(state, file, &dest, Err(error.clone()));
                ProcessResult {
                    original_path: file.unchanged_path.clone(),
                    new_path: current,
                    success: false,
                    error: Some(error),
                    outcome: Outcome::Failed,
                }
            }
        }
    }

    fn log(
        &self,
        state: &mut RenameState<'_>,
        file: &FileRecord,
        dest: &Path,
        outcome: std::result::Result<Option<String>, String>,
    ) {
        let journal = match &self.journal {
            Some(journal) => journal,
            None => return,
        };

        let entry = ChangeLogEntry::new(OperationKind::Rename, &file.unchanged_path, dest, state.root, outcome);
        if let Err(e) = journal.record(entry) {
            warn!("{}", e);
            state.journal_error.get_or_insert(e);
        }
    }
}

/// Bookkeeping shared by the renames of one run
struct RenameState<'a> {
    root: &'a Path,
    /// Paths of this run's files before any rename
    known: &'a HashSet<PathBuf>,
    /// Paths currently occupied by this run's files
    claimed: &'a mut HashSet<PathBuf>,
    journal_error: Option<NomnomError>,
}

impl RenameState<'_> {
    fn claim(&mut self, from: &Path, to: &Path) {
        self.claimed.remove(from);
        self.claimed.insert(to.to_path_buf());
    }
}
