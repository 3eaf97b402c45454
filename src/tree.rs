// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! In-memory snapshot of a scanned directory hierarchy

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const KB: u64 = 1024;
const MB: u64 = 1024 * KB;
const GB: u64 = 1024 * MB;

/// Per-file metadata, derived context and suggested-name state
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FileRecord {
    /// Original file name
    pub name: String,
    /// Validated suggestion; `None` until a name has been accepted
    pub new_name: Option<String>,
    /// Absolute path of the file as it was scanned. Never changes.
    pub unchanged_path: PathBuf,
    /// Current working path (moves into the output root after copying)
    pub path: PathBuf,
    /// Text sent to the completion service
    pub context: String,
    pub size: u64,
    pub formatted_size: String,
    /// Why the last suggestion attempt failed
    pub failed_reason: Option<String>,
}

impl FileRecord {
    pub fn new(path: PathBuf, size: u64, context: String) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        Self {
            name,
            new_name: None,
            unchanged_path: path.clone(),
            path,
            context,
            size,
            formatted_size: format_size(size),
            failed_reason: None,
        }
    }

    /// Extension of the original file name, without the dot
    pub fn extension(&self) -> Option<&str> {
        Path::new(&self.name).extension().and_then(|e| e.to_str())
    }

    /// True while the file is waiting for a retry
    pub fn is_failed(&self) -> bool {
        self.new_name.is_none() && self.failed_reason.is_some()
    }
}

/// A scanned folder. Children are owned exclusively by their parent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FolderNode {
    pub name: String,
    pub path: PathBuf,
    pub files: Vec<FileRecord>,
    pub subfolders: Vec<FolderNode>,
}

impl FolderNode {
    pub fn new(path: PathBuf) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned());

        Self {
            name,
            path,
            files: Vec::new(),
            subfolders: Vec::new(),
        }
    }

    /// Number of files in this folder and every folder below it
    pub fn file_count(&self) -> usize {
        self.files.len()
            + self
                .subfolders
                .iter()
                .map(FolderNode::file_count)
                .sum::<usize>()
    }

    /// All files, depth-first, in tree order
    pub fn all_files(&self) -> Vec<&FileRecord> {
        let mut out: Vec<&FileRecord> = self.files.iter().collect();
        for sub in &self.subfolders {
            out.extend(sub.all_files());
        }
        out
    }
}

/// Format a byte count for human display
pub fn format_size(size: u64) -> String {
    if size < KB {
        format!("{}B", size)
    } else if size < MB {
        format!("{:.2}KB", size as f64 / KB as f64)
    } else if size < GB {
        format!("{:.2}MB", size as f64 / MB as f64)
    } else {
        format!("{:.2}GB", size as f64 / GB as f64)
    }
}
