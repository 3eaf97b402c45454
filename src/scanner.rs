// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Directory scanning into a [`FolderNode`] tree
//!
//! Directory listings and per-file decoding run on blocking threads under
//! the run's shared semaphore. A permit is only held for the blocking work
//! itself, never while waiting on children, so a pool of one worker still
//! makes progress through arbitrarily deep trees.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::decoders::DecoderRegistry;
use crate::tree::{format_size, FileRecord, FolderNode};
use crate::{NomnomError, Result};

/// Scan settings
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Files larger than this are left out of the tree
    pub max_size: Option<u64>,
    /// Decoded content is cut to this many characters
    pub max_content_length: usize,
    /// Directories that are never entered (output and log roots)
    pub exclude: Vec<PathBuf>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            max_size: None,
            max_content_length: 5000,
            exclude: Vec::new(),
        }
    }
}

/// Check if a file should be processed
pub fn should_process(path: &Path) -> bool {
    let filename = match path.file_name().and_then(|n| n.to_str()) {
        Some(n) => n,
        None => return false,
    };

    // hidden files, editor backups
    if filename.starts_with('.') || filename.ends_with('~') {
        return false;
    }

    let temp_extensions = [".tmp", ".swp", ".part", ".crdownload", ".partial", ".download"];
    let lower = filename.to_lowercase();
    if temp_extensions.iter().any(|ext| lower.ends_with(ext)) {
        return false;
    }

    let skip_names = ["desktop.ini", "thumbs.db"];
    if skip_names.iter().any(|n| filename.eq_ignore_ascii_case(n)) {
        return false;
    }

    true
}

/// One directory entry, classified on the blocking pool
enum Entry {
    File { path: PathBuf, size: u64 },
    Dir(PathBuf),
}

type ScanFuture = Pin<Box<dyn Future<Output = Result<FolderNode>> + Send>>;

/// Builds the folder tree for a scan root
#[derive(Clone)]
pub struct TreeBuilder {
    options: Arc<ScanOptions>,
    decoders: Arc<DecoderRegistry>,
    pool: Arc<Semaphore>,
}

impl TreeBuilder {
    pub fn new(options: ScanOptions, decoders: Arc<DecoderRegistry>, pool: Arc<Semaphore>) -> Self {
        Self {
            options: Arc::new(options),
            decoders,
            pool,
        }
    }

    /// Scan `root` recursively. Only an unreadable root is an error;
    /// anything below it that fails is logged and left out.
    pub async fn build(&self, root: &Path) -> Result<FolderNode> {
        let root = std::fs::canonicalize(root)
            .map_err(|e| NomnomError::Scan(format!("Cannot read scan root {:?}: {}", root, e)))?;
        if !root.is_dir() {
            return Err(NomnomError::Scan(format!("{:?} is not a directory", root)));
        }

        info!("Scanning {:?}", root);
        let tree = self.clone().scan_dir(root).await?;
        info!("Scan complete: {} files", tree.file_count());
        Ok(tree)
    }

    fn scan_dir(self, dir: PathBuf) -> ScanFuture {
        Box::pin(async move {
            let entries = self.list(dir.clone()).await?;
            let mut node = FolderNode::new(dir.clone());

            let mut file_paths = Vec::new();
            let mut dir_paths = Vec::new();
            for entry in entries {
                match entry {
                    Entry::File { path, size } => file_paths.push((path, size)),
                    Entry::Dir(path) => dir_paths.push(path),
                }
            }

            // subdirectories are scanned concurrently with this folder's files
            let mut subdirs: JoinSet<(usize, Result<FolderNode>)> = JoinSet::new();
            for (idx, path) in dir_paths.into_iter().enumerate() {
                let builder = self.clone();
                subdirs.spawn(async move { (idx, builder.scan_dir(path).await) });
            }

            let mut decoded: JoinSet<(usize, Result<FileRecord>)> = JoinSet::new();
            for (idx, (path, size)) in file_paths.into_iter().enumerate() {
                let permit = self
                    .pool
                    .clone()
                    .acquire_owned()
                    .await
                    .map_err(|_| NomnomError::Scan("worker pool closed".to_string()))?;
                let decoders = self.decoders.clone();
                let max_len = self.options.max_content_length;

                decoded.spawn_blocking(move || {
                    let _permit = permit;
                    (idx, read_file(&decoders, path, size, max_len))
                });
            }

            let mut files: Vec<Option<FileRecord>> = Vec::new();
            while let Some(joined) = decoded.join_next().await {
                match joined {
                    Ok((idx, Ok(record))) => put(&mut files, idx, record),
                    Ok((_, Err(e))) => warn!("Skipping file in {:?}: {}", dir, e),
                    Err(e) => warn!("File task in {:?} failed: {}", dir, e),
                }
            }
            node.files = files.into_iter().flatten().collect();

            let mut folders: Vec<Option<FolderNode>> = Vec::new();
            while let Some(joined) = subdirs.join_next().await {
                match joined {
                    Ok((idx, Ok(sub))) => put(&mut folders, idx, sub),
                    Ok((_, Err(e))) => warn!("Skipping folder below {:?}: {}", dir, e),
                    Err(e) => warn!("Folder task below {:?} failed: {}", dir, e),
                }
            }
            node.subfolders = folders.into_iter().flatten().collect();

            debug!(
                "Scanned {:?}: {} files, {} folders",
                dir,
                node.files.len(),
                node.subfolders.len()
            );
            Ok(node)
        })
    }

    /// List and classify a directory, sorted by name
    async fn list(&self, dir: PathBuf) -> Result<Vec<Entry>> {
        let permit = self
            .pool
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| NomnomError::Scan("worker pool closed".to_string()))?;
        let options = self.options.clone();

        tokio::task::spawn_blocking(move || {
            let _permit = permit;
            list_dir(&dir, &options)
        })
        .await
        .map_err(|e| NomnomError::Scan(format!("listing task failed: {}", e)))?
    }
}

fn put<T>(slots: &mut Vec<Option<T>>, idx: usize, value: T) {
    if slots.len() <= idx {
        slots.resize_with(idx + 1, || None);
    }
    slots[idx] = Some(value);
}

fn list_dir(dir: &Path, options: &ScanOptions) -> Result<Vec<Entry>> {
    let read = std::fs::read_dir(dir)
        .map_err(|e| NomnomError::Scan(format!("Cannot read {:?}: {}", dir, e)))?;

    let mut paths: Vec<PathBuf> = Vec::new();
    for entry in read {
        match entry {
            Ok(entry) => paths.push(entry.path()),
            Err(e) => warn!("Unreadable entry in {:?}: {}", dir, e),
        }
    }
    paths.sort();

    let mut entries = Vec::new();
    for path in paths {
        // symlinks are never followed
        let meta = match std::fs::symlink_metadata(&path) {
            Ok(meta) => meta,
            Err(e) => {
                warn!("Cannot stat {:?}: {}", path, e);
                continue;
            }
        };

        if meta.is_dir() {
            let hidden = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with('.'));
            if hidden || options.exclude.iter().any(|ex| ex == &path) {
                debug!("Not descending into {:?}", path);
                continue;
            }
            entries.push(Entry::Dir(path));
        } else if meta.is_file() {
            if !should_process(&path) {
                debug!("Skipping {:?}", path);
                continue;
            }
            if options.max_size.is_some_and(|max| meta.len() > max) {
                info!("Skipping {:?}: {} exceeds size limit", path, format_size(meta.len()));
                continue;
            }
            entries.push(Entry::File {
                path,
                size: meta.len(),
            });
        } else {
            debug!("Skipping special file {:?}", path);
        }
    }

    Ok(entries)
}

/// Decode one file into a record. A decode failure still yields a record
/// with placeholder content; only a vanished file is an error.
fn read_file(decoders: &DecoderRegistry, path: PathBuf, size: u64, max_len: usize) -> Result<FileRecord> {
    if !path.is_file() {
        return Err(NomnomError::Scan(format!("{:?} disappeared during the scan", path)));
    }

    let content = match decoders.decode(&path) {
        Ok(text) => truncate_chars(&text, max_len),
        Err(e) => {
            warn!("Could not decode {:?}: {}", path, e);
            String::from("(content unavailable)")
        }
    };

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let folder = path
        .parent()
        .map(|p| p.display().to_string())
        .unwrap_or_default();
    let ext = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    let context = format!(
        "Content: {}\nFile: {}\nFolder: {}\nType: {}\nSize: {}",
        content,
        name,
        folder,
        ext,
        format_size(size)
    );

    Ok(FileRecord::new(path, size, context))
}

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}
