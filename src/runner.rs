// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! The full scan → suggest → process pipeline for one run

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{info, warn};

use crate::approval::{ApprovalGate, ApprovalOracle};
use crate::config::AppConfig;
use crate::decoders::DecoderRegistry;
use crate::journal::{default_log_dir, Journal};
use crate::processor::{ProcessOptions, ProcessResult, RunSummary, SafeProcessor};
use crate::providers::{default_model, CompletionService};
use crate::scanner::{ScanOptions, TreeBuilder};
use crate::suggest::{EngineOptions, NameSuggestionEngine, SuggestionStats, VisionOptions};
use crate::tree::FolderNode;
use crate::{NomnomError, Result};

/// Command-line switches that override or complement the config
#[derive(Debug, Clone)]
pub struct RunFlags {
    pub dry_run: bool,
    pub auto_approve: bool,
    pub organize: bool,
    pub logging: bool,
    pub prompt: Option<String>,
}

impl Default for RunFlags {
    fn default() -> Self {
        Self {
            dry_run: true,
            auto_approve: false,
            organize: true,
            logging: true,
            prompt: None,
        }
    }
}

/// Everything one run needs to know
#[derive(Debug, Clone)]
pub struct Job {
    pub root: PathBuf,
    /// Output root; `<root>/nomnom/renamed` when unset
    pub output: Option<PathBuf>,
    /// Journal directory; `<root>/nomnom/logs` when unset
    pub log_dir: Option<PathBuf>,
    pub prompt: String,
    pub workers: usize,
    pub scan: ScanOptions,
    pub engine: EngineOptions,
    pub dry_run: bool,
    pub auto_approve: bool,
    pub organize: bool,
    pub logging: bool,
}

impl Job {
    pub fn from_config(config: &AppConfig, root: PathBuf, flags: RunFlags) -> Result<Self> {
        config.validate()?;

        let vision = if config.ai.vision.enabled {
            Some(VisionOptions {
                max_image_bytes: config.max_image_size()?,
            })
        } else {
            None
        };

        Ok(Self {
            root,
            output: config.output.as_ref().map(PathBuf::from),
            log_dir: config.logging.log_path.as_ref().map(PathBuf::from),
            prompt: config.resolve_prompt(flags.prompt.as_deref()),
            workers: config.performance.workers,
            scan: ScanOptions {
                max_size: Some(config.max_file_size()?),
                max_content_length: config.content_extraction.max_content_length,
                exclude: Vec::new(),
            },
            engine: EngineOptions {
                model: default_model(&config.ai),
                timeout: Duration::from_secs(config.performance.timeout_secs),
                retries: config.performance.retries,
                case: config.case,
                vision,
            },
            dry_run: flags.dry_run,
            auto_approve: flags.auto_approve || config.file_handling.auto_approve,
            organize: flags.organize,
            logging: flags.logging && config.logging.enabled,
        })
    }
}

/// What a run produced
#[derive(Debug)]
pub struct RunReport {
    /// Scanned tree with suggestions filled in
    pub tree: FolderNode,
    pub suggestions: SuggestionStats,
    pub results: Vec<ProcessResult>,
    pub summary: RunSummary,
    pub journal_path: Option<PathBuf>,
    /// Journal write failure; the renames themselves stand
    pub journal_error: Option<NomnomError>,
}

/// Run the whole pipeline. Only setup failures are returned as errors.
pub async fn run(
    job: &Job,
    service: Arc<dyn CompletionService>,
    oracle: Arc<dyn ApprovalOracle>,
    decoders: Arc<DecoderRegistry>,
) -> Result<RunReport> {
    let root = std::fs::canonicalize(&job.root)
        .map_err(|e| NomnomError::Scan(format!("Cannot read scan root {:?}: {}", job.root, e)))?;
    let output = job
        .output
        .clone()
        .unwrap_or_else(|| root.join("nomnom").join("renamed"));
    let log_dir = job.log_dir.clone().unwrap_or_else(|| default_log_dir(&root));

    if !job.dry_run {
        std::fs::create_dir_all(&output).map_err(|e| {
            NomnomError::Config(format!("Cannot create output root {:?}: {}", output, e))
        })?;
    }

    let journal = if job.logging && !job.dry_run {
        Some(Arc::new(Journal::create_in(&log_dir)?))
    } else {
        None
    };

    let mut scan = job.scan.clone();
    scan.exclude.extend(excluded_dirs(&root, &[&output, &log_dir]));

    let pool = Arc::new(Semaphore::new(job.workers.max(1)));
    let builder = TreeBuilder::new(scan, decoders, pool.clone());
    let mut tree = builder.build(&root).await?;

    let engine = NameSuggestionEngine::new(service, &job.prompt, job.engine.clone(), pool);
    let suggestions = engine.suggest(&mut tree).await?;

    let gate = Arc::new(ApprovalGate::new(oracle, job.auto_approve));
    let processor = SafeProcessor::new(
        ProcessOptions {
            output,
            dry_run: job.dry_run,
            organize: job.organize,
        },
        gate,
        journal.clone(),
    );

    let (report, tree) = tokio::task::spawn_blocking(move || {
        let report = processor.process(&tree);
        (report, tree)
    })
    .await
    .map_err(|e| NomnomError::Rename(format!("processing task failed: {}", e)))?;

    let mut journal_error = report.journal_error;
    let journal_path = match &journal {
        Some(journal) => {
            if let Err(e) = journal.finalize() {
                warn!("{}", e);
                journal_error.get_or_insert(e);
            }
            Some(journal.path().to_path_buf())
        }
        None => None,
    };

    let summary = RunSummary::from_results(&report.results);
    info!(
        "Run complete: {} renamed, {} failed, {} unchanged",
        summary.renamed, summary.failed, summary.unchanged
    );

    Ok(RunReport {
        tree,
        suggestions,
        results: report.results,
        summary,
        journal_path,
        journal_error,
    })
}

/// The tool's own directories below the root are never scanned
fn excluded_dirs(root: &Path, extra: &[&Path]) -> Vec<PathBuf> {
    let mut dirs = vec![root.join("nomnom")];
    for dir in extra {
        let dir = std::fs::canonicalize(dir).unwrap_or_else(|_| dir.to_path_buf());
        if dir.starts_with(root) {
            dirs.push(dir);
        }
    }
    dirs
}
