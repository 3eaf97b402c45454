// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Name suggestion engine
//!
//! Each folder's files are sent to the completion service as one batch
//! bounded by the shared semaphore. Once the batch has fully drained, files
//! without an accepted name are sent again, up to `retries` more times.
//! Subfolders are handled depth-first after their parent.

use std::collections::HashMap;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::decoders::image::{encode_for_vision, is_image};
use crate::naming::{finalize_suggestion, CaseStyle, NameRejection};
use crate::providers::{CompletionRequest, CompletionService, UserContent};
use crate::tree::{FileRecord, FolderNode};
use crate::{NomnomError, Result};

/// Vision payload settings
#[derive(Debug, Clone)]
pub struct VisionOptions {
    /// Images above this size are described by text instead
    pub max_image_bytes: u64,
}

#[derive(Debug, Clone)]
pub struct EngineOptions {
    pub model: String,
    pub timeout: Duration,
    pub retries: u32,
    pub case: CaseStyle,
    pub vision: Option<VisionOptions>,
}

/// Totals for one suggestion pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SuggestionStats {
    /// Files that ended with a valid name
    pub accepted: usize,
    /// Files left without a name after every retry
    pub failed: usize,
    /// Completion requests sent
    pub attempts: usize,
}

/// Result of a single completion attempt
#[derive(Debug)]
enum Attempt {
    Accepted(String),
    /// The response did not pass validation
    Rejected { suggestion: String, rejection: NameRejection },
    /// Timeout, transport error or empty response
    Failed(String),
}

/// What a worker needs to know about a file
struct FileJob {
    name: String,
    path: PathBuf,
    size: u64,
    context: String,
}

type FolderFuture<'a> = Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

pub struct NameSuggestionEngine {
    service: Arc<dyn CompletionService>,
    prompt: Arc<str>,
    options: Arc<EngineOptions>,
    pool: Arc<Semaphore>,
}

impl NameSuggestionEngine {
    pub fn new(
        service: Arc<dyn CompletionService>,
        prompt: &str,
        options: EngineOptions,
        pool: Arc<Semaphore>,
    ) -> Self {
        Self {
            service,
            prompt: Arc::from(prompt),
            options: Arc::new(options),
            pool,
        }
    }

    /// Fill in `new_name` for every file of the tree that gets a valid
    /// suggestion. Per-file failures are recorded in `failed_reason`.
    pub async fn suggest(&self, root: &mut FolderNode) -> Result<SuggestionStats> {
        let mut stats = SuggestionStats::default();
        info!(
            "Requesting names for {} files from {}",
            root.file_count(),
            self.service.name()
        );
        self.process_folder(root, &mut stats).await?;
        info!(
            "Suggestions done: {} accepted, {} failed, {} requests",
            stats.accepted, stats.failed, stats.attempts
        );
        Ok(stats)
    }

    fn process_folder<'a>(
        &'a self,
        folder: &'a mut FolderNode,
        stats: &'a mut SuggestionStats,
    ) -> FolderFuture<'a> {
        Box::pin(async move {
            if !folder.files.is_empty() {
                let all: Vec<usize> = (0..folder.files.len()).collect();
                self.run_batch(folder, &all, stats).await?;

                for round in 1..=self.options.retries {
                    let pending: Vec<usize> = folder
                        .files
                        .iter()
                        .enumerate()
                        .filter(|(_, f)| f.new_name.is_none())
                        .map(|(i, _)| i)
                        .collect();
                    if pending.is_empty() {
                        break;
                    }

                    info!(
                        "Retry {}/{} for {} files in {:?}",
                        round,
                        self.options.retries,
                        pending.len(),
                        folder.path
                    );
                    self.run_batch(folder, &pending, stats).await?;
                }

                for file in &folder.files {
                    match &file.new_name {
                        Some(_) => stats.accepted += 1,
                        None => {
                            warn!(
                                "No valid name for {:?}: {}",
                                file.unchanged_path,
                                file.failed_reason.as_deref().unwrap_or("unknown")
                            );
                            stats.failed += 1;
                        }
                    }
                }
            }

            for sub in &mut folder.subfolders {
                self.process_folder(sub, stats).await?;
            }
            Ok(())
        })
    }

    /// Send one request per index and write the outcomes back by index
    async fn run_batch(
        &self,
        folder: &mut FolderNode,
        indices: &[usize],
        stats: &mut SuggestionStats,
    ) -> Result<()> {
        let mut set: JoinSet<(usize, Attempt)> = JoinSet::new();

        for &idx in indices {
            let file = &folder.files[idx];
            let job = FileJob {
                name: file.name.clone(),
                path: file.path.clone(),
                size: file.size,
                context: file.context.clone(),
            };

            let permit = self
                .pool
                .clone()
                .acquire_owned()
                .await
                .map_err(|_| NomnomError::Completion("worker pool closed".to_string()))?;
            let service = self.service.clone();
            let prompt = self.prompt.clone();
            let options = self.options.clone();

            stats.attempts += 1;
            set.spawn(async move {
                let _permit = permit;
                (idx, attempt(service.as_ref(), &prompt, &options, job).await)
            });
        }

        let mut outcomes: HashMap<usize, Attempt> = HashMap::with_capacity(indices.len());
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((idx, outcome)) => {
                    outcomes.insert(idx, outcome);
                }
                Err(e) => warn!("Completion task failed: {}", e),
            }
        }

        for &idx in indices {
            let outcome = outcomes
                .remove(&idx)
                .unwrap_or_else(|| Attempt::Failed("completion task aborted".to_string()));
            apply(&mut folder.files[idx], outcome);
        }
        Ok(())
    }
}

async fn attempt(
    service: &dyn CompletionService,
    prompt: &str,
    options: &EngineOptions,
    job: FileJob,
) -> Attempt {
    let content = match user_content(options, &job).await {
        Ok(content) => content,
        Err(e) => return Attempt::Failed(e.to_string()),
    };

    let request = CompletionRequest {
        system_prompt: prompt.to_string(),
        content,
        model: options.model.clone(),
        timeout: options.timeout,
    };

    let raw = match tokio::time::timeout(options.timeout, service.complete(&request)).await {
        Ok(Ok(raw)) => raw,
        Ok(Err(e)) => return Attempt::Failed(e.to_string()),
        Err(_) => return Attempt::Failed(NomnomError::Timeout(options.timeout).to_string()),
    };

    if raw.trim().is_empty() {
        return Attempt::Failed("empty response".to_string());
    }

    match finalize_suggestion(&raw, &job.name, options.case) {
        Ok(name) => {
            debug!("{} -> {}", job.name, name);
            Attempt::Accepted(name)
        }
        Err(rejection) => Attempt::Rejected {
            suggestion: raw.trim().to_string(),
            rejection,
        },
    }
}

/// Text context, or an image payload when vision applies to the file
async fn user_content(options: &EngineOptions, job: &FileJob) -> Result<UserContent> {
    let vision = match &options.vision {
        Some(v) if is_image(&job.path) && job.size <= v.max_image_bytes => v,
        _ => return Ok(UserContent::Text(job.context.clone())),
    };
    debug!("Sending {:?} as an image (limit {} bytes)", job.path, vision.max_image_bytes);

    let path = job.path.clone();
    let (base64, media_type) = tokio::task::spawn_blocking(move || encode_for_vision(&path))
        .await
        .map_err(|e| NomnomError::Decode(format!("image task failed: {}", e)))??;
    Ok(UserContent::Image { base64, media_type })
}

fn apply(file: &mut FileRecord, outcome: Attempt) {
    match outcome {
        Attempt::Accepted(name) => {
            file.new_name = Some(name);
            file.failed_reason = None;
        }
        Attempt::Rejected { suggestion, rejection } => {
            debug!("Rejected {:?} for {}: {}", suggestion, file.name, rejection);
            file.new_name = None;
            file.context.push_str(&format!(
                "\n\nA previous suggestion {:?} was rejected because {}. \
                 Respond with a different, valid file name.",
                suggestion, rejection
            ));
            file.failed_reason = Some(NomnomError::from(rejection).to_string());
        }
        Attempt::Failed(reason) => {
            debug!("Completion failed for {}: {}", file.name, reason);
            file.new_name = None;
            file.failed_reason = Some(reason);
        }
    }
}
