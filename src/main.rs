// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! nomnom: bulk AI file renamer

use anyhow::Context;
use clap::{ArgAction, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use nomnom::approval::{AlwaysApprove, ApprovalOracle, ConsolePrompt};
use nomnom::config::AppConfig;
use nomnom::decoders::DecoderRegistry;
use nomnom::journal::{self, default_log_dir};
use nomnom::processor::Outcome;
use nomnom::providers::{CompletionService, Provider};
use nomnom::revert::{self, RevertOptions, RevertStatus};
use nomnom::runner::{self, Job, RunFlags};

/// nomnom CLI - bulk AI file renamer
#[derive(Parser, Debug)]
#[command(name = "nomnom")]
#[command(author = "Jonathan D. A. Jewell <hyperpolymath>")]
#[command(version)]
#[command(about = "Rename files in bulk with descriptive AI-suggested names", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (JSON format)
    #[arg(short, long, default_value = "config.json", global = true)]
    config: PathBuf,

    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable trace logging (most verbose)
    #[arg(long, global = true)]
    trace: bool,

    /// Suppress non-essential output (quiet mode)
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Scan a directory and rename copies of its files
    Run {
        /// Directory to process
        #[arg(short, long)]
        dir: PathBuf,

        /// Approve every rename without asking
        #[arg(short = 'y', long)]
        auto_approve: bool,

        /// Preview the renames without touching the disk
        #[arg(short = 'n', long, default_value_t = true, action = ArgAction::Set)]
        dry_run: bool,

        /// Record the renames in a change journal
        #[arg(short, long = "log", default_value_t = true, action = ArgAction::Set)]
        log: bool,

        /// Sort files into category folders instead of mirroring the source layout
        #[arg(short, long, default_value_t = true, action = ArgAction::Set)]
        organize: bool,

        /// System prompt, or a preset name (research, images)
        #[arg(short, long)]
        prompt: Option<String>,
    },

    /// Restore the files of a journaled session
    Revert {
        /// Journal file of the session
        journal: PathBuf,

        /// Approve every restore without asking
        #[arg(short = 'y', long)]
        auto_approve: bool,

        /// Show what would be restored
        #[arg(short = 'n', long)]
        dry_run: bool,

        /// Record the restores in a new journal
        #[arg(short, long = "log", default_value_t = true, action = ArgAction::Set)]
        log: bool,
    },

    /// List the change journals of a directory
    Logs {
        /// Scanned directory (or a journal directory with --raw)
        #[arg(short, long, default_value = ".")]
        dir: PathBuf,

        /// Treat --dir as the journal directory itself
        #[arg(long)]
        raw: bool,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Generate default configuration file
    Generate {
        /// Output file path
        #[arg(short, long, default_value = "config.json")]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else if cli.quiet {
        "warn"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let config = AppConfig::load(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;

    match cli.command {
        Commands::Run {
            dir,
            auto_approve,
            dry_run,
            log,
            organize,
            prompt,
        } => {
            let flags = RunFlags {
                dry_run,
                auto_approve,
                organize,
                logging: log,
                prompt,
            };
            run_pipeline(&config, dir, flags, cli.quiet).await
        }
        Commands::Revert {
            journal,
            auto_approve,
            dry_run,
            log,
        } => {
            let options = RevertOptions {
                journal_path: journal,
                logging: log,
                auto_approve,
                dry_run,
            };
            run_revert(options).await
        }
        Commands::Logs { dir, raw } => run_logs(&dir, raw),
        Commands::Config { action } => run_config_command(&config, action, &cli.config),
    }
}

/// Scan, suggest, and rename one directory
async fn run_pipeline(config: &AppConfig, dir: PathBuf, flags: RunFlags, quiet: bool) -> anyhow::Result<()> {
    if flags.dry_run {
        warn!("DRY RUN MODE - nothing will be copied or renamed");
    }

    let job = Job::from_config(config, dir, flags)?;

    let provider = Provider::from_config(&config.ai).context("setting up the completion provider")?;
    if let Provider::Ollama(client) = &provider {
        match client.health_check().await {
            Ok(()) => match client.has_model(&job.engine.model).await {
                Ok(true) => info!("Model '{}' available", job.engine.model),
                Ok(false) => warn!(
                    "Model '{}' is not installed. Try: ollama pull {}",
                    job.engine.model, job.engine.model
                ),
                Err(e) => warn!("Cannot list Ollama models: {}", e),
            },
            Err(e) => warn!("Ollama at {} is not answering: {}", client.base_url(), e),
        }
    }
    let service: Arc<dyn CompletionService> = Arc::new(provider);

    let oracle: Arc<dyn ApprovalOracle> = if job.auto_approve || job.dry_run {
        Arc::new(AlwaysApprove)
    } else {
        Arc::new(ConsolePrompt::new())
    };

    let decoders = Arc::new(DecoderRegistry::new());
    info!("Loaded {} decoders: {:?}", decoders.len(), decoders.decoder_names());

    let report = runner::run(&job, service, oracle, decoders)
        .await
        .with_context(|| format!("processing {}", job.root.display()))?;

    if !quiet {
        for result in &report.results {
            let marker = match result.outcome {
                Outcome::Renamed => "→",
                Outcome::Unchanged => "=",
                Outcome::Rejected => "-",
                Outcome::NoSuggestion | Outcome::Failed => "✗",
            };
            match &result.error {
                Some(error) => println!("  {} {}: {}", marker, result.original_path.display(), error),
                None => println!(
                    "  {} {} -> {}",
                    marker,
                    result.original_path.display(),
                    result.new_path.display()
                ),
            }
        }
    }

    println!(
        "\n{} files: {} renamed, {} failed, {} unchanged ({} completion calls)",
        report.tree.file_count(),
        report.summary.renamed,
        report.summary.failed,
        report.summary.unchanged,
        report.suggestions.attempts
    );
    if let Some(path) = &report.journal_path {
        println!("Journal: {}", path.display());
    }
    if let Some(e) = &report.journal_error {
        warn!("The journal is incomplete: {}", e);
    }

    Ok(())
}

/// Replay a journal into the reverted folder
async fn run_revert(options: RevertOptions) -> anyhow::Result<()> {
    let oracle: Arc<dyn ApprovalOracle> = if options.auto_approve || options.dry_run {
        Arc::new(AlwaysApprove)
    } else {
        Arc::new(ConsolePrompt::new())
    };

    let journal_path = options.journal_path.clone();
    let report = tokio::task::spawn_blocking(move || revert::revert(&options, oracle))
        .await
        .context("revert task failed")?
        .with_context(|| format!("reverting {}", journal_path.display()))?;

    for (action, status) in report.plan.actions.iter().zip(&report.statuses) {
        match status {
            RevertStatus::Restored(target) => {
                println!("  → {} -> {}", action.source.display(), target.display())
            }
            RevertStatus::Planned => {
                println!("  ? {} -> {}", action.source.display(), action.target.display())
            }
            RevertStatus::NotApproved => println!("  - {}", action.source.display()),
            RevertStatus::Failed(e) => println!("  ✗ {}: {}", action.source.display(), e),
        }
    }

    println!(
        "\nSession {}: {} restored, {} failed, {} skipped",
        report.plan.session_id,
        report.restored(),
        report.failed(),
        report.plan.skipped.len()
    );
    if let Some(path) = &report.journal_path {
        println!("Journal: {}", path.display());
    }
    if let Some(e) = &report.journal_error {
        warn!("The journal is incomplete: {}", e);
    }

    Ok(())
}

/// List session journals
fn run_logs(dir: &Path, raw: bool) -> anyhow::Result<()> {
    let log_dir = if raw { dir.to_path_buf() } else { default_log_dir(dir) };
    let logs = journal::list_logs(&log_dir)?;

    if logs.is_empty() {
        println!("No journals in {}", log_dir.display());
        return Ok(());
    }

    println!("Journals in {}:", log_dir.display());
    for path in logs {
        match journal::load(&path) {
            Ok(log) => {
                let state = if log.end_time.is_some() { "" } else { " [incomplete]" };
                println!(
                    "  {} {} ({} of {} succeeded){}",
                    log.session_id,
                    log.start_time.format("%Y-%m-%d %H:%M"),
                    log.successful().count(),
                    log.entries.len(),
                    state
                );
            }
            Err(e) => println!("  {}: {}", path.display(), e),
        }
    }

    Ok(())
}

/// Run config commands
fn run_config_command(config: &AppConfig, action: ConfigCommands, config_path: &Path) -> anyhow::Result<()> {
    match action {
        ConfigCommands::Show => {
            info!("Configuration from {:?}", config_path);
            println!("{}", serde_json::to_string_pretty(config)?);
        }
        ConfigCommands::Generate { output } => {
            AppConfig::default().save(&output)?;
            println!("Generated config at {:?}", output);
        }
    }

    Ok(())
}
