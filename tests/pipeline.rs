// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! End-to-end runs against a scripted completion service

use async_trait::async_trait;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use nomnom::approval::{AlwaysApprove, Approval, ApprovalOracle};
use nomnom::decoders::DecoderRegistry;
use nomnom::journal;
use nomnom::naming::CaseStyle;
use nomnom::processor::Outcome;
use nomnom::providers::{CompletionRequest, CompletionService, UserContent};
use nomnom::revert::{self, revert_dir, RevertOptions, RevertStatus};
use nomnom::runner::{run, Job, RunReport};
use nomnom::scanner::ScanOptions;
use nomnom::suggest::EngineOptions;
use nomnom::{NomnomError, Result};

/// Answers by file name; each call pops the next scripted answer and the
/// last one repeats
struct Scripted {
    answers: Mutex<HashMap<String, Vec<String>>>,
    calls: Mutex<Vec<String>>,
}

impl Scripted {
    fn new(answers: &[(&str, &[&str])]) -> Arc<Self> {
        let answers = answers
            .iter()
            .map(|(file, list)| (file.to_string(), list.iter().map(|a| a.to_string()).collect()))
            .collect();
        Arc::new(Self {
            answers: Mutex::new(answers),
            calls: Mutex::new(Vec::new()),
        })
    }

    fn calls_for(&self, file: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| *c == file).count()
    }
}

#[async_trait]
impl CompletionService for Scripted {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let file = match &request.content {
            UserContent::Text(text) => text
                .lines()
                .find_map(|l| l.strip_prefix("File: "))
                .unwrap_or_default()
                .to_string(),
            UserContent::Image { .. } => return Err(NomnomError::Completion("no vision".into())),
        };
        self.calls.lock().unwrap().push(file.clone());

        let mut answers = self.answers.lock().unwrap();
        match answers.get_mut(&file) {
            Some(list) if list.len() > 1 => Ok(list.remove(0)),
            Some(list) => Ok(list[0].clone()),
            None => Err(NomnomError::Completion(format!("nothing scripted for {}", file))),
        }
    }
}

/// Records every question and answers with a fixed approval
struct Recording {
    answer: Approval,
    asked: AtomicUsize,
}

impl Recording {
    fn new(answer: Approval) -> Arc<Self> {
        Arc::new(Self {
            answer,
            asked: AtomicUsize::new(0),
        })
    }
}

impl ApprovalOracle for Recording {
    fn ask(&self, _old_name: &str, _new_name: &str) -> Result<Approval> {
        self.asked.fetch_add(1, Ordering::SeqCst);
        Ok(self.answer)
    }
}

fn job(root: &Path, dry_run: bool, organize: bool, retries: u32) -> Job {
    Job {
        root: root.to_path_buf(),
        output: None,
        log_dir: None,
        prompt: "name this file".into(),
        workers: 2,
        scan: ScanOptions::default(),
        engine: EngineOptions {
            model: "test-model".into(),
            timeout: Duration::from_secs(5),
            retries,
            case: CaseStyle::Snake,
            vision: None,
        },
        dry_run,
        auto_approve: false,
        organize,
        logging: true,
    }
}

async fn run_with(job: &Job, service: Arc<Scripted>, oracle: Arc<dyn ApprovalOracle>) -> RunReport {
    run(job, service, oracle, Arc::new(DecoderRegistry::new()))
        .await
        .unwrap()
}

fn root_of(dir: &tempfile::TempDir) -> PathBuf {
    dir.path().canonicalize().unwrap()
}

fn snapshot(dir: &Path) -> Vec<PathBuf> {
    let mut out = Vec::new();
    for entry in fs::read_dir(dir).unwrap() {
        let path = entry.unwrap().path();
        if path.is_dir() {
            out.extend(snapshot(&path));
        }
        out.push(path);
    }
    out.sort();
    out
}

#[tokio::test]
async fn test_hidden_files_are_not_scanned() {
    let dir = tempfile::tempdir().unwrap();
    let root = root_of(&dir);
    fs::write(root.join("report.pdf"), b"%PDF-1.4 quarterly numbers").unwrap();
    fs::write(root.join(".DS_Store"), b"junk").unwrap();

    let service = Scripted::new(&[("report.pdf", &["quarterly_report.pdf"])]);
    let report = run_with(&job(&root, true, true, 0), service.clone(), Arc::new(AlwaysApprove)).await;

    let names: Vec<&str> = report.tree.all_files().iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["report.pdf"]);
    assert_eq!(service.calls_for(".DS_Store"), 0);
}

#[tokio::test]
async fn test_suggestion_is_cleaned_before_renaming() {
    let dir = tempfile::tempdir().unwrap();
    let root = root_of(&dir);
    fs::write(root.join("report.pdf"), b"%PDF-1.4 plan for the first quarter").unwrap();

    let service = Scripted::new(&[("report.pdf", &["plan Q1.txt"])]);
    let report = run_with(&job(&root, false, false, 0), service, Arc::new(AlwaysApprove)).await;

    let renamed = root.join("nomnom").join("renamed").join("plan_q1.pdf");
    assert_eq!(report.results.len(), 1);
    assert_eq!(report.results[0].outcome, Outcome::Renamed);
    assert_eq!(report.results[0].new_path, renamed);
    assert!(renamed.exists());
    // the source is copied, never moved
    assert!(root.join("report.pdf").exists());
}

#[tokio::test]
async fn test_colliding_suggestions_are_disambiguated() {
    let dir = tempfile::tempdir().unwrap();
    let root = root_of(&dir);
    fs::write(root.join("a.txt"), "meeting notes from monday").unwrap();
    fs::write(root.join("b.txt"), "meeting notes from tuesday").unwrap();

    let service = Scripted::new(&[("a.txt", &["notes.txt"]), ("b.txt", &["notes.txt"])]);
    let report = run_with(&job(&root, false, false, 0), service, Arc::new(AlwaysApprove)).await;

    let out = root.join("nomnom").join("renamed");
    let new_paths: Vec<PathBuf> = report.results.iter().map(|r| r.new_path.clone()).collect();
    assert_eq!(new_paths, vec![out.join("notes.txt"), out.join("notes_1.txt")]);
    assert_eq!(
        fs::read_to_string(out.join("notes.txt")).unwrap(),
        "meeting notes from monday"
    );
    assert_eq!(
        fs::read_to_string(out.join("notes_1.txt")).unwrap(),
        "meeting notes from tuesday"
    );
    assert_eq!(report.summary.renamed, 2);
}

#[tokio::test]
async fn test_dry_run_is_repeatable_and_silent() {
    let dir = tempfile::tempdir().unwrap();
    let root = root_of(&dir);
    fs::create_dir(root.join("docs")).unwrap();
    fs::write(root.join("docs").join("a.txt"), "alpha").unwrap();
    fs::write(root.join("docs").join("b.txt"), "beta").unwrap();
    fs::write(root.join("c.md"), "gamma").unwrap();
    let before = snapshot(&root);

    let answers: &[(&str, &[&str])] = &[
        ("a.txt", &["notes.txt"]),
        ("b.txt", &["notes.txt"]),
        ("c.md", &["gamma.md"]),
    ];
    let oracle = Recording::new(Approval::Reject);
    let job = job(&root, true, true, 0);

    let first = run_with(&job, Scripted::new(answers), oracle.clone()).await;
    let second = run_with(&job, Scripted::new(answers), oracle.clone()).await;

    assert_eq!(first.results, second.results);
    assert_eq!(first.summary.renamed, 3);
    assert_eq!(oracle.asked.load(Ordering::SeqCst), 0);
    assert!(first.journal_path.is_none());
    assert_eq!(snapshot(&root), before);

    let predicted: Vec<String> = first
        .results
        .iter()
        .map(|r| r.new_path.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(predicted, vec!["gamma.md", "notes.txt", "notes_1.txt"]);
}

#[tokio::test]
async fn test_invalid_names_are_retried() {
    let dir = tempfile::tempdir().unwrap();
    let root = root_of(&dir);
    fs::write(root.join("scan.txt"), "invoice 42").unwrap();
    fs::write(root.join("junk.txt"), "???").unwrap();

    let service = Scripted::new(&[
        ("scan.txt", &["CON.txt", "invoice_42.txt"]),
        ("junk.txt", &["CON.txt"]),
    ]);
    let report = run_with(&job(&root, true, false, 2), service.clone(), Arc::new(AlwaysApprove)).await;

    assert_eq!(service.calls_for("scan.txt"), 2);
    // one first attempt plus two retries
    assert_eq!(service.calls_for("junk.txt"), 3);
    assert_eq!(report.suggestions.accepted, 1);
    assert_eq!(report.suggestions.failed, 1);

    let junk = report
        .results
        .iter()
        .find(|r| r.original_path.ends_with("junk.txt"))
        .unwrap();
    assert_eq!(junk.outcome, Outcome::NoSuggestion);
    assert_eq!(report.summary.failed, 1);
    assert_eq!(report.summary.renamed, 1);
}

#[tokio::test]
async fn test_rejected_renames_stay_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    let root = root_of(&dir);
    fs::write(root.join("a.txt"), "alpha").unwrap();

    let service = Scripted::new(&[("a.txt", &["alpha.txt"])]);
    let oracle = Recording::new(Approval::Reject);
    let report = run_with(&job(&root, false, false, 0), service, oracle.clone()).await;

    assert_eq!(oracle.asked.load(Ordering::SeqCst), 1);
    assert_eq!(report.results[0].outcome, Outcome::Rejected);
    assert_eq!(report.summary.unchanged, 1);
    // the copy exists under its old name
    assert!(root.join("nomnom").join("renamed").join("a.txt").exists());

    let log = journal::load(report.journal_path.as_ref().unwrap()).unwrap();
    assert!(log.entries.is_empty());
    assert!(log.end_time.is_some());
}

#[tokio::test]
async fn test_rename_then_revert_restores_layout() {
    let dir = tempfile::tempdir().unwrap();
    let root = root_of(&dir);
    fs::create_dir(root.join("docs")).unwrap();
    fs::write(root.join("docs").join("a.txt"), "alpha").unwrap();
    fs::write(root.join("photo.png"), b"not really a png").unwrap();

    let service = Scripted::new(&[
        ("a.txt", &["FirstLetter.txt"]),
        ("photo.png", &["holiday-photo.png"]),
    ]);
    let report = run_with(&job(&root, false, true, 0), service, Arc::new(AlwaysApprove)).await;
    assert_eq!(report.summary.renamed, 2);

    let out = root.join("nomnom").join("renamed");
    assert!(out.join("Documents").join("first_letter.txt").exists());
    assert!(out.join("Images").join("holiday_photo.png").exists());

    let journal_path = report.journal_path.clone().unwrap();
    let log = journal::load(&journal_path).unwrap();
    assert_eq!(log.successful().count(), 2);

    let options = RevertOptions {
        journal_path,
        logging: true,
        auto_approve: true,
        dry_run: false,
    };
    let reverted = revert::revert(&options, Arc::new(AlwaysApprove)).unwrap();
    assert_eq!(reverted.restored(), 2);
    assert_eq!(reverted.failed(), 0);
    assert!(reverted
        .statuses
        .iter()
        .all(|s| matches!(s, RevertStatus::Restored(_))));

    let restored = revert_dir(&root, &log.session_id);
    assert_eq!(
        fs::read_to_string(restored.join("docs").join("a.txt")).unwrap(),
        "alpha"
    );
    assert_eq!(fs::read(restored.join("photo.png")).unwrap(), b"not really a png");

    let revert_log = journal::load(reverted.journal_path.as_ref().unwrap()).unwrap();
    assert_eq!(revert_log.entries.len(), 2);
    assert_ne!(revert_log.session_id, log.session_id);
}

#[tokio::test]
async fn test_output_folder_is_not_rescanned() {
    let dir = tempfile::tempdir().unwrap();
    let root = root_of(&dir);
    fs::write(root.join("a.txt"), "alpha").unwrap();

    let answers: &[(&str, &[&str])] = &[("a.txt", &["alpha.txt"]), ("alpha.txt", &["alpha.txt"])];
    run_with(&job(&root, false, false, 0), Scripted::new(answers), Arc::new(AlwaysApprove)).await;

    let second = run_with(&job(&root, false, false, 0), Scripted::new(answers), Arc::new(AlwaysApprove)).await;
    assert_eq!(second.tree.file_count(), 1);

    // the first run's output stays and the new copy steps around it
    let out = root.join("nomnom").join("renamed");
    assert_eq!(second.results[0].new_path, out.join("alpha_1.txt"));
    assert_eq!(fs::read_to_string(out.join("alpha.txt")).unwrap(), "alpha");
    assert_eq!(fs::read_to_string(out.join("alpha_1.txt")).unwrap(), "alpha");
}

#[tokio::test]
async fn test_dry_run_predicts_the_real_layout() {
    let dir = tempfile::tempdir().unwrap();
    let root = root_of(&dir);
    for sub in ["x", "y"] {
        fs::create_dir(root.join(sub)).unwrap();
        fs::write(root.join(sub).join("a.txt"), format!("notes in {}", sub)).unwrap();
    }

    let answers: &[(&str, &[&str])] = &[("a.txt", &["notes.txt"])];
    let predicted = run_with(&job(&root, true, true, 0), Scripted::new(answers), Arc::new(AlwaysApprove)).await;
    let actual = run_with(&job(&root, false, true, 0), Scripted::new(answers), Arc::new(AlwaysApprove)).await;

    assert_eq!(predicted.results, actual.results);
    let docs = root.join("nomnom").join("renamed").join("Documents");
    let paths: Vec<PathBuf> = actual.results.iter().map(|r| r.new_path.clone()).collect();
    assert_eq!(paths, vec![docs.join("notes.txt"), docs.join("notes_1.txt")]);
}
