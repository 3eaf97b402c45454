// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Per-file rename consent

use std::io::{self, BufRead, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

use crate::Result;

/// Answer to a single rename question
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Approval {
    Approve,
    Reject,
    /// Approve this and every later rename of the run
    ApproveAll,
}

/// Source of rename consent
pub trait ApprovalOracle: Send + Sync {
    fn ask(&self, old_name: &str, new_name: &str) -> Result<Approval>;
}

/// Approves everything without asking
pub struct AlwaysApprove;

impl ApprovalOracle for AlwaysApprove {
    fn ask(&self, _old_name: &str, _new_name: &str) -> Result<Approval> {
        Ok(Approval::Approve)
    }
}

/// Asks on the terminal
pub struct ConsolePrompt {
    // one question at a time
    lock: Mutex<()>,
}

impl ConsolePrompt {
    pub fn new() -> Self {
        Self { lock: Mutex::new(()) }
    }

    /// Ask on arbitrary streams until a recognised answer arrives. End of
    /// input counts as a rejection.
    pub fn ask_with<R: BufRead, W: Write>(
        input: &mut R,
        output: &mut W,
        old_name: &str,
        new_name: &str,
    ) -> io::Result<Approval> {
        let mut line = String::new();
        loop {
            line.clear();
            write!(output, "Rename {} -> {}? [y]es / [n]o / [a]ll: ", old_name, new_name)?;
            output.flush()?;

            if input.read_line(&mut line)? == 0 {
                return Ok(Approval::Reject);
            }

            match parse_answer(&line) {
                Some(answer) => return Ok(answer),
                None => continue,
            }
        }
    }
}

impl Default for ConsolePrompt {
    fn default() -> Self {
        Self::new()
    }
}

impl ApprovalOracle for ConsolePrompt {
    fn ask(&self, old_name: &str, new_name: &str) -> Result<Approval> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let stdin = io::stdin();
        let stdout = io::stdout();
        Ok(Self::ask_with(&mut stdin.lock(), &mut stdout.lock(), old_name, new_name)?)
    }
}

/// Interpret a typed answer
pub fn parse_answer(input: &str) -> Option<Approval> {
    match input.trim().to_lowercase().as_str() {
        "y" | "yes" => Some(Approval::Approve),
        "n" | "no" => Some(Approval::Reject),
        "a" | "all" => Some(Approval::ApproveAll),
        _ => None,
    }
}

/// Wraps an oracle with the run-wide "approve all" latch
pub struct ApprovalGate {
    oracle: Arc<dyn ApprovalOracle>,
    approve_all: AtomicBool,
}

impl ApprovalGate {
    pub fn new(oracle: Arc<dyn ApprovalOracle>, auto_approve: bool) -> Self {
        Self {
            oracle,
            approve_all: AtomicBool::new(auto_approve),
        }
    }

    pub fn is_latched(&self) -> bool {
        self.approve_all.load(Ordering::SeqCst)
    }

    /// True if the rename may go ahead. Oracle failures reject.
    pub fn check(&self, old_name: &str, new_name: &str) -> bool {
        if self.is_latched() {
            return true;
        }

        match self.oracle.ask(old_name, new_name) {
            Ok(Approval::Approve) => true,
            Ok(Approval::ApproveAll) => {
                info!("Approving all remaining renames");
                self.approve_all.store(true, Ordering::SeqCst);
                true
            }
            Ok(Approval::Reject) => false,
            Err(e) => {
                warn!("Approval prompt failed, skipping {}: {}", old_name, e);
                false
            }
        }
    }
}
