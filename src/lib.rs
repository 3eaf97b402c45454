// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! nomnom: bulk AI file renamer
//!
//! Scans a directory tree, asks a completion service for a descriptive name
//! per file, copies the files into an output root and renames the copies
//! there. Every rename is journaled so a session can be restored later.

pub mod approval;
pub mod config;
pub mod decoders;
pub mod error;
pub mod journal;
pub mod naming;
pub mod processor;
pub mod providers;
pub mod revert;
pub mod runner;
pub mod scanner;
pub mod suggest;
pub mod tree;

pub use config::AppConfig;
pub use error::{NomnomError, Result};
