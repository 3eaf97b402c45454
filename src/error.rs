// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Error types for nomnom

use std::time::Duration;
use thiserror::Error;

/// Result type alias for nomnom operations
pub type Result<T> = std::result::Result<T, NomnomError>;

/// nomnom error types
///
/// Scan, decode, completion, validation and rename errors are file-scoped:
/// the pipeline logs them and moves on. Only setup failures (unreadable scan
/// root, unwritable output root, missing credentials, bad configuration)
/// abort a run.
#[derive(Error, Debug)]
pub enum NomnomError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("File system error: {0}")]
    FileSystem(#[from] std::io::Error),

    #[error("API error: {0}")]
    Api(#[from] reqwest::Error),

    #[error("Scan error: {0}")]
    Scan(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Completion error: {0}")]
    Completion(String),

    #[error("Completion timed out after {0:?}")]
    Timeout(Duration),

    #[error("Invalid file name: {0}")]
    Validation(#[from] crate::naming::NameRejection),

    #[error("Rename error: {0}")]
    Rename(String),

    #[error("Journal error: {0}")]
    Journal(String),

    #[error("Missing credentials: {0}")]
    Credentials(String),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
