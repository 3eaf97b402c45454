// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Structural file name validation

use thiserror::Error;

/// Longest file name accepted on common file systems
pub const MAX_NAME_LENGTH: usize = 255;

const ILLEGAL_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

const RESERVED_NAMES: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// Why a suggested name was rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NameRejection {
    #[error("the name is empty")]
    Empty,

    #[error("the name is {0} characters long, the limit is 255")]
    TooLong(usize),

    #[error("the name starts or ends with a space or a period")]
    LeadingOrTrailing,

    #[error("the name contains spaces")]
    ContainsSpace,

    #[error("the name contains the illegal character {0:?}")]
    IllegalCharacter(char),

    #[error("{0} is a reserved device name")]
    Reserved(String),

    #[error("the name has no file extension")]
    MissingExtension,
}

/// Check a candidate file name.
///
/// `require_extension` is false only for originals that have no extension
/// themselves.
pub fn validate_file_name(name: &str, require_extension: bool) -> Result<(), NameRejection> {
    if name.is_empty() {
        return Err(NameRejection::Empty);
    }

    let length = name.chars().count();
    if length > MAX_NAME_LENGTH {
        return Err(NameRejection::TooLong(length));
    }

    if name.starts_with([' ', '.']) || name.ends_with([' ', '.']) {
        return Err(NameRejection::LeadingOrTrailing);
    }

    if name.contains(char::is_whitespace) {
        return Err(NameRejection::ContainsSpace);
    }

    if let Some(c) = name.chars().find(|c| ILLEGAL_CHARS.contains(c) || c.is_control()) {
        return Err(NameRejection::IllegalCharacter(c));
    }

    // Windows treats `CON.txt` the same as `CON`
    let device = name.split('.').next().unwrap_or(name).to_uppercase();
    if RESERVED_NAMES.contains(&device.as_str()) {
        return Err(NameRejection::Reserved(device));
    }

    if require_extension && split_extension(name).1.is_none() {
        return Err(NameRejection::MissingExtension);
    }

    Ok(())
}

/// Shorthand for callers that only need a yes/no answer
pub fn is_valid_file_name(name: &str) -> bool {
    validate_file_name(name, true).is_ok()
}

/// Split `name` into stem and extension at the last period. A leading
/// period does not start an extension.
pub fn split_extension(name: &str) -> (&str, Option<&str>) {
    match name.rfind('.') {
        Some(idx) if idx > 0 && idx + 1 < name.len() => (&name[..idx], Some(&name[idx + 1..])),
        _ => (name, None),
    }
}
