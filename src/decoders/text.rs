// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Plain text and source file decoder

use std::path::Path;

use super::{decode_raw, ContentDecoder};
use crate::Result;

/// Decoder for files that are already text
pub struct PlainTextDecoder;

impl PlainTextDecoder {
    pub fn new() -> Self {
        Self
    }
}

impl Default for PlainTextDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentDecoder for PlainTextDecoder {
    fn name(&self) -> &'static str {
        "text"
    }

    fn supported_extensions(&self) -> &[&str] {
        &[
            "txt", "md", "markdown", "rst", "adoc", "org", "csv", "tsv", "json", "yaml", "yml",
            "toml", "xml", "html", "htm", "log", "ini", "cfg", "conf", "tex", "bib", "rs", "py",
            "js", "ts", "go", "c", "h", "cpp", "hpp", "java", "sh", "sql",
        ]
    }

    fn priority(&self) -> u8 {
        80
    }

    fn decode(&self, path: &Path) -> Result<String> {
        // invalid UTF-8 in a "text" file still yields something usable
        match std::fs::read_to_string(path) {
            Ok(text) => Ok(text),
            Err(e) if e.kind() == std::io::ErrorKind::InvalidData => decode_raw(path),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.md");
        std::fs::write(&path, "# Budget\nQ1 numbers").unwrap();

        let decoder = PlainTextDecoder::new();
        assert!(decoder.can_handle(&path));
        assert_eq!(decoder.decode(&path).unwrap(), "# Budget\nQ1 numbers");
    }

    #[test]
    fn test_decode_invalid_utf8() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.txt");
        std::fs::write(&path, b"caf\xe9").unwrap();

        assert_eq!(PlainTextDecoder::new().decode(&path).unwrap(), "caf\u{fffd}");
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(PlainTextDecoder::new().decode(&dir.path().join("gone.txt")).is_err());
    }
}
