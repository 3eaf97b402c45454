// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Content decoders that turn a file into model-readable text

pub mod image;
pub mod text;

use std::io::Read;
use std::path::Path;
use tracing::debug;

use crate::Result;

/// Upper bound on bytes read by the raw fallback
const RAW_READ_LIMIT: u64 = 64 * 1024;

/// Trait for content decoders
pub trait ContentDecoder: Send + Sync {
    /// Name of this decoder
    fn name(&self) -> &'static str;

    /// File extensions this decoder handles
    fn supported_extensions(&self) -> &[&str];

    /// Check if this decoder can handle a file
    fn can_handle(&self, path: &Path) -> bool {
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            self.supported_extensions().iter().any(|e| e.eq_ignore_ascii_case(ext))
        } else {
            false
        }
    }

    /// Decode a file into text
    fn decode(&self, path: &Path) -> Result<String>;

    /// Priority (higher = preferred when multiple decoders match)
    fn priority(&self) -> u8 {
        50
    }
}

/// Registry of all content decoders
pub struct DecoderRegistry {
    decoders: Vec<Box<dyn ContentDecoder>>,
}

impl DecoderRegistry {
    /// Registry with the built-in decoders
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register(Box::new(text::PlainTextDecoder::new()));
        registry.register(Box::new(image::ImageInfoDecoder::new()));
        registry
    }

    /// Registry that only uses the raw fallback
    pub fn empty() -> Self {
        Self {
            decoders: Vec::new(),
        }
    }

    /// Register a new decoder
    pub fn register(&mut self, decoder: Box<dyn ContentDecoder>) {
        self.decoders.push(decoder);
        self.decoders.sort_by_key(|d| std::cmp::Reverse(d.priority()));
    }

    /// Find the best decoder for a file
    pub fn find_decoder(&self, path: &Path) -> Option<&dyn ContentDecoder> {
        self.decoders
            .iter()
            .find(|d| d.can_handle(path))
            .map(|d| d.as_ref())
    }

    /// Decode with the matching decoder, or read the raw bytes as text
    pub fn decode(&self, path: &Path) -> Result<String> {
        match self.find_decoder(path) {
            Some(decoder) => {
                debug!("Decoding {:?} with {}", path, decoder.name());
                decoder.decode(path)
            }
            None => decode_raw(path),
        }
    }

    pub fn decoder_names(&self) -> Vec<&'static str> {
        self.decoders.iter().map(|d| d.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.decoders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decoders.is_empty()
    }
}

impl Default for DecoderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Read the start of a file and interpret it as lossy UTF-8
pub fn decode_raw(path: &Path) -> Result<String> {
    let file = std::fs::File::open(path)?;
    let mut buffer = Vec::new();
    file.take(RAW_READ_LIMIT).read_to_end(&mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    struct Shouting;

    impl ContentDecoder for Shouting {
        fn name(&self) -> &'static str {
            "shouting"
        }

        fn supported_extensions(&self) -> &[&str] {
            &["txt"]
        }

        fn decode(&self, path: &Path) -> Result<String> {
            Ok(std::fs::read_to_string(path)?.to_uppercase())
        }

        fn priority(&self) -> u8 {
            200
        }
    }

    #[test]
    fn test_find_decoder_by_extension() {
        let registry = DecoderRegistry::new();
        assert_eq!(registry.len(), 2);

        let text = registry.find_decoder(&PathBuf::from("notes.MD")).unwrap();
        assert_eq!(text.name(), "text");

        let image = registry.find_decoder(&PathBuf::from("cat.png")).unwrap();
        assert_eq!(image.name(), "image");

        assert!(registry.find_decoder(&PathBuf::from("blob.bin")).is_none());
        assert!(registry.find_decoder(&PathBuf::from("Makefile")).is_none());
    }

    #[test]
    fn test_priority_ordering() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::write(&path, "quiet").unwrap();

        let mut registry = DecoderRegistry::new();
        registry.register(Box::new(Shouting));
        assert_eq!(registry.decoder_names()[0], "shouting");
        assert_eq!(registry.decode(&path).unwrap(), "QUIET");
    }

    #[test]
    fn test_raw_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.bin");
        std::fs::write(&path, b"hello\xffworld").unwrap();

        let registry = DecoderRegistry::empty();
        assert!(registry.is_empty());
        assert_eq!(registry.decode(&path).unwrap(), "hello\u{fffd}world");
    }

    #[test]
    fn test_raw_fallback_is_bounded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.bin");
        std::fs::write(&path, vec![b'a'; (RAW_READ_LIMIT * 2) as usize]).unwrap();

        assert_eq!(decode_raw(&path).unwrap().len(), RAW_READ_LIMIT as usize);
    }
}
