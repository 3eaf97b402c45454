// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Configuration management for nomnom

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::naming::CaseStyle;
use crate::providers::ProviderKind;
use crate::{NomnomError, Result};

/// Default system prompt sent with every completion request
pub const DEFAULT_PROMPT: &str = "You are a desktop organizer that creates nice names for files \
    based on their context. Only respond with the new name and the file extension. \
    Do not change the file extension. Do not respond with anything else!";

const RESEARCH_PROMPT: &str = "You are organizing a library of research papers. Name the file \
    after its title, first author surname and year where they can be found, e.g. \
    attention_is_all_you_need_vaswani_2017.pdf. Only respond with the new name and the \
    file extension.";

const IMAGES_PROMPT: &str = "Describe this image in a concise, descriptive filename (max 5 \
    words). Only respond with the new name and the file extension.";

/// Main application configuration
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct AppConfig {
    /// Output directory for processed files (default: `<root>/nomnom/renamed`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,

    /// Case convention applied to suggested names
    #[serde(default)]
    pub case: CaseStyle,

    /// Completion provider settings
    #[serde(default)]
    pub ai: AiConfig,

    #[serde(default)]
    pub file_handling: FileHandlingConfig,

    #[serde(default)]
    pub content_extraction: ContentExtractionConfig,

    #[serde(default)]
    pub performance: PerformanceConfig,

    /// Change journal settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AiConfig {
    #[serde(default)]
    pub provider: ProviderKind,
    #[serde(default)]
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default)]
    pub vision: VisionConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct VisionConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_max_image_size")]
    pub max_image_size: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct FileHandlingConfig {
    /// Files above this size are skipped during the scan
    #[serde(default = "default_max_size")]
    pub max_size: String,
    #[serde(default)]
    pub auto_approve: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ContentExtractionConfig {
    #[serde(default = "default_max_content_length")]
    pub max_content_length: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PerformanceConfig {
    /// Size of the shared worker pool
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Per-call completion timeout
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_retries")]
    pub retries: u32,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Journal directory override (default: `<root>/nomnom/logs`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_path: Option<String>,
}

// Default value functions
fn default_max_tokens() -> u32 { 100 }
fn default_temperature() -> f32 { 0.7 }
fn default_max_image_size() -> String { "5MB".to_string() }
fn default_max_size() -> String { "10MB".to_string() }
fn default_max_content_length() -> usize { 5000 }
fn default_workers() -> usize { 4 }
fn default_timeout() -> u64 { 60 }
fn default_retries() -> u32 { 3 }
fn default_true() -> bool { true }

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::default(),
            model: String::new(),
            api_key: None,
            base_url: None,
            prompt: None,
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            vision: VisionConfig::default(),
        }
    }
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_image_size: default_max_image_size(),
        }
    }
}

impl Default for FileHandlingConfig {
    fn default() -> Self {
        Self {
            max_size: default_max_size(),
            auto_approve: false,
        }
    }
}

impl Default for ContentExtractionConfig {
    fn default() -> Self {
        Self {
            max_content_length: default_max_content_length(),
        }
    }
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            timeout_secs: default_timeout(),
            retries: default_retries(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            log_path: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let config = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            serde_json::from_str::<Self>(&content)
                .map_err(|e| NomnomError::Config(format!("Failed to parse config: {}", e)))?
        } else {
            tracing::info!("Config file not found at {:?}, using defaults", path);
            Self::default()
        };

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a JSON file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.performance.workers == 0 {
            return Err(NomnomError::Config("performance.workers must be at least 1".into()));
        }
        if self.performance.timeout_secs == 0 {
            return Err(NomnomError::Config("performance.timeout_secs must be at least 1".into()));
        }
        parse_size(&self.file_handling.max_size)?;
        parse_size(&self.ai.vision.max_image_size)?;
        Ok(())
    }

    /// Maximum size of a scanned file in bytes
    pub fn max_file_size(&self) -> Result<u64> {
        parse_size(&self.file_handling.max_size)
    }

    /// Maximum size of an image sent as a vision payload
    pub fn max_image_size(&self) -> Result<u64> {
        parse_size(&self.ai.vision.max_image_size)
    }

    /// Pick the system prompt: command-line value (or preset name), then
    /// config, then the built-in default
    pub fn resolve_prompt(&self, cli_prompt: Option<&str>) -> String {
        if let Some(p) = cli_prompt.map(str::trim).filter(|p| !p.is_empty()) {
            return preset_prompt(p).unwrap_or(p).to_string();
        }
        if let Some(p) = self.ai.prompt.as_deref().map(str::trim).filter(|p| !p.is_empty()) {
            return preset_prompt(p).unwrap_or(p).to_string();
        }
        DEFAULT_PROMPT.to_string()
    }
}

/// Built-in prompt for a preset name
pub fn preset_prompt(name: &str) -> Option<&'static str> {
    match name.to_lowercase().as_str() {
        "research" => Some(RESEARCH_PROMPT),
        "images" => Some(IMAGES_PROMPT),
        _ => None,
    }
}

/// Parse a human size string such as `10MB`, `1.5 GB` or `512`
pub fn parse_size(raw: &str) -> Result<u64> {
    let s = raw.trim().to_uppercase();
    let split = s
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(s.len());
    let (number, unit) = s.split_at(split);

    let value: f64 = number
        .parse()
        .map_err(|_| NomnomError::Config(format!("Invalid size: {:?}", raw)))?;

    let multiplier: u64 = match unit.trim() {
        "" | "B" => 1,
        "KB" | "K" => 1024,
        "MB" | "M" => 1024 * 1024,
        "GB" | "G" => 1024 * 1024 * 1024,
        other => {
            return Err(NomnomError::Config(format!("Unknown size unit {:?} in {:?}", other, raw)))
        }
    };

    Ok((value * multiplier as f64) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size("512").unwrap(), 512);
        assert_eq!(parse_size("10MB").unwrap(), 10 * 1024 * 1024);
        assert_eq!(parse_size("1.5 kb").unwrap(), 1536);
        assert_eq!(parse_size("2G").unwrap(), 2 * 1024 * 1024 * 1024);
        assert!(parse_size("ten").is_err());
        assert!(parse_size("10TB").is_err());
    }

    #[test]
    fn test_defaults_from_empty_document() {
        let config: AppConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.case, CaseStyle::Snake);
        assert_eq!(config.ai.provider, ProviderKind::DeepSeek);
        assert_eq!(config.performance.workers, 4);
        assert_eq!(config.performance.retries, 3);
        assert!(config.logging.enabled);
        assert_eq!(config.max_file_size().unwrap(), 10 * 1024 * 1024);
    }

    #[test]
    fn test_partial_document() {
        let json = r#"{
            "case": "kebab",
            "ai": { "provider": "ollama", "model": "llama3.2", "vision": { "enabled": true } },
            "performance": { "workers": 8 }
        }"#;
        let config: AppConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.case, CaseStyle::Kebab);
        assert_eq!(config.ai.provider, ProviderKind::Ollama);
        assert!(config.ai.vision.enabled);
        assert_eq!(config.ai.vision.max_image_size, "5MB");
        assert_eq!(config.performance.workers, 8);
        assert_eq!(config.performance.timeout_secs, 60);
    }

    #[test]
    fn test_validate_rejects_zero_workers() {
        let mut config = AppConfig::default();
        config.performance.workers = 0;
        assert!(matches!(config.validate(), Err(NomnomError::Config(_))));
    }

    #[test]
    fn test_resolve_prompt() {
        let mut config = AppConfig::default();
        assert_eq!(config.resolve_prompt(None), DEFAULT_PROMPT);
        assert_eq!(config.resolve_prompt(Some("research")), RESEARCH_PROMPT);
        assert_eq!(config.resolve_prompt(Some("name it well")), "name it well");

        config.ai.prompt = Some("from config".into());
        assert_eq!(config.resolve_prompt(None), "from config");
        assert_eq!(config.resolve_prompt(Some("  ")), "from config");
    }

    #[test]
    fn test_load_and_save() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let missing = AppConfig::load(&path).unwrap();
        assert_eq!(missing.performance.workers, 4);

        let mut config = AppConfig::default();
        config.output = Some("/tmp/out".into());
        config.save(&path).unwrap();

        let loaded = AppConfig::load(&path).unwrap();
        assert_eq!(loaded.output.as_deref(), Some("/tmp/out"));

        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(AppConfig::load(&path), Err(NomnomError::Config(_))));
    }
}
