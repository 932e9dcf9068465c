use anyhow::{Context, Result};
use clap::ValueEnum;
use margin_store::StoreConfig;
use serde::Deserialize;
use std::path::Path;

pub const CONFIG_FILENAME: &str = ".margin.toml";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Alpha,
    Date,
}

/// Optional settings read from `.margin.toml` at the workspace root. Keys
/// mirror the store's configuration surface; anything unset falls back to
/// the built-in defaults, and command-line flags override both.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub filename: Option<String>,
    pub max_file_size: Option<u64>,
    pub max_comment_length: Option<usize>,
    pub author: Option<String>,
    pub search_range: Option<i64>,
    pub auto_sync_on_save: Option<bool>,
    pub sort_order: Option<SortOrder>,
}

impl FileConfig {
    /// Reads `path` if it exists; a missing file is just the defaults,
    /// while an unreadable or invalid file is a hard error (silently
    /// ignoring a typo'd config hides misconfiguration).
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        toml::from_str(&raw).with_context(|| format!("Failed to parse config {}", path.display()))
    }

    #[must_use]
    pub fn to_store_config(&self) -> StoreConfig {
        let defaults = StoreConfig::default();
        StoreConfig {
            sidecar_filename: self
                .filename
                .clone()
                .unwrap_or(defaults.sidecar_filename),
            max_sidecar_bytes: self.max_file_size.unwrap_or(defaults.max_sidecar_bytes),
            max_text_len: self
                .max_comment_length
                .unwrap_or(defaults.max_text_len),
            search_radius: self.search_range.unwrap_or(defaults.search_radius),
            author: self.author.clone(),
            auto_sync_on_save: self
                .auto_sync_on_save
                .unwrap_or(defaults.auto_sync_on_save),
        }
    }

    #[must_use]
    pub fn sort_order(&self) -> SortOrder {
        self.sort_order.unwrap_or(SortOrder::Alpha)
    }
}

/// Author identity, in priority order: explicit flag, config file, `$USER`,
/// a fixed fallback. The store itself never prompts.
#[must_use]
pub fn resolve_author(flag: Option<&str>, config: &StoreConfig) -> String {
    flag.map(str::to_string)
        .or_else(|| config.author.clone())
        .filter(|a| !a.trim().is_empty())
        .or_else(|| std::env::var("USER").ok().filter(|u| !u.is_empty()))
        .unwrap_or_else(|| "unknown".to_string())
}
