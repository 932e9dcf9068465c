use serde::{Deserialize, Serialize};

pub const DEFAULT_SIDECAR_FILENAME: &str = ".margin.json";
pub const DEFAULT_MAX_SIDECAR_BYTES: u64 = 5 * 1024 * 1024;
pub const DEFAULT_MAX_TEXT_LEN: usize = 500;
pub const DEFAULT_SEARCH_RADIUS: i64 = 15;

/// Settings consumed (not owned) by the store. The boundary layer decides
/// where these come from; the defaults match a fresh installation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Sidecar filename, placed directly under the workspace root. Must not
    /// contain path separators or `..`.
    pub sidecar_filename: String,

    /// Byte-size ceiling for the sidecar; larger stores load as empty.
    pub max_sidecar_bytes: u64,

    /// Upper bound on annotation text length.
    pub max_text_len: usize,

    /// Line-search radius for relocation; `0` or negative searches the
    /// whole document.
    pub search_radius: i64,

    /// Display identity of the writer; the boundary layer supplies a
    /// fallback when unset.
    pub author: Option<String>,

    /// Reconcile a file's annotations whenever it is saved.
    pub auto_sync_on_save: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            sidecar_filename: DEFAULT_SIDECAR_FILENAME.to_string(),
            max_sidecar_bytes: DEFAULT_MAX_SIDECAR_BYTES,
            max_text_len: DEFAULT_MAX_TEXT_LEN,
            search_radius: DEFAULT_SEARCH_RADIUS,
            author: None,
            auto_sync_on_save: false,
        }
    }
}

impl StoreConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.sidecar_filename.is_empty() {
            return Err("sidecar_filename must not be empty".to_string());
        }
        if self.max_sidecar_bytes == 0 {
            return Err("max_sidecar_bytes must be > 0".to_string());
        }
        if self.max_text_len == 0 {
            return Err("max_text_len must be > 0".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        let config = StoreConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.sidecar_filename, ".margin.json");
        assert_eq!(config.search_radius, 15);
    }

    #[test]
    fn test_config_validation() {
        let mut config = StoreConfig {
            sidecar_filename: String::new(),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        config.sidecar_filename = ".margin.json".to_string();
        config.max_text_len = 0;
        assert!(config.validate().is_err());

        config.max_text_len = 500;
        config.max_sidecar_bytes = 0;
        assert!(config.validate().is_err());
    }
}
