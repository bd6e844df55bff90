//! Uploader configuration.

use serde::{Deserialize, Serialize};

/// Pipeline configuration. Every field has a default, so an empty TOML
/// document is a valid config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploaderConfig {
    /// Address queried for the upload URL, concurrency and bot name.
    #[serde(default = "default_upload_info_url")]
    pub upload_info_url: String,

    /// Upload URL used when resolution fails and nothing is cached.
    #[serde(default = "default_fallback_upload_url")]
    pub fallback_upload_url: String,

    /// Chunk size in bytes (0 = 5 MiB).
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Concurrent chunk uploads when none has been negotiated yet.
    #[serde(default = "default_max_uploads")]
    pub default_max_uploads: usize,

    /// Marks requests as coming from a development build (`Dev: true`).
    #[serde(default)]
    pub is_dev: bool,

    /// Prefix of the account-linking link shown when no credential exists.
    #[serde(default = "default_link_base_url")]
    pub link_base_url: String,

    /// Timeout for the upload-info request, in seconds.
    #[serde(default = "default_info_timeout_secs")]
    pub info_timeout_secs: u64,
}

fn default_upload_info_url() -> String {
    "https://obs-replay.krol44.com/upload-info".into()
}

pub(crate) fn default_fallback_upload_url() -> String {
    "https://obs-replay.krol44.com".into()
}

fn default_chunk_size() -> usize {
    replaybot_transfer::DEFAULT_CHUNK_SIZE
}

fn default_max_uploads() -> usize {
    4
}

fn default_link_base_url() -> String {
    "https://t.me/OBSReplayBot?start=".into()
}

fn default_info_timeout_secs() -> u64 {
    10
}

impl Default for UploaderConfig {
    fn default() -> Self {
        Self {
            upload_info_url: default_upload_info_url(),
            fallback_upload_url: default_fallback_upload_url(),
            chunk_size: default_chunk_size(),
            default_max_uploads: default_max_uploads(),
            is_dev: false,
            link_base_url: default_link_base_url(),
            info_timeout_secs: default_info_timeout_secs(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_json_uses_defaults() {
        let config: UploaderConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, UploaderConfig::default());
        assert_eq!(config.chunk_size, 5 * 1024 * 1024);
        assert!(!config.is_dev);
    }

    #[test]
    fn partial_override() {
        let config: UploaderConfig =
            serde_json::from_str(r#"{"is_dev":true,"default_max_uploads":2}"#).unwrap();
        assert!(config.is_dev);
        assert_eq!(config.default_max_uploads, 2);
        assert_eq!(config.fallback_upload_url, default_fallback_upload_url());
    }
}
