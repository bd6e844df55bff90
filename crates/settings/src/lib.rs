//! Persisted uploader settings.
//!
//! The upload pipeline only ever touches three keys: the credential
//! (`token`), the negotiated upload concurrency (`max_threads_curl`) and the
//! bot display name (`name_bot`). Storage itself is pluggable through
//! [`SettingsStore`]; [`JsonSettingsStore`] keeps them in a JSON file next to
//! the rest of the app config.

mod json;
mod memory;
mod paths;
mod token;

pub use json::JsonSettingsStore;
pub use memory::MemorySettingsStore;
pub use paths::{SETTINGS_FILE_NAME, config_dir};
pub use token::{TOKEN_BYTES, generate_token, link_url};

/// The persisted keys the pipeline reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingKey {
    /// Credential sent as the `Authorization` header.
    Token,
    /// Maximum concurrent chunk uploads, string-encoded integer.
    MaxThreadsCurl,
    /// Display name of the receiving bot.
    NameBot,
}

impl SettingKey {
    pub const ALL: [SettingKey; 3] = [Self::Token, Self::MaxThreadsCurl, Self::NameBot];

    /// Key name as stored on disk.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Token => "token",
            Self::MaxThreadsCurl => "max_threads_curl",
            Self::NameBot => "name_bot",
        }
    }

    pub(crate) fn index(self) -> usize {
        match self {
            Self::Token => 0,
            Self::MaxThreadsCurl => 1,
            Self::NameBot => 2,
        }
    }
}

impl std::fmt::Display for SettingKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors produced when persisting settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Key/value storage for the pipeline's persisted settings.
///
/// Writes to one key are serialized; writes to different keys are
/// independent of each other.
pub trait SettingsStore: Send + Sync {
    /// Returns the stored value, or an empty string when unset or unreadable.
    fn get(&self, key: SettingKey) -> String;

    /// Stores `value` under `key`.
    fn set(&self, key: SettingKey, value: &str) -> Result<(), SettingsError>;
}
