//! Agent configuration management.
//!
//! Configuration is stored as TOML next to the persisted settings:
//! - Linux: `~/.config/replaybot/agent.toml`
//! - Windows: `%APPDATA%/replaybot/agent.toml`

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use replaybot_settings::{SETTINGS_FILE_NAME, config_dir};
use replaybot_uploader::UploaderConfig;

/// Agent configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Settings file override (defaults to `settings.json` in the config dir).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings_file: Option<PathBuf>,

    #[serde(default)]
    pub uploader: UploaderConfig,
}

impl Config {
    /// Loads configuration from disk, or creates a default if not found.
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&config_path())
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            Ok(toml::from_str(&content)?)
        } else {
            let config = Config::default();
            config.save_to(path)?;
            Ok(config)
        }
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
        }

        tracing::debug!(path = %path.display(), "configuration saved");
        Ok(())
    }

    /// Location of the persisted settings (credential, concurrency, bot name).
    pub fn settings_path(&self) -> PathBuf {
        self.settings_file
            .clone()
            .unwrap_or_else(|| config_dir().join(SETTINGS_FILE_NAME))
    }
}

fn config_path() -> PathBuf {
    config_dir().join("agent.toml")
}
