//! JSON file backed settings store.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde_json::{Map, Value};

use crate::{SettingKey, SettingsError, SettingsStore};

/// Stores settings as a flat JSON object, e.g.
/// `{"token": "...", "max_threads_curl": "4", "name_bot": "ReplayBot"}`.
///
/// Keys this store does not know about are preserved on write.
pub struct JsonSettingsStore {
    path: PathBuf,
    key_locks: [Mutex<()>; 3],
    file_lock: Mutex<()>,
}

impl JsonSettingsStore {
    /// Creates a store backed by `path`. The file is created on first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            key_locks: [Mutex::new(()), Mutex::new(()), Mutex::new(())],
            file_lock: Mutex::new(()),
        }
    }

    /// Creates a store at the default location (`<config dir>/settings.json`).
    pub fn open_default() -> Self {
        Self::new(crate::config_dir().join(crate::SETTINGS_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> Map<String, Value> {
        let Ok(content) = std::fs::read_to_string(&self.path) else {
            return Map::new();
        };
        match serde_json::from_str::<Value>(&content) {
            Ok(Value::Object(map)) => map,
            _ => {
                tracing::warn!(
                    path = %self.path.display(),
                    "failed to parse settings, starting from empty"
                );
                Map::new()
            }
        }
    }

    fn write_map(&self, map: &Map<String, Value>) -> Result<(), SettingsError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(map)?;
        std::fs::write(&self.path, json)?;
        set_permissions_0600(&self.path);
        Ok(())
    }
}

impl SettingsStore for JsonSettingsStore {
    fn get(&self, key: SettingKey) -> String {
        let _file = self.file_lock.lock().unwrap_or_else(|e| e.into_inner());
        match self.read_map().get(key.as_str()) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => String::new(),
        }
    }

    fn set(&self, key: SettingKey, value: &str) -> Result<(), SettingsError> {
        let _key = self.key_locks[key.index()]
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        let _file = self.file_lock.lock().unwrap_or_else(|e| e.into_inner());

        let mut map = self.read_map();
        map.insert(key.as_str().to_string(), Value::String(value.to_string()));
        self.write_map(&map)?;

        tracing::debug!(key = %key, "setting saved");
        Ok(())
    }
}

fn set_permissions_0600(path: &Path) {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let _ = std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600));
    }
    #[cfg(not(unix))]
    {
        let _ = path;
    }
}
