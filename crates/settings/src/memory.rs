//! In-process settings store.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::{SettingKey, SettingsError, SettingsStore};

/// Keeps settings in memory. Useful for tests and for hosts that persist
/// settings themselves.
#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    values: Mutex<HashMap<SettingKey, String>>,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with `entries`.
    pub fn with_values<'a>(entries: impl IntoIterator<Item = (SettingKey, &'a str)>) -> Self {
        let values = entries
            .into_iter()
            .map(|(k, v)| (k, v.to_string()))
            .collect();
        Self {
            values: Mutex::new(values),
        }
    }
}

impl SettingsStore for MemorySettingsStore {
    fn get(&self, key: SettingKey) -> String {
        let values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        values.get(&key).cloned().unwrap_or_default()
    }

    fn set(&self, key: SettingKey, value: &str) -> Result<(), SettingsError> {
        let mut values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        values.insert(key, value.to_string());
        Ok(())
    }
}
