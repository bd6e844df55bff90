use std::path::PathBuf;

/// File name of the persisted settings inside [`config_dir`].
pub const SETTINGS_FILE_NAME: &str = "settings.json";

/// Per-user configuration directory for replaybot.
///
/// - Linux: `~/.config/replaybot`
/// - Windows: `%APPDATA%\replaybot`
/// - macOS: `~/Library/Application Support/replaybot`
pub fn config_dir() -> PathBuf {
    config_base_dir().join("replaybot")
}

fn config_base_dir() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        let appdata =
            std::env::var("APPDATA").unwrap_or_else(|_| "C:\\Users\\Default\\AppData".into());
        PathBuf::from(appdata)
    }

    #[cfg(target_os = "macos")]
    {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
        PathBuf::from(home).join("Library").join("Application Support")
    }

    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME")
            && !xdg.is_empty()
        {
            return PathBuf::from(xdg);
        }
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
        PathBuf::from(home).join(".config")
    }
}
