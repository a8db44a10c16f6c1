//! Cross-platform application paths using the `dirs` crate.
//!
//! Config dir (settings + persisted key-value store):
//!   Windows: %APPDATA%\voice-player\
//!   macOS:   ~/Library/Application Support/voice-player/
//!   Linux:   ~/.config/voice-player/

use std::path::PathBuf;

/// Holds all resolved application directory/file paths.
#[derive(Debug, Clone)]
pub struct AppPaths {
    /// Directory for `settings.toml` and `store.json`.
    pub config_dir: PathBuf,
    /// Full path to `settings.toml`.
    pub settings_file: PathBuf,
    /// Full path to the flat key-value store (`store.json`).
    pub store_file: PathBuf,
}

impl AppPaths {
    const APP_NAME: &'static str = "voice-player";

    /// Resolves all paths using the `dirs` crate.
    ///
    /// Falls back to the current directory if the platform cannot provide a
    /// standard path.
    pub fn new() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(Self::APP_NAME);

        let settings_file = config_dir.join("settings.toml");
        let store_file = config_dir.join("store.json");

        Self {
            config_dir,
            settings_file,
            store_file,
        }
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}
