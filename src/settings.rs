// Settings persistence
//
// One flat JSON object at a fixed per-user path. Loading merges file values
// over hardcoded defaults, so a settings file from an older version (or a
// hand-edited one missing keys) never fails the load.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

fn default_download_path() -> String {
    dirs::download_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join("Downloads")))
        .unwrap_or_else(|| PathBuf::from("."))
        .to_string_lossy()
        .to_string()
}

fn default_theme() -> String {
    "dark".to_string()
}

fn default_quality() -> String {
    "best".to_string()
}

fn default_window_geometry() -> String {
    "900x750".to_string()
}

fn default_playlist_quantity() -> String {
    "10".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_download_path")]
    pub download_path: String,
    #[serde(default = "default_theme")]
    pub theme: String,
    #[serde(default = "default_quality")]
    pub default_quality: String,
    #[serde(default = "default_window_geometry")]
    pub window_geometry: String,
    #[serde(default = "default_playlist_quantity")]
    pub playlist_quantity: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            download_path: default_download_path(),
            theme: default_theme(),
            default_quality: default_quality(),
            window_geometry: default_window_geometry(),
            playlist_quantity: default_playlist_quantity(),
        }
    }
}

pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load settings; a missing or unreadable file yields the defaults.
    pub fn load(&self) -> Settings {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(settings) => settings,
                Err(e) => {
                    eprintln!("[Settings] Error loading settings: {}", e);
                    Settings::default()
                }
            },
            Err(_) => Settings::default(),
        }
    }

    /// Write settings as pretty JSON. Returns false on failure.
    pub fn save(&self, settings: &Settings) -> bool {
        if let Some(parent) = self.path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                eprintln!("[Settings] Error saving settings: {}", e);
                return false;
            }
        }
        let json = match serde_json::to_string_pretty(settings) {
            Ok(json) => json,
            Err(e) => {
                eprintln!("[Settings] Error saving settings: {}", e);
                return false;
            }
        };
        match std::fs::write(&self.path, json) {
            Ok(()) => true,
            Err(e) => {
                eprintln!("[Settings] Error saving settings: {}", e);
                false
            }
        }
    }
}
