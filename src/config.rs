// Application configuration
//
// One explicit config object built at startup and passed by reference into
// each component. File locations live under the user's home directory so the
// core works the same whether the app was installed or run from a checkout.

use std::path::PathBuf;

/// Timeouts for bounded subprocess and HTTP calls, in seconds.
///
/// The download stream itself has no timeout; only cancellation ends it.
#[derive(Debug, Clone, Copy)]
pub struct Timeouts {
    pub video_info: u64,
    pub playlist_info: u64,
    pub update_check: u64,
    pub update_install: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            video_info: 30,
            playlist_info: 30,
            update_check: 10,
            update_install: 30,
        }
    }
}

/// Application-wide configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub app_name: String,
    pub app_version: String,

    /// Flat-JSON settings file.
    pub settings_file: PathBuf,
    /// JSON-array download history file.
    pub history_file: PathBuf,
    /// Fallback download directory when settings carry none.
    pub default_download_path: PathBuf,

    pub default_quality: String,
    pub default_theme: String,
    pub default_playlist_quantity: String,
    pub max_history_entries: usize,

    pub timeouts: Timeouts,

    /// Releases endpoint for the application itself.
    pub update_check_url: String,
    /// Releases endpoint for the bundled yt-dlp.
    pub ytdlp_release_url: String,

    /// Explicit yt-dlp binary path; when None the tool is discovered.
    pub ytdlp_path: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        let downloads = dirs::download_dir().unwrap_or_else(|| home.join("Downloads"));

        Self {
            app_name: "YouTube Downloader".to_string(),
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            settings_file: home.join(".yt_downloader_settings.json"),
            history_file: home.join(".yt_downloader_history.json"),
            default_download_path: downloads,
            default_quality: "best".to_string(),
            default_theme: "dark".to_string(),
            default_playlist_quantity: "10".to_string(),
            max_history_entries: 50,
            timeouts: Timeouts::default(),
            update_check_url: "https://api.github.com/repos/you/youtube-downloader/releases/latest"
                .to_string(),
            ytdlp_release_url: "https://api.github.com/repos/yt-dlp/yt-dlp/releases/latest"
                .to_string(),
            ytdlp_path: None,
        }
    }
}

impl AppConfig {
    pub fn with_ytdlp_path(mut self, path: Option<String>) -> Self {
        self.ytdlp_path = path;
        self
    }

    pub fn with_update_check_url(mut self, url: String) -> Self {
        self.update_check_url = url;
        self
    }

    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }
}
