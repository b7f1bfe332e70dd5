// Download orchestration core for a YouTube downloader desktop app
//
// The presentation layer constructs an AppConfig and an EventSink, builds a
// DownloaderCore, and drives everything through it. Events flow back only
// through the sink.

pub mod config;
pub mod downloader;
pub mod history;
pub mod settings;
pub mod updater;

pub use config::{AppConfig, Timeouts};
pub use downloader::{
    DownloadEngine, DownloadError, DownloadOptions, DownloadOutcome, DownloadStage,
    DownloaderCore, EventSink, MetadataFetcher, NullEventSink, PlaylistInfo, ProgressUpdate,
    Quality, VideoInfo,
};
pub use history::{HistoryEntry, HistoryStore};
pub use settings::{Settings, SettingsStore};
pub use updater::{AppUpdateChecker, InstallContext, UpdateCheck, YtDlpUpdater};
