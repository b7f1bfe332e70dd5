// Core facade composing the engine, metadata fetcher, and updaters

use std::sync::Arc;

use crate::config::AppConfig;
use crate::updater::{AppUpdateChecker, UpdateCheck, YtDlpUpdater};

use super::engine::DownloadEngine;
use super::events::EventSink;
use super::metadata::MetadataFetcher;
use super::models::{DownloadOptions, PlaylistInfo, VideoInfo};
use super::tools;
use super::urls;

/// Single entry point for the presentation layer.
///
/// All blocking work (downloads, metadata, update checks) runs off the
/// caller's thread; results come back through the shared `EventSink` or the
/// returned futures.
pub struct DownloaderCore {
    engine: DownloadEngine,
    fetcher: MetadataFetcher,
    ytdlp_updater: YtDlpUpdater,
    app_updater: AppUpdateChecker,
}

impl DownloaderCore {
    pub fn new(config: &AppConfig, events: Arc<dyn EventSink>) -> Self {
        let ytdlp_path = tools::resolve_ytdlp_path(config.ytdlp_path.as_deref());

        Self {
            engine: DownloadEngine::new(
                ytdlp_path.clone(),
                config.default_playlist_quantity.clone(),
                Arc::clone(&events),
            ),
            fetcher: MetadataFetcher::new(
                ytdlp_path.clone(),
                config.timeouts,
                Arc::clone(&events),
            ),
            ytdlp_updater: YtDlpUpdater::new(config, ytdlp_path, Arc::clone(&events)),
            app_updater: AppUpdateChecker::new(
                config.update_check_url.clone(),
                config.app_version.clone(),
                config.timeouts.update_check,
            ),
        }
    }

    pub async fn get_video_info(&self, url: &str) -> Option<VideoInfo> {
        self.fetcher.get_video_info(url).await
    }

    pub async fn get_playlist_info(&self, url: &str) -> Option<PlaylistInfo> {
        self.fetcher.get_playlist_info(url).await
    }

    pub fn start_download(&self, url: &str, options: DownloadOptions) -> bool {
        self.engine.download(url, options)
    }

    pub fn cancel_download(&self) -> bool {
        self.engine.cancel()
    }

    pub fn is_downloading(&self) -> bool {
        self.engine.is_busy()
    }

    pub async fn check_ytdlp_version(&self) -> Option<String> {
        self.ytdlp_updater.current_version().await
    }

    pub async fn update_ytdlp(&self) -> bool {
        self.ytdlp_updater.update().await
    }

    pub async fn check_app_update(&self) -> UpdateCheck {
        self.app_updater.check().await
    }

    pub fn validate_url(&self, url: &str) -> bool {
        urls::is_valid_youtube_url(url)
    }

    pub fn is_playlist_url(&self, url: &str) -> bool {
        urls::is_playlist_url(url)
    }
}
