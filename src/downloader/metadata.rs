// Metadata fetching via non-downloading yt-dlp invocations
//
// Both calls are bounded by the configured timeouts and never surface an
// error to the caller: any failure becomes a log event plus None.

use std::sync::Arc;

use crate::config::Timeouts;

use super::events::EventSink;
use super::models::{PlaylistInfo, VideoInfo};
use super::utils::run_output_with_timeout;

pub struct MetadataFetcher {
    ytdlp_path: String,
    timeouts: Timeouts,
    events: Arc<dyn EventSink>,
}

impl MetadataFetcher {
    pub fn new(ytdlp_path: String, timeouts: Timeouts, events: Arc<dyn EventSink>) -> Self {
        Self {
            ytdlp_path,
            timeouts,
            events,
        }
    }

    /// Fetch single-video metadata with `--dump-json --no-download`.
    ///
    /// Only the first stdout line is parsed; yt-dlp may append warnings.
    pub async fn get_video_info(&self, url: &str) -> Option<VideoInfo> {
        self.events.on_log("🔄 Fetching video information...");

        let args = vec![
            "--dump-json".to_string(),
            "--no-download".to_string(),
            url.to_string(),
        ];

        let output =
            match run_output_with_timeout(&self.ytdlp_path, args, self.timeouts.video_info).await {
                Ok(output) => output,
                Err(e) => {
                    self.events
                        .on_log(&format!("❌ Could not fetch video information: {}", e));
                    return None;
                }
            };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            self.events
                .on_log(&format!("❌ Could not fetch video information: {}", stderr.trim()));
            return None;
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let first_line = stdout.trim().lines().next().unwrap_or("");
        match serde_json::from_str::<serde_json::Value>(first_line) {
            Ok(json) => {
                self.events.on_log("✅ Video information loaded");
                Some(VideoInfo::from_json(&json))
            }
            Err(e) => {
                self.events
                    .on_log(&format!("❌ Error parsing video information: {}", e));
                None
            }
        }
    }

    /// Fetch playlist metadata with `--flat-playlist --dump-json --quiet`.
    ///
    /// Each stdout line is parsed independently; unparseable lines are
    /// skipped. Zero recovered entries is a None result even on exit 0.
    pub async fn get_playlist_info(&self, url: &str) -> Option<PlaylistInfo> {
        self.events.on_log("🔄 Analyzing playlist...");

        let args = vec![
            "--flat-playlist".to_string(),
            "--dump-json".to_string(),
            "--quiet".to_string(),
            url.to_string(),
        ];

        let output =
            match run_output_with_timeout(&self.ytdlp_path, args, self.timeouts.playlist_info)
                .await
            {
                Ok(output) => output,
                Err(e) => {
                    self.events
                        .on_log(&format!("❌ Could not fetch playlist information: {}", e));
                    return None;
                }
            };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            self.events.on_log(&format!(
                "❌ Could not fetch playlist information: {}",
                stderr.trim()
            ));
            return None;
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let videos: Vec<serde_json::Value> = stdout
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect();

        if videos.is_empty() {
            self.events.on_log("❌ No videos found in playlist");
            return None;
        }

        let playlist = PlaylistInfo::new(videos);
        self.events.on_log(&format!(
            "✅ Playlist analyzed: {} videos",
            playlist.total_count
        ));
        Some(playlist)
    }
}
