// Common data models for the download core

use serde::{Deserialize, Serialize};

/// Quality selector, mapped deterministically to a yt-dlp format expression
/// by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Quality {
    /// Highest resolution available (MP4 merge)
    #[serde(rename = "best")]
    Best,
    /// Full HD, 1920x1080
    #[serde(rename = "1080p")]
    Hd1080,
    /// HD, 1280x720
    #[serde(rename = "720p")]
    Hd720,
    /// Smallest file size
    #[serde(rename = "worst")]
    Worst,
    /// MP3 audio only
    #[serde(rename = "audio")]
    Audio,
}

impl Quality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Best => "best",
            Self::Hd1080 => "1080p",
            Self::Hd720 => "720p",
            Self::Worst => "worst",
            Self::Audio => "audio",
        }
    }

    /// Parse a settings-file quality value; unknown strings map to None.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "best" => Some(Self::Best),
            "1080p" => Some(Self::Hd1080),
            "720p" => Some(Self::Hd720),
            "worst" => Some(Self::Worst),
            "audio" => Some(Self::Audio),
            _ => None,
        }
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self::Best
    }
}

/// Options for a single download request.
///
/// Immutable once handed to the engine; the engine snapshots it into the
/// completion outcome.
#[derive(Debug, Clone, Serialize)]
pub struct DownloadOptions {
    pub quality: Quality,
    pub download_playlist: bool,
    /// 1-based playlist range start
    pub playlist_start: u32,
    /// 1-based playlist range end (inclusive)
    pub playlist_end: u32,
    /// Named quantity: a number string or "All"
    pub playlist_quantity: String,
    pub download_subtitles: bool,
    pub download_thumbnail: bool,
    pub output_path: String,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self {
            quality: Quality::Best,
            download_playlist: false,
            playlist_start: 1,
            playlist_end: 10,
            playlist_quantity: "10".to_string(),
            download_subtitles: false,
            download_thumbnail: false,
            output_path: dirs::download_dir()
                .unwrap_or_else(|| std::path::PathBuf::from("."))
                .to_string_lossy()
                .to_string(),
        }
    }
}

/// Coarse stage derived from a single yt-dlp output line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloadStage {
    Downloading,
    Preparing,
    AlreadyExists,
}

/// Sparse progress record extracted from one output line.
///
/// Every field is optional; the parser never emits an all-empty update.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProgressUpdate {
    pub percentage: Option<f32>,
    pub speed: Option<String>,
    pub eta: Option<String>,
    pub stage: Option<DownloadStage>,
    /// Destination path from a "[download] Destination:" line
    pub file_path: Option<String>,
    /// Human-readable phase text from `parse_status`
    pub status_text: Option<String>,
}

impl ProgressUpdate {
    pub fn is_empty(&self) -> bool {
        self.percentage.is_none()
            && self.speed.is_none()
            && self.eta.is_none()
            && self.stage.is_none()
            && self.file_path.is_none()
            && self.status_text.is_none()
    }

    pub fn status(text: impl Into<String>) -> Self {
        Self {
            status_text: Some(text.into()),
            ..Self::default()
        }
    }
}

/// Terminal result of one download request.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum DownloadOutcome {
    Completed {
        files: Vec<String>,
        output_path: String,
        options: DownloadOptions,
    },
    /// Always reported when cancellation was requested, even if the
    /// terminated process exits nonzero.
    Cancelled,
    Failed {
        return_code: i32,
    },
    MissingDependency {
        message: String,
    },
    Error {
        message: String,
    },
}

impl DownloadOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }
}

/// Video information extracted from a yt-dlp metadata dump
#[derive(Debug, Clone, Serialize)]
pub struct VideoInfo {
    pub title: String,
    pub uploader: String,
    pub duration_seconds: u64,
    pub view_count: u64,
    /// 8-digit YYYYMMDD string, possibly empty
    pub upload_date: String,
    pub description: String,
    pub thumbnail_url: String,
    pub video_id: String,
    pub webpage_url: String,
}

impl VideoInfo {
    /// Build from a yt-dlp `--dump-json` document. Missing fields fall back
    /// to placeholders rather than failing the whole fetch.
    pub fn from_json(json: &serde_json::Value) -> Self {
        Self {
            title: json["title"].as_str().unwrap_or("Unknown Title").to_string(),
            uploader: json["uploader"]
                .as_str()
                .unwrap_or("Unknown Channel")
                .to_string(),
            duration_seconds: json["duration"].as_f64().unwrap_or(0.0) as u64,
            view_count: json["view_count"].as_u64().unwrap_or(0),
            upload_date: json["upload_date"].as_str().unwrap_or("").to_string(),
            description: json["description"].as_str().unwrap_or("").to_string(),
            thumbnail_url: json["thumbnail"].as_str().unwrap_or("").to_string(),
            video_id: json["id"].as_str().unwrap_or("").to_string(),
            webpage_url: json["webpage_url"].as_str().unwrap_or("").to_string(),
        }
    }

    /// Duration in M:SS format
    pub fn formatted_duration(&self) -> String {
        if self.duration_seconds == 0 {
            return "Unknown".to_string();
        }
        format!(
            "{}:{:02}",
            self.duration_seconds / 60,
            self.duration_seconds % 60
        )
    }

    /// Upload date in YYYY-MM-DD format
    pub fn formatted_upload_date(&self) -> String {
        if self.upload_date.len() < 8 {
            return "Unknown".to_string();
        }
        format!(
            "{}-{}-{}",
            &self.upload_date[..4],
            &self.upload_date[4..6],
            &self.upload_date[6..8]
        )
    }

    /// View count with thousands separators
    pub fn formatted_view_count(&self) -> String {
        if self.view_count == 0 {
            return "Unknown".to_string();
        }
        let digits = self.view_count.to_string();
        let mut out = String::with_capacity(digits.len() + digits.len() / 3);
        for (i, c) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                out.push(',');
            }
            out.push(c);
        }
        out
    }
}

/// Playlist information from a flattened-playlist dump.
///
/// Keeps the raw per-video records; callers pick out what they display.
#[derive(Debug, Clone)]
pub struct PlaylistInfo {
    pub videos: Vec<serde_json::Value>,
    pub total_count: usize,
    /// Sum of the durations that are actually known
    pub total_duration: u64,
    /// Extrapolation of the known-duration average across the full count
    pub estimated_duration: u64,
}

impl PlaylistInfo {
    pub fn new(videos: Vec<serde_json::Value>) -> Self {
        let total_count = videos.len();
        let known: Vec<u64> = videos
            .iter()
            .filter_map(|v| v["duration"].as_f64())
            .filter(|d| *d > 0.0)
            .map(|d| d as u64)
            .collect();
        let total_duration: u64 = known.iter().sum();
        let estimated_duration = if known.is_empty() {
            0
        } else {
            (total_duration as f64 / known.len() as f64 * total_count as f64) as u64
        };

        Self {
            videos,
            total_count,
            total_duration,
            estimated_duration,
        }
    }

    /// First N video titles for preview display
    pub fn preview_titles(&self, count: usize) -> Vec<String> {
        self.videos
            .iter()
            .take(count)
            .enumerate()
            .map(|(i, v)| {
                v["title"]
                    .as_str()
                    .map(|t| t.to_string())
                    .unwrap_or_else(|| format!("Video {}", i + 1))
            })
            .collect()
    }

    /// Estimated duration as "~1h 23m" / "~45m"
    pub fn formatted_duration(&self) -> String {
        if self.estimated_duration == 0 {
            return "Duration unknown".to_string();
        }
        let hours = self.estimated_duration / 3600;
        let minutes = (self.estimated_duration % 3600) / 60;
        if hours > 0 {
            format!("~{}h {}m", hours, minutes)
        } else {
            format!("~{}m", minutes)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_video_info_from_json() {
        let doc = json!({
            "title": "My Video",
            "uploader": "My Channel",
            "duration": 125.0,
            "view_count": 1234567,
            "upload_date": "20240131",
            "thumbnail": "https://i.ytimg.com/vi/abc/hq.jpg",
            "id": "abc123",
            "webpage_url": "https://www.youtube.com/watch?v=abc123"
        });
        let info = VideoInfo::from_json(&doc);
        assert_eq!(info.title, "My Video");
        assert_eq!(info.duration_seconds, 125);
        assert_eq!(info.formatted_duration(), "2:05");
        assert_eq!(info.formatted_upload_date(), "2024-01-31");
        assert_eq!(info.formatted_view_count(), "1,234,567");
    }

    #[test]
    fn test_video_info_missing_fields() {
        let info = VideoInfo::from_json(&json!({}));
        assert_eq!(info.title, "Unknown Title");
        assert_eq!(info.uploader, "Unknown Channel");
        assert_eq!(info.formatted_duration(), "Unknown");
        assert_eq!(info.formatted_upload_date(), "Unknown");
        assert_eq!(info.formatted_view_count(), "Unknown");
    }

    #[test]
    fn test_playlist_duration_extrapolates_known_average() {
        // Two known durations (100s, 200s) across four entries:
        // average 150s * 4 = 600s estimated.
        let playlist = PlaylistInfo::new(vec![
            json!({"title": "a", "duration": 100.0}),
            json!({"title": "b", "duration": 200.0}),
            json!({"title": "c"}),
            json!({"title": "d", "duration": null}),
        ]);
        assert_eq!(playlist.total_count, 4);
        assert_eq!(playlist.total_duration, 300);
        assert_eq!(playlist.estimated_duration, 600);
        assert_eq!(playlist.formatted_duration(), "~10m");
    }

    #[test]
    fn test_playlist_no_known_durations() {
        let playlist = PlaylistInfo::new(vec![json!({"title": "a"})]);
        assert_eq!(playlist.estimated_duration, 0);
        assert_eq!(playlist.formatted_duration(), "Duration unknown");
    }

    #[test]
    fn test_playlist_preview_titles() {
        let playlist = PlaylistInfo::new(vec![
            json!({"title": "First"}),
            json!({}),
            json!({"title": "Third"}),
            json!({"title": "Fourth"}),
        ]);
        assert_eq!(
            playlist.preview_titles(3),
            vec!["First".to_string(), "Video 2".to_string(), "Third".to_string()]
        );
    }

    #[test]
    fn test_quality_round_trip() {
        for q in [
            Quality::Best,
            Quality::Hd1080,
            Quality::Hd720,
            Quality::Worst,
            Quality::Audio,
        ] {
            assert_eq!(Quality::parse(q.as_str()), Some(q));
        }
        assert_eq!(Quality::parse("4k"), None);
    }
}
