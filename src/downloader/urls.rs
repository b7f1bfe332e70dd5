// YouTube URL validation and id extraction

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Recognized URL shapes: watch, short link, embed, legacy /v/, playlist.
    static ref URL_PATTERNS: Vec<Regex> = vec![
        Regex::new(r"^(?:https?://)?(?:www\.)?youtube\.com/watch\?v=[\w-]+").unwrap(),
        Regex::new(r"^(?:https?://)?(?:www\.)?youtu\.be/[\w-]+").unwrap(),
        Regex::new(r"^(?:https?://)?(?:www\.)?youtube\.com/embed/[\w-]+").unwrap(),
        Regex::new(r"^(?:https?://)?(?:www\.)?youtube\.com/v/[\w-]+").unwrap(),
        Regex::new(r"^(?:https?://)?(?:www\.)?youtube\.com/playlist\?list=[\w-]+").unwrap(),
    ];
    static ref VIDEO_ID_RE: Regex =
        Regex::new(r"(?:youtube\.com/watch\?v=|youtu\.be/|youtube\.com/embed/)([^&\n?#]+)")
            .unwrap();
    static ref PLAYLIST_ID_RE: Regex = Regex::new(r"list=([^&\n?#]+)").unwrap();
}

/// Check if the trimmed input matches a recognized YouTube URL shape.
pub fn is_valid_youtube_url(url: &str) -> bool {
    let url = url.trim();
    if url.is_empty() {
        return false;
    }
    URL_PATTERNS.iter().any(|p| p.is_match(url))
}

/// True when the URL carries a playlist-list query marker.
pub fn is_playlist_url(url: &str) -> bool {
    url.contains("playlist?list=") || url.contains("&list=")
}

/// Extract the video id from a watch/short/embed URL.
pub fn extract_video_id(url: &str) -> Option<String> {
    VIDEO_ID_RE
        .captures(url)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Extract the playlist id from any URL carrying `list=`.
pub fn extract_playlist_id(url: &str) -> Option<String> {
    PLAYLIST_ID_RE
        .captures(url)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}
