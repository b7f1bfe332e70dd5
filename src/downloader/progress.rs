// yt-dlp output scraping
//
// yt-dlp's human-readable output is not a stable contract. The patterns here
// pin the current format; a future yt-dlp release can silently stop matching.
// The tests below are characterization tests against the current format.

use lazy_static::lazy_static;
use regex::Regex;

use super::models::{DownloadStage, ProgressUpdate};

lazy_static! {
    static ref PERCENT_RE: Regex = Regex::new(r"(\d+(?:\.\d+)?)%").unwrap();
    static ref SPEED_RE: Regex = Regex::new(r"(\d+(?:\.\d+)?[KMG]?iB/s)").unwrap();
    static ref ETA_RE: Regex = Regex::new(r"ETA (\S+)").unwrap();
}

const DESTINATION_MARKER: &str = "[download] Destination: ";

/// Parse one output line for progress information.
///
/// Returns None for lines without the `[download]` marker, and for marker
/// lines where nothing recognizable was found, so no empty events reach the
/// UI. Each field is extracted independently; a line may yield any subset.
pub fn parse_progress(line: &str) -> Option<ProgressUpdate> {
    if !line.contains("[download]") {
        return None;
    }

    let mut update = ProgressUpdate::default();

    if let Some(caps) = PERCENT_RE.captures(line) {
        update.percentage = caps.get(1).and_then(|m| m.as_str().parse().ok());
    }
    if let Some(caps) = SPEED_RE.captures(line) {
        update.speed = caps.get(1).map(|m| m.as_str().to_string());
    }
    if let Some(caps) = ETA_RE.captures(line) {
        update.eta = caps.get(1).map(|m| m.as_str().to_string());
    }

    if line.contains('%') {
        update.stage = Some(DownloadStage::Downloading);
    } else if let Some(idx) = line.find(DESTINATION_MARKER) {
        update.stage = Some(DownloadStage::Preparing);
        let path = &line[idx + DESTINATION_MARKER.len()..];
        if !path.is_empty() {
            update.file_path = Some(path.to_string());
        }
    } else if line.contains("already been downloaded") {
        update.stage = Some(DownloadStage::AlreadyExists);
    }

    if update.is_empty() {
        None
    } else {
        Some(update)
    }
}

/// Map non-numeric status lines to fixed human-readable phrases.
pub fn parse_status(line: &str) -> Option<&'static str> {
    let lower = line.to_lowercase();

    if lower.contains("merging formats") {
        Some("Merging video and audio...")
    } else if lower.contains("extractaudio") {
        Some("Extracting audio...")
    } else if lower.contains("downloading webpage") {
        Some("Fetching video information...")
    } else if lower.contains("downloading tv client config") {
        Some("Loading video data...")
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_download_progress_line() {
        let line = "[download]  42.0% of 10.00MiB at 1.50MiB/s ETA 00:10";
        let update = parse_progress(line).expect("should parse");
        assert_eq!(update.percentage, Some(42.0));
        assert_eq!(update.speed.as_deref(), Some("1.50MiB/s"));
        assert_eq!(update.eta.as_deref(), Some("00:10"));
        assert_eq!(update.stage, Some(DownloadStage::Downloading));
        assert!(update.file_path.is_none());
    }

    #[test]
    fn test_fragment_progress_line() {
        let line = "[download]   6.2% of ~ 343.72MiB at  420.30KiB/s ETA 12:32 (frag 29/454)";
        let update = parse_progress(line).expect("should parse");
        assert_eq!(update.percentage, Some(6.2));
        assert_eq!(update.speed.as_deref(), Some("420.30KiB/s"));
        assert_eq!(update.eta.as_deref(), Some("12:32"));
    }

    #[test]
    fn test_destination_line() {
        let line = "[download] Destination: /x/y/video.mp4";
        let update = parse_progress(line).expect("should parse");
        assert_eq!(update.stage, Some(DownloadStage::Preparing));
        assert_eq!(update.file_path.as_deref(), Some("/x/y/video.mp4"));
        assert!(update.percentage.is_none());
    }

    #[test]
    fn test_already_downloaded_line() {
        let line = "[download] /x/y/video.mp4 has already been downloaded";
        let update = parse_progress(line).expect("should parse");
        assert_eq!(update.stage, Some(DownloadStage::AlreadyExists));
    }

    #[test]
    fn test_unrelated_lines_yield_none() {
        assert!(parse_progress("").is_none());
        assert!(parse_progress("[youtube] dQw4w9WgXcQ: Downloading webpage").is_none());
        // Marker present but nothing recognizable
        assert!(parse_progress("[download] Downloading playlist: My Mix").is_none());
    }

    #[test]
    fn test_status_phrases() {
        assert_eq!(
            parse_status("[Merger] Merging formats into \"out.mp4\""),
            Some("Merging video and audio...")
        );
        assert_eq!(
            parse_status("[ExtractAudio] Destination: out.mp3"),
            Some("Extracting audio...")
        );
        assert_eq!(
            parse_status("[youtube] abc: Downloading webpage"),
            Some("Fetching video information...")
        );
        assert_eq!(
            parse_status("[youtube] abc: Downloading tv client config"),
            Some("Loading video data...")
        );
        assert_eq!(parse_status("[download] 10.0% of 1MiB"), None);
    }
}
