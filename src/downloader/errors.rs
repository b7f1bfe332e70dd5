// Error types for the download core

use std::fmt;

#[derive(Debug, Clone)]
pub enum DownloadError {
    /// yt-dlp (or ffmpeg) not found on the system
    ToolNotFound(String),

    /// Invalid YouTube URL format
    InvalidUrl(String),

    /// Failed to parse yt-dlp JSON output
    ParseError(String),

    /// Subprocess launch or capture failed
    ExecutionError(String),

    /// Bounded call exceeded its time budget (seconds)
    Timeout(u64),

    /// HTTP request failed or returned a bad status
    Network(String),

    /// Unknown error with details
    Unknown(String),
}

impl fmt::Display for DownloadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ToolNotFound(tool) => write!(f, "Tool not found: {}", tool),
            Self::InvalidUrl(url) => write!(f, "Invalid URL: {}", url),
            Self::ParseError(msg) => write!(f, "Parse error: {}", msg),
            Self::ExecutionError(msg) => write!(f, "Execution error: {}", msg),
            Self::Timeout(secs) => write!(f, "Timed out after {}s", secs),
            Self::Network(msg) => write!(f, "Network error: {}", msg),
            Self::Unknown(msg) => write!(f, "Unknown error: {}", msg),
        }
    }
}

impl std::error::Error for DownloadError {}
