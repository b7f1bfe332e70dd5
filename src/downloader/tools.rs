// External tool discovery and version probing
//
// The core drives yt-dlp directly; ffmpeg is invoked by yt-dlp for muxing
// and only needs to be discoverable.

use serde::{Deserialize, Serialize};
use std::process::Command;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ToolKind {
    YtDlp,
    Ffmpeg,
}

impl ToolKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolKind::YtDlp => "yt-dlp",
            ToolKind::Ffmpeg => "ffmpeg",
        }
    }

    fn version_arg(&self) -> &'static str {
        match self {
            ToolKind::YtDlp => "--version",
            ToolKind::Ffmpeg => "-version",
        }
    }

    fn install_hint(&self) -> &'static str {
        match self {
            ToolKind::YtDlp => "pip install yt-dlp",
            ToolKind::Ffmpeg => "Download from https://ffmpeg.org/",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolStatus {
    pub name: String,
    pub path: Option<String>,
    pub version: Option<String>,
    pub is_available: bool,
}

pub struct ToolManager;

impl ToolManager {
    pub fn new() -> Self {
        Self
    }

    /// Locate a tool binary: common install paths first, then PATH.
    pub fn find_tool(&self, kind: ToolKind) -> Option<String> {
        let binary = kind.as_str();

        let common_paths = [
            format!("/opt/homebrew/bin/{}", binary),
            format!("/usr/local/bin/{}", binary),
            format!("/usr/bin/{}", binary),
        ];
        for path in common_paths {
            if std::path::Path::new(&path).exists() {
                return Some(path);
            }
        }

        let lookup = if cfg!(windows) { "where" } else { "which" };
        if let Ok(output) = Command::new(lookup).arg(binary).output() {
            if output.status.success() {
                let path = String::from_utf8_lossy(&output.stdout)
                    .lines()
                    .next()
                    .unwrap_or("")
                    .trim()
                    .to_string();
                if !path.is_empty() {
                    return Some(path);
                }
            }
        }

        None
    }

    pub fn probe(&self, kind: ToolKind) -> ToolStatus {
        let path = self.find_tool(kind);
        let version = path.as_deref().and_then(|p| self.get_version(p, kind));
        ToolStatus {
            name: kind.as_str().to_string(),
            is_available: path.is_some(),
            path,
            version,
        }
    }

    pub fn all(&self) -> Vec<ToolStatus> {
        vec![self.probe(ToolKind::YtDlp), self.probe(ToolKind::Ffmpeg)]
    }

    /// Tools required for a working download pipeline that are absent.
    pub fn missing_dependencies(&self) -> Vec<ToolKind> {
        [ToolKind::YtDlp, ToolKind::Ffmpeg]
            .into_iter()
            .filter(|kind| self.find_tool(*kind).is_none())
            .collect()
    }

    fn get_version(&self, path: &str, kind: ToolKind) -> Option<String> {
        match Command::new(path).arg(kind.version_arg()).output() {
            Ok(output) if output.status.success() => {
                let out = String::from_utf8_lossy(&output.stdout);
                // ffmpeg prints a banner; the first line carries the version
                out.lines().next().map(|l| l.trim().to_string())
            }
            _ => None,
        }
    }
}

impl Default for ToolManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Human-readable missing-dependency message with install instructions.
pub fn format_dependency_error(missing: &[ToolKind]) -> String {
    let names: Vec<&str> = missing.iter().map(|k| k.as_str()).collect();
    let instructions: Vec<String> = missing
        .iter()
        .map(|k| format!("• {}: {}", k.as_str(), k.install_hint()))
        .collect();
    format!(
        "Missing dependencies: {}\n\nPlease install:\n{}",
        names.join(", "),
        instructions.join("\n")
    )
}

/// Resolve the yt-dlp binary: explicit override, discovery, PATH fallback.
pub fn resolve_ytdlp_path(override_path: Option<&str>) -> String {
    if let Some(path) = override_path {
        return path.to_string();
    }
    ToolManager::new()
        .find_tool(ToolKind::YtDlp)
        .unwrap_or_else(|| "yt-dlp".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dependency_error_lists_all_missing() {
        let msg = format_dependency_error(&[ToolKind::YtDlp, ToolKind::Ffmpeg]);
        assert!(msg.contains("yt-dlp, ffmpeg"));
        assert!(msg.contains("pip install yt-dlp"));
        assert!(msg.contains("ffmpeg.org"));
    }

    #[test]
    fn test_resolve_ytdlp_path_prefers_override() {
        assert_eq!(
            resolve_ytdlp_path(Some("/custom/yt-dlp")),
            "/custom/yt-dlp"
        );
    }
}
