// Release-feed checking against a GitHub releases endpoint

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncWriteExt;

use crate::downloader::errors::DownloadError;

use super::version::is_newer_version;

const USER_AGENT: &str = concat!("youtube-downloader-core/", env!("CARGO_PKG_VERSION"));

/// One downloadable artifact attached to a release.
#[derive(Debug, Clone, Deserialize)]
pub struct ReleaseAsset {
    pub name: String,
    pub browser_download_url: String,
}

/// The subset of the releases-API document the core reads.
#[derive(Debug, Clone, Deserialize)]
pub struct ReleaseInfo {
    pub tag_name: String,
    #[serde(default)]
    pub assets: Vec<ReleaseAsset>,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub published_at: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub zipball_url: Option<String>,
}

/// Result of an update check. Network failures land in `error`; they never
/// propagate as errors across the core boundary.
#[derive(Debug, Clone, Default, Serialize)]
pub struct UpdateCheck {
    pub update_available: bool,
    pub latest_version: Option<String>,
    pub download_url: Option<String>,
    pub release_notes: Option<String>,
    pub release_date: Option<String>,
    pub release_name: Option<String>,
    pub error: Option<String>,
}

/// Source of release descriptors. Both update checkers share this seam.
#[async_trait]
pub trait ReleaseFeed: Send + Sync {
    async fn latest_release(&self) -> Result<ReleaseInfo, DownloadError>;
}

/// GitHub releases/latest endpoint client with a bounded request timeout.
pub struct GitHubFeed {
    api_url: String,
    timeout_secs: u64,
}

impl GitHubFeed {
    pub fn new(api_url: String, timeout_secs: u64) -> Self {
        Self {
            api_url,
            timeout_secs,
        }
    }

    fn client(&self) -> Result<reqwest::Client, DownloadError> {
        reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(self.timeout_secs))
            .build()
            .map_err(|e| DownloadError::Network(e.to_string()))
    }
}

#[async_trait]
impl ReleaseFeed for GitHubFeed {
    async fn latest_release(&self) -> Result<ReleaseInfo, DownloadError> {
        let response = self
            .client()?
            .get(&self.api_url)
            .send()
            .await
            .map_err(|e| DownloadError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(DownloadError::Network(format!(
                "{} returned HTTP {}",
                self.api_url,
                response.status()
            )));
        }

        response
            .json::<ReleaseInfo>()
            .await
            .map_err(|e| DownloadError::ParseError(e.to_string()))
    }
}

/// Update checker for the application's own release feed.
pub struct AppUpdateChecker {
    feed: GitHubFeed,
    current_version: String,
}

impl AppUpdateChecker {
    pub fn new(api_url: String, current_version: String, timeout_secs: u64) -> Self {
        Self {
            feed: GitHubFeed::new(api_url, timeout_secs),
            current_version,
        }
    }

    /// Check the feed; `update_available` is true only for a strictly newer
    /// tag. Failures come back as `error`, never as a panic or Err.
    pub async fn check(&self) -> UpdateCheck {
        let release = match self.feed.latest_release().await {
            Ok(release) => release,
            Err(e) => {
                return UpdateCheck {
                    error: Some(e.to_string()),
                    ..UpdateCheck::default()
                }
            }
        };

        let latest = release.tag_name.trim_start_matches('v').to_string();
        if !is_newer_version(&self.current_version, &latest) {
            return UpdateCheck::default();
        }

        UpdateCheck {
            update_available: true,
            download_url: find_installer_url(&release),
            release_notes: Some(release.body),
            release_date: Some(release.published_at),
            release_name: Some(if release.name.is_empty() {
                format!("Version {}", latest)
            } else {
                release.name
            }),
            latest_version: Some(latest),
            error: None,
        }
    }

    /// Stream a release artifact to disk.
    pub async fn download_update(&self, url: &str, save_path: &Path) -> Result<(), DownloadError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| DownloadError::Network(e.to_string()))?;

        let mut response = client
            .get(url)
            .send()
            .await
            .map_err(|e| DownloadError::Network(e.to_string()))?
            .error_for_status()
            .map_err(|e| DownloadError::Network(e.to_string()))?;

        let mut file = tokio::fs::File::create(save_path)
            .await
            .map_err(|e| DownloadError::ExecutionError(e.to_string()))?;

        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| DownloadError::Network(e.to_string()))?
        {
            file.write_all(&chunk)
                .await
                .map_err(|e| DownloadError::ExecutionError(e.to_string()))?;
        }
        file.flush()
            .await
            .map_err(|e| DownloadError::ExecutionError(e.to_string()))?;

        Ok(())
    }
}

/// Pick the installer artifact: a `.exe`, or anything named like an
/// installer/setup package.
pub fn find_installer_url(release: &ReleaseInfo) -> Option<String> {
    release.assets.iter().find_map(|asset| {
        let name = asset.name.to_lowercase();
        if name.ends_with(".exe") || name.contains("setup") || name.contains("installer") {
            Some(asset.browser_download_url.clone())
        } else {
            None
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn release_with_assets(names: &[&str]) -> ReleaseInfo {
        ReleaseInfo {
            tag_name: "v2.0.0".to_string(),
            assets: names
                .iter()
                .map(|n| ReleaseAsset {
                    name: n.to_string(),
                    browser_download_url: format!("https://example.com/{}", n),
                })
                .collect(),
            body: String::new(),
            published_at: String::new(),
            name: String::new(),
            zipball_url: None,
        }
    }

    #[test]
    fn test_installer_asset_selection() {
        let release = release_with_assets(&["source.tar.gz", "App-Setup-2.0.0.exe"]);
        assert_eq!(
            find_installer_url(&release),
            Some("https://example.com/App-Setup-2.0.0.exe".to_string())
        );

        let portable = release_with_assets(&["app-installer.zip", "notes.txt"]);
        assert_eq!(
            find_installer_url(&portable),
            Some("https://example.com/app-installer.zip".to_string())
        );
    }

    #[test]
    fn test_no_installer_asset() {
        let release = release_with_assets(&["source.tar.gz", "checksums.txt"]);
        assert_eq!(find_installer_url(&release), None);
    }

    #[test]
    fn test_release_json_shape() {
        let doc = r#"{
            "tag_name": "v1.2.3",
            "name": "Version 1.2.3",
            "body": "Fixes",
            "published_at": "2024-06-01T12:00:00Z",
            "assets": [
                {"name": "app.exe", "browser_download_url": "https://example.com/app.exe"}
            ]
        }"#;
        let release: ReleaseInfo = serde_json::from_str(doc).expect("parse release");
        assert_eq!(release.tag_name, "v1.2.3");
        assert_eq!(release.assets.len(), 1);
        assert!(release.zipball_url.is_none());
    }

    #[test]
    fn test_release_json_missing_optional_fields() {
        let release: ReleaseInfo =
            serde_json::from_str(r#"{"tag_name": "v1.0.0"}"#).expect("parse minimal release");
        assert!(release.assets.is_empty());
        assert_eq!(release.body, "");
    }
}
