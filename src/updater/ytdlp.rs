// Self-updating for the bundled yt-dlp
//
// Two execution contexts:
// - Source: yt-dlp came from the user's own tooling (pip, brew). Replacing
//   it behind the package manager's back would be wrong, so the archive flow
//   is a no-op success; `run_self_update` delegates to `yt-dlp -U` instead.
// - Standalone: the app ships a bundled `yt_dlp` module directory next to
//   the executable. Updates download the release archive, extract the inner
//   module directory, and swap it in with a backup to roll back to.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::{AppConfig, Timeouts};
use crate::downloader::errors::DownloadError;
use crate::downloader::events::EventSink;
use crate::downloader::utils::run_output_with_timeout;

use super::release::{GitHubFeed, ReleaseFeed, ReleaseInfo};
use super::version::is_newer_version;

const USER_AGENT: &str = concat!("youtube-downloader-core/", env!("CARGO_PKG_VERSION"));

/// Marker file that identifies the yt_dlp module directory inside a release
/// archive.
const MODULE_MARKER: &str = "__init__.py";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallContext {
    /// Tool managed by the user's own package tooling
    Source,
    /// Bundled module directory shipped next to the executable
    Standalone,
}

pub struct YtDlpUpdater {
    context: InstallContext,
    /// Bundled module directory (Standalone only)
    module_dir: Option<PathBuf>,
    /// Where the pre-update copy is kept for rollback
    backup_dir: Option<PathBuf>,
    feed: GitHubFeed,
    ytdlp_path: String,
    timeouts: Timeouts,
    events: Arc<dyn EventSink>,
}

impl YtDlpUpdater {
    pub fn new(config: &AppConfig, ytdlp_path: String, events: Arc<dyn EventSink>) -> Self {
        let module_dir = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(|dir| dir.join("yt_dlp")))
            .filter(|dir| dir.is_dir());

        let context = if module_dir.is_some() {
            InstallContext::Standalone
        } else {
            InstallContext::Source
        };

        let backup_dir = dirs::home_dir()
            .map(|home| home.join(".youtube-downloader").join("yt_dlp_backup"));

        Self {
            context,
            module_dir,
            backup_dir,
            feed: GitHubFeed::new(
                config.ytdlp_release_url.clone(),
                config.timeouts.update_check,
            ),
            ytdlp_path,
            timeouts: config.timeouts,
            events,
        }
    }

    pub fn context(&self) -> InstallContext {
        self.context
    }

    /// Current yt-dlp version via `yt-dlp --version`.
    pub async fn current_version(&self) -> Option<String> {
        let args = vec!["--version".to_string()];
        match run_output_with_timeout(&self.ytdlp_path, args, self.timeouts.update_check).await {
            Ok(output) if output.status.success() => {
                let version = String::from_utf8_lossy(&output.stdout).trim().to_string();
                self.events.on_log(&format!("yt-dlp version: {}", version));
                Some(version)
            }
            Ok(_) => None,
            Err(e) => {
                self.events
                    .on_log(&format!("Could not check yt-dlp version: {}", e));
                None
            }
        }
    }

    /// Latest release descriptor, or None with a log event on failure.
    pub async fn latest_release(&self) -> Option<ReleaseInfo> {
        self.events.on_log("🔍 Checking for yt-dlp updates...");
        match self.feed.latest_release().await {
            Ok(release) => Some(release),
            Err(e) => {
                self.events
                    .on_log(&format!("❌ Error checking for updates: {}", e));
                None
            }
        }
    }

    /// Whether a strictly newer release exists. Always false in Source
    /// context.
    pub async fn needs_update(&self) -> bool {
        if self.context == InstallContext::Source {
            return false;
        }
        let (Some(current), Some(release)) =
            (self.current_version().await, self.latest_release().await)
        else {
            return false;
        };
        is_newer_version(&current, release.tag_name.trim_start_matches('v'))
    }

    /// Context-aware update. Source context is a no-op success.
    pub async fn update(&self) -> bool {
        let Some(module_dir) = self.module_dir.clone() else {
            self.events
                .on_log("ℹ️ Manual yt-dlp update not needed when installed from source");
            return true;
        };

        let Some(release) = self.latest_release().await else {
            self.events.on_log("❌ Could not check for updates");
            return false;
        };

        let latest = release.tag_name.trim_start_matches('v').to_string();
        let current = self.current_version().await;
        self.events.on_log(&format!(
            "📊 Current version: {}",
            current.as_deref().unwrap_or("unknown")
        ));
        self.events.on_log(&format!("📊 Latest version: {}", latest));

        match &current {
            Some(current) if is_newer_version(current, &latest) => {}
            // Unknown current version also counts as up to date; swapping
            // blind would risk replacing a working module with the same one.
            _ => {
                self.events.on_log("✅ yt-dlp is already up to date");
                return true;
            }
        }

        let Some(url) = archive_url(&release) else {
            self.events.on_log("❌ No download URL found");
            return false;
        };

        self.download_and_swap(&url, &module_dir).await
    }

    /// Silent startup check: update when needed, never fail the app.
    pub async fn auto_update_check(&self) -> bool {
        if self.context == InstallContext::Source {
            return true;
        }
        if self.needs_update().await {
            self.events.on_log("🔄 Auto-updating yt-dlp...");
            return self.update().await;
        }
        true
    }

    /// Delegate to the tool's own updater (`yt-dlp -U`). Used in Source
    /// context where the archive swap does not apply.
    pub async fn run_self_update(&self) -> bool {
        self.events.on_log("🔄 Checking for yt-dlp updates...");
        let args = vec!["-U".to_string()];
        match run_output_with_timeout(&self.ytdlp_path, args, self.timeouts.update_install).await {
            Ok(output) if output.status.success() => {
                let stdout = String::from_utf8_lossy(&output.stdout);
                if stdout.contains("Updated") {
                    self.events.on_log("✅ yt-dlp updated to latest version");
                } else if stdout.contains("up to date") {
                    self.events.on_log("✅ yt-dlp is already up to date");
                } else {
                    self.events.on_log("ℹ️ yt-dlp update completed");
                }
                true
            }
            Ok(output) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                self.events
                    .on_log(&format!("❌ Update failed: {}", stderr.trim()));
                false
            }
            Err(e) => {
                self.events.on_log(&format!("❌ Error updating yt-dlp: {}", e));
                false
            }
        }
    }

    /// Download the release archive and swap in the new module directory,
    /// restoring the backup if anything after the backup step fails.
    async fn download_and_swap(&self, url: &str, module_dir: &Path) -> bool {
        let staged = match self.download_and_extract(url).await {
            Ok(staged) => staged,
            Err(e) => {
                self.events.on_log(&format!("❌ Update failed: {}", e));
                return false;
            }
        };

        let mut backed_up = false;
        let result = self.swap_module_dir(staged.path(), module_dir, &mut backed_up);
        match result {
            Ok(()) => {
                self.events.on_log("✅ yt-dlp updated successfully!");
                true
            }
            Err(e) => {
                self.events.on_log(&format!("❌ Update failed: {}", e));
                if backed_up {
                    self.restore_backup(module_dir);
                }
                false
            }
        }
    }

    /// Download the archive, extract it, and return the temp directory that
    /// holds the located module directory at `<tempdir>/yt_dlp`.
    async fn download_and_extract(&self, url: &str) -> Result<StagedModule, DownloadError> {
        self.events.on_log("📥 Downloading yt-dlp update...");

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

        let total = response.content_length().unwrap_or(0);
        let mut downloaded: u64 = 0;
        let mut last_logged = 0u64;

        let mut archive_file = tempfile::NamedTempFile::new()
            .map_err(|e| DownloadError::ExecutionError(e.to_string()))?;
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| DownloadError::Network(e.to_string()))?
        {
            archive_file
                .write_all(&chunk)
                .map_err(|e| DownloadError::ExecutionError(e.to_string()))?;
            downloaded += chunk.len() as u64;
            if total > 0 {
                let percent = downloaded * 100 / total;
                if percent >= last_logged + 10 {
                    last_logged = percent;
                    self.events
                        .on_log(&format!("📥 Downloading: {}%", percent));
                }
            }
        }

        self.events.on_log("📦 Extracting update...");
        let extract_dir =
            tempfile::tempdir().map_err(|e| DownloadError::ExecutionError(e.to_string()))?;
        let file = std::fs::File::open(archive_file.path())
            .map_err(|e| DownloadError::ExecutionError(e.to_string()))?;
        let mut archive = zip::ZipArchive::new(file)
            .map_err(|e| DownloadError::ParseError(format!("Bad archive: {}", e)))?;
        archive
            .extract(extract_dir.path())
            .map_err(|e| DownloadError::ExecutionError(format!("Extraction failed: {}", e)))?;

        let Some(source) = find_module_dir(extract_dir.path()) else {
            return Err(DownloadError::ParseError(
                "Could not find yt_dlp folder in update".to_string(),
            ));
        };

        Ok(StagedModule {
            _root: extract_dir,
            module: source,
        })
    }

    /// Back up the current directory, then swap the staged one in. The swap
    /// itself is a same-filesystem rename of a fully staged sibling.
    fn swap_module_dir(
        &self,
        staged_module: &Path,
        module_dir: &Path,
        backed_up: &mut bool,
    ) -> Result<(), DownloadError> {
        let io = |e: std::io::Error| DownloadError::ExecutionError(e.to_string());

        let parent = module_dir
            .parent()
            .ok_or_else(|| DownloadError::ExecutionError("Module dir has no parent".to_string()))?;
        let incoming = parent.join("yt_dlp.new");
        if incoming.exists() {
            std::fs::remove_dir_all(&incoming).map_err(io)?;
        }
        copy_dir(staged_module, &incoming).map_err(io)?;

        if module_dir.exists() {
            if let Some(backup) = &self.backup_dir {
                self.events.on_log("💾 Creating backup...");
                if backup.exists() {
                    std::fs::remove_dir_all(backup).map_err(io)?;
                }
                if let Some(backup_parent) = backup.parent() {
                    std::fs::create_dir_all(backup_parent).map_err(io)?;
                }
                copy_dir(module_dir, backup).map_err(io)?;
                *backed_up = true;
            }
            self.events.on_log("🔄 Installing update...");
            std::fs::remove_dir_all(module_dir).map_err(io)?;
        }

        std::fs::rename(&incoming, module_dir).map_err(io)?;
        Ok(())
    }

    fn restore_backup(&self, module_dir: &Path) {
        let Some(backup) = &self.backup_dir else {
            return;
        };
        if !backup.exists() {
            return;
        }
        self.events.on_log("🔄 Restoring backup...");
        if module_dir.exists() {
            let _ = std::fs::remove_dir_all(module_dir);
        }
        if let Err(e) = copy_dir(backup, module_dir) {
            self.events
                .on_log(&format!("❌ Backup restore failed: {}", e));
        }
    }
}

/// Extracted archive contents plus the located module directory inside it.
/// The temp dir lives as long as this value.
struct StagedModule {
    _root: tempfile::TempDir,
    module: PathBuf,
}

impl StagedModule {
    fn path(&self) -> &Path {
        &self.module
    }
}

/// Release-archive URL: the `*yt-dlp*.zip` asset, else the source zipball.
fn archive_url(release: &ReleaseInfo) -> Option<String> {
    release
        .assets
        .iter()
        .find(|asset| asset.name.contains("yt-dlp") && asset.name.ends_with(".zip"))
        .map(|asset| asset.browser_download_url.clone())
        .or_else(|| release.zipball_url.clone())
}

/// Find a directory named `yt_dlp` containing the module marker, anywhere
/// under `root`.
fn find_module_dir(root: &Path) -> Option<PathBuf> {
    let entries = std::fs::read_dir(root).ok()?;
    let mut subdirs = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        if path.file_name().map(|n| n == "yt_dlp").unwrap_or(false)
            && path.join(MODULE_MARKER).is_file()
        {
            return Some(path);
        }
        subdirs.push(path);
    }
    subdirs.into_iter().find_map(|dir| find_module_dir(&dir))
}

fn copy_dir(src: &Path, dst: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(dst)?;
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let target = dst.join(entry.file_name());
        if entry.path().is_dir() {
            copy_dir(&entry.path(), &target)?;
        } else {
            std::fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}
