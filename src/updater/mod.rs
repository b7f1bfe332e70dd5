// Updater module - release-feed checks and yt-dlp self-updating

pub mod release;
pub mod version;
pub mod ytdlp;

pub use release::{
    find_installer_url, AppUpdateChecker, GitHubFeed, ReleaseAsset, ReleaseFeed, ReleaseInfo,
    UpdateCheck,
};
pub use version::is_newer_version;
pub use ytdlp::{InstallContext, YtDlpUpdater};
