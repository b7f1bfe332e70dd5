// Downloader module - process supervision, parsing, and metadata

pub mod engine;
pub mod errors;
pub mod events;
pub mod metadata;
pub mod models;
pub mod orchestrator;
pub mod progress;
pub mod tools;
pub mod urls;
pub mod utils;

pub use engine::DownloadEngine;
pub use errors::DownloadError;
pub use events::{EventSink, NullEventSink};
pub use metadata::MetadataFetcher;
pub use models::{
    DownloadOptions, DownloadOutcome, DownloadStage, PlaylistInfo, ProgressUpdate, Quality,
    VideoInfo,
};
pub use orchestrator::DownloaderCore;
pub use tools::{ToolKind, ToolManager, ToolStatus};
