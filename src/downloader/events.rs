// Event boundary between the core and the presentation layer
//
// The UI hands the core one sink; the core talks back only through these
// four calls. Every handler has a no-op default so a sink implements just
// what it cares about.

use super::models::{DownloadOutcome, ProgressUpdate};

/// Listener for core events.
///
/// Implementations must be `Send + Sync`: events are delivered from worker
/// threads and from async tasks. Marshaling onto the UI thread is the sink's
/// job (e.g. forward into a channel the UI drains); the core never touches
/// UI state.
pub trait EventSink: Send + Sync {
    /// Raw log line or user-facing status message
    fn on_log(&self, _message: &str) {}

    /// Parsed progress for the active download
    fn on_progress(&self, _update: &ProgressUpdate) {}

    /// Terminal outcome of a download request
    fn on_complete(&self, _outcome: &DownloadOutcome) {}

    /// Synchronous validation failure or mid-download error
    fn on_error(&self, _message: &str) {}
}

/// Sink that drops every event. Useful as a default and in tests.
pub struct NullEventSink;

impl EventSink for NullEventSink {}
