// Download history persistence
//
// Append-only JSON array at a fixed per-user path, capped to the newest N
// entries on every save; older entries are silently dropped.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use time::macros::format_description;
use time::OffsetDateTime;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub title: String,
    pub url: String,
    pub quality: String,
    pub path: String,
    /// "YYYY-MM-DD HH:MM"
    pub date: String,
    pub status: String,
}

pub struct HistoryStore {
    path: PathBuf,
    max_entries: usize,
}

impl HistoryStore {
    pub fn new(path: impl Into<PathBuf>, max_entries: usize) -> Self {
        Self {
            path: path.into(),
            max_entries,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load history; a missing or corrupt file yields an empty list.
    pub fn load(&self) -> Vec<HistoryEntry> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(history) => history,
                Err(e) => {
                    eprintln!("[History] Error loading history: {}", e);
                    Vec::new()
                }
            },
            Err(_) => Vec::new(),
        }
    }

    /// Persist history, keeping only the newest `max_entries`.
    pub fn save(&self, history: &[HistoryEntry]) -> bool {
        let start = history.len().saturating_sub(self.max_entries);
        let capped = &history[start..];

        if let Some(parent) = self.path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                eprintln!("[History] Error saving history: {}", e);
                return false;
            }
        }
        let json = match serde_json::to_string_pretty(capped) {
            Ok(json) => json,
            Err(e) => {
                eprintln!("[History] Error saving history: {}", e);
                return false;
            }
        };
        match std::fs::write(&self.path, json) {
            Ok(()) => true,
            Err(e) => {
                eprintln!("[History] Error saving history: {}", e);
                false
            }
        }
    }

    /// Append a completed-download entry stamped with the current time.
    pub fn add_entry(
        history: &mut Vec<HistoryEntry>,
        title: &str,
        url: &str,
        quality: &str,
        file_path: &str,
    ) {
        history.push(HistoryEntry {
            title: title.to_string(),
            url: url.to_string(),
            quality: quality.to_string(),
            path: file_path.to_string(),
            date: timestamp_now(),
            status: "completed".to_string(),
        });
    }

    /// Remove the history file entirely.
    pub fn clear(&self) -> bool {
        if !self.path.exists() {
            return true;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => true,
            Err(e) => {
                eprintln!("[History] Error clearing history: {}", e);
                false
            }
        }
    }
}

fn timestamp_now() -> String {
    let format = format_description!("[year]-[month]-[day] [hour]:[minute]");
    OffsetDateTime::now_local()
        .unwrap_or_else(|_| OffsetDateTime::now_utc())
        .format(&format)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(n: usize) -> HistoryEntry {
        HistoryEntry {
            title: format!("Video {}", n),
            url: format!("https://youtu.be/v{}", n),
            quality: "best".to_string(),
            path: format!("/downloads/v{}.mp4", n),
            date: "2024-01-01 12:00".to_string(),
            status: "completed".to_string(),
        }
    }

    #[test]
    fn test_missing_file_yields_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = HistoryStore::new(dir.path().join("history.json"), 50);
        assert!(store.load().is_empty());
    }

    #[test]
    fn test_cap_never_exceeded_after_repeated_appends() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = HistoryStore::new(dir.path().join("history.json"), 50);

        let mut history = store.load();
        for n in 0..120 {
            HistoryStore::add_entry(
                &mut history,
                &format!("Video {}", n),
                "https://youtu.be/x",
                "best",
                "/downloads/x.mp4",
            );
            assert!(store.save(&history));
            history = store.load();
            assert!(history.len() <= 50);
        }

        // Newest entries survive, oldest were dropped
        assert_eq!(history.len(), 50);
        assert_eq!(history.last().expect("entries").title, "Video 119");
        assert_eq!(history.first().expect("entries").title, "Video 70");
    }

    #[test]
    fn test_add_entry_stamps_completed_status() {
        let mut history = Vec::new();
        HistoryStore::add_entry(&mut history, "Title", "url", "720p", "/a/b.mp4");
        let entry = history.last().expect("entry");
        assert_eq!(entry.status, "completed");
        assert_eq!(entry.quality, "720p");
        assert!(!entry.date.is_empty());
    }

    #[test]
    fn test_corrupt_file_yields_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("history.json");
        std::fs::write(&path, "[{broken").expect("write");
        assert!(HistoryStore::new(path, 50).load().is_empty());
    }

    #[test]
    fn test_clear_removes_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("history.json");
        let store = HistoryStore::new(&path, 50);
        store.save(&[entry(1)]);
        assert!(path.exists());
        assert!(store.clear());
        assert!(!path.exists());
        assert!(store.clear());
    }
}
