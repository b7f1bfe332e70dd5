// Download engine - supervises a single yt-dlp process
//
// Lifecycle: Idle -> Launching -> Streaming -> (Completed|Cancelled|Failed)
// -> Idle. One download at a time; a second request is rejected while the
// active slot is held. Cancellation is cooperative: the flag is polled once
// per output line, so latency is bounded by the time to read one more line.

use std::io::{BufRead, BufReader};
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use super::events::EventSink;
use super::models::{DownloadOptions, DownloadOutcome, ProgressUpdate, Quality};
use super::progress::{parse_progress, parse_status};
use super::urls;
use super::utils;

/// How long `cancel` waits for a graceful exit before the forced kill.
const TERMINATE_GRACE: Duration = Duration::from_secs(2);

pub struct DownloadEngine {
    ytdlp_path: String,
    default_playlist_quantity: String,
    is_downloading: Arc<AtomicBool>,
    cancel_requested: Arc<AtomicBool>,
    current_process: Arc<Mutex<Option<Child>>>,
    events: Arc<dyn EventSink>,
}

impl DownloadEngine {
    pub fn new(
        ytdlp_path: String,
        default_playlist_quantity: String,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            ytdlp_path,
            default_playlist_quantity,
            is_downloading: Arc::new(AtomicBool::new(false)),
            cancel_requested: Arc::new(AtomicBool::new(false)),
            current_process: Arc::new(Mutex::new(None)),
            events,
        }
    }

    /// Start a download. Returns false without starting a worker when a
    /// download is already active, the URL is invalid, or the destination
    /// directory cannot be created.
    pub fn download(&self, url: &str, options: DownloadOptions) -> bool {
        if self.is_downloading.load(Ordering::SeqCst) {
            self.events.on_log("❌ Download already in progress");
            return false;
        }

        if !urls::is_valid_youtube_url(url) {
            self.events.on_error("Invalid YouTube URL");
            return false;
        }

        if !utils::ensure_directory_exists(&options.output_path) {
            self.events.on_error(&format!(
                "Could not create output directory: {}",
                options.output_path
            ));
            return false;
        }

        // Claim the single active slot; a racing second caller loses here.
        if self.is_downloading.swap(true, Ordering::SeqCst) {
            self.events.on_log("❌ Download already in progress");
            return false;
        }
        self.cancel_requested.store(false, Ordering::SeqCst);

        let worker = Worker {
            ytdlp_path: self.ytdlp_path.clone(),
            url: url.to_string(),
            options,
            args_fallback_quantity: self.default_playlist_quantity.clone(),
            is_downloading: Arc::clone(&self.is_downloading),
            cancel_requested: Arc::clone(&self.cancel_requested),
            current_process: Arc::clone(&self.current_process),
            events: Arc::clone(&self.events),
        };

        let spawned = thread::Builder::new()
            .name("download-worker".to_string())
            .spawn(move || worker.run());

        if let Err(e) = spawned {
            self.is_downloading.store(false, Ordering::SeqCst);
            self.events
                .on_error(&format!("Could not start download worker: {}", e));
            return false;
        }

        true
    }

    /// Request cancellation of the active download.
    ///
    /// No-op returning false when idle. Otherwise sets the cancel flag,
    /// asks the process to terminate, and escalates to a forced kill after
    /// a short grace period. The cancelled outcome itself is emitted by the
    /// worker.
    pub fn cancel(&self) -> bool {
        if !self.is_downloading.load(Ordering::SeqCst) {
            return false;
        }

        self.cancel_requested.store(true, Ordering::SeqCst);
        self.events
            .on_log("🛑 Cancel requested - stopping after current file...");

        let mut guard = match self.current_process.lock() {
            Ok(guard) => guard,
            Err(_) => return true,
        };
        if let Some(child) = guard.as_mut() {
            terminate_process(child.id());

            let deadline = Instant::now() + TERMINATE_GRACE;
            loop {
                match child.try_wait() {
                    Ok(Some(_)) => break,
                    Ok(None) => {
                        if Instant::now() >= deadline {
                            let _ = child.kill();
                            self.events.on_log("🔨 Process force-killed");
                            break;
                        }
                        thread::sleep(Duration::from_millis(100));
                    }
                    Err(e) => {
                        self.events
                            .on_log(&format!("⚠️ Error during cancellation: {}", e));
                        break;
                    }
                }
            }
        }

        true
    }

    pub fn is_busy(&self) -> bool {
        self.is_downloading.load(Ordering::SeqCst)
    }

    /// Build the yt-dlp argument vector for a request. Pure; pinned by the
    /// characterization tests below against the current yt-dlp grammar.
    pub fn build_args(&self, url: &str, options: &DownloadOptions) -> Vec<String> {
        build_args(url, options, &self.default_playlist_quantity)
    }
}

fn build_args(url: &str, options: &DownloadOptions, fallback_quantity: &str) -> Vec<String> {
    fn push(args: &mut Vec<String>, items: &[&str]) {
        args.extend(items.iter().map(|s| s.to_string()));
    }

    let mut args: Vec<String> = Vec::new();

    match options.quality {
        Quality::Best => push(
            &mut args,
            &[
                "-f",
                "bv*+ba[ext=m4a]/best[ext=mp4]",
                "--merge-output-format",
                "mp4",
            ],
        ),
        Quality::Hd1080 => push(
            &mut args,
            &[
                "-f",
                "bv*[height<=1080]+ba[ext=m4a]/best[height<=1080]",
                "--merge-output-format",
                "mp4",
            ],
        ),
        Quality::Hd720 => push(
            &mut args,
            &[
                "-f",
                "bv*[height<=720]+ba[ext=m4a]/best[height<=720]",
                "--merge-output-format",
                "mp4",
            ],
        ),
        Quality::Worst => push(&mut args, &["-f", "worst[ext=mp4]"]),
        Quality::Audio => push(
            &mut args,
            &["-f", "bestaudio", "--extract-audio", "--audio-format", "mp3"],
        ),
    }

    if options.download_playlist {
        if !options.playlist_quantity.eq_ignore_ascii_case("all") {
            if options.playlist_start >= 1 && options.playlist_start <= options.playlist_end {
                push(&mut args, &["--playlist-start"]);
                args.push(options.playlist_start.to_string());
                push(&mut args, &["--playlist-end"]);
                args.push(options.playlist_end.to_string());
            } else if options.playlist_quantity.chars().all(|c| c.is_ascii_digit())
                && !options.playlist_quantity.is_empty()
            {
                push(&mut args, &["--playlist-end"]);
                args.push(options.playlist_quantity.clone());
            } else {
                // Bad range and non-numeric quantity: fall back to the default
                push(&mut args, &["--playlist-end"]);
                args.push(fallback_quantity.to_string());
            }
        }
        // "All": no limiting flags
    } else {
        args.push("--no-playlist".to_string());
    }

    if options.download_subtitles {
        push(
            &mut args,
            &["--write-subs", "--write-auto-subs", "--sub-lang", "en"],
        );
    }
    if options.download_thumbnail {
        args.push("--write-thumbnail".to_string());
    }

    args.push("-o".to_string());
    args.push(format!(
        "{}/%(uploader)s - %(title)s.%(ext)s",
        options.output_path
    ));

    // --newline keeps progress on separate lines instead of \r rewrites
    push(&mut args, &["--newline", "--ignore-errors", "--no-warnings"]);

    args.push(url.to_string());
    args
}

/// State captured by the download worker thread.
struct Worker {
    ytdlp_path: String,
    url: String,
    options: DownloadOptions,
    args_fallback_quantity: String,
    is_downloading: Arc<AtomicBool>,
    cancel_requested: Arc<AtomicBool>,
    current_process: Arc<Mutex<Option<Child>>>,
    events: Arc<dyn EventSink>,
}

impl Worker {
    fn run(self) {
        // Releases the active slot and clears the handle on every exit path.
        let _guard = ActiveGuard {
            is_downloading: Arc::clone(&self.is_downloading),
            current_process: Arc::clone(&self.current_process),
        };

        let args = build_args(&self.url, &self.options, &self.args_fallback_quantity);
        self.events.on_log("🚀 Starting download...");
        self.events.on_log(&format!(
            "Command: {} {}...",
            self.ytdlp_path,
            args.iter()
                .take(4)
                .map(|s| s.as_str())
                .collect::<Vec<_>>()
                .join(" ")
        ));

        let mut child = match Command::new(&self.ytdlp_path)
            .args(&args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
        {
            Ok(child) => child,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let message = "yt-dlp not found! Please install yt-dlp first.";
                self.events.on_log(&format!("❌ {}", message));
                self.events.on_error(message);
                self.events.on_complete(&DownloadOutcome::MissingDependency {
                    message: message.to_string(),
                });
                return;
            }
            Err(e) => {
                let message = format!("Unexpected error: {}", e);
                self.events.on_log(&format!("❌ {}", message));
                self.events.on_error(&message);
                self.events
                    .on_complete(&DownloadOutcome::Error { message });
                return;
            }
        };

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let (Some(stdout), Some(stderr)) = (stdout, stderr) else {
            let _ = child.kill();
            let message = "Failed to capture yt-dlp output".to_string();
            self.events.on_error(&message);
            self.events
                .on_complete(&DownloadOutcome::Error { message });
            return;
        };

        // Hand the child to the shared slot so cancel() can reach it.
        if let Ok(mut guard) = self.current_process.lock() {
            *guard = Some(child);
        }

        // stderr is drained on a companion thread: each line is forwarded as
        // a log event, the tail kept for failure reporting.
        let stderr_events = Arc::clone(&self.events);
        let stderr_handle = thread::spawn(move || {
            let reader = BufReader::new(stderr);
            let mut tail = String::new();
            for line in reader.lines().map_while(Result::ok) {
                let line = line.trim().to_string();
                if line.is_empty() {
                    continue;
                }
                stderr_events.on_log(&line);
                tail = line;
            }
            tail
        });

        let mut downloaded_files: Vec<String> = Vec::new();
        let reader = BufReader::new(stdout);

        for line in reader.lines().map_while(Result::ok) {
            // Cancellation is polled once per line
            if self.cancel_requested.load(Ordering::SeqCst) {
                if let Ok(mut guard) = self.current_process.lock() {
                    // Only signal a process cancel() has not reaped already
                    if let Some(child) = guard.as_mut() {
                        if matches!(child.try_wait(), Ok(None)) {
                            terminate_process(child.id());
                        }
                    }
                }
                self.events.on_log("🛑 Download cancelled by user");
                self.events.on_complete(&DownloadOutcome::Cancelled);
                return;
            }

            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            self.events.on_log(line);

            if let Some(update) = parse_progress(line) {
                if let Some(path) = &update.file_path {
                    downloaded_files.push(path.clone());
                }
                self.events.on_progress(&update);
            }
            if let Some(status) = parse_status(line) {
                self.events.on_progress(&ProgressUpdate::status(status));
            }
        }

        // Stream closed: take the child back and await its exit status.
        let child = self
            .current_process
            .lock()
            .ok()
            .and_then(|mut guard| guard.take());
        let status = match child {
            Some(mut child) => match child.wait() {
                Ok(status) => status,
                Err(e) => {
                    let message = format!("Unexpected error: {}", e);
                    self.events.on_log(&format!("❌ {}", message));
                    self.events.on_error(&message);
                    self.events
                        .on_complete(&DownloadOutcome::Error { message });
                    return;
                }
            },
            None => {
                // cancel() reaped the process while we were finishing up
                self.events.on_log("🛑 Download stopped");
                self.events.on_complete(&DownloadOutcome::Cancelled);
                return;
            }
        };

        let stderr_tail = stderr_handle.join().unwrap_or_default();

        if self.cancel_requested.load(Ordering::SeqCst) {
            self.events.on_log("🛑 Download stopped");
            self.events.on_complete(&DownloadOutcome::Cancelled);
            return;
        }

        if status.success() {
            self.events.on_log("✅ Download completed successfully!");
            self.events.on_complete(&DownloadOutcome::Completed {
                files: downloaded_files,
                output_path: self.options.output_path.clone(),
                options: self.options.clone(),
            });
        } else {
            let return_code = status.code().unwrap_or(-1);
            self.events
                .on_log(&format!("❌ Download failed with return code: {}", return_code));
            if !stderr_tail.is_empty() {
                self.events.on_log(&format!("❌ {}", stderr_tail));
            }
            self.events
                .on_complete(&DownloadOutcome::Failed { return_code });
        }
    }
}

struct ActiveGuard {
    is_downloading: Arc<AtomicBool>,
    current_process: Arc<Mutex<Option<Child>>>,
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        if let Ok(mut guard) = self.current_process.lock() {
            *guard = None;
        }
        self.is_downloading.store(false, Ordering::SeqCst);
    }
}

/// Ask the process to exit: SIGTERM on unix, taskkill on windows.
fn terminate_process(pid: u32) {
    #[cfg(unix)]
    unsafe {
        libc::kill(pid as i32, libc::SIGTERM);
    }
    #[cfg(windows)]
    {
        let _ = Command::new("taskkill")
            .args(["/PID", &pid.to_string(), "/T"])
            .output();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    struct RecordingSink {
        outcomes: Mutex<mpsc::Sender<DownloadOutcome>>,
        errors: Mutex<Vec<String>>,
    }

    impl RecordingSink {
        fn new() -> (Arc<Self>, mpsc::Receiver<DownloadOutcome>) {
            let (tx, rx) = mpsc::channel();
            (
                Arc::new(Self {
                    outcomes: Mutex::new(tx),
                    errors: Mutex::new(Vec::new()),
                }),
                rx,
            )
        }
    }

    impl EventSink for RecordingSink {
        fn on_complete(&self, outcome: &DownloadOutcome) {
            let _ = self
                .outcomes
                .lock()
                .expect("sender lock")
                .send(outcome.clone());
        }

        fn on_error(&self, message: &str) {
            self.errors
                .lock()
                .expect("errors lock")
                .push(message.to_string());
        }
    }

    fn engine_with_tool(tool: &str) -> (DownloadEngine, mpsc::Receiver<DownloadOutcome>) {
        let (sink, rx) = RecordingSink::new();
        (
            DownloadEngine::new(tool.to_string(), "10".to_string(), sink),
            rx,
        )
    }

    const VALID_URL: &str = "https://www.youtube.com/watch?v=dQw4w9WgXcQ";

    fn options_for_dir(dir: &std::path::Path) -> DownloadOptions {
        DownloadOptions {
            output_path: dir.to_string_lossy().to_string(),
            ..DownloadOptions::default()
        }
    }

    // --- build_args characterization tests (pinned yt-dlp grammar) ---

    fn args_for(options: &DownloadOptions) -> Vec<String> {
        build_args(VALID_URL, options, "10")
    }

    #[test]
    fn test_args_quality_best() {
        let args = args_for(&DownloadOptions::default());
        assert_eq!(args[0], "-f");
        assert_eq!(args[1], "bv*+ba[ext=m4a]/best[ext=mp4]");
        assert_eq!(args[2], "--merge-output-format");
        assert_eq!(args[3], "mp4");
        assert!(args.contains(&"--no-playlist".to_string()));
        assert_eq!(args.last().map(|s| s.as_str()), Some(VALID_URL));
    }

    #[test]
    fn test_args_quality_variants() {
        let q1080 = args_for(&DownloadOptions {
            quality: Quality::Hd1080,
            ..DownloadOptions::default()
        });
        assert_eq!(q1080[1], "bv*[height<=1080]+ba[ext=m4a]/best[height<=1080]");

        let q720 = args_for(&DownloadOptions {
            quality: Quality::Hd720,
            ..DownloadOptions::default()
        });
        assert_eq!(q720[1], "bv*[height<=720]+ba[ext=m4a]/best[height<=720]");

        let worst = args_for(&DownloadOptions {
            quality: Quality::Worst,
            ..DownloadOptions::default()
        });
        assert_eq!(worst[1], "worst[ext=mp4]");
        assert!(!worst.contains(&"--merge-output-format".to_string()));

        let audio = args_for(&DownloadOptions {
            quality: Quality::Audio,
            ..DownloadOptions::default()
        });
        assert_eq!(audio[1], "bestaudio");
        assert!(audio.contains(&"--extract-audio".to_string()));
        assert!(audio.contains(&"--audio-format".to_string()));
        assert!(audio.contains(&"mp3".to_string()));
    }

    #[test]
    fn test_args_playlist_range() {
        let args = args_for(&DownloadOptions {
            download_playlist: true,
            playlist_start: 3,
            playlist_end: 7,
            ..DownloadOptions::default()
        });
        let joined = args.join(" ");
        assert!(joined.contains("--playlist-start 3"));
        assert!(joined.contains("--playlist-end 7"));
        assert!(!args.contains(&"--no-playlist".to_string()));
    }

    #[test]
    fn test_args_playlist_bad_range_falls_back_to_quantity() {
        let args = args_for(&DownloadOptions {
            download_playlist: true,
            playlist_start: 9,
            playlist_end: 2,
            playlist_quantity: "20".to_string(),
            ..DownloadOptions::default()
        });
        let joined = args.join(" ");
        assert!(!joined.contains("--playlist-start"));
        assert!(joined.contains("--playlist-end 20"));
    }

    #[test]
    fn test_args_playlist_garbage_quantity_uses_default() {
        let args = args_for(&DownloadOptions {
            download_playlist: true,
            playlist_start: 9,
            playlist_end: 2,
            playlist_quantity: "lots".to_string(),
            ..DownloadOptions::default()
        });
        assert!(args.join(" ").contains("--playlist-end 10"));
    }

    #[test]
    fn test_args_playlist_all_adds_no_limits() {
        let args = args_for(&DownloadOptions {
            download_playlist: true,
            playlist_quantity: "All".to_string(),
            ..DownloadOptions::default()
        });
        let joined = args.join(" ");
        assert!(!joined.contains("--playlist-start"));
        assert!(!joined.contains("--playlist-end"));
        assert!(!joined.contains("--no-playlist"));
    }

    #[test]
    fn test_args_subtitles_and_thumbnail() {
        let args = args_for(&DownloadOptions {
            download_subtitles: true,
            download_thumbnail: true,
            ..DownloadOptions::default()
        });
        for flag in ["--write-subs", "--write-auto-subs", "--write-thumbnail"] {
            assert!(args.contains(&flag.to_string()), "missing {}", flag);
        }
        assert!(args.contains(&"en".to_string()));
    }

    #[test]
    fn test_args_output_template() {
        let options = DownloadOptions {
            output_path: "/tmp/videos".to_string(),
            ..DownloadOptions::default()
        };
        let args = args_for(&options);
        let o_pos = args.iter().position(|a| a == "-o").expect("has -o");
        assert_eq!(args[o_pos + 1], "/tmp/videos/%(uploader)s - %(title)s.%(ext)s");
    }

    // --- engine state tests ---

    #[test]
    fn test_invalid_url_rejected_synchronously() {
        let (sink, _rx) = RecordingSink::new();
        let engine = DownloadEngine::new("yt-dlp".to_string(), "10".to_string(), Arc::clone(&sink) as Arc<dyn EventSink>);
        assert!(!engine.download("not a url", DownloadOptions::default()));
        assert!(!engine.is_busy());
        let errors = sink.errors.lock().expect("errors lock");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0], "Invalid YouTube URL");
    }

    #[test]
    fn test_cancel_when_idle_is_noop() {
        let (engine, _rx) = engine_with_tool("yt-dlp");
        assert!(!engine.cancel());
    }

    #[test]
    fn test_missing_binary_yields_missing_dependency() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (engine, rx) = engine_with_tool("/nonexistent/yt-dlp-test-binary");

        assert!(engine.download(VALID_URL, options_for_dir(dir.path())));
        let outcome = rx
            .recv_timeout(Duration::from_secs(5))
            .expect("worker should report");
        assert!(matches!(outcome, DownloadOutcome::MissingDependency { .. }));
    }

    #[cfg(unix)]
    fn write_fake_tool(dir: &std::path::Path, script: &str) -> String {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.join("fake-yt-dlp");
        std::fs::write(&path, script).expect("write script");
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
            .expect("chmod script");
        path.to_string_lossy().to_string()
    }

    #[test]
    #[cfg(unix)]
    fn test_second_download_rejected_and_cancel_reports_cancelled() {
        let dir = tempfile::tempdir().expect("tempdir");
        // Emits a line every 100ms so the cancel poll gets loop iterations.
        let tool = write_fake_tool(
            dir.path(),
            "#!/bin/sh\ni=0\nwhile [ $i -lt 100 ]; do\n  echo \"line $i\"\n  i=$((i+1))\n  sleep 0.1\ndone\n",
        );
        let (engine, rx) = engine_with_tool(&tool);

        assert!(engine.download(VALID_URL, options_for_dir(dir.path())));
        // The slot is claimed synchronously, so this rejection is immediate.
        assert!(!engine.download(VALID_URL, options_for_dir(dir.path())));
        assert!(engine.is_busy());

        // Let the worker spawn the process before cancelling.
        thread::sleep(Duration::from_millis(300));
        assert!(engine.cancel());

        let outcome = rx
            .recv_timeout(Duration::from_secs(5))
            .expect("worker should report");
        // Cancelled, never Failed, even though the process was terminated.
        assert!(matches!(outcome, DownloadOutcome::Cancelled));

        // The slot is released after completion.
        let deadline = Instant::now() + Duration::from_secs(2);
        while engine.is_busy() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(20));
        }
        assert!(!engine.is_busy());
    }

    #[test]
    #[cfg(unix)]
    fn test_nonzero_exit_yields_failed_with_code() {
        let dir = tempfile::tempdir().expect("tempdir");
        let tool = write_fake_tool(dir.path(), "#!/bin/sh\necho oops >&2\nexit 3\n");
        let (engine, rx) = engine_with_tool(&tool);

        assert!(engine.download(VALID_URL, options_for_dir(dir.path())));
        let outcome = rx
            .recv_timeout(Duration::from_secs(5))
            .expect("worker should report");
        assert!(matches!(outcome, DownloadOutcome::Failed { return_code: 3 }));
    }

    #[test]
    #[cfg(unix)]
    fn test_successful_run_collects_destination_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let tool = write_fake_tool(
            dir.path(),
            "#!/bin/sh\necho '[download] Destination: /x/y/video.mp4'\necho '[download] 100% of 10.00MiB at 1.50MiB/s ETA 00:00'\nexit 0\n",
        );
        let (engine, rx) = engine_with_tool(&tool);

        assert!(engine.download(VALID_URL, options_for_dir(dir.path())));
        let outcome = rx
            .recv_timeout(Duration::from_secs(5))
            .expect("worker should report");
        match outcome {
            DownloadOutcome::Completed { files, .. } => {
                assert_eq!(files, vec!["/x/y/video.mp4".to_string()]);
            }
            other => panic!("expected Completed, got {:?}", other),
        }
    }
}
