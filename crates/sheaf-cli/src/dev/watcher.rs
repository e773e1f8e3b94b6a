//! File system watcher with debouncing for the development session.
//!
//! Watches the project root and forwards changed paths in batches: a batch
//! closes once no further change has arrived for the debounce window, so a save
//! touching several files starts one rebuild. A tree that never goes quiet still
//! gets a batch every [`MAX_BATCH_WINDOWS`] windows.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::error::{CliError, Result};

/// Watches a directory recursively and sends batches of changed paths.
pub struct FileWatcher {
    _watcher: RecommendedWatcher,
    root: PathBuf,
}

impl FileWatcher {
    /// Start watching `root`.
    ///
    /// `ignore_patterns` are matched against root-relative paths: `*.ext` matches a
    /// suffix, anything else a leading directory. Hidden files are always ignored.
    ///
    /// Must be called inside a tokio runtime; batching runs on a spawned task.
    pub fn new(
        root: PathBuf,
        ignore_patterns: Vec<String>,
        debounce: Duration,
    ) -> Result<(Self, mpsc::Receiver<Vec<PathBuf>>)> {
        if !root.is_dir() {
            return Err(CliError::DirectoryNotFound(root));
        }

        let (raw_tx, raw_rx) = mpsc::channel(256);
        let (batch_tx, batch_rx) = mpsc::channel(16);

        let filter_root = root.clone();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let event = match res {
                Ok(event) => event,
                Err(err) => {
                    warn!("watch error: {err}");
                    return;
                }
            };
            if !matches!(
                event.kind,
                EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
            ) {
                return;
            }
            for path in event.paths {
                if Self::should_ignore(&path, &filter_root, &ignore_patterns) {
                    continue;
                }
                // Receiver gone means the session ended.
                if raw_tx.blocking_send(path).is_err() {
                    return;
                }
            }
        })?;
        watcher.watch(&root, RecursiveMode::Recursive)?;
        debug!(root = %root.display(), "watching");

        tokio::spawn(coalesce(raw_rx, batch_tx, debounce));

        Ok((
            Self {
                _watcher: watcher,
                root,
            },
            batch_rx,
        ))
    }

    fn should_ignore(path: &Path, root: &Path, ignore_patterns: &[String]) -> bool {
        let Ok(rel_path) = path.strip_prefix(root) else {
            return true;
        };
        let path_str = rel_path.to_string_lossy();

        for pattern in ignore_patterns {
            if let Some(suffix) = pattern.strip_prefix('*') {
                if path_str.ends_with(suffix) {
                    return true;
                }
            } else if rel_path.starts_with(pattern) {
                return true;
            }
        }

        rel_path.components().any(|component| {
            component
                .as_os_str()
                .to_str()
                .is_some_and(|name| name.starts_with('.') && name != "." && name != "..")
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Longest a batch stays open, in debounce windows, while changes keep arriving.
pub const MAX_BATCH_WINDOWS: u32 = 10;

/// Group paths from `raw` into batches separated by at least `window` of quiet, or
/// at most `window * MAX_BATCH_WINDOWS` old. Paths repeat at most once per batch, in
/// first-seen order.
pub(crate) async fn coalesce(
    mut raw: mpsc::Receiver<PathBuf>,
    batches: mpsc::Sender<Vec<PathBuf>>,
    window: Duration,
) {
    while let Some(first) = raw.recv().await {
        let deadline = Instant::now() + window * MAX_BATCH_WINDOWS;
        let mut batch = vec![first];
        loop {
            let wait = window.min(deadline.saturating_duration_since(Instant::now()));
            if wait.is_zero() {
                break;
            }
            match tokio::time::timeout(wait, raw.recv()).await {
                Ok(Some(path)) => {
                    if !batch.contains(&path) {
                        batch.push(path);
                    }
                }
                Ok(None) => {
                    let _ = batches.send(batch).await;
                    return;
                }
                Err(_) => break,
            }
        }
        debug!(paths = batch.len(), "change batch");
        if batches.send(batch).await.is_err() {
            return;
        }
    }
}
