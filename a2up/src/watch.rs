//! Turning filesystem creation events into upload tasks.
//!
//! The notify backend calls us from its own thread. Qualifying events are pushed into a bounded
//! tokio channel with `blocking_send`, so a slow consumer applies back-pressure to the
//! notification thread instead of dropping events.

use anyhow::Context;
use notify::Watcher;

use crate::task::UploadTask;

/// Path of a regular file created directly inside `dir`, `None` for anything else.
fn qualifying_file(dir: &std::path::Path, path: &std::path::Path) -> Option<std::path::PathBuf> {
    if path.parent() != Some(dir) {
        tracing::trace!("Ignoring {:?}: not directly inside {:?}", path, dir);
        return None;
    }
    match std::fs::metadata(path) {
        Ok(metadata) if metadata.is_file() => Some(path.to_path_buf()),
        Ok(_) => {
            tracing::debug!("Ignoring {:?}: not a regular file", path);
            None
        }
        Err(error) => {
            tracing::debug!("Ignoring {:?}: {}", path, error);
            None
        }
    }
}

fn handle_event(
    dir: &std::path::Path,
    result: notify::Result<notify::Event>,
    sender: &tokio::sync::mpsc::Sender<UploadTask>,
    cancel: &tokio_util::sync::CancellationToken,
) {
    let event = match result {
        Ok(event) => event,
        Err(error) => {
            tracing::warn!("Filesystem notification error: {}", error);
            return;
        }
    };
    if !matches!(event.kind, notify::EventKind::Create(_)) {
        return;
    }
    for path in &event.paths {
        if cancel.is_cancelled() {
            tracing::debug!("Shutting down, ignoring creation of {:?}", path);
            return;
        }
        let Some(path) = qualifying_file(dir, path) else {
            continue;
        };
        let task = match UploadTask::detected(path) {
            Ok(task) => task,
            Err(error) => {
                tracing::warn!("Skipping new file: {:#}", error);
                continue;
            }
        };
        tracing::debug!("Detected new file {:?}", task.filename());
        if sender.blocking_send(task).is_err() {
            tracing::debug!("Upload queue closed, dropping creation events");
            return;
        }
    }
}

/// Watch registration for one directory, non-recursive.
pub struct WatchEngine {
    dir: std::path::PathBuf,
    watcher: Option<notify::RecommendedWatcher>,
}

impl std::fmt::Debug for WatchEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("WatchEngine")
            .field("dir", &self.dir)
            .field("active", &self.watcher.is_some())
            .finish()
    }
}

impl WatchEngine {
    /// Start delivering a `Detected` task for every regular file created in `source_dir`.
    ///
    /// Once `cancel` fires no further tasks are sent.
    pub fn start(
        source_dir: &std::path::Path,
        sender: tokio::sync::mpsc::Sender<UploadTask>,
        cancel: tokio_util::sync::CancellationToken,
    ) -> anyhow::Result<Self> {
        let dir = std::fs::canonicalize(source_dir)
            .with_context(|| format!("cannot resolve watch directory {:?}", source_dir))?;
        let handler_dir = dir.clone();
        let mut watcher =
            notify::recommended_watcher(move |result: notify::Result<notify::Event>| {
                handle_event(&handler_dir, result, &sender, &cancel);
            })
            .context("failed to initialize filesystem watcher")?;
        watcher
            .watch(&dir, notify::RecursiveMode::NonRecursive)
            .with_context(|| format!("failed to watch {:?}", dir))?;
        tracing::info!("Watching {:?} for new files", dir);
        Ok(Self {
            dir,
            watcher: Some(watcher),
        })
    }

    #[must_use]
    pub fn dir(&self) -> &std::path::Path {
        &self.dir
    }

    /// Unregister the watch and release the queue sender. Calling it again does nothing.
    pub fn stop(&mut self) {
        let Some(mut watcher) = self.watcher.take() else {
            return;
        };
        if let Err(error) = watcher.unwatch(&self.dir) {
            tracing::debug!("Failed to unwatch {:?}: {}", self.dir, error);
        }
        tracing::info!("Stopped watching {:?}", self.dir);
    }
}

impl Drop for WatchEngine {
    fn drop(&mut self) {
        self.stop();
    }
}
