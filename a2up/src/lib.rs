//! Watch a directory and mirror new files to a remote host over SFTP - `a2up`
//!
//! `a2up` observes one local directory (non-recursively) and uploads every newly created regular
//! file into a directory on a remote host. Uploads are **one-shot**: a file that already exists
//! on the remote side is skipped, never overwritten or updated.
//!
//! # Usage
//!
//! ```bash
//! # Mirror new files from ./outbox to /srv/inbox on the server
//! a2up -s pi@raspberrypi -f ./outbox -d /srv/inbox
//!
//! # Custom port, wait until files stop growing before uploading
//! a2up -s backup@nas.local:2222 -f /data/out -d incoming --stability size-stable
//!
//! # Print the free space of the destination and exit
//! a2up -s pi@raspberrypi -f ./outbox -d /srv/inbox --space-available
//! ```
//!
//! The password is read from the terminal (`Enter password: `) without echo. A relative
//! destination is resolved against the remote login directory and created if missing (only the
//! last path component is created).
//!
//! # Pipeline
//!
//! ```text
//! notify thread --(bounded queue)--> UploadCoordinator --> RemoteFs (SFTP)
//! ```
//!
//! - [`watch::WatchEngine`] turns creation events into [`task::UploadTask`]s.
//! - [`coordinator::UploadCoordinator`] takes tasks one at a time in arrival order: existence
//!   check, [`stability`] wait, upload. Every task ends in exactly one terminal state which is
//!   logged as it happens.
//! - Nothing is retried. A failed file is logged and the run continues with the next one, unless
//!   the remote session itself is gone: then the run stops and exits with an error.
//!
//! # Shutdown
//!
//! Ctrl+C cancels a shared token. No new files are picked up after that, the file in flight gets
//! `--shutdown-grace` to finish (default: none) and is otherwise reported as interrupted with an
//! unresolved remote state, queued files are reported as not attempted, and the remote session is
//! closed exactly once.

use anyhow::Context;
use remote::RemoteFs;

pub mod config;
pub mod coordinator;
pub mod credential;
pub mod space;
pub mod stability;
pub mod task;
pub mod watch;

#[cfg(test)]
mod testutils;

pub struct MirrorOptions {
    pub stability: Box<dyn stability::StabilityPolicy>,
    pub shutdown_grace: std::time::Duration,
    pub queue_capacity: std::num::NonZeroUsize,
}

impl std::fmt::Debug for MirrorOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("MirrorOptions")
            .field("stability", &self.stability)
            .field("shutdown_grace", &self.shutdown_grace)
            .field("queue_capacity", &self.queue_capacity)
            .finish()
    }
}

/// Close `session`, logging instead of returning a failure since there is nothing left to do.
pub async fn close_session<R: RemoteFs>(session: &mut R) {
    if let Err(error) = session.close().await {
        tracing::warn!("Failed to close remote session cleanly: {:#}", error);
    }
}

/// Ensure the destination exists, then mirror new files until `cancel` fires.
///
/// `config.dest_dir` must already be absolute (see [`config::Configuration::resolve_destination`]).
/// The session is closed exactly once before returning, whatever the outcome.
pub async fn mirror<R: RemoteFs>(
    mut session: R,
    config: &config::Configuration,
    options: MirrorOptions,
    cancel: tokio_util::sync::CancellationToken,
) -> anyhow::Result<common::Summary> {
    if let Err(error) = session.ensure_directory(&config.dest_dir).await {
        close_session(&mut session).await;
        return Err(error).with_context(|| {
            format!(
                "cannot prepare destination directory {:?}",
                config.dest_dir
            )
        });
    }
    let (sender, receiver) = tokio::sync::mpsc::channel(options.queue_capacity.get());
    let mut watcher = match watch::WatchEngine::start(&config.source_dir, sender, cancel.clone()) {
        Ok(watcher) => watcher,
        Err(error) => {
            close_session(&mut session).await;
            return Err(error);
        }
    };
    let mut coordinator = coordinator::UploadCoordinator::new(
        session,
        options.stability,
        coordinator::Settings {
            dest_dir: config.dest_dir.clone(),
            shutdown_grace: options.shutdown_grace,
        },
    );
    let result = coordinator.run(receiver, cancel).await;
    watcher.stop();
    let mut session = coordinator.into_remote();
    close_session(&mut session).await;
    result.map_err(|lost| {
        tracing::warn!("Totals before the session was lost:\n{}", lost.summary);
        anyhow::Error::new(lost)
    })
}
