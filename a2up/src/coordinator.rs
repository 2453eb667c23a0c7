//! The control loop that mirrors detected files to the remote host.
//!
//! Tasks are processed strictly one at a time in delivery order; the coordinator owns the remote
//! session exclusively so remote operations never overlap.

use crate::stability::StabilityPolicy;
use crate::task::{TaskState, TransitionError, UploadTask};
use remote::RemoteFs;

#[derive(Debug, Clone)]
pub struct Settings {
    /// Absolute remote directory receiving the files
    pub dest_dir: String,
    /// How long an in-flight task may keep running after shutdown was requested
    pub shutdown_grace: std::time::Duration,
}

pub struct UploadCoordinator<R: RemoteFs> {
    remote: R,
    stability: Box<dyn StabilityPolicy>,
    settings: Settings,
    outcomes: Option<tokio::sync::mpsc::UnboundedSender<UploadTask>>,
}

/// The remote session became unusable and the run stopped early.
#[derive(Debug, thiserror::Error)]
#[error("remote session lost, stopped mirroring: {source}")]
pub struct SessionLost {
    /// Totals up to the point of failure, queued tasks counted as not attempted
    pub summary: common::Summary,
    #[source]
    pub source: remote::Error,
}

enum Halt {
    Transition(TransitionError),
    /// The task was failed and no further task can be attempted
    SessionLost(remote::Error),
}

impl From<TransitionError> for Halt {
    fn from(error: TransitionError) -> Self {
        Halt::Transition(error)
    }
}

impl<R: RemoteFs> std::fmt::Debug for UploadCoordinator<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("UploadCoordinator")
            .field("stability", &self.stability)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

fn summarize(state: &TaskState) -> common::Summary {
    let mut summary = common::Summary::default();
    match state {
        TaskState::Succeeded { bytes } => {
            summary.files_uploaded = 1;
            summary.bytes_uploaded = *bytes;
        }
        TaskState::Skipped => summary.files_skipped = 1,
        TaskState::Failed { .. } => summary.files_failed = 1,
        TaskState::Interrupted => summary.files_interrupted = 1,
        TaskState::Detected | TaskState::Evaluated | TaskState::Uploading => {}
    }
    summary
}

fn fail_remote(task: &mut UploadTask, error: remote::Error) -> Result<(), Halt> {
    tracing::error!("Failed {:?}: {}", task.filename(), error);
    task.fail(error.to_string())?;
    if error.is_fatal() {
        return Err(Halt::SessionLost(error));
    }
    Ok(())
}

impl<R: RemoteFs> UploadCoordinator<R> {
    pub fn new(remote: R, stability: Box<dyn StabilityPolicy>, settings: Settings) -> Self {
        Self {
            remote,
            stability,
            settings,
            outcomes: None,
        }
    }

    /// Also deliver every task that reached a terminal state to `sender`.
    #[must_use]
    pub fn with_outcomes(mut self, sender: tokio::sync::mpsc::UnboundedSender<UploadTask>) -> Self {
        self.outcomes = Some(sender);
        self
    }

    /// Give the remote session back, typically to close it.
    pub fn into_remote(self) -> R {
        self.remote
    }

    /// Drive `task` to a terminal state.
    async fn advance(&mut self, task: &mut UploadTask) -> Result<(), Halt> {
        let dest = remote::path::join(&self.settings.dest_dir, task.filename());
        task.set_dest_path(dest.clone());
        match self.remote.exists(&dest).await {
            Ok(true) => {
                task.evaluate()?;
                task.skip()?;
                tracing::info!("Skipped {:?}: {:?} already exists", task.filename(), dest);
                return Ok(());
            }
            Ok(false) => task.evaluate()?,
            Err(error) => return fail_remote(task, error),
        }
        let source = task.source_path().to_path_buf();
        if let Err(error) = self.stability.wait_until_stable(&source).await {
            tracing::error!("Failed {:?}: {:#}", task.filename(), error);
            task.fail(format!("{error:#}"))?;
            return Ok(());
        }
        task.start_upload()?;
        tracing::debug!("Uploading {:?} to {:?}", source, dest);
        match self.remote.upload(&source, &dest).await {
            Ok(bytes) => {
                tracing::info!(
                    "Uploaded {:?} to {:?} ({})",
                    task.filename(),
                    dest,
                    bytesize::ByteSize(bytes)
                );
                task.succeed(bytes)?;
                Ok(())
            }
            Err(error) => fail_remote(task, error),
        }
    }

    fn record(&self, task: UploadTask) -> common::Summary {
        let summary = summarize(task.state());
        if let Some(outcomes) = &self.outcomes {
            // receiver gone just means nobody is listening
            let _ = outcomes.send(task);
        }
        summary
    }

    /// Process tasks until the queue closes or `cancel` fires, then report what was left over.
    ///
    /// Per-file failures never stop the run. Losing the remote session does: the task at hand is
    /// failed, the rest of the queue is reported as not attempted and [`SessionLost`] is returned.
    pub async fn run(
        &mut self,
        mut receiver: tokio::sync::mpsc::Receiver<UploadTask>,
        cancel: tokio_util::sync::CancellationToken,
    ) -> Result<common::Summary, SessionLost> {
        let mut summary = common::Summary::default();
        let mut lost = None;
        loop {
            let mut task = tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                task = receiver.recv() => match task {
                    Some(task) => task,
                    None => {
                        tracing::debug!("Upload queue closed");
                        break;
                    }
                },
            };
            let finished = {
                let shutdown_grace = self.settings.shutdown_grace;
                let filename = task.filename().to_string();
                let deadline = async {
                    cancel.cancelled().await;
                    tracing::debug!(
                        "Shutdown requested, waiting up to {} for {:?}",
                        humantime::format_duration(shutdown_grace),
                        filename
                    );
                    tokio::time::sleep(shutdown_grace).await;
                };
                tokio::select! {
                    biased;
                    result = self.advance(&mut task) => Some(result),
                    () = deadline => None,
                }
            };
            match finished {
                Some(Ok(())) => summary = summary + self.record(task),
                Some(Err(Halt::Transition(error))) => {
                    tracing::error!("{}", error);
                    if let Err(error) = task.fail(error.to_string()) {
                        tracing::debug!("{}", error);
                    }
                    summary = summary + self.record(task);
                }
                Some(Err(Halt::SessionLost(error))) => {
                    summary = summary + self.record(task);
                    lost = Some(error);
                    break;
                }
                None => {
                    if let Err(error) = task.interrupt() {
                        tracing::error!("{}", error);
                    }
                    match task.dest_path() {
                        Some(dest) => tracing::error!(
                            "Interrupted {:?}: remote state of {:?} is unresolved",
                            task.filename(),
                            dest
                        ),
                        None => tracing::error!(
                            "Interrupted {:?}: remote state is unresolved",
                            task.filename()
                        ),
                    }
                    summary = summary + self.record(task);
                    break;
                }
            }
        }
        receiver.close();
        while let Ok(task) = receiver.try_recv() {
            tracing::warn!("Not attempted: {:?}", task.filename());
            summary.files_not_attempted += 1;
        }
        match lost {
            Some(source) => Err(SessionLost { summary, source }),
            None => Ok(summary),
        }
    }
}
