//! One detected file and the outcome of mirroring it.

use anyhow::anyhow;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskState {
    Detected,
    Evaluated,
    /// Remote file already present; never overwritten
    Skipped,
    Uploading,
    Succeeded { bytes: u64 },
    Failed { reason: String },
    /// Abandoned at shutdown, remote state of the file is unknown
    Interrupted,
}

impl TaskState {
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskState::Skipped
                | TaskState::Succeeded { .. }
                | TaskState::Failed { .. }
                | TaskState::Interrupted
        )
    }

    fn name(&self) -> &'static str {
        match self {
            TaskState::Detected => "detected",
            TaskState::Evaluated => "evaluated",
            TaskState::Skipped => "skipped",
            TaskState::Uploading => "uploading",
            TaskState::Succeeded { .. } => "succeeded",
            TaskState::Failed { .. } => "failed",
            TaskState::Interrupted => "interrupted",
        }
    }
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("illegal transition of {filename:?} from {from} to {to}")]
pub struct TransitionError {
    pub filename: String,
    pub from: &'static str,
    pub to: &'static str,
}

/// A file's journey from creation event to terminal outcome.
///
/// Transitions only move forward:
///
/// ```text
/// Detected -> Evaluated -> Skipped
///                       -> Uploading -> Succeeded | Failed
/// Detected -> Failed          (existence check failed)
/// Evaluated -> Failed         (file never became stable)
/// any non-terminal -> Interrupted
/// ```
///
/// A rejected transition leaves the task untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadTask {
    filename: String,
    source_path: std::path::PathBuf,
    dest_path: Option<String>,
    state: TaskState,
}

impl UploadTask {
    /// Task for a freshly created file. The file name must be valid UTF-8 since it becomes part of
    /// a remote path.
    pub fn detected(source_path: std::path::PathBuf) -> anyhow::Result<Self> {
        let filename = source_path
            .file_name()
            .ok_or_else(|| anyhow!("{:?} does not name a file", source_path))?
            .to_str()
            .ok_or_else(|| anyhow!("file name of {:?} is not valid UTF-8", source_path))?
            .to_string();
        Ok(Self {
            filename,
            source_path,
            dest_path: None,
            state: TaskState::Detected,
        })
    }

    #[must_use]
    pub fn filename(&self) -> &str {
        &self.filename
    }

    #[must_use]
    pub fn source_path(&self) -> &std::path::Path {
        &self.source_path
    }

    #[must_use]
    pub fn dest_path(&self) -> Option<&str> {
        self.dest_path.as_deref()
    }

    #[must_use]
    pub fn state(&self) -> &TaskState {
        &self.state
    }

    pub fn set_dest_path(&mut self, dest_path: String) {
        self.dest_path = Some(dest_path);
    }

    fn transition(&mut self, allowed: bool, next: TaskState) -> Result<(), TransitionError> {
        if !allowed {
            return Err(TransitionError {
                filename: self.filename.clone(),
                from: self.state.name(),
                to: next.name(),
            });
        }
        tracing::trace!("{:?}: {} -> {}", self.filename, self.state, next);
        self.state = next;
        Ok(())
    }

    pub fn evaluate(&mut self) -> Result<(), TransitionError> {
        let allowed = self.state == TaskState::Detected;
        self.transition(allowed, TaskState::Evaluated)
    }

    pub fn skip(&mut self) -> Result<(), TransitionError> {
        let allowed = self.state == TaskState::Evaluated;
        self.transition(allowed, TaskState::Skipped)
    }

    pub fn start_upload(&mut self) -> Result<(), TransitionError> {
        let allowed = self.state == TaskState::Evaluated;
        self.transition(allowed, TaskState::Uploading)
    }

    pub fn succeed(&mut self, bytes: u64) -> Result<(), TransitionError> {
        let allowed = self.state == TaskState::Uploading;
        self.transition(allowed, TaskState::Succeeded { bytes })
    }

    pub fn fail(&mut self, reason: impl Into<String>) -> Result<(), TransitionError> {
        let allowed = matches!(
            self.state,
            TaskState::Detected | TaskState::Evaluated | TaskState::Uploading
        );
        self.transition(
            allowed,
            TaskState::Failed {
                reason: reason.into(),
            },
        )
    }

    pub fn interrupt(&mut self) -> Result<(), TransitionError> {
        let allowed = !self.state.is_terminal();
        self.transition(allowed, TaskState::Interrupted)
    }
}
