/// Errors produced by remote session operations.
///
/// # Logging Convention
/// The Display implementation already includes the full source chain, so any format specifier
/// (`{}`, `{:#}`) shows the underlying cause.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Network, handshake, host-key or authentication failure, or a transport lost mid-run.
    /// Fatal to the run.
    #[error("connection to {endpoint} failed: {source:#}")]
    Connection {
        endpoint: String,
        #[source]
        source: anyhow::Error,
    },
    /// Existence check, directory creation, space query or path lookup failure.
    #[error("remote I/O error on {path:?}: {source:#}")]
    RemoteIo {
        path: String,
        #[source]
        source: anyhow::Error,
    },
    /// Transfer of a single file failed; the run may continue with the next file.
    #[error("failed uploading {local:?} to {remote:?}: {reason}")]
    Upload {
        local: std::path::PathBuf,
        remote: String,
        reason: String,
    },
    /// Operation attempted after the session was closed.
    #[error("remote session is closed")]
    Closed,
}

impl Error {
    /// Whether the session is unusable after this error. Per-path errors leave it usable.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Connection { .. } | Error::Closed)
    }

    #[must_use]
    pub fn remote_io(path: &str, source: impl Into<anyhow::Error>) -> Self {
        Error::RemoteIo {
            path: path.to_string(),
            source: source.into(),
        }
    }

    #[must_use]
    pub fn upload(local: &std::path::Path, remote: &str, source: &anyhow::Error) -> Self {
        Error::Upload {
            local: local.to_path_buf(),
            remote: remote.to_string(),
            reason: format!("{source:#}"),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
