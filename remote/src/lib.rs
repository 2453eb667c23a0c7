//! Remote side of a2up: SSH endpoint parsing, remote path helpers and the SFTP session.
//!
//! The upload pipeline talks to the remote host exclusively through the [`RemoteFs`] trait so it
//! can be driven by [`session::RemoteSession`] in production and by an in-memory fake in tests.
//!
//! All paths passed to [`RemoteFs`] are remote POSIX paths (see [`path`]); local paths are only
//! ever the source argument of [`RemoteFs::upload`].

mod client;
pub mod endpoint;
pub mod error;
pub mod path;
pub mod session;

pub use endpoint::Endpoint;
pub use error::{Error, Result};
pub use session::{ConnectOptions, RemoteSession};

/// Secret used to authenticate the SSH session.
#[derive(Clone)]
pub enum Credential {
    Password(String),
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Credential::Password(_) => f.write_str("Password(<redacted>)"),
        }
    }
}

/// Operations the upload pipeline needs from the remote host.
///
/// Implementations are used sequentially by a single owner, hence `&mut self` everywhere.
#[async_trait::async_trait]
pub trait RemoteFs: Send {
    /// Whether anything (file or directory) exists at `path`.
    async fn exists(&mut self, path: &str) -> Result<bool>;

    async fn create_dir(&mut self, path: &str) -> Result<()>;

    /// Copy the local file to `remote`, overwriting it. Returns the number of bytes written.
    async fn upload(&mut self, local: &std::path::Path, remote: &str) -> Result<u64>;

    /// Bytes available to the logged in user on the filesystem holding `path`.
    async fn available_space(&mut self, path: &str) -> Result<u64>;

    /// Absolute path of the login directory.
    async fn home_dir(&mut self) -> Result<String>;

    /// Close the session. Calling it again is a no-op.
    async fn close(&mut self) -> Result<()>;

    /// Create `path` unless it already exists. Returns `true` if it was created.
    ///
    /// Only the leaf is created; missing parents make this fail.
    async fn ensure_directory(&mut self, path: &str) -> Result<bool> {
        if self.exists(path).await? {
            tracing::debug!("Remote directory {:?} already exists", path);
            return Ok(false);
        }
        self.create_dir(path).await?;
        tracing::info!("Created remote directory {:?}", path);
        Ok(true)
    }
}
