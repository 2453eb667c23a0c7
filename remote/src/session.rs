//! SFTP implementation of [`crate::RemoteFs`].
//!
//! One [`RemoteSession`] wraps one authenticated SSH transport and one SFTP handle. It is created
//! once, used sequentially, and closed once. There is no reconnect logic: once the transport is
//! gone every operation fails with [`Error::Connection`], which callers treat as fatal.

use anyhow::{Context, anyhow};
use russh_sftp::protocol::StatusCode;
use tokio::io::AsyncWriteExt;
use tracing::instrument;

use crate::client::Client;
use crate::{Credential, Endpoint, Error, RemoteFs, Result};

/// Connection settings that are not part of the endpoint itself.
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    /// Upper bound for TCP connect, SSH handshake, authentication and SFTP start-up
    pub timeout: std::time::Duration,
    /// Accepted host key fingerprints, `None` accepts any key
    pub allowed_fingerprints: Option<Vec<String>>,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            timeout: std::time::Duration::from_secs(15),
            allowed_fingerprints: None,
        }
    }
}

struct Connection {
    handle: russh::client::Handle<Client>,
    sftp: russh_sftp::client::SftpSession,
}

pub struct RemoteSession {
    endpoint: Endpoint,
    connection: Option<Connection>,
}

impl std::fmt::Debug for RemoteSession {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("RemoteSession")
            .field("endpoint", &self.endpoint)
            .field("closed", &self.connection.is_none())
            .finish()
    }
}

async fn establish(
    endpoint: &Endpoint,
    credential: &Credential,
    options: &ConnectOptions,
) -> anyhow::Result<Connection> {
    let config = std::sync::Arc::new(russh::client::Config::default());
    let handler = Client::new(options.allowed_fingerprints.clone());
    tracing::debug!(
        "Connecting to SSH server {}:{}",
        endpoint.socket_host(),
        endpoint.port()
    );
    let mut handle = russh::client::connect(
        config,
        (endpoint.socket_host(), endpoint.port()),
        handler,
    )
    .await
    .context("SSH handshake failed")?;
    let auth = match credential {
        Credential::Password(password) => handle
            .authenticate_password(endpoint.user.as_str(), password.as_str())
            .await
            .context("password authentication failed")?,
    };
    if let russh::client::AuthResult::Failure {
        remaining_methods,
        partial_success,
    } = auth
    {
        return Err(anyhow!(
            "authentication rejected for user {:?} (remaining methods: {:?}, partial success: {})",
            endpoint.user,
            remaining_methods,
            partial_success
        ));
    }
    tracing::debug!("Authenticated as {}", endpoint.user);
    let channel = handle
        .channel_open_session()
        .await
        .context("failed to open SSH session channel")?;
    channel
        .request_subsystem(true, "sftp")
        .await
        .context("failed to request SFTP subsystem")?;
    let sftp = russh_sftp::client::SftpSession::new(channel.into_stream())
        .await
        .context("failed to start SFTP session")?;
    Ok(Connection { handle, sftp })
}

impl RemoteSession {
    /// Connect and authenticate. Any failure is an [`Error::Connection`].
    #[instrument(skip(credential))]
    pub async fn connect(
        endpoint: &Endpoint,
        credential: &Credential,
        options: &ConnectOptions,
    ) -> Result<Self> {
        let connection_error = |source: anyhow::Error| Error::Connection {
            endpoint: endpoint.to_string(),
            source,
        };
        let connection = tokio::time::timeout(options.timeout, establish(endpoint, credential, options))
            .await
            .map_err(|_| {
                connection_error(anyhow!(
                    "timed out after {}",
                    humantime::format_duration(options.timeout)
                ))
            })?
            .map_err(connection_error)?;
        tracing::info!("Connected to {}", endpoint);
        Ok(Self {
            endpoint: endpoint.clone(),
            connection: Some(connection),
        })
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn is_closed(&self) -> bool {
        self.connection.is_none()
    }

    fn transport_lost(&self) -> Error {
        Error::Connection {
            endpoint: self.endpoint.to_string(),
            source: anyhow!("SSH transport closed by the server or network"),
        }
    }

    fn is_transport_lost(&self) -> bool {
        self.connection
            .as_ref()
            .is_some_and(|connection| connection.handle.is_closed())
    }

    fn sftp(&self) -> Result<&russh_sftp::client::SftpSession> {
        let connection = self.connection.as_ref().ok_or(Error::Closed)?;
        if connection.handle.is_closed() {
            return Err(self.transport_lost());
        }
        Ok(&connection.sftp)
    }

    /// A failed operation on a dead transport is a connection failure, not a per-path one.
    fn io_error(&self, path: &str, error: impl Into<anyhow::Error>) -> Error {
        if self.is_transport_lost() {
            return self.transport_lost();
        }
        Error::remote_io(path, error)
    }
}

#[async_trait::async_trait]
impl RemoteFs for RemoteSession {
    #[instrument(skip(self))]
    async fn exists(&mut self, path: &str) -> Result<bool> {
        match self.sftp()?.metadata(path).await {
            Ok(_) => Ok(true),
            Err(russh_sftp::client::error::Error::Status(status))
                if status.status_code == StatusCode::NoSuchFile =>
            {
                Ok(false)
            }
            Err(error) => Err(self.io_error(path, error)),
        }
    }

    #[instrument(skip(self))]
    async fn create_dir(&mut self, path: &str) -> Result<()> {
        self.sftp()?
            .create_dir(path)
            .await
            .map_err(|error| self.io_error(path, error))
    }

    #[instrument(skip(self))]
    async fn upload(&mut self, local: &std::path::Path, remote: &str) -> Result<u64> {
        let sftp = self.sftp()?;
        let transfer = async {
            let mut reader = tokio::fs::File::open(local)
                .await
                .with_context(|| format!("cannot open {:?} for reading", local))?;
            let mut writer = sftp
                .create(remote)
                .await
                .with_context(|| format!("cannot create remote file {:?}", remote))?;
            let bytes = tokio::io::copy(&mut reader, &mut writer)
                .await
                .context("transfer interrupted")?;
            writer
                .shutdown()
                .await
                .context("failed closing remote file")?;
            Ok::<u64, anyhow::Error>(bytes)
        };
        transfer.await.map_err(|error| {
            if self.is_transport_lost() {
                self.transport_lost()
            } else {
                Error::upload(local, remote, &error)
            }
        })
    }

    #[instrument(skip(self))]
    async fn available_space(&mut self, path: &str) -> Result<u64> {
        let stats = self
            .sftp()?
            .fs_info(path)
            .await
            .map_err(|error| self.io_error(path, error))?
            .ok_or_else(|| {
                Error::remote_io(
                    path,
                    anyhow!("server does not support the statvfs@openssh.com extension"),
                )
            })?;
        Ok(stats.blocks_avail.saturating_mul(stats.fragment_size))
    }

    #[instrument(skip(self))]
    async fn home_dir(&mut self) -> Result<String> {
        self.sftp()?
            .canonicalize(".")
            .await
            .map_err(|error| self.io_error(".", error))
    }

    async fn close(&mut self) -> Result<()> {
        let Some(connection) = self.connection.take() else {
            tracing::debug!("Session with {} already closed", self.endpoint);
            return Ok(());
        };
        tracing::info!("Disconnecting from {}", self.endpoint);
        let Connection { handle, sftp } = connection;
        drop(sftp);
        handle
            .disconnect(russh::Disconnect::ByApplication, "", "en")
            .await
            .map_err(|error| Error::Connection {
                endpoint: self.endpoint.to_string(),
                source: anyhow::Error::from(error).context("disconnect failed"),
            })
    }
}
