use anyhow::anyhow;
use remote::{Error, RemoteFs, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Exists(String),
    CreateDir(String),
    Upload {
        local: std::path::PathBuf,
        remote: String,
    },
    AvailableSpace(String),
    HomeDir,
    Close,
}

#[derive(Debug, Default)]
struct State {
    files: std::collections::HashMap<String, Vec<u8>>,
    dirs: std::collections::HashSet<String>,
    failing_exists: std::collections::HashSet<String>,
    failing_uploads: std::collections::HashSet<String>,
    calls: Vec<Call>,
    available: u64,
    block_uploads: bool,
    upload_delay: Option<std::time::Duration>,
    closed: bool,
    transport_lost: bool,
    fail_close: bool,
    effective_closes: usize,
}

/// In-memory remote host that records every call in order.
///
/// Clones share state, so a test can keep one handle while the coordinator owns another.
#[derive(Debug, Clone, Default)]
pub struct FakeRemote {
    state: std::sync::Arc<std::sync::Mutex<State>>,
    upload_started: std::sync::Arc<tokio::sync::Notify>,
}

impl FakeRemote {
    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    pub fn add_file(&self, path: &str, content: &[u8]) {
        self.lock().files.insert(path.to_string(), content.to_vec());
    }

    pub fn add_dir(&self, path: &str) {
        self.lock().dirs.insert(path.to_string());
    }

    pub fn set_available(&self, bytes: u64) {
        self.lock().available = bytes;
    }

    pub fn fail_exists(&self, path: &str) {
        self.lock().failing_exists.insert(path.to_string());
    }

    pub fn fail_upload(&self, path: &str) {
        self.lock().failing_uploads.insert(path.to_string());
    }

    /// Uploads never complete.
    pub fn block_uploads(&self) {
        self.lock().block_uploads = true;
    }

    /// Every later operation fails as if the server dropped the connection.
    pub fn kill_transport(&self) {
        self.lock().transport_lost = true;
    }

    /// Closing still takes effect but reports a failed disconnect.
    pub fn fail_close(&self) {
        self.lock().fail_close = true;
    }

    pub fn delay_uploads(&self, delay: std::time::Duration) {
        self.lock().upload_delay = Some(delay);
    }

    pub async fn wait_for_upload_start(&self) {
        self.upload_started.notified().await;
    }

    pub fn file(&self, path: &str) -> Option<Vec<u8>> {
        self.lock().files.get(path).cloned()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    pub fn close_calls(&self) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|call| **call == Call::Close)
            .count()
    }

    pub fn effective_closes(&self) -> usize {
        self.lock().effective_closes
    }

    fn enter(&self, call: Call) -> Result<std::sync::MutexGuard<'_, State>> {
        let mut state = self.lock();
        state.calls.push(call);
        if state.closed {
            return Err(Error::Closed);
        }
        if state.transport_lost {
            return Err(Error::Connection {
                endpoint: "pi@raspberrypi".to_string(),
                source: anyhow!("transport closed"),
            });
        }
        Ok(state)
    }
}

#[async_trait::async_trait]
impl RemoteFs for FakeRemote {
    async fn exists(&mut self, path: &str) -> Result<bool> {
        let state = self.enter(Call::Exists(path.to_string()))?;
        if state.failing_exists.contains(path) {
            return Err(Error::remote_io(path, anyhow!("permission denied")));
        }
        Ok(state.files.contains_key(path) || state.dirs.contains(path))
    }

    async fn create_dir(&mut self, path: &str) -> Result<()> {
        let mut state = self.enter(Call::CreateDir(path.to_string()))?;
        let parent = match path.rsplit_once('/') {
            Some(("", _)) | None => "/",
            Some((parent, _)) => parent,
        };
        if parent != "/" && !state.dirs.contains(parent) {
            return Err(Error::remote_io(path, anyhow!("no such file")));
        }
        if !state.dirs.insert(path.to_string()) {
            return Err(Error::remote_io(path, anyhow!("failure")));
        }
        Ok(())
    }

    async fn upload(&mut self, local: &std::path::Path, remote: &str) -> Result<u64> {
        let (blocked, delay) = {
            let state = self.enter(Call::Upload {
                local: local.to_path_buf(),
                remote: remote.to_string(),
            })?;
            if state.failing_uploads.contains(remote) {
                return Err(Error::upload(local, remote, &anyhow!("connection reset")));
            }
            (state.block_uploads, state.upload_delay)
        };
        self.upload_started.notify_one();
        let content = std::fs::read(local)
            .map_err(|error| Error::upload(local, remote, &anyhow::Error::from(error)))?;
        if blocked {
            std::future::pending::<()>().await;
        }
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let bytes = content.len() as u64;
        self.lock().files.insert(remote.to_string(), content);
        Ok(bytes)
    }

    async fn available_space(&mut self, path: &str) -> Result<u64> {
        let state = self.enter(Call::AvailableSpace(path.to_string()))?;
        Ok(state.available)
    }

    async fn home_dir(&mut self) -> Result<String> {
        drop(self.enter(Call::HomeDir)?);
        Ok("/home/pi".to_string())
    }

    async fn close(&mut self) -> Result<()> {
        let mut state = self.lock();
        state.calls.push(Call::Close);
        if !state.closed {
            state.closed = true;
            state.effective_closes += 1;
        }
        if state.fail_close {
            return Err(Error::Connection {
                endpoint: "pi@raspberrypi".to_string(),
                source: anyhow!("disconnect failed"),
            });
        }
        Ok(())
    }
}
