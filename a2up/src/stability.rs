//! Deciding when a just-created file is safe to read.
//!
//! A creation event fires as soon as the file appears, usually before the writer is done with
//! it. Uploading right away would mirror a truncated file, and since existing remote files are
//! never overwritten the truncated copy would stay. The policies here delay the upload until the
//! file is believed complete.

use anyhow::{Context, anyhow};
use tracing::instrument;

#[async_trait::async_trait]
pub trait StabilityPolicy: Send + Sync + std::fmt::Debug {
    /// Returns once `path` is considered fully written; an error fails the upload of that file.
    async fn wait_until_stable(&self, path: &std::path::Path) -> anyhow::Result<()>;
}

async fn file_size(path: &std::path::Path) -> anyhow::Result<u64> {
    let metadata = tokio::fs::metadata(path)
        .await
        .with_context(|| format!("{:?} is no longer readable", path))?;
    if !metadata.is_file() {
        return Err(anyhow!("{:?} is no longer a regular file", path));
    }
    Ok(metadata.len())
}

/// Sleep for a fixed time after detection.
///
/// Writers that take longer than the delay still produce a partial upload.
#[derive(Debug, Clone, Copy)]
pub struct FixedDelay(pub std::time::Duration);

impl Default for FixedDelay {
    fn default() -> Self {
        Self(std::time::Duration::from_secs(1))
    }
}

#[async_trait::async_trait]
impl StabilityPolicy for FixedDelay {
    #[instrument]
    async fn wait_until_stable(&self, path: &std::path::Path) -> anyhow::Result<()> {
        tokio::time::sleep(self.0).await;
        file_size(path).await?;
        Ok(())
    }
}

/// Poll the file size until two consecutive samples agree.
#[derive(Debug, Clone, Copy)]
pub struct SizeStable {
    pub interval: std::time::Duration,
    pub max_wait: std::time::Duration,
}

#[async_trait::async_trait]
impl StabilityPolicy for SizeStable {
    #[instrument]
    async fn wait_until_stable(&self, path: &std::path::Path) -> anyhow::Result<()> {
        let start = tokio::time::Instant::now();
        let mut previous = file_size(path).await?;
        loop {
            tokio::time::sleep(self.interval).await;
            let current = file_size(path).await?;
            if current == previous {
                tracing::debug!("{:?} stable at {} bytes", path, current);
                return Ok(());
            }
            if start.elapsed() >= self.max_wait {
                return Err(anyhow!(
                    "{:?} still growing after {} ({} bytes)",
                    path,
                    humantime::format_duration(self.max_wait),
                    current
                ));
            }
            tracing::trace!("{:?} grew from {} to {} bytes", path, previous, current);
            previous = current;
        }
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum StabilityMode {
    /// Wait a fixed delay after the file appears
    #[default]
    Fixed,
    /// Wait until the file size stops changing
    SizeStable,
}

/// Build the policy selected on the command line. `delay` doubles as the poll interval of the
/// size-stable mode.
#[must_use]
pub fn policy(
    mode: StabilityMode,
    delay: std::time::Duration,
    timeout: std::time::Duration,
) -> Box<dyn StabilityPolicy> {
    match mode {
        StabilityMode::Fixed => Box::new(FixedDelay(delay)),
        StabilityMode::SizeStable => Box::new(SizeStable {
            interval: delay,
            max_wait: timeout,
        }),
    }
}
