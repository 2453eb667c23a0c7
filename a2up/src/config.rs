//! Validated run configuration.

use remote::{Endpoint, RemoteFs};

#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    #[error(transparent)]
    Endpoint(#[from] remote::endpoint::ParseError),
    #[error("destination directory must not be empty")]
    EmptyDestination,
    #[error("source directory {0:?} does not exist")]
    SourceMissing(std::path::PathBuf),
    #[error("source {0:?} is not a directory")]
    SourceNotDirectory(std::path::PathBuf),
    #[error("source directory {path:?} is not readable: {source}")]
    SourceUnreadable {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Configuration {
    pub source_dir: std::path::PathBuf,
    /// Remote directory; absolute after [`Configuration::resolve_destination`]
    pub dest_dir: String,
    pub endpoint: Endpoint,
}

impl Configuration {
    pub fn new(
        server: &str,
        source_dir: std::path::PathBuf,
        dest_dir: String,
    ) -> Result<Self, ConfigurationError> {
        let endpoint = Endpoint::parse(server)?;
        if dest_dir.trim().is_empty() {
            return Err(ConfigurationError::EmptyDestination);
        }
        Ok(Self {
            source_dir,
            dest_dir,
            endpoint,
        })
    }

    /// Check the local side. Must pass before anything touches the network.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let metadata = match std::fs::metadata(&self.source_dir) {
            Ok(metadata) => metadata,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                return Err(ConfigurationError::SourceMissing(self.source_dir.clone()));
            }
            Err(source) => {
                return Err(ConfigurationError::SourceUnreadable {
                    path: self.source_dir.clone(),
                    source,
                });
            }
        };
        if !metadata.is_dir() {
            return Err(ConfigurationError::SourceNotDirectory(
                self.source_dir.clone(),
            ));
        }
        std::fs::read_dir(&self.source_dir).map_err(|source| {
            ConfigurationError::SourceUnreadable {
                path: self.source_dir.clone(),
                source,
            }
        })?;
        Ok(())
    }

    /// Normalize `dest_dir` into an absolute remote path, resolving a relative one against the
    /// remote login directory.
    pub async fn resolve_destination<R: RemoteFs>(
        &mut self,
        session: &mut R,
    ) -> remote::Result<&str> {
        let resolved = if remote::path::is_absolute(&self.dest_dir) {
            remote::path::normalize(&self.dest_dir)
        } else {
            let home = session.home_dir().await?;
            remote::path::absolutize(&home, &self.dest_dir)
        };
        if resolved != self.dest_dir {
            tracing::debug!("Destination {:?} resolved to {:?}", self.dest_dir, resolved);
        }
        self.dest_dir = resolved;
        Ok(&self.dest_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutils::{Call, FakeRemote};

    fn config(source_dir: &std::path::Path, dest_dir: &str) -> Configuration {
        Configuration::new("pi@raspberrypi", source_dir.to_path_buf(), dest_dir.to_string())
            .unwrap()
    }

    #[test]
    fn rejects_bad_endpoint() {
        let error =
            Configuration::new("raspberrypi", "/tmp".into(), "/srv".to_string()).unwrap_err();
        assert!(matches!(error, ConfigurationError::Endpoint(_)));
    }

    #[test]
    fn rejects_empty_destination() {
        let error =
            Configuration::new("pi@raspberrypi", "/tmp".into(), " ".to_string()).unwrap_err();
        assert!(matches!(error, ConfigurationError::EmptyDestination));
    }

    #[test]
    fn validate_accepts_directory() {
        let dir = tempfile::tempdir().unwrap();
        config(dir.path(), "/srv/in").validate().unwrap();
    }

    #[test]
    fn validate_rejects_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        let error = config(&missing, "/srv/in").validate().unwrap_err();
        assert!(matches!(error, ConfigurationError::SourceMissing(_)));
        assert!(error.to_string().contains("does not exist"));
    }

    #[test]
    fn validate_rejects_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("file.txt");
        std::fs::write(&file, b"x").unwrap();
        let error = config(&file, "/srv/in").validate().unwrap_err();
        assert!(matches!(error, ConfigurationError::SourceNotDirectory(_)));
    }

    #[tokio::test]
    async fn absolute_destination_is_normalized_without_remote_calls() {
        let mut session = FakeRemote::default();
        let mut config = config(std::path::Path::new("/tmp"), "/srv//in/./");
        assert_eq!(
            config.resolve_destination(&mut session).await.unwrap(),
            "/srv/in"
        );
        assert!(session.calls().is_empty());
    }

    #[tokio::test]
    async fn relative_destination_uses_home_dir() {
        let mut session = FakeRemote::default();
        let mut config = config(std::path::Path::new("/tmp"), "uploads/");
        config.resolve_destination(&mut session).await.unwrap();
        assert_eq!(config.dest_dir, "/home/pi/uploads");
        assert_eq!(session.calls(), vec![Call::HomeDir]);
    }
}
