//! Shared runtime and logging support for the a2up tools
//!
//! Binaries hand their async entry point to [`run`], which:
//!
//! 1. installs a `tracing` subscriber according to [`OutputConfig`],
//! 2. builds a multi-threaded tokio runtime according to [`RuntimeConfig`],
//! 3. drives the entry point to completion and logs a failure with its full error chain,
//! 4. prints the [`Summary`] when requested.
//!
//! # Logging
//!
//! Logs go to stdout. The default level is INFO so that every per-file outcome is visible;
//! `-v` raises it to DEBUG, `-vv` to TRACE and `--quiet` turns logging off. `RUST_LOG`
//! overrides the computed level. An optional log file receives the same events without
//! ANSI colors.

use anyhow::Context;
use tracing_subscriber::prelude::*;

pub mod config;
pub mod summary;

pub use config::{OutputConfig, RuntimeConfig};
pub use summary::Summary;

fn env_filter(output: &OutputConfig) -> tracing_subscriber::EnvFilter {
    let level = match output.level() {
        Some(level) => tracing_subscriber::filter::LevelFilter::from_level(level),
        None => tracing_subscriber::filter::LevelFilter::OFF,
    };
    tracing_subscriber::EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy()
}

/// Install the global `tracing` subscriber.
///
/// Fails if the log file cannot be created or a global subscriber is already set.
pub fn init_tracing(output: &OutputConfig) -> anyhow::Result<()> {
    let file_layer = match &output.log_file {
        Some(path) => {
            let file = std::fs::File::create(path)
                .with_context(|| format!("failed creating log file {:?}", path))?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(std::sync::Arc::new(file)),
            )
        }
        None => None,
    };
    let stdout_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stdout);
    tracing_subscriber::registry()
        .with(env_filter(output))
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
        .context("failed installing tracing subscriber")?;
    Ok(())
}

fn build_runtime(runtime: &RuntimeConfig) -> anyhow::Result<tokio::runtime::Runtime> {
    let mut builder = tokio::runtime::Builder::new_multi_thread();
    builder.enable_all();
    if runtime.max_workers > 0 {
        builder.worker_threads(runtime.max_workers);
    }
    if runtime.max_blocking_threads > 0 {
        builder.max_blocking_threads(runtime.max_blocking_threads);
    }
    builder.build().context("failed building tokio runtime")
}

/// Run `func` on a freshly built runtime.
///
/// Returns `None` if setup failed or `func` returned an error; the error has already been
/// logged by then, callers only need to pick an exit code.
pub fn run<Fut>(
    output: OutputConfig,
    runtime: RuntimeConfig,
    func: impl FnOnce() -> Fut,
) -> Option<Summary>
where
    Fut: std::future::Future<Output = anyhow::Result<Summary>>,
{
    if let Err(error) = init_tracing(&output) {
        if !output.quiet {
            eprintln!("{:#}", &error);
        }
        return None;
    }
    let runtime = match build_runtime(&runtime) {
        Ok(runtime) => runtime,
        Err(error) => {
            tracing::error!("{:#}", &error);
            return None;
        }
    };
    let res = runtime.block_on(func());
    match res {
        Ok(summary) => {
            if output.print_summary {
                println!("{}", &summary);
            }
            Some(summary)
        }
        Err(error) => {
            tracing::error!("{:#}", &error);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runtime_respects_worker_limits() {
        let runtime = build_runtime(&RuntimeConfig {
            max_workers: 2,
            max_blocking_threads: 4,
        })
        .unwrap();
        let value = runtime.block_on(async { 40 + 2 });
        assert_eq!(value, 42);
    }

    #[test]
    fn log_file_must_be_creatable() {
        let dir = tempfile::tempdir().unwrap();
        let output = OutputConfig {
            log_file: Some(dir.path().join("missing").join("a2up.log")),
            ..Default::default()
        };
        let error = init_tracing(&output).unwrap_err();
        assert!(format!("{error:#}").contains("failed creating log file"));
    }
}
