use anyhow::Context;
use clap::{CommandFactory, Parser};
use tracing::instrument;

use a2up::config::Configuration;
use a2up::stability::StabilityMode;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "a2up",
    version,
    about = "Watch a directory and upload every newly created file to a remote host over SFTP",
    long_about = "`a2up` watches a local directory and uploads every newly created file into a directory on a remote host over SFTP.

Uploads are one-shot: files that already exist on the remote side are skipped and never overwritten. Only files created directly in the watched directory are picked up; subdirectories are ignored. The password is prompted for on the terminal.

EXAMPLES:
    # Mirror new files from ./outbox to /srv/inbox
    a2up -s pi@raspberrypi -f ./outbox -d /srv/inbox

    # Non-standard port, wait for files to stop growing before uploading
    a2up -s backup@nas.local:2222 -f /data/out -d incoming --stability size-stable

    # Show free space in the destination directory and exit
    a2up -s pi@raspberrypi -f ./outbox -d /srv/inbox --space-available"
)]
struct Args {
    // Connection
    /// Remote server as user@host or user@host:port
    #[arg(short, long, value_name = "USER@HOST[:PORT]", help_heading = "Connection")]
    server: String,

    /// Timeout for connecting and authenticating
    ///
    /// Accepts human-readable durations like "15s", "1min".
    #[arg(
        long,
        default_value = "15s",
        value_name = "DURATION",
        value_parser = humantime::parse_duration,
        help_heading = "Connection"
    )]
    connect_timeout: std::time::Duration,

    /// Accepted server host key fingerprint (SHA256:...), may be given multiple times
    ///
    /// Without it any host key is accepted and its fingerprint is logged.
    #[arg(long, value_name = "FINGERPRINT", help_heading = "Connection")]
    host_key_fingerprint: Vec<String>,

    // Directories
    /// Local directory to watch for new files
    #[arg(short, long = "from", value_name = "DIR", help_heading = "Directories")]
    from: std::path::PathBuf,

    /// Remote directory receiving the files, created if missing
    ///
    /// Relative paths are resolved against the remote login directory.
    #[arg(short, long, value_name = "DIR", help_heading = "Directories")]
    destination: String,

    /// Print the space available in the destination directory and exit
    #[arg(long, help_heading = "Directories")]
    space_available: bool,

    // Upload behavior
    /// How to decide that a new file is completely written
    #[arg(
        long,
        default_value = "fixed",
        value_name = "MODE",
        help_heading = "Upload behavior"
    )]
    stability: StabilityMode,

    /// Delay before uploading a new file (poll interval with --stability size-stable)
    #[arg(
        long,
        default_value = "1s",
        value_name = "DURATION",
        value_parser = humantime::parse_duration,
        help_heading = "Upload behavior"
    )]
    stability_delay: std::time::Duration,

    /// Give up on a file that is still growing after this long (--stability size-stable)
    #[arg(
        long,
        default_value = "30s",
        value_name = "DURATION",
        value_parser = humantime::parse_duration,
        help_heading = "Upload behavior"
    )]
    stability_timeout: std::time::Duration,

    /// On Ctrl+C, how long to let the upload in progress finish before abandoning it
    #[arg(
        long,
        default_value = "0s",
        value_name = "DURATION",
        value_parser = humantime::parse_duration,
        help_heading = "Upload behavior"
    )]
    shutdown_grace: std::time::Duration,

    /// Maximum number of detected files waiting for upload
    #[arg(
        long,
        default_value = "1024",
        value_name = "N",
        help_heading = "Upload behavior"
    )]
    queue_capacity: std::num::NonZeroUsize,

    // Progress & output
    /// Print summary at the end
    #[arg(long, help_heading = "Progress & output")]
    summary: bool,

    /// Verbose level: -v DEBUG / -vv TRACE (default: INFO)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, help_heading = "Progress & output")]
    verbose: u8,

    /// Quiet mode, don't report anything
    #[arg(short = 'q', long = "quiet", help_heading = "Progress & output")]
    quiet: bool,

    /// Also write logs to this file
    #[arg(long, value_name = "PATH", help_heading = "Progress & output")]
    log_file: Option<std::path::PathBuf>,

    // Advanced settings
    /// Number of worker threads (0 = number of CPU cores)
    #[arg(
        long,
        default_value = "0",
        value_name = "N",
        help_heading = "Advanced settings"
    )]
    max_workers: usize,
}

#[instrument(skip(args))]
async fn async_main(args: Args) -> anyhow::Result<common::Summary> {
    let mut config = Configuration::new(&args.server, args.from.clone(), args.destination.clone())?;
    config.validate()?;
    let credential = tokio::task::spawn_blocking(a2up::credential::prompt_password)
        .await
        .context("password prompt task failed")??;
    let options = remote::ConnectOptions {
        timeout: args.connect_timeout,
        allowed_fingerprints: if args.host_key_fingerprint.is_empty() {
            None
        } else {
            Some(args.host_key_fingerprint.clone())
        },
    };
    let mut session = remote::RemoteSession::connect(&config.endpoint, &credential, &options).await?;
    if let Err(error) = config.resolve_destination(&mut session).await {
        a2up::close_session(&mut session).await;
        return Err(error).context("cannot resolve destination directory");
    }
    if args.space_available {
        let report = a2up::space::report(&mut session, &config.dest_dir).await;
        a2up::close_session(&mut session).await;
        println!("{}", report?);
        return Ok(common::Summary::default());
    }
    let cancel = tokio_util::sync::CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => tracing::info!("Interrupted, shutting down"),
                Err(error) => tracing::error!("Failed to listen for Ctrl+C: {}", error),
            }
            cancel.cancel();
        });
    }
    let mirror_options = a2up::MirrorOptions {
        stability: a2up::stability::policy(
            args.stability,
            args.stability_delay,
            args.stability_timeout,
        ),
        shutdown_grace: args.shutdown_grace,
        queue_capacity: args.queue_capacity,
    };
    a2up::mirror(session, &config, mirror_options, cancel).await
}

fn main() -> Result<(), anyhow::Error> {
    if std::env::args_os().len() <= 1 {
        Args::command().print_help()?;
        println!();
        return Ok(());
    }
    let args = Args::parse();
    let func = {
        let args = args.clone();
        || async_main(args)
    };
    let output = common::OutputConfig {
        quiet: args.quiet,
        verbose: args.verbose,
        print_summary: args.summary,
        log_file: args.log_file.clone(),
    };
    let runtime = common::RuntimeConfig {
        max_workers: args.max_workers,
        max_blocking_threads: 0,
    };
    let res = common::run(output, runtime, func);
    if res.is_none() {
        std::process::exit(1);
    }
    Ok(())
}
