//! Skrins screenshot relay
//!
//! Run with: skrins --path ~/Pictures/screens --remote example.com:22 \
//!     --remote-user me --private-key ~/.ssh/id_ed25519 \
//!     --remote-path /var/www/i --url https://i.example.io

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use skrins::config::{ConfigOverrides, RelayConfig};
use skrins::error::{Result, SkrinsError};
use skrins::{Pipeline, RelayWatcher, VERSION};

#[derive(Parser, Debug)]
#[command(name = "skrins")]
#[command(about = "Upload new screenshots over SFTP and copy their public URL")]
#[command(version)]
struct Cli {
    /// Config file (defaults to ~/.config/skrins/config.toml when present)
    #[arg(short, long, env = "SKRINS_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Path to where screenshots are saved locally
    #[arg(short = 'p', long = "path", env = "SKRINS_WATCH_DIR", global = true)]
    watch_dir: Option<String>,

    /// Remote host, e.g. example.com:2003 or 43.56.122.31:22
    #[arg(short = 'r', long = "remote", env = "SKRINS_REMOTE_HOST", global = true)]
    remote_host: Option<String>,

    /// Username on remote host
    #[arg(long, env = "SKRINS_REMOTE_USER", global = true)]
    remote_user: Option<String>,

    /// Private key path
    #[arg(long, env = "SKRINS_PRIVATE_KEY", global = true)]
    private_key: Option<String>,

    /// Private key passphrase
    #[arg(long, env = "SKRINS_KEY_PASSPHRASE", hide_env_values = true, global = true)]
    passphrase: Option<String>,

    /// Path on the remote host
    #[arg(long, env = "SKRINS_REMOTE_PATH", global = true)]
    remote_path: Option<String>,

    /// Base URL that points to the remote path, e.g. https://i.example.io/
    #[arg(long = "url", env = "SKRINS_BASE_URL", global = true)]
    base_url: Option<String>,

    /// Transcoder executable
    #[arg(long, env = "SKRINS_FFMPEG", global = true)]
    ffmpeg: Option<String>,

    /// Do not copy URLs to the clipboard
    #[arg(long, global = true)]
    no_clipboard: bool,

    /// Do not show desktop notifications
    #[arg(long, global = true)]
    no_notification: bool,

    /// Process files already in the directory at startup
    #[arg(long, global = true)]
    initial_scan: bool,

    /// Log output format
    #[arg(long, value_enum, default_value = "text", global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, Copy)]
enum Commands {
    /// Watch the directory and upload new files (default)
    Run,
    /// Run a single pass and print the report as JSON
    Once,
    /// Validate configuration and print the effective settings
    Check,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum LogFormat {
    Text,
    Json,
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            watch_dir: self.watch_dir.clone(),
            remote_host: self.remote_host.clone(),
            remote_user: self.remote_user.clone(),
            key_path: self.private_key.clone(),
            passphrase: self.passphrase.clone(),
            remote_root: self.remote_path.clone(),
            base_url: self.base_url.clone(),
            transcoder: self.ffmpeg.clone(),
            no_clipboard: self.no_clipboard,
            no_notification: self.no_notification,
            initial_scan: self.initial_scan,
        }
    }
}

fn init_logging(format: LogFormat) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("skrins=info"));
    let registry = tracing_subscriber::registry().with(filter);

    // Logs go to stderr; stdout carries `once`/`check` output
    match format {
        LogFormat::Text => registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_format);

    let mut config = RelayConfig::load(cli.config.as_deref())?;
    config.apply(cli.overrides());
    let config = config.normalize();
    config.validate()?;

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Check => {
            println!("{}", config.redacted().to_toml()?);
        }

        Commands::Once => {
            let pipeline = Pipeline::from_config(&config);
            pipeline.ensure_ready()?;
            let report = tokio::task::spawn_blocking(move || pipeline.run_pass())
                .await
                .map_err(|e| SkrinsError::Internal(format!("Pass panicked: {}", e)))??;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }

        Commands::Run => {
            let watcher = RelayWatcher::new(Pipeline::from_config(&config), config.watch.clone());
            let handle = watcher.start()?;
            tracing::info!("Skrins {} relaying to {}", VERSION, config.base_url);

            tokio::select! {
                result = handle.join() => result?,
                signal = tokio::signal::ctrl_c() => {
                    signal?;
                    tracing::info!("Interrupted, shutting down");
                }
            }
        }
    }

    Ok(())
}
