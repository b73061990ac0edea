//! Relay configuration.
//!
//! Built once at startup from defaults, an optional TOML file and CLI/env
//! overrides, then handed to each component. Nothing reads configuration
//! from global state.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, SkrinsError};
use crate::types::with_trailing_slash;

/// Default SSH port appended to hosts given without one
pub const DEFAULT_SSH_PORT: u16 = 22;

/// Full relay configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Directory where screenshots are saved locally
    pub watch_dir: PathBuf,
    /// Base URL pointing at the remote root, e.g. `https://i.example.io/`
    pub base_url: String,
    pub remote: RemoteConfig,
    pub transcode: TranscodeConfig,
    pub publish: PublishConfig,
    pub watch: WatchConfig,
}

/// Remote SFTP store
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// `host:port`, e.g. `example.com:2003`
    pub host: String,
    /// User on the remote host
    pub user: String,
    /// Private key used for the single configured identity
    pub key_path: PathBuf,
    /// Passphrase for the private key
    #[serde(skip_serializing_if = "Option::is_none")]
    pub passphrase: Option<String>,
    /// Directory on the remote host, normalized to one trailing slash
    pub root: String,
}

/// External transcoder
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscodeConfig {
    /// Transcoder executable
    pub program: PathBuf,
    /// Intermediate output file name inside the watched directory
    pub output_name: String,
}

impl Default for TranscodeConfig {
    fn default() -> Self {
        Self {
            program: PathBuf::from("/usr/local/bin/ffmpeg"),
            output_name: "out.mp4".to_string(),
        }
    }
}

/// Clipboard and notification side effects
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PublishConfig {
    pub clipboard: bool,
    pub notification: bool,
    pub app_name: String,
    pub title: String,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            clipboard: true,
            notification: true,
            app_name: "Skrins".to_string(),
            title: "Screenshot uploaded!".to_string(),
        }
    }
}

/// Filesystem notification handling
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Buffered notifications; further events are dropped while full
    pub channel_capacity: usize,
    /// Run one pass at startup instead of waiting for the first change
    pub initial_scan: bool,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 64,
            initial_scan: false,
        }
    }
}

/// Values given on the command line or through the environment
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub watch_dir: Option<String>,
    pub remote_host: Option<String>,
    pub remote_user: Option<String>,
    pub key_path: Option<String>,
    pub passphrase: Option<String>,
    pub remote_root: Option<String>,
    pub base_url: Option<String>,
    pub transcoder: Option<String>,
    pub no_clipboard: bool,
    pub no_notification: bool,
    pub initial_scan: bool,
}

impl RelayConfig {
    /// Default config file location (`~/.config/skrins/config.toml`)
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("skrins").join("config.toml"))
    }

    /// Parse a TOML document
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| SkrinsError::Config(e.to_string()))
    }

    /// Load from an explicit file, or from the default location when present
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match Self::default_path() {
                Some(p) if p.exists() => p,
                _ => {
                    tracing::debug!("No config file found, using defaults");
                    return Ok(Self::default());
                }
            },
        };

        let content = std::fs::read_to_string(&path).map_err(|e| {
            SkrinsError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        tracing::debug!("Loaded config from {}", path.display());
        Self::from_toml(&content)
    }

    /// Apply CLI/env overrides on top of file values
    pub fn apply(&mut self, overrides: ConfigOverrides) {
        if let Some(v) = overrides.watch_dir {
            self.watch_dir = PathBuf::from(v);
        }
        if let Some(v) = overrides.remote_host {
            self.remote.host = v;
        }
        if let Some(v) = overrides.remote_user {
            self.remote.user = v;
        }
        if let Some(v) = overrides.key_path {
            self.remote.key_path = PathBuf::from(v);
        }
        if overrides.passphrase.is_some() {
            self.remote.passphrase = overrides.passphrase;
        }
        if let Some(v) = overrides.remote_root {
            self.remote.root = v;
        }
        if let Some(v) = overrides.base_url {
            self.base_url = v;
        }
        if let Some(v) = overrides.transcoder {
            self.transcode.program = PathBuf::from(v);
        }
        if overrides.no_clipboard {
            self.publish.clipboard = false;
        }
        if overrides.no_notification {
            self.publish.notification = false;
        }
        if overrides.initial_scan {
            self.watch.initial_scan = true;
        }
    }

    /// Expand `~`, normalize trailing slashes and default the SSH port
    pub fn normalize(mut self) -> Self {
        self.watch_dir = expand_path(&self.watch_dir);
        self.remote.key_path = expand_path(&self.remote.key_path);
        self.transcode.program = expand_path(&self.transcode.program);

        if !self.base_url.is_empty() {
            self.base_url = with_trailing_slash(&self.base_url);
        }
        if !self.remote.root.is_empty() {
            self.remote.root = with_trailing_slash(&self.remote.root);
        }
        if !self.remote.host.is_empty() && !has_port(&self.remote.host) {
            self.remote.host = with_port(&self.remote.host, DEFAULT_SSH_PORT);
        }
        self
    }

    /// Reject configurations that cannot possibly work
    pub fn validate(&self) -> Result<()> {
        let mut missing = Vec::new();
        if self.watch_dir.as_os_str().is_empty() {
            missing.push("watch_dir");
        }
        if self.base_url.is_empty() {
            missing.push("base_url");
        }
        if self.remote.host.is_empty() {
            missing.push("remote.host");
        }
        if self.remote.user.is_empty() {
            missing.push("remote.user");
        }
        if self.remote.key_path.as_os_str().is_empty() {
            missing.push("remote.key_path");
        }
        if self.remote.root.is_empty() {
            missing.push("remote.root");
        }
        if !missing.is_empty() {
            return Err(SkrinsError::Config(format!(
                "Missing required settings: {}",
                missing.join(", ")
            )));
        }

        let output = &self.transcode.output_name;
        if output.is_empty() || output.contains('/') {
            return Err(SkrinsError::Config(format!(
                "transcode.output_name must be a plain file name, got {:?}",
                output
            )));
        }
        if self.watch.channel_capacity == 0 {
            return Err(SkrinsError::Config(
                "watch.channel_capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Copy with secrets masked, for display
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if copy.remote.passphrase.is_some() {
            copy.remote.passphrase = Some("********".to_string());
        }
        copy
    }

    /// Render as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| SkrinsError::Config(e.to_string()))
    }
}

fn expand_path(path: &Path) -> PathBuf {
    PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).to_string())
}

fn has_port(host: &str) -> bool {
    // Bracketed IPv6 literals carry the port after `]:`
    if let Some(rest) = host.strip_prefix('[') {
        return rest.contains("]:");
    }
    match host.rsplit_once(':') {
        Some((name, port)) => !name.contains(':') && port.parse::<u16>().is_ok(),
        None => false,
    }
}

fn with_port(host: &str, port: u16) -> String {
    if !host.starts_with('[') && host.contains(':') {
        // Bare IPv6 literal
        format!("[{}]:{}", host, port)
    } else {
        format!("{}:{}", host, port)
    }
}
