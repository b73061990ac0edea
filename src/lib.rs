//! Skrins - screenshot relay
//!
//! Watches a local directory for new captures, converts `.mov` clips,
//! uploads everything allowed over SFTP under a fresh unique name, puts the
//! public URL on the clipboard, shows a notification and deletes the local
//! copy.

pub mod config;
pub mod error;
pub mod naming;
pub mod pipeline;
pub mod policy;
pub mod publish;
pub mod scanner;
pub mod transcode;
pub mod transfer;
pub mod types;
pub mod watcher;

pub use config::RelayConfig;
pub use error::{Result, SkrinsError};
pub use pipeline::Pipeline;
pub use types::*;
pub use watcher::RelayWatcher;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
