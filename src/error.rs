//! Error types for Skrins

use std::path::PathBuf;

use thiserror::Error;

use crate::types::UploadStage;

/// Result type alias for Skrins operations
pub type Result<T> = std::result::Result<T, SkrinsError>;

/// Main error type for Skrins
#[derive(Error, Debug)]
pub enum SkrinsError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Watch directory {} is not readable: {source}", .path.display())]
    WatchDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Watcher error: {0}")]
    Watch(#[from] notify::Error),

    #[error("Transcode error: {0}")]
    Transcode(String),

    #[error("Transfer failed at {stage}: {message}")]
    Transfer { stage: UploadStage, message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl SkrinsError {
    /// Build a transfer error for the given stage
    pub fn transfer(stage: UploadStage, err: impl std::fmt::Display) -> Self {
        SkrinsError::Transfer {
            stage,
            message: err.to_string(),
        }
    }

    /// Check if the error must terminate the process.
    ///
    /// Everything else only aborts the current file; it stays on disk and is
    /// reconsidered on the next triggering event.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SkrinsError::Config(_)
                | SkrinsError::WatchDirectory { .. }
                | SkrinsError::Watch(_)
                | SkrinsError::Internal(_)
        )
    }

    /// Upload stage that failed, for transfer errors
    pub fn stage(&self) -> Option<UploadStage> {
        match self {
            SkrinsError::Transfer { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}
