//! Core types for Skrins

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::naming::generate_token;

/// Classification of a file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtensionClass {
    /// Not on the allow-list; the file is left untouched
    Rejected,
    /// Uploaded as-is
    DirectTransfer,
    /// Converted first; the output is uploaded on a later pass
    RequiresTranscode,
}

impl ExtensionClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtensionClass::Rejected => "rejected",
            ExtensionClass::DirectTransfer => "direct_transfer",
            ExtensionClass::RequiresTranscode => "requires_transcode",
        }
    }
}

impl std::fmt::Display for ExtensionClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ExtensionClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rejected" => Ok(ExtensionClass::Rejected),
            "direct_transfer" => Ok(ExtensionClass::DirectTransfer),
            "requires_transcode" => Ok(ExtensionClass::RequiresTranscode),
            _ => Err(format!("Unknown extension class: {}", s)),
        }
    }
}

/// Stage of an upload that can fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadStage {
    /// TCP connect, SSH handshake, authentication or SFTP subsystem
    Connect,
    /// Creating/truncating the remote object
    OpenDestination,
    /// Opening the local file
    OpenSource,
    /// Streaming bytes to the remote object
    Copy,
}

impl std::fmt::Display for UploadStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UploadStage::Connect => write!(f, "connect"),
            UploadStage::OpenDestination => write!(f, "open destination"),
            UploadStage::OpenSource => write!(f, "open source"),
            UploadStage::Copy => write!(f, "copy"),
        }
    }
}

/// A file found in the watched directory during one pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateFile {
    /// File name without directory
    pub name: String,
    /// Extracted extension, if any
    pub extension: Option<String>,
    /// Full path inside the watched directory
    pub path: PathBuf,
}

impl CandidateFile {
    pub fn new(dir: &Path, name: impl Into<String>) -> Self {
        let name = name.into();
        let extension = crate::policy::extension_of(&name).map(String::from);
        let path = dir.join(&name);
        Self {
            name,
            extension,
            path,
        }
    }
}

/// One conversion of a source file into the intermediate output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscodeJob {
    pub source: PathBuf,
    pub target: PathBuf,
}

/// Name of an uploaded object: `<token>.<extension>`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RemoteObjectName {
    token: String,
    extension: String,
}

impl RemoteObjectName {
    /// Generate a fresh name; never reused across attempts
    pub fn generate(extension: &str) -> Self {
        Self {
            token: generate_token(),
            extension: extension.to_string(),
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }
}

impl std::fmt::Display for RemoteObjectName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.token, self.extension)
    }
}

/// Publicly reachable address of an uploaded object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PublicUrl(String);

impl PublicUrl {
    /// `base_url` is expected to carry exactly one trailing slash
    pub fn new(base_url: &str, name: &RemoteObjectName) -> Self {
        PublicUrl(format!("{}{}", base_url, name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PublicUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// What happened to a single file during a pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum FileOutcome {
    Rejected,
    Transcoded,
    TranscodeFailed,
    Uploaded {
        url: PublicUrl,
        bytes: u64,
        /// False when the local delete failed; the file is uploaded again later
        removed: bool,
    },
    UploadFailed {
        stage: Option<UploadStage>,
        message: String,
    },
}

/// Per-file entry of a pass report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileReport {
    pub name: String,
    #[serde(flatten)]
    pub outcome: FileOutcome,
}

/// Result of one scan-and-process pass over the watched directory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PassReport {
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub files: Vec<FileReport>,
}

impl PassReport {
    pub fn begin() -> Self {
        Self {
            started_at: Utc::now(),
            completed_at: None,
            files: Vec::new(),
        }
    }

    pub fn record(&mut self, name: &str, outcome: FileOutcome) {
        self.files.push(FileReport {
            name: name.to_string(),
            outcome,
        });
    }

    pub fn finish(mut self) -> Self {
        self.completed_at = Some(Utc::now());
        self
    }

    pub fn outcome_of(&self, name: &str) -> Option<&FileOutcome> {
        self.files.iter().find(|f| f.name == name).map(|f| &f.outcome)
    }

    pub fn uploaded(&self) -> usize {
        self.count(|o| matches!(o, FileOutcome::Uploaded { .. }))
    }

    pub fn transcoded(&self) -> usize {
        self.count(|o| matches!(o, FileOutcome::Transcoded))
    }

    pub fn rejected(&self) -> usize {
        self.count(|o| matches!(o, FileOutcome::Rejected))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| {
            matches!(
                o,
                FileOutcome::TranscodeFailed | FileOutcome::UploadFailed { .. }
            )
        })
    }

    fn count(&self, pred: impl Fn(&FileOutcome) -> bool) -> usize {
        self.files.iter().filter(|f| pred(&f.outcome)).count()
    }
}

/// Strip trailing slashes and append exactly one
pub fn with_trailing_slash(s: &str) -> String {
    format!("{}/", s.trim_end_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_trailing_slash() {
        assert_eq!(with_trailing_slash("https://i.example.io"), "https://i.example.io/");
        assert_eq!(with_trailing_slash("https://i.example.io///"), "https://i.example.io/");
        assert_eq!(with_trailing_slash("/srv/shots/"), "/srv/shots/");
        assert_eq!(with_trailing_slash(""), "/");
    }

    #[test]
    fn test_public_url() {
        let name = RemoteObjectName::generate("png");
        let url = PublicUrl::new("https://i.example.io/", &name);
        assert_eq!(
            url.as_str(),
            format!("https://i.example.io/{}.png", name.token())
        );
    }

    #[test]
    fn test_candidate_file() {
        let c = CandidateFile::new(Path::new("/shots"), "a.png");
        assert_eq!(c.extension.as_deref(), Some("png"));
        assert_eq!(c.path, PathBuf::from("/shots/a.png"));

        let c = CandidateFile::new(Path::new("/shots"), "README");
        assert_eq!(c.extension, None);
    }

    #[test]
    fn test_pass_report_counts() {
        let mut report = PassReport::begin();
        report.record("a.png", FileOutcome::Rejected);
        report.record("b.mov", FileOutcome::Transcoded);
        report.record(
            "c.png",
            FileOutcome::UploadFailed {
                stage: Some(UploadStage::Connect),
                message: "refused".into(),
            },
        );
        let report = report.finish();
        assert_eq!(report.rejected(), 1);
        assert_eq!(report.transcoded(), 1);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.uploaded(), 0);
        assert!(report.completed_at.is_some());
        assert_eq!(report.outcome_of("b.mov"), Some(&FileOutcome::Transcoded));
    }

    #[test]
    fn test_outcome_serialization() {
        let report = FileReport {
            name: "a.png".into(),
            outcome: FileOutcome::UploadFailed {
                stage: Some(UploadStage::OpenDestination),
                message: "denied".into(),
            },
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["name"], "a.png");
        assert_eq!(json["outcome"], "upload_failed");
        assert_eq!(json["stage"], "open_destination");
    }
}
