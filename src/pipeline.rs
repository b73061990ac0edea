//! Scan → classify → transcode → transfer → publish → delete.
//!
//! One pass lists the watched directory and walks the candidates strictly in
//! order, one at a time. A failure only ends that file's turn: the file stays
//! where it is and gets another chance on the next pass. The only error that
//! escapes a pass is an unreadable watched directory.
//!
//! Transcoded output is not uploaded in the pass that produced it. It shows
//! up as a regular candidate on a later scan.

use std::path::Path;

use crate::config::RelayConfig;
use crate::error::Result;
use crate::policy::classify;
use crate::publish::{create_publisher, Publisher};
use crate::scanner::Scanner;
use crate::transcode::{FfmpegTranscoder, Transcoder};
use crate::transfer::{upload, SftpClient, TransferClient};
use crate::types::{
    CandidateFile, ExtensionClass, FileOutcome, PassReport, PublicUrl, RemoteObjectName,
    TranscodeJob,
};

/// The relay pipeline with its collaborators
pub struct Pipeline {
    scanner: Scanner,
    base_url: String,
    transcoder: Box<dyn Transcoder>,
    transfer: Box<dyn TransferClient>,
    publisher: Box<dyn Publisher>,
}

impl Pipeline {
    /// Assemble a pipeline from explicit collaborators
    pub fn new(
        config: &RelayConfig,
        transcoder: Box<dyn Transcoder>,
        transfer: Box<dyn TransferClient>,
        publisher: Box<dyn Publisher>,
    ) -> Self {
        Self {
            scanner: Scanner::new(&config.watch_dir),
            base_url: config.base_url.clone(),
            transcoder,
            transfer,
            publisher,
        }
    }

    /// Pipeline backed by ffmpeg, SFTP and the desktop publisher
    pub fn from_config(config: &RelayConfig) -> Self {
        Self::new(
            config,
            Box::new(FfmpegTranscoder::new(&config.transcode)),
            Box::new(SftpClient::new(&config.remote)),
            create_publisher(&config.publish),
        )
    }

    pub fn watch_dir(&self) -> &Path {
        self.scanner.dir()
    }

    /// Fail unless the watched directory can be listed
    pub fn ensure_ready(&self) -> Result<()> {
        self.scanner.ensure_readable()
    }

    /// Run one full pass over the watched directory
    pub fn run_pass(&self) -> Result<PassReport> {
        let candidates = self.scanner.scan()?;
        let mut report = PassReport::begin();

        for candidate in &candidates {
            let outcome = self.process(candidate);
            report.record(&candidate.name, outcome);
        }

        let report = report.finish();
        tracing::info!(
            scanned = candidates.len(),
            uploaded = report.uploaded(),
            transcoded = report.transcoded(),
            rejected = report.rejected(),
            failed = report.failed(),
            "Pass complete"
        );
        Ok(report)
    }

    fn process(&self, candidate: &CandidateFile) -> FileOutcome {
        let Some(extension) = candidate.extension.as_deref() else {
            tracing::debug!(file = %candidate.name, "No extension, skipping");
            return FileOutcome::Rejected;
        };

        match classify(extension) {
            ExtensionClass::Rejected => {
                tracing::debug!(file = %candidate.name, "Extension not allowed, skipping");
                FileOutcome::Rejected
            }
            ExtensionClass::RequiresTranscode => self.transcode(candidate),
            ExtensionClass::DirectTransfer => self.transfer(candidate, extension),
        }
    }

    fn transcode(&self, candidate: &CandidateFile) -> FileOutcome {
        let job = TranscodeJob {
            source: candidate.path.clone(),
            target: self.transcoder.target_in(self.scanner.dir()),
        };

        if !self.transcoder.transcode(&job) {
            tracing::warn!(file = %candidate.name, "Transcode failed, keeping source");
            return FileOutcome::TranscodeFailed;
        }

        if let Err(e) = std::fs::remove_file(&job.source) {
            tracing::error!(
                file = %candidate.name,
                "Transcoded but failed to remove source: {}",
                e
            );
        }
        FileOutcome::Transcoded
    }

    fn transfer(&self, candidate: &CandidateFile, extension: &str) -> FileOutcome {
        let name = RemoteObjectName::generate(extension);

        let bytes = match upload(self.transfer.as_ref(), &candidate.path, &name) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(file = %candidate.name, "Upload failed: {}", e);
                return FileOutcome::UploadFailed {
                    stage: e.stage(),
                    message: e.to_string(),
                };
            }
        };

        let url = PublicUrl::new(&self.base_url, &name);
        self.publisher.publish(&url);

        let removed = match std::fs::remove_file(&candidate.path) {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(
                    file = %candidate.name,
                    "Uploaded but failed to remove local file: {}",
                    e
                );
                false
            }
        };

        FileOutcome::Uploaded {
            url,
            bytes,
            removed,
        }
    }
}
