//! Transcode adapter around an external converter (ffmpeg).
//!
//! Only a boolean outcome crosses this boundary. The converter's output is
//! logged, never parsed. The adapter never deletes the source; that is the
//! caller's job on success.
//!
//! The output file name is fixed per configuration, so two jobs running at
//! once would write the same file. Jobs must run one after another.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::config::TranscodeConfig;
use crate::types::TranscodeJob;

/// Converts one file into another
pub trait Transcoder: Send + Sync {
    /// Run the job to completion; true when the converter exited successfully
    fn transcode(&self, job: &TranscodeJob) -> bool;

    /// Output path for jobs started in `dir`
    fn target_in(&self, dir: &Path) -> PathBuf;
}

/// ffmpeg invoked as `<program> -i <source> <target>`
pub struct FfmpegTranscoder {
    program: PathBuf,
    output_name: String,
}

impl FfmpegTranscoder {
    pub fn new(config: &TranscodeConfig) -> Self {
        Self {
            program: config.program.clone(),
            output_name: config.output_name.clone(),
        }
    }

    fn command(&self, job: &TranscodeJob) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg("-i")
            .arg(&job.source)
            .arg(&job.target)
            // No terminal to answer an overwrite prompt; ffmpeg aborts instead
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        cmd
    }
}

impl Transcoder for FfmpegTranscoder {
    fn transcode(&self, job: &TranscodeJob) -> bool {
        tracing::info!(
            source = %job.source.display(),
            output = %job.target.display(),
            "Transcoding"
        );

        let output = match self.command(job).output() {
            Ok(output) => output,
            Err(e) => {
                tracing::error!("Failed to run {}: {}", self.program.display(), e);
                return false;
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        tracing::debug!(target: "skrins::ffmpeg", "stdout: {}", stdout.trim_end());
        tracing::debug!(target: "skrins::ffmpeg", "stderr: {}", stderr.trim_end());

        if output.status.success() {
            true
        } else {
            tracing::error!(
                source = %job.source.display(),
                "Transcoder exited with {}: {}",
                output.status,
                last_line(&stderr)
            );
            false
        }
    }

    fn target_in(&self, dir: &Path) -> PathBuf {
        dir.join(&self.output_name)
    }
}

fn last_line(s: &str) -> &str {
    s.trim_end().lines().last().unwrap_or("")
}
