//! Directory scanner.
//!
//! Lists the watched directory at a point in time. Candidates are ephemeral:
//! every pass rescans, nothing is cached between passes.

use std::path::{Path, PathBuf};

use crate::error::{Result, SkrinsError};
use crate::types::CandidateFile;

/// Scanner bound to the watched directory
#[derive(Debug, Clone)]
pub struct Scanner {
    dir: PathBuf,
}

impl Scanner {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Fail unless the directory exists and can be listed
    pub fn ensure_readable(&self) -> Result<()> {
        std::fs::read_dir(&self.dir).map_err(|e| self.dir_error(e))?;
        Ok(())
    }

    /// List regular files sorted by name. Subdirectories are skipped.
    ///
    /// An unreadable directory is a fatal error; an entry that vanishes
    /// mid-listing is simply left out.
    pub fn scan(&self) -> Result<Vec<CandidateFile>> {
        let entries = std::fs::read_dir(&self.dir).map_err(|e| self.dir_error(e))?;

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| self.dir_error(e))?;
            let file_type = match entry.file_type() {
                Ok(t) => t,
                Err(e) => {
                    tracing::debug!("Skipping {:?}: {}", entry.file_name(), e);
                    continue;
                }
            };
            if file_type.is_dir() {
                continue;
            }
            match entry.file_name().into_string() {
                Ok(name) => names.push(name),
                Err(raw) => tracing::warn!("Skipping non UTF-8 file name {:?}", raw),
            }
        }
        names.sort();

        Ok(names
            .into_iter()
            .map(|name| CandidateFile::new(&self.dir, name))
            .collect())
    }

    fn dir_error(&self, source: std::io::Error) -> SkrinsError {
        SkrinsError::WatchDirectory {
            path: self.dir.clone(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_scan_sorted_files_only() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("c.mov"), b"m").unwrap();
        std::fs::write(dir.path().join("a.png"), b"p").unwrap();
        std::fs::write(dir.path().join("b.txt"), b"t").unwrap();
        std::fs::create_dir(dir.path().join("nested.png")).unwrap();

        let scanner = Scanner::new(dir.path());
        let names: Vec<String> = scanner.scan().unwrap().into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["a.png", "b.txt", "c.mov"]);
    }

    #[test]
    fn test_scan_fills_candidate() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("a.png"), b"p").unwrap();

        let candidates = Scanner::new(dir.path()).scan().unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].extension.as_deref(), Some("png"));
        assert_eq!(candidates[0].path, dir.path().join("a.png"));
    }

    #[test]
    fn test_missing_dir_is_fatal() {
        let dir = tempdir().unwrap();
        let scanner = Scanner::new(dir.path().join("gone"));
        let err = scanner.scan().unwrap_err();
        assert!(err.is_fatal());
        assert!(scanner.ensure_readable().is_err());
    }
}
