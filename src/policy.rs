//! Extension policy: which files get uploaded, which get transcoded first.
//!
//! Matching is case-sensitive and exact. `IMG.PNG` is rejected just like
//! `notes.txt`; rejected files are never touched by the pipeline.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::types::ExtensionClass;

/// Extensions uploaded as-is
pub const DIRECT_TRANSFER_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "webm", "mp4", "zip", "tar", "tar.gz", "tar.bz2",
];

/// Extensions converted before upload
pub const TRANSCODE_EXTENSIONS: &[&str] = &["mov"];

// Compound archive suffixes win over the last-dot rule so `x.tar.gz` yields `tar.gz`.
static EXTENSION_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\.(tar\.gz|tar\.bz2|\w+)$").expect("valid extension pattern"));

/// Extract the extension of a file name.
///
/// Returns `None` for names without a dot or with an empty/non-word suffix.
pub fn extension_of(file_name: &str) -> Option<&str> {
    EXTENSION_PATTERN
        .captures(file_name)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Classify an extension. Total: anything unknown is `Rejected`.
pub fn classify(extension: &str) -> ExtensionClass {
    if DIRECT_TRANSFER_EXTENSIONS.contains(&extension) {
        ExtensionClass::DirectTransfer
    } else if TRANSCODE_EXTENSIONS.contains(&extension) {
        ExtensionClass::RequiresTranscode
    } else {
        ExtensionClass::Rejected
    }
}

/// Classify a file by name
pub fn classify_name(file_name: &str) -> ExtensionClass {
    extension_of(file_name)
        .map(classify)
        .unwrap_or(ExtensionClass::Rejected)
}
