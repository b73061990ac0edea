//! Side-effect publisher: clipboard + desktop notification.
//!
//! Best-effort. Failures are logged and swallowed; they never change what
//! happens to the uploaded file.

use crate::config::PublishConfig;
use crate::types::PublicUrl;

/// Announces a freshly uploaded URL to the user
pub trait Publisher: Send + Sync {
    fn publish(&self, url: &PublicUrl);
}

/// Only logs the URL
#[derive(Debug, Default)]
pub struct LogPublisher;

impl Publisher for LogPublisher {
    fn publish(&self, url: &PublicUrl) {
        tracing::info!("Uploaded: {}", url);
    }
}

/// Build the publisher for this configuration
pub fn create_publisher(config: &PublishConfig) -> Box<dyn Publisher> {
    #[cfg(feature = "desktop")]
    {
        Box::new(DesktopPublisher::new(config.clone()))
    }
    #[cfg(not(feature = "desktop"))]
    {
        if config.clipboard || config.notification {
            tracing::warn!("Built without the `desktop` feature; URLs are only logged");
        }
        Box::new(LogPublisher)
    }
}

/// System clipboard and notification daemon
///
/// Requires the `desktop` feature.
#[cfg(feature = "desktop")]
pub struct DesktopPublisher {
    config: PublishConfig,
    // Kept alive: on X11/Wayland the owning process serves the selection
    clipboard: parking_lot::Mutex<Option<arboard::Clipboard>>,
}

#[cfg(feature = "desktop")]
impl DesktopPublisher {
    pub fn new(config: PublishConfig) -> Self {
        Self {
            config,
            clipboard: parking_lot::Mutex::new(None),
        }
    }

    fn copy_to_clipboard(&self, text: &str) {
        let mut guard = self.clipboard.lock();
        if guard.is_none() {
            match arboard::Clipboard::new() {
                Ok(clipboard) => *guard = Some(clipboard),
                Err(e) => {
                    tracing::warn!("Clipboard unavailable: {}", e);
                    return;
                }
            }
        }
        if let Some(clipboard) = guard.as_mut() {
            if let Err(e) = clipboard.set_text(text.to_string()) {
                tracing::warn!("Failed to copy URL to clipboard: {}", e);
                // Reconnect on the next publish
                *guard = None;
            }
        }
    }

    /// Hand the notification to its own thread; a stalled daemon must not
    /// hold up the pass.
    fn show_notification(&self, text: &str) {
        let mut notification = notify_rust::Notification::new();
        notification
            .appname(&self.config.app_name)
            .summary(&self.config.title)
            .body(text);
        in_background("skrins-notify", move || {
            if let Err(e) = notification.show() {
                tracing::warn!("Failed to show notification: {}", e);
            }
        });
    }
}

/// Run a side effect on a detached thread
#[cfg_attr(not(feature = "desktop"), allow(dead_code))]
fn in_background<F>(name: &str, job: F)
where
    F: FnOnce() + Send + 'static,
{
    if let Err(e) = std::thread::Builder::new().name(name.to_string()).spawn(job) {
        tracing::warn!("Failed to start {} thread: {}", name, e);
    }
}

#[cfg(feature = "desktop")]
impl Publisher for DesktopPublisher {
    fn publish(&self, url: &PublicUrl) {
        tracing::info!("Uploaded: {}", url);
        if self.config.clipboard {
            self.copy_to_clipboard(url.as_str());
        }
        if self.config.notification {
            self.show_notification(url.as_str());
        }
    }
}
