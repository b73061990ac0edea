//! Filesystem watcher driving the pipeline.
//!
//! The notify callback forwards triggering events into a bounded channel and
//! never blocks: when the channel is full the event is dropped. That loses
//! nothing but time, since every pass rescans the whole directory and the
//! next event picks up whatever was missed.
//!
//! A single task consumes the channel and runs each pass to completion on
//! the blocking pool before looking at the next event. Passes never overlap.

use std::path::PathBuf;
use std::sync::Arc;

use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::WatchConfig;
use crate::error::{Result, SkrinsError};
use crate::pipeline::Pipeline;

/// Whether an event should start a pass.
///
/// Creates, content writes and renames into the directory count; removals,
/// metadata changes and reads do not.
pub fn is_trigger(event: &Event, watch_dirs: &[PathBuf]) -> bool {
    let kind_matches = matches!(
        event.kind,
        EventKind::Create(_)
            | EventKind::Modify(ModifyKind::Data(_))
            | EventKind::Modify(ModifyKind::Any)
            | EventKind::Modify(ModifyKind::Name(RenameMode::To))
            | EventKind::Modify(ModifyKind::Name(RenameMode::Both))
    );
    kind_matches
        && event.paths.iter().any(|p| {
            p.parent()
                .map(|parent| watch_dirs.iter().any(|d| d == parent))
                .unwrap_or(false)
        })
}

/// Watches the directory and feeds passes to the pipeline
pub struct RelayWatcher {
    pipeline: Arc<Pipeline>,
    config: WatchConfig,
}

impl RelayWatcher {
    pub fn new(pipeline: Pipeline, config: WatchConfig) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            config,
        }
    }

    /// Check the directory, register the watch and spawn the worker.
    ///
    /// Must be called from within a tokio runtime. An unreadable directory
    /// or a failing watcher backend is returned before anything is spawned.
    pub fn start(self) -> Result<WatchHandle> {
        self.pipeline.ensure_ready()?;

        let dir = self.pipeline.watch_dir().to_path_buf();
        let mut watch_dirs = vec![dir.clone()];
        // Some backends report canonical paths
        if let Ok(canonical) = std::fs::canonicalize(&dir) {
            if canonical != dir {
                watch_dirs.push(canonical);
            }
        }

        let (sender, receiver) = mpsc::channel::<Event>(self.config.channel_capacity);

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            match res {
                Ok(event) => {
                    if !is_trigger(&event, &watch_dirs) {
                        return;
                    }
                    if let Err(e) = sender.try_send(event) {
                        match e {
                            mpsc::error::TrySendError::Full(event) => {
                                tracing::debug!("Notification buffer full, dropped {:?}", event.paths)
                            }
                            mpsc::error::TrySendError::Closed(_) => {
                                tracing::debug!("Worker gone, ignoring notification")
                            }
                        }
                    }
                }
                Err(e) => tracing::error!("Watch error: {}", e),
            }
        })?;
        watcher.watch(&dir, RecursiveMode::NonRecursive)?;
        tracing::info!("Watching {}", dir.display());

        let pipeline = Arc::clone(&self.pipeline);
        let initial_scan = self.config.initial_scan;
        let task = tokio::spawn(run_worker(pipeline, receiver, initial_scan));

        Ok(WatchHandle {
            watcher: Some(watcher),
            task,
        })
    }
}

/// A running watcher
pub struct WatchHandle {
    watcher: Option<RecommendedWatcher>,
    task: JoinHandle<Result<()>>,
}

impl WatchHandle {
    /// Wait for the worker. Only returns early on a fatal pass error.
    pub async fn join(self) -> Result<()> {
        let WatchHandle { watcher, task } = self;
        let result = task
            .await
            .map_err(|e| SkrinsError::Internal(format!("Watch worker panicked: {}", e)))?;
        drop(watcher);
        result
    }

    /// Stop delivering notifications; the worker finishes its current pass
    /// and exits.
    pub async fn stop(mut self) -> Result<()> {
        self.watcher.take();
        self.join().await
    }
}

async fn run_worker(
    pipeline: Arc<Pipeline>,
    mut receiver: mpsc::Receiver<Event>,
    initial_scan: bool,
) -> Result<()> {
    if initial_scan {
        run_pass(&pipeline).await?;
    }

    while let Some(event) = receiver.recv().await {
        tracing::debug!(kind = ?event.kind, paths = ?event.paths, "Change detected");
        run_pass(&pipeline).await?;
    }

    tracing::info!("Watch worker stopped");
    Ok(())
}

async fn run_pass(pipeline: &Arc<Pipeline>) -> Result<()> {
    let pipeline = Arc::clone(pipeline);
    let result = tokio::task::spawn_blocking(move || pipeline.run_pass())
        .await
        .map_err(|e| SkrinsError::Internal(format!("Pass panicked: {}", e)))?;

    match result {
        Ok(_) => Ok(()),
        Err(e) => {
            tracing::error!("Fatal: {}", e);
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{AccessKind, AccessMode, CreateKind, DataChange, MetadataKind, RemoveKind};

    fn dirs() -> Vec<PathBuf> {
        vec![PathBuf::from("/shots")]
    }

    fn event(kind: EventKind, path: &str) -> Event {
        Event::new(kind).add_path(PathBuf::from(path))
    }

    #[test]
    fn test_create_and_write_trigger() {
        assert!(is_trigger(
            &event(EventKind::Create(CreateKind::File), "/shots/a.png"),
            &dirs()
        ));
        assert!(is_trigger(
            &event(
                EventKind::Modify(ModifyKind::Data(DataChange::Content)),
                "/shots/a.png"
            ),
            &dirs()
        ));
        assert!(is_trigger(
            &event(EventKind::Modify(ModifyKind::Any), "/shots/a.png"),
            &dirs()
        ));
        assert!(is_trigger(
            &event(
                EventKind::Modify(ModifyKind::Name(RenameMode::To)),
                "/shots/a.png"
            ),
            &dirs()
        ));
    }

    #[test]
    fn test_other_kinds_ignored() {
        for kind in [
            EventKind::Remove(RemoveKind::File),
            EventKind::Modify(ModifyKind::Metadata(MetadataKind::Permissions)),
            EventKind::Modify(ModifyKind::Name(RenameMode::From)),
            EventKind::Access(AccessKind::Close(AccessMode::Write)),
        ] {
            let e = event(kind, "/shots/a.png");
            assert!(!is_trigger(&e, &dirs()), "{:?}", e.kind);
        }
    }

    #[test]
    fn test_outside_dir_ignored() {
        assert!(!is_trigger(
            &event(EventKind::Create(CreateKind::File), "/elsewhere/a.png"),
            &dirs()
        ));
        assert!(!is_trigger(
            &event(EventKind::Create(CreateKind::File), "/shots/sub/a.png"),
            &dirs()
        ));
        assert!(!is_trigger(&Event::new(EventKind::Create(CreateKind::File)), &dirs()));
    }
}
