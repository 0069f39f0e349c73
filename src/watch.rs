//! Filesystem change watcher for the log directory.
//!
//! All channels' logs live in one directory, watched as a unit with a
//! single `notify` watcher. Each create/modify/delete batch the OS reports
//! becomes one unit event on an internal channel; consuming those events
//! is the sole trigger for subscriber notification.
//!
//! Shutdown is cooperative: the stop token itself wakes [`DirWatcher::changed`],
//! so shutdown never blocks on a directory that happens to stay quiet, and
//! a batch that raced the stop signal is still delivered before the
//! sequence ends.

use std::path::Path;

use anyhow::{Context, Result};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Watches one log directory and yields coalesced change events.
///
/// The yielded sequence is infinite until the stop token fires, after
/// which [`DirWatcher::changed`] drains any pending event and then
/// returns `None`.
pub struct DirWatcher {
    rx: mpsc::Receiver<()>,
    stop: CancellationToken,
    /// Held to keep the OS watch registered.
    _watcher: RecommendedWatcher,
}

impl DirWatcher {
    /// Start watching `dir` (non-recursive).
    ///
    /// Fails immediately if the directory cannot be watched, so the
    /// service never starts half-initialized.
    pub fn new(dir: &Path, stop: CancellationToken) -> Result<Self> {
        // A full channel only drops a wakeup that is already pending,
        // which coalesces bursts into one event.
        let (tx, rx) = mpsc::channel(16);

        let mut watcher = RecommendedWatcher::new(
            move |res: Result<Event, notify::Error>| {
                if let Ok(event) = res {
                    if matches!(
                        event.kind,
                        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
                    ) {
                        let _ = tx.try_send(());
                    }
                }
            },
            notify::Config::default(),
        )
        .context("creating filesystem watcher")?;

        watcher
            .watch(dir, RecursiveMode::NonRecursive)
            .with_context(|| format!("watching log directory {}", dir.display()))?;

        debug!("watching {} for log changes", dir.display());

        Ok(Self {
            rx,
            stop,
            _watcher: watcher,
        })
    }

    /// Wait for the next change batch.
    ///
    /// Returns `None` once the stop token has fired and no batch observed
    /// before the stop remains undelivered.
    pub async fn changed(&mut self) -> Option<()> {
        tokio::select! {
            biased;

            batch = self.rx.recv() => batch,

            _ = self.stop.cancelled() => {
                // Deliver a batch that raced the stop signal before ending
                self.rx.try_recv().ok()
            }
        }
    }
}
