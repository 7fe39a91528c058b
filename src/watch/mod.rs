//! Project change detection.
//!
//! A [`Listener`] snapshots the entry file's directory and compares
//! fingerprints on every [`Listener::poll`]. In notify mode, filesystem
//! events only mark the listener dirty; the rescan still happens on the
//! caller's next tick, so both modes share one change contract.

mod snapshot;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};

use crate::utils::path::normalize_path;

use snapshot::Snapshot;

/// Flags the listener dirty when the filesystem reports a change.
struct NotifyTrigger {
    dirty: Arc<AtomicBool>,
    // Dropping the watcher stops event delivery
    _watcher: RecommendedWatcher,
}

impl NotifyTrigger {
    fn new(root: &Path) -> notify::Result<Self> {
        let dirty = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&dirty);
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            match res {
                Ok(event) if !matches!(event.kind, EventKind::Access(_)) => {
                    flag.store(true, Ordering::Release);
                }
                Ok(_) => {}
                Err(e) => crate::log!("watch"; "notify error: {}", e),
            }
        })?;
        watcher.watch(root, RecursiveMode::Recursive)?;
        Ok(Self {
            dirty,
            _watcher: watcher,
        })
    }

    fn take(&self) -> bool {
        self.dirty.swap(false, Ordering::AcqRel)
    }
}

/// Watches the directory that contains an entry file.
pub struct Listener {
    root: PathBuf,
    fingerprint: String,
    trigger: Option<NotifyTrigger>,
}

impl Listener {
    /// Polling listener rooted at `entry`'s parent directory.
    pub fn new(entry: &Path) -> Self {
        let entry = normalize_path(entry);
        let root = entry.parent().map(Path::to_path_buf).unwrap_or(entry);
        let fingerprint = Snapshot::take(&root).fingerprint();
        Self {
            root,
            fingerprint,
            trigger: None,
        }
    }

    /// Listener that only rescans after a filesystem event.
    pub fn with_notify(entry: &Path) -> notify::Result<Self> {
        let mut listener = Self::new(entry);
        listener.trigger = Some(NotifyTrigger::new(&listener.root)?);
        Ok(listener)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Rescan and report whether the fingerprint moved since the last call.
    ///
    /// Returns `true` once per transition; the new fingerprint is stored so
    /// an unchanged tree reports `false` afterwards.
    pub fn poll(&mut self) -> bool {
        if let Some(trigger) = &self.trigger
            && !trigger.take()
        {
            return false;
        }

        let current = Snapshot::take(&self.root).fingerprint();
        if current == self.fingerprint {
            return false;
        }
        crate::debug!("watch"; "fingerprint {} -> {}", &self.fingerprint[..8], &current[..8]);
        self.fingerprint = current;
        true
    }
}
