//! Recursive directory snapshots and their fingerprints.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use jwalk::WalkDir;
use serde::{Deserialize, Serialize};

/// OS housekeeping files that never count as project changes.
pub const IGNORED_NAMES: &[&str] = &[".DS_Store", "Thumbs.db", "desktop.ini"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Dir,
}

/// One file or directory in a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// Nanoseconds since the Unix epoch, 0 when unavailable.
    pub last_modified: u128,
    pub kind: EntryKind,
    pub path: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub children: Option<Snapshot>,
}

/// A directory tree keyed by entry name, ordered for stable serialization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot(BTreeMap<String, Entry>);

impl Snapshot {
    /// Walk `root` recursively. Unreadable entries are skipped.
    pub fn take(root: &Path) -> Self {
        let mut snapshot = Self::default();

        let walk = WalkDir::new(root).sort(true).skip_hidden(false);
        for entry in walk.into_iter().filter_map(Result::ok) {
            if entry.depth == 0 {
                continue;
            }
            let path = entry.path();
            let Ok(relative) = path.strip_prefix(root) else { continue };
            let names: Vec<String> = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect();
            if names.iter().any(|name| is_ignored(name)) {
                continue;
            }

            let kind = if entry.file_type().is_dir() {
                EntryKind::Dir
            } else {
                EntryKind::File
            };
            // A directory's own mtime moves for ignored names too; its
            // children already record every add and remove
            let last_modified = match kind {
                EntryKind::Dir => 0,
                EntryKind::File => entry
                    .metadata()
                    .ok()
                    .and_then(|m| m.modified().ok())
                    .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                    .map_or(0, |d| d.as_nanos()),
            };

            snapshot.insert(
                &names,
                Entry {
                    last_modified,
                    kind,
                    path,
                    children: (kind == EntryKind::Dir).then(Self::default),
                },
            );
        }

        snapshot
    }

    /// Place `entry` under the directory named by all but the last of `names`.
    ///
    /// The walk is sorted depth-first, so parents are always inserted first.
    fn insert(&mut self, names: &[String], entry: Entry) {
        let Some((name, parents)) = names.split_last() else {
            return;
        };
        let mut level = self;
        for parent in parents {
            match level.0.get_mut(parent).and_then(|e| e.children.as_mut()) {
                Some(children) => level = children,
                None => return,
            }
        }
        level.0.insert(name.clone(), entry);
    }

    /// blake3 hex digest of the JSON serialization.
    pub fn fingerprint(&self) -> String {
        let json = serde_json::to_vec(self).unwrap_or_default();
        hex::encode(blake3::hash(&json).as_bytes())
    }
}

fn is_ignored(name: &str) -> bool {
    IGNORED_NAMES.contains(&name)
}
