//! Catalog directory watching for hot reload.
//!
//! ## Learning: Bridging Sync Callbacks to Async Channels
//!
//! `notify` calls back on its own thread. `blocking_send` moves each
//! change onto a `tokio::sync::mpsc` channel so the reload loop can be an
//! ordinary `while let Some(..) = rx.recv().await`.

use std::path::{Path, PathBuf};

use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::{CoreError, CoreResult};

/// A change inside a watched catalog directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogChange {
    Created(PathBuf),
    Modified(PathBuf),
    Deleted(PathBuf),
}

impl CatalogChange {
    /// The file that changed.
    pub fn path(&self) -> &Path {
        match self {
            CatalogChange::Created(p) | CatalogChange::Modified(p) | CatalogChange::Deleted(p) => p.as_path(),
        }
    }
}

/// Watches catalog directories and reports changes.
///
/// Dropping the watcher stops the notifications.
pub struct CatalogWatcher {
    #[allow(dead_code)]
    watcher: RecommendedWatcher,
    directories: Vec<PathBuf>,
}

impl CatalogWatcher {
    /// Starts watching every existing directory in `dirs`.
    ///
    /// Missing directories are skipped with a debug log; a user catalog
    /// directory usually does not exist until the user creates one.
    pub fn watch(dirs: &[PathBuf]) -> CoreResult<(Self, mpsc::Receiver<CatalogChange>)> {
        let (tx, rx) = mpsc::channel(100);

        let mut watcher = notify::recommended_watcher(move |res: Result<Event, notify::Error>| {
            match res {
                Ok(event) => {
                    for path in event.paths {
                        let change = match event.kind {
                            notify::EventKind::Create(_) => CatalogChange::Created(path),
                            notify::EventKind::Modify(_) => CatalogChange::Modified(path),
                            notify::EventKind::Remove(_) => CatalogChange::Deleted(path),
                            _ => continue,
                        };
                        let _ = tx.blocking_send(change);
                    }
                }
                Err(e) => tracing::warn!("Catalog watch error: {}", e),
            }
        })?;

        let mut directories = Vec::new();
        for dir in dirs {
            if !dir.is_dir() {
                tracing::debug!("Not watching missing catalog directory {}", dir.display());
                continue;
            }
            watcher.watch(dir, RecursiveMode::NonRecursive)?;
            directories.push(dir.clone());
        }

        if directories.is_empty() && !dirs.is_empty() {
            return Err(CoreError::DirectoryNotFound(
                dirs.iter()
                    .map(|d| d.display().to_string())
                    .collect::<Vec<_>>()
                    .join(", "),
            ));
        }

        Ok((
            Self {
                watcher,
                directories,
            },
            rx,
        ))
    }

    /// Directories actually being watched.
    pub fn directories(&self) -> &[PathBuf] {
        &self.directories
    }
}
