// SPDX-License-Identifier: MPL-2.0

//! Warning file change notification and debounce.
//!
//! The parent directory is watched rather than the file itself: producers that
//! write a temp file and rename it over the target replace the inode, which
//! would silently end a watch on the old file. Watching the directory also
//! covers a file that does not exist yet.

use notify::event::{AccessKind, AccessMode, EventKind};
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::ffi::OsString;
use std::future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::time::Duration;
use thiserror::Error;
use tokio::time::{Instant, Sleep};

#[derive(Debug, Error)]
pub enum WatchError {
    #[error("warning file path {0} has no file name")]
    NoFileName(PathBuf),

    #[error("cannot watch {path}: {source}")]
    Notify {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },
}

// ============================================================================
// File Watcher
// ============================================================================

/// Keeps the filesystem watch alive; dropping it stops notifications.
pub struct WarningFileWatcher {
    _watcher: RecommendedWatcher,
}

impl WarningFileWatcher {
    /// Watch `path` and call `on_change` for every relevant event.
    ///
    /// `on_change` runs on the notify backend thread and should only hand the
    /// event over to the event loop.
    pub fn new<F>(path: &Path, on_change: F) -> Result<Self, WatchError>
    where
        F: Fn() + Send + 'static,
    {
        let file_name: OsString = path
            .file_name()
            .ok_or_else(|| WatchError::NoFileName(path.to_path_buf()))?
            .to_os_string();
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let mut watcher = notify::recommended_watcher(move |res: Result<Event, notify::Error>| {
            match res {
                Ok(event) => {
                    let ours = event
                        .paths
                        .iter()
                        .any(|p| p.file_name() == Some(file_name.as_os_str()));
                    if ours && is_relevant(&event.kind) {
                        log::trace!("Warning file event: {:?}", event.kind);
                        on_change();
                    }
                }
                Err(e) => log::warn!("Warning file watch error: {:?}", e),
            }
        })
        .map_err(|source| WatchError::Notify {
            path: dir.clone(),
            source,
        })?;

        watcher
            .watch(&dir, RecursiveMode::NonRecursive)
            .map_err(|source| WatchError::Notify {
                path: dir.clone(),
                source,
            })?;

        log::info!("Watching {} for warning changes", path.display());
        Ok(Self { _watcher: watcher })
    }
}

/// Events that may mean new content. Our own reads are filtered out so a poll
/// never triggers another poll.
fn is_relevant(kind: &EventKind) -> bool {
    match kind {
        EventKind::Access(AccessKind::Close(AccessMode::Write)) => true,
        EventKind::Access(_) => false,
        _ => true,
    }
}

// ============================================================================
// Debounce
// ============================================================================

/// Single-shot delay that restarts on every [`arm`](Debouncer::arm).
///
/// A burst of notifications closer together than the delay produces exactly
/// one firing, `delay` after the last of them.
pub struct Debouncer {
    delay: Duration,
    sleep: Pin<Box<Sleep>>,
    armed: bool,
}

impl Debouncer {
    /// Must be called inside a tokio runtime.
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            sleep: Box::pin(tokio::time::sleep(delay)),
            armed: false,
        }
    }

    pub fn arm(&mut self) {
        self.sleep.as_mut().reset(Instant::now() + self.delay);
        self.armed = true;
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Resolves when the armed delay runs out; pending forever while disarmed.
    ///
    /// Cancel safe: dropping the future keeps the deadline.
    pub async fn fired(&mut self) {
        if !self.armed {
            future::pending::<()>().await;
        }
        (&mut self.sleep).await;
        self.armed = false;
    }
}
