// SPDX-License-Identifier: MPL-2.0

//! Installed Image Persistence
//!
//! The set of image names that have a running container is the only source of
//! truth for the "Installed" badge in the catalog. It is stored as a JSON array
//! of strings and survives restarts.
//!
//! # File Location
//!
//! Configured through `installed_file`; by default
//! `~/.local/share/adas-app-store/installed_images.json`.
//!
//! # Thread Safety
//!
//! One `InstalledImages` is loaded at start-up and shared as
//! [`SharedInstalledImages`]. Install workers call [`record_install`], which
//! mutates and saves while holding the lock, so concurrent installs of
//! different images never overwrite each other's results on disk.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("cannot write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot encode installed images: {0}")]
    Json(#[from] serde_json::Error),
}

/// Persisted set of installed image names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageSet(BTreeSet<String>);

/// Installed image set bound to its backing file.
#[derive(Debug, Clone)]
pub struct InstalledImages {
    path: PathBuf,
    images: ImageSet,
}

/// Handle shared between the event loop and install workers.
pub type SharedInstalledImages = Arc<Mutex<InstalledImages>>;

impl InstalledImages {
    /// Load the set from `path`.
    ///
    /// A missing or corrupt file yields an empty set.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let images = match fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                log::warn!("Installed image list {} is corrupt, starting empty: {}", path.display(), e);
                ImageSet::default()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => ImageSet::default(),
            Err(e) => {
                log::warn!("Cannot read installed image list {}: {}", path.display(), e);
                ImageSet::default()
            }
        };
        log::debug!("Loaded {} installed image(s) from {}", images.0.len(), path.display());
        Self { path, images }
    }

    pub fn into_shared(self) -> SharedInstalledImages {
        Arc::new(Mutex::new(self))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn contains(&self, name: &str) -> bool {
        self.images.0.contains(name)
    }

    /// Insert `name`; returns false if it was already present.
    pub fn add(&mut self, name: &str) -> bool {
        self.images.0.insert(name.to_string())
    }

    pub fn remove(&mut self, name: &str) -> bool {
        self.images.0.remove(name)
    }

    pub fn len(&self) -> usize {
        self.images.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.images.0.iter().map(String::as_str)
    }

    /// Overwrite the backing file with the current contents.
    ///
    /// Writes to a sibling temp file and renames it over the target, so a
    /// reader never sees a half-written list.
    pub fn save(&self) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let json = serde_json::to_string_pretty(&self.images)?;
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        fs::write(&tmp, json).map_err(|source| StoreError::Io {
            path: tmp.clone(),
            source,
        })?;
        fs::rename(&tmp, &self.path).map_err(|source| {
            let _ = fs::remove_file(&tmp);
            StoreError::Io {
                path: self.path.clone(),
                source,
            }
        })
    }
}

/// Add `name` and persist, as one critical section.
///
/// The in-memory set keeps the name even if saving fails; the caller decides
/// how to report the error.
pub fn record_install(shared: &SharedInstalledImages, name: &str) -> Result<(), StoreError> {
    let mut images = shared.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    if images.add(name) {
        log::debug!("Recording {} as installed", name);
    }
    images.save()
}

/// Lock-and-check helper for display code.
pub fn is_installed(shared: &SharedInstalledImages, name: &str) -> bool {
    shared
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .contains(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let images = InstalledImages::load(dir.path().join("installed_images.json"));
        assert!(images.is_empty());
    }

    #[test]
    fn test_corrupt_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("installed_images.json");
        fs::write(&path, "[\"hello-world\", ").unwrap();
        assert!(InstalledImages::load(&path).is_empty());
    }

    #[test]
    fn test_add_save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join("installed_images.json");

        let mut images = InstalledImages::load(&path);
        assert!(images.add("hello-world"));
        images.save().unwrap();

        let mut reloaded = InstalledImages::load(&path);
        assert!(reloaded.contains("hello-world"));
        assert_eq!(reloaded.len(), 1);

        assert!(reloaded.add("lane-keep-assist"));
        reloaded.save().unwrap();

        let names: Vec<String> = InstalledImages::load(&path).iter().map(String::from).collect();
        assert_eq!(names, vec!["hello-world", "lane-keep-assist"]);
    }

    #[test]
    fn test_add_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let mut images = InstalledImages::load(dir.path().join("i.json"));
        assert!(images.add("hello-world"));
        assert!(!images.add("hello-world"));
        assert_eq!(images.len(), 1);
    }

    #[test]
    fn test_save_overwrites_after_remove() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("installed_images.json");

        let mut images = InstalledImages::load(&path);
        images.add("a");
        images.add("b");
        images.save().unwrap();

        images.remove("a");
        images.save().unwrap();

        let reloaded = InstalledImages::load(&path);
        assert!(!reloaded.contains("a"));
        assert!(reloaded.contains("b"));
        let raw = fs::read_to_string(&path).unwrap();
        let parsed: Vec<String> = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed, vec!["b"]);
    }

    #[test]
    fn test_reads_legacy_list_with_duplicates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("installed_images.json");
        fs::write(&path, r#"["hello-world", "hello-world", "nginx"]"#).unwrap();
        assert_eq!(InstalledImages::load(&path).len(), 2);
    }

    #[test]
    fn test_save_failure_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        fs::write(&blocker, "").unwrap();

        let mut images = InstalledImages::load(blocker.join("installed_images.json"));
        images.add("hello-world");
        assert!(matches!(images.save(), Err(StoreError::Io { .. })));
    }

    #[test]
    fn test_concurrent_record_install_keeps_every_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("installed_images.json");
        let shared = InstalledImages::load(&path).into_shared();

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let shared = Arc::clone(&shared);
                std::thread::spawn(move || record_install(&shared, &format!("image-{}", i)).unwrap())
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let reloaded = InstalledImages::load(&path);
        assert_eq!(reloaded.len(), 8);
        assert!(is_installed(&shared, "image-7"));
    }
}
