// SPDX-License-Identifier: MPL-2.0

//! Application Configuration
//!
//! Settings are stored as pretty JSON at
//! `~/.config/adas-app-store/config.json`. A missing file is created with the
//! defaults; an unreadable one yields the defaults, so the kiosk always starts.
//!
//! # Environment Overrides
//!
//! Applied on top of the file, in this order:
//! - `PODMAN_SOCKET_PATH` - control socket path (trusted, not probed)
//! - `ADAS_WARNING_FILE` - driver-monitoring JSON file
//! - `ADAS_CATALOG_FILE` - local feature catalog
//! - `ADAS_INSTALLED_FILE` - installed image list
//! - `ADAS_BACKEND_URL` - catalog backend (empty disables refresh)

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Directory name used under the XDG config/data roots.
pub const APP_DIR: &str = "adas-app-store";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to write config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode config: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// JSON file rewritten by the driver-monitoring process
    pub warning_file: PathBuf,
    /// Local feature catalog
    pub catalog_file: PathBuf,
    /// Persisted list of installed image names
    pub installed_file: PathBuf,
    /// Catalog backend; empty string disables the start-up refresh
    pub backend_url: String,
    /// Explicit Podman socket path, used without probing
    pub podman_socket: Option<PathBuf>,
    /// Delay between a warning-file notification and the poll it triggers
    pub debounce_ms: u64,
    /// Append logs here instead of stderr
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            warning_file: PathBuf::from("resources/results.json"),
            catalog_file: PathBuf::from("resources/dummy_features.json"),
            installed_file: default_installed_file(),
            backend_url: String::from("http://localhost:8000/"),
            podman_socket: None,
            debounce_ms: 50,
            log_file: None,
        }
    }
}

fn default_installed_file() -> PathBuf {
    let mut path = dirs::data_dir().unwrap_or_else(|| PathBuf::from("/tmp"));
    path.push(APP_DIR);
    path.push("installed_images.json");
    path
}

impl Config {
    /// Default location of the config file.
    pub fn path() -> PathBuf {
        let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("/tmp"));
        path.push(APP_DIR);
        path.push("config.json");
        path
    }

    /// Load from the default location and apply environment overrides.
    pub fn load() -> Self {
        let mut config = Self::load_or_create(&Self::path());
        config.apply_env(|key| std::env::var(key).ok());
        config
    }

    /// Like [`load_from`](Self::load_from), but writes the defaults to `path`
    /// when no file exists yet so there is something to edit.
    pub fn load_or_create(path: &Path) -> Self {
        if path.exists() {
            return Self::load_from(path);
        }
        let config = Self::default();
        match config.save_to(path) {
            Ok(()) => log::info!("Wrote default config to {}", path.display()),
            Err(e) => log::warn!("Could not write default config: {}", e),
        }
        config
    }

    /// Load from `path`, falling back to defaults if it is missing or corrupt.
    pub fn load_from(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                log::warn!("Ignoring malformed config {}: {}", path.display(), e);
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| ConfigError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(path, json).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply overrides from an environment lookup.
    ///
    /// Takes the lookup as a closure so tests do not have to mutate the
    /// process environment.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(socket) = lookup("PODMAN_SOCKET_PATH").filter(|s| !s.is_empty()) {
            self.podman_socket = Some(PathBuf::from(socket));
        }
        if let Some(path) = lookup("ADAS_WARNING_FILE").filter(|s| !s.is_empty()) {
            self.warning_file = PathBuf::from(path);
        }
        if let Some(path) = lookup("ADAS_CATALOG_FILE").filter(|s| !s.is_empty()) {
            self.catalog_file = PathBuf::from(path);
        }
        if let Some(path) = lookup("ADAS_INSTALLED_FILE").filter(|s| !s.is_empty()) {
            self.installed_file = PathBuf::from(path);
        }
        if let Some(url) = lookup("ADAS_BACKEND_URL") {
            self.backend_url = url;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("nope.json"));
        assert_eq!(config, Config::default());
        assert_eq!(config.debounce_ms, 50);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"debounce_ms": 120, "backend_url": ""}"#).unwrap();

        let config = Config::load_from(&path);
        assert_eq!(config.debounce_ms, 120);
        assert!(config.backend_url.is_empty());
        assert_eq!(config.warning_file, PathBuf::from("resources/results.json"));
    }

    #[test]
    fn test_corrupt_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();
        assert_eq!(Config::load_from(&path), Config::default());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let config = Config {
            podman_socket: Some(PathBuf::from("/tmp/podman.sock")),
            ..Config::default()
        };
        config.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path), config);
    }

    #[test]
    fn test_missing_file_is_created_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("adas-app-store").join("config.json");

        let config = Config::load_or_create(&path);
        assert_eq!(config, Config::default());
        assert!(path.exists());
        assert_eq!(Config::load_from(&path), Config::default());
    }

    #[test]
    fn test_existing_file_is_not_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"debounce_ms": 75}"#).unwrap();

        assert_eq!(Config::load_or_create(&path).debounce_ms, 75);
        assert_eq!(fs::read_to_string(&path).unwrap(), r#"{"debounce_ms": 75}"#);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("PODMAN_SOCKET_PATH", "/custom/podman.sock"),
            ("ADAS_WARNING_FILE", "/data/results.json"),
            ("ADAS_BACKEND_URL", ""),
            ("ADAS_CATALOG_FILE", ""),
        ]);
        let mut config = Config::default();
        config.apply_env(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.podman_socket, Some(PathBuf::from("/custom/podman.sock")));
        assert_eq!(config.warning_file, PathBuf::from("/data/results.json"));
        assert!(config.backend_url.is_empty());
        // Empty path overrides are ignored
        assert_eq!(config.catalog_file, PathBuf::from("resources/dummy_features.json"));
    }
}
