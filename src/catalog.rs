// SPDX-License-Identifier: MPL-2.0

//! # Feature Catalog
//!
//! The list of installable features shown in the store. It lives in a local
//! JSON file and can be refreshed from the backend at start-up.
//!
//! ## Accepted Shapes
//!
//! ```text
//! catalog file:  {"name", "icon", "description", "location"}
//! saved catalog: {"name", "icon", "short_desc", "long_desc", "location"}
//! backend API:   {"name", "image", "description", "location"}
//! ```
//!
//! A `description` is split at its first full stop: the first sentence becomes
//! the card text, the whole description the details text.

use crate::install::derive_image_name;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("cannot access catalog {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed catalog: {0}")]
    Json(#[from] serde_json::Error),

    #[error("backend request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// One installable feature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Feature {
    pub name: String,
    /// Card text
    pub short_desc: String,
    /// Details text
    pub long_desc: String,
    /// Icon reference (file name or URL)
    pub icon: String,
    /// Image reference the install derives the image name from
    pub location: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FeatureRecord {
    name: String,
    #[serde(alias = "image")]
    icon: String,
    description: Option<String>,
    short_desc: Option<String>,
    long_desc: Option<String>,
    location: Option<String>,
}

impl From<FeatureRecord> for Feature {
    fn from(record: FeatureRecord) -> Self {
        let (short_desc, long_desc) = match record.description {
            Some(description) => {
                let description = description.trim().to_string();
                let short = match description.split_once('.') {
                    Some((first, _)) => format!("{}.", first.trim()),
                    None => description.clone(),
                };
                (short, description)
            }
            None => {
                let short = record.short_desc.unwrap_or_default().trim().to_string();
                let long = record
                    .long_desc
                    .map(|l| l.trim().to_string())
                    .filter(|l| !l.is_empty())
                    .unwrap_or_else(|| short.clone());
                (short, long)
            }
        };

        Self {
            name: record.name,
            short_desc,
            long_desc,
            icon: record.icon,
            location: record.location.unwrap_or_default(),
        }
    }
}

impl Feature {
    /// Image name derived from `location`; empty if there is none.
    pub fn image_name(&self) -> String {
        derive_image_name(&self.location)
    }
}

/// Parse any of the accepted catalog shapes.
pub fn parse_catalog(content: &str) -> Result<Vec<Feature>, CatalogError> {
    let records: Vec<FeatureRecord> = serde_json::from_str(content)?;
    Ok(records.into_iter().map(Feature::from).collect())
}

pub fn load_catalog(path: &Path) -> Result<Vec<Feature>, CatalogError> {
    let content = fs::read_to_string(path).map_err(|source| CatalogError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_catalog(&content)
}

pub fn save_catalog(path: &Path, features: &[Feature]) -> Result<(), CatalogError> {
    let json = serde_json::to_string_pretty(features)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| CatalogError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    fs::write(path, json).map_err(|source| CatalogError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Fetch the catalog from the backend (blocking).
///
/// Must not be called from inside a tokio runtime.
pub fn fetch_catalog(url: &str) -> Result<Vec<Feature>, CatalogError> {
    log::debug!("Fetching catalog from {}", url);

    let client = reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()?;
    let body = client.get(url).send()?.error_for_status()?.text()?;

    parse_catalog(&body)
}

/// Refresh the local catalog from the backend, then load it.
///
/// Backend failures are logged and the cached file is used instead.
pub fn refresh_and_load(backend_url: &str, path: &Path) -> Result<Vec<Feature>, CatalogError> {
    if !backend_url.is_empty() {
        match fetch_catalog(backend_url) {
            Ok(features) => {
                log::info!("Fetched {} feature(s) from {}", features.len(), backend_url);
                if let Err(e) = save_catalog(path, &features) {
                    log::warn!("Could not update cached catalog: {}", e);
                }
                return Ok(features);
            }
            Err(e) => log::info!("Backend unavailable, using cached catalog: {}", e),
        }
    }
    load_catalog(path)
}
