// SPDX-License-Identifier: MPL-2.0

//! Error types for the install workflow.

use std::path::PathBuf;
use thiserror::Error;

/// Failures talking to the Podman control socket.
#[derive(Debug, Error)]
pub enum PodmanError {
    #[error("cannot connect to {path}: {source}")]
    Connect {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP transport error: {0}")]
    Http(#[from] hyper::Error),

    #[error("invalid request: {0}")]
    Request(#[from] hyper::http::Error),

    #[error("Podman returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("{0}")]
    Pull(String),

    #[error("unexpected response: {0}")]
    Json(#[from] serde_json::Error),
}

/// Category of a failed install, as shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallErrorCategory {
    RuntimeUnavailable,
    ConnectionFailed,
    PullFailed,
    ContainerFailed,
    Unexpected,
}

/// Terminal failure of an install request.
#[derive(Debug, Error)]
pub enum InstallError {
    #[error("Podman socket not available (tried: {})", format_paths(.tried))]
    RuntimeUnavailable { tried: Vec<PathBuf> },

    #[error("Connection failed: {0}")]
    ConnectionFailed(#[source] PodmanError),

    #[error("Image pull failed: {0}")]
    PullFailed(#[source] PodmanError),

    #[error("Container creation failed: {0}")]
    ContainerFailed(#[source] PodmanError),

    /// The worker stopped without producing an outcome.
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

impl InstallError {
    pub fn category(&self) -> InstallErrorCategory {
        match self {
            InstallError::RuntimeUnavailable { .. } => InstallErrorCategory::RuntimeUnavailable,
            InstallError::ConnectionFailed(_) => InstallErrorCategory::ConnectionFailed,
            InstallError::PullFailed(_) => InstallErrorCategory::PullFailed,
            InstallError::ContainerFailed(_) => InstallErrorCategory::ContainerFailed,
            InstallError::Unexpected(_) => InstallErrorCategory::Unexpected,
        }
    }
}

fn format_paths(paths: &[PathBuf]) -> String {
    if paths.is_empty() {
        return String::from("none");
    }
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runtime_unavailable_lists_paths() {
        let err = InstallError::RuntimeUnavailable {
            tried: vec![
                PathBuf::from("/run/user/1000/podman/podman.sock"),
                PathBuf::from("/run/podman/podman.sock"),
            ],
        };
        assert_eq!(err.category(), InstallErrorCategory::RuntimeUnavailable);
        assert_eq!(
            err.to_string(),
            "Podman socket not available (tried: /run/user/1000/podman/podman.sock, /run/podman/podman.sock)"
        );
    }

    #[test]
    fn test_messages_carry_cause() {
        let err = InstallError::PullFailed(PodmanError::Pull("manifest unknown".into()));
        assert_eq!(err.to_string(), "Image pull failed: manifest unknown");
        assert_eq!(err.category(), InstallErrorCategory::PullFailed);
    }
}
