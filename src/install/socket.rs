// SPDX-License-Identifier: MPL-2.0

//! Podman control socket discovery.
//!
//! Probe order:
//! 1. Explicit override (`PODMAN_SOCKET_PATH` or config) - trusted as is,
//!    since inside a container the socket may be bind-mounted lazily
//! 2. `/run/user/<uid>/podman/podman.sock` - rootless user session
//! 3. `/run/podman/podman.sock`, `/var/run/podman/podman.sock` - system-wide

use std::fmt;
use std::path::{Path, PathBuf};

/// A resolved control socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SocketEndpoint {
    path: PathBuf,
}

impl SocketEndpoint {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl fmt::Display for SocketEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unix://{}", self.path.display())
    }
}

#[derive(Debug, Clone)]
pub struct SocketProbe {
    override_path: Option<PathBuf>,
    candidates: Vec<PathBuf>,
}

impl SocketProbe {
    /// Probe the well-known locations for the current user.
    pub fn new(override_path: Option<PathBuf>) -> Self {
        Self::with_candidates(override_path, default_candidates())
    }

    pub fn with_candidates(override_path: Option<PathBuf>, candidates: Vec<PathBuf>) -> Self {
        Self {
            override_path,
            candidates,
        }
    }

    /// First usable endpoint, or every path that was tried.
    pub fn resolve(&self) -> Result<SocketEndpoint, Vec<PathBuf>> {
        if let Some(path) = &self.override_path {
            log::debug!("Using Podman socket override {}", path.display());
            return Ok(SocketEndpoint::new(path.clone()));
        }

        match self.candidates.iter().find(|path| path.exists()) {
            Some(path) => {
                log::debug!("Found Podman socket at {}", path.display());
                Ok(SocketEndpoint::new(path.clone()))
            }
            None => Err(self.candidates.clone()),
        }
    }
}

fn default_candidates() -> Vec<PathBuf> {
    // SAFETY: getuid has no preconditions and cannot fail
    let uid = unsafe { libc::getuid() };
    vec![
        PathBuf::from(format!("/run/user/{}/podman/podman.sock", uid)),
        PathBuf::from("/run/podman/podman.sock"),
        PathBuf::from("/var/run/podman/podman.sock"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_override_is_trusted() {
        let probe = SocketProbe::with_candidates(Some(PathBuf::from("/does/not/exist.sock")), vec![]);
        let endpoint = probe.resolve().unwrap();
        assert_eq!(endpoint.path(), Path::new("/does/not/exist.sock"));
        assert_eq!(endpoint.to_string(), "unix:///does/not/exist.sock");
    }

    #[test]
    fn test_first_existing_candidate_wins() {
        let dir = tempfile::tempdir().unwrap();
        let user = dir.path().join("user.sock");
        let system = dir.path().join("system.sock");
        std::fs::write(&system, "").unwrap();

        let probe = SocketProbe::with_candidates(None, vec![user.clone(), system.clone()]);
        assert_eq!(probe.resolve().unwrap().path(), system.as_path());

        std::fs::write(&user, "").unwrap();
        assert_eq!(probe.resolve().unwrap().path(), user.as_path());
    }

    #[test]
    fn test_nothing_found_reports_tried_paths() {
        let dir = tempfile::tempdir().unwrap();
        let candidates = vec![dir.path().join("a.sock"), dir.path().join("b.sock")];
        let probe = SocketProbe::with_candidates(None, candidates.clone());
        assert_eq!(probe.resolve().unwrap_err(), candidates);
    }

    #[test]
    fn test_default_candidates_start_with_user_socket() {
        let candidates = default_candidates();
        assert_eq!(candidates.len(), 3);
        let first = candidates[0].to_string_lossy();
        assert!(first.starts_with("/run/user/"));
        assert!(first.ends_with("/podman/podman.sock"));
    }
}
