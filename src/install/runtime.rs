// SPDX-License-Identifier: MPL-2.0

//! Container runtime operations used by the install workflow.

use super::error::PodmanError;
use serde::Serialize;

/// Placeholder entrypoint that keeps a feature container alive.
pub const KEEPALIVE_COMMAND: [&str; 2] = ["sleep", "infinity"];

/// State of an existing container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerState {
    pub running: bool,
    /// Runtime-reported status, e.g. `running`, `exited`, `created`
    pub status: String,
}

/// Body of a container create call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContainerSpec {
    pub name: String,
    pub image: String,
    pub command: Vec<String>,
    /// Keep the container after it exits so it can be inspected or restarted
    pub remove: bool,
}

impl ContainerSpec {
    pub fn keepalive(name: &str, image: &str) -> Self {
        Self {
            name: name.to_string(),
            image: image.to_string(),
            command: KEEPALIVE_COMMAND.iter().map(|s| s.to_string()).collect(),
            remove: false,
        }
    }
}

/// The subset of the Podman API the installer needs.
pub trait ContainerRuntime {
    fn ping(&self) -> Result<(), PodmanError>;

    fn image_exists(&self, name: &str) -> Result<bool, PodmanError>;

    /// Pull `name`, passing human-readable progress lines to `progress`.
    fn pull_image(&self, name: &str, progress: &mut dyn FnMut(&str)) -> Result<(), PodmanError>;

    /// `None` if no container has this name.
    fn container_state(&self, name: &str) -> Result<Option<ContainerState>, PodmanError>;

    fn start_container(&self, name: &str) -> Result<(), PodmanError>;

    /// Create the container without starting it.
    fn create_container(&self, spec: &ContainerSpec) -> Result<(), PodmanError>;
}
