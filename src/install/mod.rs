// SPDX-License-Identifier: MPL-2.0

//! Feature installation through the Podman control socket.

pub mod error;
pub mod image;
pub mod podman;
pub mod runtime;
pub mod socket;
pub mod worker;

pub use error::{InstallError, InstallErrorCategory, PodmanError};
pub use image::{InstallRequest, derive_container_name, derive_image_name};
pub use podman::PodmanClient;
pub use runtime::{ContainerRuntime, ContainerSpec, ContainerState};
pub use socket::{SocketEndpoint, SocketProbe};
pub use worker::{InstallEvent, InstallOutcome, InstallUpdate, run_install, spawn_install, spawn_install_with};
