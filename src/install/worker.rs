// SPDX-License-Identifier: MPL-2.0

//! # Install Workflow
//!
//! Turns an [`InstallRequest`] into a running container:
//!
//! 1. Resolve the control socket ([`SocketProbe`])
//! 2. Connect and ping
//! 3. Pull the image unless it is already present
//! 4. Ensure the `adas-*` container exists and is running
//! 5. Record the image in the installed set (a save failure is only a warning)
//!
//! Every failure ends the request with an [`InstallError`]; nothing is retried
//! here, the user re-runs the install instead.
//!
//! ## Threading Model
//!
//! [`spawn_install`] runs the workflow on its own OS thread and reports back
//! over a channel drained by the event loop. The installed set is the only
//! state shared with other workers, and it is only touched through
//! [`record_install`].

use super::error::{InstallError, PodmanError};
use super::image::InstallRequest;
use super::podman::PodmanClient;
use super::runtime::{ContainerRuntime, ContainerSpec};
use super::socket::{SocketEndpoint, SocketProbe};
use crate::store::{SharedInstalledImages, record_install};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::thread::JoinHandle;
use tokio::sync::mpsc::UnboundedSender;

/// Terminal result of one install request.
#[derive(Debug)]
pub enum InstallOutcome {
    Installed {
        image_name: String,
        /// Every status line emitted along the way
        status_trail: Vec<String>,
    },
    Failed(InstallError),
}

impl InstallOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, InstallOutcome::Installed { .. })
    }

    /// Short text for the terminal callback.
    pub fn message(&self) -> String {
        match self {
            InstallOutcome::Installed { .. } => String::from("Container ran successfully."),
            InstallOutcome::Failed(e) => e.to_string(),
        }
    }
}

/// Progress reported by a worker.
#[derive(Debug)]
pub enum InstallEvent {
    Status(String),
    Finished(InstallOutcome),
}

/// An [`InstallEvent`] tagged with the image it belongs to.
#[derive(Debug)]
pub struct InstallUpdate {
    pub image_name: String,
    pub event: InstallEvent,
}

// ============================================================================
// Workflow
// ============================================================================

struct StatusSink<'a> {
    trail: Vec<String>,
    emit: &'a mut dyn FnMut(&str),
}

impl StatusSink<'_> {
    fn say(&mut self, line: impl Into<String>) {
        let line = line.into();
        log::info!("{}", line);
        (self.emit)(&line);
        self.trail.push(line);
    }
}

/// Run one install to completion on the calling thread.
///
/// `connect` builds the runtime client once a socket has been found, which
/// lets tests substitute an in-memory runtime. Status lines go to `emit` in
/// order; the returned outcome is the terminal event.
pub fn run_install<R, C>(
    request: &InstallRequest,
    probe: &SocketProbe,
    connect: C,
    installed: &SharedInstalledImages,
    emit: &mut dyn FnMut(&str),
) -> InstallOutcome
where
    R: ContainerRuntime,
    C: FnOnce(&SocketEndpoint) -> Result<R, PodmanError>,
{
    let mut sink = StatusSink {
        trail: Vec::new(),
        emit,
    };

    match install_steps(request, probe, connect, installed, &mut sink) {
        Ok(()) => InstallOutcome::Installed {
            image_name: request.image_name.clone(),
            status_trail: sink.trail,
        },
        Err(e) => {
            log::error!("Install of {} failed: {}", request.image_name, e);
            InstallOutcome::Failed(e)
        }
    }
}

fn install_steps<R, C>(
    request: &InstallRequest,
    probe: &SocketProbe,
    connect: C,
    installed: &SharedInstalledImages,
    sink: &mut StatusSink<'_>,
) -> Result<(), InstallError>
where
    R: ContainerRuntime,
    C: FnOnce(&SocketEndpoint) -> Result<R, PodmanError>,
{
    let image = request.image_name.as_str();
    let container = request.container_name.as_str();

    let endpoint = probe.resolve().map_err(|tried| {
        sink.say("No Podman socket found. Set PODMAN_SOCKET_PATH or ensure Podman is running.");
        InstallError::RuntimeUnavailable { tried }
    })?;

    sink.say("Connecting to Podman...");
    let runtime = connect(&endpoint)
        .and_then(|runtime| runtime.ping().map(|()| runtime))
        .map_err(|e| {
            sink.say(format!("Failed to connect to Podman: {}", e));
            InstallError::ConnectionFailed(e)
        })?;
    log::debug!("Connected to Podman at {}", endpoint);

    sink.say(format!("Checking if image {} is already available...", image));
    let present = runtime.image_exists(image).unwrap_or_else(|e| {
        log::warn!("Image lookup for {} failed, pulling instead: {}", image, e);
        false
    });
    if present {
        sink.say(format!("Image {} is already available.", image));
    } else {
        sink.say(format!("Pulling image: {}...", image));
        let pulled = runtime.pull_image(image, &mut |line| sink.say(line));
        pulled.map_err(|e| {
            sink.say(format!("Failed to pull image: {}", e));
            InstallError::PullFailed(e)
        })?;
        sink.say(format!("Successfully pulled image: {}", image));
    }

    sink.say(format!("Running container from {}...", image));
    ensure_running(&runtime, request, sink).map_err(|e| {
        sink.say(format!("Failed to run container '{}': {}", container, e));
        InstallError::ContainerFailed(e)
    })?;

    match record_install(installed, image) {
        Ok(()) => sink.say(format!("Saved {} to installed images.", image)),
        Err(e) => {
            log::warn!("Installed image list not saved: {}", e);
            sink.say(format!("Warning: Failed to save installed image info: {}", e));
        }
    }

    sink.say("Done!");
    Ok(())
}

/// Existing and running: nothing to do. Existing but stopped: start it.
/// Missing: create and start. Anything else is a failure.
fn ensure_running<R: ContainerRuntime>(
    runtime: &R,
    request: &InstallRequest,
    sink: &mut StatusSink<'_>,
) -> Result<(), PodmanError> {
    let name = request.container_name.as_str();
    match runtime.container_state(name)? {
        Some(state) if state.running => {
            sink.say(format!("Container '{}' is already running.", name));
        }
        Some(state) => {
            log::debug!("Container {} is {}, starting it", name, state.status);
            runtime.start_container(name)?;
            sink.say(format!("Started existing container '{}'.", name));
        }
        None => {
            runtime.create_container(&ContainerSpec::keepalive(name, &request.image_name))?;
            runtime.start_container(name)?;
            sink.say(format!("Created and started container '{}'.", name));
        }
    }
    Ok(())
}

// ============================================================================
// Background Worker
// ============================================================================

const WORKER_THREAD_NAME: &str = "install-worker";

/// Run the install on a new thread against the real Podman socket.
///
/// Sends any number of [`InstallEvent::Status`] updates followed by exactly one
/// [`InstallEvent::Finished`]. If the receiver is gone the results are dropped.
pub fn spawn_install(
    request: InstallRequest,
    probe: SocketProbe,
    installed: SharedInstalledImages,
    events: UnboundedSender<InstallUpdate>,
) -> std::io::Result<JoinHandle<()>> {
    spawn_install_with(request, probe, PodmanClient::connect, installed, events)
}

/// [`spawn_install`] with a custom runtime constructor.
///
/// A panic inside the workflow is reported as [`InstallError::Unexpected`],
/// so the event loop always receives the terminal event.
pub fn spawn_install_with<R, C>(
    request: InstallRequest,
    probe: SocketProbe,
    connect: C,
    installed: SharedInstalledImages,
    events: UnboundedSender<InstallUpdate>,
) -> std::io::Result<JoinHandle<()>>
where
    R: ContainerRuntime,
    C: FnOnce(&SocketEndpoint) -> Result<R, PodmanError> + Send + 'static,
{
    // Image names come from catalog data and may contain bytes a thread name
    // cannot hold
    std::thread::Builder::new()
        .name(String::from(WORKER_THREAD_NAME))
        .spawn(move || {
            let image_name = request.image_name.clone();
            let send = |event: InstallEvent| {
                let _ = events.send(InstallUpdate {
                    image_name: image_name.clone(),
                    event,
                });
            };

            let result = panic::catch_unwind(AssertUnwindSafe(|| {
                run_install(
                    &request,
                    &probe,
                    connect,
                    &installed,
                    &mut |line| send(InstallEvent::Status(line.to_string())),
                )
            }));
            let outcome = result.unwrap_or_else(|payload| {
                let reason = panic_message(payload.as_ref());
                log::error!("Install worker for {} panicked: {}", request.image_name, reason);
                InstallOutcome::Failed(InstallError::Unexpected(reason))
            });
            send(InstallEvent::Finished(outcome));
        })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        text.to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        String::from("worker panicked")
    }
}
