// SPDX-License-Identifier: MPL-2.0

//! # Podman Socket Client
//!
//! Speaks the libpod REST API as HTTP/1.1 over the Unix control socket.
//!
//! ## Endpoints
//!
//! ```text
//! GET  /libpod/_ping                       liveness
//! GET  /libpod/images/{name}/exists        204 present, 404 absent
//! POST /libpod/images/pull?reference=...   newline-delimited JSON progress
//! GET  /libpod/containers/{name}/json      inspect, 404 absent
//! POST /libpod/containers/{name}/start     204 started, 304 already running
//! POST /libpod/containers/create           201 created
//! ```
//!
//! ## Threading Model
//!
//! The client owns a current-thread tokio runtime and blocks on it, so it can
//! be used from a plain install worker thread. One connection is opened per
//! request. Do not call it from inside another tokio runtime.

use super::error::PodmanError;
use super::runtime::{ContainerRuntime, ContainerSpec, ContainerState};
use super::socket::SocketEndpoint;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::{Method, Request, Response, StatusCode, header};
use hyper_util::rt::TokioIo;
use serde::Deserialize;
use std::path::PathBuf;
use tokio::net::UnixStream;

/// Versioned libpod API root.
const API_PREFIX: &str = "/v4.0.0/libpod";

// ============================================================================
// API Response Structures
// ============================================================================

/// Error body returned by libpod on non-2xx responses.
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    cause: String,
}

#[derive(Debug, Deserialize)]
struct InspectResponse {
    #[serde(rename = "State")]
    state: InspectState,
}

#[derive(Debug, Deserialize)]
struct InspectState {
    #[serde(rename = "Running", default)]
    running: bool,
    #[serde(rename = "Status", default)]
    status: String,
}

/// One line of the pull progress stream.
#[derive(Debug, Deserialize)]
struct PullReport {
    #[serde(default)]
    stream: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum PullLine {
    Progress(String),
    Failed(String),
    Ignored,
}

fn parse_pull_line(line: &str) -> PullLine {
    let line = line.trim();
    if line.is_empty() {
        return PullLine::Ignored;
    }
    match serde_json::from_str::<PullReport>(line) {
        Ok(report) => {
            if let Some(error) = report.error.filter(|e| !e.trim().is_empty()) {
                return PullLine::Failed(error.trim().to_string());
            }
            if let Some(stream) = report.stream {
                let stream = stream.trim();
                if !stream.is_empty() {
                    return PullLine::Progress(stream.to_string());
                }
            }
            match report.id {
                Some(id) => PullLine::Progress(format!("Pulled image {}", id)),
                None => PullLine::Ignored,
            }
        }
        Err(e) => {
            log::debug!("Ignoring unparseable pull line {:?}: {}", line, e);
            PullLine::Ignored
        }
    }
}

fn api_error(status: StatusCode, body: &[u8]) -> PodmanError {
    let message = match serde_json::from_slice::<ApiErrorBody>(body) {
        Ok(parsed) if !parsed.message.is_empty() => parsed.message,
        Ok(parsed) if !parsed.cause.is_empty() => parsed.cause,
        _ => {
            let text = String::from_utf8_lossy(body).trim().to_string();
            if text.is_empty() {
                status.canonical_reason().unwrap_or("unknown error").to_string()
            } else {
                text
            }
        }
    };
    PodmanError::Api {
        status: status.as_u16(),
        message,
    }
}

// ============================================================================
// Client
// ============================================================================

pub struct PodmanClient {
    socket: PathBuf,
    runtime: tokio::runtime::Runtime,
}

impl PodmanClient {
    /// Prepare a client for `endpoint`. No I/O happens until the first call.
    pub fn connect(endpoint: &SocketEndpoint) -> Result<Self, PodmanError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        Ok(Self {
            socket: endpoint.path().to_path_buf(),
            runtime,
        })
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<Vec<u8>>,
    ) -> Result<Response<Incoming>, PodmanError> {
        let stream = UnixStream::connect(&self.socket)
            .await
            .map_err(|source| PodmanError::Connect {
                path: self.socket.clone(),
                source,
            })?;

        let (mut sender, connection) =
            hyper::client::conn::http1::handshake(TokioIo::new(stream)).await?;
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                log::debug!("Podman connection ended with error: {}", e);
            }
        });

        let mut builder = Request::builder()
            .method(method)
            .uri(format!("{}{}", API_PREFIX, path))
            .header(header::HOST, "d");
        if body.is_some() {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
        }
        let request = builder.body(Full::new(Bytes::from(body.unwrap_or_default())))?;

        log::trace!("Podman request {} {}", request.method(), request.uri());
        Ok(sender.send_request(request).await?)
    }

    /// Send a request and collect the whole response body.
    fn call(
        &self,
        method: Method,
        path: &str,
        body: Option<Vec<u8>>,
    ) -> Result<(StatusCode, Bytes), PodmanError> {
        self.runtime.block_on(async {
            let response = self.send(method, path, body).await?;
            let status = response.status();
            let body = response.into_body().collect().await?.to_bytes();
            Ok::<_, PodmanError>((status, body))
        })
    }

    async fn pull_stream(
        &self,
        name: &str,
        progress: &mut dyn FnMut(&str),
    ) -> Result<(), PodmanError> {
        let path = format!("/images/pull?reference={}", urlencoding::encode(name));
        let response = self.send(Method::POST, &path, None).await?;
        let status = response.status();
        let mut body = response.into_body();

        if !status.is_success() {
            let bytes = body.collect().await?.to_bytes();
            return Err(api_error(status, &bytes));
        }

        let mut pending: Vec<u8> = Vec::new();
        let mut failure: Option<String> = None;
        let mut handle = |line: &[u8], failure: &mut Option<String>| {
            match parse_pull_line(&String::from_utf8_lossy(line)) {
                PullLine::Progress(text) => progress(&text),
                PullLine::Failed(error) => *failure = Some(error),
                PullLine::Ignored => {}
            }
        };

        while let Some(frame) = body.frame().await {
            let Ok(data) = frame?.into_data() else {
                continue;
            };
            pending.extend_from_slice(&data);
            while let Some(pos) = pending.iter().position(|b| *b == b'\n') {
                let line: Vec<u8> = pending.drain(..=pos).collect();
                handle(&line, &mut failure);
            }
        }
        if !pending.is_empty() {
            handle(&pending, &mut failure);
        }

        match failure {
            Some(error) => Err(PodmanError::Pull(error)),
            None => Ok(()),
        }
    }
}

impl ContainerRuntime for PodmanClient {
    fn ping(&self) -> Result<(), PodmanError> {
        let (status, body) = self.call(Method::GET, "/_ping", None)?;
        if status.is_success() {
            Ok(())
        } else {
            Err(api_error(status, &body))
        }
    }

    fn image_exists(&self, name: &str) -> Result<bool, PodmanError> {
        let (status, body) = self.call(Method::GET, &format!("/images/{}/exists", name), None)?;
        match status {
            StatusCode::NOT_FOUND => Ok(false),
            s if s.is_success() => Ok(true),
            s => Err(api_error(s, &body)),
        }
    }

    fn pull_image(&self, name: &str, progress: &mut dyn FnMut(&str)) -> Result<(), PodmanError> {
        self.runtime.block_on(self.pull_stream(name, progress))
    }

    fn container_state(&self, name: &str) -> Result<Option<ContainerState>, PodmanError> {
        let (status, body) = self.call(Method::GET, &format!("/containers/{}/json", name), None)?;
        match status {
            StatusCode::NOT_FOUND => Ok(None),
            s if s.is_success() => {
                let inspect: InspectResponse = serde_json::from_slice(&body)?;
                Ok(Some(ContainerState {
                    running: inspect.state.running,
                    status: inspect.state.status,
                }))
            }
            s => Err(api_error(s, &body)),
        }
    }

    fn start_container(&self, name: &str) -> Result<(), PodmanError> {
        let (status, body) = self.call(Method::POST, &format!("/containers/{}/start", name), None)?;
        match status {
            StatusCode::NOT_MODIFIED => Ok(()),
            s if s.is_success() => Ok(()),
            s => Err(api_error(s, &body)),
        }
    }

    fn create_container(&self, spec: &ContainerSpec) -> Result<(), PodmanError> {
        let payload = serde_json::to_vec(spec)?;
        let (status, body) = self.call(Method::POST, "/containers/create", Some(payload))?;
        if status.is_success() {
            Ok(())
        } else {
            Err(api_error(status, &body))
        }
    }
}
