// SPDX-License-Identifier: MPL-2.0

//! ADAS App Store
//!
//! Core of an in-vehicle kiosk with two jobs:
//!
//! 1. **Driver alerts**: watch the JSON file written by the driver-monitoring
//!    process and keep a single modal alert in step with it ([`alert`]).
//! 2. **Feature installs**: pull a feature's container image and keep one
//!    container running per image through the Podman control socket
//!    ([`install`]), remembering what was installed ([`store`]).
//!
//! The binaries in this package are thin wrappers:
//! - `adas-app-store`: the kiosk ([`app`])
//! - `adas-alert-monitor`: alert monitoring only
//! - `adas-catalog-sync`: refresh the local catalog from the backend

pub mod alert;
pub mod app;
pub mod catalog;
pub mod config;
pub mod install;
pub mod logging;
pub mod presentation;
pub mod store;
