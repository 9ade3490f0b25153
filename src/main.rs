// SPDX-License-Identifier: MPL-2.0

//! ADAS App Store - Kiosk Entry Point
//!
//! Start-up order matters: the catalog refresh uses a blocking HTTP client and
//! runs before the tokio runtime exists. Everything after that happens on one
//! current-thread runtime, except install workers which get their own threads.

use adas_app_store::alert::AlertMonitor;
use adas_app_store::app::{self, Dashboard, RunOptions};
use adas_app_store::catalog;
use adas_app_store::config::Config;
use adas_app_store::install::SocketProbe;
use adas_app_store::logging;
use adas_app_store::presentation::{TerminalAlert, TerminalStore};
use adas_app_store::store::InstalledImages;
use std::process::ExitCode;
use std::time::Duration;

fn main() -> ExitCode {
    let config = Config::load();
    logging::init(config.log_file.as_deref());

    log::info!("Starting ADAS App Store");
    log::debug!("Configuration: {:?}", config);

    let features = match catalog::refresh_and_load(&config.backend_url, &config.catalog_file) {
        Ok(features) => features,
        Err(e) => {
            log::warn!("No feature catalog available: {}", e);
            Vec::new()
        }
    };
    log::info!("Catalog has {} feature(s)", features.len());

    let installed = InstalledImages::load(&config.installed_file);
    log::info!(
        "{} image(s) already installed ({})",
        installed.len(),
        installed.path().display()
    );
    log::debug!("Installed images: {:?}", installed.iter().collect::<Vec<_>>());

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            log::error!("Failed to start event loop: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let monitor = AlertMonitor::new(&config.warning_file, TerminalAlert::new(std::io::stdout()));
    let dashboard = Dashboard::new(
        features,
        installed.into_shared(),
        monitor,
        TerminalStore::new(std::io::stdout()),
    );
    let options = RunOptions {
        debounce: Duration::from_millis(config.debounce_ms),
        probe: SocketProbe::new(config.podman_socket.clone()),
    };

    runtime.block_on(async {
        let commands = app::spawn_stdin_reader();
        app::run(dashboard, options, commands).await;
    });

    log::info!("ADAS App Store stopped");
    ExitCode::SUCCESS
}
