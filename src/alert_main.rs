// SPDX-License-Identifier: MPL-2.0

//! Standalone driver-alert monitor.
//!
//! Watches the warning file and prints alerts to the terminal until Ctrl-C.
//! An optional first argument overrides the configured warning file.

use adas_app_store::alert::{AlertMonitor, Debouncer, WarningFileWatcher};
use adas_app_store::config::Config;
use adas_app_store::logging;
use adas_app_store::presentation::TerminalAlert;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tokio::sync::mpsc;

fn main() -> ExitCode {
    let config = Config::load();
    logging::init(config.log_file.as_deref());

    let warning_file = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| config.warning_file.clone());
    log::info!("Monitoring {}", warning_file.display());

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

    runtime.block_on(async {
        let (tx, mut rx) = mpsc::unbounded_channel::<()>();
        let _watcher = match WarningFileWatcher::new(&warning_file, move || {
            let _ = tx.send(());
        }) {
            Ok(watcher) => watcher,
            Err(e) => {
                log::error!("{}", e);
                return ExitCode::FAILURE;
            }
        };

        let mut monitor = AlertMonitor::new(&warning_file, TerminalAlert::new(std::io::stdout()));
        let mut debouncer = Debouncer::new(Duration::from_millis(config.debounce_ms));
        monitor.poll();

        loop {
            tokio::select! {
                Some(()) = rx.recv() => debouncer.arm(),
                () = debouncer.fired() => {
                    monitor.poll();
                }
                _ = tokio::signal::ctrl_c() => break,
            }
        }

        log::info!("Alert monitor stopped");
        ExitCode::SUCCESS
    })
}
