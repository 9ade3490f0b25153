// SPDX-License-Identifier: MPL-2.0

//! Logger setup shared by all binaries.

use std::fs::OpenOptions;
use std::path::Path;

/// Initialize `env_logger` with an `info` default filter.
///
/// With `log_file` set, output is appended to that file so the kiosk and the
/// standalone monitor can share one log. If the file cannot be opened the
/// logger writes to stderr instead.
pub fn init(log_file: Option<&Path>) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));

    if let Some(path) = log_file {
        match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => {
                builder.target(env_logger::Target::Pipe(Box::new(file)));
            }
            Err(e) => eprintln!("Cannot open log file {}: {}", path.display(), e),
        }
    }

    // A second init (e.g. from tests) is harmless
    let _ = builder.try_init();
}
