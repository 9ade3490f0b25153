// SPDX-License-Identifier: MPL-2.0

//! Catalog sync: fetch the feature list from the backend and rewrite the
//! local catalog file. Exits non-zero if either step fails.

use adas_app_store::catalog;
use adas_app_store::config::Config;
use adas_app_store::logging;
use std::process::ExitCode;

fn main() -> ExitCode {
    let config = Config::load();
    logging::init(config.log_file.as_deref());

    let url = std::env::args().nth(1).unwrap_or_else(|| config.backend_url.clone());
    if url.is_empty() {
        log::error!("No backend URL configured");
        return ExitCode::FAILURE;
    }

    let features = match catalog::fetch_catalog(&url) {
        Ok(features) => features,
        Err(e) => {
            log::error!("Failed to fetch catalog from {}: {}", url, e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = catalog::save_catalog(&config.catalog_file, &features) {
        log::error!("{}", e);
        return ExitCode::FAILURE;
    }

    log::info!(
        "Wrote {} feature(s) to {}",
        features.len(),
        config.catalog_file.display()
    );
    ExitCode::SUCCESS
}
