// SPDX-License-Identifier: MPL-2.0

//! # Terminal Presentation
//!
//! The kiosk renders to a text terminal. Both presenters write to any
//! `io::Write`, so tests can capture output in a `Vec<u8>`.
//!
//! Write errors are ignored: a closed terminal must not stop alert
//! monitoring or an install in progress.

use crate::alert::{AlertMessage, AlertPresenter, WarningKind};
use crate::catalog::Feature;
use std::io::Write;

/// Catalog row as shown in the store list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry<'a> {
    pub index: usize,
    pub feature: &'a Feature,
    pub installed: bool,
}

/// Store view: catalog, details, install progress.
pub trait StorePresenter {
    fn catalog(&mut self, entries: &[CatalogEntry<'_>]);
    fn details(&mut self, entry: &CatalogEntry<'_>);
    /// One progress line from an install worker.
    fn install_status(&mut self, image_name: &str, line: &str);
    /// Terminal install result; called exactly once per install.
    fn install_finished(&mut self, image_name: &str, success: bool, message: &str);
    fn notice(&mut self, text: &str);
}

// ============================================================================
// Alert Dialog
// ============================================================================

const BANNER_WIDTH: usize = 52;

pub struct TerminalAlert<W> {
    out: W,
}

impl<W: Write> TerminalAlert<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn banner(&mut self, title: &str, message: AlertMessage) {
        let rule = "=".repeat(BANNER_WIDTH);
        let _ = writeln!(self.out, "\n{}", rule);
        let _ = writeln!(self.out, "{:^width$}", title, width = BANNER_WIDTH);
        let _ = writeln!(self.out, "{:^width$}", message.headline, width = BANNER_WIDTH);
        let _ = writeln!(self.out, "{:^width$}", message.advice, width = BANNER_WIDTH);
        let _ = writeln!(self.out, "{}", rule);
        let _ = self.out.flush();
    }
}

impl<W: Write> AlertPresenter for TerminalAlert<W> {
    fn show(&mut self, _kind: WarningKind, message: AlertMessage) {
        self.banner("!! CAUTION !!", message);
    }

    fn update(&mut self, _kind: WarningKind, message: AlertMessage) {
        self.banner("!! CAUTION (updated) !!", message);
    }

    fn dismiss(&mut self) {
        let _ = writeln!(self.out, "[alert cleared]");
        let _ = self.out.flush();
    }
}

// ============================================================================
// Store View
// ============================================================================

pub struct TerminalStore<W> {
    out: W,
}

impl<W: Write> TerminalStore<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> StorePresenter for TerminalStore<W> {
    fn catalog(&mut self, entries: &[CatalogEntry<'_>]) {
        let _ = writeln!(self.out, "ADAS App Store");
        if entries.is_empty() {
            let _ = writeln!(self.out, "  (catalog is empty)");
        }
        for entry in entries {
            let badge = if entry.installed { "[Installed]" } else { "[Install]" };
            let _ = writeln!(
                self.out,
                "  {:>2}. {:<28} {:<12} {}",
                entry.index, entry.feature.name, badge, entry.feature.short_desc
            );
        }
        let _ = self.out.flush();
    }

    fn details(&mut self, entry: &CatalogEntry<'_>) {
        let feature = entry.feature;
        let _ = writeln!(self.out, "{}", feature.name);
        let _ = writeln!(self.out, "  {}", feature.long_desc);
        let _ = writeln!(self.out, "  image: {}", feature.image_name());
        let _ = writeln!(
            self.out,
            "  status: {}",
            if entry.installed { "installed" } else { "not installed" }
        );
        let _ = self.out.flush();
    }

    fn install_status(&mut self, image_name: &str, line: &str) {
        let _ = writeln!(self.out, "  [{}] {}", image_name, line);
        let _ = self.out.flush();
    }

    fn install_finished(&mut self, image_name: &str, success: bool, message: &str) {
        let verdict = if success { "installed" } else { "install failed" };
        let _ = writeln!(self.out, "{}: {} - {}", image_name, verdict, message);
        let _ = self.out.flush();
    }

    fn notice(&mut self, text: &str) {
        let _ = writeln!(self.out, "{}", text);
        let _ = self.out.flush();
    }
}
