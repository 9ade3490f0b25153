// SPDX-License-Identifier: MPL-2.0

//! Alert state machine.
//!
//! ```text
//!            active warning                 different top warning
//!   Idle ──────────────────▶ Alerting(k) ─────────────────────────▶ Alerting(k')
//!    ▲                            │
//!    └────────────────────────────┘
//!      all three keys explicitly false
//! ```
//!
//! A reading with nothing active but without three explicit `false` values
//! (torn write, missing keys, unreadable file) leaves the state as it is. The
//! producer does not rewrite the file atomically, so such a reading must never
//! be taken as "all clear".

use super::warning::{AlertMessage, WarningKind, WarningState};
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};

/// Receives alert dialog lifecycle calls.
pub trait AlertPresenter {
    /// Open the modal alert.
    fn show(&mut self, kind: WarningKind, message: AlertMessage);
    /// Replace the text of the open alert without closing it.
    fn update(&mut self, kind: WarningKind, message: AlertMessage);
    /// Close the alert.
    fn dismiss(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertState {
    Idle,
    Alerting(WarningKind),
}

/// The alert currently on screen.
#[derive(Debug, Clone)]
pub struct AlertSession {
    pub kind: WarningKind,
    pub message: AlertMessage,
    pub opened_at: DateTime<Local>,
}

/// What a poll did to the state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Unchanged,
    Shown(WarningKind),
    Updated { from: WarningKind, to: WarningKind },
    Dismissed,
}

pub struct AlertMonitor<P> {
    path: PathBuf,
    presenter: P,
    session: Option<AlertSession>,
}

impl<P: AlertPresenter> AlertMonitor<P> {
    pub fn new(path: impl Into<PathBuf>, presenter: P) -> Self {
        Self {
            path: path.into(),
            presenter,
            session: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn state(&self) -> AlertState {
        match &self.session {
            Some(session) => AlertState::Alerting(session.kind),
            None => AlertState::Idle,
        }
    }

    pub fn session(&self) -> Option<&AlertSession> {
        self.session.as_ref()
    }

    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    pub fn into_presenter(self) -> P {
        self.presenter
    }

    /// Read the warning file and advance the state machine.
    ///
    /// Read and parse failures are logged and leave the state untouched.
    pub fn poll(&mut self) -> Transition {
        match WarningState::read(&self.path) {
            Ok(state) => self.apply(&state),
            Err(e) if e.is_transient() => {
                log::debug!("Skipping warning poll of {}: {}", self.path.display(), e);
                Transition::Unchanged
            }
            Err(e) => {
                log::warn!("Skipping warning poll of {}: {}", self.path.display(), e);
                Transition::Unchanged
            }
        }
    }

    /// Advance the state machine from one reading.
    pub fn apply(&mut self, state: &WarningState) -> Transition {
        if let Some(kind) = state.highest_priority() {
            return self.raise(kind);
        }

        if state.all_explicitly_false() {
            if let Some(session) = self.session.take() {
                log::info!("Warning cleared ({}), dismissing alert", session.kind);
                self.presenter.dismiss();
                return Transition::Dismissed;
            }
        }

        Transition::Unchanged
    }

    fn raise(&mut self, kind: WarningKind) -> Transition {
        let message = kind.message();
        let Some(session) = self.session.as_mut() else {
            log::info!("Warning raised: {}", kind);
            self.session = Some(AlertSession {
                kind,
                message,
                opened_at: Local::now(),
            });
            self.presenter.show(kind, message);
            return Transition::Shown(kind);
        };

        if session.kind == kind {
            return Transition::Unchanged;
        }

        let from = session.kind;
        log::info!("Warning changed: {} -> {}", from, kind);
        session.kind = kind;
        session.message = message;
        self.presenter.update(kind, message);
        Transition::Updated { from, to: kind }
    }
}
