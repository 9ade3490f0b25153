// SPDX-License-Identifier: MPL-2.0

//! Driver-monitoring alerts
//!
//! An external process rewrites a JSON file with `drowsy`, `distracted` and
//! `yawning` flags. [`WarningFileWatcher`] turns filesystem events into
//! notifications, [`Debouncer`] coalesces bursts into one read, and
//! [`AlertMonitor`] keeps exactly one modal alert for the highest-priority
//! active warning.

pub mod monitor;
pub mod warning;
pub mod watcher;

pub use monitor::{AlertMonitor, AlertPresenter, AlertSession, AlertState, Transition};
pub use warning::{AlertMessage, ReadError, WarningKind, WarningState};
pub use watcher::{Debouncer, WarningFileWatcher, WatchError};
