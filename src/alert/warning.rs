// SPDX-License-Identifier: MPL-2.0

//! Warning flags written by the driver-monitoring process.
//!
//! The producer rewrites a small JSON object such as
//!
//! ```text
//! {"drowsy": false, "distracted": true, "yawning": true}
//! ```
//!
//! Only the three known keys are read; anything else in the object is ignored.
//! A key counts as active only when its value is the JSON literal `true`.

use serde_json::Value;
use std::fs;
use std::path::Path;
use thiserror::Error;

// ============================================================================
// Warning Kinds
// ============================================================================

/// Driver condition reported by the monitoring process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WarningKind {
    Drowsy,
    Distracted,
    Yawning,
}

/// Text shown in the alert dialog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlertMessage {
    pub headline: &'static str,
    pub advice: &'static str,
}

impl WarningKind {
    /// All kinds, highest priority first.
    pub const PRIORITY: [WarningKind; 3] = [
        WarningKind::Drowsy,
        WarningKind::Distracted,
        WarningKind::Yawning,
    ];

    /// JSON key used by the producer.
    pub fn key(self) -> &'static str {
        match self {
            WarningKind::Drowsy => "drowsy",
            WarningKind::Distracted => "distracted",
            WarningKind::Yawning => "yawning",
        }
    }

    pub fn message(self) -> AlertMessage {
        match self {
            WarningKind::Drowsy => AlertMessage {
                headline: "Drowsiness Detected!",
                advice: "Please stay alert and take a break if needed.",
            },
            WarningKind::Distracted => AlertMessage {
                headline: "Distraction Detected!",
                advice: "Please focus on the road and avoid distractions.",
            },
            WarningKind::Yawning => AlertMessage {
                headline: "Yawning Detected!",
                advice: "Consider taking a break to rest.",
            },
        }
    }
}

impl std::fmt::Display for WarningKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

// ============================================================================
// Warning State
// ============================================================================

/// One reading of the warning file.
///
/// Each flag is `None` when the key is missing or not a boolean, which keeps
/// "absent" distinct from "explicitly false".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WarningState {
    drowsy: Option<bool>,
    distracted: Option<bool>,
    yawning: Option<bool>,
}

#[derive(Debug, Error)]
pub enum ReadError {
    #[error("cannot read warning file: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed warning file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("warning file is not a JSON object")]
    NotAnObject,
}

impl ReadError {
    /// True for the errors expected while the producer is mid-write.
    pub fn is_transient(&self) -> bool {
        match self {
            ReadError::Io(e) => e.kind() == std::io::ErrorKind::NotFound,
            ReadError::Parse(_) | ReadError::NotAnObject => true,
        }
    }
}

impl WarningState {
    pub fn from_json(content: &str) -> Result<Self, ReadError> {
        let value: Value = serde_json::from_str(content)?;
        let object = value.as_object().ok_or(ReadError::NotAnObject)?;
        let flag = |kind: WarningKind| object.get(kind.key()).and_then(Value::as_bool);

        Ok(Self {
            drowsy: flag(WarningKind::Drowsy),
            distracted: flag(WarningKind::Distracted),
            yawning: flag(WarningKind::Yawning),
        })
    }

    pub fn read(path: &Path) -> Result<Self, ReadError> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn with(mut self, kind: WarningKind, value: bool) -> Self {
        *self.slot(kind) = Some(value);
        self
    }

    fn slot(&mut self, kind: WarningKind) -> &mut Option<bool> {
        match kind {
            WarningKind::Drowsy => &mut self.drowsy,
            WarningKind::Distracted => &mut self.distracted,
            WarningKind::Yawning => &mut self.yawning,
        }
    }

    pub fn get(&self, kind: WarningKind) -> Option<bool> {
        match kind {
            WarningKind::Drowsy => self.drowsy,
            WarningKind::Distracted => self.distracted,
            WarningKind::Yawning => self.yawning,
        }
    }

    pub fn is_active(&self, kind: WarningKind) -> bool {
        self.get(kind) == Some(true)
    }

    /// Active kinds in priority order.
    pub fn active(&self) -> impl Iterator<Item = WarningKind> + '_ {
        WarningKind::PRIORITY
            .into_iter()
            .filter(move |kind| self.is_active(*kind))
    }

    /// The single kind to surface, if any is active.
    pub fn highest_priority(&self) -> Option<WarningKind> {
        self.active().next()
    }

    /// All three keys present and set to `false`.
    pub fn all_explicitly_false(&self) -> bool {
        WarningKind::PRIORITY
            .into_iter()
            .all(|kind| self.get(kind) == Some(false))
    }
}
