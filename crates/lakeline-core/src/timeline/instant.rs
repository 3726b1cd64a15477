//! Instant identity and lifecycle state.
//!
//! An [`Instant`] is one record of a single table operation: its action
//! kind, its lifecycle state, and the timestamp token that orders it on the
//! timeline. The `(action, timestamp)` pair is the instant's *identity*;
//! the state is a projection that only ever moves forward. Payload lookups
//! always key off identity, never off state.

use std::fmt;

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Kind of table operation an instant records.
///
/// `ReplaceCommit` is a generic container for operations that atomically
/// replace a set of file groups; clustering is one such operation,
/// identified by the operation type in its requested payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionKind {
    /// Plain write commit.
    Commit,
    /// Atomic replacement of a set of file groups.
    ReplaceCommit,
    /// Cleaning operation removing historical data.
    Clean,
}

impl ActionKind {
    /// Compact form used inside marker file names.
    pub fn marker_str(&self) -> &'static str {
        match self {
            ActionKind::Commit => "commit",
            ActionKind::ReplaceCommit => "replacecommit",
            ActionKind::Clean => "clean",
        }
    }

    /// Parse the compact marker form back into an action kind.
    pub fn from_marker_str(s: &str) -> Option<Self> {
        match s {
            "commit" => Some(ActionKind::Commit),
            "replacecommit" => Some(ActionKind::ReplaceCommit),
            "clean" => Some(ActionKind::Clean),
            _ => None,
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.marker_str())
    }
}

/// Lifecycle state of an instant.
///
/// Strictly ordered; transitions move forward one step at a time and never
/// backward.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InstantState {
    /// The operation has been scheduled and its plan persisted.
    Requested,
    /// The operation is being executed.
    Inflight,
    /// The operation has finished.
    Completed,
}

impl InstantState {
    /// Compact form used inside marker file names.
    pub fn marker_str(&self) -> &'static str {
        match self {
            InstantState::Requested => "requested",
            InstantState::Inflight => "inflight",
            InstantState::Completed => "completed",
        }
    }

    /// Parse the compact marker form back into a state.
    pub fn from_marker_str(s: &str) -> Option<Self> {
        match s {
            "requested" => Some(InstantState::Requested),
            "inflight" => Some(InstantState::Inflight),
            "completed" => Some(InstantState::Completed),
            _ => None,
        }
    }

    /// The state that directly follows this one, if any.
    pub fn next(&self) -> Option<InstantState> {
        match self {
            InstantState::Requested => Some(InstantState::Inflight),
            InstantState::Inflight => Some(InstantState::Completed),
            InstantState::Completed => None,
        }
    }
}

impl fmt::Display for InstantState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.marker_str())
    }
}

/// One identified, stateful record of a table operation.
///
/// Identity is `(action, timestamp)`; `state` is the lifecycle projection.
/// Instants are plain values: a state transition on the timeline produces a
/// new `Instant` value rather than mutating an existing one.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Instant {
    /// Kind of operation this instant records.
    pub action: ActionKind,
    /// Current lifecycle state.
    pub state: InstantState,
    /// Timestamp token; sole ordering key across instants.
    pub timestamp: String,
}

impl Instant {
    /// Create an instant value.
    pub fn new(action: ActionKind, state: InstantState, timestamp: impl Into<String>) -> Self {
        Instant {
            action,
            state,
            timestamp: timestamp.into(),
        }
    }

    /// The same identity projected at a different state.
    pub fn with_state(&self, state: InstantState) -> Instant {
        Instant {
            action: self.action,
            state,
            timestamp: self.timestamp.clone(),
        }
    }

    /// Whether this instant has not yet completed.
    pub fn is_pending(&self) -> bool {
        self.state != InstantState::Completed
    }

    /// Whether `other` names the same `(action, timestamp)` identity.
    pub fn same_identity(&self, other: &Instant) -> bool {
        self.action == other.action && self.timestamp == other.timestamp
    }

    /// Marker file name encoding the full `(timestamp, action, state)`
    /// triple: `<timestamp>.<action>.<state>`.
    pub fn marker_file_name(&self) -> String {
        format!(
            "{}.{}.{}",
            self.timestamp,
            self.action.marker_str(),
            self.state.marker_str()
        )
    }

    /// Parse a marker file name back into an instant.
    ///
    /// Inverse of [`Instant::marker_file_name`]: the three fields must
    /// round-trip exactly, so any name that does not split into a valid
    /// `timestamp.action.state` triple is rejected.
    pub fn from_marker_file_name(name: &str) -> Option<Instant> {
        let mut parts = name.split('.');
        let timestamp = parts.next()?;
        let action = ActionKind::from_marker_str(parts.next()?)?;
        let state = InstantState::from_marker_str(parts.next()?)?;
        if parts.next().is_some() || !is_valid_token(timestamp) {
            return None;
        }
        Some(Instant::new(action, state, timestamp))
    }
}

impl fmt::Display for Instant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.timestamp, self.action, self.state)
    }
}

impl PartialOrd for Instant {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Instant {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Timestamp is the primary ordering key across the timeline; action
        // and state only break ties between distinct identities sharing a
        // token.
        self.timestamp
            .cmp(&other.timestamp)
            .then(self.action.cmp(&other.action))
            .then(self.state.cmp(&other.state))
    }
}

/// Whether `token` is usable as an instant timestamp.
///
/// Tokens must be non-empty and alphanumeric so marker file names round-trip
/// unambiguously (the `.` separator may not appear inside a token).
pub fn is_valid_token(token: &str) -> bool {
    !token.is_empty() && token.chars().all(|c| c.is_ascii_alphanumeric())
}

/// Generate a fresh instant timestamp token from the current UTC time.
///
/// Tokens are fixed-width (`yyyyMMddHHmmssSSS`), so lexicographic order on
/// generated tokens matches wall-clock order.
pub fn new_instant_token() -> String {
    Utc::now().format("%Y%m%d%H%M%S%3f").to_string()
}
