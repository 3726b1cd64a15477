//! Marker-file persistence for the timeline.
//!
//! This module owns all on-disk interactions with `_lakeline_timeline/`:
//! - Listing and parsing marker files into [`Instant`] values.
//! - Appending new REQUESTED instants with create-if-absent semantics so
//!   each identity is created exactly once across processes.
//! - Enforcing strictly-forward state transitions, surfacing lost races as
//!   errors instead of silent corruption.
//! - Reading the write-once REQUESTED payload by identity, regardless of an
//!   instant's current state.
//!
//! All operations delegate to the storage backend and remain focused on
//! timeline invariants, leaving plan interpretation to the coordination
//! layer.
use std::collections::HashMap;
use std::path::PathBuf;

use snafu::prelude::*;
use tracing::debug;

use crate::storage::{self, StorageError, TableLocation};
use crate::timeline::instant::{ActionKind, Instant, InstantState, is_valid_token};
use crate::timeline::{
    ActiveTimeline, CorruptMarkerSnafu, DuplicateInstantSnafu, InstantNotFoundSnafu,
    InvalidTokenSnafu, InvalidTransitionSnafu, PayloadNotFoundSnafu, StorageSnafu, TimelineError,
};

/// Helper for reading and writing timeline marker files under a table root.
///
/// Layout:
///   <root>/_lakeline_timeline/<timestamp>.<action>.<state>
///
/// One marker file per state an identity has reached; earlier markers are
/// retained when the instant moves forward.
#[derive(Debug, Clone)]
pub struct TimelineStore {
    location: TableLocation,
}

impl TimelineStore {
    /// Name of the subdirectory containing timeline markers.
    pub const TIMELINE_DIR_NAME: &str = "_lakeline_timeline";

    /// Create a new TimelineStore rooted at a table directory.
    pub fn new(location: TableLocation) -> Self {
        Self { location }
    }

    /// Get the TableLocation of the store.
    pub fn location(&self) -> &TableLocation {
        &self.location
    }

    fn timeline_rel_dir() -> PathBuf {
        PathBuf::from(Self::TIMELINE_DIR_NAME)
    }

    fn marker_rel_path(instant: &Instant) -> PathBuf {
        Self::timeline_rel_dir().join(instant.marker_file_name())
    }

    /// List every marker currently present, parsed and sorted.
    ///
    /// Each entry is one `(timestamp, action, state)` marker file; an
    /// identity that has moved through several states appears once per
    /// state reached. File names that do not round-trip are surfaced as
    /// `CorruptMarker` rather than skipped.
    async fn list_markers(&self) -> Result<Vec<Instant>, TimelineError> {
        let names = storage::list_file_names(&self.location, &Self::timeline_rel_dir())
            .await
            .context(StorageSnafu)?;

        let mut markers = Vec::with_capacity(names.len());
        for name in names {
            let instant = Instant::from_marker_file_name(&name)
                .context(CorruptMarkerSnafu { name: name.clone() })?;
            markers.push(instant);
        }
        markers.sort();
        Ok(markers)
    }

    fn current_state(
        markers: &[Instant],
        action: ActionKind,
        timestamp: &str,
    ) -> Option<InstantState> {
        markers
            .iter()
            .filter(|m| m.action == action && m.timestamp == timestamp)
            .map(|m| m.state)
            .max()
    }

    /// Append a new REQUESTED instant with its write-once payload.
    ///
    /// ## Concurrency semantics
    ///
    /// - The listing check is advisory/best-effort and subject to races.
    ///   Two writers may both see the identity as absent and attempt the
    ///   append. The actual guard is the atomic creation of the requested
    ///   marker using "create only if not exists" semantics.
    /// - If another writer wins the race, this operation fails with
    ///   `DuplicateInstant`; callers decide whether to retry under a new
    ///   timestamp token.
    pub async fn append_requested(
        &self,
        action: ActionKind,
        timestamp: &str,
        payload: Option<&[u8]>,
    ) -> Result<Instant, TimelineError> {
        ensure!(
            is_valid_token(timestamp),
            InvalidTokenSnafu {
                token: timestamp.to_string(),
            }
        );

        // Advisory check: any marker for this identity, in any state, means
        // the identity is taken.
        let markers = self.list_markers().await?;
        ensure!(
            Self::current_state(&markers, action, timestamp).is_none(),
            DuplicateInstantSnafu {
                action,
                timestamp: timestamp.to_string(),
            }
        );

        let requested = Instant::new(action, InstantState::Requested, timestamp);
        let rel = Self::marker_rel_path(&requested);
        match storage::write_new(&self.location, &rel, payload.unwrap_or_default()).await {
            Ok(()) => {}
            Err(StorageError::AlreadyExists { .. }) => {
                return DuplicateInstantSnafu {
                    action,
                    timestamp: timestamp.to_string(),
                }
                .fail();
            }
            Err(source) => return Err(TimelineError::Storage { source }),
        }

        debug!(instant = %requested, "appended requested instant");
        Ok(requested)
    }

    /// Move an instant one state forward, writing the new state's marker.
    ///
    /// The payload written here is independent of the REQUESTED payload; it
    /// typically does not repeat plan content and may be empty.
    ///
    /// ## Errors
    ///
    /// - `InvalidTransition` when `target` is not the single next state
    ///   after `instant.state` (no skipping, no going backward).
    /// - `InstantNotFound` when the identity does not currently sit in the
    ///   claimed state: never created, already advanced past it, or
    ///   advanced concurrently while this call was in flight. The losing
    ///   side of a transition race always observes this error; nothing is
    ///   overwritten.
    pub async fn transition(
        &self,
        instant: &Instant,
        target: InstantState,
        payload: Option<&[u8]>,
    ) -> Result<Instant, TimelineError> {
        ensure!(
            instant.state.next() == Some(target),
            InvalidTransitionSnafu {
                from: instant.state,
                target,
            }
        );

        let markers = self.list_markers().await?;
        let current = Self::current_state(&markers, instant.action, instant.timestamp.as_str());
        ensure!(
            current == Some(instant.state),
            InstantNotFoundSnafu {
                action: instant.action,
                timestamp: instant.timestamp.clone(),
                claimed: instant.state,
            }
        );

        let advanced = instant.with_state(target);
        let rel = Self::marker_rel_path(&advanced);
        match storage::write_new(&self.location, &rel, payload.unwrap_or_default()).await {
            Ok(()) => {}
            Err(StorageError::AlreadyExists { .. }) => {
                // A concurrent process created the target marker first; the
                // claimed source state is stale.
                return InstantNotFoundSnafu {
                    action: instant.action,
                    timestamp: instant.timestamp.clone(),
                    claimed: instant.state,
                }
                .fail();
            }
            Err(source) => return Err(TimelineError::Storage { source }),
        }

        debug!(from = %instant, to = %advanced, "transitioned instant");
        Ok(advanced)
    }

    /// Read the payload recorded when this identity was first created in
    /// REQUESTED state, regardless of the instant's current state.
    ///
    /// Plan content is written exactly once, so any reader can find it by
    /// re-deriving the REQUESTED marker from `(action, timestamp)` — even
    /// when the instant object in hand is INFLIGHT or COMPLETED.
    ///
    /// An existing marker with an empty payload reads as `Ok(vec![])`;
    /// `PayloadNotFound` means no REQUESTED record ever existed.
    pub async fn read_requested_payload(
        &self,
        action: ActionKind,
        timestamp: &str,
    ) -> Result<Vec<u8>, TimelineError> {
        let requested = Instant::new(action, InstantState::Requested, timestamp);
        let rel = Self::marker_rel_path(&requested);
        match storage::read_bytes(&self.location, &rel).await {
            Ok(bytes) => Ok(bytes),
            Err(StorageError::NotFound { .. }) => PayloadNotFoundSnafu {
                action,
                timestamp: timestamp.to_string(),
            }
            .fail(),
            Err(source) => Err(TimelineError::Storage { source }),
        }
    }

    /// Take a fresh snapshot of the timeline.
    ///
    /// Each identity appears once, projected at the highest state whose
    /// marker exists, sorted ascending by timestamp.
    pub async fn load(&self) -> Result<ActiveTimeline, TimelineError> {
        let markers = self.list_markers().await?;

        let mut latest: HashMap<(ActionKind, String), InstantState> = HashMap::new();
        for marker in markers {
            let entry = latest
                .entry((marker.action, marker.timestamp))
                .or_insert(marker.state);
            if marker.state > *entry {
                *entry = marker.state;
            }
        }

        let mut instants: Vec<Instant> = latest
            .into_iter()
            .map(|((action, timestamp), state)| Instant::new(action, state, timestamp))
            .collect();
        instants.sort();

        Ok(ActiveTimeline::new(self.clone(), instants))
    }
}
