//! Append-only operation timeline.
//!
//! The timeline is the ordered log of all instants for a table, persisted as
//! one marker file per `(timestamp, action, state)` triple under the table
//! root:
//!
//! ```text
//! table_root/
//!   _lakeline_timeline/
//!     20250101093000123.replacecommit.requested   # payload: requested metadata
//!     20250101093000123.replacecommit.inflight    # payload independent, often empty
//!     20250101093000123.replacecommit.completed
//!     20250101094500000.clean.requested           # payload: cleaner plan
//! ```
//!
//! The design rests on three properties:
//!
//! - **Append-only markers**: a forward transition creates the *next*
//!   state's marker and retains all earlier ones; nothing ever rewrites an
//!   existing marker. The REQUESTED marker (and its payload) therefore
//!   survives every later transition and crash, which is what makes
//!   identity-keyed payload reads state-agnostic.
//! - **Create-if-absent as the concurrency guard**: duplicate appends and
//!   concurrent transition attempts are detected by the atomic
//!   create-if-absent write of the new marker, not by any lock.
//! - **Explicit snapshots**: [`ActiveTimeline`] is an immutable snapshot;
//!   observing work done by other processes requires an explicit reload,
//!   and reloading never mutates previously returned snapshots.
//!
//! Marker removal is the job of the table's archival process, which is
//! external to this crate.
pub mod active;
pub mod instant;
pub mod store;

pub use active::ActiveTimeline;
pub use instant::{ActionKind, Instant, InstantState, is_valid_token, new_instant_token};
pub use store::TimelineStore;

use snafu::{Backtrace, prelude::*};

use crate::storage::StorageError;

/// Errors that can occur while reading or writing the timeline.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum TimelineError {
    /// An instant with the same `(action, timestamp)` identity already
    /// exists on the timeline.
    #[snafu(display("Instant already exists: {timestamp}.{action}"))]
    DuplicateInstant {
        /// Action kind of the conflicting identity.
        action: ActionKind,
        /// Timestamp token of the conflicting identity.
        timestamp: String,
        /// Backtrace for debugging.
        backtrace: Backtrace,
    },

    /// A state transition that is not a single step forward.
    #[snafu(display("Invalid transition from {from} to {target} (must move strictly forward)"))]
    InvalidTransition {
        /// State the caller claims the instant is in.
        from: InstantState,
        /// State the caller asked to move to.
        target: InstantState,
        /// Backtrace for debugging.
        backtrace: Backtrace,
    },

    /// The source instant of a transition does not exist in its claimed
    /// state, either because it was never created or because a concurrent
    /// process already moved it forward.
    #[snafu(display("Instant {timestamp}.{action} does not exist in state {claimed}"))]
    InstantNotFound {
        /// Action kind of the claimed identity.
        action: ActionKind,
        /// Timestamp token of the claimed identity.
        timestamp: String,
        /// The state the caller claimed.
        claimed: InstantState,
        /// Backtrace for debugging.
        backtrace: Backtrace,
    },

    /// No REQUESTED record ever existed for the given identity.
    #[snafu(display("No requested payload recorded for {timestamp}.{action}"))]
    PayloadNotFound {
        /// Action kind of the identity whose payload was requested.
        action: ActionKind,
        /// Timestamp token of the identity whose payload was requested.
        timestamp: String,
        /// Backtrace for debugging.
        backtrace: Backtrace,
    },

    /// A timestamp token that cannot appear in a marker file name.
    #[snafu(display("Invalid instant timestamp token: {token:?}"))]
    InvalidToken {
        /// The rejected token.
        token: String,
        /// Backtrace for debugging.
        backtrace: Backtrace,
    },

    /// A file in the timeline directory whose name does not round-trip as a
    /// `timestamp.action.state` marker.
    #[snafu(display("Corrupt timeline marker name: {name:?}"))]
    CorruptMarker {
        /// The offending file name.
        name: String,
        /// Backtrace for debugging.
        backtrace: Backtrace,
    },

    /// Underlying storage error while working with marker files.
    ///
    /// Backtraces are delegated to the inner StorageError.
    #[snafu(display("Storage error while accessing the timeline: {source}"))]
    Storage {
        /// Underlying storage error returned by the storage backend.
        #[snafu(backtrace)]
        source: StorageError,
    },
}
