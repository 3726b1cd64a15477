//! Immutable timeline snapshots.
//!
//! [`ActiveTimeline`] is the read surface of the timeline: a stable,
//! ordered view over every identity's current state as of one listing.
//! Snapshots never refresh implicitly; multi-step computations (such as
//! the retention-boundary walk) run against a single snapshot so their
//! view cannot shift mid-flight. Reloading produces a *new* snapshot and
//! leaves previously returned ones untouched, so a snapshot may be shared
//! across threads freely once constructed.

use crate::timeline::instant::{ActionKind, Instant, InstantState};
use crate::timeline::store::TimelineStore;
use crate::timeline::TimelineError;

/// An immutable snapshot of the timeline, ordered by timestamp ascending.
#[derive(Debug, Clone)]
pub struct ActiveTimeline {
    store: TimelineStore,
    instants: Vec<Instant>,
}

impl ActiveTimeline {
    pub(crate) fn new(store: TimelineStore, instants: Vec<Instant>) -> Self {
        ActiveTimeline { store, instants }
    }

    /// The store this snapshot was taken from.
    pub fn store(&self) -> &TimelineStore {
        &self.store
    }

    /// All instants in the snapshot, each identity at its current state,
    /// sorted ascending by timestamp.
    pub fn instants(&self) -> &[Instant] {
        &self.instants
    }

    /// Whether the snapshot contains an instant with this exact
    /// `(action, state, timestamp)` value.
    pub fn contains(&self, instant: &Instant) -> bool {
        self.instants.contains(instant)
    }

    /// Lazy, restartable sequence of instants matching any of the given
    /// action kinds in any of the given states, in timestamp order.
    ///
    /// An empty `actions` or `states` set matches nothing.
    pub fn filter<'a>(
        &'a self,
        actions: &'a [ActionKind],
        states: &'a [InstantState],
    ) -> impl Iterator<Item = &'a Instant> + 'a {
        self.instants
            .iter()
            .filter(move |i| actions.contains(&i.action) && states.contains(&i.state))
    }

    /// Replace-commit instants that are not yet completed.
    pub fn pending_replace(&self) -> impl Iterator<Item = &Instant> + '_ {
        self.filter(
            &[ActionKind::ReplaceCommit],
            &[InstantState::Requested, InstantState::Inflight],
        )
    }

    /// Clean instants that are not yet completed.
    pub fn pending_clean(&self) -> impl Iterator<Item = &Instant> + '_ {
        self.filter(
            &[ActionKind::Clean],
            &[InstantState::Requested, InstantState::Inflight],
        )
    }

    /// Completed replace-commit instants.
    pub fn completed_replace(&self) -> impl Iterator<Item = &Instant> + '_ {
        self.filter(&[ActionKind::ReplaceCommit], &[InstantState::Completed])
    }

    /// Take a fresh snapshot from the persisted timeline.
    ///
    /// This snapshot is left untouched; callers observe appends and
    /// transitions made by other processes only through the returned value.
    pub async fn reload(&self) -> Result<ActiveTimeline, TimelineError> {
        self.store.load().await
    }

    /// Read the write-once REQUESTED payload for `instant`'s identity,
    /// regardless of the state the instant currently sits in.
    pub async fn read_requested_payload(
        &self,
        instant: &Instant,
    ) -> Result<Vec<u8>, TimelineError> {
        self.store
            .read_requested_payload(instant.action, &instant.timestamp)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::TableLocation;
    use tempfile::TempDir;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    fn create_test_store() -> (TempDir, TimelineStore) {
        let tmp = TempDir::new().expect("create temp dir");
        let location = TableLocation::local(tmp.path());
        let store = TimelineStore::new(location);
        (tmp, store)
    }

    #[tokio::test]
    async fn filter_matches_action_and_state_sets() -> TestResult {
        let (_tmp, store) = create_test_store();

        store
            .append_requested(ActionKind::ReplaceCommit, "1", None)
            .await?;
        let r2 = store
            .append_requested(ActionKind::ReplaceCommit, "2", None)
            .await?;
        store.transition(&r2, InstantState::Inflight, None).await?;
        store.append_requested(ActionKind::Clean, "3", None).await?;

        let timeline = store.load().await?;

        let pending_replace: Vec<_> = timeline.pending_replace().collect();
        assert_eq!(pending_replace.len(), 2);
        assert_eq!(pending_replace[0].timestamp, "1");
        assert_eq!(pending_replace[1].timestamp, "2");

        let requested_clean: Vec<_> = timeline
            .filter(&[ActionKind::Clean], &[InstantState::Requested])
            .collect();
        assert_eq!(requested_clean.len(), 1);

        let nothing: Vec<_> = timeline.filter(&[], &[InstantState::Requested]).collect();
        assert!(nothing.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn filter_is_restartable() -> TestResult {
        let (_tmp, store) = create_test_store();

        store
            .append_requested(ActionKind::ReplaceCommit, "1", None)
            .await?;
        let timeline = store.load().await?;

        // Same filter call consumed twice yields the same sequence.
        let first: Vec<_> = timeline.pending_replace().collect();
        let second: Vec<_> = timeline.pending_replace().collect();
        assert_eq!(first, second);
        Ok(())
    }

    #[tokio::test]
    async fn reload_does_not_mutate_existing_snapshot() -> TestResult {
        let (_tmp, store) = create_test_store();

        let r1 = store
            .append_requested(ActionKind::ReplaceCommit, "1", None)
            .await?;
        let before = store.load().await?;
        assert_eq!(before.instants().len(), 1);
        assert_eq!(before.instants()[0].state, InstantState::Requested);

        // Mutations after the snapshot was taken...
        store.transition(&r1, InstantState::Inflight, None).await?;
        store
            .append_requested(ActionKind::ReplaceCommit, "2", None)
            .await?;

        // ...are invisible to it, but visible to a reload.
        assert_eq!(before.instants().len(), 1);
        assert_eq!(before.instants()[0].state, InstantState::Requested);

        let after = before.reload().await?;
        assert_eq!(after.instants().len(), 2);
        assert_eq!(after.instants()[0].state, InstantState::Inflight);
        Ok(())
    }
}
