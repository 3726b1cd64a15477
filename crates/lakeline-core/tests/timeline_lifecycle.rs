//! Integration tests for cross-process timeline behavior.
//!
//! Two `TimelineStore` handles over the same table root stand in for two
//! independent processes: there is no shared in-memory state between them,
//! so everything they agree on goes through the marker files. These tests
//! validate:
//! - Duplicate-append detection across handles,
//! - Lost transition races surfacing as errors, not corruption,
//! - Snapshot stability while another handle mutates the timeline.
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use tempfile::TempDir;

use lakeline_core::storage::TableLocation;
use lakeline_core::timeline::{
    ActionKind, InstantState, TimelineError, TimelineStore, new_instant_token,
};

type TestResult = Result<(), Box<dyn std::error::Error>>;

fn create_two_process_stores() -> (TempDir, TimelineStore, TimelineStore) {
    let tmp = TempDir::new().expect("create temp dir");
    let writer_a = TimelineStore::new(TableLocation::local(tmp.path()));
    let writer_b = TimelineStore::new(TableLocation::local(tmp.path()));
    (tmp, writer_a, writer_b)
}

#[tokio::test]
async fn appends_by_one_process_visible_to_another_after_load() -> TestResult {
    let (_tmp, writer_a, writer_b) = create_two_process_stores();

    writer_a
        .append_requested(ActionKind::ReplaceCommit, "1", Some(b"plan"))
        .await?;

    let timeline_b = writer_b.load().await?;
    assert_eq!(timeline_b.instants().len(), 1);
    assert_eq!(timeline_b.instants()[0].timestamp, "1");

    let payload = timeline_b
        .read_requested_payload(&timeline_b.instants()[0])
        .await?;
    assert_eq!(payload, b"plan");
    Ok(())
}

#[tokio::test]
async fn duplicate_append_across_processes_is_rejected() -> TestResult {
    let (_tmp, writer_a, writer_b) = create_two_process_stores();

    writer_a
        .append_requested(ActionKind::ReplaceCommit, "1", None)
        .await?;
    let result = writer_b
        .append_requested(ActionKind::ReplaceCommit, "1", Some(b"other"))
        .await;

    assert!(matches!(
        result,
        Err(TimelineError::DuplicateInstant { .. })
    ));
    Ok(())
}

#[tokio::test]
async fn losing_transition_race_surfaces_as_instant_not_found() -> TestResult {
    let (_tmp, writer_a, writer_b) = create_two_process_stores();

    let requested = writer_a
        .append_requested(ActionKind::ReplaceCommit, "1", None)
        .await?;

    // Both processes hold the requested-state value; B advances first.
    writer_b
        .transition(&requested, InstantState::Inflight, None)
        .await?;
    let result = writer_a
        .transition(&requested, InstantState::Inflight, None)
        .await;

    assert!(matches!(result, Err(TimelineError::InstantNotFound { .. })));
    Ok(())
}

#[tokio::test]
async fn snapshot_stays_stable_while_other_process_writes() -> TestResult {
    let (_tmp, writer_a, writer_b) = create_two_process_stores();

    let requested = writer_a
        .append_requested(ActionKind::ReplaceCommit, "1", None)
        .await?;
    let snapshot = writer_a.load().await?;

    writer_b
        .transition(&requested, InstantState::Inflight, None)
        .await?;
    writer_b.append_requested(ActionKind::Clean, "2", None).await?;

    // The snapshot taken before B's writes is unchanged...
    assert_eq!(snapshot.instants().len(), 1);
    assert_eq!(snapshot.instants()[0].state, InstantState::Requested);

    // ...and an explicit reload observes both of them.
    let reloaded = snapshot.reload().await?;
    assert_eq!(reloaded.instants().len(), 2);
    assert_eq!(reloaded.instants()[0].state, InstantState::Inflight);
    Ok(())
}

#[tokio::test]
async fn generated_tokens_append_in_wall_clock_order() -> TestResult {
    let (_tmp, writer_a, _writer_b) = create_two_process_stores();

    let first = new_instant_token();
    writer_a
        .append_requested(ActionKind::Commit, &first, None)
        .await?;

    // Tokens are millisecond-resolution; force a distinct one.
    let mut second = new_instant_token();
    while second == first {
        second = new_instant_token();
    }
    writer_a
        .append_requested(ActionKind::Commit, &second, None)
        .await?;

    let timeline = writer_a.load().await?;
    assert_eq!(timeline.instants().len(), 2);
    assert!(timeline.instants()[0].timestamp < timeline.instants()[1].timestamp);
    Ok(())
}
