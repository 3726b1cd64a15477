//! Cleaner plans and their retention reference.
//!
//! A cleaner plan is the REQUESTED payload of a clean instant: the deletion
//! scope plus a retention promise. The promise is expressed as an
//! [`InstantRef`] — a reference by value, not object identity — so it may
//! name an instant that has since moved to a different state.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::timeline::{ActionKind, Instant, InstantState};

/// Schema version written into new [`CleanerPlan`] payloads.
pub const CLEANER_PLAN_VERSION: u32 = 2;

/// Policy a cleaning operation uses to choose what to delete.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CleaningPolicy {
    /// Retain data needed to serve reads as of the latest N commits.
    KeepLatestCommits,
    /// Retain the latest N versions of every file group.
    KeepLatestFileVersions,
    /// Retain data written within the last N hours.
    KeepLatestByHours,
}

/// Reference to an instant by `(action, state, timestamp)` value.
///
/// This is a snapshot of the referenced instant as the plan writer saw it;
/// the referenced instant may have advanced since.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct InstantRef {
    /// Action kind of the referenced instant.
    pub action: ActionKind,
    /// State the referenced instant was in when the reference was written.
    pub state: InstantState,
    /// Timestamp token of the referenced instant.
    pub timestamp: String,
}

impl InstantRef {
    /// Capture a reference to `instant` as currently seen.
    pub fn for_instant(instant: &Instant) -> Self {
        InstantRef {
            action: instant.action,
            state: instant.state,
            timestamp: instant.timestamp.clone(),
        }
    }
}

/// The persisted description of a cleaning operation.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct CleanerPlan {
    /// Earliest instant whose inputs this clean promises not to delete.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub earliest_instant_to_retain: Option<InstantRef>,
    /// Policy the clean was planned under.
    pub policy: CleaningPolicy,
    /// Files scheduled for deletion, keyed by partition path.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub files_to_be_deleted_per_partition: BTreeMap<String, Vec<String>>,
    /// Plan schema version.
    pub version: u32,
}

impl CleanerPlan {
    /// A plan retaining everything at or after `earliest`, with an empty
    /// deletion scope.
    pub fn retaining(earliest: InstantRef, policy: CleaningPolicy) -> Self {
        CleanerPlan {
            earliest_instant_to_retain: Some(earliest),
            policy,
            files_to_be_deleted_per_partition: BTreeMap::new(),
            version: CLEANER_PLAN_VERSION,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instant_ref_captures_state_at_reference_time() {
        let completed = Instant::new(ActionKind::ReplaceCommit, InstantState::Completed, "1");
        let r = InstantRef::for_instant(&completed);

        assert_eq!(r.action, ActionKind::ReplaceCommit);
        assert_eq!(r.state, InstantState::Completed);
        assert_eq!(r.timestamp, "1");
    }

    #[test]
    fn cleaner_plan_persists_enum_tags_as_strings() {
        let plan = CleanerPlan::retaining(
            InstantRef {
                action: ActionKind::ReplaceCommit,
                state: InstantState::Completed,
                timestamp: "1".to_string(),
            },
            CleaningPolicy::KeepLatestCommits,
        );

        let json = serde_json::to_string(&plan).expect("serialize");
        assert!(json.contains(r#""REPLACE_COMMIT""#));
        assert!(json.contains(r#""COMPLETED""#));
        assert!(json.contains(r#""KEEP_LATEST_COMMITS""#));

        let back: CleanerPlan = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, plan);
        assert_eq!(back.version, CLEANER_PLAN_VERSION);
    }
}
