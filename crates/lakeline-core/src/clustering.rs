//! Clustering coordination.
//!
//! A stateless module of functions over explicitly passed timeline
//! snapshots; there is no process-wide state. Three concerns live here:
//!
//! - Building a [`ClusteringPlan`] from caller-supplied groups of file
//!   slices (pure, no I/O).
//! - Resolving the plan behind any replace-commit instant, regardless of
//!   its current state, by reading the write-once REQUESTED payload.
//! - Deriving cross-operation facts from one snapshot: which file groups
//!   are owned by pending clustering operations, and how far back cleaning
//!   constrains clustering's own bookkeeping.
//!
//! A replace-commit is a shared container action, so "this instant has no
//! clustering plan" is a normal outcome, represented as `None` — never as
//! an error.

use std::collections::{BTreeMap, HashMap};

use snafu::prelude::*;
use tracing::{debug, warn};

use crate::cleaning::{self, CleaningError};
use crate::files::{FileGroupId, FileSlice};
use crate::plans::{
    CLUSTERING_PLAN_VERSION, ClusteringGroup, ClusteringPlan, ClusteringSliceInfo,
    ClusteringStrategy, PlanCodecError, RequestedReplaceMetadata, WriteOperationType,
    decode_replace_metadata,
};
use crate::timeline::{ActiveTimeline, Instant, TimelineError};

/// Errors raised by clustering coordination.
#[derive(Debug, Snafu)]
pub enum ClusteringError {
    /// Timeline error while reading instants or payloads.
    #[snafu(display("Timeline error during clustering coordination: {source}"))]
    Timeline {
        /// Underlying timeline error.
        #[snafu(source, backtrace)]
        source: TimelineError,
    },

    /// A requested payload did not decode as replace metadata.
    #[snafu(display("Clustering plan payload error: {source}"))]
    Codec {
        /// Underlying codec error.
        #[snafu(source, backtrace)]
        source: PlanCodecError,
    },

    /// The retention boundary walk failed to read a cleaner plan.
    #[snafu(display("Cleaner plan error during retention computation: {source}"))]
    CleanerPlan {
        /// Underlying cleaning error.
        #[snafu(source, backtrace)]
        source: CleaningError,
    },
}

/// How enumeration reacts to a payload that fails to decode.
///
/// A decode failure is always fatal for that single instant's processing;
/// this policy only decides whether it also aborts the surrounding
/// enumeration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DecodeErrorPolicy {
    /// Log the corrupt payload and continue with the remaining instants.
    Skip,
    /// Abort the enumeration with the codec error.
    Fail,
}

/// Outcome of resolving the plan behind one replace-commit instant.
///
/// `NotClustering` and `NoPayload` both collapse to "no plan" at the public
/// boundary; the distinction is kept internally so diagnostics can say
/// which case occurred.
enum ClusteringResolution {
    /// The instant carries a clustering plan.
    Found(RequestedReplaceMetadata, ClusteringPlan),
    /// The payload describes a non-clustering replace operation, or names
    /// clustering without embedding a plan.
    NotClustering,
    /// A REQUESTED record exists but carries no payload bytes.
    NoPayload,
}

/// Assemble a clustering plan from groups of file slices.
///
/// Pure function: the caller persists the result as the REQUESTED payload
/// of a new replace-commit instant. The output group sequence has the same
/// length and order as `groups`, with every slice captured in full; empty
/// groups are permitted.
pub fn create_clustering_plan(
    strategy_id: &str,
    strategy_params: BTreeMap<String, String>,
    groups: &[Vec<FileSlice>],
    extra_metadata: BTreeMap<String, String>,
) -> ClusteringPlan {
    let input_groups = groups
        .iter()
        .map(|slices| ClusteringGroup {
            slices: slices.iter().map(ClusteringSliceInfo::from_slice).collect(),
        })
        .collect();

    ClusteringPlan {
        strategy: ClusteringStrategy {
            strategy_id: strategy_id.to_string(),
            params: strategy_params,
        },
        input_groups,
        extra_metadata,
        version: CLUSTERING_PLAN_VERSION,
    }
}

async fn resolve_clustering_plan(
    timeline: &ActiveTimeline,
    instant: &Instant,
) -> Result<ClusteringResolution, ClusteringError> {
    let bytes = timeline
        .read_requested_payload(instant)
        .await
        .context(TimelineSnafu)?;
    if bytes.is_empty() {
        return Ok(ClusteringResolution::NoPayload);
    }

    let metadata = decode_replace_metadata(&bytes).context(CodecSnafu)?;
    if metadata.operation_type != WriteOperationType::Cluster {
        return Ok(ClusteringResolution::NotClustering);
    }
    match metadata.clustering_plan.clone() {
        Some(plan) => Ok(ClusteringResolution::Found(metadata, plan)),
        // A clustering-typed payload without an embedded plan is treated as
        // ignorable, not as corruption.
        None => Ok(ClusteringResolution::NotClustering),
    }
}

/// Resolve the clustering plan behind `instant`, if it has one.
///
/// Reads the write-once REQUESTED payload of `instant`'s identity, so the
/// result is identical whether `instant` is currently REQUESTED, INFLIGHT,
/// or COMPLETED. Returns `None` for non-clustering replace operations and
/// for instants whose REQUESTED record carries no payload; fails with
/// `PayloadNotFound` (via [`ClusteringError::Timeline`]) only when no
/// REQUESTED record ever existed.
pub async fn get_clustering_plan(
    timeline: &ActiveTimeline,
    instant: &Instant,
) -> Result<Option<(RequestedReplaceMetadata, ClusteringPlan)>, ClusteringError> {
    match resolve_clustering_plan(timeline, instant).await? {
        ClusteringResolution::Found(metadata, plan) => Ok(Some((metadata, plan))),
        ClusteringResolution::NotClustering => {
            debug!(instant = %instant, "replace instant is not a clustering operation");
            Ok(None)
        }
        ClusteringResolution::NoPayload => {
            debug!(instant = %instant, "replace instant has no requested payload");
            Ok(None)
        }
    }
}

/// Whether `instant` is a replace-commit carrying a clustering plan.
pub async fn is_clustering_instant(
    timeline: &ActiveTimeline,
    instant: &Instant,
) -> Result<bool, ClusteringError> {
    Ok(get_clustering_plan(timeline, instant).await?.is_some())
}

/// Enumerate every pending clustering operation with its plan.
///
/// Pending means replace-commit instants in REQUESTED or INFLIGHT state;
/// results are in ascending timestamp order. Instants without a clustering
/// plan contribute nothing. `policy` governs payloads that fail to decode.
pub async fn all_pending_clustering_plans(
    timeline: &ActiveTimeline,
    policy: DecodeErrorPolicy,
) -> Result<Vec<(Instant, ClusteringPlan)>, ClusteringError> {
    let mut plans = Vec::new();
    for instant in timeline.pending_replace() {
        let resolution = match resolve_clustering_plan(timeline, instant).await {
            Ok(resolution) => resolution,
            Err(err @ ClusteringError::Codec { .. }) if policy == DecodeErrorPolicy::Skip => {
                warn!(instant = %instant, error = %err, "skipping undecodable clustering payload");
                continue;
            }
            Err(err) => return Err(err),
        };
        if let ClusteringResolution::Found(_, plan) = resolution {
            plans.push((instant.clone(), plan));
        }
    }
    Ok(plans)
}

/// Map every file group referenced by a pending clustering plan to its
/// owning instant.
///
/// A correct writer never schedules the same file group into two concurrent
/// clustering operations; should the source data violate that, the entry
/// written last in ascending-timestamp iteration order wins. That tie-break
/// is an accident of iteration, not a contract.
pub async fn pending_clustering_file_groups(
    timeline: &ActiveTimeline,
    policy: DecodeErrorPolicy,
) -> Result<HashMap<FileGroupId, Instant>, ClusteringError> {
    let mut file_groups = HashMap::new();
    for (instant, plan) in all_pending_clustering_plans(timeline, policy).await? {
        for group in &plan.input_groups {
            for slice in &group.slices {
                file_groups.insert(slice.file_group_id(), instant.clone());
            }
        }
    }
    Ok(file_groups)
}

/// Earliest clustering-producing instant that cleaning's open work still
/// depends on.
///
/// Walks one snapshot: the earliest not-yet-completed clean instant's plan
/// promises to retain reads as of some earliest instant; when that instant
/// is the output of a completed clustering operation, clustering's own
/// bookkeeping must not discard it until the clean completes. Returns
/// `None` when no open clean exists, when the clean makes no retention
/// promise, or when the promise does not point at a completed clustering
/// instant.
pub async fn oldest_instant_to_retain_for_clustering(
    timeline: &ActiveTimeline,
) -> Result<Option<Instant>, ClusteringError> {
    let Some(earliest_clean) = timeline.pending_clean().next() else {
        return Ok(None);
    };

    let plan = cleaning::get_cleaner_plan(timeline, earliest_clean)
        .await
        .context(CleanerPlanSnafu)?;
    let Some(retained) = plan.earliest_instant_to_retain else {
        debug!(instant = %earliest_clean, "open clean makes no retention promise");
        return Ok(None);
    };

    for instant in timeline.completed_replace() {
        if instant.timestamp != retained.timestamp {
            continue;
        }
        if is_clustering_instant(timeline, instant).await? {
            return Ok(Some(instant.clone()));
        }
    }
    Ok(None)
}
