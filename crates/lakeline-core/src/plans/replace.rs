//! Requested-replace metadata and clustering plans.
//!
//! A replace-commit is a shared container action: its REQUESTED payload
//! names the operation being performed, and only when that operation is
//! clustering does the payload embed a [`ClusteringPlan`]. The plan captures
//! which file slices are grouped together as inputs plus the opaque strategy
//! descriptor that will produce outputs; executing the rewrite is an
//! external collaborator's job.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Schema version written into new [`RequestedReplaceMetadata`] payloads.
pub const REPLACE_METADATA_VERSION: u32 = 1;

/// Schema version written into new [`ClusteringPlan`] payloads.
pub const CLUSTERING_PLAN_VERSION: u32 = 1;

/// The operation a replace-commit performs.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WriteOperationType {
    /// Clustering: rewrite groups of file slices into a better layout.
    Cluster,
    /// Overwrite the file groups of the touched partitions.
    InsertOverwrite,
    /// Overwrite every file group in the table.
    InsertOverwriteTable,
    /// Unspecified replace operation.
    Unknown,
}

/// Opaque strategy descriptor for a clustering operation.
///
/// The strategy id and parameter map are externally supplied and carried
/// through untouched; this layer never interprets them.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClusteringStrategy {
    /// Identifier of the strategy implementation to run.
    pub strategy_id: String,
    /// String-keyed strategy parameters.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub params: BTreeMap<String, String>,
}

/// Persisted projection of one input file slice.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClusteringSliceInfo {
    /// Partition path of the slice's file group.
    pub partition_path: String,
    /// File id of the slice's file group.
    pub file_id: String,
    /// Timestamp token of the commit the slice is based on.
    pub base_instant_time: String,
    /// Base file name, when the slice has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_file: Option<String>,
}

impl ClusteringSliceInfo {
    /// Capture a [`crate::files::FileSlice`] in persisted form.
    pub fn from_slice(slice: &crate::files::FileSlice) -> Self {
        ClusteringSliceInfo {
            partition_path: slice.file_group_id.partition_path.clone(),
            file_id: slice.file_group_id.file_id.clone(),
            base_instant_time: slice.base_instant_time.clone(),
            base_file: slice.base_file.as_ref().map(|b| b.file_name.clone()),
        }
    }

    /// Identity of the file group this slice belongs to.
    pub fn file_group_id(&self) -> crate::files::FileGroupId {
        crate::files::FileGroupId::new(self.partition_path.clone(), self.file_id.clone())
    }
}

/// One ordered group of input slices feeding one output grouping.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClusteringGroup {
    /// Input slices of this group, in caller-supplied order.
    pub slices: Vec<ClusteringSliceInfo>,
}

/// The persisted description of a clustering operation's inputs.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClusteringPlan {
    /// Strategy that will produce the output groupings.
    pub strategy: ClusteringStrategy,
    /// Input groups, order preserved from plan construction.
    pub input_groups: Vec<ClusteringGroup>,
    /// Free-form string-keyed metadata carried with the plan.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra_metadata: BTreeMap<String, String>,
    /// Plan schema version.
    pub version: u32,
}

/// Write-once payload stored at REQUESTED time for a replace-commit.
///
/// Later states of the same instant never rewrite or duplicate this; any
/// reader recovers it by re-deriving the REQUESTED identity.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct RequestedReplaceMetadata {
    /// The operation this replace-commit performs.
    pub operation_type: WriteOperationType,
    /// Embedded clustering plan; present only for clustering operations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clustering_plan: Option<ClusteringPlan>,
    /// Free-form string-keyed metadata.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra_metadata: BTreeMap<String, String>,
    /// Payload schema version.
    pub version: u32,
}

impl RequestedReplaceMetadata {
    /// Metadata for a clustering request embedding `plan`.
    pub fn clustering(plan: ClusteringPlan) -> Self {
        RequestedReplaceMetadata {
            operation_type: WriteOperationType::Cluster,
            clustering_plan: Some(plan),
            extra_metadata: BTreeMap::new(),
            version: REPLACE_METADATA_VERSION,
        }
    }

    /// Metadata for a non-clustering replace operation.
    pub fn non_clustering(operation_type: WriteOperationType) -> Self {
        RequestedReplaceMetadata {
            operation_type,
            clustering_plan: None,
            extra_metadata: BTreeMap::new(),
            version: REPLACE_METADATA_VERSION,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operation_type_serializes_as_string_tag() {
        let json = serde_json::to_string(&WriteOperationType::Cluster).expect("serialize");
        assert_eq!(json, r#""CLUSTER""#);

        let json = serde_json::to_string(&WriteOperationType::InsertOverwrite).expect("serialize");
        assert_eq!(json, r#""INSERT_OVERWRITE""#);
    }

    #[test]
    fn metadata_omits_absent_plan_and_empty_maps() {
        let meta = RequestedReplaceMetadata::non_clustering(WriteOperationType::Unknown);
        let json = serde_json::to_string(&meta).expect("serialize");

        assert!(!json.contains("clustering_plan"));
        assert!(!json.contains("extra_metadata"));

        let back: RequestedReplaceMetadata = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, meta);
    }
}
