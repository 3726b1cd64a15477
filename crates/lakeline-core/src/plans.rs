//! Persisted plan payloads and their codec.
//!
//! This module defines the write-once payloads attached to an instant's
//! REQUESTED state and the functions that move them across the byte
//! boundary:
//!
//! - [`replace`]: the requested-replace metadata container and the
//!   clustering plan it may embed.
//! - [`clean`]: the cleaner plan and its retention reference.
//! - [`codec`]: versioned JSON encode/decode with a dedicated error type.
//!
//! All payload types are created once at plan-build time, persisted as the
//! REQUESTED-state payload, and never mutated thereafter; in-memory they
//! use closed Rust enums, with string tags appearing only in the persisted
//! form.
pub mod clean;
pub mod codec;
pub mod replace;

pub use clean::{CLEANER_PLAN_VERSION, CleanerPlan, CleaningPolicy, InstantRef};
pub use codec::{
    PlanCodecError, decode_cleaner_plan, decode_replace_metadata, encode_cleaner_plan,
    encode_replace_metadata,
};
pub use replace::{
    CLUSTERING_PLAN_VERSION, ClusteringGroup, ClusteringPlan, ClusteringSliceInfo,
    ClusteringStrategy, REPLACE_METADATA_VERSION, RequestedReplaceMetadata, WriteOperationType,
};
