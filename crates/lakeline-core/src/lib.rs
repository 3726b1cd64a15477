//! Coordination core for the lakeline table format.
//!
//! This crate provides the pieces that let concurrent processes agree on
//! long-running table maintenance work without a central lock service:
//!
//! - An append-only timeline of operation instants persisted as per-state
//!   marker files, with strictly-forward lifecycle transitions and atomic
//!   duplicate detection (`timeline` module).
//! - Write-once plan payloads (clustering plans and cleaner plans) attached
//!   to an instant's REQUESTED state and readable by identity regardless of
//!   the instant's current state (`plans` module).
//! - Clustering coordination: building clustering plans, enumerating file
//!   groups owned by pending clustering operations, and computing the
//!   retention boundary shared with cleaning (`clustering` module).
//! - A narrow read path into cleaner plans used by the retention-boundary
//!   computation (`cleaning` module).
//! - A local-filesystem storage backend used by the timeline for marker
//!   listing, create-if-absent writes, and payload reads (`storage` module).
//!
//! The actual data rewrite that a clustering plan describes, strategy
//! selection, and catalog/query integration are external collaborators and
//! live outside this crate.
#![deny(missing_docs)]
pub mod cleaning;
pub mod clustering;
pub mod files;
pub mod plans;
pub mod storage;
pub mod timeline;
