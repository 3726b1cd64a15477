//! Narrow read path into cleaner plans.
//!
//! Cleaning itself (choosing and deleting files) is an external
//! collaborator; the coordination layer only needs to read a clean
//! instant's retention promise back out of its REQUESTED payload. That
//! read is identity-keyed and state-agnostic, exactly like the clustering
//! plan read path.

use snafu::prelude::*;

use crate::plans::{CleanerPlan, PlanCodecError, decode_cleaner_plan};
use crate::timeline::{ActiveTimeline, Instant, TimelineError};

/// Errors raised while reading a cleaner plan.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum CleaningError {
    /// Timeline error while reading the requested payload.
    #[snafu(display("Timeline error while reading a cleaner plan: {source}"))]
    Timeline {
        /// Underlying timeline error.
        #[snafu(source, backtrace)]
        source: TimelineError,
    },

    /// The payload bytes did not decode as a cleaner plan.
    #[snafu(display("Cleaner plan payload error: {source}"))]
    Codec {
        /// Underlying codec error.
        #[snafu(source, backtrace)]
        source: PlanCodecError,
    },
}

/// Read the cleaner plan recorded when `instant` was requested.
///
/// Works whatever state `instant` currently sits in, because the plan is
/// the write-once REQUESTED payload of its identity.
pub async fn get_cleaner_plan(
    timeline: &ActiveTimeline,
    instant: &Instant,
) -> Result<CleanerPlan, CleaningError> {
    let bytes = timeline
        .read_requested_payload(instant)
        .await
        .context(TimelineSnafu)?;
    decode_cleaner_plan(&bytes).context(CodecSnafu)
}
