//! Versioned JSON codec for plan payloads.
//!
//! Payloads cross the storage boundary as opaque byte blobs; this module is
//! the only place that knows they are JSON. Encode/decode are total
//! functions: malformed bytes surface as [`PlanCodecError`], never as a
//! panic or a silent default.

use snafu::{Backtrace, prelude::*};

use crate::plans::clean::CleanerPlan;
use crate::plans::replace::RequestedReplaceMetadata;

/// Errors raised while encoding or decoding plan payloads.
#[derive(Debug, Snafu)]
pub enum PlanCodecError {
    /// A payload value could not be serialized.
    #[snafu(display("Failed to encode {what} payload: {source}"))]
    Encode {
        /// Which payload kind was being encoded.
        what: &'static str,
        /// Underlying serialization error.
        source: serde_json::Error,
        /// Backtrace for debugging.
        backtrace: Backtrace,
    },

    /// Payload bytes could not be deserialized.
    #[snafu(display("Failed to decode {what} payload: {source}"))]
    Decode {
        /// Which payload kind was being decoded.
        what: &'static str,
        /// Underlying deserialization error.
        source: serde_json::Error,
        /// Backtrace for debugging.
        backtrace: Backtrace,
    },
}

/// Encode requested-replace metadata to payload bytes.
pub fn encode_replace_metadata(
    metadata: &RequestedReplaceMetadata,
) -> Result<Vec<u8>, PlanCodecError> {
    serde_json::to_vec(metadata).context(EncodeSnafu {
        what: "requested replace metadata",
    })
}

/// Decode requested-replace metadata from payload bytes.
pub fn decode_replace_metadata(bytes: &[u8]) -> Result<RequestedReplaceMetadata, PlanCodecError> {
    serde_json::from_slice(bytes).context(DecodeSnafu {
        what: "requested replace metadata",
    })
}

/// Encode a cleaner plan to payload bytes.
pub fn encode_cleaner_plan(plan: &CleanerPlan) -> Result<Vec<u8>, PlanCodecError> {
    serde_json::to_vec(plan).context(EncodeSnafu {
        what: "cleaner plan",
    })
}

/// Decode a cleaner plan from payload bytes.
pub fn decode_cleaner_plan(bytes: &[u8]) -> Result<CleanerPlan, PlanCodecError> {
    serde_json::from_slice(bytes).context(DecodeSnafu {
        what: "cleaner plan",
    })
}
