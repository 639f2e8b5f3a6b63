//! Errors raised by the evidence-record aggregate.

use thiserror::Error;

/// Errors raised while assembling or querying an
/// [`EvidenceRecord`](crate::EvidenceRecord).
///
/// The error is `Clone` so a memoized failure can be returned to every
/// caller.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum EvidenceRecordError {
    /// The sequence source failed to produce a sequence.
    #[error("failed to build archive time-stamp sequence: {reason}")]
    SequenceBuild {
        /// Why the source failed.
        reason: String,
    },

    /// The verifier configuration is invalid.
    #[error("invalid verifier configuration: {reason}")]
    InvalidConfig {
        /// The validation failure.
        reason: String,
    },
}
