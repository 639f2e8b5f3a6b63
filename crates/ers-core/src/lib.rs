//! # ers-core
//!
//! Verification engine for evidence records (RFC 4998 / RFC 6283).
//!
//! An evidence record proves that data objects existed unchanged since a
//! point in time through chains of archive timestamps. Each archive timestamp
//! pairs a reduced hash tree with a timestamp token; later timestamps renew
//! earlier ones, and new chains migrate the whole record to a stronger hash
//! algorithm.
//!
//! This crate re-derives, from the tree structure alone, the digest every
//! timestamp token must attest to for every protected object, and checks
//! that each renewal is anchored in the next archive timestamp. Parsing the
//! record, canonicalizing XML and verifying token signatures are left to
//! collaborators plugged in through traits.
//!
//! ## Core Concepts
//!
//! - **Sequence**: ordered chains of archive timestamps ([`model`])
//! - **Matching**: detached documents are found by digest, never by name
//!   ([`matcher`])
//! - **Verification**: the per-object walk over the whole sequence
//!   ([`verifier`])
//! - **Canonicalization**: per-chain byte forms supplied by the caller
//!   ([`canonical`])
//! - **Aggregate**: [`EvidenceRecord`] memoizes the sequence and the report
//!
//! ## Example
//!
//! ```rust
//! use ers_core::prelude::*;
//!
//! let leaf = DigestAlgorithm::Sha256.digest(b"minutes of the meeting");
//! let token = TimestampToken::new("ts-1", b"token".to_vec()).with_message_imprint(leaf.clone());
//! let sequence = ArchiveTimeStampSequence::new(
//!     RecordSyntax::Asn1,
//!     vec![ArchiveTimeStampChain::new(
//!         1,
//!         DigestAlgorithm::Sha256,
//!         DER_METHOD,
//!         vec![ArchiveTimeStamp::new(
//!             1,
//!             ReducedHashTree::from_values(vec![vec![leaf.value().to_vec()]]),
//!             token,
//!         )],
//!     )],
//! );
//!
//! let record = EvidenceRecord::builder(sequence)
//!     .detached_content(DataObject::detached("minutes.txt", b"minutes of the meeting".to_vec()))
//!     .build()
//!     .unwrap();
//!
//! let report = record.reference_validation();
//! assert_eq!(report.verdicts()[0].status, ReferenceStatus::Matched);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod canonical;
pub mod config;
pub mod crypto;
pub mod error;
pub mod matcher;
pub mod model;
pub mod record;
pub mod timestamp;
pub mod verifier;

// Re-export main types at crate root for convenience
pub use error::EvidenceRecordError;
pub use record::{EvidenceRecord, EvidenceRecordBuilder, JsonSequenceSource, SequenceSource};
pub use verifier::{ReferenceStatus, SequenceReport, SequenceVerifier};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::canonical::{
        CanonicalizationError, Canonicalizer, CanonicalizerRegistry, DER_METHOD, DerCanonicalizer,
    };
    pub use crate::config::{Limits, VerifierConfig};
    pub use crate::crypto::{Digest, DigestAlgorithm};
    pub use crate::error::EvidenceRecordError;
    pub use crate::model::{
        ArchiveTimeStamp, ArchiveTimeStampChain, ArchiveTimeStampSequence, DataObject,
        RecordSyntax, ReducedHashTree, SiblingOrder, TimestampToken,
    };
    pub use crate::record::{EvidenceRecord, SequenceSource};
    pub use crate::timestamp::{DeclaredImprintVerifier, ImprintVerifier, TimestampSource};
    pub use crate::verifier::{ReferenceStatus, SequenceReport, SequenceVerifier};
}
