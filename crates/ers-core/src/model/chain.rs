//! Archive timestamps and archive-timestamp chains.

use serde::{Deserialize, Serialize};

use super::encoding::base64_bytes;
use super::hash_tree::ReducedHashTree;
use crate::crypto::{Digest, DigestAlgorithm};

/// Opaque reference to the timestamp token of one archive timestamp.
///
/// The engine never interprets the token. It hands the encoded bytes to the
/// chain's canonicalizer (timestamp renewal) and the whole reference to the
/// external timestamp verifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimestampToken {
    /// Identifier assigned by the parser (for reports).
    #[serde(default)]
    pub id: String,

    /// The token as encoded in the evidence record (DER `ContentInfo` for
    /// RFC 4998, the decoded element content for RFC 6283).
    #[serde(with = "base64_bytes")]
    pub encoded: Vec<u8>,

    /// Message imprint declared inside the token, when the parser extracted
    /// it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_imprint: Option<Digest>,
}

impl TimestampToken {
    /// Creates a token reference from its encoding.
    #[must_use]
    pub fn new(id: impl Into<String>, encoded: impl Into<Vec<u8>>) -> Self {
        Self {
            id: id.into(),
            encoded: encoded.into(),
            message_imprint: None,
        }
    }

    /// Attaches the message imprint the token declares.
    #[must_use]
    pub fn with_message_imprint(mut self, imprint: Digest) -> Self {
        self.message_imprint = Some(imprint);
        self
    }
}

/// One reduced hash tree + timestamp token pair within a chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveTimeStamp {
    /// Position within the chain, starting at 1.
    pub order: u32,

    /// The reduced hash tree covered by the token.
    pub hash_tree: ReducedHashTree,

    /// The timestamp token.
    pub time_stamp: TimestampToken,

    /// The archive timestamp's own source encoding as supplied by the parser.
    /// Canonicalizers that serialize whole chains (DER) read it; it may be
    /// empty for syntaxes whose canonicalizer works from the structure.
    #[serde(default, with = "base64_bytes", skip_serializing_if = "Vec::is_empty")]
    pub encoded: Vec<u8>,
}

impl ArchiveTimeStamp {
    /// Creates an archive timestamp without a source encoding.
    #[must_use]
    pub const fn new(order: u32, hash_tree: ReducedHashTree, time_stamp: TimestampToken) -> Self {
        Self {
            order,
            hash_tree,
            time_stamp,
            encoded: Vec::new(),
        }
    }

    /// Attaches the source encoding.
    #[must_use]
    pub fn with_encoded(mut self, encoded: impl Into<Vec<u8>>) -> Self {
        self.encoded = encoded.into();
        self
    }
}

/// An ordered group of archive timestamps sharing one digest algorithm and
/// canonicalization method. A new chain signals hash-algorithm renewal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveTimeStampChain {
    /// Position within the sequence, starting at 1.
    pub order: u32,

    /// Digest algorithm for every tree and renewal digest in this chain.
    pub digest_algorithm: DigestAlgorithm,

    /// Canonicalization method identifier, resolved through a
    /// [`CanonicalizerRegistry`](crate::canonical::CanonicalizerRegistry).
    pub canonicalization_method: String,

    /// Archive timestamps, ordered by their `order`.
    pub archive_time_stamps: Vec<ArchiveTimeStamp>,
}

impl ArchiveTimeStampChain {
    /// Creates a chain. Timestamps are sorted by order.
    #[must_use]
    pub fn new(
        order: u32,
        digest_algorithm: DigestAlgorithm,
        canonicalization_method: impl Into<String>,
        mut archive_time_stamps: Vec<ArchiveTimeStamp>,
    ) -> Self {
        archive_time_stamps.sort_by_key(|ats| ats.order);
        Self {
            order,
            digest_algorithm,
            canonicalization_method: canonicalization_method.into(),
            archive_time_stamps,
        }
    }

    /// Returns the first archive timestamp, if any.
    #[must_use]
    pub fn first(&self) -> Option<&ArchiveTimeStamp> {
        self.archive_time_stamps.first()
    }
}
