//! Timestamp references for the external timestamp verifier.
//!
//! The engine derives the digest every archive timestamp must attest to but
//! never checks a token itself. [`TimestampSource`] lists each token with
//! its position in the sequence; an [`ImprintVerifier`] compares a token's
//! protected message imprint to the derived digest.

use serde::{Deserialize, Serialize};

use crate::crypto::Digest;
use crate::model::{ArchiveTimeStampSequence, TimestampToken};

/// One timestamp token and the archive timestamp it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimestampEntry {
    /// Order of the chain holding the archive timestamp.
    pub chain_order: u32,
    /// Order of the archive timestamp within its chain.
    pub ats_order: u32,
    /// The token.
    pub token: TimestampToken,
}

/// Every timestamp token of a sequence, in sequence order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimestampSource {
    entries: Vec<TimestampEntry>,
}

impl TimestampSource {
    /// Collects one entry per archive timestamp of `sequence`.
    #[must_use]
    pub fn collect(sequence: &ArchiveTimeStampSequence) -> Self {
        let entries = sequence
            .time_stamps()
            .map(|(chain, ats)| TimestampEntry {
                chain_order: chain.order,
                ats_order: ats.order,
                token: ats.time_stamp.clone(),
            })
            .collect();
        Self { entries }
    }

    /// Returns the entries in sequence order.
    #[must_use]
    pub fn entries(&self) -> &[TimestampEntry] {
        &self.entries
    }

    /// Returns the entry of one archive timestamp.
    #[must_use]
    pub fn get(&self, chain_order: u32, ats_order: u32) -> Option<&TimestampEntry> {
        self.entries
            .iter()
            .find(|entry| entry.chain_order == chain_order && entry.ats_order == ats_order)
    }

    /// Returns the number of tokens.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the source holds no tokens.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Outcome of comparing a token's imprint with the derived digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ImprintCheck {
    /// The token attests to the derived digest.
    Match,
    /// The token attests to a different digest.
    Mismatch,
    /// The imprint could not be determined.
    Unavailable,
}

/// Compares timestamp tokens against derived digests.
///
/// Implementations typically parse the token, verify its signature and
/// certificate path, and then compare its message imprint.
pub trait ImprintVerifier {
    /// Checks that `token` protects `expected`.
    fn verify_imprint(&self, token: &TimestampToken, expected: &Digest) -> ImprintCheck;
}

/// Compares against the imprint the parser declared on each token.
///
/// This performs no signature verification; it suits records whose tokens
/// were already validated upstream.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeclaredImprintVerifier;

impl ImprintVerifier for DeclaredImprintVerifier {
    fn verify_imprint(&self, token: &TimestampToken, expected: &Digest) -> ImprintCheck {
        match &token.message_imprint {
            None => ImprintCheck::Unavailable,
            Some(imprint) if imprint == expected => ImprintCheck::Match,
            Some(_) => ImprintCheck::Mismatch,
        }
    }
}
