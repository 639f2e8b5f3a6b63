//! Reference-validation results.

use std::fmt;

use serde::Serialize;

use crate::crypto::Digest;
use crate::timestamp::{ImprintCheck, ImprintVerifier, TimestampSource};

/// Outcome of walking the sequence for one protected object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum ReferenceStatus {
    /// A detached document matched the leaf and every step was anchored.
    Matched,
    /// No detached document matched the leaf.
    NotFound,
    /// A renewal digest is absent from the next archive timestamp's leaf
    /// group.
    RenewalMismatch {
        /// Order of the chain holding the archive timestamp.
        chain_order: u32,
        /// Order of the archive timestamp.
        ats_order: u32,
    },
    /// The tree or a collaborator failed at one archive timestamp.
    StructuralError {
        /// Order of the chain holding the archive timestamp.
        chain_order: u32,
        /// Order of the archive timestamp.
        ats_order: u32,
        /// What went wrong.
        reason: String,
    },
}

impl ReferenceStatus {
    pub(crate) fn structural(chain_order: u32, ats_order: u32, reason: impl fmt::Display) -> Self {
        Self::StructuralError {
            chain_order,
            ats_order,
            reason: reason.to_string(),
        }
    }

    /// Returns true for [`ReferenceStatus::Matched`].
    #[must_use]
    pub const fn is_matched(&self) -> bool {
        matches!(self, Self::Matched)
    }
}

impl fmt::Display for ReferenceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Matched => f.write_str("matched"),
            Self::NotFound => f.write_str("no matching document"),
            Self::RenewalMismatch {
                chain_order,
                ats_order,
            } => write!(
                f,
                "renewal digest not protected by archive time-stamp {chain_order}.{ats_order}"
            ),
            Self::StructuralError {
                chain_order,
                ats_order,
                reason,
            } => write!(
                f,
                "structural error at archive time-stamp {chain_order}.{ats_order}: {reason}"
            ),
        }
    }
}

/// The digest one archive timestamp must attest to for one object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExpectedImprint {
    /// Order of the chain holding the archive timestamp.
    pub chain_order: u32,
    /// Order of the archive timestamp.
    pub ats_order: u32,
    /// Leaf the reduction started from.
    pub leaf: Digest,
    /// Reduced tree root; the token's message imprint must equal it.
    pub root: Digest,
}

/// Reference-validation verdict for one leaf of the initial archive
/// timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectVerdict {
    /// Name of the matched detached document.
    pub object: Option<String>,
    /// The leaf digest in the initial archive timestamp.
    pub leaf: Digest,
    /// Outcome.
    pub status: ReferenceStatus,
    /// Derived digests, one per archive timestamp reached, in sequence order.
    pub imprints: Vec<ExpectedImprint>,
}

impl ObjectVerdict {
    pub(crate) const fn new(leaf: Digest) -> Self {
        Self {
            object: None,
            leaf,
            status: ReferenceStatus::Matched,
            imprints: Vec::new(),
        }
    }

    /// Records a failure. The first failure wins.
    pub(crate) fn fail(&mut self, status: ReferenceStatus) {
        if self.status.is_matched() {
            self.status = status;
        }
    }

    /// Returns the digest derived for one archive timestamp.
    #[must_use]
    pub fn imprint(&self, chain_order: u32, ats_order: u32) -> Option<&ExpectedImprint> {
        self.imprints
            .iter()
            .find(|imprint| imprint.chain_order == chain_order && imprint.ats_order == ats_order)
    }

    /// Returns the digest derived for the last archive timestamp reached.
    #[must_use]
    pub fn expected_root(&self) -> Option<&Digest> {
        self.imprints.last().map(|imprint| &imprint.root)
    }
}

/// Pass/fail for one object after the timestamp tokens were checked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectConclusion {
    /// Name of the matched detached document.
    pub object: Option<String>,
    /// The leaf digest in the initial archive timestamp.
    pub leaf: Digest,
    /// True if every archive timestamp attests to its derived digest.
    pub intact: bool,
    /// Why the object failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Result of verifying a whole sequence.
///
/// Either `structural_errors` is non-empty and there are no verdicts, or
/// every leaf of the initial archive timestamp has exactly one verdict.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SequenceReport {
    verdicts: Vec<ObjectVerdict>,
    structural_errors: Vec<String>,
}

impl SequenceReport {
    pub(crate) const fn new(verdicts: Vec<ObjectVerdict>) -> Self {
        Self {
            verdicts,
            structural_errors: Vec::new(),
        }
    }

    pub(crate) const fn malformed(structural_errors: Vec<String>) -> Self {
        Self {
            verdicts: Vec::new(),
            structural_errors,
        }
    }

    /// Returns the per-object verdicts.
    #[must_use]
    pub fn verdicts(&self) -> &[ObjectVerdict] {
        &self.verdicts
    }

    /// Returns the fatal structural errors.
    #[must_use]
    pub fn structural_errors(&self) -> &[String] {
        &self.structural_errors
    }

    /// Returns true if the sequence was well-formed.
    #[must_use]
    pub fn is_structurally_sound(&self) -> bool {
        self.structural_errors.is_empty()
    }

    /// Returns the verdict of the named document.
    #[must_use]
    pub fn verdict_for(&self, object: &str) -> Option<&ObjectVerdict> {
        self.verdicts
            .iter()
            .find(|verdict| verdict.object.as_deref() == Some(object))
    }

    /// Checks every derived digest against its timestamp token and folds the
    /// results into a pass/fail per object.
    ///
    /// An object passes only if it matched, a digest was derived for every
    /// archive timestamp in `source`, and `verifier` reports a match for
    /// each.
    #[must_use]
    pub fn conclude(
        &self,
        source: &TimestampSource,
        verifier: &dyn ImprintVerifier,
    ) -> Vec<ObjectConclusion> {
        self.verdicts
            .iter()
            .map(|verdict| {
                let failure = check_verdict(verdict, source, verifier);
                ObjectConclusion {
                    object: verdict.object.clone(),
                    leaf: verdict.leaf.clone(),
                    intact: failure.is_none(),
                    reason: failure,
                }
            })
            .collect()
    }
}

fn check_verdict(
    verdict: &ObjectVerdict,
    source: &TimestampSource,
    verifier: &dyn ImprintVerifier,
) -> Option<String> {
    if !verdict.status.is_matched() {
        return Some(verdict.status.to_string());
    }
    if verdict.imprints.len() != source.len() {
        return Some(format!(
            "derived digests cover {} of {} archive time-stamps",
            verdict.imprints.len(),
            source.len()
        ));
    }

    for imprint in &verdict.imprints {
        let (chain, ats) = (imprint.chain_order, imprint.ats_order);
        let Some(entry) = source.get(chain, ats) else {
            return Some(format!("no timestamp token for archive time-stamp {chain}.{ats}"));
        };
        match verifier.verify_imprint(&entry.token, &imprint.root) {
            ImprintCheck::Match => {},
            ImprintCheck::Mismatch => {
                return Some(format!(
                    "timestamp token of archive time-stamp {chain}.{ats} does not protect {}",
                    imprint.root
                ));
            },
            ImprintCheck::Unavailable => {
                return Some(format!(
                    "message imprint of archive time-stamp {chain}.{ats} is unavailable"
                ));
            },
        }
    }
    None
}
