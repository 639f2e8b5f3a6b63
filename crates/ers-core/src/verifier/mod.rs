//! The archive-timestamp sequence verifier.
//!
//! For every leaf of the initial archive timestamp the verifier finds the
//! matching detached document and walks the whole sequence, deriving the
//! digest each archive timestamp's token must attest to:
//!
//! 1. **Tree reduction.** The step's leaf is reduced through the archive
//!    timestamp's hash tree to its root ([`ReducedHashTree::reduce`]).
//! 2. **Timestamp renewal.** Within a chain, the leaf of archive timestamp
//!    `i + 1` is `H(canon(token of i))`.
//! 3. **Chain renewal.** The first archive timestamp of chain `c + 1` covers
//!    `H(canon(chains 1..=c))`, computed on a borrowed prefix of the
//!    sequence. How the object's digest enters that tree depends on the
//!    [`RecordSyntax`].
//!
//! Renewal digests depend only on the sequence, so they are computed once per
//! archive timestamp and shared by every object's walk.
//!
//! # Failure Scopes
//!
//! - A [`StructureViolation`](crate::model::StructureViolation) is fatal: the
//!   report carries the errors and no verdicts.
//! - A missing document, a malformed tree level, a failing canonicalizer or a
//!   broken renewal anchor affects one object only; every other object is
//!   still walked.
//!
//! The derived digests are compared against the tokens afterwards, see
//! [`SequenceReport::conclude`].

mod report;

use std::sync::Arc;

use tracing::{debug, info, warn};

pub use report::{
    ExpectedImprint, ObjectConclusion, ObjectVerdict, ReferenceStatus, SequenceReport,
};

use crate::canonical::{CanonicalizationError, Canonicalizer, CanonicalizerRegistry};
use crate::config::VerifierConfig;
use crate::crypto::Digest;
use crate::matcher::{HashTreeMatcher, object_digest};
use crate::model::{
    ArchiveTimeStampChain, ArchiveTimeStampSequence, DataObject, RecordSyntax, ReducedHashTree,
    StructureViolation, TreeError,
};

/// Verifies an archive-timestamp sequence against detached documents.
///
/// # Example
///
/// ```rust
/// use ers_core::canonical::{CanonicalizerRegistry, DER_METHOD};
/// use ers_core::config::VerifierConfig;
/// use ers_core::crypto::DigestAlgorithm;
/// use ers_core::model::{
///     ArchiveTimeStamp, ArchiveTimeStampChain, ArchiveTimeStampSequence, DataObject,
///     RecordSyntax, ReducedHashTree, TimestampToken,
/// };
/// use ers_core::verifier::{ReferenceStatus, SequenceVerifier};
///
/// let leaf = DigestAlgorithm::Sha256.digest(b"contract.pdf bytes");
/// let ats = ArchiveTimeStamp::new(
///     1,
///     ReducedHashTree::from_values(vec![vec![leaf.value().to_vec()]]),
///     TimestampToken::new("ts-1", b"token".to_vec()),
/// );
/// let sequence = ArchiveTimeStampSequence::new(
///     RecordSyntax::Asn1,
///     vec![ArchiveTimeStampChain::new(1, DigestAlgorithm::Sha256, DER_METHOD, vec![ats])],
/// );
/// let documents = vec![DataObject::detached("contract.pdf", b"contract.pdf bytes".to_vec())];
///
/// let registry = CanonicalizerRegistry::with_defaults();
/// let config = VerifierConfig::default();
/// let report = SequenceVerifier::new(&sequence, &registry, &config).verify(&documents);
///
/// let verdict = &report.verdicts()[0];
/// assert_eq!(verdict.status, ReferenceStatus::Matched);
/// assert_eq!(verdict.expected_root(), Some(&leaf));
/// ```
#[derive(Debug, Clone, Copy)]
pub struct SequenceVerifier<'a> {
    sequence: &'a ArchiveTimeStampSequence,
    registry: &'a CanonicalizerRegistry,
    config: &'a VerifierConfig,
}

/// Inputs of one chain shared by every object's walk.
struct ChainContext<'s> {
    chain: &'s ArchiveTimeStampChain,
    canonicalizer: Result<Arc<dyn Canonicalizer>, CanonicalizationError>,
    /// Renewal digest of each archive timestamp. `None` only for the initial
    /// archive timestamp, whose leaves are the objects themselves.
    anchors: Vec<Option<Result<Digest, CanonicalizationError>>>,
}

impl<'a> SequenceVerifier<'a> {
    /// Creates a verifier over `sequence`.
    #[must_use]
    pub const fn new(
        sequence: &'a ArchiveTimeStampSequence,
        registry: &'a CanonicalizerRegistry,
        config: &'a VerifierConfig,
    ) -> Self {
        Self {
            sequence,
            registry,
            config,
        }
    }

    /// Verifies the sequence against `documents`.
    ///
    /// Never fails: structural violations, missing documents and
    /// collaborator failures are all reported in the returned
    /// [`SequenceReport`].
    #[must_use]
    pub fn verify(&self, documents: &[DataObject]) -> SequenceReport {
        let violations = self.sequence.validate_structure(&self.config.limits);
        if !violations.is_empty() {
            for violation in &violations {
                warn!(%violation, "malformed archive time-stamp sequence");
            }
            return SequenceReport::malformed(
                violations.iter().map(ToString::to_string).collect(),
            );
        }

        let Some((first_chain, first_ats)) = self.sequence.initial_time_stamp() else {
            return SequenceReport::malformed(vec![StructureViolation::EmptySequence.to_string()]);
        };
        let Some(first_group) = first_ats.hash_tree.first_group() else {
            let violation = StructureViolation::EmptyHashTree {
                chain: first_chain.order,
                ats: first_ats.order,
            };
            return SequenceReport::malformed(vec![violation.to_string()]);
        };

        // A malformed initial tree fails every object there, before any
        // document is matched against its leaves.
        let initial_tree = first_ats
            .hash_tree
            .check_well_formed(first_chain.digest_algorithm);
        if let Err(e) = &initial_tree {
            warn!(
                chain_order = first_chain.order,
                ats_order = first_ats.order,
                error = %e,
                "malformed initial hash tree"
            );
        }

        let contexts = self.prepare();
        let mut matcher = HashTreeMatcher::new(documents);
        let verdicts: Vec<ObjectVerdict> = first_group
            .iter_digests(first_chain.digest_algorithm)
            .map(|leaf| match &initial_tree {
                Ok(()) => self.verify_object(leaf, first_ats.order, &contexts, &mut matcher),
                Err(e) => {
                    let mut verdict = ObjectVerdict::new(leaf);
                    verdict.fail(ReferenceStatus::structural(
                        first_chain.order,
                        first_ats.order,
                        e,
                    ));
                    verdict
                },
            })
            .collect();

        info!(
            objects = verdicts.len(),
            matched = verdicts.iter().filter(|v| v.status.is_matched()).count(),
            unused_documents = matcher.unmatched(),
            chains = contexts.len(),
            "verified archive time-stamp sequence"
        );
        SequenceReport::new(verdicts)
    }

    /// Resolves each chain's canonicalizer and computes every renewal digest.
    fn prepare(&self) -> Vec<ChainContext<'a>> {
        let syntax = self.sequence.syntax();

        self.sequence
            .chains()
            .iter()
            .enumerate()
            .map(|(chain_index, chain)| {
                let canonicalizer = self.registry.resolve(&chain.canonicalization_method);
                if let Err(e) = &canonicalizer {
                    warn!(chain_order = chain.order, error = %e, "no canonicalizer for chain");
                }

                let anchors = (0..chain.archive_time_stamps.len())
                    .map(|ats_index| {
                        if chain_index == 0 && ats_index == 0 {
                            return None;
                        }
                        let canonicalizer = match &canonicalizer {
                            Ok(canonicalizer) => canonicalizer,
                            Err(e) => return Some(Err(e.clone())),
                        };
                        let canonical = if ats_index == 0 {
                            let preceding = self.sequence.preceding(chain.order);
                            canonicalizer.canonicalize_sequence(syntax, preceding)
                        } else {
                            canonicalizer
                                .canonicalize_time_stamp(&chain.archive_time_stamps[ats_index - 1])
                        };
                        Some(canonical.map(|bytes| chain.digest_algorithm.digest(&bytes)))
                    })
                    .collect();

                ChainContext {
                    chain,
                    canonicalizer,
                    anchors,
                }
            })
            .collect()
    }

    fn verify_object(
        &self,
        leaf: Digest,
        first_ats_order: u32,
        contexts: &[ChainContext<'_>],
        matcher: &mut HashTreeMatcher<'_>,
    ) -> ObjectVerdict {
        let mut verdict = ObjectVerdict::new(leaf);
        let Some(first) = contexts.first() else {
            return verdict;
        };

        let canonicalizer = match &first.canonicalizer {
            Ok(canonicalizer) => canonicalizer,
            Err(e) => {
                verdict.fail(ReferenceStatus::structural(first.chain.order, first_ats_order, e));
                return verdict;
            },
        };
        let object =
            match matcher.find_matching_object(&verdict.leaf, first.chain, canonicalizer.as_ref()) {
                Ok(Some((_, object))) => {
                    verdict.object = Some(object.name().to_string());
                    Some(object)
                },
                Ok(None) => {
                    warn!(leaf = %verdict.leaf, "no matching detached document");
                    verdict.fail(ReferenceStatus::NotFound);
                    None
                },
                Err(e) => {
                    verdict.fail(ReferenceStatus::structural(
                        first.chain.order,
                        first_ats_order,
                        e,
                    ));
                    return verdict;
                },
            };

        self.walk(&mut verdict, object, contexts);
        verdict
    }

    /// Derives the digest of every archive timestamp for one object, stopping
    /// at the first failure.
    fn walk(
        &self,
        verdict: &mut ObjectVerdict,
        object: Option<&DataObject>,
        contexts: &[ChainContext<'_>],
    ) {
        let order = self.config.sibling_order;

        for (chain_index, context) in contexts.iter().enumerate() {
            let chain = context.chain;
            let steps = chain.archive_time_stamps.iter().zip(&context.anchors);

            for (ats_index, (ats, anchor)) in steps.enumerate() {
                let renewal = chain_index > 0 && ats_index == 0;
                let leaf = match anchor {
                    None => verdict.leaf.clone(),
                    Some(Err(e)) => {
                        warn!(
                            chain_order = chain.order,
                            ats_order = ats.order,
                            error = %e,
                            "failed to compute renewal digest"
                        );
                        verdict.fail(ReferenceStatus::structural(chain.order, ats.order, e));
                        return;
                    },
                    Some(Ok(anchor)) if renewal => {
                        match self.chain_renewal_leaf(anchor, context, object) {
                            Ok(Some(leaf)) => leaf,
                            Ok(None) => {
                                debug!(
                                    chain_order = chain.order,
                                    "no content to follow chain renewal, stopping"
                                );
                                return;
                            },
                            Err(reason) => {
                                verdict.fail(ReferenceStatus::structural(
                                    chain.order,
                                    ats.order,
                                    reason,
                                ));
                                return;
                            },
                        }
                    },
                    Some(Ok(anchor)) => anchor.clone(),
                };

                let root = match ats.hash_tree.reduce(&leaf, order) {
                    Ok(root) => root,
                    Err(TreeError::LeafNotInTree { .. }) => {
                        warn!(
                            chain_order = chain.order,
                            ats_order = ats.order,
                            "renewal digest not covered by archive time-stamp"
                        );
                        verdict.fail(ReferenceStatus::RenewalMismatch {
                            chain_order: chain.order,
                            ats_order: ats.order,
                        });
                        return;
                    },
                    Err(e) => {
                        warn!(
                            chain_order = chain.order,
                            ats_order = ats.order,
                            error = %e,
                            "hash tree reduction failed"
                        );
                        verdict.fail(ReferenceStatus::structural(chain.order, ats.order, e));
                        return;
                    },
                };
                debug!(
                    chain_order = chain.order,
                    ats_order = ats.order,
                    %root,
                    "derived archive time-stamp imprint"
                );

                if renewal && self.sequence.syntax() == RecordSyntax::Xml {
                    if let Err(status) =
                        check_renewed_object(&ats.hash_tree, ats.order, context, object)
                    {
                        verdict.fail(status);
                        return;
                    }
                }

                verdict.imprints.push(ExpectedImprint {
                    chain_order: chain.order,
                    ats_order: ats.order,
                    leaf,
                    root,
                });
            }
        }
    }

    /// Returns the leaf an object contributes to a renewing chain's first
    /// archive timestamp, or `None` if the walk cannot continue without the
    /// object's content.
    fn chain_renewal_leaf(
        &self,
        sequence_digest: &Digest,
        context: &ChainContext<'_>,
        object: Option<&DataObject>,
    ) -> Result<Option<Digest>, String> {
        match self.sequence.syntax() {
            RecordSyntax::Xml => Ok(Some(sequence_digest.clone())),
            RecordSyntax::Asn1 => {
                let Some(object) = object else {
                    return Ok(None);
                };
                let algorithm = context.chain.digest_algorithm;
                let digest = renewed_object_digest(context, object)?.ok_or_else(|| {
                    format!("object {} has no {algorithm} digest", object.name())
                })?;
                Ok(Some(
                    algorithm.digest_parts(&[digest.value(), sequence_digest.value()]),
                ))
            },
        }
    }
}

/// Computes `object`'s digest under a renewing chain's algorithm.
fn renewed_object_digest(
    context: &ChainContext<'_>,
    object: &DataObject,
) -> Result<Option<Digest>, String> {
    let canonicalizer = context
        .canonicalizer
        .as_ref()
        .map_err(ToString::to_string)?;
    object_digest(object, context.chain, canonicalizer.as_ref()).map_err(|e| e.to_string())
}

/// Checks that a renewing XML chain's leaf group lists the object under the
/// new algorithm. Objects with no matching document are not checked; a
/// matched object that cannot be digested under the new algorithm fails.
fn check_renewed_object(
    tree: &ReducedHashTree,
    ats_order: u32,
    context: &ChainContext<'_>,
    object: Option<&DataObject>,
) -> Result<(), ReferenceStatus> {
    let chain_order = context.chain.order;
    let Some(object) = object else {
        return Ok(());
    };
    let algorithm = context.chain.digest_algorithm;
    let digest = match renewed_object_digest(context, object) {
        Ok(Some(digest)) => digest,
        Ok(None) => {
            return Err(ReferenceStatus::structural(
                chain_order,
                ats_order,
                format!("object {} has no {algorithm} digest", object.name()),
            ));
        },
        Err(reason) => {
            return Err(ReferenceStatus::structural(chain_order, ats_order, reason));
        },
    };
    if tree.first_group().is_some_and(|group| group.contains(&digest)) {
        return Ok(());
    }
    warn!(
        chain_order,
        object = object.name(),
        "renewing chain does not cover the object under its new algorithm"
    );
    Err(ReferenceStatus::RenewalMismatch {
        chain_order,
        ats_order,
    })
}
