//! The archive-timestamp sequence and its structural validation.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::chain::{ArchiveTimeStamp, ArchiveTimeStampChain};
use crate::config::Limits;

/// Evidence-record syntax the sequence was parsed from.
///
/// The syntax fixes how a renewing chain anchors the preceding sequence:
///
/// - `Xml` (RFC 6283): the preceding-sequence digest is a leaf of its own in
///   the first group, next to the objects' digests under the new algorithm.
/// - `Asn1` (RFC 4998): each object's leaf is `H(h(d) || ha(ATSSeq))`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RecordSyntax {
    /// RFC 4998 (DER) evidence records.
    Asn1,
    /// RFC 6283 (XML) evidence records.
    #[default]
    Xml,
}

/// A format violation in the sequence. Any violation is fatal for the whole
/// evidence record.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum StructureViolation {
    /// The sequence holds no chains.
    #[error("archive time-stamp sequence is empty")]
    EmptySequence,

    /// Chain orders are not contiguous from 1.
    #[error("archive time-stamp chain order is not contiguous: expected {expected}, found {found}")]
    ChainOrder {
        /// The order expected at this position.
        expected: u32,
        /// The order found.
        found: u32,
    },

    /// A chain holds no archive timestamps.
    #[error("archive time-stamp chain {chain} contains no archive time-stamps")]
    EmptyChain {
        /// Order of the chain.
        chain: u32,
    },

    /// Archive-timestamp orders within a chain are not contiguous from 1.
    #[error(
        "archive time-stamp order in chain {chain} is not contiguous: expected {expected}, found {found}"
    )]
    TimeStampOrder {
        /// Order of the chain.
        chain: u32,
        /// The order expected at this position.
        expected: u32,
        /// The order found.
        found: u32,
    },

    /// An archive timestamp has no hash tree groups.
    #[error("archive time-stamp {ats} of chain {chain} has an empty hash tree")]
    EmptyHashTree {
        /// Order of the chain.
        chain: u32,
        /// Order of the archive timestamp.
        ats: u32,
    },

    /// Too many chains.
    #[error("sequence holds {count} chains, exceeding the maximum of {max}")]
    TooManyChains {
        /// Actual count.
        count: usize,
        /// Maximum allowed.
        max: usize,
    },

    /// Too many archive timestamps in one chain.
    #[error("chain {chain} holds {count} archive time-stamps, exceeding the maximum of {max}")]
    TooManyTimeStamps {
        /// Order of the chain.
        chain: u32,
        /// Actual count.
        count: usize,
        /// Maximum allowed.
        max: usize,
    },

    /// A hash tree is deeper than allowed.
    #[error(
        "hash tree of archive time-stamp {ats} in chain {chain} has depth {depth}, exceeding the maximum of {max}"
    )]
    TreeTooDeep {
        /// Order of the chain.
        chain: u32,
        /// Order of the archive timestamp.
        ats: u32,
        /// Actual depth.
        depth: usize,
        /// Maximum allowed.
        max: usize,
    },

    /// A hash tree group is larger than allowed.
    #[error(
        "group {group} of archive time-stamp {ats} in chain {chain} holds {size} digests, exceeding the maximum of {max}"
    )]
    GroupTooLarge {
        /// Order of the chain.
        chain: u32,
        /// Order of the archive timestamp.
        ats: u32,
        /// Index of the group.
        group: usize,
        /// Actual size.
        size: usize,
        /// Maximum allowed.
        max: usize,
    },
}

/// Serialized shape of a sequence; converted into the sorted form on load.
#[derive(Serialize, Deserialize)]
struct SequenceRepr {
    #[serde(default)]
    syntax: RecordSyntax,
    chains: Vec<ArchiveTimeStampChain>,
}

/// The full, ordered list of archive-timestamp chains of one evidence record.
///
/// Chains are kept sorted by `order`, and archive timestamps within each chain
/// by their `order`, whatever order the parser produced them in. Contiguity is
/// checked by [`ArchiveTimeStampSequence::validate_structure`], not enforced
/// on construction, so malformed input can still be reported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "SequenceRepr", into = "SequenceRepr")]
pub struct ArchiveTimeStampSequence {
    syntax: RecordSyntax,
    chains: Vec<ArchiveTimeStampChain>,
}

impl From<SequenceRepr> for ArchiveTimeStampSequence {
    fn from(repr: SequenceRepr) -> Self {
        Self::new(repr.syntax, repr.chains)
    }
}

impl From<ArchiveTimeStampSequence> for SequenceRepr {
    fn from(sequence: ArchiveTimeStampSequence) -> Self {
        Self {
            syntax: sequence.syntax,
            chains: sequence.chains,
        }
    }
}

impl ArchiveTimeStampSequence {
    /// Creates a sequence, sorting chains and their archive timestamps by
    /// order.
    #[must_use]
    pub fn new(syntax: RecordSyntax, mut chains: Vec<ArchiveTimeStampChain>) -> Self {
        chains.sort_by_key(|chain| chain.order);
        for chain in &mut chains {
            chain.archive_time_stamps.sort_by_key(|ats| ats.order);
        }
        Self { syntax, chains }
    }

    /// Returns the record syntax.
    #[must_use]
    pub const fn syntax(&self) -> RecordSyntax {
        self.syntax
    }

    /// Returns the chains, ordered.
    #[must_use]
    pub fn chains(&self) -> &[ArchiveTimeStampChain] {
        &self.chains
    }

    /// Returns the first chain's first archive timestamp, if any.
    #[must_use]
    pub fn initial_time_stamp(&self) -> Option<(&ArchiveTimeStampChain, &ArchiveTimeStamp)> {
        let chain = self.chains.first()?;
        Some((chain, chain.first()?))
    }

    /// Returns every archive timestamp with its chain, in sequence order.
    pub fn time_stamps(
        &self,
    ) -> impl Iterator<Item = (&ArchiveTimeStampChain, &ArchiveTimeStamp)> + '_ {
        self.chains.iter().flat_map(|chain| {
            chain
                .archive_time_stamps
                .iter()
                .map(move |ats| (chain, ats))
        })
    }

    /// Returns the chains whose order is strictly less than `order`.
    ///
    /// This is the view a renewing chain of that order covers. It is a
    /// borrowed slice; the sequence itself is never modified.
    #[must_use]
    pub fn preceding(&self, order: u32) -> &[ArchiveTimeStampChain] {
        let end = self.chains.partition_point(|chain| chain.order < order);
        &self.chains[..end]
    }

    /// Checks ordering, emptiness and size bounds.
    ///
    /// Returns every violation found; an empty list means the sequence is
    /// structurally sound. Digest lengths and empty groups are left to the
    /// per-object tree reduction.
    #[must_use]
    pub fn validate_structure(&self, limits: &Limits) -> Vec<StructureViolation> {
        let mut violations = Vec::new();

        if self.chains.is_empty() {
            violations.push(StructureViolation::EmptySequence);
            return violations;
        }
        if self.chains.len() > limits.max_chains {
            violations.push(StructureViolation::TooManyChains {
                count: self.chains.len(),
                max: limits.max_chains,
            });
            return violations;
        }

        for (expected, chain) in (1u32..).zip(&self.chains) {
            if chain.order != expected {
                violations.push(StructureViolation::ChainOrder {
                    expected,
                    found: chain.order,
                });
            }
            Self::validate_chain(chain, limits, &mut violations);
        }

        violations
    }

    fn validate_chain(
        chain: &ArchiveTimeStampChain,
        limits: &Limits,
        violations: &mut Vec<StructureViolation>,
    ) {
        let stamps = &chain.archive_time_stamps;
        if stamps.is_empty() {
            violations.push(StructureViolation::EmptyChain { chain: chain.order });
            return;
        }
        if stamps.len() > limits.max_timestamps_per_chain {
            violations.push(StructureViolation::TooManyTimeStamps {
                chain: chain.order,
                count: stamps.len(),
                max: limits.max_timestamps_per_chain,
            });
            return;
        }

        for (expected, ats) in (1u32..).zip(stamps) {
            if ats.order != expected {
                violations.push(StructureViolation::TimeStampOrder {
                    chain: chain.order,
                    expected,
                    found: ats.order,
                });
            }

            let tree = &ats.hash_tree;
            if tree.depth() == 0 {
                violations.push(StructureViolation::EmptyHashTree {
                    chain: chain.order,
                    ats: ats.order,
                });
            } else if tree.depth() > limits.max_tree_depth {
                violations.push(StructureViolation::TreeTooDeep {
                    chain: chain.order,
                    ats: ats.order,
                    depth: tree.depth(),
                    max: limits.max_tree_depth,
                });
            }
            for (group, digests) in tree.groups().iter().enumerate() {
                if digests.len() > limits.max_group_size {
                    violations.push(StructureViolation::GroupTooLarge {
                        chain: chain.order,
                        ats: ats.order,
                        group,
                        size: digests.len(),
                        max: limits.max_group_size,
                    });
                }
            }
        }
    }
}
