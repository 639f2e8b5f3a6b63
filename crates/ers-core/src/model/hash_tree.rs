//! Reduced hash trees and root reduction.
//!
//! A reduced hash tree is the Merkle path an archive timestamp needs to get
//! from a protected leaf to the digest its timestamp token covers. It is an
//! ordered list of *groups*:
//!
//! ```text
//! group 0: [h(d1), h(d2), h(d3)]      leaves (protected objects, renewal anchors)
//! group 1: [s1]                       sibling digests of the next level
//! group 2: [s2, s3]                   ...
//! ```
//!
//! Reduction folds the groups into a single root:
//!
//! 1. Group 0 must contain the leaf. If it holds exactly one digest, that digest
//!    is the running value; otherwise the group is ordered, concatenated and
//!    hashed.
//! 2. For every later group, the running value joins the group, which is then
//!    ordered, concatenated and hashed.
//!
//! The final running value is the root (the expected message imprint of the
//! archive timestamp's token).

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::encoding::hex_list;
use crate::crypto::{Digest, DigestAlgorithm};

/// How digests within one tree level are ordered before concatenation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SiblingOrder {
    /// Byte-wise ascending order (RFC 4998 and RFC 6283).
    #[default]
    BinaryAscending,
    /// Running value first, then the group's digests as declared.
    Declared,
}

/// Errors produced while reducing a hash tree.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum TreeError {
    /// The tree has no groups.
    #[error("reduced hash tree is empty")]
    EmptyTree,

    /// A group holds no digests.
    #[error("hash tree group {group} is empty")]
    EmptyGroup {
        /// Index of the empty group.
        group: usize,
    },

    /// A digest does not have the length of the chain's algorithm.
    #[error(
        "malformed digest at group {group}, index {index}: expected {expected} bytes, got {actual}"
    )]
    MalformedDigest {
        /// Index of the group.
        group: usize,
        /// Index of the digest within the group.
        index: usize,
        /// Expected length in bytes.
        expected: usize,
        /// Actual length in bytes.
        actual: usize,
    },

    /// The leaf is not among the first group's digests.
    #[error("leaf {leaf} is not covered by the first hash tree group")]
    LeafNotInTree {
        /// The leaf digest (hex).
        leaf: String,
    },
}

/// One level of a reduced hash tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DigestGroup {
    #[serde(with = "hex_list")]
    digests: Vec<Vec<u8>>,
}

impl DigestGroup {
    /// Creates a group from raw digest values.
    #[must_use]
    pub const fn new(digests: Vec<Vec<u8>>) -> Self {
        Self { digests }
    }

    /// Returns the digest values in declaration order.
    #[must_use]
    pub fn digests(&self) -> &[Vec<u8>] {
        &self.digests
    }

    /// Returns the number of digests.
    #[must_use]
    pub fn len(&self) -> usize {
        self.digests.len()
    }

    /// Returns true if the group holds no digests.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.digests.is_empty()
    }

    /// Returns true if `digest` is one of the group's values (exact match,
    /// algorithm taken from the caller).
    #[must_use]
    pub fn contains(&self, digest: &Digest) -> bool {
        self.digests.iter().any(|value| digest.matches_value(value))
    }

    /// Returns the group's values tagged with `algorithm`.
    pub fn iter_digests(&self, algorithm: DigestAlgorithm) -> impl Iterator<Item = Digest> + '_ {
        self.digests
            .iter()
            .map(move |value| Digest::new(algorithm, value.clone()))
    }
}

/// The reduced hash tree of one archive timestamp.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReducedHashTree {
    groups: Vec<DigestGroup>,
}

impl ReducedHashTree {
    /// Creates a tree from its groups, leaf group first.
    #[must_use]
    pub const fn new(groups: Vec<DigestGroup>) -> Self {
        Self { groups }
    }

    /// Convenience constructor from raw values.
    #[must_use]
    pub fn from_values(groups: Vec<Vec<Vec<u8>>>) -> Self {
        Self {
            groups: groups.into_iter().map(DigestGroup::new).collect(),
        }
    }

    /// Returns the groups, leaf group first.
    #[must_use]
    pub fn groups(&self) -> &[DigestGroup] {
        &self.groups
    }

    /// Returns the leaf group, if any.
    #[must_use]
    pub fn first_group(&self) -> Option<&DigestGroup> {
        self.groups.first()
    }

    /// Returns the number of levels.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.groups.len()
    }

    /// Checks that the tree is non-empty, every group is non-empty and every
    /// digest has the output length of `algorithm`.
    ///
    /// # Errors
    ///
    /// Returns the first violation found.
    pub fn check_well_formed(&self, algorithm: DigestAlgorithm) -> Result<(), TreeError> {
        if self.groups.is_empty() {
            return Err(TreeError::EmptyTree);
        }
        let expected = algorithm.output_len();
        for (group_index, group) in self.groups.iter().enumerate() {
            if group.is_empty() {
                return Err(TreeError::EmptyGroup { group: group_index });
            }
            for (index, value) in group.digests.iter().enumerate() {
                if value.len() != expected {
                    return Err(TreeError::MalformedDigest {
                        group: group_index,
                        index,
                        expected,
                        actual: value.len(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Reduces the tree from `leaf` to its root digest.
    ///
    /// The leaf's algorithm is the chain's algorithm; every level is hashed
    /// with it. Any missing or malformed level aborts the reduction.
    ///
    /// # Errors
    ///
    /// Returns a [`TreeError`] if the tree is malformed or does not cover the
    /// leaf.
    pub fn reduce(&self, leaf: &Digest, order: SiblingOrder) -> Result<Digest, TreeError> {
        let algorithm = leaf.algorithm();
        self.check_well_formed(algorithm)?;

        let (first, rest) = self.groups.split_first().ok_or(TreeError::EmptyTree)?;
        if !first.contains(leaf) {
            return Err(TreeError::LeafNotInTree {
                leaf: hex::encode(leaf.value()),
            });
        }

        let mut running = if first.len() == 1 {
            leaf.clone()
        } else {
            combine(algorithm, order, None, &first.digests)
        };
        for group in rest {
            running = combine(algorithm, order, Some(running.value()), &group.digests);
        }
        Ok(running)
    }
}

/// Orders `running` and `group` per `order`, concatenates and hashes them.
fn combine(
    algorithm: DigestAlgorithm,
    order: SiblingOrder,
    running: Option<&[u8]>,
    group: &[Vec<u8>],
) -> Digest {
    let mut parts: Vec<&[u8]> = Vec::with_capacity(group.len() + 1);
    if let Some(running) = running {
        parts.push(running);
    }
    parts.extend(group.iter().map(Vec::as_slice));
    if order == SiblingOrder::BinaryAscending {
        parts.sort_unstable();
    }
    algorithm.digest_parts(&parts)
}
