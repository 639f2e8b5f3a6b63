//! Matching detached documents to hash-tree leaves.
//!
//! A reduced hash tree carries digests, not names, and its leaf order need
//! not follow the order in which the caller lists detached documents. The
//! [`HashTreeMatcher`] therefore matches by digest value: for a given leaf it
//! digests every still-unmatched document under the chain's algorithm and
//! returns the first whose digest equals the leaf exactly.
//!
//! # Example
//!
//! ```rust
//! use ers_core::canonical::DerCanonicalizer;
//! use ers_core::crypto::DigestAlgorithm;
//! use ers_core::matcher::HashTreeMatcher;
//! use ers_core::model::{ArchiveTimeStampChain, DataObject};
//!
//! let documents = vec![
//!     DataObject::detached("a.txt", b"alpha".to_vec()),
//!     DataObject::detached("b.txt", b"beta".to_vec()),
//! ];
//! let chain = ArchiveTimeStampChain::new(
//!     1,
//!     DigestAlgorithm::Sha256,
//!     ers_core::canonical::DER_METHOD,
//!     Vec::new(),
//! );
//!
//! let mut matcher = HashTreeMatcher::new(&documents);
//! let leaf = DigestAlgorithm::Sha256.digest(b"beta");
//! let found = matcher
//!     .find_matching_object(&leaf, &chain, &DerCanonicalizer)
//!     .unwrap();
//! assert_eq!(found.map(|(_, object)| object.name()), Some("b.txt"));
//! ```

use tracing::{debug, warn};

use crate::canonical::{CanonicalizationError, Canonicalizer};
use crate::crypto::Digest;
use crate::model::{ArchiveTimeStampChain, DataObject};

/// Matches detached documents against leaf digests, each document at most
/// once.
#[derive(Debug)]
pub struct HashTreeMatcher<'a> {
    documents: &'a [DataObject],
    matched: Vec<bool>,
}

impl<'a> HashTreeMatcher<'a> {
    /// Creates a matcher over `documents`, none of them matched yet.
    #[must_use]
    pub fn new(documents: &'a [DataObject]) -> Self {
        Self {
            documents,
            matched: vec![false; documents.len()],
        }
    }

    /// Returns the number of documents not yet matched.
    #[must_use]
    pub fn unmatched(&self) -> usize {
        self.matched.iter().filter(|matched| !**matched).count()
    }

    /// Finds the first unmatched document whose digest under `chain`'s
    /// algorithm equals `expected`, and marks it matched.
    ///
    /// Returns `Ok(None)` when no document matches. A document whose content
    /// cannot be canonicalized is skipped; if nothing matches and at least
    /// one document was skipped, the first canonicalization error is
    /// returned instead.
    ///
    /// # Errors
    ///
    /// Returns the canonicalization error described above.
    pub fn find_matching_object(
        &mut self,
        expected: &Digest,
        chain: &ArchiveTimeStampChain,
        canonicalizer: &dyn Canonicalizer,
    ) -> Result<Option<(usize, &'a DataObject)>, CanonicalizationError> {
        let mut first_error = None;

        for (index, object) in self.documents.iter().enumerate() {
            if self.matched[index] {
                continue;
            }
            match object_digest(object, chain, canonicalizer) {
                Ok(Some(digest)) if digest == *expected => {
                    self.matched[index] = true;
                    debug!(
                        object = object.name(),
                        chain_order = chain.order,
                        "matched detached document"
                    );
                    return Ok(Some((index, object)));
                },
                Ok(_) => {},
                Err(e) => {
                    warn!(
                        object = object.name(),
                        error = %e,
                        "failed to canonicalize detached document"
                    );
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                },
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(None),
        }
    }
}

/// Computes the digest of `object` under `chain`'s algorithm.
///
/// A precomputed digest for the algorithm is used verbatim. Content is
/// canonicalized with `canonicalizer` and hashed. Returns `Ok(None)` for an
/// object that only carries digests under other algorithms.
///
/// # Errors
///
/// Returns an error if canonicalization fails.
pub fn object_digest(
    object: &DataObject,
    chain: &ArchiveTimeStampChain,
    canonicalizer: &dyn Canonicalizer,
) -> Result<Option<Digest>, CanonicalizationError> {
    let algorithm = chain.digest_algorithm;
    let Some(bytes) = object.bytes() else {
        return Ok(object.precomputed_digest(algorithm).cloned());
    };
    let canonical = canonicalizer.canonicalize_document(bytes)?;
    Ok(Some(algorithm.digest(&canonical)))
}
