//! Protected data objects supplied by the caller.

use std::fmt;

use crate::crypto::{Digest, DigestAlgorithm};

/// What the caller supplied for a protected artifact.
#[derive(Clone, PartialEq, Eq)]
pub enum DataObjectContent {
    /// The artifact's bytes (a detached document).
    Bytes(Vec<u8>),
    /// Digests of the artifact computed elsewhere, one per algorithm. These
    /// bypass canonicalization and are compared verbatim.
    Digests(Vec<Digest>),
}

impl fmt::Debug for DataObjectContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bytes(bytes) => write!(f, "Bytes({} bytes)", bytes.len()),
            Self::Digests(digests) => f.debug_tuple("Digests").field(digests).finish(),
        }
    }
}

/// A reference to one protected artifact.
///
/// Data objects are owned by the caller for the lifetime of an
/// [`EvidenceRecord`](crate::EvidenceRecord); the engine only reads them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataObject {
    name: String,
    content: DataObjectContent,
}

impl DataObject {
    /// Creates a detached document from its bytes.
    #[must_use]
    pub fn detached(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            content: DataObjectContent::Bytes(bytes.into()),
        }
    }

    /// Creates a pre-hashed document from one or more digests.
    #[must_use]
    pub fn digested(name: impl Into<String>, digests: impl IntoIterator<Item = Digest>) -> Self {
        Self {
            name: name.into(),
            content: DataObjectContent::Digests(digests.into_iter().collect()),
        }
    }

    /// Returns the document name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the supplied content.
    #[must_use]
    pub const fn content(&self) -> &DataObjectContent {
        &self.content
    }

    /// Returns the raw bytes, if the object was supplied as a document.
    #[must_use]
    pub fn bytes(&self) -> Option<&[u8]> {
        match &self.content {
            DataObjectContent::Bytes(bytes) => Some(bytes),
            DataObjectContent::Digests(_) => None,
        }
    }

    /// Returns the precomputed digest for `algorithm`, if one was supplied.
    #[must_use]
    pub fn precomputed_digest(&self, algorithm: DigestAlgorithm) -> Option<&Digest> {
        match &self.content {
            DataObjectContent::Bytes(_) => None,
            DataObjectContent::Digests(digests) => {
                digests.iter().find(|d| d.algorithm() == algorithm)
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detached_exposes_bytes() {
        let object = DataObject::detached("a.txt", b"payload".to_vec());
        assert_eq!(object.name(), "a.txt");
        assert_eq!(object.bytes(), Some(&b"payload"[..]));
        assert!(object.precomputed_digest(DigestAlgorithm::Sha256).is_none());
    }

    #[test]
    fn test_digested_selects_by_algorithm() {
        let sha256 = DigestAlgorithm::Sha256.digest(b"payload");
        let sha512 = DigestAlgorithm::Sha512.digest(b"payload");
        let object = DataObject::digested("a.txt", [sha256.clone(), sha512.clone()]);

        assert!(object.bytes().is_none());
        assert_eq!(
            object.precomputed_digest(DigestAlgorithm::Sha256),
            Some(&sha256)
        );
        assert_eq!(
            object.precomputed_digest(DigestAlgorithm::Sha512),
            Some(&sha512)
        );
        assert!(object.precomputed_digest(DigestAlgorithm::Sha384).is_none());
    }
}
