//! Algorithm-tagged digest values.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use thiserror::Error;

/// Errors produced when resolving digest algorithms or decoding digest values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum DigestError {
    /// The algorithm identifier is not recognized.
    #[error("unsupported digest algorithm: {identifier}")]
    UnsupportedAlgorithm {
        /// The identifier that could not be resolved (name, URI or OID).
        identifier: String,
    },

    /// A digest value does not have the length mandated by its algorithm.
    #[error("invalid {algorithm} digest: expected {expected} bytes, got {actual} bytes")]
    InvalidLength {
        /// The algorithm the value was declared under.
        algorithm: DigestAlgorithm,
        /// The expected number of bytes.
        expected: usize,
        /// The actual number of bytes.
        actual: usize,
    },
}

/// Digest algorithms an archive-timestamp chain may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DigestAlgorithm {
    /// SHA-224 (FIPS 180-4).
    Sha224,
    /// SHA-256 (FIPS 180-4).
    Sha256,
    /// SHA-384 (FIPS 180-4).
    Sha384,
    /// SHA-512 (FIPS 180-4).
    Sha512,
}

impl DigestAlgorithm {
    /// All supported algorithms, weakest first.
    pub const ALL: [Self; 4] = [Self::Sha224, Self::Sha256, Self::Sha384, Self::Sha512];

    /// Returns the short name (`sha256`, ...).
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Sha224 => "sha224",
            Self::Sha256 => "sha256",
            Self::Sha384 => "sha384",
            Self::Sha512 => "sha512",
        }
    }

    /// Returns the XML algorithm URI used by RFC 6283 evidence records.
    #[must_use]
    pub const fn uri(self) -> &'static str {
        match self {
            Self::Sha224 => "http://www.w3.org/2001/04/xmldsig-more#sha224",
            Self::Sha256 => "http://www.w3.org/2001/04/xmlenc#sha256",
            Self::Sha384 => "http://www.w3.org/2001/04/xmldsig-more#sha384",
            Self::Sha512 => "http://www.w3.org/2001/04/xmlenc#sha512",
        }
    }

    /// Returns the ASN.1 object identifier used by RFC 4998 evidence records.
    #[must_use]
    pub const fn oid(self) -> &'static str {
        match self {
            Self::Sha224 => "2.16.840.1.101.3.4.2.4",
            Self::Sha256 => "2.16.840.1.101.3.4.2.1",
            Self::Sha384 => "2.16.840.1.101.3.4.2.2",
            Self::Sha512 => "2.16.840.1.101.3.4.2.3",
        }
    }

    /// Returns the digest output length in bytes.
    #[must_use]
    pub const fn output_len(self) -> usize {
        match self {
            Self::Sha224 => 28,
            Self::Sha256 => 32,
            Self::Sha384 => 48,
            Self::Sha512 => 64,
        }
    }

    /// Resolves an algorithm from an XML algorithm URI.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedAlgorithm` if the URI is not recognized.
    pub fn from_uri(uri: &str) -> Result<Self, DigestError> {
        Self::ALL
            .into_iter()
            .find(|alg| alg.uri() == uri)
            .ok_or_else(|| DigestError::UnsupportedAlgorithm {
                identifier: uri.to_string(),
            })
    }

    /// Resolves an algorithm from a dotted ASN.1 object identifier.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedAlgorithm` if the OID is not recognized.
    pub fn from_oid(oid: &str) -> Result<Self, DigestError> {
        Self::ALL
            .into_iter()
            .find(|alg| alg.oid() == oid)
            .ok_or_else(|| DigestError::UnsupportedAlgorithm {
                identifier: oid.to_string(),
            })
    }

    /// Hashes `data` under this algorithm.
    #[must_use]
    pub fn digest(self, data: &[u8]) -> Digest {
        self.digest_parts(&[data])
    }

    /// Hashes the concatenation of `parts` without materializing it.
    #[must_use]
    pub fn digest_parts(self, parts: &[&[u8]]) -> Digest {
        fn run<H: sha2::Digest>(parts: &[&[u8]]) -> Vec<u8> {
            let mut hasher = H::new();
            for part in parts {
                hasher.update(part);
            }
            hasher.finalize().to_vec()
        }

        let value = match self {
            Self::Sha224 => run::<sha2::Sha224>(parts),
            Self::Sha256 => run::<sha2::Sha256>(parts),
            Self::Sha384 => run::<sha2::Sha384>(parts),
            Self::Sha512 => run::<sha2::Sha512>(parts),
        };
        Digest {
            algorithm: self,
            value,
        }
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DigestAlgorithm {
    type Err = DigestError;

    /// Accepts a short name (`SHA-256`, `sha256`), an XML URI or an OID.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "");
        if let Some(alg) = Self::ALL.into_iter().find(|alg| alg.name() == normalized) {
            return Ok(alg);
        }
        Self::from_uri(s.trim()).or_else(|_| Self::from_oid(s.trim()))
    }
}

/// An immutable digest value tagged with the algorithm that produced it.
///
/// Equality requires the same algorithm and byte-identical values. The byte
/// comparison runs in constant time.
#[derive(Clone, Serialize, Deserialize)]
pub struct Digest {
    algorithm: DigestAlgorithm,
    #[serde(with = "hex::serde")]
    value: Vec<u8>,
}

impl Digest {
    /// Creates a digest from an algorithm and a raw value.
    ///
    /// The value is taken as-is; use [`Digest::checked`] when the length must
    /// be validated.
    #[must_use]
    pub const fn new(algorithm: DigestAlgorithm, value: Vec<u8>) -> Self {
        Self { algorithm, value }
    }

    /// Creates a digest, rejecting values whose length does not match the
    /// algorithm's output length.
    ///
    /// # Errors
    ///
    /// Returns `InvalidLength` on a length mismatch.
    pub fn checked(algorithm: DigestAlgorithm, value: Vec<u8>) -> Result<Self, DigestError> {
        if value.len() != algorithm.output_len() {
            return Err(DigestError::InvalidLength {
                algorithm,
                expected: algorithm.output_len(),
                actual: value.len(),
            });
        }
        Ok(Self { algorithm, value })
    }

    /// Returns the algorithm.
    #[must_use]
    pub const fn algorithm(&self) -> DigestAlgorithm {
        self.algorithm
    }

    /// Returns the raw digest bytes.
    #[must_use]
    pub fn value(&self) -> &[u8] {
        &self.value
    }

    /// Returns true if `bytes` equals this digest's value exactly.
    #[must_use]
    pub fn matches_value(&self, bytes: &[u8]) -> bool {
        bool::from(self.value.as_slice().ct_eq(bytes))
    }

    /// Returns the value as lowercase hex.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(&self.value)
    }

    /// Consumes the digest, returning the raw value.
    #[must_use]
    pub fn into_value(self) -> Vec<u8> {
        self.value
    }
}

impl PartialEq for Digest {
    fn eq(&self, other: &Self) -> bool {
        self.algorithm == other.algorithm && self.matches_value(&other.value)
    }
}

impl Eq for Digest {}

impl std::hash::Hash for Digest {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.algorithm.hash(state);
        self.value.hash(state);
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({}:{})", self.algorithm, self.to_hex())
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.algorithm, self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHA256_ABC: &str = "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad";

    #[test]
    fn test_sha256_known_vector() {
        let digest = DigestAlgorithm::Sha256.digest(b"abc");
        assert_eq!(digest.to_hex(), SHA256_ABC);
        assert_eq!(digest.value().len(), 32);
    }

    #[test]
    fn test_digest_parts_equals_concatenation() {
        for alg in DigestAlgorithm::ALL {
            let joined = alg.digest(b"left|right");
            let parts = alg.digest_parts(&[b"left", b"|", b"right"]);
            assert_eq!(joined, parts);
            assert_eq!(parts.value().len(), alg.output_len());
        }
    }

    #[test]
    fn test_equality_requires_same_algorithm() {
        let bytes = vec![7u8; 32];
        let a = Digest::new(DigestAlgorithm::Sha256, bytes.clone());
        let b = Digest::new(DigestAlgorithm::Sha384, bytes);
        assert_ne!(a, b);
    }

    #[test]
    fn test_equality_is_exact() {
        let a = DigestAlgorithm::Sha256.digest(b"content");
        let mut flipped = a.value().to_vec();
        flipped[31] ^= 0x01;
        assert_ne!(a, Digest::new(DigestAlgorithm::Sha256, flipped));

        // A prefix never matches.
        assert!(!a.matches_value(&a.value()[..16]));
    }

    #[test]
    fn test_checked_rejects_wrong_length() {
        let err = Digest::checked(DigestAlgorithm::Sha512, vec![0u8; 32]).unwrap_err();
        assert_eq!(
            err,
            DigestError::InvalidLength {
                algorithm: DigestAlgorithm::Sha512,
                expected: 64,
                actual: 32,
            }
        );
    }

    #[test]
    fn test_resolve_identifiers() {
        assert_eq!(
            "SHA-256".parse::<DigestAlgorithm>().unwrap(),
            DigestAlgorithm::Sha256
        );
        assert_eq!(
            "http://www.w3.org/2001/04/xmlenc#sha512"
                .parse::<DigestAlgorithm>()
                .unwrap(),
            DigestAlgorithm::Sha512
        );
        assert_eq!(
            DigestAlgorithm::from_oid("2.16.840.1.101.3.4.2.2").unwrap(),
            DigestAlgorithm::Sha384
        );
        assert!(matches!(
            "md5".parse::<DigestAlgorithm>(),
            Err(DigestError::UnsupportedAlgorithm { .. })
        ));
    }

    #[test]
    fn test_serde_hex_form() {
        let digest = DigestAlgorithm::Sha256.digest(b"abc");
        let json = serde_json::to_string(&digest).unwrap();
        assert_eq!(
            json,
            format!(r#"{{"algorithm":"sha256","value":"{SHA256_ABC}"}}"#)
        );
        let back: Digest = serde_json::from_str(&json).unwrap();
        assert_eq!(back, digest);
    }
}
