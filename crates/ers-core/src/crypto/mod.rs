//! Digest primitives for evidence-record verification.
//!
//! This module provides the algorithm-tagged digest value type used across
//! the verification engine:
//!
//! - **Algorithms**: the SHA-2 family, resolvable from XML algorithm URIs,
//!   ASN.1 object identifiers, and short names
//! - **Digests**: immutable `(algorithm, bytes)` pairs whose equality is an
//!   exact, constant-time byte comparison that also requires the same
//!   algorithm
//!
//! # Example
//!
//! ```rust
//! use ers_core::crypto::{Digest, DigestAlgorithm};
//!
//! let a = DigestAlgorithm::Sha256.digest(b"archived content");
//! let b = Digest::new(DigestAlgorithm::Sha256, a.value().to_vec());
//! assert_eq!(a, b);
//!
//! // Same bytes under a different algorithm never compare equal.
//! let c = Digest::new(DigestAlgorithm::Sha384, a.value().to_vec());
//! assert_ne!(a, c);
//! ```

mod digest;

pub use digest::{Digest, DigestAlgorithm, DigestError};
