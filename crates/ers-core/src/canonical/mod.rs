//! Canonicalization capability.
//!
//! Hashing an evidence-record element requires a deterministic byte form of
//! it. The engine never produces that form itself: every chain declares a
//! canonicalization method identifier, and a [`CanonicalizerRegistry`] maps
//! identifiers to [`Canonicalizer`] implementations supplied by the caller.
//!
//! A canonicalizer provides three byte forms:
//!
//! - a detached document (matching protected objects to tree leaves)
//! - one archive timestamp's token (timestamp renewal)
//! - a prefix of the chain list (hash-tree renewal); the prefix is a borrowed
//!   slice of the authoritative sequence and must not be modified
//!
//! # Built-in Methods
//!
//! - [`DerCanonicalizer`] under [`DER_METHOD`]: RFC 4998 records, where the
//!   DER encoding is already canonical.

mod der;

use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

pub use der::{DER_METHOD, DerCanonicalizer};

use crate::config::CanonicalizationConfig;
use crate::model::{ArchiveTimeStamp, ArchiveTimeStampChain, RecordSyntax};

/// Maximum alias indirections followed when resolving a method.
const MAX_ALIAS_HOPS: usize = 8;

/// Errors raised by canonicalizers or while resolving one.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum CanonicalizationError {
    /// No canonicalizer is registered for the method.
    #[error("unsupported canonicalization method: {method}")]
    UnsupportedMethod {
        /// The method identifier.
        method: String,
    },

    /// An element the canonicalizer needs carries no encoding.
    #[error("archive time-stamp {ats} has no {element} encoding")]
    MissingEncoding {
        /// The element lacking an encoding.
        element: &'static str,
        /// Order of the archive timestamp within its chain.
        ats: u32,
    },

    /// The canonicalizer failed on its input.
    #[error("canonicalization with {method} failed: {reason}")]
    Failed {
        /// The method identifier.
        method: String,
        /// Why it failed.
        reason: String,
    },
}

/// Produces canonical byte forms for one canonicalization method.
///
/// Implementations must be deterministic and free of side effects; the
/// verifier may call them any number of times.
pub trait Canonicalizer: Send + Sync {
    /// Returns the canonical form of a detached document.
    ///
    /// # Errors
    ///
    /// Returns an error if the content cannot be canonicalized.
    fn canonicalize_document<'a>(
        &self,
        content: &'a [u8],
    ) -> Result<Cow<'a, [u8]>, CanonicalizationError>;

    /// Returns the canonical form of an archive timestamp's token.
    ///
    /// # Errors
    ///
    /// Returns an error if the token cannot be canonicalized.
    fn canonicalize_time_stamp(
        &self,
        time_stamp: &ArchiveTimeStamp,
    ) -> Result<Vec<u8>, CanonicalizationError>;

    /// Returns the canonical form of a sequence holding only `chains`.
    ///
    /// # Errors
    ///
    /// Returns an error if the chains cannot be serialized.
    fn canonicalize_sequence(
        &self,
        syntax: RecordSyntax,
        chains: &[ArchiveTimeStampChain],
    ) -> Result<Vec<u8>, CanonicalizationError>;
}

/// Maps canonicalization method identifiers to implementations.
#[derive(Clone, Default)]
pub struct CanonicalizerRegistry {
    methods: HashMap<String, Arc<dyn Canonicalizer>>,
    aliases: HashMap<String, String>,
}

impl CanonicalizerRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding the built-in methods.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(DER_METHOD, DerCanonicalizer);
        registry
    }

    /// Registers `canonicalizer` under `method`, replacing any previous one.
    pub fn register(
        &mut self,
        method: impl Into<String>,
        canonicalizer: impl Canonicalizer + 'static,
    ) -> &mut Self {
        self.methods.insert(method.into(), Arc::new(canonicalizer));
        self
    }

    /// Binds `alias` to the method registered as `target`.
    pub fn alias(&mut self, alias: impl Into<String>, target: impl Into<String>) -> &mut Self {
        self.aliases.insert(alias.into(), target.into());
        self
    }

    /// Applies the aliases of a configuration.
    pub fn apply_config(&mut self, config: &CanonicalizationConfig) -> &mut Self {
        for (alias, target) in &config.aliases {
            self.alias(alias.clone(), target.clone());
        }
        self
    }

    /// Resolves `method`, following aliases.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedMethod` if nothing is registered for the method.
    pub fn resolve(&self, method: &str) -> Result<Arc<dyn Canonicalizer>, CanonicalizationError> {
        let mut current = method;
        for _ in 0..=MAX_ALIAS_HOPS {
            if let Some(canonicalizer) = self.methods.get(current) {
                return Ok(Arc::clone(canonicalizer));
            }
            match self.aliases.get(current) {
                Some(target) => current = target.as_str(),
                None => break,
            }
        }
        Err(CanonicalizationError::UnsupportedMethod {
            method: method.to_string(),
        })
    }

    /// Returns the registered method identifiers, sorted.
    #[must_use]
    pub fn methods(&self) -> Vec<&str> {
        let mut methods: Vec<&str> = self.methods.keys().map(String::as_str).collect();
        methods.sort_unstable();
        methods
    }
}

impl fmt::Debug for CanonicalizerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CanonicalizerRegistry")
            .field("methods", &self.methods())
            .field("aliases", &self.aliases)
            .finish()
    }
}
