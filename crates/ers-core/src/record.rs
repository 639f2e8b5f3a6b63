//! The evidence-record aggregate.
//!
//! An [`EvidenceRecord`] ties together a sequence source, the detached
//! documents it protects, the canonicalizers and the verifier
//! configuration. All inputs are fixed by [`EvidenceRecordBuilder`]; the
//! sequence, its timestamp references and the reference-validation report
//! are computed on first access and cached for the lifetime of the record.
//!
//! # Usage Contract
//!
//! The record never re-verifies. Every query after the first returns the
//! cached value, so a caller that needs results for a different document set
//! must build a new record.
//!
//! # Concurrency
//!
//! Each cached value is computed at most once even under concurrent first
//! access: concurrent callers block until the first computation finishes and
//! then share its result.
//!
//! # Example
//!
//! ```rust
//! use ers_core::EvidenceRecord;
//! use ers_core::canonical::DER_METHOD;
//! use ers_core::crypto::DigestAlgorithm;
//! use ers_core::model::{
//!     ArchiveTimeStamp, ArchiveTimeStampChain, ArchiveTimeStampSequence, DataObject,
//!     RecordSyntax, ReducedHashTree, TimestampToken,
//! };
//! use ers_core::timestamp::DeclaredImprintVerifier;
//!
//! let leaf = DigestAlgorithm::Sha256.digest(b"invoice");
//! let token = TimestampToken::new("ts-1", b"token".to_vec()).with_message_imprint(leaf.clone());
//! let ats = ArchiveTimeStamp::new(
//!     1,
//!     ReducedHashTree::from_values(vec![vec![leaf.value().to_vec()]]),
//!     token,
//! );
//! let sequence = ArchiveTimeStampSequence::new(
//!     RecordSyntax::Asn1,
//!     vec![ArchiveTimeStampChain::new(1, DigestAlgorithm::Sha256, DER_METHOD, vec![ats])],
//! );
//!
//! let record = EvidenceRecord::builder(sequence)
//!     .filename("invoice.ers")
//!     .detached_content(DataObject::detached("invoice", b"invoice".to_vec()))
//!     .build()
//!     .unwrap();
//!
//! assert!(record.validate_structure().is_empty());
//! let conclusions = record.conclude(&DeclaredImprintVerifier).unwrap();
//! assert!(conclusions[0].intact);
//! ```

use std::fmt;
use std::sync::OnceLock;

use tracing::debug;

use crate::canonical::CanonicalizerRegistry;
use crate::config::VerifierConfig;
use crate::error::EvidenceRecordError;
use crate::model::{ArchiveTimeStampSequence, DataObject};
use crate::timestamp::{ImprintVerifier, TimestampEntry, TimestampSource};
use crate::verifier::{ObjectConclusion, SequenceReport, SequenceVerifier};

// =============================================================================
// Sequence sources
// =============================================================================

/// Produces the archive-timestamp sequence of a record on demand.
///
/// Format-specific parsers implement this to defer parsing until the
/// sequence is first needed. It is called at most once per record.
pub trait SequenceSource: Send + Sync {
    /// Builds the sequence.
    ///
    /// # Errors
    ///
    /// Returns an error if the source cannot produce a sequence.
    fn build_sequence(&self) -> Result<ArchiveTimeStampSequence, EvidenceRecordError>;
}

impl SequenceSource for ArchiveTimeStampSequence {
    fn build_sequence(&self) -> Result<ArchiveTimeStampSequence, EvidenceRecordError> {
        Ok(self.clone())
    }
}

impl<F> SequenceSource for F
where
    F: Fn() -> Result<ArchiveTimeStampSequence, EvidenceRecordError> + Send + Sync,
{
    fn build_sequence(&self) -> Result<ArchiveTimeStampSequence, EvidenceRecordError> {
        self()
    }
}

/// A sequence in its JSON interchange form, parsed on first access.
#[derive(Debug, Clone)]
pub struct JsonSequenceSource {
    json: String,
}

impl JsonSequenceSource {
    /// Wraps a JSON document holding an [`ArchiveTimeStampSequence`].
    #[must_use]
    pub fn new(json: impl Into<String>) -> Self {
        Self { json: json.into() }
    }
}

impl SequenceSource for JsonSequenceSource {
    fn build_sequence(&self) -> Result<ArchiveTimeStampSequence, EvidenceRecordError> {
        serde_json::from_str(&self.json).map_err(|e| EvidenceRecordError::SequenceBuild {
            reason: e.to_string(),
        })
    }
}

// =============================================================================
// Builder
// =============================================================================

/// Builder for [`EvidenceRecord`].
pub struct EvidenceRecordBuilder {
    source: Box<dyn SequenceSource>,
    filename: Option<String>,
    detached_contents: Vec<DataObject>,
    canonicalizers: CanonicalizerRegistry,
    config: VerifierConfig,
}

impl EvidenceRecordBuilder {
    /// Creates a builder with the built-in canonicalizers and the default
    /// configuration.
    #[must_use]
    pub fn new(source: impl SequenceSource + 'static) -> Self {
        Self {
            source: Box::new(source),
            filename: None,
            detached_contents: Vec::new(),
            canonicalizers: CanonicalizerRegistry::with_defaults(),
            config: VerifierConfig::default(),
        }
    }

    /// Sets the name of the evidence-record file (for reports).
    #[must_use]
    pub fn filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    /// Adds one detached document.
    #[must_use]
    pub fn detached_content(mut self, object: DataObject) -> Self {
        self.detached_contents.push(object);
        self
    }

    /// Adds detached documents.
    #[must_use]
    pub fn detached_contents(mut self, objects: impl IntoIterator<Item = DataObject>) -> Self {
        self.detached_contents.extend(objects);
        self
    }

    /// Replaces the canonicalizer registry.
    #[must_use]
    pub fn canonicalizers(mut self, registry: CanonicalizerRegistry) -> Self {
        self.canonicalizers = registry;
        self
    }

    /// Sets the verifier configuration.
    #[must_use]
    pub fn config(mut self, config: VerifierConfig) -> Self {
        self.config = config;
        self
    }

    /// Builds the record. The configuration's aliases are added to the
    /// registry.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the configuration fails validation.
    pub fn build(mut self) -> Result<EvidenceRecord, EvidenceRecordError> {
        self.config
            .validate()
            .map_err(|e| EvidenceRecordError::InvalidConfig {
                reason: e.to_string(),
            })?;
        self.canonicalizers
            .apply_config(&self.config.canonicalization);

        Ok(EvidenceRecord {
            source: self.source,
            filename: self.filename,
            detached_contents: self.detached_contents,
            canonicalizers: self.canonicalizers,
            config: self.config,
            sequence: OnceLock::new(),
            timestamps: OnceLock::new(),
            reference_validation: OnceLock::new(),
        })
    }
}

impl fmt::Debug for EvidenceRecordBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EvidenceRecordBuilder")
            .field("filename", &self.filename)
            .field("detached_contents", &self.detached_contents.len())
            .field("canonicalizers", &self.canonicalizers)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Evidence record
// =============================================================================

/// An evidence record and the documents it protects.
pub struct EvidenceRecord {
    source: Box<dyn SequenceSource>,
    filename: Option<String>,
    detached_contents: Vec<DataObject>,
    canonicalizers: CanonicalizerRegistry,
    config: VerifierConfig,
    sequence: OnceLock<Result<ArchiveTimeStampSequence, EvidenceRecordError>>,
    timestamps: OnceLock<Result<TimestampSource, EvidenceRecordError>>,
    reference_validation: OnceLock<SequenceReport>,
}

impl EvidenceRecord {
    /// Starts building a record over `source`.
    #[must_use]
    pub fn builder(source: impl SequenceSource + 'static) -> EvidenceRecordBuilder {
        EvidenceRecordBuilder::new(source)
    }

    /// Returns the evidence-record file name.
    #[must_use]
    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    /// Returns the detached documents.
    #[must_use]
    pub fn detached_contents(&self) -> &[DataObject] {
        &self.detached_contents
    }

    /// Returns the verifier configuration.
    #[must_use]
    pub const fn config(&self) -> &VerifierConfig {
        &self.config
    }

    /// Returns the sequence, building it on first access.
    ///
    /// # Errors
    ///
    /// Returns the source's error; a failed build is cached like a
    /// successful one.
    pub fn archive_time_stamp_sequence(
        &self,
    ) -> Result<&ArchiveTimeStampSequence, EvidenceRecordError> {
        self.sequence
            .get_or_init(|| {
                debug!(filename = ?self.filename, "building archive time-stamp sequence");
                self.source.build_sequence()
            })
            .as_ref()
            .map_err(Clone::clone)
    }

    /// Returns the timestamp references, collecting them on first access.
    ///
    /// # Errors
    ///
    /// Returns the sequence source's error.
    pub fn timestamp_source(&self) -> Result<&TimestampSource, EvidenceRecordError> {
        self.timestamps
            .get_or_init(|| self.archive_time_stamp_sequence().map(TimestampSource::collect))
            .as_ref()
            .map_err(Clone::clone)
    }

    /// Returns every timestamp token with its position, in sequence order.
    ///
    /// # Errors
    ///
    /// Returns the sequence source's error.
    pub fn timestamps(&self) -> Result<&[TimestampEntry], EvidenceRecordError> {
        self.timestamp_source().map(TimestampSource::entries)
    }

    /// Returns the structural errors of the sequence, empty if it is
    /// well-formed. A failing sequence source is reported as one error.
    #[must_use]
    pub fn validate_structure(&self) -> Vec<String> {
        match self.archive_time_stamp_sequence() {
            Ok(sequence) => sequence
                .validate_structure(&self.config.limits)
                .iter()
                .map(ToString::to_string)
                .collect(),
            Err(e) => vec![e.to_string()],
        }
    }

    /// Returns the reference-validation report, verifying on first access.
    ///
    /// A failing sequence source yields a report whose only content is that
    /// failure as a structural error.
    #[must_use]
    pub fn reference_validation(&self) -> &SequenceReport {
        self.reference_validation.get_or_init(|| {
            match self.archive_time_stamp_sequence() {
                Ok(sequence) => {
                    SequenceVerifier::new(sequence, &self.canonicalizers, &self.config)
                        .verify(&self.detached_contents)
                },
                Err(e) => SequenceReport::malformed(vec![e.to_string()]),
            }
        })
    }

    /// Checks every derived digest with `verifier` and returns the pass/fail
    /// per object.
    ///
    /// # Errors
    ///
    /// Returns the sequence source's error.
    pub fn conclude(
        &self,
        verifier: &dyn ImprintVerifier,
    ) -> Result<Vec<ObjectConclusion>, EvidenceRecordError> {
        let source = self.timestamp_source()?;
        Ok(self.reference_validation().conclude(source, verifier))
    }
}

impl fmt::Debug for EvidenceRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EvidenceRecord")
            .field("filename", &self.filename)
            .field("detached_contents", &self.detached_contents.len())
            .field("sequence_built", &self.sequence.get().is_some())
            .field("verified", &self.reference_validation.get().is_some())
            .finish_non_exhaustive()
    }
}
