//! Fuzz harness for sequence loading and reference validation.
//!
//! Arbitrary bytes are parsed as a JSON evidence record and, when they
//! parse, verified against a fixed set of detached documents. Malformed
//! trees, orders and encodings must surface as report entries, never as
//! panics.

#![no_main]
use ers_core::canonical::CanonicalizerRegistry;
use ers_core::config::VerifierConfig;
use ers_core::crypto::DigestAlgorithm;
use ers_core::model::{ArchiveTimeStampSequence, DataObject};
use ers_core::timestamp::{DeclaredImprintVerifier, TimestampSource};
use ers_core::SequenceVerifier;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(sequence) = serde_json::from_slice::<ArchiveTimeStampSequence>(data) else {
        return;
    };

    let documents = [
        DataObject::detached("a", data.to_vec()),
        DataObject::detached("b", b"fixed document".to_vec()),
        DataObject::digested("c", [DigestAlgorithm::Sha256.digest(data)]),
    ];
    let registry = CanonicalizerRegistry::with_defaults();
    let config = VerifierConfig::default();

    let report = SequenceVerifier::new(&sequence, &registry, &config).verify(&documents);
    let source = TimestampSource::collect(&sequence);
    let _ = report.conclude(&source, &DeclaredImprintVerifier);
});
