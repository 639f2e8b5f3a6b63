//! End-to-end verification of complete evidence records against fixed
//! digest vectors.

use std::borrow::Cow;

use ers_core::canonical::{CanonicalizationError, Canonicalizer, CanonicalizerRegistry};
use ers_core::crypto::{Digest, DigestAlgorithm};
use ers_core::model::{
    ArchiveTimeStamp, ArchiveTimeStampChain, ArchiveTimeStampSequence, DataObject, RecordSyntax,
    ReducedHashTree, TimestampToken,
};
use ers_core::timestamp::DeclaredImprintVerifier;
use ers_core::{EvidenceRecord, JsonSequenceSource, ReferenceStatus};
use serde_json::Value;

const ASN1_FIXTURE: &str = include_str!("fixtures/asn1_renewed.json");

const DOCUMENT_A: &[u8] = b"archived document A";
const DOCUMENT_B: &[u8] = b"archived document B";

fn digest(algorithm: DigestAlgorithm, hex: &str) -> Digest {
    Digest::checked(algorithm, hex::decode(hex).unwrap()).unwrap()
}

fn documents() -> Vec<DataObject> {
    vec![
        DataObject::detached("a.bin", DOCUMENT_A.to_vec()),
        DataObject::detached("b.bin", DOCUMENT_B.to_vec()),
    ]
}

// =============================================================================
// RFC 6283 layout
// =============================================================================

const CONCAT_METHOD: &str = "urn:test:concat";

/// Documents and tokens verbatim; a sequence prefix is the concatenation of
/// its archive-timestamp encodings.
struct ConcatCanonicalizer;

impl Canonicalizer for ConcatCanonicalizer {
    fn canonicalize_document<'a>(
        &self,
        content: &'a [u8],
    ) -> Result<Cow<'a, [u8]>, CanonicalizationError> {
        Ok(Cow::Borrowed(content))
    }

    fn canonicalize_time_stamp(
        &self,
        time_stamp: &ArchiveTimeStamp,
    ) -> Result<Vec<u8>, CanonicalizationError> {
        Ok(time_stamp.time_stamp.encoded.clone())
    }

    fn canonicalize_sequence(
        &self,
        _syntax: RecordSyntax,
        chains: &[ArchiveTimeStampChain],
    ) -> Result<Vec<u8>, CanonicalizationError> {
        Ok(chains
            .iter()
            .flat_map(|chain| &chain.archive_time_stamps)
            .flat_map(|ats| ats.encoded.iter().copied())
            .collect())
    }
}

const XML_ROOT_1: &str = "207d4c992769b665112abdb4312afd84dc4ab398264af4d6b4053080b3ee0ac3";
const XML_ROOT_2: &str = "3f08aace122ee2368432c1ca23a049bc640bafbf00fdf33a52429f38ba12dbf9";
const XML_SEQUENCE_LEAF: &str = "4da06a38c24a18592ba6152ed749d8a6173dbc4aa83567b7d93aef4595f68ad3\
                                 da7a088429f2e1d45d76d61acf54b91ad800aa44b11204e1a05d207643466c02";
const XML_OBJECT_LEAF: &str = "0baef2c6e6f52dc0ef608ad2f89d053ee970ff6135a8ab381cf976aa722435d2\
                               31c9c5fb2b7ee92ed777ac3bb906fa84dfb00aeb5641731c03234dad77d851f0";
const XML_ROOT_3: &str = "ce6db227a425024b555bebe2e9c488c2191104c472a8033fd05887c5a7651fd0\
                          71c8a4831ec2631681c09f417443de4010b96d4420c7da10e7338c8576df1c82";

fn xml_sequence() -> ArchiveTimeStampSequence {
    let sha256 = DigestAlgorithm::Sha256;
    let sha512 = DigestAlgorithm::Sha512;
    let value = |hex: &str| hex::decode(hex).unwrap();
    let token = |id: &str, algorithm, root: &str| {
        TimestampToken::new(id, format!("token-{}", &id[3..]).into_bytes())
            .with_message_imprint(digest(algorithm, root))
    };

    ArchiveTimeStampSequence::new(RecordSyntax::Xml, vec![
        ArchiveTimeStampChain::new(1, sha256, CONCAT_METHOD, vec![
            ArchiveTimeStamp::new(
                1,
                ReducedHashTree::from_values(vec![vec![value(XML_ROOT_1)]]),
                token("ts-1", sha256, XML_ROOT_1),
            )
            .with_encoded(b"ats-1".to_vec()),
            ArchiveTimeStamp::new(
                2,
                ReducedHashTree::from_values(vec![vec![value(XML_ROOT_2)]]),
                token("ts-2", sha256, XML_ROOT_2),
            )
            .with_encoded(b"ats-2".to_vec()),
        ]),
        ArchiveTimeStampChain::new(2, sha512, CONCAT_METHOD, vec![
            ArchiveTimeStamp::new(
                1,
                ReducedHashTree::from_values(vec![vec![
                    value(XML_OBJECT_LEAF),
                    value(XML_SEQUENCE_LEAF),
                ]]),
                token("ts-3", sha512, XML_ROOT_3),
            )
            .with_encoded(b"ats-3".to_vec()),
        ]),
    ])
}

fn concat_registry() -> CanonicalizerRegistry {
    let mut registry = CanonicalizerRegistry::with_defaults();
    registry.register(CONCAT_METHOD, ConcatCanonicalizer);
    registry
}

#[test]
fn test_xml_record_derives_literal_digests() {
    let record = EvidenceRecord::builder(xml_sequence())
        .filename("record.xml")
        .detached_content(DataObject::detached("a.bin", DOCUMENT_A.to_vec()))
        .canonicalizers(concat_registry())
        .build()
        .unwrap();

    let report = record.reference_validation();
    assert!(report.is_structurally_sound());
    assert_eq!(report.verdicts().len(), 1);

    let verdict = &report.verdicts()[0];
    assert_eq!(verdict.status, ReferenceStatus::Matched);
    assert_eq!(verdict.object.as_deref(), Some("a.bin"));

    let roots: Vec<String> = verdict
        .imprints
        .iter()
        .map(|imprint| imprint.root.to_hex())
        .collect();
    assert_eq!(roots, vec![XML_ROOT_1, XML_ROOT_2, XML_ROOT_3]);
    assert_eq!(
        verdict.imprint(2, 1).unwrap().leaf.to_hex(),
        XML_SEQUENCE_LEAF
    );

    let conclusions = record.conclude(&DeclaredImprintVerifier).unwrap();
    assert!(conclusions[0].intact, "{:?}", conclusions[0].reason);
}

#[test]
fn test_xml_record_timestamps_in_sequence_order() {
    let record = EvidenceRecord::builder(xml_sequence())
        .canonicalizers(concat_registry())
        .build()
        .unwrap();
    let ids: Vec<&str> = record
        .timestamps()
        .unwrap()
        .iter()
        .map(|entry| entry.token.id.as_str())
        .collect();
    assert_eq!(ids, vec!["ts-1", "ts-2", "ts-3"]);
}

// =============================================================================
// RFC 4998 layout (DER)
// =============================================================================

const ASN1_ROOT_1: &str = "6131f6dea386f45d33c9ceec94698e6429d93cec102684222f71d93eb4f9c9df";
const ASN1_ROOT_2: &str = "1b65f68a522c858715f5dd951cd0402dc16691778814bf0759822b7a257421d0";
const ASN1_LEAF_A: &str = "c80c8aae1f218a60da02527c7f1cb2b2e678923d6bf32c933639a33bfb0e96a3\
                           6c379ba6523cf5b6d80a700e167a59a0a1792c416990629f9a964e7eb01464b3";
const ASN1_ROOT_3: &str = "632528e1c4a6f26486fc11d72c6f158483a8211dcbf26804dfe2aa3c83196848\
                           a929d135ab197c547d80bce4e041f7d3a784ece709a262d2ac83f5d146acfdcf";

fn asn1_record(json: impl Into<String>, documents: Vec<DataObject>) -> EvidenceRecord {
    EvidenceRecord::builder(JsonSequenceSource::new(json))
        .filename("record.ers")
        .detached_contents(documents)
        .build()
        .unwrap()
}

fn edited_fixture(edit: impl FnOnce(&mut Value)) -> String {
    let mut value: Value = serde_json::from_str(ASN1_FIXTURE).unwrap();
    edit(&mut value);
    value.to_string()
}

#[test]
fn test_asn1_fixture_verifies() {
    let record = asn1_record(ASN1_FIXTURE, documents());
    assert!(record.validate_structure().is_empty());

    let report = record.reference_validation();
    assert_eq!(report.verdicts().len(), 2);

    let a = report.verdict_for("a.bin").unwrap();
    assert_eq!(a.status, ReferenceStatus::Matched);
    assert_eq!(a.imprint(1, 1).unwrap().root.to_hex(), ASN1_ROOT_1);
    assert_eq!(a.imprint(1, 2).unwrap().root.to_hex(), ASN1_ROOT_2);
    assert_eq!(a.imprint(2, 1).unwrap().leaf.to_hex(), ASN1_LEAF_A);
    assert_eq!(a.expected_root().unwrap().to_hex(), ASN1_ROOT_3);

    let b = report.verdict_for("b.bin").unwrap();
    assert_eq!(b.expected_root().unwrap().to_hex(), ASN1_ROOT_3);

    let conclusions = record.conclude(&DeclaredImprintVerifier).unwrap();
    assert_eq!(conclusions.len(), 2);
    assert!(conclusions.iter().all(|conclusion| conclusion.intact));
}

#[test]
fn test_tampered_document_fails_alone() {
    let documents = vec![
        DataObject::detached("a.bin", b"archived document a".to_vec()),
        DataObject::detached("b.bin", DOCUMENT_B.to_vec()),
    ];
    let record = asn1_record(ASN1_FIXTURE, documents);

    let conclusions = record.conclude(&DeclaredImprintVerifier).unwrap();
    let intact: Vec<(Option<&str>, bool)> = conclusions
        .iter()
        .map(|conclusion| (conclusion.object.as_deref(), conclusion.intact))
        .collect();
    assert_eq!(intact, vec![(None, false), (Some("b.bin"), true)]);
    assert_eq!(
        conclusions[0].reason.as_deref(),
        Some("no matching document")
    );
}

#[test]
fn test_precomputed_digests_need_every_algorithm() {
    let sha256 = DigestAlgorithm::Sha256;
    let sha512 = DigestAlgorithm::Sha512;
    let documents = vec![
        DataObject::digested("a.bin", [sha256.digest(DOCUMENT_A), sha512.digest(DOCUMENT_A)]),
        DataObject::digested("b.bin", [sha256.digest(DOCUMENT_B)]),
    ];
    let record = asn1_record(ASN1_FIXTURE, documents);
    let report = record.reference_validation();

    assert_eq!(
        report.verdict_for("a.bin").unwrap().status,
        ReferenceStatus::Matched
    );
    assert!(matches!(
        report.verdict_for("b.bin").unwrap().status,
        ReferenceStatus::StructuralError {
            chain_order: 2,
            ats_order: 1,
            ..
        }
    ));
}

#[test]
fn test_chain_gap_rejects_whole_record() {
    let json = edited_fixture(|value| value["chains"][0]["order"] = Value::from(3));
    let record = asn1_record(json, documents());

    let errors = record.validate_structure();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("expected 2, found 3"));

    let report = record.reference_validation();
    assert!(report.verdicts().is_empty());
    assert_eq!(report.structural_errors(), errors.as_slice());
    assert!(record.conclude(&DeclaredImprintVerifier).unwrap().is_empty());
}

#[test]
fn test_wrong_declared_imprint_fails_conclusion() {
    let json = edited_fixture(|value| {
        value["chains"][0]["archive_time_stamps"][0]["time_stamp"]["message_imprint"]["value"] =
            Value::from(ASN1_LEAF_A);
    });
    let record = asn1_record(json, documents());

    // Derivation does not look at the declared imprint.
    assert!(
        record
            .reference_validation()
            .verdicts()
            .iter()
            .all(|verdict| verdict.status == ReferenceStatus::Matched)
    );

    let conclusions = record.conclude(&DeclaredImprintVerifier).unwrap();
    for conclusion in &conclusions {
        assert!(!conclusion.intact);
        assert!(
            conclusion
                .reason
                .as_deref()
                .is_some_and(|reason| reason.contains("2.1"))
        );
    }
}

#[test]
fn test_altered_renewal_encoding_breaks_chain_renewal() {
    let json = edited_fixture(|value| {
        // DER INTEGER 10 becomes 11 in the first archive timestamp's encoding.
        value["chains"][1]["archive_time_stamps"][1]["encoded"] = Value::from("MAMCAQs=");
    });
    let record = asn1_record(json, documents());

    for verdict in record.reference_validation().verdicts() {
        assert_eq!(verdict.status, ReferenceStatus::RenewalMismatch {
            chain_order: 2,
            ats_order: 1,
        });
        assert_eq!(verdict.imprints.len(), 2);
    }
}

#[test]
fn test_independent_records_verify_concurrently() {
    let records: Vec<EvidenceRecord> = (0..4)
        .map(|_| asn1_record(ASN1_FIXTURE, documents()))
        .collect();

    std::thread::scope(|scope| {
        for record in &records {
            scope.spawn(move || {
                let conclusions = record.conclude(&DeclaredImprintVerifier).unwrap();
                assert!(conclusions.iter().all(|conclusion| conclusion.intact));
            });
        }
    });
}
