//! DER canonicalization for RFC 4998 evidence records.
//!
//! DER is a canonical encoding, so documents and timestamp tokens pass
//! through unchanged. A sequence prefix is re-encoded as
//!
//! ```text
//! ArchiveTimeStampSequence ::= SEQUENCE OF ArchiveTimeStampChain
//! ArchiveTimeStampChain    ::= SEQUENCE OF ArchiveTimeStamp
//! ```
//!
//! from the per-archive-timestamp encodings the parser supplied.

use std::borrow::Cow;

use super::{CanonicalizationError, Canonicalizer};
use crate::model::{ArchiveTimeStamp, ArchiveTimeStampChain, RecordSyntax};

/// Method identifier of DER canonicalization (the `distinguished-encoding`
/// object identifier).
pub const DER_METHOD: &str = "urn:oid:2.1.2.1";

/// Universal tag of a constructed `SEQUENCE`.
const TAG_SEQUENCE: u8 = 0x30;

/// Canonicalizer for DER-encoded evidence records.
#[derive(Debug, Clone, Copy, Default)]
pub struct DerCanonicalizer;

impl Canonicalizer for DerCanonicalizer {
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
        if time_stamp.time_stamp.encoded.is_empty() {
            return Err(CanonicalizationError::MissingEncoding {
                element: "timestamp token",
                ats: time_stamp.order,
            });
        }
        Ok(time_stamp.time_stamp.encoded.clone())
    }

    fn canonicalize_sequence(
        &self,
        _syntax: RecordSyntax,
        chains: &[ArchiveTimeStampChain],
    ) -> Result<Vec<u8>, CanonicalizationError> {
        let mut body = Vec::new();
        for chain in chains {
            let mut chain_body = Vec::new();
            for ats in &chain.archive_time_stamps {
                if ats.encoded.is_empty() {
                    return Err(CanonicalizationError::MissingEncoding {
                        element: "archive time-stamp",
                        ats: ats.order,
                    });
                }
                chain_body.extend_from_slice(&ats.encoded);
            }
            encode_sequence(&mut body, &chain_body);
        }

        let mut out = Vec::with_capacity(body.len() + 6);
        encode_sequence(&mut out, &body);
        Ok(out)
    }
}

/// Appends a DER `SEQUENCE` wrapping `content` to `out`.
fn encode_sequence(out: &mut Vec<u8>, content: &[u8]) {
    out.push(TAG_SEQUENCE);
    encode_length(out, content.len());
    out.extend_from_slice(content);
}

/// Appends a DER definite length (short form below 128, long form above).
fn encode_length(out: &mut Vec<u8>, len: usize) {
    if let Ok(short) = u8::try_from(len) {
        if short < 0x80 {
            out.push(short);
            return;
        }
    }
    let bytes = len.to_be_bytes();
    let skip = bytes.iter().take_while(|b| **b == 0).count();
    let significant = &bytes[skip..];
    // At most size_of::<usize>() bytes, always below 0x80.
    #[allow(clippy::cast_possible_truncation)]
    out.push(0x80 | significant.len() as u8);
    out.extend_from_slice(significant);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::DigestAlgorithm;
    use crate::model::{ReducedHashTree, TimestampToken};

    fn ats(order: u32, encoded: &[u8]) -> ArchiveTimeStamp {
        ArchiveTimeStamp::new(
            order,
            ReducedHashTree::default(),
            TimestampToken::new("ts", b"token".to_vec()),
        )
        .with_encoded(encoded.to_vec())
    }

    #[test]
    fn test_length_forms() {
        let mut out = Vec::new();
        encode_length(&mut out, 0x7f);
        assert_eq!(out, vec![0x7f]);

        out.clear();
        encode_length(&mut out, 0x80);
        assert_eq!(out, vec![0x81, 0x80]);

        out.clear();
        encode_length(&mut out, 0x0123);
        assert_eq!(out, vec![0x82, 0x01, 0x23]);
    }

    #[test]
    fn test_sequence_nests_chains() {
        let chains = vec![ArchiveTimeStampChain::new(
            1,
            DigestAlgorithm::Sha256,
            DER_METHOD,
            vec![ats(1, &[0x01, 0x02]), ats(2, &[0x03])],
        )];
        let encoded = DerCanonicalizer
            .canonicalize_sequence(RecordSyntax::Asn1, &chains)
            .unwrap();
        assert_eq!(encoded, vec![0x30, 0x05, 0x30, 0x03, 0x01, 0x02, 0x03]);
    }

    #[test]
    fn test_empty_prefix_is_empty_sequence() {
        let encoded = DerCanonicalizer
            .canonicalize_sequence(RecordSyntax::Asn1, &[])
            .unwrap();
        assert_eq!(encoded, vec![0x30, 0x00]);
    }

    #[test]
    fn test_missing_encoding_is_reported() {
        let chains = vec![ArchiveTimeStampChain::new(
            1,
            DigestAlgorithm::Sha256,
            DER_METHOD,
            vec![ats(1, &[])],
        )];
        assert_eq!(
            DerCanonicalizer.canonicalize_sequence(RecordSyntax::Asn1, &chains),
            Err(CanonicalizationError::MissingEncoding {
                element: "archive time-stamp",
                ats: 1,
            })
        );
    }

    #[test]
    fn test_documents_and_tokens_pass_through() {
        let doc = b"\x30\x03\x02\x01\x05";
        assert_eq!(
            DerCanonicalizer.canonicalize_document(doc).unwrap().as_ref(),
            doc
        );
        assert_eq!(
            DerCanonicalizer
                .canonicalize_time_stamp(&ats(1, &[0x01]))
                .unwrap(),
            b"token".to_vec()
        );
    }
}
