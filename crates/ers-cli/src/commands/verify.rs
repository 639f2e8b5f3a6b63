//! `ers verify`: checks detached documents against an evidence record.
//!
//! The record is read in its JSON interchange form. Documents are given as
//! files (`--document`) or, when only their digests are known, as
//! `--digest NAME=ALGORITHM:HEX` (repeat with the same name to supply one
//! digest per chain algorithm).
//!
//! # Exit Codes
//!
//! - 0: Every protected object verified
//! - 1: Error (unreadable input, invalid record)
//! - 2: Verification failed for at least one object

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use clap::Args;
use ers_core::{EvidenceRecord, JsonSequenceSource};
use ers_core::config::VerifierConfig;
use ers_core::crypto::{Digest, DigestAlgorithm};
use ers_core::model::DataObject;
use ers_core::timestamp::DeclaredImprintVerifier;
use ers_core::verifier::{ObjectConclusion, ObjectVerdict};
use serde::Serialize;
use tracing::info;

use super::{
    MAX_DOCUMENT_FILE_SIZE, MAX_RECORD_FILE_SIZE, exit_codes, output_error, read_bounded,
};

/// Arguments for `ers verify`.
#[derive(Debug, Args)]
pub struct VerifyArgs {
    /// Evidence record in JSON interchange form.
    pub record: PathBuf,

    /// Detached document protected by the record (repeatable).
    #[arg(short, long = "document")]
    pub documents: Vec<PathBuf>,

    /// Pre-hashed document as NAME=ALGORITHM:HEX (repeatable).
    #[arg(long = "digest", value_parser = parse_digest_arg)]
    pub digests: Vec<DigestArg>,

    /// Only derive digests; do not compare them with the imprints declared
    /// in the record.
    #[arg(long)]
    pub skip_imprints: bool,

    /// Output format (text or json).
    #[arg(long, default_value = "false")]
    pub json: bool,
}

/// One `--digest` argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestArg {
    /// Document name.
    pub name: String,
    /// The digest.
    pub digest: Digest,
}

/// Parses `NAME=ALGORITHM:HEX`.
fn parse_digest_arg(arg: &str) -> Result<DigestArg, String> {
    let (name, digest) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=ALGORITHM:HEX, got '{arg}'"))?;
    let (algorithm, value) = digest
        .split_once(':')
        .ok_or_else(|| format!("expected ALGORITHM:HEX after '=', got '{digest}'"))?;
    if name.is_empty() {
        return Err("document name must not be empty".to_string());
    }

    let algorithm: DigestAlgorithm = algorithm.parse::<DigestAlgorithm>().map_err(|e| e.to_string())?;
    let value = hex::decode(value).map_err(|e| format!("invalid hex digest: {e}"))?;
    let digest = Digest::checked(algorithm, value).map_err(|e| e.to_string())?;
    Ok(DigestArg {
        name: name.to_string(),
        digest,
    })
}

/// JSON output of `ers verify`.
#[derive(Debug, Serialize)]
pub struct VerifyResponse<'a> {
    /// The record file.
    pub record: String,
    /// True if every object verified.
    pub intact: bool,
    /// Fatal structural errors.
    pub structural_errors: &'a [String],
    /// Per-object derivation results.
    pub verdicts: &'a [ObjectVerdict],
    /// Per-object pass/fail after the imprint comparison.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conclusions: Option<&'a [ObjectConclusion]>,
}

/// Execute `ers verify`.
pub fn run_verify(args: &VerifyArgs, config: &VerifierConfig) -> u8 {
    let json_output = args.json;

    let record_bytes = match read_bounded(&args.record, MAX_RECORD_FILE_SIZE) {
        Ok(bytes) => bytes,
        Err(message) => return output_error(json_output, "io_error", &message, exit_codes::ERROR),
    };
    let Ok(record_json) = String::from_utf8(record_bytes) else {
        return output_error(
            json_output,
            "invalid_record",
            "evidence record is not valid UTF-8",
            exit_codes::ERROR,
        );
    };

    let documents = match load_documents(&args.documents, &args.digests) {
        Ok(documents) => documents,
        Err(message) => return output_error(json_output, "io_error", &message, exit_codes::ERROR),
    };

    let record = match EvidenceRecord::builder(JsonSequenceSource::new(record_json))
        .filename(args.record.display().to_string())
        .detached_contents(documents)
        .config(config.clone())
        .build()
    {
        Ok(record) => record,
        Err(e) => {
            return output_error(json_output, "invalid_config", &e.to_string(), exit_codes::ERROR);
        },
    };
    if let Err(e) = record.archive_time_stamp_sequence() {
        return output_error(json_output, "invalid_record", &e.to_string(), exit_codes::ERROR);
    }

    let report = record.reference_validation();
    let conclusions = if args.skip_imprints {
        None
    } else {
        match record.conclude(&DeclaredImprintVerifier) {
            Ok(conclusions) => Some(conclusions),
            Err(e) => {
                return output_error(
                    json_output,
                    "invalid_record",
                    &e.to_string(),
                    exit_codes::ERROR,
                );
            },
        }
    };

    let intact = report.is_structurally_sound()
        && !report.verdicts().is_empty()
        && match &conclusions {
            Some(conclusions) => conclusions.iter().all(|conclusion| conclusion.intact),
            None => report
                .verdicts()
                .iter()
                .all(|verdict| verdict.status.is_matched()),
        };
    info!(
        record = %args.record.display(),
        objects = report.verdicts().len(),
        intact,
        "verification finished"
    );

    if json_output {
        let response = VerifyResponse {
            record: args.record.display().to_string(),
            intact,
            structural_errors: report.structural_errors(),
            verdicts: report.verdicts(),
            conclusions: conclusions.as_deref(),
        };
        println!(
            "{}",
            serde_json::to_string_pretty(&response).unwrap_or_else(|_| "{}".to_string())
        );
    } else {
        print_text(
            &args.record,
            report.structural_errors(),
            report.verdicts(),
            conclusions.as_deref(),
        );
        println!();
        println!("Result: {}", if intact { "INTACT" } else { "FAILED" });
    }

    if intact {
        exit_codes::SUCCESS
    } else {
        exit_codes::VERIFICATION_FAILED
    }
}

/// Reads document files and groups `--digest` arguments by name.
fn load_documents(paths: &[PathBuf], digests: &[DigestArg]) -> Result<Vec<DataObject>, String> {
    let mut documents = Vec::with_capacity(paths.len() + digests.len());
    for path in paths {
        let content = read_bounded(path, MAX_DOCUMENT_FILE_SIZE)?;
        let name = path
            .file_name()
            .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());
        documents.push(DataObject::detached(name, content));
    }

    let mut by_name: BTreeMap<&str, Vec<Digest>> = BTreeMap::new();
    for arg in digests {
        by_name
            .entry(arg.name.as_str())
            .or_default()
            .push(arg.digest.clone());
    }
    documents.extend(
        by_name
            .into_iter()
            .map(|(name, digests)| DataObject::digested(name, digests)),
    );
    Ok(documents)
}

fn print_text(
    record: &Path,
    structural_errors: &[String],
    verdicts: &[ObjectVerdict],
    conclusions: Option<&[ObjectConclusion]>,
) {
    println!("Evidence record: {}", record.display());

    if !structural_errors.is_empty() {
        println!("Structural errors:");
        for error in structural_errors {
            println!("  - {error}");
        }
        return;
    }

    println!("Objects: {}", verdicts.len());
    for (index, verdict) in verdicts.iter().enumerate() {
        let name = verdict
            .object
            .clone()
            .unwrap_or_else(|| format!("<leaf {}>", truncate(&verdict.leaf.to_hex(), 16)));
        let outcome = match conclusions.and_then(|c| c.get(index)) {
            Some(conclusion) if conclusion.intact => "intact".to_string(),
            Some(conclusion) => format!(
                "FAILED: {}",
                conclusion.reason.as_deref().unwrap_or("unknown reason")
            ),
            None if verdict.status.is_matched() => "matched".to_string(),
            None => format!("FAILED: {}", verdict.status),
        };
        println!("  {name:<32} {outcome}");
        if let Some(root) = verdict.expected_root() {
            println!("    expected imprint: {root}");
        }
    }
}

/// Truncate a string to max length.
fn truncate(s: &str, max_len: usize) -> &str {
    s.get(..max_len).unwrap_or(s)
}

#[cfg(test)]
mod tests {
    use ers_core::canonical::DER_METHOD;
    use ers_core::model::{
        ArchiveTimeStamp, ArchiveTimeStampChain, ArchiveTimeStampSequence, RecordSyntax,
        ReducedHashTree, TimestampToken,
    };

    use super::*;

    const SHA256: DigestAlgorithm = DigestAlgorithm::Sha256;

    /// A single-timestamp record over `report.pdf` and `notes.txt`, written
    /// to a temporary directory along with both documents.
    struct Fixture {
        dir: tempfile::TempDir,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            std::fs::write(dir.path().join("report.pdf"), b"%PDF-1.7 report").unwrap();
            std::fs::write(dir.path().join("notes.txt"), b"meeting notes").unwrap();

            let leaves = vec![
                SHA256.digest(b"%PDF-1.7 report").into_value(),
                SHA256.digest(b"meeting notes").into_value(),
            ];
            let mut sorted = leaves.clone();
            sorted.sort();
            let root = SHA256.digest_parts(&[sorted[0].as_slice(), sorted[1].as_slice()]);

            let sequence = ArchiveTimeStampSequence::new(RecordSyntax::Asn1, vec![
                ArchiveTimeStampChain::new(1, SHA256, DER_METHOD, vec![ArchiveTimeStamp::new(
                    1,
                    ReducedHashTree::from_values(vec![leaves]),
                    TimestampToken::new("ts-1", vec![0x30, 0x00]).with_message_imprint(root),
                )]),
            ]);
            std::fs::write(
                dir.path().join("record.json"),
                serde_json::to_string(&sequence).unwrap(),
            )
            .unwrap();
            Self { dir }
        }

        fn path(&self, name: &str) -> PathBuf {
            self.dir.path().join(name)
        }

        fn args(&self, documents: &[&str]) -> VerifyArgs {
            VerifyArgs {
                record: self.path("record.json"),
                documents: documents.iter().map(|name| self.path(name)).collect(),
                digests: Vec::new(),
                skip_imprints: false,
                json: false,
            }
        }
    }

    #[test]
    fn test_verify_intact_record() {
        let fixture = Fixture::new();
        let args = fixture.args(&["notes.txt", "report.pdf"]);
        assert_eq!(
            run_verify(&args, &VerifierConfig::default()),
            exit_codes::SUCCESS
        );
    }

    #[test]
    fn test_verify_missing_document_fails() {
        let fixture = Fixture::new();
        let mut args = fixture.args(&["report.pdf"]);
        args.json = true;
        assert_eq!(
            run_verify(&args, &VerifierConfig::default()),
            exit_codes::VERIFICATION_FAILED
        );
    }

    #[test]
    fn test_verify_with_precomputed_digest() {
        let fixture = Fixture::new();
        let mut args = fixture.args(&["report.pdf"]);
        args.digests = vec![
            parse_digest_arg(&format!(
                "notes.txt=SHA-256:{}",
                SHA256.digest(b"meeting notes").to_hex()
            ))
            .unwrap(),
        ];
        assert_eq!(
            run_verify(&args, &VerifierConfig::default()),
            exit_codes::SUCCESS
        );
    }

    #[test]
    fn test_verify_unreadable_record_is_error() {
        let fixture = Fixture::new();
        std::fs::write(fixture.path("record.json"), b"{ not json").unwrap();
        let args = fixture.args(&["report.pdf"]);
        assert_eq!(
            run_verify(&args, &VerifierConfig::default()),
            exit_codes::ERROR
        );

        let mut args = fixture.args(&[]);
        args.record = fixture.path("absent.json");
        assert_eq!(
            run_verify(&args, &VerifierConfig::default()),
            exit_codes::ERROR
        );
    }

    #[test]
    fn test_verify_structural_limit_fails() {
        let fixture = Fixture::new();
        let mut config = VerifierConfig::default();
        config.limits.max_group_size = 1;
        let args = fixture.args(&["notes.txt", "report.pdf"]);
        assert_eq!(run_verify(&args, &config), exit_codes::VERIFICATION_FAILED);
    }

    #[test]
    fn test_parse_digest_arg() {
        let hex = SHA256.digest(b"x").to_hex();
        let arg = parse_digest_arg(&format!("x.bin=sha256:{hex}")).unwrap();
        assert_eq!(arg.name, "x.bin");
        assert_eq!(arg.digest, SHA256.digest(b"x"));

        assert!(parse_digest_arg("x.bin").is_err());
        assert!(parse_digest_arg("x.bin=sha256").is_err());
        assert!(parse_digest_arg("=sha256:00").is_err());
        assert!(parse_digest_arg("x.bin=md5:00").is_err());
        assert!(parse_digest_arg("x.bin=sha256:abcd").is_err());
    }

    #[test]
    fn test_digests_with_same_name_form_one_object() {
        let args = vec![
            parse_digest_arg(&format!("a=sha256:{}", SHA256.digest(b"a").to_hex())).unwrap(),
            parse_digest_arg(&format!(
                "a=sha512:{}",
                DigestAlgorithm::Sha512.digest(b"a").to_hex()
            ))
            .unwrap(),
        ];
        let documents = load_documents(&[], &args).unwrap();
        assert_eq!(documents.len(), 1);
        assert!(documents[0].precomputed_digest(DigestAlgorithm::Sha512).is_some());
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("abcdef", 4), "abcd");
        assert_eq!(truncate("ab", 4), "ab");
    }
}
