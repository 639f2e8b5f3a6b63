//! `ers inspect`: prints the structure of an evidence record.
//!
//! No documents are needed. The command lists every chain and archive
//! timestamp and reports structural violations.
//!
//! # Exit Codes
//!
//! - 0: Record is well-formed
//! - 1: Error (unreadable input, invalid record)
//! - 2: Record has structural violations

use std::path::PathBuf;

use clap::Args;
use ers_core::config::VerifierConfig;
use ers_core::crypto::Digest;
use ers_core::model::{ArchiveTimeStampSequence, DigestGroup, RecordSyntax};
use serde::Serialize;

use super::{MAX_RECORD_FILE_SIZE, exit_codes, output_error, read_bounded};

/// Arguments for `ers inspect`.
#[derive(Debug, Args)]
pub struct InspectArgs {
    /// Evidence record in JSON interchange form.
    pub record: PathBuf,

    /// Output format (text or json).
    #[arg(long, default_value = "false")]
    pub json: bool,
}

/// JSON output of `ers inspect`.
#[derive(Debug, Serialize)]
pub struct InspectResponse {
    /// Record syntax.
    pub syntax: RecordSyntax,
    /// Chains in order.
    pub chains: Vec<ChainSummary>,
    /// Structural violations; empty for a well-formed record.
    pub structural_errors: Vec<String>,
}

/// One chain of [`InspectResponse`].
#[derive(Debug, Serialize)]
pub struct ChainSummary {
    /// Chain order.
    pub order: u32,
    /// Digest algorithm name.
    pub digest_algorithm: String,
    /// Canonicalization method identifier.
    pub canonicalization_method: String,
    /// Archive timestamps in order.
    pub archive_time_stamps: Vec<TimeStampSummary>,
}

/// One archive timestamp of [`ChainSummary`].
#[derive(Debug, Serialize)]
pub struct TimeStampSummary {
    /// Archive-timestamp order.
    pub order: u32,
    /// Number of hash tree levels.
    pub tree_depth: usize,
    /// Number of digests in the leaf group.
    pub leaf_group_size: usize,
    /// Timestamp token identifier.
    pub token_id: String,
    /// Declared message imprint, hex-encoded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_imprint: Option<String>,
}

impl InspectResponse {
    fn summarize(sequence: &ArchiveTimeStampSequence, config: &VerifierConfig) -> Self {
        let chains = sequence
            .chains()
            .iter()
            .map(|chain| ChainSummary {
                order: chain.order,
                digest_algorithm: chain.digest_algorithm.to_string(),
                canonicalization_method: chain.canonicalization_method.clone(),
                archive_time_stamps: chain
                    .archive_time_stamps
                    .iter()
                    .map(|ats| TimeStampSummary {
                        order: ats.order,
                        tree_depth: ats.hash_tree.depth(),
                        leaf_group_size: ats.hash_tree.first_group().map_or(0, DigestGroup::len),
                        token_id: ats.time_stamp.id.clone(),
                        message_imprint: ats
                            .time_stamp
                            .message_imprint
                            .as_ref()
                            .map(Digest::to_hex),
                    })
                    .collect(),
            })
            .collect();

        Self {
            syntax: sequence.syntax(),
            chains,
            structural_errors: sequence
                .validate_structure(&config.limits)
                .iter()
                .map(ToString::to_string)
                .collect(),
        }
    }
}

/// Execute `ers inspect`.
pub fn run_inspect(args: &InspectArgs, config: &VerifierConfig) -> u8 {
    let json_output = args.json;

    let bytes = match read_bounded(&args.record, MAX_RECORD_FILE_SIZE) {
        Ok(bytes) => bytes,
        Err(message) => return output_error(json_output, "io_error", &message, exit_codes::ERROR),
    };
    let sequence: ArchiveTimeStampSequence = match serde_json::from_slice(&bytes) {
        Ok(sequence) => sequence,
        Err(e) => {
            return output_error(
                json_output,
                "invalid_record",
                &format!("failed to parse evidence record: {e}"),
                exit_codes::ERROR,
            );
        },
    };

    let response = InspectResponse::summarize(&sequence, config);
    if json_output {
        println!(
            "{}",
            serde_json::to_string_pretty(&response).unwrap_or_else(|_| "{}".to_string())
        );
    } else {
        print_text(&response);
    }

    if response.structural_errors.is_empty() {
        exit_codes::SUCCESS
    } else {
        exit_codes::VERIFICATION_FAILED
    }
}

fn print_text(response: &InspectResponse) {
    let syntax = match response.syntax {
        RecordSyntax::Asn1 => "ASN.1 (RFC 4998)",
        RecordSyntax::Xml => "XML (RFC 6283)",
    };
    println!("Syntax: {syntax}");
    println!("Chains: {}", response.chains.len());
    for chain in &response.chains {
        println!(
            "  Chain {} [{}, {}]",
            chain.order, chain.digest_algorithm, chain.canonicalization_method
        );
        for ats in &chain.archive_time_stamps {
            println!(
                "    ATS {}: depth {}, {} leaf digest(s), token {}",
                ats.order, ats.tree_depth, ats.leaf_group_size, ats.token_id
            );
        }
    }

    if !response.structural_errors.is_empty() {
        println!();
        println!("Structural errors:");
        for error in &response.structural_errors {
            println!("  - {error}");
        }
    }
}
