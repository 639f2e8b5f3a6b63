//! CLI command implementations.

pub mod inspect;
pub mod verify;

use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Maximum evidence-record file size (16 MiB).
pub const MAX_RECORD_FILE_SIZE: u64 = 16 * 1024 * 1024;

/// Maximum detached document size (1 GiB).
pub const MAX_DOCUMENT_FILE_SIZE: u64 = 1024 * 1024 * 1024;

/// Exit codes shared by every command.
pub mod exit_codes {
    /// Every object verified (or the record is well-formed, for `inspect`).
    pub const SUCCESS: u8 = 0;
    /// Input could not be read or parsed.
    pub const ERROR: u8 = 1;
    /// The record was read but failed verification.
    pub const VERIFICATION_FAILED: u8 = 2;
}

/// Error response for JSON output.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ErrorResponse {
    /// Error code.
    pub code: String,
    /// Error message.
    pub message: String,
}

/// Reads a file, refusing anything larger than `max_size` bytes.
pub fn read_bounded(path: &Path, max_size: u64) -> Result<Vec<u8>, String> {
    let file = std::fs::File::open(path)
        .map_err(|e| format!("failed to open {}: {e}", path.display()))?;
    let mut content = Vec::new();
    file.take(max_size + 1)
        .read_to_end(&mut content)
        .map_err(|e| format!("failed to read {}: {e}", path.display()))?;
    if content.len() as u64 > max_size {
        return Err(format!(
            "{} exceeds maximum size of {max_size} bytes",
            path.display()
        ));
    }
    Ok(content)
}

/// Prints an error in the requested format and returns `exit_code`.
pub fn output_error(json_output: bool, code: &str, message: &str, exit_code: u8) -> u8 {
    if json_output {
        let error = ErrorResponse {
            code: code.to_string(),
            message: message.to_string(),
        };
        eprintln!(
            "{}",
            serde_json::to_string_pretty(&error).unwrap_or_else(|_| "{}".to_string())
        );
    } else {
        eprintln!("Error: {message}");
    }
    exit_code
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_read_bounded_rejects_large_files() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&[0u8; 32]).unwrap();

        assert_eq!(read_bounded(file.path(), 32).unwrap().len(), 32);
        let err = read_bounded(file.path(), 31).unwrap_err();
        assert!(err.contains("exceeds maximum size of 31 bytes"));
    }

    #[test]
    fn test_read_bounded_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_bounded(&dir.path().join("absent.json"), 10).unwrap_err();
        assert!(err.starts_with("failed to open"));
    }

    #[test]
    fn test_error_response_rejects_unknown_fields() {
        let json = r#"{"code": "io_error", "message": "boom", "extra": 1}"#;
        assert!(serde_json::from_str::<ErrorResponse>(json).is_err());
    }
}
