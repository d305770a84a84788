//! Checksum utilities for table data files

use crate::error::{EtlError, Result};
use sha2::{Digest, Sha256};

/// Hex-encoded SHA-256 of a byte slice
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Verify that `data` hashes to `expected`
///
/// `file` is only used to label the error.
pub fn verify_sha256(file: &str, data: &[u8], expected: &str) -> Result<()> {
    let actual = sha256_hex(data);
    if actual.eq_ignore_ascii_case(expected) {
        Ok(())
    } else {
        Err(EtlError::ChecksumMismatch {
            file: file.to_string(),
            expected: expected.to_string(),
            actual,
        })
    }
}
