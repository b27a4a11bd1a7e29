// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Attachment integrity: SHA-256 fingerprints recorded in export manifests and
// checked again when an archive is imported.

use kamera_core::error::KameraError;
use sha2::{Digest, Sha256};

/// Lowercase hex SHA-256 of `data`.
pub fn hash_bytes(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Check `data` against an expected hex digest (case-insensitive).
pub fn verify_hash(data: &[u8], expected_hex: &str) -> Result<(), KameraError> {
    let actual = hash_bytes(data);
    if actual.eq_ignore_ascii_case(expected_hex) {
        Ok(())
    } else {
        Err(KameraError::IntegrityMismatch {
            expected: expected_hex.to_owned(),
            actual,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_matches_known_digest() {
        assert_eq!(
            hash_bytes(b"hello"),
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[test]
    fn verify_accepts_uppercase_digest() {
        let digest = hash_bytes(b"drawing").to_uppercase();
        assert!(verify_hash(b"drawing", &digest).is_ok());
    }

    #[test]
    fn verify_reports_both_digests_on_mismatch() {
        match verify_hash(b"a", "00") {
            Err(KameraError::IntegrityMismatch { expected, actual }) => {
                assert_eq!(expected, "00");
                assert_eq!(actual, hash_bytes(b"a"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
