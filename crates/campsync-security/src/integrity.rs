// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Wristband integrity: truncated keyed SHA-256 prefix for tamper detection.
//
// Wrapped form: "<first N hex chars of sha256(secret ':' payload)>:<payload>".
// This is a keyed checksum, not encryption: the payload stays readable by
// anyone holding the band. It rejects corrupted and foreign bands.

use campsync_core::error::{CampSyncError, Result};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Hex characters of the digest kept on the tag (32 bits).
pub const DEFAULT_PREFIX_LEN: usize = 8;

/// Separates the digest prefix from the payload on the tag.
pub const PREFIX_SEPARATOR: char = ':';

/// Full hex digest of `secret`, the separator, then `plain_text`.
pub fn keyed_digest(plain_text: &str, secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hasher.update([PREFIX_SEPARATOR as u8]);
    hasher.update(plain_text.as_bytes());
    hex::encode(hasher.finalize())
}

/// Prefix `plain_text` with the default-length keyed digest.
pub fn wrap(plain_text: &str, secret: &str) -> String {
    wrap_with_len(plain_text, secret, DEFAULT_PREFIX_LEN)
}

/// Verify and strip a default-length prefix.
pub fn unwrap(wrapped: &str, secret: &str) -> Result<String> {
    unwrap_with_len(wrapped, secret, DEFAULT_PREFIX_LEN)
}

/// Prefix `plain_text` with the first `prefix_len` hex characters of its
/// keyed digest.
pub fn wrap_with_len(plain_text: &str, secret: &str, prefix_len: usize) -> String {
    let digest = keyed_digest(plain_text, secret);
    let prefix = &digest[..prefix_len.min(digest.len())];
    format!("{prefix}{PREFIX_SEPARATOR}{plain_text}")
}

/// Split `wrapped` on its first separator, recompute the digest of the
/// remainder, and return the remainder if the prefixes agree.
///
/// A prefix of the wrong length is rejected outright; otherwise an empty
/// prefix would match any digest.
pub fn unwrap_with_len(wrapped: &str, secret: &str, prefix_len: usize) -> Result<String> {
    let (stored, plain_text) = wrapped
        .split_once(PREFIX_SEPARATOR)
        .ok_or_else(|| CampSyncError::Integrity("no digest prefix found".into()))?;

    if stored.len() != prefix_len {
        return Err(CampSyncError::Integrity(format!(
            "digest prefix is {} characters, expected {prefix_len}",
            stored.len()
        )));
    }

    let digest = keyed_digest(plain_text, secret);
    let expected = &digest.as_bytes()[..prefix_len.min(digest.len())];
    if bool::from(expected.ct_eq(stored.as_bytes())) {
        Ok(plain_text.to_owned())
    } else {
        Err(CampSyncError::Integrity(
            "digest mismatch (damaged band, foreign band, or different lock code)".into(),
        ))
    }
}
