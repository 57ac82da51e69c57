// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Application configuration.

use serde::{Deserialize, Serialize};

use crate::error::{CampSyncError, Result};
use crate::types::LockCode;

/// Lock code used until an operator sets a custom one.
pub const DEFAULT_LOCK_CODE: &str = "CAMPSYNC2024LOCK";

/// Persistent wristband settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Maximum length of the wrapped payload, leaving headroom on a
    /// 540-byte NTAG215.
    pub payload_budget: usize,
    /// Number of hex characters of the SHA-256 digest kept as the prefix.
    pub digest_prefix_len: usize,
    /// Fallback lock code when none is persisted or the store is unreachable.
    pub default_lock_code: String,
    /// First user page covered by tag password protection (NTAG AUTH0).
    pub protect_from_page: u8,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            payload_budget: 500,
            digest_prefix_len: 8,
            default_lock_code: DEFAULT_LOCK_CODE.to_owned(),
            protect_from_page: 4,
        }
    }
}

impl AppConfig {
    /// Check the values a hand-edited config file could get wrong.
    pub fn validate(&self) -> Result<()> {
        if !(1..=64).contains(&self.digest_prefix_len) {
            return Err(CampSyncError::Validation(format!(
                "digest_prefix_len must be 1-64, got {}",
                self.digest_prefix_len
            )));
        }
        if self.payload_budget <= self.digest_prefix_len + 1 {
            return Err(CampSyncError::Validation(format!(
                "payload_budget {} leaves no room for a payload",
                self.payload_budget
            )));
        }
        // Pages 0-3 hold UID, lock and capability bytes.
        if self.protect_from_page < 4 {
            return Err(CampSyncError::Validation(format!(
                "protect_from_page must be 4 or higher, got {}",
                self.protect_from_page
            )));
        }
        LockCode::parse(&self.default_lock_code)?;
        Ok(())
    }

    /// The default lock code as a validated [`LockCode`].
    pub fn default_code(&self) -> Result<LockCode> {
        LockCode::parse(&self.default_lock_code)
    }
}
