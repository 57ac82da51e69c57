// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for CampSync wristbands.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{CampSyncError, Result};

/// Status label written onto a band at check-in.
pub const CHECKED_IN: &str = "checked-in";

/// The camper snapshot that lives on one wristband.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WristbandRecord {
    /// Camper identifier in the system of record.
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: NaiveDate,
    #[serde(default)]
    pub allergies: Vec<String>,
    #[serde(default)]
    pub medications: Vec<String>,
    #[serde(default)]
    pub swim_level: Option<String>,
    #[serde(default)]
    pub cabin: Option<String>,
    pub check_in_status: String,
    /// Camp session the camper is enrolled in. Never written to the tag, so
    /// it is always `None` after a read.
    #[serde(default)]
    pub session_id: Option<String>,
}

impl WristbandRecord {
    /// Display name, e.g. "Ana Lee".
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Punctuation accepted in a lock code in addition to ASCII letters and digits.
pub const LOCK_CODE_SYMBOLS: &str = "!@#$%^&*()_+-=[]{}|;:,.<>?";

/// Shortest accepted lock code.
pub const LOCK_CODE_MIN_LEN: usize = 8;

/// Longest accepted lock code.
pub const LOCK_CODE_MAX_LEN: usize = 32;

/// The shared wristband secret.
///
/// Used both as the key of the integrity prefix and as the source of the
/// physical tag password. A `LockCode` can only be built through
/// [`LockCode::parse`], so holding one means the charset and length rules
/// have been checked.
#[derive(Clone, PartialEq, Eq)]
pub struct LockCode(String);

impl LockCode {
    /// Validate `candidate` and wrap it.
    pub fn parse(candidate: &str) -> Result<Self> {
        let len = candidate.chars().count();
        if !(LOCK_CODE_MIN_LEN..=LOCK_CODE_MAX_LEN).contains(&len) {
            return Err(CampSyncError::Validation(format!(
                "lock code must be {LOCK_CODE_MIN_LEN}-{LOCK_CODE_MAX_LEN} characters, got {len}"
            )));
        }
        if let Some(bad) = candidate
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || LOCK_CODE_SYMBOLS.contains(*c)))
        {
            return Err(CampSyncError::Validation(format!(
                "lock code may only contain letters, digits and {LOCK_CODE_SYMBOLS} (found {bad:?})"
            )));
        }
        Ok(Self(candidate.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// The code is a secret; keep it out of logs and panic messages.
impl std::fmt::Debug for LockCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("LockCode(****)")
    }
}

/// A wristband payload after integrity verification and parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedPayload {
    pub record: WristbandRecord,
    /// When the payload was encoded, in milliseconds since the Unix epoch.
    pub generated_at: i64,
}

/// Result of a successful `program_tag`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgrammedWristband {
    /// Tag hardware UID, or a timestamp-derived fallback.
    pub wristband_id: String,
    /// Length of the wrapped payload written to the tag.
    pub payload_len: usize,
    pub generated_at: i64,
    /// Whether the password-protection step succeeded.
    pub protected: bool,
}

/// A wristband that was read and verified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WristbandScan {
    pub record: WristbandRecord,
    /// Locking is attempted on every write, so this is always `true`.
    pub is_locked: bool,
    pub generated_at: i64,
}

/// What a tag read found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    /// The tag answered but holds no payload.
    Empty,
    Wristband(WristbandScan),
}

/// Phases of a single tag session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Idle,
    Acquiring,
    Fetching,
    Writing,
    Reading,
    Locking,
    Releasing,
    Done,
    Failed,
}

impl SessionPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

impl std::fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Idle => "idle",
            Self::Acquiring => "acquiring",
            Self::Fetching => "fetching",
            Self::Writing => "writing",
            Self::Reading => "reading",
            Self::Locking => "locking",
            Self::Releasing => "releasing",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(label)
    }
}
