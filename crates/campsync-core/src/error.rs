// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for CampSync.

use thiserror::Error;

/// Top-level error type for all CampSync wristband operations.
#[derive(Debug, Error)]
pub enum CampSyncError {
    // -- Lock code / settings --
    #[error("invalid lock code: {0}")]
    Validation(String),

    #[error("failed to persist setting: {0}")]
    Persistence(String),

    #[error("database error: {0}")]
    Database(String),

    // -- Payload --
    #[error("wristband payload is {actual} characters, over the {limit}-character tag budget")]
    SizeExceeded { actual: usize, limit: usize },

    #[error("integrity check failed: {0}")]
    Integrity(String),

    #[error("unreadable wristband data: {0}")]
    Format(String),

    // -- NFC hardware --
    #[error("NFC driver error: {0}")]
    Driver(String),

    #[error("a tag session is already in progress")]
    SessionBusy,

    #[error("NFC is not available on this platform")]
    PlatformUnavailable,

    // -- Check-in --
    #[error("wristband {wristband_id} was written but the check-in was not recorded: {reason}")]
    CheckInNotRecorded {
        wristband_id: String,
        reason: String,
    },

    // -- Files --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CampSyncError {
    /// True for failures reported by the NFC driver itself.
    pub fn is_driver(&self) -> bool {
        matches!(self, Self::Driver(_))
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, CampSyncError>;
