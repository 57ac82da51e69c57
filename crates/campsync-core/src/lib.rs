// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// CampSync: core types, errors, and the wristband payload codec shared
// across all crates.

pub mod config;
pub mod error;
pub mod human_errors;
pub mod payload;
pub mod types;

pub use config::AppConfig;
pub use error::CampSyncError;
pub use types::*;
