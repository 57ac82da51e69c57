// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// File-backed camper directory for stations working from an exported
// roster.
//
// The roster is a JSON array of camper rows. Check-ins are appended to a
// JSON-lines log next to it, one object per band written.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use campsync_core::error::{CampSyncError, Result};
use campsync_tag::CamperDirectory;
use chrono::Utc;
use serde_json::{Value, json};
use tracing::debug;

pub struct RosterDirectory {
    campers: Vec<Value>,
    log_path: PathBuf,
}

impl RosterDirectory {
    /// Load the roster at `roster`; check-ins go to `log_path`.
    pub fn load(roster: &Path, log_path: PathBuf) -> Result<Self> {
        let text = std::fs::read_to_string(roster)?;
        let campers: Vec<Value> = serde_json::from_str(&text)
            .map_err(|e| CampSyncError::Format(format!("roster {}: {e}", roster.display())))?;
        debug!(campers = campers.len(), path = %roster.display(), "roster loaded");
        Ok(Self { campers, log_path })
    }
}

#[async_trait]
impl CamperDirectory for RosterDirectory {
    async fn fetch_camper(&self, camper_id: &str) -> Result<Value> {
        self.campers
            .iter()
            .find(|row| row.get("id").and_then(Value::as_str) == Some(camper_id))
            .cloned()
            .ok_or_else(|| CampSyncError::Validation(format!("no camper {camper_id} in roster")))
    }

    async fn record_check_in(&self, camper_id: &str, wristband_id: &str) -> Result<Value> {
        let entry = json!({
            "camper_id": camper_id,
            "wristband_id": wristband_id,
            "checked_in_at": Utc::now().to_rfc3339(),
        });
        let mut log = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)?;
        writeln!(log, "{entry}")?;
        Ok(json!({ "success": true }))
    }
}
