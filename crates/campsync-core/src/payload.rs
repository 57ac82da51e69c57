// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Wristband payload codec: compact JSON with one/two-letter keys.
//
// Wire shape (key order fixed by the struct below):
//   {"id":..,"fn":..,"ln":..,"dob":"YYYY-MM-DD","al":"a|b","md":"","sw":..,"cb":..,"st":..,"ts":<ms>}
//
// `sw` and `cb` are left out when absent. `session_id` is never written.

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CampSyncError, Result};
use crate::types::{DecodedPayload, WristbandRecord};

/// Separator between items of `allergies` / `medications`. Not escaped.
pub const LIST_DELIMITER: char = '|';

#[derive(Debug, Serialize, Deserialize)]
struct WirePayload {
    id: String,
    #[serde(rename = "fn")]
    first_name: String,
    #[serde(rename = "ln")]
    last_name: String,
    dob: NaiveDate,
    #[serde(default)]
    al: Option<String>,
    #[serde(default)]
    md: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sw: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    cb: Option<String>,
    st: String,
    ts: i64,
}

/// Encode `record`, stamping it with the current time.
pub fn encode(record: &WristbandRecord) -> String {
    encode_at(record, Utc::now().timestamp_millis())
}

/// Encode `record` with an explicit generation timestamp (ms since epoch).
pub fn encode_at(record: &WristbandRecord, generated_at: i64) -> String {
    let wire = WirePayload {
        id: record.id.clone(),
        first_name: record.first_name.clone(),
        last_name: record.last_name.clone(),
        dob: record.date_of_birth,
        al: Some(join_list(&record.allergies)),
        md: Some(join_list(&record.medications)),
        sw: record.swim_level.clone(),
        cb: record.cabin.clone(),
        st: record.check_in_status.clone(),
        ts: generated_at,
    };
    // Only strings, a date and an integer: serialization cannot fail.
    let text = serde_json::to_string(&wire).unwrap_or_default();
    debug!(len = text.len(), "wristband payload encoded");
    text
}

/// Parse a payload produced by [`encode`].
///
/// Absent and empty list fields both decode to an empty list. Unknown keys
/// are ignored so bands written by richer clients still read.
pub fn decode(text: &str) -> Result<DecodedPayload> {
    let wire: WirePayload =
        serde_json::from_str(text).map_err(|e| CampSyncError::Format(e.to_string()))?;

    let record = WristbandRecord {
        id: wire.id,
        first_name: wire.first_name,
        last_name: wire.last_name,
        date_of_birth: wire.dob,
        allergies: split_list(wire.al.as_deref()),
        medications: split_list(wire.md.as_deref()),
        swim_level: wire.sw,
        cabin: wire.cb,
        check_in_status: wire.st,
        session_id: None,
    };

    Ok(DecodedPayload {
        record,
        generated_at: wire.ts,
    })
}

/// Make a list item safe to join: trims it and replaces the delimiter.
pub fn sanitize_item(item: &str) -> String {
    item.trim().replace(LIST_DELIMITER, "/")
}

/// [`sanitize_item`] every entry and drop the ones left blank.
pub fn sanitize_list(items: &[String]) -> Vec<String> {
    items
        .iter()
        .map(|item| sanitize_item(item))
        .filter(|item| !item.is_empty())
        .collect()
}

fn join_list(items: &[String]) -> String {
    items.join(&LIST_DELIMITER.to_string())
}

fn split_list(joined: Option<&str>) -> Vec<String> {
    match joined {
        Some(s) if !s.trim().is_empty() => s.split(LIST_DELIMITER).map(str::to_owned).collect(),
        _ => Vec::new(),
    }
}
