// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Check-in desk: fetch a camper, write their band, then record the
// check-in in the system of record.
//
// The two failure modes are kept apart. A failure before or during the tag
// write means nothing changed anywhere. A failure after the write means the
// band is valid but the system of record does not know about it
// (`CheckInNotRecorded`), and the operator has to retry the recording.

use std::sync::Arc;

use async_trait::async_trait;
use campsync_core::error::{CampSyncError, Result};
use campsync_core::payload::sanitize_list;
use campsync_core::types::{CHECKED_IN, ProgrammedWristband, WristbandRecord};
use chrono::NaiveDate;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{info, instrument, warn};

use crate::station::WristbandStation;

/// Remote camper records. Responses are raw JSON and are validated here.
#[async_trait]
pub trait CamperDirectory: Send + Sync {
    /// One camper row by id.
    async fn fetch_camper(&self, camper_id: &str) -> Result<serde_json::Value>;

    /// Mark the camper checked in against the given wristband.
    async fn record_check_in(
        &self,
        camper_id: &str,
        wristband_id: &str,
    ) -> Result<serde_json::Value>;
}

/// Camper row as the directory returns it.
#[derive(Debug, Deserialize)]
struct CamperRow {
    id: String,
    first_name: String,
    last_name: String,
    date_of_birth: NaiveDate,
    #[serde(default)]
    allergies: Option<Vec<String>>,
    #[serde(default)]
    medications: Option<Vec<String>>,
    #[serde(default)]
    swim_level: Option<String>,
    #[serde(default)]
    cabin: Option<String>,
    #[serde(default)]
    session_id: Option<String>,
}

impl CamperRow {
    fn into_record(self) -> WristbandRecord {
        WristbandRecord {
            id: self.id,
            first_name: self.first_name,
            last_name: self.last_name,
            date_of_birth: self.date_of_birth,
            allergies: sanitize_list(&self.allergies.unwrap_or_default()),
            medications: sanitize_list(&self.medications.unwrap_or_default()),
            swim_level: self.swim_level,
            cabin: self.cabin,
            check_in_status: CHECKED_IN.to_owned(),
            session_id: self.session_id,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CheckInReceipt {
    success: bool,
    #[serde(default)]
    message: Option<String>,
}

/// Result of a completed check-in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckInOutcome {
    pub wristband: ProgrammedWristband,
    /// The record as written to the band.
    pub record: WristbandRecord,
}

pub struct CheckInDesk {
    station: Arc<WristbandStation>,
    directory: Arc<dyn CamperDirectory>,
}

impl CheckInDesk {
    pub fn new(station: Arc<WristbandStation>, directory: Arc<dyn CamperDirectory>) -> Self {
        Self { station, directory }
    }

    /// Fetch `camper_id`, program their band, and record the check-in.
    #[instrument(skip(self))]
    pub async fn check_in(&self, camper_id: &str) -> Result<CheckInOutcome> {
        let row: CamperRow = parse("camper row", self.directory.fetch_camper(camper_id).await?)?;
        if row.id != camper_id {
            return Err(CampSyncError::Format(format!(
                "camper row: asked for {camper_id}, got {}",
                row.id
            )));
        }
        let record = row.into_record();

        let wristband = self.station.program_tag(&record).await?;

        if let Err(reason) = self.record(camper_id, &wristband.wristband_id).await {
            warn!(
                wristband_id = %wristband.wristband_id,
                %reason,
                "band written but check-in not recorded"
            );
            return Err(CampSyncError::CheckInNotRecorded {
                wristband_id: wristband.wristband_id,
                reason,
            });
        }

        info!(wristband_id = %wristband.wristband_id, "camper checked in");
        Ok(CheckInOutcome { wristband, record })
    }

    /// Record the check-in, flattening every failure into a reason string.
    async fn record(&self, camper_id: &str, wristband_id: &str) -> std::result::Result<(), String> {
        let response = self
            .directory
            .record_check_in(camper_id, wristband_id)
            .await
            .map_err(|e| e.to_string())?;
        let receipt: CheckInReceipt =
            parse("check-in receipt", response).map_err(|e| e.to_string())?;
        if receipt.success {
            Ok(())
        } else {
            Err(receipt
                .message
                .unwrap_or_else(|| "directory rejected the check-in".to_owned()))
        }
    }
}

fn parse<T: DeserializeOwned>(what: &str, value: serde_json::Value) -> Result<T> {
    serde_json::from_value(value).map_err(|e| CampSyncError::Format(format!("{what}: {e}")))
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use campsync_bridge::{SimOp, SimulatedTag};
    use campsync_core::AppConfig;
    use campsync_core::types::ReadOutcome;
    use campsync_security::{LockCodeStore, SqliteSettingsStore};
    use serde_json::json;

    use super::*;

    #[derive(Default)]
    struct FakeDirectory {
        row: Mutex<Option<serde_json::Value>>,
        receipt: Mutex<Option<serde_json::Value>>,
        recorded: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl CamperDirectory for FakeDirectory {
        async fn fetch_camper(&self, _camper_id: &str) -> Result<serde_json::Value> {
            self.row
                .lock()
                .unwrap()
                .clone()
                .ok_or_else(|| CampSyncError::Persistence("no such camper".into()))
        }

        async fn record_check_in(
            &self,
            camper_id: &str,
            wristband_id: &str,
        ) -> Result<serde_json::Value> {
            self.recorded
                .lock()
                .unwrap()
                .push((camper_id.to_owned(), wristband_id.to_owned()));
            self.receipt
                .lock()
                .unwrap()
                .clone()
                .ok_or_else(|| CampSyncError::Persistence("connection reset".into()))
        }
    }

    fn ana_row() -> serde_json::Value {
        json!({
            "id": "c1",
            "first_name": "Ana",
            "last_name": "Lee",
            "date_of_birth": "2015-05-01",
            "allergies": ["  peanuts ", "tree|nuts", ""],
            "medications": null,
            "swim_level": "beginner",
            "cabin": "B3",
            "session_id": "summer-2026",
            "guardian_phone": "+1 555 0100"
        })
    }

    fn setup(directory: Arc<FakeDirectory>) -> (Arc<SimulatedTag>, Arc<WristbandStation>, CheckInDesk) {
        let tag = Arc::new(SimulatedTag::default());
        let config = AppConfig::default();
        let settings = Arc::new(SqliteSettingsStore::open_in_memory().unwrap());
        let codes = Arc::new(LockCodeStore::from_config(settings, &config).unwrap());
        let station = Arc::new(WristbandStation::new(tag.clone(), codes, config));
        let desk = CheckInDesk::new(station.clone(), directory);
        (tag, station, desk)
    }

    #[tokio::test]
    async fn successful_check_in_writes_and_records() {
        let directory = Arc::new(FakeDirectory::default());
        *directory.row.lock().unwrap() = Some(ana_row());
        *directory.receipt.lock().unwrap() = Some(json!({"success": true}));
        let (_tag, station, desk) = setup(directory.clone());

        let outcome = desk.check_in("c1").await.unwrap();
        assert_eq!(outcome.record.allergies, vec!["peanuts", "tree/nuts"]);
        assert!(outcome.record.medications.is_empty());
        assert_eq!(outcome.record.check_in_status, CHECKED_IN);
        assert_eq!(
            directory.recorded.lock().unwrap().as_slice(),
            &[("c1".to_owned(), "04A1B2C3D4E5F6".to_owned())]
        );

        match station.read_tag().await.unwrap() {
            ReadOutcome::Wristband(scan) => {
                assert_eq!(scan.record.full_name(), "Ana Lee");
                assert_eq!(scan.record.check_in_status, CHECKED_IN);
            }
            ReadOutcome::Empty => panic!("band should hold the camper"),
        }
    }

    #[tokio::test]
    async fn malformed_row_writes_nothing() {
        let directory = Arc::new(FakeDirectory::default());
        *directory.row.lock().unwrap() = Some(json!({"id": "c1", "first_name": "Ana"}));
        let (tag, _station, desk) = setup(directory.clone());

        let err = desk.check_in("c1").await.unwrap_err();
        assert!(matches!(err, CampSyncError::Format(_)));
        assert_eq!(tag.calls(SimOp::Acquire), 0);
        assert!(directory.recorded.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn mismatched_row_id_is_rejected() {
        let directory = Arc::new(FakeDirectory::default());
        *directory.row.lock().unwrap() = Some(ana_row());
        let (tag, _station, desk) = setup(directory);

        let err = desk.check_in("c2").await.unwrap_err();
        assert!(matches!(err, CampSyncError::Format(_)));
        assert_eq!(tag.calls(SimOp::Write), 0);
    }

    #[tokio::test]
    async fn tag_failure_skips_recording() {
        let directory = Arc::new(FakeDirectory::default());
        *directory.row.lock().unwrap() = Some(ana_row());
        *directory.receipt.lock().unwrap() = Some(json!({"success": true}));
        let (tag, _station, desk) = setup(directory.clone());
        tag.fail(SimOp::Write);

        let err = desk.check_in("c1").await.unwrap_err();
        assert!(matches!(err, CampSyncError::Driver(_)));
        assert!(directory.recorded.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn recording_error_keeps_wristband_id() {
        let directory = Arc::new(FakeDirectory::default());
        *directory.row.lock().unwrap() = Some(ana_row());
        let (_tag, _station, desk) = setup(directory);

        match desk.check_in("c1").await.unwrap_err() {
            CampSyncError::CheckInNotRecorded { wristband_id, reason } => {
                assert_eq!(wristband_id, "04A1B2C3D4E5F6");
                assert!(reason.contains("connection reset"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn rejected_receipt_is_not_recorded() {
        let directory = Arc::new(FakeDirectory::default());
        *directory.row.lock().unwrap() = Some(ana_row());
        *directory.receipt.lock().unwrap() =
            Some(json!({"success": false, "message": "camper already checked in"}));
        let (_tag, _station, desk) = setup(directory);

        let err = desk.check_in("c1").await.unwrap_err();
        match err {
            CampSyncError::CheckInNotRecorded { reason, .. } => {
                assert_eq!(reason, "camper already checked in");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn receipt_without_success_flag_is_not_recorded() {
        let directory = Arc::new(FakeDirectory::default());
        *directory.row.lock().unwrap() = Some(ana_row());
        *directory.receipt.lock().unwrap() = Some(json!({"ok": 1}));
        let (_tag, _station, desk) = setup(directory);

        assert!(matches!(
            desk.check_in("c1").await,
            Err(CampSyncError::CheckInNotRecorded { .. })
        ));
    }
}
