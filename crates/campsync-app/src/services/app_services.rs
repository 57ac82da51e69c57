// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Central service layer: opens the settings database, loads config and
// the simulated band, and exposes one method per CLI command.
//
// The simulated band lives in `simulated-tag.bin` so successive commands
// see the same tag. It is written back after every tag command, including
// failed ones, since a failed session may still have changed the chip.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use campsync_bridge::{NfcDriver, SimulatedTag, StubNfcDriver};
use campsync_core::error::{CampSyncError, Result};
use campsync_core::payload::sanitize_list;
use campsync_core::types::{LockCode, ProgrammedWristband, ReadOutcome, WristbandRecord};
use campsync_core::AppConfig;
use campsync_security::lock_code::LOCK_CODE_SETTINGS_KEY;
use campsync_security::{LockCodeStore, SqliteSettingsStore};
use campsync_tag::{CheckInDesk, CheckInOutcome, WristbandStation};
use tracing::{info, warn};

use super::roster::RosterDirectory;

const CONFIG_FILE: &str = "config.json";
const SETTINGS_DB: &str = "settings.db";
const TAG_IMAGE: &str = "simulated-tag.bin";
const CHECK_IN_LOG: &str = "check-ins.jsonl";

/// Which NFC driver backs the station.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Reader {
    /// Persistent virtual NTAG215 in the data directory.
    Simulated,
    /// No reader attached; every tag command fails.
    None,
}

/// Lock-code state for display.
#[derive(Debug)]
pub struct LockCodeStatus {
    pub code: LockCode,
    pub is_default: bool,
    pub updated_at: Option<String>,
}

impl LockCodeStatus {
    /// The code for printing: in clear only when `reveal` is set, otherwise
    /// the first two characters followed by one `*` per remaining character.
    pub fn display_code(&self, reveal: bool) -> String {
        let code = self.code.as_str();
        if reveal {
            return code.to_owned();
        }
        code.chars()
            .enumerate()
            .map(|(i, c)| if i < 2 { c } else { '*' })
            .collect()
    }
}

pub struct AppServices {
    data_dir: PathBuf,
    config: AppConfig,
    settings: Arc<SqliteSettingsStore>,
    lock_codes: Arc<LockCodeStore>,
    simulated: Option<Arc<SimulatedTag>>,
    station: Arc<WristbandStation>,
}

impl AppServices {
    /// Open everything under `data_dir`.
    pub fn init(data_dir: PathBuf, reader: Reader) -> Result<Self> {
        info!(path = %data_dir.display(), ?reader, "initialising app services");

        let config = load_config(&data_dir);
        config.validate()?;

        let settings = Arc::new(SqliteSettingsStore::open(data_dir.join(SETTINGS_DB))?);
        let lock_codes = Arc::new(LockCodeStore::from_config(settings.clone(), &config)?);

        let simulated = match reader {
            Reader::Simulated => Some(Arc::new(load_tag(&data_dir.join(TAG_IMAGE))?)),
            Reader::None => None,
        };
        let driver: Arc<dyn NfcDriver> = match &simulated {
            Some(tag) => tag.clone(),
            None => Arc::new(StubNfcDriver),
        };
        info!(driver = driver.platform_name(), "NFC driver ready");

        let station = Arc::new(WristbandStation::new(driver, lock_codes.clone(), config.clone()));

        Ok(Self {
            data_dir,
            config,
            settings,
            lock_codes,
            simulated,
            station,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Write the effective config to `config.json` so it can be edited.
    pub fn save_config(&self) -> Result<PathBuf> {
        persist_config(&self.data_dir, &self.config)
    }

    // -- Lock code -----------------------------------------------------------

    pub async fn lock_code_status(&self) -> Result<LockCodeStatus> {
        let code = self.lock_codes.current_code().await;
        Ok(LockCodeStatus {
            is_default: &code == self.lock_codes.default_code(),
            code,
            updated_at: self.settings.updated_at(LOCK_CODE_SETTINGS_KEY)?,
        })
    }

    pub async fn set_lock_code(&self, candidate: &str) -> Result<()> {
        self.lock_codes.set_code(candidate).await
    }

    pub async fn reset_lock_code(&self) -> Result<()> {
        self.lock_codes.reset_to_default().await
    }

    // -- Tag -----------------------------------------------------------------

    /// Program the band with the record stored as JSON at `path`.
    ///
    /// List items are cleaned the same way as directory rows before writing.
    pub async fn program_from_file(&self, path: &Path) -> Result<ProgrammedWristband> {
        let text = std::fs::read_to_string(path)?;
        let mut record: WristbandRecord = serde_json::from_str(&text)?;
        record.allergies = sanitize_list(&record.allergies);
        record.medications = sanitize_list(&record.medications);
        let result = self.station.program_tag(&record).await;
        self.save_tag()?;
        result
    }

    pub async fn read_tag(&self) -> Result<ReadOutcome> {
        self.station.read_tag().await
    }

    pub async fn erase_tag(&self) -> Result<()> {
        let result = self.station.erase_tag().await;
        self.save_tag()?;
        result
    }

    /// Check `camper_id` in from the roster at `roster`.
    pub async fn check_in(&self, roster: &Path, camper_id: &str) -> Result<CheckInOutcome> {
        let directory = Arc::new(RosterDirectory::load(
            roster,
            self.data_dir.join(CHECK_IN_LOG),
        )?);
        let desk = CheckInDesk::new(self.station.clone(), directory);
        let result = desk.check_in(camper_id).await;
        self.save_tag()?;
        result
    }

    fn save_tag(&self) -> Result<()> {
        if let Some(tag) = &self.simulated {
            std::fs::write(self.data_dir.join(TAG_IMAGE), tag.image())?;
        }
        Ok(())
    }
}

// -- Config file persistence -------------------------------------------------

fn load_config(data_dir: &Path) -> AppConfig {
    let path = data_dir.join(CONFIG_FILE);
    let Ok(data) = std::fs::read_to_string(&path) else {
        return AppConfig::default();
    };
    match serde_json::from_str(&data) {
        Ok(config) => config,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "unreadable config, using defaults");
            AppConfig::default()
        }
    }
}

fn persist_config(data_dir: &Path, config: &AppConfig) -> Result<PathBuf> {
    let path = data_dir.join(CONFIG_FILE);
    let json = serde_json::to_string_pretty(config)?;
    std::fs::write(&path, json)?;
    Ok(path)
}

fn load_tag(path: &Path) -> Result<SimulatedTag> {
    match std::fs::read(path) {
        Ok(image) => SimulatedTag::from_image(image),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(SimulatedTag::default()),
        Err(e) => Err(CampSyncError::Io(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ANA: &str = r#"{
        "id": "c1", "firstName": "Ana", "lastName": "Lee", "dateOfBirth": "2015-05-01",
        "allergies": ["peanuts"], "swimLevel": "beginner", "cabin": "B3",
        "checkInStatus": "checked-in"
    }"#;

    #[tokio::test]
    async fn band_survives_between_invocations() {
        let tmp = tempfile::tempdir().unwrap();
        let record = tmp.path().join("ana.json");
        std::fs::write(&record, ANA).unwrap();

        let first = AppServices::init(tmp.path().to_path_buf(), Reader::Simulated).unwrap();
        let programmed = first.program_from_file(&record).await.unwrap();
        assert!(programmed.protected);
        drop(first);

        let second = AppServices::init(tmp.path().to_path_buf(), Reader::Simulated).unwrap();
        match second.read_tag().await.unwrap() {
            ReadOutcome::Wristband(scan) => assert_eq!(scan.record.full_name(), "Ana Lee"),
            ReadOutcome::Empty => panic!("band should persist"),
        }
    }

    #[tokio::test]
    async fn lock_code_persists_across_restarts() {
        let tmp = tempfile::tempdir().unwrap();
        let svc = AppServices::init(tmp.path().to_path_buf(), Reader::Simulated).unwrap();
        assert!(svc.lock_code_status().await.unwrap().is_default);
        svc.set_lock_code("ThisIsAValidCode123!").await.unwrap();
        drop(svc);

        let svc = AppServices::init(tmp.path().to_path_buf(), Reader::Simulated).unwrap();
        let status = svc.lock_code_status().await.unwrap();
        assert_eq!(status.code.as_str(), "ThisIsAValidCode123!");
        assert!(!status.is_default);
        assert!(status.updated_at.is_some());
    }

    #[tokio::test]
    async fn record_file_lists_are_cleaned_before_writing() {
        let tmp = tempfile::tempdir().unwrap();
        let record = tmp.path().join("ana.json");
        let with_delimiter = ANA.replace(r#"["peanuts"]"#, r#"["tree|nuts", " ", " peanuts "]"#);
        std::fs::write(&record, with_delimiter).unwrap();

        let svc = AppServices::init(tmp.path().to_path_buf(), Reader::Simulated).unwrap();
        svc.program_from_file(&record).await.unwrap();
        match svc.read_tag().await.unwrap() {
            ReadOutcome::Wristband(scan) => {
                assert_eq!(scan.record.allergies, vec!["tree/nuts", "peanuts"]);
            }
            ReadOutcome::Empty => panic!("band should hold the record"),
        }
    }

    #[tokio::test]
    async fn lock_code_is_masked_unless_revealed() {
        let tmp = tempfile::tempdir().unwrap();
        let svc = AppServices::init(tmp.path().to_path_buf(), Reader::Simulated).unwrap();
        let status = svc.lock_code_status().await.unwrap();
        assert_eq!(status.display_code(false), "CA**************");
        assert_eq!(status.display_code(true), "CAMPSYNC2024LOCK");
    }

    #[tokio::test]
    async fn stub_reader_reports_unavailable() {
        let tmp = tempfile::tempdir().unwrap();
        let svc = AppServices::init(tmp.path().to_path_buf(), Reader::None).unwrap();
        assert!(matches!(
            svc.read_tag().await,
            Err(CampSyncError::PlatformUnavailable)
        ));
        assert!(!tmp.path().join(TAG_IMAGE).exists());
    }

    #[test]
    fn config_file_overrides_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let config = AppConfig {
            payload_budget: 400,
            ..AppConfig::default()
        };
        persist_config(tmp.path(), &config).unwrap();
        assert_eq!(load_config(tmp.path()), config);

        std::fs::write(tmp.path().join(CONFIG_FILE), "{broken").unwrap();
        assert_eq!(load_config(tmp.path()), AppConfig::default());
    }

    #[test]
    fn save_config_writes_effective_values() {
        let tmp = tempfile::tempdir().unwrap();
        let svc = AppServices::init(tmp.path().to_path_buf(), Reader::None).unwrap();
        let path = svc.save_config().unwrap();
        assert_eq!(load_config(tmp.path()), *svc.config());
        assert!(path.ends_with(CONFIG_FILE));
    }

    #[test]
    fn invalid_config_refuses_to_start() {
        let tmp = tempfile::tempdir().unwrap();
        let config = AppConfig {
            digest_prefix_len: 0,
            ..AppConfig::default()
        };
        persist_config(tmp.path(), &config).unwrap();
        assert!(matches!(
            AppServices::init(tmp.path().to_path_buf(), Reader::Simulated),
            Err(CampSyncError::Validation(_))
        ));
    }
}
