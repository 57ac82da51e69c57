// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Settings storage: SQLite-backed `SettingsStore` for the lock code.
//
// Schema:
//   app_settings(
//     id                  TEXT PRIMARY KEY,   -- singleton key, "global"
//     wristband_lock_code TEXT NOT NULL,
//     updated_at          TEXT NOT NULL       -- RFC 3339
//   )

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use campsync_core::error::{CampSyncError, Result};
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};
use tracing::{debug, instrument};

use crate::lock_code::SettingsStore;

const CREATE_TABLE_SQL: &str = "
    CREATE TABLE IF NOT EXISTS app_settings (
        id                  TEXT PRIMARY KEY,
        wristband_lock_code TEXT NOT NULL,
        updated_at          TEXT NOT NULL
    );";

/// Convert a `rusqlite::Error` into a `CampSyncError::Database`.
fn db_err(e: rusqlite::Error) -> CampSyncError {
    CampSyncError::Database(e.to_string())
}

/// Local settings database.
///
/// `rusqlite::Connection` is `Send` but not `Sync`, so it sits behind a
/// mutex. Every query is a single-row lookup, so calls run inline rather
/// than on a blocking thread.
pub struct SqliteSettingsStore {
    conn: Mutex<Connection>,
}

impl SqliteSettingsStore {
    /// Open (or create) the settings database at `path`.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path).map_err(db_err)?;
        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(db_err)?;
        conn.execute_batch(CREATE_TABLE_SQL).map_err(db_err)?;

        debug!("settings store opened");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory settings database (useful for tests).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(db_err)?;
        conn.execute_batch(CREATE_TABLE_SQL).map_err(db_err)?;

        debug!("in-memory settings store opened");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// When the row under `key` was last written.
    pub fn updated_at(&self, key: &str) -> Result<Option<String>> {
        self.conn()
            .query_row(
                "SELECT updated_at FROM app_settings WHERE id = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()
            .map_err(db_err)
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl SettingsStore for SqliteSettingsStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.conn()
            .query_row(
                "SELECT wristband_lock_code FROM app_settings WHERE id = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()
            .map_err(db_err)
    }

    async fn upsert(&self, key: &str, value: &str) -> Result<()> {
        let updated_at = Utc::now().to_rfc3339();
        self.conn()
            .execute(
                "INSERT INTO app_settings (id, wristband_lock_code, updated_at)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(id) DO UPDATE SET
                     wristband_lock_code = excluded.wristband_lock_code,
                     updated_at = excluded.updated_at",
                params![key, value, updated_at],
            )
            .map_err(|e| CampSyncError::Persistence(e.to_string()))?;

        debug!(%key, "setting upserted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lock_code::LOCK_CODE_SETTINGS_KEY;

    #[tokio::test]
    async fn missing_key_is_none() {
        let store = SqliteSettingsStore::open_in_memory().unwrap();
        assert_eq!(store.get(LOCK_CODE_SETTINGS_KEY).await.unwrap(), None);
        assert_eq!(store.updated_at(LOCK_CODE_SETTINGS_KEY).unwrap(), None);
    }

    #[tokio::test]
    async fn upsert_replaces_value() {
        let store = SqliteSettingsStore::open_in_memory().unwrap();
        store.upsert(LOCK_CODE_SETTINGS_KEY, "FirstCode2026!").await.unwrap();
        store.upsert(LOCK_CODE_SETTINGS_KEY, "SecondCode2026!").await.unwrap();

        assert_eq!(
            store.get(LOCK_CODE_SETTINGS_KEY).await.unwrap().as_deref(),
            Some("SecondCode2026!")
        );
        let count: i64 = store
            .conn()
            .query_row("SELECT COUNT(*) FROM app_settings", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
        assert!(store.updated_at(LOCK_CODE_SETTINGS_KEY).unwrap().is_some());
    }

    #[tokio::test]
    async fn survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.db");
        {
            let store = SqliteSettingsStore::open(&path).unwrap();
            store.upsert(LOCK_CODE_SETTINGS_KEY, "PersistMe123").await.unwrap();
        }
        let reopened = SqliteSettingsStore::open(&path).unwrap();
        assert_eq!(
            reopened.get(LOCK_CODE_SETTINGS_KEY).await.unwrap().as_deref(),
            Some("PersistMe123")
        );
    }
}
