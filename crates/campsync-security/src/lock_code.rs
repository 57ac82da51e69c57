// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Lock-code store: the single shared wristband secret, cached in memory.
//
// Reads never fail: an unset, unreadable, or invalid stored code degrades
// to the configured default. Writes are validated first and invalidate the
// cache only once the store accepted them.

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use campsync_core::AppConfig;
use campsync_core::error::{CampSyncError, Result};
use campsync_core::types::LockCode;
use tracing::{debug, info, instrument, warn};

/// Row id of the settings record holding the lock code.
pub const LOCK_CODE_SETTINGS_KEY: &str = "global";

/// External key-value store for app-wide settings.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Fetch the lock code stored under `key`, if any.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Insert or replace the lock code stored under `key`.
    async fn upsert(&self, key: &str, value: &str) -> Result<()>;
}

#[derive(Default)]
struct CacheState {
    code: Option<LockCode>,
    /// Bumped on every invalidation so a fetch that started before an
    /// invalidation cannot repopulate the cache with a stale value.
    generation: u64,
}

/// Source of truth for the current lock code.
///
/// Construct once at startup and share (`Arc`) with every component that
/// needs the secret.
pub struct LockCodeStore {
    settings: Arc<dyn SettingsStore>,
    default_code: LockCode,
    cache: Mutex<CacheState>,
}

impl LockCodeStore {
    pub fn new(settings: Arc<dyn SettingsStore>, default_code: LockCode) -> Self {
        Self {
            settings,
            default_code,
            cache: Mutex::new(CacheState::default()),
        }
    }

    /// Build a store whose fallback is `config.default_lock_code`.
    pub fn from_config(settings: Arc<dyn SettingsStore>, config: &AppConfig) -> Result<Self> {
        Ok(Self::new(settings, config.default_code()?))
    }

    /// The fallback code.
    pub fn default_code(&self) -> &LockCode {
        &self.default_code
    }

    /// Return the current lock code, fetching it on a cache miss.
    #[instrument(skip_all)]
    pub async fn current_code(&self) -> LockCode {
        let generation = {
            let cache = self.lock_cache();
            if let Some(code) = &cache.code {
                return code.clone();
            }
            cache.generation
        };

        let code = match self.settings.get(LOCK_CODE_SETTINGS_KEY).await {
            Ok(Some(stored)) => match LockCode::parse(&stored) {
                Ok(code) => code,
                Err(e) => {
                    warn!(error = %e, "stored lock code is invalid, using default");
                    self.default_code.clone()
                }
            },
            Ok(None) => {
                debug!("no custom lock code set, using default");
                self.default_code.clone()
            }
            Err(e) => {
                warn!(error = %e, "lock code fetch failed, using default");
                self.default_code.clone()
            }
        };

        let mut cache = self.lock_cache();
        if cache.generation == generation {
            cache.code = Some(code.clone());
        }
        code
    }

    /// Validate and persist a new lock code.
    ///
    /// Tags already written keep the password they were locked with; only
    /// the old code opens them.
    #[instrument(skip_all)]
    pub async fn set_code(&self, candidate: &str) -> Result<()> {
        let code = LockCode::parse(candidate)?;
        self.persist(&code).await?;
        info!("lock code changed");
        Ok(())
    }

    /// Persist the default code.
    #[instrument(skip_all)]
    pub async fn reset_to_default(&self) -> Result<()> {
        let code = self.default_code.clone();
        self.persist(&code).await?;
        info!("lock code reset to default");
        Ok(())
    }

    /// Drop the cached code; the next read goes back to the store.
    pub fn invalidate_cache(&self) {
        let mut cache = self.lock_cache();
        cache.code = None;
        cache.generation = cache.generation.wrapping_add(1);
        debug!("lock code cache invalidated");
    }

    async fn persist(&self, code: &LockCode) -> Result<()> {
        self.settings
            .upsert(LOCK_CODE_SETTINGS_KEY, code.as_str())
            .await
            .map_err(|e| match e {
                CampSyncError::Persistence(_) => e,
                other => CampSyncError::Persistence(other.to_string()),
            })?;
        self.invalidate_cache();
        Ok(())
    }

    fn lock_cache(&self) -> MutexGuard<'_, CacheState> {
        // The cache holds no invariants a panicking holder could break.
        self.cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use super::*;

    /// In-memory store that counts reads and can be told to fail.
    #[derive(Default)]
    struct FakeSettings {
        values: Mutex<HashMap<String, String>>,
        gets: AtomicUsize,
        fail_get: AtomicBool,
        fail_upsert: AtomicBool,
    }

    #[async_trait]
    impl SettingsStore for FakeSettings {
        async fn get(&self, key: &str) -> Result<Option<String>> {
            self.gets.fetch_add(1, Ordering::SeqCst);
            if self.fail_get.load(Ordering::SeqCst) {
                return Err(CampSyncError::Database("connection reset".into()));
            }
            Ok(self.values.lock().unwrap().get(key).cloned())
        }

        async fn upsert(&self, key: &str, value: &str) -> Result<()> {
            if self.fail_upsert.load(Ordering::SeqCst) {
                return Err(CampSyncError::Database("read-only replica".into()));
            }
            self.values.lock().unwrap().insert(key.into(), value.into());
            Ok(())
        }
    }

    fn store_with(settings: Arc<FakeSettings>) -> LockCodeStore {
        LockCodeStore::from_config(settings, &AppConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn defaults_when_nothing_stored() {
        let store = store_with(Arc::new(FakeSettings::default()));
        assert_eq!(store.current_code().await.as_str(), "CAMPSYNC2024LOCK");
    }

    #[tokio::test]
    async fn fetch_failure_degrades_to_default() {
        let settings = Arc::new(FakeSettings::default());
        settings.fail_get.store(true, Ordering::SeqCst);
        let store = store_with(settings);
        assert_eq!(store.current_code().await.as_str(), "CAMPSYNC2024LOCK");
    }

    #[tokio::test]
    async fn invalid_stored_code_degrades_to_default() {
        let settings = Arc::new(FakeSettings::default());
        settings
            .values
            .lock()
            .unwrap()
            .insert(LOCK_CODE_SETTINGS_KEY.into(), "short".into());
        let store = store_with(settings);
        assert_eq!(store.current_code().await.as_str(), "CAMPSYNC2024LOCK");
    }

    #[tokio::test]
    async fn second_read_is_served_from_cache() {
        let settings = Arc::new(FakeSettings::default());
        let store = store_with(settings.clone());
        store.current_code().await;
        store.current_code().await;
        assert_eq!(settings.gets.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn set_code_is_visible_on_next_read() {
        let settings = Arc::new(FakeSettings::default());
        let store = store_with(settings.clone());
        assert_eq!(store.current_code().await.as_str(), "CAMPSYNC2024LOCK");

        store.set_code("ThisIsAValidCode123!").await.unwrap();
        assert_eq!(store.current_code().await.as_str(), "ThisIsAValidCode123!");
        assert_eq!(settings.gets.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn invalid_candidates_are_not_written() {
        let settings = Arc::new(FakeSettings::default());
        let store = store_with(settings.clone());
        for candidate in ["short", "bad code with spaces"] {
            let err = store.set_code(candidate).await.unwrap_err();
            assert!(matches!(err, CampSyncError::Validation(_)));
        }
        assert!(settings.values.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_write_keeps_previous_code() {
        let settings = Arc::new(FakeSettings::default());
        let store = store_with(settings.clone());
        store.set_code("FirstCode2026!").await.unwrap();
        assert_eq!(store.current_code().await.as_str(), "FirstCode2026!");

        settings.fail_upsert.store(true, Ordering::SeqCst);
        let err = store.set_code("SecondCode2026!").await.unwrap_err();
        assert!(matches!(err, CampSyncError::Persistence(_)));
        assert_eq!(store.current_code().await.as_str(), "FirstCode2026!");
    }

    #[tokio::test]
    async fn reset_restores_default() {
        let settings = Arc::new(FakeSettings::default());
        let store = store_with(settings.clone());
        store.set_code("CustomCode#42").await.unwrap();
        store.reset_to_default().await.unwrap();
        assert_eq!(store.current_code().await.as_str(), "CAMPSYNC2024LOCK");
        assert_eq!(
            settings.values.lock().unwrap().get(LOCK_CODE_SETTINGS_KEY).map(String::as_str),
            Some("CAMPSYNC2024LOCK")
        );
    }

    #[tokio::test]
    async fn invalidate_picks_up_out_of_band_change() {
        let settings = Arc::new(FakeSettings::default());
        let store = store_with(settings.clone());
        store.current_code().await;
        settings
            .values
            .lock()
            .unwrap()
            .insert(LOCK_CODE_SETTINGS_KEY.into(), "ChangedElsewhere1".into());

        assert_eq!(store.current_code().await.as_str(), "CAMPSYNC2024LOCK");
        store.invalidate_cache();
        assert_eq!(store.current_code().await.as_str(), "ChangedElsewhere1");
    }
}
