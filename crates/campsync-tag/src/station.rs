// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Wristband station: sequences one physical tag interaction at a time.
//
//   program: Fetching -> Acquiring -> Writing -> Locking -> Releasing -> Done
//   read:    Fetching -> Acquiring -> Reading -> Releasing -> Done
//   erase:   Fetching -> Acquiring -> Writing -> Locking -> Releasing -> Done
//
// Any phase may move to Failed. The lock code is fetched and the payload
// encoded, wrapped and size-checked before the tag is touched. The session
// is released on every path, including when the caller drops the future.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};

use campsync_bridge::NfcDriver;
use campsync_bridge::ndef;
use campsync_bridge::ntag::USER_CAPACITY;
use campsync_core::AppConfig;
use campsync_core::error::{CampSyncError, Result};
use campsync_core::payload;
use campsync_core::types::{
    ProgrammedWristband, ReadOutcome, SessionPhase, WristbandRecord, WristbandScan,
};
use campsync_security::LockCodeStore;
use campsync_security::integrity;
use chrono::Utc;
use tracing::{debug, info, instrument, warn};

use crate::best_effort::best_effort;
use crate::password::{self, TagPassword};

/// Bytes `wrapped` occupies on the tag as one text record in a TLV block.
fn framed_len(wrapped: &str) -> usize {
    ndef::wrap_tlv(&ndef::encode_text_message(wrapped, ndef::DEFAULT_LANGUAGE)).len()
}

/// A band whose NDEF content is not our text record is foreign, not a
/// payload that failed to parse.
fn foreign_band(err: CampSyncError) -> CampSyncError {
    match err {
        CampSyncError::Format(detail) => CampSyncError::Integrity(detail),
        other => other,
    }
}

/// Releases the driver session if dropped before `release` ran.
struct SessionGuard {
    driver: Arc<dyn NfcDriver>,
    armed: bool,
}

impl SessionGuard {
    fn arm(driver: Arc<dyn NfcDriver>) -> Self {
        Self {
            driver,
            armed: true,
        }
    }

    async fn release(mut self) -> Result<()> {
        self.armed = false;
        self.driver.release_session().await
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let driver = Arc::clone(&self.driver);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                warn!("tag operation abandoned, releasing session in background");
                handle.spawn(async move {
                    if let Err(e) = driver.release_session().await {
                        warn!(error = %e, "background session release failed");
                    }
                });
            }
            Err(_) => warn!("tag operation abandoned outside a runtime, session not released"),
        }
    }
}

/// Programs, reads, and erases wristbands through an injected NFC driver.
pub struct WristbandStation {
    driver: Arc<dyn NfcDriver>,
    lock_codes: Arc<LockCodeStore>,
    config: AppConfig,
    busy: tokio::sync::Mutex<()>,
    phase: Mutex<SessionPhase>,
}

impl WristbandStation {
    pub fn new(driver: Arc<dyn NfcDriver>, lock_codes: Arc<LockCodeStore>, config: AppConfig) -> Self {
        Self {
            driver,
            lock_codes,
            config,
            busy: tokio::sync::Mutex::new(()),
            phase: Mutex::new(SessionPhase::Idle),
        }
    }

    /// Phase of the current or most recent operation.
    pub fn phase(&self) -> SessionPhase {
        *self.phase_slot()
    }

    /// Encode `record` onto the tag in the field and password-protect it.
    ///
    /// Fails with `SizeExceeded` before touching the tag when the wrapped
    /// payload is over budget or would not fit in user memory once framed. A failed protection step is logged and
    /// reported through `ProgrammedWristband::protected`.
    #[instrument(skip_all, fields(camper_id = %record.id))]
    pub async fn program_tag(&self, record: &WristbandRecord) -> Result<ProgrammedWristband> {
        let _busy = self.claim()?;
        let op = "program";

        self.enter(op, SessionPhase::Fetching);
        let code = self.lock_codes.current_code().await;
        let password = TagPassword::from_code(&code);
        let generated_at = Utc::now().timestamp_millis();
        let plain = payload::encode_at(record, generated_at);
        let wrapped =
            integrity::wrap_with_len(&plain, code.as_str(), self.config.digest_prefix_len);

        if wrapped.len() > self.config.payload_budget {
            self.enter(op, SessionPhase::Failed);
            return Err(CampSyncError::SizeExceeded {
                actual: wrapped.len(),
                limit: self.config.payload_budget,
            });
        }
        // The record header and TLV framing must fit in user memory too.
        let framed = framed_len(&wrapped);
        if framed > USER_CAPACITY {
            self.enter(op, SessionPhase::Failed);
            return Err(CampSyncError::SizeExceeded {
                actual: framed,
                limit: USER_CAPACITY,
            });
        }

        let programmed = self
            .in_session(op, async {
                // A band re-programmed under the same code is still locked.
                self.unlock_if_protected(&password).await?;

                self.enter(op, SessionPhase::Writing);
                self.driver.write_tag_bytes(wrapped.as_bytes()).await?;

                self.enter(op, SessionPhase::Locking);
                let protected = best_effort("set password", self.protect(&password))
                    .await?
                    .is_some();

                let wristband_id = match best_effort("read UID", self.driver.tag_hardware_id()).await? {
                    Some(Some(uid)) => uid,
                    _ => format!("WB-{}", Utc::now().timestamp_millis()),
                };

                Ok(ProgrammedWristband {
                    wristband_id,
                    payload_len: wrapped.len(),
                    generated_at,
                    protected,
                })
            })
            .await?;

        info!(
            wristband_id = %programmed.wristband_id,
            payload_len = programmed.payload_len,
            protected = programmed.protected,
            "wristband programmed"
        );
        Ok(programmed)
    }

    /// Read, verify, and decode the tag in the field.
    #[instrument(skip_all)]
    pub async fn read_tag(&self) -> Result<ReadOutcome> {
        let _busy = self.claim()?;
        let op = "read";

        self.enter(op, SessionPhase::Fetching);
        let code = self.lock_codes.current_code().await;

        let outcome = self
            .in_session(op, async {
                self.enter(op, SessionPhase::Reading);
                let bytes = match self.driver.read_tag_bytes().await.map_err(foreign_band)? {
                    Some(bytes) if !bytes.is_empty() => bytes,
                    _ => return Ok(ReadOutcome::Empty),
                };

                // Invalid UTF-8 cannot carry a valid prefix; let the digest
                // check reject it.
                let text = String::from_utf8_lossy(&bytes);
                let plain =
                    integrity::unwrap_with_len(&text, code.as_str(), self.config.digest_prefix_len)?;
                let decoded = payload::decode(&plain)?;

                Ok(ReadOutcome::Wristband(WristbandScan {
                    record: decoded.record,
                    is_locked: true,
                    generated_at: decoded.generated_at,
                }))
            })
            .await?;

        match &outcome {
            ReadOutcome::Empty => info!("wristband is empty"),
            ReadOutcome::Wristband(scan) => info!(camper_id = %scan.record.id, "wristband read"),
        }
        Ok(outcome)
    }

    /// Clear the payload and remove password protection.
    #[instrument(skip_all)]
    pub async fn erase_tag(&self) -> Result<()> {
        let _busy = self.claim()?;
        let op = "erase";

        self.enter(op, SessionPhase::Fetching);
        let code = self.lock_codes.current_code().await;
        let password = TagPassword::from_code(&code);

        self.in_session(op, async {
            self.unlock_if_protected(&password).await?;

            self.enter(op, SessionPhase::Writing);
            self.driver.write_tag_bytes(&[]).await?;

            self.enter(op, SessionPhase::Locking);
            best_effort("clear password", self.clear_protection()).await?;
            Ok(())
        })
        .await?;

        info!("wristband erased");
        Ok(())
    }

    /// Acquire, run `body`, release. Release runs whatever `body` returned;
    /// a release failure is logged and does not override the result.
    async fn in_session<T>(
        &self,
        op: &'static str,
        body: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        let guard = SessionGuard::arm(Arc::clone(&self.driver));

        self.enter(op, SessionPhase::Acquiring);
        let result = match self.driver.acquire_session().await {
            Ok(()) => body.await,
            Err(e) => Err(e),
        };

        self.enter(op, SessionPhase::Releasing);
        if let Err(e) = guard.release().await {
            warn!(op, error = %e, "session release failed");
        }

        match &result {
            Ok(_) => self.enter(op, SessionPhase::Done),
            Err(e) => {
                warn!(op, error = %e, "tag operation failed");
                self.enter(op, SessionPhase::Failed);
            }
        }
        result
    }

    /// Probe CFG0 and send PWD_AUTH when user pages are protected. An
    /// unreadable config is treated as protected.
    async fn unlock_if_protected(&self, password: &TagPassword) -> Result<()> {
        let config = best_effort(
            "read config",
            self.driver.send_raw_command(&password::read_config_command()),
        )
        .await?;
        let protected = config
            .as_deref()
            .is_none_or(password::config_shows_protection);

        if protected {
            best_effort("unlock", self.driver.send_raw_command(&password.auth_command())).await?;
        }
        Ok(())
    }

    async fn protect(&self, password: &TagPassword) -> Result<()> {
        for command in password.protect_commands(self.config.protect_from_page) {
            let response = self.driver.send_raw_command(&command).await?;
            password::expect_ack(&response)?;
        }
        Ok(())
    }

    async fn clear_protection(&self) -> Result<()> {
        let response = self
            .driver
            .send_raw_command(&password::clear_protection_command())
            .await?;
        password::expect_ack(&response)
    }

    fn claim(&self) -> Result<tokio::sync::MutexGuard<'_, ()>> {
        self.busy.try_lock().map_err(|_| CampSyncError::SessionBusy)
    }

    fn enter(&self, op: &'static str, next: SessionPhase) {
        let mut phase = self.phase_slot();
        debug!(op, from = %*phase, to = %next, "tag session phase");
        *phase = next;
    }

    fn phase_slot(&self) -> MutexGuard<'_, SessionPhase> {
        self.phase.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
