// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Stub driver for desktop/CI builds with no NFC reader attached.
//
// Every tag call returns `PlatformUnavailable`. Releasing is a no-op so the
// session orchestrator's cleanup path stays quiet.

use async_trait::async_trait;
use campsync_core::error::{CampSyncError, Result};

use crate::traits::NfcDriver;

/// Driver used when the host has no NFC hardware.
pub struct StubNfcDriver;

#[async_trait]
impl NfcDriver for StubNfcDriver {
    fn platform_name(&self) -> &str {
        "Desktop (stub)"
    }

    async fn acquire_session(&self) -> Result<()> {
        tracing::warn!("NfcDriver::acquire_session called on stub driver");
        Err(CampSyncError::PlatformUnavailable)
    }

    async fn release_session(&self) -> Result<()> {
        Ok(())
    }

    async fn read_tag_bytes(&self) -> Result<Option<Vec<u8>>> {
        Err(CampSyncError::PlatformUnavailable)
    }

    async fn write_tag_bytes(&self, _payload: &[u8]) -> Result<()> {
        Err(CampSyncError::PlatformUnavailable)
    }

    async fn send_raw_command(&self, _command: &[u8]) -> Result<Vec<u8>> {
        Err(CampSyncError::PlatformUnavailable)
    }

    async fn tag_hardware_id(&self) -> Result<Option<String>> {
        Err(CampSyncError::PlatformUnavailable)
    }
}
