// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Platform-agnostic NFC driver trait.
//
// The iOS (Core NFC) and Android (NfcA / Ndef) stacks are wrapped behind
// this trait by the host app. Everything above it only sees bytes.

use async_trait::async_trait;
use campsync_core::error::Result;

/// Exclusive access to the device's single NFC transceiver.
///
/// Every call except `release_session` must happen inside an acquired
/// session. After a failed low-level call the driver state is undefined;
/// callers release and reacquire before retrying.
#[async_trait]
pub trait NfcDriver: Send + Sync {
    /// Human-readable driver name (e.g. "Core NFC", "Simulated NTAG215").
    fn platform_name(&self) -> &str;

    /// Begin an exclusive tag interaction. May show a platform prompt and
    /// waits for a tag to enter the field.
    async fn acquire_session(&self) -> Result<()>;

    /// End the interaction. Safe to call with no session active.
    async fn release_session(&self) -> Result<()>;

    /// Text payload of the tag's NDEF text record; `None` if the tag holds
    /// no payload.
    async fn read_tag_bytes(&self) -> Result<Option<Vec<u8>>>;

    /// Replace the tag's NDEF message with one text record carrying
    /// `payload`. An empty payload leaves an empty NDEF message.
    async fn write_tag_bytes(&self, payload: &[u8]) -> Result<()>;

    /// Transceive a raw NFC-A frame and return the tag's response.
    async fn send_raw_command(&self, command: &[u8]) -> Result<Vec<u8>>;

    /// Tag UID as uppercase hex, if the platform exposes it.
    async fn tag_hardware_id(&self) -> Result<Option<String>>;
}
