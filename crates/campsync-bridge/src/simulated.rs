// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Simulated NTAG215 wristband for desktop/CI builds where no NFC hardware
// exists.
//
// Models the parts of the chip the wristband flow depends on: 540 bytes of
// paged memory, one exclusive session at a time, NDEF TLV storage in the
// user area, and PWD_AUTH / AUTH0 write protection. Individual operations
// can be made to fail so callers' error paths can be exercised.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use campsync_core::error::{CampSyncError, Result};
use tracing::debug;

use crate::ndef;
use crate::ntag::*;
use crate::traits::NfcDriver;

/// Driver operations, for fault injection and call counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SimOp {
    Acquire,
    Release,
    Read,
    Write,
    RawCommand,
    HardwareId,
}

struct SimState {
    memory: Vec<u8>,
    session_open: bool,
    authenticated: bool,
    expose_uid: bool,
    faults: HashSet<SimOp>,
    calls: HashMap<SimOp, usize>,
}

/// An in-memory NTAG215 with an attached "reader".
pub struct SimulatedTag {
    state: Mutex<SimState>,
}

impl Default for SimulatedTag {
    fn default() -> Self {
        Self::new([0x04, 0xA1, 0xB2, 0xC3, 0xD4, 0xE5, 0xF6])
    }
}

impl SimulatedTag {
    /// A factory-fresh tag with the given 7-byte UID.
    pub fn new(uid: [u8; 7]) -> Self {
        let mut memory = vec![0u8; TOTAL_PAGES * PAGE_SIZE];
        // Page 0: UID0-2 + BCC0, page 1: UID3-6.
        memory[0..3].copy_from_slice(&uid[0..3]);
        memory[3] = 0x88 ^ uid[0] ^ uid[1] ^ uid[2];
        memory[4..8].copy_from_slice(&uid[3..7]);
        memory[8] = uid[3] ^ uid[4] ^ uid[5] ^ uid[6];
        put_page(&mut memory, CC_PAGE, NTAG215_CC);
        put_bytes(&mut memory, USER_START_PAGE, &ndef::wrap_tlv(&[]));
        put_page(&mut memory, CFG0_PAGE, FACTORY_CFG0);
        put_page(&mut memory, CFG1_PAGE, FACTORY_CFG1);
        put_page(&mut memory, PWD_PAGE, FACTORY_PWD);
        Self::with_memory(memory)
    }

    /// Restore a tag from a memory image saved with [`SimulatedTag::image`].
    pub fn from_image(image: Vec<u8>) -> Result<Self> {
        if image.len() != TOTAL_PAGES * PAGE_SIZE {
            return Err(CampSyncError::Format(format!(
                "tag image is {} bytes, expected {}",
                image.len(),
                TOTAL_PAGES * PAGE_SIZE
            )));
        }
        Ok(Self::with_memory(image))
    }

    fn with_memory(memory: Vec<u8>) -> Self {
        Self {
            state: Mutex::new(SimState {
                memory,
                session_open: false,
                authenticated: false,
                expose_uid: true,
                faults: HashSet::new(),
                calls: HashMap::new(),
            }),
        }
    }

    /// Full memory contents.
    pub fn image(&self) -> Vec<u8> {
        self.state().memory.clone()
    }

    /// Make every future `op` fail with a driver error.
    pub fn fail(&self, op: SimOp) {
        self.state().faults.insert(op);
    }

    /// Undo [`SimulatedTag::fail`].
    pub fn heal(&self, op: SimOp) {
        self.state().faults.remove(&op);
    }

    /// Behave like a platform that does not expose tag UIDs.
    pub fn hide_uid(&self) {
        self.state().expose_uid = false;
    }

    /// How many times `op` was attempted (including failed attempts).
    pub fn calls(&self, op: SimOp) -> usize {
        self.state().calls.get(&op).copied().unwrap_or(0)
    }

    pub fn session_open(&self) -> bool {
        self.state().session_open
    }

    /// Whether AUTH0 currently protects any user page.
    pub fn is_protected(&self) -> bool {
        self.state().auth0() <= USER_END_PAGE
    }

    /// Password stored in the PWD page.
    pub fn password(&self) -> [u8; 4] {
        self.state().page(PWD_PAGE)
    }

    /// Overwrite user memory with `text` directly, bypassing protection.
    /// Models a band written by some other system.
    pub fn preload_text(&self, text: &str) {
        let tlv = ndef::wrap_tlv(&ndef::encode_text_message(text, ndef::DEFAULT_LANGUAGE));
        let mut state = self.state();
        put_bytes(&mut state.memory, USER_START_PAGE, &tlv);
    }

    fn state(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Count the call, then apply fault injection and the session check.
    fn begin(&self, op: SimOp, needs_session: bool) -> Result<MutexGuard<'_, SimState>> {
        let mut state = self.state();
        *state.calls.entry(op).or_default() += 1;
        if state.faults.contains(&op) {
            return Err(CampSyncError::Driver(format!("{op:?} failed: Tag was lost")));
        }
        if needs_session && !state.session_open {
            return Err(CampSyncError::Driver(format!("{op:?} outside an NFC session")));
        }
        Ok(state)
    }
}

impl SimState {
    fn page(&self, page: u8) -> [u8; 4] {
        let start = page as usize * PAGE_SIZE;
        let mut out = [0u8; 4];
        out.copy_from_slice(&self.memory[start..start + PAGE_SIZE]);
        out
    }

    fn auth0(&self) -> u8 {
        self.page(CFG0_PAGE)[AUTH0_OFFSET]
    }

    fn reads_protected(&self) -> bool {
        self.page(CFG1_PAGE)[0] & ACCESS_PROT != 0
    }

    /// Reject access to `page` when it sits at or above AUTH0 and the
    /// session has not authenticated.
    fn check_access(&self, page: u8, write: bool) -> Result<()> {
        if self.authenticated || page < self.auth0() || (!write && !self.reads_protected()) {
            return Ok(());
        }
        Err(CampSyncError::Driver(format!(
            "page {page:#04x} is password protected"
        )))
    }
}

fn put_page(memory: &mut [u8], page: u8, data: [u8; 4]) {
    put_bytes(memory, page, &data);
}

fn put_bytes(memory: &mut [u8], page: u8, data: &[u8]) {
    let start = page as usize * PAGE_SIZE;
    memory[start..start + data.len()].copy_from_slice(data);
}

#[async_trait]
impl NfcDriver for SimulatedTag {
    fn platform_name(&self) -> &str {
        "Simulated NTAG215"
    }

    async fn acquire_session(&self) -> Result<()> {
        let mut state = self.begin(SimOp::Acquire, false)?;
        if state.session_open {
            return Err(CampSyncError::Driver("an NFC session is already active".into()));
        }
        state.session_open = true;
        state.authenticated = false;
        debug!("simulated session acquired");
        Ok(())
    }

    async fn release_session(&self) -> Result<()> {
        let mut state = self.begin(SimOp::Release, false)?;
        state.session_open = false;
        state.authenticated = false;
        Ok(())
    }

    async fn read_tag_bytes(&self) -> Result<Option<Vec<u8>>> {
        let state = self.begin(SimOp::Read, true)?;
        state.check_access(USER_START_PAGE, false)?;

        let start = USER_START_PAGE as usize * PAGE_SIZE;
        let area = &state.memory[start..start + USER_CAPACITY];
        match ndef::find_tlv_message(area)? {
            Some(msg) => Ok(Some(ndef::decode_text_message(msg)?.into_bytes())),
            None => Ok(None),
        }
    }

    async fn write_tag_bytes(&self, payload: &[u8]) -> Result<()> {
        let mut state = self.begin(SimOp::Write, true)?;

        let tlv = if payload.is_empty() {
            ndef::wrap_tlv(&[])
        } else {
            let text = std::str::from_utf8(payload)
                .map_err(|e| CampSyncError::Driver(format!("payload is not UTF-8: {e}")))?;
            ndef::wrap_tlv(&ndef::encode_text_message(text, ndef::DEFAULT_LANGUAGE))
        };
        if tlv.len() > USER_CAPACITY {
            return Err(CampSyncError::Driver(format!(
                "NDEF message of {} bytes exceeds tag capacity of {USER_CAPACITY} bytes",
                tlv.len()
            )));
        }

        let last_page = USER_START_PAGE + ((tlv.len() - 1) / PAGE_SIZE) as u8;
        for page in USER_START_PAGE..=last_page {
            state.check_access(page, true)?;
        }
        put_bytes(&mut state.memory, USER_START_PAGE, &tlv);
        debug!(bytes = tlv.len(), "simulated tag written");
        Ok(())
    }

    async fn send_raw_command(&self, command: &[u8]) -> Result<Vec<u8>> {
        let mut state = self.begin(SimOp::RawCommand, true)?;

        match command {
            [CMD_PWD_AUTH, pwd @ ..] if pwd.len() == 4 => {
                if *pwd == state.page(PWD_PAGE) {
                    state.authenticated = true;
                    let pack = state.page(PACK_PAGE);
                    Ok(pack[..2].to_vec())
                } else {
                    Err(CampSyncError::Driver("PWD_AUTH rejected (NAK)".into()))
                }
            }
            [CMD_WRITE, page, data @ ..] if data.len() == 4 => {
                let page = *page;
                if page <= 0x02 || page as usize >= TOTAL_PAGES {
                    return Err(CampSyncError::Driver(format!(
                        "page {page:#04x} is read-only or out of range"
                    )));
                }
                state.check_access(page, true)?;
                put_bytes(&mut state.memory, page, data);
                Ok(vec![ACK])
            }
            [CMD_READ, page] => {
                let page = *page;
                if page as usize >= TOTAL_PAGES {
                    return Err(CampSyncError::Driver(format!("page {page:#04x} out of range")));
                }
                state.check_access(page, false)?;
                // Four pages, rolling over at the end of memory. PWD and
                // PACK always read back as zeros.
                let mut out = Vec::with_capacity(16);
                for offset in 0..4u8 {
                    let p = ((page as usize + offset as usize) % TOTAL_PAGES) as u8;
                    if p == PWD_PAGE || p == PACK_PAGE {
                        out.extend_from_slice(&[0u8; 4]);
                    } else {
                        out.extend_from_slice(&state.page(p));
                    }
                }
                Ok(out)
            }
            _ => Err(CampSyncError::Driver(format!(
                "unsupported command {:02X?}",
                command
            ))),
        }
    }

    async fn tag_hardware_id(&self) -> Result<Option<String>> {
        let state = self.begin(SimOp::HardwareId, true)?;
        if !state.expose_uid {
            return Ok(None);
        }
        let mut uid = Vec::with_capacity(7);
        uid.extend_from_slice(&state.memory[0..3]);
        uid.extend_from_slice(&state.memory[4..8]);
        Ok(Some(hex::encode_upper(&uid)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fresh_tag_reads_empty() {
        let tag = SimulatedTag::default();
        tag.acquire_session().await.unwrap();
        assert_eq!(tag.read_tag_bytes().await.unwrap(), None);
        assert_eq!(
            tag.tag_hardware_id().await.unwrap().as_deref(),
            Some("04A1B2C3D4E5F6")
        );
        tag.release_session().await.unwrap();
    }

    #[tokio::test]
    async fn uid_skips_check_byte_and_pads_each_byte() {
        let mut image = SimulatedTag::default().image();
        image[0..4].copy_from_slice(&[0x04, 0xAB, 0x0C, 0x99]);
        image[4..8].copy_from_slice(&[0xDE, 0xAD, 0x00, 0x1F]);
        let tag = SimulatedTag::from_image(image).unwrap();
        tag.acquire_session().await.unwrap();
        assert_eq!(
            tag.tag_hardware_id().await.unwrap().as_deref(),
            Some("04AB0CDEAD001F")
        );
        tag.release_session().await.unwrap();
    }

    #[tokio::test]
    async fn write_then_read() {
        let tag = SimulatedTag::default();
        tag.acquire_session().await.unwrap();
        tag.write_tag_bytes(b"abcd1234:{}").await.unwrap();
        assert_eq!(tag.read_tag_bytes().await.unwrap(), Some(b"abcd1234:{}".to_vec()));

        tag.write_tag_bytes(b"").await.unwrap();
        assert_eq!(tag.read_tag_bytes().await.unwrap(), None);
    }

    #[tokio::test]
    async fn sessions_are_exclusive() {
        let tag = SimulatedTag::default();
        tag.acquire_session().await.unwrap();
        assert!(tag.acquire_session().await.is_err());
        tag.release_session().await.unwrap();
        tag.release_session().await.unwrap();
        assert!(tag.acquire_session().await.is_ok());
    }

    #[tokio::test]
    async fn calls_outside_session_fail() {
        let tag = SimulatedTag::default();
        assert!(matches!(tag.read_tag_bytes().await, Err(CampSyncError::Driver(_))));
        assert!(tag.write_tag_bytes(b"x").await.is_err());
    }

    #[tokio::test]
    async fn capacity_enforced() {
        let tag = SimulatedTag::default();
        tag.acquire_session().await.unwrap();
        let err = tag.write_tag_bytes(&[b'x'; 600]).await.unwrap_err();
        assert!(err.to_string().contains("capacity"));
    }

    #[tokio::test]
    async fn password_protection_blocks_writes_until_auth() {
        let tag = SimulatedTag::default();
        let pwd = *b"CAMP";
        tag.acquire_session().await.unwrap();
        tag.send_raw_command(&write_command(PWD_PAGE, pwd)).await.unwrap();
        tag.send_raw_command(&write_command(CFG0_PAGE, [0x04, 0, 0, 0x04])).await.unwrap();
        assert!(tag.is_protected());
        tag.release_session().await.unwrap();

        tag.acquire_session().await.unwrap();
        // Reads stay open with PROT clear.
        assert_eq!(tag.read_tag_bytes().await.unwrap(), None);
        let err = tag.write_tag_bytes(b"x").await.unwrap_err();
        assert!(err.to_string().contains("password protected"));

        assert!(tag.send_raw_command(&pwd_auth_command(*b"NOPE")).await.is_err());
        assert_eq!(tag.send_raw_command(&pwd_auth_command(pwd)).await.unwrap(), vec![0, 0]);
        tag.write_tag_bytes(b"x").await.unwrap();
    }

    #[tokio::test]
    async fn read_hides_password() {
        let tag = SimulatedTag::default();
        tag.acquire_session().await.unwrap();
        tag.send_raw_command(&write_command(PWD_PAGE, *b"CAMP")).await.unwrap();
        let pages = tag.send_raw_command(&[CMD_READ, CFG0_PAGE]).await.unwrap();
        assert_eq!(pages.len(), 16);
        assert_eq!(&pages[0..4], &FACTORY_CFG0);
        assert_eq!(&pages[8..12], &[0, 0, 0, 0]);
        assert_eq!(tag.password(), *b"CAMP");
    }

    #[tokio::test]
    async fn injected_faults_and_counts() {
        let tag = SimulatedTag::default();
        tag.fail(SimOp::Acquire);
        assert!(tag.acquire_session().await.is_err());
        tag.heal(SimOp::Acquire);
        tag.acquire_session().await.unwrap();
        assert_eq!(tag.calls(SimOp::Acquire), 2);
    }

    #[tokio::test]
    async fn image_round_trip() {
        let tag = SimulatedTag::default();
        tag.preload_text("hello band");
        let restored = SimulatedTag::from_image(tag.image()).unwrap();
        restored.acquire_session().await.unwrap();
        assert_eq!(restored.read_tag_bytes().await.unwrap(), Some(b"hello band".to_vec()));
        assert!(SimulatedTag::from_image(vec![0; 10]).is_err());
    }
}
