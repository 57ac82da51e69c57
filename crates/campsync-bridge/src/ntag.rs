// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// NTAG215 memory map and command set (NXP NTAG213/215/216 datasheet).

/// Bytes per page.
pub const PAGE_SIZE: usize = 4;
/// Total pages on an NTAG215 (540 bytes).
pub const TOTAL_PAGES: usize = 135;
/// First user-memory page.
pub const USER_START_PAGE: u8 = 0x04;
/// Last user-memory page.
pub const USER_END_PAGE: u8 = 0x81;
/// User memory available for the NDEF TLV.
pub const USER_CAPACITY: usize = (USER_END_PAGE - USER_START_PAGE + 1) as usize * PAGE_SIZE;

/// Capability container page.
pub const CC_PAGE: u8 = 0x03;
/// MIRROR, RFUI, MIRROR_PAGE, AUTH0.
pub const CFG0_PAGE: u8 = 0x83;
/// ACCESS, RFUI, RFUI, RFUI.
pub const CFG1_PAGE: u8 = 0x84;
pub const PWD_PAGE: u8 = 0x85;
/// PACK (2 bytes) + RFUI.
pub const PACK_PAGE: u8 = 0x86;

/// Byte offset of AUTH0 inside CFG0.
pub const AUTH0_OFFSET: usize = 3;
/// AUTH0 value that disables password protection.
pub const AUTH0_DISABLED: u8 = 0xFF;
/// ACCESS bit: set = reads are protected too, clear = writes only.
pub const ACCESS_PROT: u8 = 0x80;

/// READ (returns four pages).
pub const CMD_READ: u8 = 0x30;
/// WRITE one page.
pub const CMD_WRITE: u8 = 0xA2;
/// PWD_AUTH with a four-byte password.
pub const CMD_PWD_AUTH: u8 = 0x1B;

/// Positive acknowledgement for WRITE.
pub const ACK: u8 = 0x0A;

/// Factory CFG0: no mirror, protection disabled.
pub const FACTORY_CFG0: [u8; 4] = [0x04, 0x00, 0x00, AUTH0_DISABLED];
/// Factory CFG1.
pub const FACTORY_CFG1: [u8; 4] = [0x00, 0x05, 0x00, 0x00];
/// Factory password.
pub const FACTORY_PWD: [u8; 4] = [0xFF; 4];
/// NFC Forum Type 2 capability container for 496 bytes of NDEF data.
pub const NTAG215_CC: [u8; 4] = [0xE1, 0x10, 0x3E, 0x00];

/// Build a WRITE command frame.
pub fn write_command(page: u8, data: [u8; 4]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(6);
    frame.push(CMD_WRITE);
    frame.push(page);
    frame.extend_from_slice(&data);
    frame
}

/// Build a PWD_AUTH command frame.
pub fn pwd_auth_command(password: [u8; 4]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(5);
    frame.push(CMD_PWD_AUTH);
    frame.extend_from_slice(&password);
    frame
}
