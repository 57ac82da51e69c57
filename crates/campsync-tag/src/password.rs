// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Physical tag password derived from the lock code, and the NTAG215
// command frames that set, use, and clear it.

use campsync_bridge::ntag::{
    self, ACK, AUTH0_OFFSET, CFG0_PAGE, CFG1_PAGE, FACTORY_CFG0, FACTORY_CFG1, PACK_PAGE,
    PWD_PAGE,
};
use campsync_core::error::{CampSyncError, Result};
use campsync_core::types::LockCode;

/// Four-byte PWD value for NTAG password protection.
#[derive(Clone, PartialEq, Eq)]
pub struct TagPassword([u8; 4]);

impl TagPassword {
    /// The first four characters of the code, repeating the code from the
    /// start if it is shorter than four.
    pub fn from_code(code: &LockCode) -> Self {
        Self(derive(code.as_str()))
    }

    pub fn bytes(&self) -> [u8; 4] {
        self.0
    }

    /// PWD_AUTH frame.
    pub fn auth_command(&self) -> Vec<u8> {
        ntag::pwd_auth_command(self.0)
    }

    /// WRITE frames that store the password and protect writes from
    /// `protect_from_page` on. Order matters: AUTH0 goes last so the
    /// password is in place before protection starts.
    pub fn protect_commands(&self, protect_from_page: u8) -> Vec<Vec<u8>> {
        // PROT clear: writes need the password, reads stay open for staff.
        let mut cfg1 = FACTORY_CFG1;
        cfg1[0] = 0x00;
        let mut cfg0 = FACTORY_CFG0;
        cfg0[AUTH0_OFFSET] = protect_from_page;

        vec![
            ntag::write_command(PWD_PAGE, self.0),
            ntag::write_command(PACK_PAGE, [0x00; 4]),
            ntag::write_command(CFG1_PAGE, cfg1),
            ntag::write_command(CFG0_PAGE, cfg0),
        ]
    }
}

// Keep the password out of logs.
impl std::fmt::Debug for TagPassword {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("TagPassword(****)")
    }
}

/// WRITE frame that switches protection off (AUTH0 = 0xFF).
pub fn clear_protection_command() -> Vec<u8> {
    ntag::write_command(CFG0_PAGE, FACTORY_CFG0)
}

/// READ frame for the four pages starting at CFG0.
pub fn read_config_command() -> Vec<u8> {
    vec![ntag::CMD_READ, CFG0_PAGE]
}

/// Whether a READ response starting at CFG0 shows user pages protected.
pub fn config_shows_protection(response: &[u8]) -> bool {
    response
        .get(AUTH0_OFFSET)
        .is_some_and(|&auth0| auth0 <= ntag::USER_END_PAGE)
}

/// Turn a WRITE response into an error unless it is a bare ACK.
pub fn expect_ack(response: &[u8]) -> Result<()> {
    if response == [ACK] {
        Ok(())
    } else {
        Err(CampSyncError::Driver(format!(
            "tag answered {response:02X?} instead of ACK"
        )))
    }
}

fn derive(code: &str) -> [u8; 4] {
    let bytes = code.as_bytes();
    let mut out = [0u8; 4];
    if bytes.is_empty() {
        return out;
    }
    for (i, slot) in out.iter_mut().enumerate() {
        *slot = bytes[i % bytes.len()];
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn takes_first_four_characters() {
        let code = LockCode::parse("CAMPSYNC2024LOCK").unwrap();
        assert_eq!(TagPassword::from_code(&code).bytes(), *b"CAMP");
    }

    #[test]
    fn short_input_wraps() {
        assert_eq!(derive("ab"), *b"abab");
        assert_eq!(derive("xyz"), *b"xyzx");
        assert_eq!(derive(""), [0; 4]);
    }

    #[test]
    fn protect_sequence_ends_with_auth0() {
        let code = LockCode::parse("CAMPSYNC2024LOCK").unwrap();
        let cmds = TagPassword::from_code(&code).protect_commands(4);
        assert_eq!(cmds.len(), 4);
        assert_eq!(cmds[0], vec![0xA2, 0x85, b'C', b'A', b'M', b'P']);
        assert_eq!(cmds[3], vec![0xA2, 0x83, 0x04, 0x00, 0x00, 0x04]);
    }

    #[test]
    fn protection_detection() {
        assert!(config_shows_protection(&[0x04, 0, 0, 0x04]));
        assert!(!config_shows_protection(&[0x04, 0, 0, 0xFF]));
        assert!(!config_shows_protection(&[]));
    }

    #[test]
    fn ack_check() {
        assert!(expect_ack(&[0x0A]).is_ok());
        assert!(matches!(expect_ack(&[0x00]), Err(CampSyncError::Driver(_))));
    }
}
