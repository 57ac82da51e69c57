// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// NDEF Text records (NFC Forum RTD-Text) inside a Type 2 tag TLV.
//
// A wristband holds exactly one Well-Known "T" record:
//
//   TLV:    03 <len> <message> FE          (len >= 0xFF uses FF <hi> <lo>)
//   record: <header> 01 <payload len> 'T' <status> <lang> <text>
//   header: MB|ME|SR|TNF=1 = 0xD1 for payloads up to 255 bytes, else 0xC1
//           with a four-byte payload length.

use campsync_core::error::{CampSyncError, Result};

pub const TLV_NULL: u8 = 0x00;
pub const TLV_NDEF_MESSAGE: u8 = 0x03;
pub const TLV_TERMINATOR: u8 = 0xFE;

const FLAG_MB: u8 = 0x80;
const FLAG_ME: u8 = 0x40;
const FLAG_SR: u8 = 0x10;
const FLAG_IL: u8 = 0x08;
const TNF_MASK: u8 = 0x07;
const TNF_WELL_KNOWN: u8 = 0x01;
const RTD_TEXT: &[u8] = b"T";

/// Status-byte bit selecting UTF-16 text.
const STATUS_UTF16: u8 = 0x80;
const STATUS_LANG_LEN_MASK: u8 = 0x3F;

/// Language code written with every record.
pub const DEFAULT_LANGUAGE: &str = "en";

/// Build a one-record NDEF message carrying `text` as UTF-8.
pub fn encode_text_message(text: &str, language: &str) -> Vec<u8> {
    let lang = &language.as_bytes()[..language.len().min(STATUS_LANG_LEN_MASK as usize)];
    let payload_len = 1 + lang.len() + text.len();
    let short = payload_len <= 0xFF;

    let mut msg = Vec::with_capacity(payload_len + 7);
    let mut header = FLAG_MB | FLAG_ME | TNF_WELL_KNOWN;
    if short {
        header |= FLAG_SR;
    }
    msg.push(header);
    msg.push(RTD_TEXT.len() as u8);
    if short {
        msg.push(payload_len as u8);
    } else {
        msg.extend_from_slice(&(payload_len as u32).to_be_bytes());
    }
    msg.extend_from_slice(RTD_TEXT);
    msg.push(lang.len() as u8);
    msg.extend_from_slice(lang);
    msg.extend_from_slice(text.as_bytes());
    msg
}

/// Extract the text of the first record of an NDEF message.
pub fn decode_text_message(msg: &[u8]) -> Result<String> {
    let header = *msg.first().ok_or_else(|| malformed("empty message"))?;
    if header & TNF_MASK != TNF_WELL_KNOWN {
        return Err(malformed("record is not a well-known type"));
    }

    let type_len = *msg.get(1).ok_or_else(|| malformed("truncated header"))? as usize;
    let mut idx = 2;
    let payload_len = if header & FLAG_SR != 0 {
        let len = *msg.get(idx).ok_or_else(|| malformed("truncated header"))? as usize;
        idx += 1;
        len
    } else {
        let bytes: [u8; 4] = msg
            .get(idx..idx + 4)
            .and_then(|b| b.try_into().ok())
            .ok_or_else(|| malformed("truncated header"))?;
        idx += 4;
        u32::from_be_bytes(bytes) as usize
    };
    let id_len = if header & FLAG_IL != 0 {
        let len = *msg.get(idx).ok_or_else(|| malformed("truncated header"))? as usize;
        idx += 1;
        len
    } else {
        0
    };

    let record_type = msg
        .get(idx..idx + type_len)
        .ok_or_else(|| malformed("truncated type"))?;
    if record_type != RTD_TEXT {
        return Err(malformed("record is not a text record"));
    }
    idx += type_len + id_len;

    let payload = msg
        .get(idx..idx + payload_len)
        .ok_or_else(|| malformed("payload runs past end of message"))?;
    let status = *payload.first().ok_or_else(|| malformed("missing status byte"))?;
    if status & STATUS_UTF16 != 0 {
        return Err(malformed("UTF-16 text records are not supported"));
    }
    let lang_len = (status & STATUS_LANG_LEN_MASK) as usize;
    let text = payload
        .get(1 + lang_len..)
        .ok_or_else(|| malformed("language code runs past payload"))?;

    String::from_utf8(text.to_vec()).map_err(|e| malformed(&e.to_string()))
}

/// Frame an NDEF message as a TLV block with terminator.
pub fn wrap_tlv(message: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(message.len() + 5);
    out.push(TLV_NDEF_MESSAGE);
    if message.len() < 0xFF {
        out.push(message.len() as u8);
    } else {
        out.push(0xFF);
        out.extend_from_slice(&(message.len() as u16).to_be_bytes());
    }
    out.extend_from_slice(message);
    out.push(TLV_TERMINATOR);
    out
}

/// Find the NDEF message TLV in a tag's user area.
///
/// Returns `None` for an empty message TLV, or when the area holds no
/// message TLV before the terminator.
pub fn find_tlv_message(area: &[u8]) -> Result<Option<&[u8]>> {
    let mut idx = 0;
    while let Some(&tag) = area.get(idx) {
        match tag {
            TLV_NULL => idx += 1,
            TLV_TERMINATOR => return Ok(None),
            _ => {
                let (len, header_len) = match area.get(idx + 1) {
                    Some(0xFF) => {
                        let bytes: [u8; 2] = area
                            .get(idx + 2..idx + 4)
                            .and_then(|b| b.try_into().ok())
                            .ok_or_else(|| malformed("truncated TLV length"))?;
                        (u16::from_be_bytes(bytes) as usize, 4)
                    }
                    Some(&len) => (len as usize, 2),
                    None => return Err(malformed("truncated TLV")),
                };
                let value = area
                    .get(idx + header_len..idx + header_len + len)
                    .ok_or_else(|| malformed("TLV runs past end of user memory"))?;
                if tag == TLV_NDEF_MESSAGE {
                    return Ok((!value.is_empty()).then_some(value));
                }
                idx += header_len + len;
            }
        }
    }
    Ok(None)
}

fn malformed(detail: &str) -> CampSyncError {
    CampSyncError::Format(format!("NDEF: {detail}"))
}
