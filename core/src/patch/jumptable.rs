/*
    SPDX-License-Identifier: AGPL-3.0-or-later
    SPDX-FileCopyrightText: 2026 Remora contributors
*/
use log::debug;

use crate::be_u16;
use crate::error::{PatchError, Result};

/// One slot of the SCSI command dispatch table.
///
/// A slot is stored as a big-endian handler address followed by the command
/// type byte; `slot` is the absolute offset of the address field, which is
/// what a patch overwrites to retarget the command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JumpTableEntry {
    pub command: u8,
    pub slot: u16,
    pub handler: u16,
}

fn is_terminator(buf: &[u8]) -> bool {
    buf.len() >= 9
        && buf[0] == 0xDF
        && buf[3] == 0xE0
        && buf[6] == 0xFF
        && buf[7] == 0
        && buf[8] == 0
}

fn is_head(buf: &[u8]) -> bool {
    buf.len() >= 7 && buf[0] == 0xE0 && buf[1] == 0x12 && buf[6] == 0x03
}

/// Locates the SCSI command dispatch table in raw 8051 code and returns its
/// entries in table order.
///
/// Only the first table is reported; the firmwares seen so far consult this
/// one first, so it is the one worth patching. The search keys on the
/// terminator signature `df ?? ?? e0 ?? ?? ff 00 00`, then walks backward
/// to the table head (`e0 12 ?? ?? ?? ?? 03`, body 4 bytes in).
pub fn find_jump_table(code: &[u8]) -> Result<Vec<JumpTableEntry>> {
    for i in 0..code.len() {
        if !is_terminator(&code[i..]) {
            continue;
        }

        for k in (0..=i).rev() {
            if !is_head(&code[k..]) {
                continue;
            }

            let entries = parse_entries(code, k + 4)?;
            debug!("dispatch table at {:#06x} with {} entries", k + 4, entries.len());
            return Ok(entries);
        }
    }

    Err(PatchError::JumpTableNotFound.into())
}

fn parse_entries(code: &[u8], mut at: usize) -> Result<Vec<JumpTableEntry>> {
    let mut entries = Vec::new();

    loop {
        if at + 2 > code.len() {
            return Err(PatchError::JumpTableNotFound.into());
        }
        let handler = be_u16!(code, at);
        if handler == 0 {
            break;
        }

        if at + 3 > code.len() {
            return Err(PatchError::JumpTableNotFound.into());
        }
        entries.push(JumpTableEntry { command: code[at + 2], slot: at as u16, handler });
        at += 3;
    }

    Ok(entries)
}
