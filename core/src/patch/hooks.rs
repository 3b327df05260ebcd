/*
    SPDX-License-Identifier: AGPL-3.0-or-later
    SPDX-FileCopyrightText: 2026 Remora contributors
*/
use log::debug;
use sha1::{Digest, Sha1};

use crate::be_u16;
use crate::error::{PatchError, Result};
use crate::image::layout::BOOTROM_LEN;
use crate::patch::{jumptable, payloads};

/// The SCSI command whose handler the trampoline replaces.
const HOOK_COMMAND: u8 = 0xE0;

/// Version string written into the descriptor table. Must stay exactly 8
/// bytes; bump it whenever the hook definitions change incompatibly.
pub const HOOK_VERSION: &str = "00.00.05";
const _: () = assert!(HOOK_VERSION.len() == 8);

/// Descriptor table size cap, matching the read-back window a host uses.
const INFO_TABLE_MAX: usize = 128;

/// SHA1 of the only mask ROM this library knows how to patch.
const KNOWN_ROM: [u8; 20] = [
    0xb9, 0xdf, 0xa8, 0x5d, 0x37, 0x55, 0x49, 0x2e, 0x76, 0xb8, 0x66, 0x49, 0x2f, 0x93, 0x7a,
    0xb0, 0xba, 0x98, 0x38, 0x5b,
];

/// The ROM call site that pulls firmware from flash; a RET here keeps the
/// patched ROM resident.
const ROM_FLASH_AUTOLOAD: usize = 0x11A7;

/// An injectable machine-code blob plus an optional relocation transform
/// run against the address the blob will load at.
#[derive(Debug, Clone, Copy)]
pub struct HookFn {
    pub binary: &'static [u8],
    pub relocate: Option<fn(&[u8], u16) -> Vec<u8>>,
}

/// Hooks installed by [`patch_bootrom`] and the add-hooks mod, in call
/// index order: reset, SPI DMA receive, SPI DMA transmit.
pub(crate) const STANDARD_HOOKS: [HookFn; 3] = [
    HookFn { binary: payloads::HOOK_RESET, relocate: None },
    HookFn { binary: payloads::HOOK_SPI_RX, relocate: None },
    HookFn { binary: payloads::HOOK_SPI_TX, relocate: None },
];

/// Scans backward over the 0x00/0xff padded tail of `code` and returns the
/// lowest free address plus a safety margin. Assumes unused tail space is
/// erased or zeroed, as it is in all firmware seen so far.
pub(crate) fn find_load_address(code: &[u8]) -> usize {
    let mut load = code.len() - 0x1A;
    for i in (0..=code.len() - 0x20).rev() {
        if code[i] != 0x00 && code[i] != 0xFF {
            break;
        }
        load = i;
    }
    load + 0x20
}

pub(crate) fn place(code: &mut [u8], at: usize, data: &[u8]) -> Result<()> {
    if at + data.len() > code.len() {
        return Err(PatchError::OutOfCodeSpace.into());
    }
    code[at..at + data.len()].copy_from_slice(data);
    Ok(())
}

/// Injects `hooks` into free space of `code` and splices a trampoline over
/// the vendor command handler so a host can discover and call them.
///
/// `code_offset` is the address the code region loads at (0x4000 for
/// application firmware, 0 for the boot ROM). The input is never modified;
/// the patched copy is returned. Installation is deterministic.
pub(crate) fn install(code: &[u8], code_offset: u16, hooks: &[HookFn]) -> Result<Vec<u8>> {
    let mut code = code.to_vec();
    let mut load = find_load_address(&code);

    let mut table = Vec::with_capacity(INFO_TABLE_MAX);
    table.extend_from_slice(HOOK_VERSION.as_bytes());

    for hook in hooks {
        let relocated;
        let bin = match hook.relocate {
            Some(relocate) => {
                relocated = relocate(hook.binary, load as u16);
                &relocated[..]
            }
            None => hook.binary,
        };

        table.extend_from_slice(&(code_offset + load as u16).to_be_bytes());
        place(&mut code, load, bin)?;
        load += bin.len();
    }

    table.extend_from_slice(&[0, 0]);
    if table.len() > INFO_TABLE_MAX {
        return Err(PatchError::InfoTableTooLarge(table.len()).into());
    }

    place(&mut code, load, &table)?;
    let table_addr = code_offset + load as u16;
    load += table.len();

    let entries = jumptable::find_jump_table(&code)?;

    let mut tramp = payloads::HOOK_MAIN.to_vec();
    for b in tramp.iter_mut() {
        if *b == 0xAA {
            *b = (table_addr >> 8) as u8;
        } else if *b == 0xBB {
            *b = table_addr as u8;
        }
    }

    let slot = entries
        .iter()
        .find(|e| e.command == HOOK_COMMAND)
        .map(|e| e.slot as usize)
        .ok_or(PatchError::DispatchEntryNotFound)?;

    let tramp_addr = code_offset + load as u16;

    let mut orig = [0u8; 2];
    orig.copy_from_slice(&code[slot..slot + 2]);
    code[slot..slot + 2].copy_from_slice(&tramp_addr.to_be_bytes());

    // The trampoline carries one blob-relative call; fix it up for the
    // final address. The rebased target must still fit the 16-bit space.
    let target = be_u16!(tramp, 0x0A).checked_add(tramp_addr).ok_or(PatchError::OutOfCodeSpace)?;
    tramp[0x0A..0x0C].copy_from_slice(&target.to_be_bytes());

    if let Some(at) = tramp.windows(2).position(|w| w == [0xDE, 0xAD]) {
        tramp[at..at + 2].copy_from_slice(&orig);
    }

    place(&mut code, load, &tramp)?;

    debug!(
        "installed {} hooks, descriptor table at {:#06x}, trampoline at {:#06x}",
        hooks.len(),
        table_addr,
        tramp_addr
    );
    Ok(code)
}

/// Patches a 16 KiB boot ROM image with the standard hook set.
///
/// The ROM is fingerprinted before anything is touched. On the one known
/// ROM, flash autoload is disabled so the patched copy stays in control,
/// then the hooks go in at code offset 0.
pub fn patch_bootrom(bootrom: &[u8]) -> Result<Vec<u8>> {
    let digest: [u8; 20] = Sha1::digest(bootrom).into();
    if bootrom.len() != BOOTROM_LEN || digest != KNOWN_ROM {
        return Err(PatchError::UnknownBootrom(hex::encode(digest)).into());
    }

    let mut rom = bootrom.to_vec();
    rom[ROM_FLASH_AUTOLOAD] = 0x22;
    install(&rom, 0, &STANDARD_HOOKS)
}

/// Parses a hook descriptor table read back from a live device: 8-byte
/// version string, then big-endian hook addresses up to a zero terminator.
///
/// Returns `None` when the table carries no hooks at all. On a version
/// mismatch only the first hook is kept; the reset hook has kept its slot
/// across every version so far.
pub fn parse_hook_table(table: &[u8; 128]) -> Option<(Vec<u16>, String)> {
    let mut addrs = Vec::new();
    for pair in table[8..].chunks_exact(2) {
        let addr = be_u16!(pair, 0);
        if addr == 0 {
            break;
        }
        addrs.push(addr);
    }

    if addrs.is_empty() {
        return None;
    }

    let version = String::from_utf8_lossy(&table[..8]).into_owned();
    if version != HOOK_VERSION {
        addrs.truncate(1);
    }
    Some((addrs, version))
}
