/*
    SPDX-License-Identifier: AGPL-3.0-or-later
    SPDX-FileCopyrightText: 2026 Remora contributors
*/
use log::info;
use sha1::{Digest, Sha1};
use strum_macros::{Display, EnumString};

use crate::error::{ModError, Result};
use crate::image::{self, layout::APP_CODE_BASE};
use crate::patch;

/// Code digest of the stock JMS578 firmware v0.4.1.4, the only release the
/// byte-level mods are verified against.
const JMS578_414: [u8; 20] = [
    0x5e, 0x67, 0x7d, 0xaa, 0xc3, 0xdc, 0x3e, 0x31, 0xa0, 0x54, 0x81, 0x13, 0xf5, 0x60, 0x51,
    0xde, 0x2e, 0x1d, 0x0b, 0x51,
];

/// Vendor command types blanked out by [`Mod::DisableDebug`]. Between them
/// these expose flashing, xdata access and arbitrary code execution.
const DEBUG_COMMANDS: [u8; 5] = [0xFF, 0xE0, 0xDF, 0x3C, 0x3B];

/// A named patch applied to extracted firmware.
///
/// Names round-trip through kebab-case (`"disable-flash-write"` and so on),
/// which is what the command line uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "kebab-case")]
pub enum Mod {
    /// Stub out the flash write routine, so the chip can never modify its
    /// own flash (useful together with external write protection).
    DisableFlashWrite,
    /// Reroute the flash command setup for the Adesto AT25DN512C.
    AlternateFlashChip,
    /// Fill the nvram block with 0xff, dropping any stored settings.
    ClearNvram,
    /// Point the debug command dispatch entries at a refuse stub.
    DisableDebug,
    /// Install the standard hook set.
    AddHooks,
}

impl Mod {
    /// Parses a kebab-case mod name.
    pub fn parse(name: &str) -> Result<Self> {
        name.parse().map_err(|_| ModError::UnknownMod(name.to_string()).into())
    }
}

fn not_supported(mod_: Mod, digest: &[u8; 20]) -> ModError {
    ModError::UnsupportedFirmware { name: mod_.to_string(), digest: hex::encode(digest) }
}

/// Applies `mods` in order to extracted code and nvram.
///
/// The digest gate is evaluated against the code as it arrived, not as
/// earlier mods left it.
fn apply(
    mut code: Vec<u8>,
    mut nvram: Vec<u8>,
    code_offset: u16,
    mods: &[Mod],
) -> Result<(Vec<u8>, Vec<u8>)> {
    let digest: [u8; 20] = Sha1::digest(&code).into();

    let mut hooks_blocked = None::<Mod>;
    let mut block_hooks = |m: Mod| match hooks_blocked.replace(m) {
        Some(prior) => Err(ModError::Conflict(prior.to_string(), m.to_string())),
        None => Ok(()),
    };

    for &m in mods {
        info!("applying mod {m}");

        match m {
            Mod::DisableFlashWrite => {
                if digest != JMS578_414 {
                    return Err(not_supported(m, &digest).into());
                }
                code[0x5DFB - code_offset as usize] = 0x22;
            }

            Mod::AlternateFlashChip => {
                if digest != JMS578_414 {
                    return Err(not_supported(m, &digest).into());
                }
                let at = 0x5F03 - code_offset as usize;
                code[at..at + 3].copy_from_slice(&[0x02, 0x5F, 0xC9]);
            }

            Mod::ClearNvram => nvram.fill(0xFF),

            Mod::DisableDebug => {
                block_hooks(m)?;

                let stub = patch::find_load_address(&code);
                patch::place(&mut code, stub, patch::DISABLED_HANDLER)?;

                let table = patch::find_jump_table(&code)?;
                let stub_addr = (code_offset + stub as u16).to_be_bytes();
                for t in DEBUG_COMMANDS {
                    if let Some(entry) = table.iter().find(|e| e.command == t) {
                        let slot = entry.slot as usize;
                        code[slot..slot + 2].copy_from_slice(&stub_addr);
                    }
                }
            }

            Mod::AddHooks => {
                block_hooks(m)?;
                code = patch::install(&code, code_offset, &patch::STANDARD_HOOKS)?;
            }
        }
    }

    Ok((code, nvram))
}

/// Applies `mods` to a flash firmware image and rebuilds it.
///
/// An empty mod list is a pure passthrough. RAM images cannot be patched:
/// their layout matches, but uploading one would leave flash and RAM
/// disagreeing about the installed hooks.
///
/// # Examples
///
/// ```
/// use remora::{Mod, mods};
///
/// let image = remora::image::build(&[0x42; 0x100], None, false)?;
/// let same = mods::patch_create(&image, &[])?;
/// assert_eq!(image, same);
/// # Ok::<(), remora::Error>(())
/// ```
pub fn patch_create(image: &[u8], mods: &[Mod]) -> Result<Vec<u8>> {
    if mods.is_empty() {
        return Ok(image.to_vec());
    }

    let fw = image::extract(image)?;
    if fw.is_ram {
        return Err(ModError::CannotPatchRamImage.into());
    }

    let (code, nvram) = apply(fw.code, fw.nvram, APP_CODE_BASE, mods)?;
    image::build(&code, Some(&nvram), false)
}
