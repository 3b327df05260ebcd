/*
    SPDX-License-Identifier: AGPL-3.0-or-later
    SPDX-FileCopyrightText: 2026 Remora contributors
*/
pub mod error;
pub mod hal;
pub mod image;
pub mod mods;
pub mod patch;
pub mod scsi;
pub mod spiflash;

pub use error::{Error, Result};
pub use hal::JmsHal;
pub use image::Firmware;
pub use mods::Mod;

/// Reads a big-endian `u16` from `$buf` at byte offset `$off`.
#[macro_export]
macro_rules! be_u16 {
    ($buf:expr, $off:expr) => {
        u16::from_be_bytes([$buf[$off], $buf[$off + 1]])
    };
}

/// Reads a big-endian `u32` from `$buf` at byte offset `$off`.
#[macro_export]
macro_rules! be_u32 {
    ($buf:expr, $off:expr) => {
        u32::from_be_bytes([$buf[$off], $buf[$off + 1], $buf[$off + 2], $buf[$off + 3]])
    };
}
