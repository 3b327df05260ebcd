/*
    SPDX-License-Identifier: AGPL-3.0-or-later
    SPDX-FileCopyrightText: 2026 Remora contributors
*/
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type of the library.
///
/// Structured failures from the codec, patcher, mod engine and flash driver
/// keep their own enums; transport and device-protocol problems carry a
/// plain message, since there is nothing a caller can do with them besides
/// report and retry.
#[derive(Debug, Error)]
pub enum Error {
    #[error("image: {0}")]
    Image(#[from] ImageError),

    #[error("patch: {0}")]
    Patch(#[from] PatchError),

    #[error("mod: {0}")]
    Mod(#[from] ModError),

    #[error("flash: {0}")]
    Flash(#[from] FlashError),

    #[error("scsi: {0}")]
    Scsi(String),

    #[error("hal: {0}")]
    Hal(String),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn scsi(msg: impl Into<String>) -> Self {
        Error::Scsi(msg.into())
    }

    pub fn hal(msg: impl Into<String>) -> Self {
        Error::Hal(msg.into())
    }
}

/// Firmware container errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ImageError {
    #[error("invalid checksum input: {0}")]
    InvalidInput(&'static str),

    #[error("invalid image length {0:#x}")]
    InvalidLength(usize),

    #[error("image header mismatch")]
    InvalidHeader,

    #[error("image checksum mismatch")]
    InvalidChecksum,

    #[error("code block of {len:#x} bytes exceeds {max:#x}")]
    CodeTooLarge { len: usize, max: usize },

    #[error("nvram block of {len:#x} bytes exceeds {max:#x}")]
    NvramTooLarge { len: usize, max: usize },
}

/// Code patching errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PatchError {
    #[error("no command dispatch table found in code")]
    JumpTableNotFound,

    #[error("dispatch table has no entry for the hook command")]
    DispatchEntryNotFound,

    #[error("hook descriptor table of {0} bytes exceeds 128")]
    InfoTableTooLarge(usize),

    #[error("hook payload does not fit the free code space")]
    OutOfCodeSpace,

    #[error("boot rom not recognized (sha1 {0})")]
    UnknownBootrom(String),
}

/// Mod engine errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModError {
    #[error("unknown mod name '{0}'")]
    UnknownMod(String),

    #[error("mod '{name}' does not support firmware with code sha1 {digest}")]
    UnsupportedFirmware { name: String, digest: String },

    #[error("mods '{0}' and '{1}' cannot be combined")]
    Conflict(String, String),

    #[error("ram images cannot be patched")]
    CannotPatchRamImage,
}

/// SPI flash driver errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FlashError {
    #[error("unsupported flash chip id {0:#010x}")]
    UnsupportedChip(u32),

    #[error("flash stayed busy for {0:?}")]
    Timeout(std::time::Duration),

    #[error("flash program failed (status {0:#04x})")]
    Failed(u8),

    #[error("access of {len:#x} bytes at {address:#x} exceeds the {size:#x} byte chip")]
    OutOfBounds { address: u32, len: usize, size: usize },
}
