/*
    SPDX-License-Identifier: AGPL-3.0-or-later
    SPDX-FileCopyrightText: 2026 Remora contributors
*/
//! Codec for the JMS578 firmware container format.
//!
//! The same 0xC400-byte container travels two ways: uploaded into chip RAM
//! over SCSI, or programmed into the SPI flash (with an optional 0x200-byte
//! nvram tail). Both carry a redundant set of vendor CRCs which the mask ROM
//! verifies before booting, so every builder path here ends in the same
//! checksum schedule.

pub mod layout;

mod crc;

pub use crc::compute_checksum;

use crate::be_u32;
use crate::error::{ImageError, Result};

use layout::*;

/// Payload of a firmware container, decoupled from its checksummed shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Firmware {
    /// 8051 application code, always [`layout::CODE_LEN_MAX`] bytes.
    pub code: Vec<u8>,
    /// Nvram tail contents; empty when the container had none.
    pub nvram: Vec<u8>,
    /// Whether the container was a RAM image.
    pub is_ram: bool,
}

fn header(is_ram: bool) -> [u8; HEADER_LEN] {
    let mut hdr = [0u8; HEADER_LEN];
    hdr[0] = 0x01;
    hdr[2..6].copy_from_slice(&VENDOR_WORD.to_be_bytes());
    let kind = if is_ram { KIND_RAM } else { KIND_FLASH };
    hdr[6..10].copy_from_slice(&kind.to_be_bytes());
    hdr[10..].copy_from_slice(HEADER_NAME);
    hdr
}

/// Runs the fixed checksum schedule over `image`, writing each slot when
/// `write` is set, and returns whether every slot already held its value.
fn checksum_regions(image: &mut [u8], is_ram: bool, write: bool) -> Result<bool> {
    let mut valid = true;

    if is_ram {
        valid = crc::checksum_region(&mut image[..PAGE_CRC1_OFFSET + 4], valid, write)?;
    }
    valid = crc::checksum_region(&mut image[..PAGE_CRC2_OFFSET + 4], valid, write)?;

    valid = crc::checksum_region(&mut image[CODE_OFFSET..CODE_CRC_OFFSET + 4], valid, write)?;

    if is_ram {
        valid = crc::checksum_region(&mut image[..META_CRC_OFFSET + 4], valid, write)?;
        valid = crc::checksum_region(&mut image[..IMAGE_CRC_OFFSET + 4], valid, write)?;
        return Ok(valid);
    }

    // The whole-image CRC of a flash image is defined over a copy with
    // [0x200, 0x400) zeroed, compensated by a fixed constant.
    let mut work = image.to_vec();
    work[FLASH_MAGIC_OFFSET..CODE_OFFSET].fill(0);
    let full = compute_checksum(&work[..IMAGE_CRC_OFFSET])? ^ ZERO_WINDOW_CORRECTION;

    valid = crc::write_check(&mut image[IMAGE_CRC_OFFSET..], full, valid, write)?;
    valid = crc::write_check(&mut image[FULL_CRC_COPY_OFFSET..], full, valid, write)?;
    valid = crc::checksum_region(&mut image[..CODE_OFFSET], valid, write)?;

    Ok(valid)
}

/// Builds a firmware container around `code` and (for flash images) an
/// optional nvram block, sealing it with the full checksum schedule.
///
/// # Examples
///
/// ```
/// use remora::image;
///
/// let image = image::build(&[0x22; 0x100], None, false)?;
/// assert_eq!(image.len(), 0xC600);
/// # Ok::<(), remora::Error>(())
/// ```
pub fn build(code: &[u8], nvram: Option<&[u8]>, is_ram: bool) -> Result<Vec<u8>> {
    if code.len() > CODE_LEN_MAX {
        return Err(ImageError::CodeTooLarge { len: code.len(), max: CODE_LEN_MAX }.into());
    }
    let nvram = nvram.unwrap_or_default();
    if nvram.len() > NVRAM_LEN {
        return Err(ImageError::NvramTooLarge { len: nvram.len(), max: NVRAM_LEN }.into());
    }

    let length = if is_ram { IMAGE_LEN_BASE } else { IMAGE_LEN_FLASH };
    let mut image = vec![0u8; length];
    image[FLASH_MAGIC_OFFSET..].fill(0xFF);

    image[..HEADER_LEN].copy_from_slice(&header(is_ram));

    // The vendor tool rejects images without this marker.
    image[VERSION_MARK_OFFSET] = 0x01;
    image[VERSION_MARK_OFFSET + 1..VERSION_MARK_OFFSET + 5].copy_from_slice(VERSION_MARK);

    if !is_ram {
        image[FLASH_MAGIC_OFFSET..FLASH_MAGIC_OFFSET + 4]
            .copy_from_slice(&FLASH_MAGIC.to_be_bytes());
    }

    image[CODE_OFFSET..CODE_OFFSET + code.len()].copy_from_slice(code);
    if !is_ram {
        image[IMAGE_LEN_BASE..IMAGE_LEN_BASE + nvram.len()].copy_from_slice(nvram);
    }

    checksum_regions(&mut image, is_ram, true)?;
    Ok(image)
}

/// Checks the length, header and every checksum slot of `image`. Never
/// modifies the input.
pub fn validate(image: &[u8], is_ram: bool) -> Result<()> {
    if is_ram && image.len() != IMAGE_LEN_BASE {
        return Err(ImageError::InvalidLength(image.len()).into());
    }
    if !is_ram && image.len() != IMAGE_LEN_BASE && image.len() != IMAGE_LEN_FLASH {
        return Err(ImageError::InvalidLength(image.len()).into());
    }

    if image[..HEADER_LEN] != header(is_ram) {
        return Err(ImageError::InvalidHeader.into());
    }

    let mut work = image.to_vec();
    if !checksum_regions(&mut work, is_ram, false)? {
        return Err(ImageError::InvalidChecksum.into());
    }

    Ok(())
}

/// Validates `image` (sniffing its kind from the header) and returns owned
/// copies of its code and nvram payloads.
///
/// # Examples
///
/// ```
/// use remora::image;
///
/// let image = image::build(&[0xAB; 8], None, true)?;
/// let fw = image::extract(&image)?;
/// assert!(fw.is_ram);
/// assert_eq!(&fw.code[..8], &[0xAB; 8]);
/// # Ok::<(), remora::Error>(())
/// ```
pub fn extract(image: &[u8]) -> Result<Firmware> {
    if image.len() < 10 {
        return Err(ImageError::InvalidLength(image.len()).into());
    }

    let is_ram = be_u32!(image, 6) == KIND_RAM;
    validate(image, is_ram)?;

    Ok(Firmware {
        code: image[CODE_OFFSET..CODE_CRC_OFFSET].to_vec(),
        nvram: image[IMAGE_LEN_BASE..].to_vec(),
        is_ram,
    })
}
