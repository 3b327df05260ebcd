/*
    SPDX-License-Identifier: AGPL-3.0-or-later
    SPDX-FileCopyrightText: 2026 Remora contributors
*/
use crc::{Algorithm, Crc};

use crate::be_u32;
use crate::error::ImageError;

/// CRC-32 the way the JMS578 mask ROM computes it: ISO-HDLC polynomial,
/// init and reflected input, but no output reflection and no final xor.
const JMS_CRC32: Algorithm<u32> = Algorithm {
    width: 32,
    poly: 0x04C1_1DB7,
    init: 0xFFFF_FFFF,
    refin: true,
    refout: false,
    xorout: 0x0000_0000,
    check: 0x9B63_D02C,
    residue: 0x0000_0000,
};

const CRC32: Crc<u32> = Crc::<u32>::new(&JMS_CRC32);

/// Computes the vendor checksum of `block`.
///
/// The ROM hashes the block as 32-bit words with their bytes swapped
/// end-for-end, so the length must be a multiple of 4.
pub fn compute_checksum(block: &[u8]) -> Result<u32, ImageError> {
    if block.len() % 4 != 0 {
        return Err(ImageError::InvalidInput("checksum block is not a multiple of 4 bytes"));
    }

    let mut digest = CRC32.digest();
    for word in block.chunks_exact(4) {
        digest.update(&[word[3], word[2], word[1], word[0]]);
    }
    Ok(digest.finalize())
}

/// Compares the stored big-endian u32 at the start of `slot` against
/// `value`, overwriting it when `write` is set (whether or not it matched).
/// Returns `prior` ANDed with the comparison.
pub(super) fn write_check(
    slot: &mut [u8],
    value: u32,
    prior: bool,
    write: bool,
) -> Result<bool, ImageError> {
    if slot.len() < 4 {
        return Err(ImageError::InvalidInput("checksum slot is shorter than 4 bytes"));
    }

    let stored = be_u32!(slot, 0);
    if write {
        slot[..4].copy_from_slice(&value.to_be_bytes());
    }
    Ok(prior && stored == value)
}

/// Seals a region whose last 4 bytes are the CRC slot for everything
/// before them.
pub(super) fn checksum_region(
    region: &mut [u8],
    prior: bool,
    write: bool,
) -> Result<bool, ImageError> {
    if region.len() < 4 {
        return Err(ImageError::InvalidInput("checksum region is shorter than its slot"));
    }

    let (block, slot) = region.split_at_mut(region.len() - 4);
    let value = compute_checksum(block)?;
    write_check(slot, value, prior, write)
}
