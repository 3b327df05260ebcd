/*
    SPDX-License-Identifier: AGPL-3.0-or-later
    SPDX-FileCopyrightText: 2026 Remora contributors
*/
//! Offsets and fixed values of the JMS578 firmware container.
//!
//! A container is 0xC400 bytes (RAM image, uploaded over SCSI) or
//! 0xC400/0xC600 bytes (flash image, the extra 0x200 being the nvram tail).
//! Multi-byte fields are big-endian throughout.
//!
//! ```text
//! 0x0000 .. 0x0018   header (kind word at 6 distinguishes ram/flash)
//! 0x0018 .. 0x001d   version marker, 0x01 "0103"
//! 0x01f8 .. 0x0200   metadata CRCs (first page)
//! 0x0200 .. 0x0204   flash magic (flash images)
//! 0x0208 .. 0x020c   copy of the whole-image CRC (flash images)
//! 0x0400 .. 0xc3f8   8051 application code
//! 0xc3f8 .. 0xc400   code CRC, whole-image CRC
//! 0xc400 .. 0xc600   nvram (flash images, optional)
//! ```

/// Base container length; a RAM image is exactly this long.
pub const IMAGE_LEN_BASE: usize = 0xC400;

/// Nvram tail length of a flash image.
pub const NVRAM_LEN: usize = 0x200;

/// Flash container length including the nvram tail.
pub const IMAGE_LEN_FLASH: usize = IMAGE_LEN_BASE + NVRAM_LEN;

/// Fixed header length.
pub const HEADER_LEN: usize = 0x18;

/// Vendor identification word at header offset 2.
pub const VENDOR_WORD: u32 = 0x152D_0579;

/// Kind word at header offset 6 for RAM images.
pub const KIND_RAM: u32 = 0x0404_0606;

/// Kind word at header offset 6 for flash images.
pub const KIND_FLASH: u32 = 0x0303_0505;

/// Device name string at header offset 10.
pub const HEADER_NAME: &[u8; 14] = b"JMicron JMS579";

/// Version marker offset; a 0x01 byte followed by [`VERSION_MARK`].
pub const VERSION_MARK_OFFSET: usize = 0x18;

/// ASCII version string the vendor tool expects.
pub const VERSION_MARK: &[u8; 4] = b"0103";

/// CRC slot sealing [0, 0x1f8), RAM images only.
pub const PAGE_CRC1_OFFSET: usize = 0x1F8;

/// CRC slot sealing [0, 0x1fc), both kinds.
pub const PAGE_CRC2_OFFSET: usize = 0x1FC;

/// Boot magic at [`FLASH_MAGIC_OFFSET`]; the mask ROM probes flash page 0
/// for it before loading the firmware.
pub const FLASH_MAGIC: u32 = 0x5AC3_69E1;
pub const FLASH_MAGIC_OFFSET: usize = 0x200;

/// Flash images duplicate the whole-image CRC here.
pub const FULL_CRC_COPY_OFFSET: usize = 0x208;

/// CRC slot sealing [0, 0x3fc), the whole metadata area.
pub const META_CRC_OFFSET: usize = 0x3FC;

/// Start of the 8051 application code region.
pub const CODE_OFFSET: usize = 0x400;

/// CRC slot sealing the code region [0x400, 0xc3f8).
pub const CODE_CRC_OFFSET: usize = 0xC3F8;

/// CRC slot sealing [0, 0xc3fc) (RAM) or the zero-window variant (flash).
pub const IMAGE_CRC_OFFSET: usize = 0xC3FC;

/// Largest code block a container can carry.
pub const CODE_LEN_MAX: usize = CODE_CRC_OFFSET - CODE_OFFSET;

/// Compensation constant for the flash whole-image CRC, which is computed
/// over a copy with [0x200, 0x400) zeroed. Opaque; taken as-is from the
/// vendor format.
pub const ZERO_WINDOW_CORRECTION: u32 = 0x7DA4_76E9;

/// XDATA-space load address of the application code.
pub const APP_CODE_BASE: u16 = 0x4000;

/// Mask ROM size.
pub const BOOTROM_LEN: usize = 0x4000;
