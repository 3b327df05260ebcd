/*
    SPDX-License-Identifier: AGPL-3.0-or-later
    SPDX-FileCopyrightText: 2026 Remora contributors
*/

/// A supported SPI NOR part and the opcodes it wants.
#[derive(Debug)]
pub struct FlashChip {
    /// JEDEC id prefix; short ids match any continuation bytes.
    pub id: u32,
    pub name: &'static str,
    pub opcode_chip_erase: u8,
    pub opcode_page_erase: u8,
    pub page_size: u32,
    pub chip_size: usize,
}

const KIB: usize = 1024;

pub(super) static CHIPS: [FlashChip; 6] = [
    FlashChip {
        id: 0x1F65,
        name: "Adesto AT25DN512",
        opcode_chip_erase: 0x60,
        opcode_page_erase: 0x81,
        page_size: 256,
        chip_size: 64 * KIB,
    },
    FlashChip {
        id: 0xEF3012,
        name: "Winbond W25X20",
        opcode_chip_erase: 0xC7,
        opcode_page_erase: 0xD8,
        page_size: 256,
        chip_size: 256 * KIB,
    },
    FlashChip {
        id: 0x0E4012,
        name: "Fremont FT25H02",
        opcode_chip_erase: 0xC7,
        opcode_page_erase: 0xD8,
        page_size: 256,
        chip_size: 256 * KIB,
    },
    FlashChip {
        id: 0x0E4013,
        name: "Fremont FT25H04",
        opcode_chip_erase: 0xC7,
        opcode_page_erase: 0xD8,
        page_size: 256,
        chip_size: 512 * KIB,
    },
    FlashChip {
        id: 0xA13111A1,
        name: "Fudan FM25F01",
        opcode_chip_erase: 0xC7,
        opcode_page_erase: 0xD8,
        page_size: 256,
        chip_size: 128 * KIB,
    },
    FlashChip {
        id: 0x85401285,
        name: "Puya P25Q21H",
        opcode_chip_erase: 0x60,
        opcode_page_erase: 0x81,
        page_size: 256,
        chip_size: 256 * KIB,
    },
];

/// Left-aligns a table id and returns it with the mask covering its
/// meaningful bytes, so 0x1F65 becomes (0x1F650000, 0xFFFF0000).
fn left_align(id: u32) -> (u32, u32) {
    let mut id = id;
    let mut mask = u32::MAX;
    while id >> 24 == 0 {
        id <<= 8;
        mask <<= 8;
    }
    (id, mask)
}

pub(super) fn lookup(id: u32) -> Option<&'static FlashChip> {
    CHIPS.iter().find(|chip| {
        let (compare, mask) = left_align(chip.id);
        id & mask == compare
    })
}
