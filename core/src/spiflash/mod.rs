/*
    SPDX-License-Identifier: AGPL-3.0-or-later
    SPDX-FileCopyrightText: 2026 Remora contributors
*/

//! Driver for the JEDEC SPI NOR flash behind the bridge.
//!
//! The bridge only forwards raw SPI transactions, so this driver carries the
//! whole protocol: JEDEC id probe, page-aware programming, status polling and
//! erase. It is generic over [`SpiMaster`] because the transaction ceiling
//! differs wildly between the PIO fallback (16 bytes) and the DMA hooks
//! (512 bytes).

mod chips;

pub use chips::FlashChip;

use std::time::{Duration, Instant};

use log::{debug, info};

use crate::error::{FlashError, Result};

const CMD_PAGE_PROGRAM: u8 = 0x02;
const CMD_READ: u8 = 0x03;
const CMD_READ_STATUS: u8 = 0x05;
const CMD_WRITE_ENABLE: u8 = 0x06;
const CMD_READ_ID: u8 = 0x9F;

const STATUS_BUSY: u8 = 1 << 0;
const STATUS_FAILED: u8 = 1 << 5;

const PROGRAM_DEADLINE: Duration = Duration::from_secs(1);
const ERASE_DEADLINE: Duration = Duration::from_secs(2);

/// Something that can run a half-duplex SPI transaction: send `out`, then
/// clock `response.len()` bytes back in.
pub trait SpiMaster {
    fn transfer(&mut self, out: &[u8], response: &mut [u8]) -> Result<()>;

    /// Largest `out.len() + response.len()` a single transaction can move.
    fn max_transaction(&self) -> usize;
}

impl<M: SpiMaster + ?Sized> SpiMaster for &mut M {
    fn transfer(&mut self, out: &[u8], response: &mut [u8]) -> Result<()> {
        (**self).transfer(out, response)
    }

    fn max_transaction(&self) -> usize {
        (**self).max_transaction()
    }
}

/// A probed SPI NOR chip.
pub struct SpiFlash<M: SpiMaster> {
    master: M,
    chip: &'static FlashChip,
}

impl<M: SpiMaster> SpiFlash<M> {
    /// Reads the JEDEC id and matches it against the supported chip table.
    /// The probe is retried once before giving up.
    pub fn probe(mut master: M) -> Result<Self> {
        let chip = match Self::read_id(&mut master) {
            Ok(chip) => chip,
            Err(e) => {
                debug!("retrying jedec id probe: {e}");
                Self::read_id(&mut master)?
            }
        };

        info!("flash chip: {} ({} KiB)", chip.name, chip.chip_size / 1024);
        Ok(SpiFlash { master, chip })
    }

    fn read_id(master: &mut M) -> Result<&'static FlashChip> {
        let mut id = [0u8; 4];
        master.transfer(&[CMD_READ_ID], &mut id)?;

        let id = u32::from_be_bytes(id);
        chips::lookup(id).ok_or_else(|| FlashError::UnsupportedChip(id).into())
    }

    pub fn chip(&self) -> &'static FlashChip {
        self.chip
    }

    pub fn read(&mut self, mut address: u32, buf: &mut [u8]) -> Result<()> {
        self.check_bounds(address, buf.len())?;

        let limit = self.data_limit();
        for chunk in buf.chunks_mut(limit) {
            let mut cmd = address.to_be_bytes();
            cmd[0] = CMD_READ;
            self.master.transfer(&cmd, chunk)?;
            address += chunk.len() as u32;
        }

        Ok(())
    }

    pub fn write(&mut self, address: u32, data: &[u8]) -> Result<()> {
        self.check_bounds(address, data.len())?;

        let mut done = 0;
        while done < data.len() {
            done += self.write_chunk(address + done as u32, &data[done..])?;
        }

        Ok(())
    }

    /// Programs as much of `data` as one transaction allows without crossing
    /// a page boundary, and returns how many input bytes were consumed.
    fn write_chunk(&mut self, address: u32, data: &[u8]) -> Result<usize> {
        let page = self.chip.page_size as usize;
        let room = page - (address as usize & (page - 1));
        let mut data = &data[..data.len().min(room)];
        let span = data.len();

        // An erased chip already reads 0xFF there, skip those runs.
        let lead = data.iter().take_while(|&&b| b == 0xFF).count();
        if lead == span {
            return Ok(span);
        }
        data = &data[lead..];
        let mut trail = data.iter().rev().take_while(|&&b| b == 0xFF).count();
        data = &data[..data.len() - trail];

        // The opcode and address ride in the same transaction as the data.
        let limit = self.data_limit();
        if data.len() > limit {
            data = &data[..limit];
            trail = 0;
        }

        let mut cmd = Vec::with_capacity(4 + data.len());
        cmd.extend_from_slice(&(address + lead as u32).to_be_bytes());
        cmd[0] = CMD_PAGE_PROGRAM;
        cmd.extend_from_slice(data);

        self.write_enable()?;
        self.master.transfer(&cmd, &mut [])?;
        self.wait_idle(PROGRAM_DEADLINE)?;

        Ok(lead + data.len() + trail)
    }

    pub fn erase_chip(&mut self) -> Result<()> {
        self.write_enable()?;
        self.master.transfer(&[self.chip.opcode_chip_erase], &mut [])?;
        self.wait_idle(ERASE_DEADLINE)
    }

    /// Erases the smallest erasable unit containing `address`. How much that
    /// is depends on the chip, from a 256-byte page up to a 64 KiB block.
    pub fn erase_page(&mut self, address: u32) -> Result<()> {
        self.check_bounds(address, 1)?;

        self.write_enable()?;
        let mut cmd = address.to_be_bytes();
        cmd[0] = self.chip.opcode_page_erase;
        self.master.transfer(&cmd, &mut [])?;
        self.wait_idle(ERASE_DEADLINE)
    }

    fn write_enable(&mut self) -> Result<()> {
        self.master.transfer(&[CMD_WRITE_ENABLE], &mut [])
    }

    fn wait_idle(&mut self, deadline: Duration) -> Result<()> {
        let give_up = Instant::now() + deadline;

        while Instant::now() < give_up {
            let mut status = [0u8; 1];
            self.master.transfer(&[CMD_READ_STATUS], &mut status)?;

            if status[0] & STATUS_BUSY == 0 {
                if status[0] & STATUS_FAILED != 0 {
                    return Err(FlashError::Failed(status[0]).into());
                }
                return Ok(());
            }
        }

        Err(FlashError::Timeout(deadline).into())
    }

    fn data_limit(&self) -> usize {
        self.master.max_transaction().saturating_sub(4).max(1)
    }

    fn check_bounds(&self, address: u32, len: usize) -> Result<()> {
        if address as usize + len > self.chip.chip_size {
            return Err(FlashError::OutOfBounds { address, len, size: self.chip.chip_size }.into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    /// In-memory NOR chip. Programming clears bits and requires a prior
    /// write enable; erases set bytes back to 0xFF; every mutation leaves
    /// the status register busy for a few polls.
    struct FakeSpi {
        id: [u8; 4],
        mem: Vec<u8>,
        max: usize,
        write_enabled: bool,
        busy_polls: u8,
        fail_probes: u8,
        fail_status: bool,
        programs: Vec<(usize, usize)>,
    }

    impl FakeSpi {
        fn new(id: [u8; 4], size: usize) -> Self {
            FakeSpi {
                id,
                mem: vec![0u8; size],
                max: 512,
                write_enabled: false,
                busy_polls: 0,
                fail_probes: 0,
                fail_status: false,
                programs: Vec::new(),
            }
        }

        fn w25x20() -> Self {
            FakeSpi::new([0xEF, 0x30, 0x12, 0x00], 256 * 1024)
        }

        fn addr(out: &[u8]) -> usize {
            (out[1] as usize) << 16 | (out[2] as usize) << 8 | out[3] as usize
        }

        fn take_write_enable(&mut self) {
            assert!(self.write_enabled, "mutation without write enable");
            self.write_enabled = false;
        }
    }

    impl SpiMaster for FakeSpi {
        fn transfer(&mut self, out: &[u8], response: &mut [u8]) -> Result<()> {
            assert!(out.len() + response.len() <= self.max, "transaction too large");

            match out[0] {
                CMD_READ_ID => {
                    if self.fail_probes > 0 {
                        self.fail_probes -= 1;
                        return Err(Error::scsi("nothing on the bus"));
                    }
                    response.copy_from_slice(&self.id[..response.len()]);
                }
                CMD_WRITE_ENABLE => self.write_enabled = true,
                CMD_READ_STATUS => {
                    response[0] = if self.busy_polls > 0 {
                        self.busy_polls -= 1;
                        STATUS_BUSY
                    } else if self.fail_status {
                        STATUS_FAILED
                    } else {
                        0
                    };
                }
                CMD_READ => {
                    let addr = FakeSpi::addr(out);
                    response.copy_from_slice(&self.mem[addr..addr + response.len()]);
                }
                CMD_PAGE_PROGRAM => {
                    self.take_write_enable();
                    let addr = FakeSpi::addr(out);
                    for (i, &b) in out[4..].iter().enumerate() {
                        self.mem[addr + i] &= b;
                    }
                    self.programs.push((addr, out.len() - 4));
                    self.busy_polls = 2;
                }
                0xC7 | 0x60 => {
                    self.take_write_enable();
                    self.mem.fill(0xFF);
                    self.busy_polls = 3;
                }
                0xD8 | 0x81 => {
                    self.take_write_enable();
                    let addr = FakeSpi::addr(out) & !0xFF;
                    self.mem[addr..addr + 256].fill(0xFF);
                    self.busy_polls = 3;
                }
                op => panic!("unexpected opcode {op:#04x}"),
            }

            Ok(())
        }

        fn max_transaction(&self) -> usize {
            self.max
        }
    }

    #[test]
    fn probe_names_the_chip() {
        let mut spi = FakeSpi::w25x20();
        let flash = SpiFlash::probe(&mut spi).unwrap();
        assert_eq!(flash.chip().name, "Winbond W25X20");
        assert_eq!(flash.chip().chip_size, 256 * 1024);
    }

    #[test]
    fn probe_matches_short_ids_by_prefix() {
        let mut spi = FakeSpi::new([0x1F, 0x65, 0xAB, 0xCD], 64 * 1024);
        let flash = SpiFlash::probe(&mut spi).unwrap();
        assert_eq!(flash.chip().name, "Adesto AT25DN512");
    }

    #[test]
    fn probe_rejects_unknown_chips() {
        let mut spi = FakeSpi::new([0x12, 0x34, 0x56, 0x78], 1024);
        let err = SpiFlash::probe(&mut spi).err().unwrap();
        assert!(matches!(err, Error::Flash(FlashError::UnsupportedChip(0x12345678))));
    }

    #[test]
    fn probe_retries_a_failed_id_read() {
        let mut spi = FakeSpi::w25x20();
        spi.fail_probes = 1;
        assert!(SpiFlash::probe(&mut spi).is_ok());

        let mut spi = FakeSpi::w25x20();
        spi.fail_probes = 2;
        assert!(SpiFlash::probe(&mut spi).is_err());
    }

    #[test]
    fn writes_split_on_page_boundaries() {
        let mut spi = FakeSpi::w25x20();
        {
            let mut flash = SpiFlash::probe(&mut spi).unwrap();
            flash.erase_chip().unwrap();

            let data: Vec<u8> = (0..0x20).collect();
            flash.write(0xF0, &data).unwrap();

            let mut back = vec![0u8; 0x20];
            flash.read(0xF0, &mut back).unwrap();
            assert_eq!(back, data);
        }
        assert_eq!(spi.programs, vec![(0xF0, 0x10), (0x100, 0x10)]);
    }

    #[test]
    fn ff_runs_are_not_programmed() {
        let mut spi = FakeSpi::w25x20();
        {
            let mut flash = SpiFlash::probe(&mut spi).unwrap();
            flash.erase_chip().unwrap();

            let mut data = vec![0xFF; 0x30];
            data[0x10] = 0x42;
            data[0x11] = 0x43;
            flash.write(0x200, &data).unwrap();
            flash.write(0x300, &[0xFF; 0x40]).unwrap();
        }
        assert_eq!(spi.programs, vec![(0x210, 2)]);
    }

    #[test]
    fn writes_respect_the_transaction_ceiling() {
        let mut spi = FakeSpi::w25x20();
        spi.max = 16;
        {
            let mut flash = SpiFlash::probe(&mut spi).unwrap();
            flash.erase_chip().unwrap();
            flash.write(0, &[0x55; 32]).unwrap();
        }
        // 12 data bytes fit beside the 4-byte program command.
        assert_eq!(spi.programs, vec![(0, 12), (12, 12), (24, 8)]);
    }

    #[test]
    fn erase_page_only_wipes_its_page() {
        let mut spi = FakeSpi::new([0x1F, 0x65, 0x00, 0x00], 64 * 1024);
        let mut flash = SpiFlash::probe(&mut spi).unwrap();
        flash.erase_chip().unwrap();
        flash.write(0x000, &[0x11; 4]).unwrap();
        flash.write(0x100, &[0x22; 4]).unwrap();

        flash.erase_page(0x100).unwrap();

        let mut back = vec![0u8; 4];
        flash.read(0x000, &mut back).unwrap();
        assert_eq!(back, [0x11; 4]);
        flash.read(0x100, &mut back).unwrap();
        assert_eq!(back, [0xFF; 4]);
    }

    #[test]
    fn failed_programming_is_reported() {
        let mut spi = FakeSpi::w25x20();
        spi.fail_status = true;
        let mut flash = SpiFlash::probe(&mut spi).unwrap();
        let err = flash.write(0, &[0x55; 4]).unwrap_err();
        assert!(matches!(err, Error::Flash(FlashError::Failed(s)) if s & STATUS_FAILED != 0));
    }

    #[test]
    fn accesses_are_bounds_checked() {
        let mut spi = FakeSpi::w25x20();
        let size = 256 * 1024;
        let mut flash = SpiFlash::probe(&mut spi).unwrap();

        let err = flash.write(size as u32 - 2, &[0; 4]).unwrap_err();
        assert!(matches!(err, Error::Flash(FlashError::OutOfBounds { .. })));

        let mut buf = [0u8; 4];
        let err = flash.read(size as u32, &mut buf).unwrap_err();
        assert!(matches!(err, Error::Flash(FlashError::OutOfBounds { .. })));

        let err = flash.erase_page(size as u32).unwrap_err();
        assert!(matches!(err, Error::Flash(FlashError::OutOfBounds { .. })));
    }
}
