/*
    SPDX-License-Identifier: AGPL-3.0-or-later
    SPDX-FileCopyrightText: 2026 Remora contributors
*/

//! Moving firmware on and off the chip.
//!
//! Two transports exist: uploading a RAM image into the running chip (the
//! vendor update command, or a raw XDATA upload when nothing usable runs),
//! and programming the SPI flash through the [`crate::spiflash`] driver. The
//! flash layout is scattered: the image's first 0x400 bytes live swapped at
//! the front of the chip, the code block sits at 0x1000 and the nvram tail
//! at 0xD000.

use std::ops::Range;

use log::{debug, info};

use crate::be_u32;
use crate::error::{Error, Result};
use crate::hal::JmsHal;
use crate::image::layout::{BOOTROM_LEN, IMAGE_LEN_BASE, IMAGE_LEN_FLASH};
use crate::mods::{self, Mod};
use crate::spiflash::SpiFlash;
use crate::{image, patch};

/// Register that maps code RAM into XDATA at [`CODE_WINDOW`].
const REG_MAPPING_8000: u16 = 0x708C;
/// XDATA window over code RAM while the mapping register holds 6.
const CODE_WINDOW: u16 = 0x8000;
/// Writing "is" here makes the boot rom start the uploaded code directly.
const MEM_BOOT_WITHOUT_ROM: u16 = 0x4154;

/// Transfer slice per progress tick when moving whole firmware images.
const FLASH_IO_CHUNK: usize = 0x400;

/// Pad in front of the rom dump stub; 0xFF decodes as a harmless mov, so
/// execution started at the reset vector slides into the stub.
const DUMP_PAD: usize = 0x50;

/// Where each image region sits in the flash chip.
fn flash_segments(len: usize) -> [(u32, Range<usize>); 4] {
    [
        (0x0E00, 0x000..0x200),
        (0x0000, 0x200..0x400),
        (0x1000, 0x400..0xC400),
        (0xD000, 0xC400..len),
    ]
}

impl JmsHal {
    /// Firmware version as reported by the vendor inquiry. The boot rom
    /// reports 0.
    pub fn firmware_version(&mut self) -> Result<u32> {
        let mut resp = [0u8; 16];
        self.dev.read(&[0xE0, 0xF4, 0xE7], &mut resp)?;
        Ok(be_u32!(resp, 12))
    }

    /// Uploads `code` into chip RAM and runs it.
    ///
    /// The vendor update command is only safe when the running firmware can
    /// serve it; it scribbles over the first 0x400 bytes of RAM before
    /// loading the real data. With `try_vendor_first` unset the code goes in
    /// through the XDATA window instead, which works from the boot rom.
    pub fn code_write(&mut self, code: &[u8], try_vendor_first: bool) -> Result<()> {
        if try_vendor_first {
            let image = image::build(code, None, true)?;

            let mut cdb = [0u8; 10];
            cdb[0] = 0x3B;
            cdb[1] = 0x06;
            cdb[7..9].copy_from_slice(&(image.len() as u16).to_be_bytes());

            if self.dev.write(&cdb, &image).is_ok() {
                return self.reopen();
            }
            debug!("vendor update refused, falling back to a raw upload");
        }

        if code.len() > BOOTROM_LEN {
            return Err(Error::hal("code is too long for a raw upload"));
        }

        self.xdata_write_byte(REG_MAPPING_8000, 6)?;
        self.xdata_write(CODE_WINDOW, code)?;
        self.xdata_write(MEM_BOOT_WITHOUT_ROM, b"is")?;
        self.reopen()
    }

    /// Reads the whole firmware image (including nvram) out of the flash.
    pub fn read_firmware(&mut self, progress: &mut dyn FnMut(usize, usize)) -> Result<Vec<u8>> {
        let mut fw = vec![0u8; IMAGE_LEN_FLASH];
        let total = fw.len();

        let mut flash = SpiFlash::probe(&mut *self)?;
        let mut done = 0;
        for (src, range) in flash_segments(total) {
            for (i, chunk) in fw[range].chunks_mut(FLASH_IO_CHUNK).enumerate() {
                flash.read(src + (i * FLASH_IO_CHUNK) as u32, chunk)?;
                done += chunk.len();
                progress(done, total);
            }
        }

        Ok(fw)
    }

    /// Erases the flash and programs `fw` into it, optionally reading it
    /// back for verification.
    pub fn write_firmware(
        &mut self,
        fw: &[u8],
        verify: bool,
        progress: &mut dyn FnMut(usize, usize),
    ) -> Result<()> {
        if fw.len() < IMAGE_LEN_BASE {
            return Err(Error::hal(format!("firmware of {:#x} bytes is too short", fw.len())));
        }

        {
            let mut flash = SpiFlash::probe(&mut *self)?;
            info!("erasing the flash chip");
            flash.erase_chip()?;

            let total = fw.len();
            let mut done = 0;
            for (dest, range) in flash_segments(fw.len()) {
                for (i, chunk) in fw[range].chunks(FLASH_IO_CHUNK).enumerate() {
                    flash.write(dest + (i * FLASH_IO_CHUNK) as u32, chunk)?;
                    done += chunk.len();
                    progress(done, total);
                }
            }
        }

        if verify {
            debug!("reading back for verification");
            let readback = self.read_firmware(progress)?;
            if fw.len() > readback.len() || readback[..fw.len()] != fw[..] {
                return Err(Error::hal("flash verification failed"));
            }
        }

        Ok(())
    }

    /// Erases the first flash page. That kills the boot marker, so the mask
    /// rom ignores the flash and stays resident on the next start.
    pub fn erase_firmware(&mut self) -> Result<()> {
        let mut flash = SpiFlash::probe(&mut *self)?;
        flash.erase_page(0)
    }

    /// Extracts the 16 KiB mask rom by booting a dump stub from flash.
    ///
    /// The stub copies the rom into XDATA where the host can read it; the
    /// flash is erased again afterwards, leaving the chip in rom mode.
    pub fn dump_bootrom(&mut self, progress: &mut dyn FnMut(usize, usize)) -> Result<Vec<u8>> {
        let mut code = vec![0xFF; DUMP_PAD];
        code.extend_from_slice(patch::DUMP_ROM);

        let image = image::build(&code, None, false)?;
        self.write_firmware(&image, false, progress)?;
        self.reset_chip()?;

        let mut rom = vec![0u8; BOOTROM_LEN];
        self.xdata_read(CODE_WINDOW, &mut rom)?;

        self.go_rom()?;
        Ok(rom)
    }

    /// Puts the chip back into boot rom mode.
    pub fn go_rom(&mut self) -> Result<()> {
        self.erase_firmware()?;
        self.reset_chip()
    }

    /// Gets the hook patch running on the chip, loading a patched copy of
    /// `bootrom` if the current firmware does not already carry it.
    pub fn go_patched(&mut self, bootrom: &[u8]) -> Result<()> {
        if self.patch_present() {
            return Ok(());
        }

        // Anything other than a clean boot rom gets restarted first; the
        // raw upload path must not race a running firmware.
        let in_rom = matches!(self.firmware_version(), Ok(0)) && self.hook_version.is_empty();
        if !in_rom {
            self.go_rom()?;
        }

        let patched = patch::patch_bootrom(bootrom)?;
        self.code_write(&patched, false)
    }

    /// Builds the modded firmware image, programs it if the flash does not
    /// already hold it, and boots it.
    ///
    /// With a `bootrom` the chip is first switched to patched-rom mode so
    /// the flash can be written even under a firmware that locks it.
    pub fn install_firmware(
        &mut self,
        bootrom: Option<&[u8]>,
        fw: &[u8],
        mods: &[Mod],
        progress: &mut dyn FnMut(usize, usize),
    ) -> Result<()> {
        let image = mods::patch_create(fw, mods)?;

        if let Some(rom) = bootrom {
            self.go_patched(rom)?;
        }

        let current = self.read_firmware(progress)?;
        if image.len() <= current.len() && current[..image.len()] == image[..] {
            info!("the flash already holds the requested firmware");
            if self.firmware_version()? == 0 {
                return self.reset_chip();
            }
            return Ok(());
        }

        self.write_firmware(&image, true, progress)?;
        self.reset_chip()
    }
}
