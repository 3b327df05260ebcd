/*
    SPDX-License-Identifier: AGPL-3.0-or-later
    SPDX-FileCopyrightText: 2026 Remora contributors
*/

//! XDATA memory access.
//!
//! The 0xDF vendor command moves up to 255 bytes per exchange between the
//! host and the 8051's external data space, which on this chip also maps all
//! hardware registers. Larger transfers are chunked here; everything past
//! the 64 KiB address space is silently dropped, matching what the address
//! arithmetic on the chip would do anyway.

use crate::error::Result;
use crate::hal::JmsHal;

const XDATA_CDB_LEN: usize = 12;
const CHUNK_MAX: usize = 255;

const OP_READ: u8 = 0xFD;
const OP_WRITE: u8 = 0xFE;

fn xdata_cdb(op: u8, offset: u16, len: usize) -> [u8; XDATA_CDB_LEN] {
    let mut cdb = [0u8; XDATA_CDB_LEN];
    cdb[0] = 0xDF;
    cdb[4] = len as u8;
    cdb[6..8].copy_from_slice(&offset.to_be_bytes());

    // Memory type selector. The command can also address flash, but the SPI
    // driver gives better control over that.
    cdb[11] = op;
    cdb
}

/// Clips a transfer so it ends at the top of the 64 KiB address space.
fn clip(offset: u16, len: usize) -> usize {
    len.min(0x10000 - offset as usize)
}

impl JmsHal {
    /// Reads `buf.len()` bytes of XDATA starting at `offset`, and returns
    /// how many bytes were actually read.
    pub fn xdata_read(&mut self, offset: u16, buf: &mut [u8]) -> Result<usize> {
        let len = clip(offset, buf.len());

        let mut done = 0;
        while done < len {
            let n = (len - done).min(CHUNK_MAX);
            let cdb = xdata_cdb(OP_READ, offset.wrapping_add(done as u16), n);
            self.dev.read(&cdb, &mut buf[done..done + n])?;
            done += n;
        }

        Ok(len)
    }

    /// Writes `buf` into XDATA at `offset`, returning how many bytes were
    /// actually written.
    pub fn xdata_write(&mut self, offset: u16, buf: &[u8]) -> Result<usize> {
        let len = clip(offset, buf.len());

        let mut done = 0;
        while done < len {
            let n = (len - done).min(CHUNK_MAX);
            let cdb = xdata_cdb(OP_WRITE, offset.wrapping_add(done as u16), n);
            self.dev.write(&cdb, &buf[done..done + n])?;
            done += n;
        }

        Ok(len)
    }

    pub fn xdata_read_byte(&mut self, offset: u16) -> Result<u8> {
        let mut buf = [0u8; 1];
        self.xdata_read(offset, &mut buf)?;
        Ok(buf[0])
    }

    pub fn xdata_write_byte(&mut self, offset: u16, value: u8) -> Result<()> {
        self.xdata_write(offset, &[value])?;
        Ok(())
    }
}
