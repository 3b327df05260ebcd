/*
    SPDX-License-Identifier: AGPL-3.0-or-later
    SPDX-FileCopyrightText: 2026 Remora contributors
*/

//! Calling into code running on the 8051.
//!
//! The injected hook dispatcher exposes a "call anywhere" vendor command:
//! the host serializes a register file, the hook loads it, LCALLs the target
//! and hands the resulting registers back. Everything here silently does
//! nothing useful on a stock firmware, which is why [`JmsHal::refresh_hooks`]
//! treats a rejected probe as "no hooks" rather than an error.

use log::debug;

use crate::be_u16;
use crate::error::{Error, Result};
use crate::hal::JmsHal;
use crate::patch;

/// Firmware routine that copies 256 bytes of code memory into XDATA.
const CODE_COPY_ROUTINE: u16 = 0x1F1B;
/// Scratch XDATA area the copy routine writes to.
pub(super) const CODE_COPY_WORKBUF: u16 = 0x3600;
/// Firmware routine that reinitializes the SPI controller.
const SPI_INIT_ROUTINE: u16 = 0x2C32;

/// Register file passed into and out of a code call.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CpuContext {
    pub dptr: u16,
    pub acc: u8,
    pub r: [u8; 8],
}

impl JmsHal {
    /// Calls a routine at `addr` with the given registers and returns the
    /// register file after it comes back. Requires installed hooks.
    pub fn code_call(&mut self, addr: u16, ctx: CpuContext) -> Result<CpuContext> {
        let mut cdb = [0u8; 15];
        cdb[0] = 0xE0;
        cdb[1] = 0x77;
        cdb[2..4].copy_from_slice(&addr.to_le_bytes());
        cdb[4..6].copy_from_slice(&ctx.dptr.to_le_bytes());
        cdb[6..14].copy_from_slice(&ctx.r);
        cdb[14] = ctx.acc;

        let mut resp = [0u8; 9];
        self.dev.read(&cdb, &mut resp)?;

        let mut out = CpuContext { acc: resp[0], ..CpuContext::default() };
        out.r.copy_from_slice(&resp[1..]);
        Ok(out)
    }

    pub(super) fn hook_call(&mut self, index: usize, ctx: CpuContext) -> Result<CpuContext> {
        let Some(&addr) = self.hooks.get(index) else {
            return Err(Error::hal(format!("hook {index} is not installed")));
        };
        self.code_call(addr, ctx)
    }

    /// Reads code memory through the firmware's copy routine, chunked like
    /// XDATA access. Requires installed hooks.
    pub fn code_read(&mut self, offset: u16, buf: &mut [u8]) -> Result<usize> {
        let len = buf.len().min(0x10000 - offset as usize);

        let mut done = 0;
        while done < len {
            let n = (len - done).min(255);

            let mut ctx = CpuContext::default();
            ctx.r[4..6].copy_from_slice(&CODE_COPY_WORKBUF.to_be_bytes());
            ctx.r[6..8].copy_from_slice(&offset.wrapping_add(done as u16).to_be_bytes());
            self.code_call(CODE_COPY_ROUTINE, ctx)?;

            self.xdata_read(CODE_COPY_WORKBUF, &mut buf[done..done + n])?;
            done += n;
        }

        Ok(len)
    }

    /// Asks the device which hooks are installed and caches the result.
    /// A stock firmware rejects the query; that clears the cache and is not
    /// an error.
    pub(super) fn refresh_hooks(&mut self) -> Result<()> {
        self.hooks.clear();
        self.hook_version.clear();

        let mut resp = [0u8; 9];
        if self.dev.read(&[0xE0, 0x78], &mut resp).is_err() {
            debug!("device rejected the hook probe, treating it as unpatched");
            return Ok(());
        }

        let table_addr = be_u16!(resp, 0);
        let mut table = [0u8; 128];
        self.code_read(table_addr, &mut table)?;

        if let Some((hooks, version)) = patch::parse_hook_table(&table) {
            debug!("found {} hooks, version {version}", hooks.len());
            self.hooks = hooks;
            self.hook_version = version;
            self.spi_init();
        }

        Ok(())
    }

    /// Reinitializes the chip's SPI controller. PIO transfers misbehave
    /// after a reset until this has run once.
    pub(super) fn spi_init(&mut self) {
        if let Err(e) = self.code_call(SPI_INIT_ROUTINE, CpuContext::default()) {
            debug!("spi init call failed: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::testutil::*;

    #[test]
    fn code_call_serializes_the_register_file() {
        let ctx = CpuContext { dptr: 0x1234, acc: 0x56, r: [1, 2, 3, 4, 5, 6, 7, 8] };

        let mut expected = vec![0u8; 15];
        expected[0] = 0xE0;
        expected[1] = 0x77;
        expected[2..4].copy_from_slice(&[0xEF, 0xBE]);
        expected[4..6].copy_from_slice(&[0x34, 0x12]);
        expected[6..14].copy_from_slice(&[1, 2, 3, 4, 5, 6, 7, 8]);
        expected[14] = 0x56;

        let mut reply = vec![0x99u8];
        reply.extend_from_slice(&[0xA0, 0xA1, 0xA2, 0xA3, 0xA4, 0xA5, 0xA6, 0xA7]);

        let (script, mut hal) = stock_hal(vec![Step::Read(expected, reply)]);
        let out = hal.code_call(0xBEEF, ctx).unwrap();

        assert_eq!(out.dptr, 0);
        assert_eq!(out.acc, 0x99);
        assert_eq!(out.r, [0xA0, 0xA1, 0xA2, 0xA3, 0xA4, 0xA5, 0xA6, 0xA7]);
        script.assert_drained();
    }

    #[test]
    fn hook_calls_require_an_installed_hook() {
        let (script, mut hal) = stock_hal(vec![]);
        let err = hal.hook_call(0, CpuContext::default()).unwrap_err();
        assert!(matches!(err, Error::Hal(_)));
        script.assert_drained();
    }

    #[test]
    fn code_read_round_trips_through_the_work_buffer() {
        let table: Vec<u8> = (0..0x40).map(|i| i as u8).collect();

        let mut fetch = CpuContext::default();
        fetch.r[4..6].copy_from_slice(&CODE_COPY_WORKBUF.to_be_bytes());
        fetch.r[6..8].copy_from_slice(&0x4455u16.to_be_bytes());

        let (script, mut hal) = stock_hal(vec![
            Step::Read(call_cdb(CODE_COPY_ROUTINE, &fetch), vec![0u8; 9]),
            Step::Read(xdata_read_cdb(CODE_COPY_WORKBUF, 0x40), table.clone()),
        ]);

        let mut buf = vec![0u8; 0x40];
        assert_eq!(hal.code_read(0x4455, &mut buf).unwrap(), 0x40);
        assert_eq!(buf, table);
        script.assert_drained();
    }

    #[test]
    fn long_code_reads_move_the_source_window() {
        let first = vec![0x11u8; 255];
        let second = vec![0x22u8; 0x45];

        let mut fetch1 = CpuContext::default();
        fetch1.r[4..6].copy_from_slice(&CODE_COPY_WORKBUF.to_be_bytes());
        fetch1.r[6..8].copy_from_slice(&0x4000u16.to_be_bytes());
        let mut fetch2 = fetch1;
        fetch2.r[6..8].copy_from_slice(&0x40FFu16.to_be_bytes());

        let (script, mut hal) = stock_hal(vec![
            Step::Read(call_cdb(CODE_COPY_ROUTINE, &fetch1), vec![0u8; 9]),
            Step::Read(xdata_read_cdb(CODE_COPY_WORKBUF, 255), first.clone()),
            Step::Read(call_cdb(CODE_COPY_ROUTINE, &fetch2), vec![0u8; 9]),
            Step::Read(xdata_read_cdb(CODE_COPY_WORKBUF, 0x45), second.clone()),
        ]);

        let mut buf = vec![0u8; 255 + 0x45];
        hal.code_read(0x4000, &mut buf).unwrap();
        assert_eq!(&buf[..255], &first[..]);
        assert_eq!(&buf[255..], &second[..]);
        script.assert_drained();
    }
}
