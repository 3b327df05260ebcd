/*
    SPDX-License-Identifier: AGPL-3.0-or-later
    SPDX-FileCopyrightText: 2026 Remora contributors
*/

//! SPI transactions through the bridge.
//!
//! Three paths, tried from fastest to slowest: the DMA transmit and receive
//! hooks (up to 512 bytes, patched firmware only) and the 16-byte PIO FIFO
//! that even the stock silicon exposes through XDATA-mapped registers.

use crate::error::{Error, Result};
use crate::hal::{CpuContext, JmsHal};
use crate::spiflash::SpiMaster;

const REG_SPI_DATA_OUT: u16 = 0x7140;
const REG_SPI_READBACK: u16 = 0x7141;
const REG_SPI_START: u16 = 0x714C;
const REG_SPI_RESPONSE: u16 = 0x7150;

/// XDATA scratch area shared with the DMA hooks.
const SPI_WORKBUF: u16 = 0x3700;

const PIO_MAX: usize = 16;
const DMA_MAX: usize = 512;
const DMA_COMMAND_MAX: usize = 14;

const HOOK_SPI_RX: usize = 1;
const HOOK_SPI_TX: usize = 2;

impl JmsHal {
    fn spi_dma_installed(&self) -> bool {
        self.hooks.len() >= 3
    }

    fn spi_dma_tx(&mut self, out: &[u8], response_len: usize) -> Result<()> {
        if !self.spi_dma_installed() || out.len() > DMA_MAX || response_len > 0 {
            return Err(Error::hal("transaction does not fit the spi dma transmit path"));
        }

        self.xdata_write(SPI_WORKBUF, out)?;

        let mut ctx = CpuContext::default();
        ctx.r[0..2].copy_from_slice(&SPI_WORKBUF.to_le_bytes());
        ctx.r[2] = 0x00;
        ctx.r[3] = 0x20;
        ctx.r[4..6].copy_from_slice(&(out.len() as u16).to_le_bytes());

        self.hook_call(HOOK_SPI_TX, ctx)?;
        Ok(())
    }

    fn spi_dma_rx(&mut self, out: &[u8], response: &mut [u8]) -> Result<()> {
        if !self.spi_dma_installed() || out.len() > DMA_COMMAND_MAX || response.len() > DMA_MAX {
            return Err(Error::hal("transaction does not fit the spi dma receive path"));
        }

        self.xdata_write(SPI_WORKBUF, out)?;

        // The hook rounds the read up to a multiple of 4 bytes in the work
        // buffer; the tail past response.len() stays there.
        let mut ctx = CpuContext { dptr: SPI_WORKBUF, ..CpuContext::default() };
        ctx.r[0..2].copy_from_slice(&SPI_WORKBUF.to_le_bytes());
        ctx.r[2..4].copy_from_slice(&(response.len() as u16).to_le_bytes());
        ctx.r[4] = out.len() as u8;

        self.hook_call(HOOK_SPI_RX, ctx)?;
        self.xdata_read(SPI_WORKBUF, response)?;
        Ok(())
    }

    fn spi_pio(&mut self, out: &[u8], response: &mut [u8]) -> Result<()> {
        if out.len() + response.len() > PIO_MAX {
            return Err(Error::hal("transaction exceeds the 16 byte pio fifo"));
        }

        for &byte in out {
            self.xdata_write_byte(REG_SPI_DATA_OUT, byte)?;
        }
        for i in 0..response.len() {
            self.xdata_write_byte(REG_SPI_READBACK, i as u8)?;
        }

        self.xdata_write_byte(REG_SPI_START, 1)?;
        while self.xdata_read_byte(REG_SPI_START)? != 0 {}

        self.xdata_read(REG_SPI_RESPONSE, response)?;
        Ok(())
    }
}

impl SpiMaster for JmsHal {
    fn transfer(&mut self, out: &[u8], response: &mut [u8]) -> Result<()> {
        if self.spi_dma_tx(out, response.len()).is_ok() {
            return Ok(());
        }
        if self.spi_dma_rx(out, response).is_ok() {
            return Ok(());
        }
        self.spi_pio(out, response)
    }

    fn max_transaction(&self) -> usize {
        if self.patch_present() { DMA_MAX } else { PIO_MAX }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::testutil::*;

    const HOOKS: [u16; 3] = [0x5820, 0x5833, 0x5848];

    #[test]
    fn pio_drives_the_fifo_registers() {
        let mut steps = vec![Step::Write(xdata_write_cdb(REG_SPI_DATA_OUT, 1), vec![0x9F])];
        for i in 0..3 {
            steps.push(Step::Write(xdata_write_cdb(REG_SPI_READBACK, 1), vec![i]));
        }
        steps.push(Step::Write(xdata_write_cdb(REG_SPI_START, 1), vec![0x01]));
        steps.push(Step::Read(xdata_read_cdb(REG_SPI_START, 1), vec![0x01]));
        steps.push(Step::Read(xdata_read_cdb(REG_SPI_START, 1), vec![0x00]));
        steps.push(Step::Read(xdata_read_cdb(REG_SPI_RESPONSE, 3), vec![0xEF, 0x30, 0x12]));

        let (script, mut hal) = stock_hal(steps);

        let mut id = [0u8; 3];
        hal.transfer(&[0x9F], &mut id).unwrap();
        assert_eq!(id, [0xEF, 0x30, 0x12]);
        script.assert_drained();
    }

    #[test]
    fn oversized_pio_transactions_are_refused_without_io() {
        let (script, mut hal) = stock_hal(vec![]);
        let mut response = [0u8; 10];
        assert!(hal.transfer(&[0u8; 10], &mut response).is_err());
        script.assert_drained();
    }

    #[test]
    fn large_writes_use_the_dma_transmit_hook() {
        let data = vec![0x42u8; 20];

        let mut ctx = CpuContext::default();
        ctx.r[0..2].copy_from_slice(&SPI_WORKBUF.to_le_bytes());
        ctx.r[3] = 0x20;
        ctx.r[4..6].copy_from_slice(&20u16.to_le_bytes());

        let (script, mut hal) = patched_hal(&HOOKS, vec![
            Step::Write(xdata_write_cdb(SPI_WORKBUF, 20), data.clone()),
            Step::Read(call_cdb(HOOKS[HOOK_SPI_TX], &ctx), vec![0u8; 9]),
        ]);

        hal.transfer(&data, &mut []).unwrap();
        script.assert_drained();
    }

    #[test]
    fn large_reads_use_the_dma_receive_hook() {
        let cmd = [0x03, 0x00, 0x10, 0x00];
        let payload: Vec<u8> = (0..32).map(|i| i as u8).collect();

        let mut ctx = CpuContext { dptr: SPI_WORKBUF, ..CpuContext::default() };
        ctx.r[0..2].copy_from_slice(&SPI_WORKBUF.to_le_bytes());
        ctx.r[2..4].copy_from_slice(&32u16.to_le_bytes());
        ctx.r[4] = 4;

        let (script, mut hal) = patched_hal(&HOOKS, vec![
            Step::Write(xdata_write_cdb(SPI_WORKBUF, 4), cmd.to_vec()),
            Step::Read(call_cdb(HOOKS[HOOK_SPI_RX], &ctx), vec![0u8; 9]),
            Step::Read(xdata_read_cdb(SPI_WORKBUF, 32), payload.clone()),
        ]);

        let mut response = vec![0u8; 32];
        hal.transfer(&cmd, &mut response).unwrap();
        assert_eq!(response, payload);
        script.assert_drained();
    }

    #[test]
    fn max_transaction_depends_on_the_patch() {
        let (_, hal) = patched_hal(&HOOKS, vec![]);
        assert_eq!(hal.max_transaction(), DMA_MAX);

        let (_, hal) = stock_hal(vec![]);
        assert_eq!(hal.max_transaction(), PIO_MAX);
    }
}
