/*
    SPDX-License-Identifier: AGPL-3.0-or-later
    SPDX-FileCopyrightText: 2026 Remora contributors
*/
//! Pre-assembled 8051 payloads. The blobs are opaque here; the installer
//! only relies on the structural contract of `hook.bin` (placeholder bytes
//! and the call-target field at 0x0a).

/// Trampoline spliced over the vendor command handler. Every 0xaa/0xbb byte
/// is a placeholder for the descriptor-table address, the big-endian u16 at
/// 0x0a is a blob-relative call target, and the 0xde 0xad pair receives the
/// original handler address.
pub(crate) const HOOK_MAIN: &[u8] = include_bytes!("../../../payloads/hook.bin");

/// USB disconnect and chip reset. Bytes [5..] double as a standalone code
/// image for the raw-upload reset fallback.
pub(crate) const HOOK_RESET: &[u8] = include_bytes!("../../../payloads/reset.bin");

/// SPI DMA receive (hook call index 1).
pub(crate) const HOOK_SPI_RX: &[u8] = include_bytes!("../../../payloads/spi_rx.bin");

/// SPI DMA transmit (hook call index 2).
pub(crate) const HOOK_SPI_TX: &[u8] = include_bytes!("../../../payloads/spi_tx.bin");

/// Handler that refuses its command outright; the disable-debug mod points
/// dangerous dispatch entries at it.
pub(crate) const DISABLED_HANDLER: &[u8] = include_bytes!("../../../payloads/disable.bin");

/// Standalone image that copies the mask ROM to xdata 0x8000 and parks the
/// CPU so the host can read it out.
pub(crate) const DUMP_ROM: &[u8] = include_bytes!("../../../payloads/dumprom.bin");
