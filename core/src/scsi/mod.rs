/*
    SPDX-License-Identifier: AGPL-3.0-or-later
    SPDX-FileCopyrightText: 2026 Remora contributors
*/

//! Raw SCSI pass-through transport.
//!
//! The bridge is driven entirely through vendor CDBs, so all this layer has
//! to offer is "send a CDB, move some bytes". [`ScsiDevice`] is the seam the
//! HAL talks through; [`SgDevice`] implements it on top of the Linux SG_IO
//! ioctl. Tests substitute scripted fakes.

pub mod discover;
#[cfg(target_os = "linux")]
mod sg;

#[cfg(target_os = "linux")]
pub use sg::SgDevice;

use crate::error::Result;

/// A device that accepts raw SCSI commands.
pub trait ScsiDevice {
    /// Issues `cdb` and reads exactly `data.len()` bytes from the device.
    fn read(&mut self, cdb: &[u8], data: &mut [u8]) -> Result<()>;

    /// Issues `cdb`, sending `data` to the device. An empty `data` still
    /// goes out as a host-to-device transfer of zero bytes.
    fn write(&mut self, cdb: &[u8], data: &[u8]) -> Result<()>;

    /// Closes and reacquires the device.
    ///
    /// After a firmware reset the bridge drops off the bus and re-enumerates,
    /// usually under a different block device node. Implementations are
    /// expected to wait for it to come back.
    fn reopen(&mut self) -> Result<()>;
}
