/*
    SPDX-License-Identifier: AGPL-3.0-or-later
    SPDX-FileCopyrightText: 2026 Remora contributors
*/

use std::ffi::CString;
use std::io;
use std::os::fd::RawFd;
use std::ptr;
use std::thread;
use std::time::Duration;

use log::debug;

use crate::error::{Error, Result};
use crate::scsi::ScsiDevice;
use crate::scsi::discover;

const SG_IO: libc::c_ulong = 0x2285;

const SG_DXFER_TO_DEV: i32 = -2;
const SG_DXFER_FROM_DEV: i32 = -3;

const SG_INFO_OK_MASK: u32 = 0x1;
const SG_INFO_OK: u32 = 0x0;

const SENSE_LEN: usize = 32;

/// `struct sg_io_hdr` from `<scsi/sg.h>`.
#[repr(C)]
struct SgIoHdr {
    interface_id: i32,
    dxfer_direction: i32,
    cmd_len: u8,
    mx_sb_len: u8,
    iovec_count: u16,
    dxfer_len: u32,
    dxferp: *mut libc::c_void,
    cmdp: *const u8,
    sbp: *mut u8,
    timeout: u32,
    flags: u32,
    pack_id: i32,
    usr_ptr: *mut libc::c_void,
    status: u8,
    masked_status: u8,
    msg_status: u8,
    sb_len_wr: u8,
    host_status: u16,
    driver_status: u16,
    resid: i32,
    duration: u32,
    info: u32,
}

/// SCSI pass-through over a Linux SG_IO block device.
///
/// Opened either from a `/dev` path or a `vvvv:pppp` USB selector; selectors
/// are re-resolved on every open, so a bridge that re-enumerates under a new
/// device node after [`reopen`](ScsiDevice::reopen) is picked up again.
pub struct SgDevice {
    selector: String,
    fd: RawFd,
    timeout_ms: u32,
}

impl SgDevice {
    /// Opens a device from a path like `/dev/sdb` or a USB selector like
    /// `152d:0578` (which must match exactly one attached device).
    pub fn open(selector: &str) -> Result<Self> {
        let mut dev = SgDevice { selector: selector.to_string(), fd: -1, timeout_ms: 3000 };
        dev.open_fd()?;
        Ok(dev)
    }

    /// Replaces the default 3 second per-command timeout.
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout_ms = timeout.as_millis() as u32;
    }

    fn open_fd(&mut self) -> Result<()> {
        let path = match discover::parse_usb_selector(&self.selector) {
            Some((vid, pid)) => {
                let mut nodes = discover::find_usb_storage(vid, pid)?;
                match nodes.len() {
                    0 => return Err(Error::scsi("no matching USB storage device")),
                    1 => nodes.remove(0),
                    n => {
                        return Err(Error::scsi(format!(
                            "{n} devices match {}, pass a /dev path instead",
                            self.selector
                        )));
                    }
                }
            }
            None => self.selector.clone(),
        };

        debug!("opening {path}");
        let cpath = CString::new(path).map_err(io::Error::from)?;
        let fd = unsafe { libc::open(cpath.as_ptr(), libc::O_RDWR) };
        if fd < 0 {
            return Err(io::Error::last_os_error().into());
        }

        self.fd = fd;
        Ok(())
    }

    fn close_fd(&mut self) {
        if self.fd >= 0 {
            unsafe { libc::close(self.fd) };
            self.fd = -1;
        }
    }

    fn transfer(
        &mut self,
        direction: i32,
        cdb: &[u8],
        data: *mut libc::c_void,
        len: u32,
    ) -> Result<()> {
        let mut sense = [0u8; SENSE_LEN];
        let mut hdr = SgIoHdr {
            interface_id: 'S' as i32,
            dxfer_direction: direction,
            cmd_len: cdb.len() as u8,
            mx_sb_len: SENSE_LEN as u8,
            iovec_count: 0,
            dxfer_len: len,
            dxferp: data,
            cmdp: cdb.as_ptr(),
            sbp: sense.as_mut_ptr(),
            timeout: self.timeout_ms,
            flags: 0,
            pack_id: 0,
            usr_ptr: ptr::null_mut(),
            status: 0,
            masked_status: 0,
            msg_status: 0,
            sb_len_wr: 0,
            host_status: 0,
            driver_status: 0,
            resid: 0,
            duration: 0,
            info: 0,
        };

        let rc = unsafe { libc::ioctl(self.fd, SG_IO, &mut hdr) };
        if rc < 0 {
            return Err(io::Error::last_os_error().into());
        }

        if hdr.info & SG_INFO_OK_MASK != SG_INFO_OK {
            return Err(Error::scsi(format!(
                "scsi status {:#04x}, host status {:#06x}, driver status {:#06x}",
                hdr.status, hdr.host_status, hdr.driver_status
            )));
        }

        Ok(())
    }
}

impl ScsiDevice for SgDevice {
    fn read(&mut self, cdb: &[u8], data: &mut [u8]) -> Result<()> {
        self.transfer(SG_DXFER_FROM_DEV, cdb, data.as_mut_ptr().cast(), data.len() as u32)
    }

    fn write(&mut self, cdb: &[u8], data: &[u8]) -> Result<()> {
        let ptr = if data.is_empty() { ptr::null_mut() } else { data.as_ptr().cast_mut().cast() };
        self.transfer(SG_DXFER_TO_DEV, cdb, ptr, data.len() as u32)
    }

    fn reopen(&mut self) -> Result<()> {
        self.close_fd();
        thread::sleep(Duration::from_millis(400));

        for _ in 0..100 {
            thread::sleep(Duration::from_millis(100));
            if self.open_fd().is_ok() {
                return Ok(());
            }
        }

        self.open_fd()
    }
}

impl Drop for SgDevice {
    fn drop(&mut self) {
        self.close_fd();
    }
}
