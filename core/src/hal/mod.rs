/*
    SPDX-License-Identifier: AGPL-3.0-or-later
    SPDX-FileCopyrightText: 2026 Remora contributors
*/

//! Live access to a JMS578 bridge over SCSI vendor commands.
//!
//! [`JmsHal`] wraps a [`ScsiDevice`] and layers the bridge's vendor protocol
//! on top: XDATA memory access, calls into running code, chunked code reads,
//! firmware upload, SPI transactions and the flash install flow. On
//! construction it probes for installed hooks; most of the interesting
//! functionality (resets, DMA SPI, boot rom dumps) only lights up once the
//! hook patch is running on the chip.

mod cpu;
mod firmware;
mod spi;
mod xdata;

pub use cpu::CpuContext;

use log::info;

use crate::error::Result;
use crate::patch;
use crate::scsi::ScsiDevice;

/// CDB accepted by most stock firmwares to restart the chip.
const RESET_CDB: [u8; 5] = [0xFF, 0x04, 0x26, b'J', b'M'];

/// The reset payload starts with an interrupt-disable preamble that is only
/// wanted when it runs as a called hook; skipping it yields a standalone
/// program.
const RESET_STANDALONE_OFFSET: usize = 5;

pub struct JmsHal {
    dev: Box<dyn ScsiDevice>,
    hooks: Vec<u16>,
    hook_version: String,
}

impl JmsHal {
    /// Wraps an open device and probes it for installed hooks.
    pub fn new(dev: Box<dyn ScsiDevice>) -> Result<Self> {
        let mut hal = JmsHal { dev, hooks: Vec::new(), hook_version: String::new() };
        hal.refresh_hooks()?;
        Ok(hal)
    }

    /// True when the running firmware carries a hook set this library built.
    pub fn patch_present(&self) -> bool {
        self.hook_version == patch::HOOK_VERSION
    }

    /// Hook version reported by the device and the one this library installs.
    pub fn patch_version(&self) -> (&str, &'static str) {
        (&self.hook_version, patch::HOOK_VERSION)
    }

    /// Restarts the chip and reacquires it once it re-enumerates.
    ///
    /// Tries the vendor reset command, then an installed reset hook, and as
    /// a last resort boots the bare reset routine as a firmware.
    pub fn reset_chip(&mut self) -> Result<()> {
        info!("resetting the bridge");

        if self.dev.write(&RESET_CDB, &[]).is_ok() {
            return self.reopen();
        }

        if !self.hooks.is_empty() {
            let _ = self.hook_call(0, CpuContext::default());
            return self.reopen();
        }

        self.code_write(&patch::HOOK_RESET[RESET_STANDALONE_OFFSET..], true)
    }

    fn reopen(&mut self) -> Result<()> {
        self.dev.reopen()?;
        self.refresh_hooks()
    }
}

#[cfg(test)]
pub(crate) mod testutil {
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;

    use crate::error::{Error, Result};
    use crate::hal::{CpuContext, JmsHal};
    use crate::patch;
    use crate::scsi::ScsiDevice;

    /// One expected exchange with the device.
    #[derive(Debug)]
    pub enum Step {
        /// Expected CDB and the bytes the device answers with.
        Read(Vec<u8>, Vec<u8>),
        /// Expected CDB and the data the host must send.
        Write(Vec<u8>, Vec<u8>),
        ReadFails(Vec<u8>),
        WriteFails(Vec<u8>),
        Reopen,
    }

    /// Shared script that a [`ScriptDevice`] consumes step by step.
    #[derive(Clone, Default)]
    pub struct Script(Rc<RefCell<VecDeque<Step>>>);

    impl Script {
        pub fn new(steps: impl IntoIterator<Item = Step>) -> Self {
            Script(Rc::new(RefCell::new(steps.into_iter().collect())))
        }

        pub fn device(&self) -> Box<ScriptDevice> {
            Box::new(ScriptDevice(self.clone()))
        }

        pub fn assert_drained(&self) {
            let left = self.0.borrow();
            assert!(left.is_empty(), "script steps left over: {left:?}");
        }

        fn next(&self) -> Step {
            self.0.borrow_mut().pop_front().expect("device accessed past the end of the script")
        }
    }

    pub struct ScriptDevice(Script);

    impl ScsiDevice for ScriptDevice {
        fn read(&mut self, cdb: &[u8], data: &mut [u8]) -> Result<()> {
            match self.0.next() {
                Step::Read(want, reply) => {
                    assert_eq!(cdb, &want[..], "read cdb");
                    assert_eq!(data.len(), reply.len(), "read length for cdb {cdb:02x?}");
                    data.copy_from_slice(&reply);
                    Ok(())
                }
                Step::ReadFails(want) => {
                    assert_eq!(cdb, &want[..], "read cdb");
                    Err(Error::scsi("scripted read failure"))
                }
                step => panic!("unexpected read of {cdb:02x?}, script wanted {step:?}"),
            }
        }

        fn write(&mut self, cdb: &[u8], data: &[u8]) -> Result<()> {
            match self.0.next() {
                Step::Write(want, payload) => {
                    assert_eq!(cdb, &want[..], "write cdb");
                    assert_eq!(data, &payload[..], "write data for cdb {cdb:02x?}");
                    Ok(())
                }
                Step::WriteFails(want) => {
                    assert_eq!(cdb, &want[..], "write cdb");
                    Err(Error::scsi("scripted write failure"))
                }
                step => panic!("unexpected write of {cdb:02x?}, script wanted {step:?}"),
            }
        }

        fn reopen(&mut self) -> Result<()> {
            match self.0.next() {
                Step::Reopen => Ok(()),
                step => panic!("unexpected reopen, script wanted {step:?}"),
            }
        }
    }

    pub fn xdata_read_cdb(offset: u16, len: u8) -> Vec<u8> {
        xdata_cdb(0xFD, offset, len)
    }

    pub fn xdata_write_cdb(offset: u16, len: u8) -> Vec<u8> {
        xdata_cdb(0xFE, offset, len)
    }

    fn xdata_cdb(op: u8, offset: u16, len: u8) -> Vec<u8> {
        let mut cdb = vec![0u8; 12];
        cdb[0] = 0xDF;
        cdb[4] = len;
        cdb[6..8].copy_from_slice(&offset.to_be_bytes());
        cdb[11] = op;
        cdb
    }

    pub fn call_cdb(addr: u16, ctx: &CpuContext) -> Vec<u8> {
        let mut cdb = vec![0u8; 15];
        cdb[0] = 0xE0;
        cdb[1] = 0x77;
        cdb[2..4].copy_from_slice(&addr.to_le_bytes());
        cdb[4..6].copy_from_slice(&ctx.dptr.to_le_bytes());
        cdb[6..14].copy_from_slice(&ctx.r);
        cdb[14] = ctx.acc;
        cdb
    }

    /// Script prefix satisfying the hook probe of [`JmsHal::new`] for a
    /// device that answers with the given hook addresses.
    pub fn patched_prologue(table_addr: u16, hooks: &[u16]) -> Vec<Step> {
        let mut reply = vec![0u8; 9];
        reply[..2].copy_from_slice(&table_addr.to_be_bytes());

        let mut table = vec![0u8; 128];
        table[..8].copy_from_slice(patch::HOOK_VERSION.as_bytes());
        for (i, addr) in hooks.iter().enumerate() {
            table[8 + 2 * i..10 + 2 * i].copy_from_slice(&addr.to_be_bytes());
        }

        let mut fetch = CpuContext::default();
        fetch.r[4..6].copy_from_slice(&0x3600u16.to_be_bytes());
        fetch.r[6..8].copy_from_slice(&table_addr.to_be_bytes());

        vec![
            Step::Read(vec![0xE0, 0x78], reply),
            Step::Read(call_cdb(0x1F1B, &fetch), vec![0u8; 9]),
            Step::Read(xdata_read_cdb(0x3600, 128), table),
            Step::Read(call_cdb(0x2C32, &CpuContext::default()), vec![0u8; 9]),
        ]
    }

    /// Script prefix for a stock device that rejects the hook probe.
    pub fn stock_prologue() -> Vec<Step> {
        vec![Step::ReadFails(vec![0xE0, 0x78])]
    }

    pub fn stock_hal(extra: Vec<Step>) -> (Script, JmsHal) {
        let mut steps = stock_prologue();
        steps.extend(extra);
        let script = Script::new(steps);
        let hal = JmsHal::new(script.device()).unwrap();
        (script, hal)
    }

    pub fn patched_hal(hooks: &[u16], extra: Vec<Step>) -> (Script, JmsHal) {
        let mut steps = patched_prologue(0x5825, hooks);
        steps.extend(extra);
        let script = Script::new(steps);
        let hal = JmsHal::new(script.device()).unwrap();
        (script, hal)
    }
}
