/*
    SPDX-License-Identifier: AGPL-3.0-or-later
    SPDX-FileCopyrightText: 2026 Remora contributors
*/
use anyhow::Result;
use clap::Args;
use log::info;
use remora::spiflash::SpiFlash;

use crate::JmsCommand;
use crate::common::{CommandMetadata, DeviceArgs};

#[derive(Args, Debug)]
pub struct ProbeArgs {
    #[command(flatten)]
    pub dev: DeviceArgs,
}

impl CommandMetadata for ProbeArgs {
    fn about() -> &'static str {
        "Report the firmware version, hook state and flash chip of a bridge."
    }
}

impl JmsCommand for ProbeArgs {
    fn run(&self) -> Result<()> {
        let mut hal = self.dev.open()?;

        let version = hal.firmware_version()?;
        if version == 0 {
            info!("firmware: boot rom");
        } else {
            info!("firmware: version {:#010x}", version);
        }

        let (installed, supported) = hal.patch_version();
        if installed.is_empty() {
            info!("hook patch: not installed");
        } else if hal.patch_present() {
            info!("hook patch: {installed}");
        } else {
            info!("hook patch: {installed} (this build drives {supported})");
        }

        // The driver logs the chip it finds.
        SpiFlash::probe(&mut hal)?;
        Ok(())
    }
}
