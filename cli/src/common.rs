/*
    SPDX-License-Identifier: AGPL-3.0-or-later
    SPDX-FileCopyrightText: 2026 Remora contributors
*/
use anyhow::Result;
use clap::Args;
use remora::JmsHal;

#[derive(Args, Debug)]
pub struct DeviceArgs {
    /// The device to use, either a /dev path or a vvvv:pppp USB selector
    #[arg(short, long, value_name = "DEV", env = "LAMPREY_DEV", default_value = "152d:0578")]
    pub dev: String,
    /// SCSI command timeout in milliseconds
    #[arg(long, value_name = "MS", default_value_t = 3000)]
    pub timeout: u64,
}

impl DeviceArgs {
    #[cfg(target_os = "linux")]
    pub fn open(&self) -> Result<JmsHal> {
        let mut dev = remora::scsi::SgDevice::open(&self.dev)?;
        dev.set_timeout(std::time::Duration::from_millis(self.timeout));
        Ok(JmsHal::new(Box::new(dev))?)
    }

    #[cfg(not(target_os = "linux"))]
    pub fn open(&self) -> Result<JmsHal> {
        anyhow::bail!("talking to devices needs Linux SG_IO support")
    }
}

/// A trait for providing metadata for CLI commands.
/// This trait can be implemented by command structs to give additional info
pub trait CommandMetadata {
    fn aliases() -> &'static [&'static str] {
        &[]
    }
    fn visible_aliases() -> &'static [&'static str] {
        &[]
    }
    fn about() -> &'static str {
        ""
    }
    fn long_about() -> &'static str {
        ""
    }
    fn hide() -> bool {
        false
    }
}
