/*
    SPDX-License-Identifier: AGPL-3.0-or-later
    SPDX-FileCopyrightText: 2026 Remora contributors
*/
use anyhow::Result;
use clap::Args;

use crate::JmsCommand;
use crate::common::{CommandMetadata, DeviceArgs};

#[derive(Args, Debug)]
pub struct ResetArgs {
    #[command(flatten)]
    pub dev: DeviceArgs,
}

impl CommandMetadata for ResetArgs {
    fn about() -> &'static str {
        "Restart the bridge and wait for it to re-enumerate."
    }
}

impl JmsCommand for ResetArgs {
    fn run(&self) -> Result<()> {
        let mut hal = self.dev.open()?;
        hal.reset_chip()?;
        Ok(())
    }
}
