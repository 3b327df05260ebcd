/*
    SPDX-License-Identifier: AGPL-3.0-or-later
    SPDX-FileCopyrightText: 2026 Remora contributors
*/
use std::fs;
use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use remora::image;

use crate::JmsCommand;
use crate::common::{CommandMetadata, DeviceArgs};
use crate::progress::LampreyProgress;

#[derive(Args, Debug)]
pub struct WriteFwArgs {
    #[command(flatten)]
    pub dev: DeviceArgs,
    /// The flash firmware image to program
    pub image: PathBuf,
    /// Skip reading the flash back for verification
    #[arg(long)]
    pub no_verify: bool,
}

impl CommandMetadata for WriteFwArgs {
    fn aliases() -> &'static [&'static str] {
        &["w"]
    }

    fn visible_aliases() -> &'static [&'static str] {
        &["w"]
    }

    fn about() -> &'static str {
        "Program a firmware image into the flash and restart the bridge."
    }
}

impl JmsCommand for WriteFwArgs {
    fn run(&self) -> Result<()> {
        let data = fs::read(&self.image)?;
        image::validate(&data, false)?;

        let mut hal = self.dev.open()?;

        let pb = LampreyProgress::new(data.len() as u64);
        let mut progress = {
            let pb = &pb;
            move |done: usize, total: usize| {
                pb.set_total(total as u64);
                pb.update(done as u64, "Writing flash");
            }
        };

        match hal.write_firmware(&data, !self.no_verify, &mut progress) {
            Ok(()) => pb.finish("Write complete"),
            Err(e) => {
                pb.abandon("Write failed");
                return Err(e.into());
            }
        }

        hal.reset_chip()?;
        Ok(())
    }
}
