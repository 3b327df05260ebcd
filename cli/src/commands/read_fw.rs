/*
    SPDX-License-Identifier: AGPL-3.0-or-later
    SPDX-FileCopyrightText: 2026 Remora contributors
*/
use std::fs;
use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use log::info;
use remora::image::layout::IMAGE_LEN_FLASH;

use crate::JmsCommand;
use crate::common::{CommandMetadata, DeviceArgs};
use crate::progress::LampreyProgress;

#[derive(Args, Debug)]
pub struct ReadFwArgs {
    #[command(flatten)]
    pub dev: DeviceArgs,
    /// The destination file
    pub output: PathBuf,
}

impl CommandMetadata for ReadFwArgs {
    fn aliases() -> &'static [&'static str] {
        &["r"]
    }

    fn visible_aliases() -> &'static [&'static str] {
        &["r"]
    }

    fn about() -> &'static str {
        "Read the firmware image out of the flash and save it to a file."
    }
}

impl JmsCommand for ReadFwArgs {
    fn run(&self) -> Result<()> {
        let mut hal = self.dev.open()?;

        let pb = LampreyProgress::new(IMAGE_LEN_FLASH as u64);
        let mut progress = {
            let pb = &pb;
            move |done: usize, total: usize| {
                pb.update(done as u64, "Reading flash");
                if done >= total {
                    pb.finish("Read complete");
                }
            }
        };

        let fw = match hal.read_firmware(&mut progress) {
            Ok(fw) => fw,
            Err(e) => {
                pb.abandon("Read failed");
                return Err(e.into());
            }
        };

        fs::write(&self.output, &fw)?;
        info!("wrote {} bytes to {}", fw.len(), self.output.display());
        Ok(())
    }
}
