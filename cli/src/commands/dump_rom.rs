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
pub struct DumpRomArgs {
    #[command(flatten)]
    pub dev: DeviceArgs,
    /// The destination file
    pub output: PathBuf,
    /// Confirm that the installed firmware may be wiped
    #[arg(long)]
    pub force: bool,
}

impl CommandMetadata for DumpRomArgs {
    fn about() -> &'static str {
        "Extract the mask rom by booting a dump stub from flash."
    }

    fn long_about() -> &'static str {
        "Extract the 16 KiB mask rom. The dump works by programming a stub firmware into the \
         flash and booting it, so the installed firmware is erased in the process and the \
         bridge is left in boot rom mode. Requires --force."
    }
}

impl JmsCommand for DumpRomArgs {
    fn run(&self) -> Result<()> {
        if !self.force {
            anyhow::bail!(
                "dumping boots a stub from flash and erases the installed firmware; pass \
                 --force to proceed"
            );
        }

        let mut hal = self.dev.open()?;

        let pb = LampreyProgress::new(IMAGE_LEN_FLASH as u64);
        let mut progress = {
            let pb = &pb;
            move |done: usize, total: usize| {
                pb.update(done as u64, "Staging the dump stub");
                if done >= total {
                    pb.finish("Stub staged");
                }
            }
        };

        let rom = match hal.dump_bootrom(&mut progress) {
            Ok(rom) => rom,
            Err(e) => {
                pb.abandon("Dump failed");
                return Err(e.into());
            }
        };

        fs::write(&self.output, &rom)?;
        info!("wrote {} bytes to {}", rom.len(), self.output.display());
        Ok(())
    }
}
