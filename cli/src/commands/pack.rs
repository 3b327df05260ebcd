/*
    SPDX-License-Identifier: AGPL-3.0-or-later
    SPDX-FileCopyrightText: 2026 Remora contributors
*/
use std::fs;
use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use log::info;
use remora::image;

use crate::JmsCommand;
use crate::common::CommandMetadata;

#[derive(Args, Debug)]
pub struct PackArgs {
    /// File with the raw code payload
    pub code: PathBuf,
    /// Destination for the sealed image
    pub output: PathBuf,
    /// Nvram block to append behind the code container
    #[arg(long, value_name = "FILE")]
    pub nvram: Option<PathBuf>,
    /// Build a RAM image instead of a flash image
    #[arg(long)]
    pub ram: bool,
}

impl CommandMetadata for PackArgs {
    fn about() -> &'static str {
        "Seal a raw code payload into a checksummed firmware image."
    }
}

impl JmsCommand for PackArgs {
    fn run(&self) -> Result<()> {
        let code = fs::read(&self.code)?;
        let nvram = self.nvram.as_ref().map(fs::read).transpose()?;

        if self.ram && nvram.is_some() {
            anyhow::bail!("RAM images cannot carry an nvram block");
        }

        let image = image::build(&code, nvram.as_deref(), self.ram)?;
        fs::write(&self.output, &image)?;

        let kind = if self.ram { "RAM" } else { "flash" };
        info!("wrote a {} byte {} image to {}", image.len(), kind, self.output.display());
        Ok(())
    }
}
