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
pub struct UnpackArgs {
    /// The firmware image to unpack
    pub image: PathBuf,
    /// Destination for the code payload
    pub code: PathBuf,
    /// Destination for the nvram block
    #[arg(long, value_name = "FILE")]
    pub nvram: Option<PathBuf>,
}

impl CommandMetadata for UnpackArgs {
    fn about() -> &'static str {
        "Extract the code and nvram payloads out of a firmware image."
    }
}

impl JmsCommand for UnpackArgs {
    fn run(&self) -> Result<()> {
        let data = fs::read(&self.image)?;
        let fw = image::extract(&data)?;

        fs::write(&self.code, &fw.code)?;
        info!("wrote {} code bytes to {}", fw.code.len(), self.code.display());

        if let Some(path) = &self.nvram {
            if fw.nvram.is_empty() {
                anyhow::bail!("the image carries no nvram block");
            }
            fs::write(path, &fw.nvram)?;
            info!("wrote {} nvram bytes to {}", fw.nvram.len(), path.display());
        }

        Ok(())
    }
}
