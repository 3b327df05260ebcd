/*
    SPDX-License-Identifier: AGPL-3.0-or-later
    SPDX-FileCopyrightText: 2026 Remora contributors
*/
use std::fs;
use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use log::info;
use remora::{Mod, mods};

use crate::JmsCommand;
use crate::common::CommandMetadata;

#[derive(Args, Debug)]
pub struct PatchArgs {
    /// The flash firmware image to modify
    pub image: PathBuf,
    /// Destination for the patched image
    pub output: PathBuf,
    /// Mods to apply, in order
    #[arg(short = 'm', long = "mod", value_name = "NAME", required = true)]
    pub mods: Vec<String>,
}

impl CommandMetadata for PatchArgs {
    fn about() -> &'static str {
        "Apply named mods to a firmware image and reseal it."
    }

    fn long_about() -> &'static str {
        "Apply named mods to a flash firmware image and reseal its checksums. Available mods: \
         disable-flash-write, alternate-flash-chip, clear-nvram, disable-debug, add-hooks."
    }
}

impl JmsCommand for PatchArgs {
    fn run(&self) -> Result<()> {
        let mods: Vec<Mod> =
            self.mods.iter().map(|m| Mod::parse(m)).collect::<remora::Result<_>>()?;

        let data = fs::read(&self.image)?;
        let patched = mods::patch_create(&data, &mods)?;
        fs::write(&self.output, &patched)?;

        info!("applied {} mods, wrote {}", mods.len(), self.output.display());
        Ok(())
    }
}
