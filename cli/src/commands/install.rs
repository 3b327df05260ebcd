/*
    SPDX-License-Identifier: AGPL-3.0-or-later
    SPDX-FileCopyrightText: 2026 Remora contributors
*/
use std::fs;
use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use remora::Mod;

use crate::JmsCommand;
use crate::common::{CommandMetadata, DeviceArgs};
use crate::progress::LampreyProgress;

#[derive(Args, Debug)]
pub struct InstallArgs {
    #[command(flatten)]
    pub dev: DeviceArgs,
    /// The stock flash firmware image to install
    pub firmware: PathBuf,
    /// Boot rom dump, used to unlock flashing under a locked-down firmware
    #[arg(long, value_name = "FILE")]
    pub bootrom: Option<PathBuf>,
    /// Mods to apply before installing
    #[arg(short = 'm', long = "mod", value_name = "NAME")]
    pub mods: Vec<String>,
}

impl CommandMetadata for InstallArgs {
    fn aliases() -> &'static [&'static str] {
        &["i"]
    }

    fn visible_aliases() -> &'static [&'static str] {
        &["i"]
    }

    fn about() -> &'static str {
        "Mod a firmware image, program it if the flash differs, and boot it."
    }

    fn long_about() -> &'static str {
        "Mod a firmware image, program it into the flash if the flash does not already hold \
         it, and boot it. Without --mod the add-hooks mod is applied; see `patch --help` for \
         the available mod names."
    }
}

impl JmsCommand for InstallArgs {
    fn run(&self) -> Result<()> {
        let fw = fs::read(&self.firmware)?;
        let bootrom = self.bootrom.as_ref().map(fs::read).transpose()?;

        let mods: Vec<Mod> = if self.mods.is_empty() {
            vec![Mod::AddHooks]
        } else {
            self.mods.iter().map(|m| Mod::parse(m)).collect::<remora::Result<_>>()?
        };

        let mut hal = self.dev.open()?;

        let pb = LampreyProgress::new(fw.len() as u64);
        let mut progress = {
            let pb = &pb;
            move |done: usize, total: usize| {
                pb.set_total(total as u64);
                pb.update(done as u64, "Installing");
            }
        };

        match hal.install_firmware(bootrom.as_deref(), &fw, &mods, &mut progress) {
            Ok(()) => pb.finish("Install complete"),
            Err(e) => {
                pb.abandon("Install failed");
                return Err(e.into());
            }
        }

        Ok(())
    }
}
