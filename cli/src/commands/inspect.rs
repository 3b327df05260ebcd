/*
    SPDX-License-Identifier: AGPL-3.0-or-later
    SPDX-FileCopyrightText: 2026 Remora contributors
*/
use std::fs;
use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use log::info;
use remora::{image, patch};
use sha1::{Digest, Sha1};

use crate::JmsCommand;
use crate::common::CommandMetadata;

#[derive(Args, Debug)]
pub struct InspectArgs {
    /// The firmware image to inspect
    pub image: PathBuf,
}

impl CommandMetadata for InspectArgs {
    fn about() -> &'static str {
        "Validate a firmware image and describe its contents."
    }

    fn long_about() -> &'static str {
        "Validate the checksums of a firmware image and describe its contents: image kind, \
         code digest, nvram state and the SCSI command dispatch table."
    }
}

impl JmsCommand for InspectArgs {
    fn run(&self) -> Result<()> {
        let data = fs::read(&self.image)?;
        let fw = image::extract(&data)?;

        let kind = if fw.is_ram { "RAM" } else { "flash" };
        info!("kind: {} image, {} bytes", kind, data.len());
        info!("code digest: {}", hex::encode(Sha1::digest(&fw.code)));

        if fw.nvram.is_empty() {
            info!("nvram: none");
        } else if fw.nvram.iter().all(|&b| b == 0xFF) {
            info!("nvram: {} bytes, blank", fw.nvram.len());
        } else {
            info!("nvram: {} bytes", fw.nvram.len());
        }

        match patch::find_jump_table(&fw.code) {
            Ok(entries) => {
                info!("dispatch table: {} entries", entries.len());
                for e in &entries {
                    info!("  command {:#04x} -> handler {:#06x}", e.command, e.handler);
                }
            }
            Err(err) => info!("dispatch table: not found ({err})"),
        }

        Ok(())
    }
}
