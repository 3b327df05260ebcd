/*
    SPDX-License-Identifier: AGPL-3.0-or-later
    SPDX-FileCopyrightText: 2026 Remora contributors
*/
mod commands;
mod common;
mod logger;
mod macros;
mod progress;

use anyhow::Result;
use clap::Parser;
use commands::Commands;
use logger::init_logger;

#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct CliArgs {
    /// Enable verbose logging, including debug information
    #[arg(short, long)]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Commands,
}

/// One lamprey subcommand. Commands that talk to hardware open their own
/// device from the flattened [`common::DeviceArgs`].
pub trait JmsCommand {
    fn run(&self) -> Result<()>;
}

fn main() -> Result<()> {
    let args = CliArgs::parse();

    init_logger(args.verbose);

    args.command.run()
}
