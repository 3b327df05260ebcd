/*
    SPDX-License-Identifier: AGPL-3.0-or-later
    SPDX-FileCopyrightText: 2026 Remora contributors
*/
use std::io::Write;

use colored::Colorize;
use env_logger::fmt::Formatter;
use log::{Level, LevelFilter, Record};

pub const LOGGER_PREFIX: &str = "Lamprey";
pub const INFO_SYMBOL: &str = "✦";
pub const WARN_SYMBOL: &str = "✧";
pub const ERROR_SYMBOL: &str = "❂";

pub fn init_logger(verbose: bool) {
    let mut builder = env_logger::Builder::new();

    builder.format(|buf: &mut Formatter, record: &Record| {
        let prefix = LOGGER_PREFIX.bold().yellow();
        let message = match record.level() {
            Level::Info => format!("{}  {}", INFO_SYMBOL.yellow(), record.args()).white(),
            Level::Warn => format!("{}  {}", WARN_SYMBOL.yellow(), record.args()).yellow(),
            Level::Error => format!("{}  {}", ERROR_SYMBOL.red(), record.args()).red().bold(),
            _ => format!("{}  {}", INFO_SYMBOL, record.args()).dimmed(),
        };

        writeln!(buf, "{} {}", prefix, message)
    });

    builder.filter_level(if verbose { LevelFilter::Debug } else { LevelFilter::Info });

    builder.target(env_logger::Target::Stdout);
    builder.init();
}
