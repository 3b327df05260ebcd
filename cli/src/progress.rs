use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use crate::logger::{INFO_SYMBOL, LOGGER_PREFIX};

/// A wrapper around indicatif ProgressBar
/// With custom styling from the logger
pub struct LampreyProgress {
    pb: ProgressBar,
}

impl LampreyProgress {
    pub fn new(total_size: u64) -> Self {
        let prefix = format!("{} {}", LOGGER_PREFIX.bold().yellow(), INFO_SYMBOL.yellow());

        let pb = ProgressBar::new(total_size);
        pb.set_style(
            ProgressStyle::with_template(
                &format!(
                     "{}  [{{bar:40.yellow/red}}] {{bytes}}/{{total_bytes}} ({{elapsed}} / ETA: {{eta}}, {{bytes_per_sec}}) {{msg}}",
                     prefix
                 )
            )
            .unwrap()
            .progress_chars("##-"),
        );

        Self { pb }
    }

    /// Adjusts the bar length; transfers report their own totals and some
    /// flows chain transfers of different sizes.
    pub fn set_total(&self, total: u64) {
        if self.pb.length() != Some(total) {
            self.pb.set_length(total);
        }
    }

    pub fn update(&self, written: u64, msg: &str) {
        self.pb.set_position(written);
        self.pb.set_message(msg.to_string());
    }

    pub fn finish(&self, msg: &str) {
        self.pb.finish_with_message(msg.to_string());
    }

    pub fn abandon(&self, msg: &str) {
        self.pb.abandon_with_message(msg.to_string());
    }
}
