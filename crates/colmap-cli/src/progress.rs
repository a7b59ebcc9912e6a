//! Progress bar for generation runs.

use std::io::{self, IsTerminal};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

const BAR_TEMPLATE: &str = "{spinner:.cyan} [{elapsed_precise}] {bar:30.cyan/blue} {pos}/{len} sheets {msg}";

/// Groups completed out of the session total. Does nothing when disabled or
/// when stderr is not a terminal.
pub struct Progress {
    bar: Option<ProgressBar>,
}

impl Progress {
    pub fn new(enabled: bool) -> Self {
        if !enabled || !io::stderr().is_terminal() {
            return Self { bar: None };
        }
        let bar = ProgressBar::new_spinner();
        bar.enable_steady_tick(Duration::from_millis(100));
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.set_message("Preparing session");
        Self { bar: Some(bar) }
    }

    /// Switch from the spinner to a bar once the group count is known.
    pub fn start(&self, total_groups: usize) {
        if let Some(bar) = &self.bar {
            bar.set_length(total_groups as u64);
            bar.set_style(
                ProgressStyle::with_template(BAR_TEMPLATE)
                    .unwrap_or_else(|_| ProgressStyle::default_bar()),
            );
            bar.set_message("");
        }
    }

    pub fn group_done(&self, sheet: &str) {
        if let Some(bar) = &self.bar {
            bar.set_message(sheet.to_string());
            bar.inc(1);
        }
    }

    pub fn finish_ok(&self, message: &str) {
        if let Some(bar) = &self.bar {
            bar.finish_with_message(message.to_string());
        }
    }

    pub fn finish_err(&self, message: &str) {
        if let Some(bar) = &self.bar {
            bar.abandon_with_message(message.to_string());
        }
    }
}
