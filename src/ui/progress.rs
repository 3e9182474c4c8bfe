use crate::output::{StatusSink, is_quiet};
use crate::ui::output::agency_line;
use crate::ui::theme;
use crate::ui::Icons;
use indicatif::{HumanDuration, ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use std::time::Duration;

/// Terminal status for import and export runs.
///
/// One-shot status lines print above a spinner whose message is the
/// overwritable progress line ("caltrain: Importing - stops.txt - 1400 lines imported").
pub struct AgencyProgress {
    pb: ProgressBar,
}

impl AgencyProgress {
    pub fn new() -> Self {
        if is_quiet() || !console::Term::stdout().is_term() {
            return Self { pb: ProgressBar::hidden() };
        }

        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
            pb.set_style(style);
        }
        pb.enable_steady_tick(Duration::from_millis(100));
        Self { pb }
    }

    pub fn finish(&self, duration: Duration, summary: &str) {
        self.pb.finish_and_clear();
        if is_quiet() {
            return;
        }
        println!(
            "{} {}",
            Icons::CHECK.style(theme().success.clone()),
            format!("{summary} in {}", HumanDuration(duration)).style(theme().success.clone())
        );
    }
}

impl Default for AgencyProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusSink for AgencyProgress {
    fn status(&self, agency_key: &str, message: &str) {
        if is_quiet() {
            return;
        }
        let line = agency_line(agency_key, message);
        if self.pb.is_hidden() {
            println!("{line}");
        } else {
            self.pb.println(line);
        }
    }

    fn progress(&self, agency_key: &str, message: &str) {
        if self.pb.is_hidden() {
            return;
        }
        self.pb.set_message(agency_line(agency_key, message));
    }
}
