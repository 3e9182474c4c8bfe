use crate::ui::theme::{error_theme, theme};
use crate::ui::Icons;
use owo_colors::OwoColorize;

pub fn header(text: &str) {
    println!("{} {}", Icons::ROCKET, text.style(theme().header.clone()));
}

pub fn status(icon: &str, label: &str, value: &str) {
    println!("{} {}: {}", icon, label.style(theme().dim.clone()), value);
}

pub fn success(label: &str) {
    println!("{} {}", Icons::CHECK, label.style(theme().success.clone()));
}

// Failures and warnings go to stderr so `--json` stdout stays parseable

pub fn error(message: &str) {
    eprintln!("{} {}", Icons::CROSS, message.style(error_theme().error.clone()));
}

pub fn warn(message: &str) {
    eprintln!("{} {}", Icons::WARN, message.style(error_theme().warn.clone()));
}

pub fn info(label: &str, value: &str) {
    println!(
        "{} {}: {}",
        Icons::INFO,
        label.style(theme().dim.clone()),
        value
    );
}

pub fn dim(text: &str) -> String {
    text.style(theme().dim.clone()).to_string()
}

/// `agency_key: message`, with the key highlighted
pub fn agency_line(agency_key: &str, message: &str) -> String {
    format!("{}: {}", agency_key.style(theme().key.clone()), message)
}

/// Indented `label  value` line under a batch summary, labels padded to align
pub fn summary_row(label: &str, value: &str) {
    println!("  {:<24} {}", label.style(theme().key.clone()), value.style(theme().dim.clone()));
}
