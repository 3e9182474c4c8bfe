//! Terminal styles, chosen per stream: color is dropped on whichever of
//! stdout or stderr is not a terminal.

use owo_colors::Style;
use std::sync::OnceLock;

static STDOUT: OnceLock<Theme> = OnceLock::new();
static STDERR: OnceLock<Theme> = OnceLock::new();

#[derive(Debug, Clone)]
pub struct Theme {
    pub header: Style,
    pub success: Style,
    pub error: Style,
    pub warn: Style,
    /// Labels, row counts and other secondary text
    pub dim: Style,
    /// Agency keys in status and summary lines
    pub key: Style,
}

impl Theme {
    pub fn new(colored: bool) -> Self {
        let style = |s: Style| if colored { s } else { Style::new() };
        Self {
            header: style(Style::new().cyan().bold()),
            success: style(Style::new().green().bold()),
            error: style(Style::new().red().bold()),
            warn: style(Style::new().yellow()),
            dim: style(Style::new().dimmed()),
            key: style(Style::new().blue().bold()),
        }
    }
}

/// Styles for stdout
pub fn theme() -> &'static Theme {
    STDOUT.get_or_init(|| Theme::new(console::Term::stdout().is_term()))
}

/// Styles for errors and warnings, which go to stderr
pub fn error_theme() -> &'static Theme {
    STDERR.get_or_init(|| Theme::new(console::Term::stderr().is_term()))
}
