use std::sync::OnceLock;

static QUIET: OnceLock<bool> = OnceLock::new();

pub fn is_quiet() -> bool {
    *QUIET.get_or_init(|| {
        std::env::var("GTFSDB_QUIET")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    })
}

/// Receives per-agency status from long-running pipelines.
///
/// `status` lines are one-shot; `progress` lines overwrite the previous
/// progress line for the same agency.
pub trait StatusSink {
    fn status(&self, agency_key: &str, message: &str);

    fn progress(&self, agency_key: &str, message: &str) {
        self.status(agency_key, message);
    }
}

/// Discards everything
pub struct Silent;

impl StatusSink for Silent {
    fn status(&self, _agency_key: &str, _message: &str) {}
}
