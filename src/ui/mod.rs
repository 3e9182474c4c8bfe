pub mod icons;
pub mod output;
pub mod progress;
pub mod table;
pub mod theme;

pub use icons::Icons;
pub use output::{agency_line, dim, error, header, info, status, success, summary_row, warn};
pub use progress::AgencyProgress;
pub use table::{rows_table, stats_table};
pub use theme::{error_theme, theme, Theme};
