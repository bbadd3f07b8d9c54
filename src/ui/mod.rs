pub mod icons;
pub mod output;
pub mod table;
pub mod theme;

pub use icons::Icons;
pub use output::{banner, info, section, success, summary_row};
pub use table::{record_table, stats_table, TableBuilder};
pub use theme::{theme, Theme};
