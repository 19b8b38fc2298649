pub mod area_catalog;
pub mod file_run_journal;

pub use area_catalog::*;
pub use file_run_journal::*;
