// ============================================================
// CSV DOMAIN LAYER
// ============================================================
// Core types for CSV cleaning
// No I/O, no async

mod report;
mod schema;
mod table;

pub use report::CleaningReport;
pub use schema::{ExpectedColumns, MACHINE_FAILURE_COLUMNS};
pub use table::{is_missing, CsvRecord, CsvTable};
