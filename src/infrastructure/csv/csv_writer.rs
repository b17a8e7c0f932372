// ============================================================
// CSV WRITER
// ============================================================
// Serialize a table back to comma-delimited bytes

use csv::WriterBuilder;

use crate::domain::csv::CsvTable;
use crate::domain::error::{AppError, Result};

/// Write a table with a header row and no index column.
/// Missing cells are written as empty fields.
pub fn write_table(table: &CsvTable) -> Result<Vec<u8>> {
    let mut writer = WriterBuilder::new().from_writer(Vec::new());

    writer.write_record(&table.headers)?;
    for row in &table.rows {
        writer.write_record(row.values.iter().map(|v| v.as_deref().unwrap_or("")))?;
    }

    writer
        .into_inner()
        .map_err(|e| AppError::IoError(format!("Failed to flush CSV output: {}", e)))
}
