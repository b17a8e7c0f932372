// ============================================================
// CSV CLEANER USE CASE
// ============================================================
// Drop incomplete rows and restrict columns to the allow-list

use std::path::Path;
use std::time::Instant;

use tracing::debug;

use crate::domain::csv::{CleaningReport, CsvRecord, CsvTable, ExpectedColumns};
use crate::domain::error::{AppError, Result};
use crate::infrastructure::csv::{write_table, CsvParser};

/// Remove every row with a missing value in any column, then keep only the
/// allow-listed columns in their original order. An empty allow-list keeps
/// every column.
pub fn clean_table(table: &CsvTable, expected: &ExpectedColumns) -> (CsvTable, CleaningReport) {
    let kept_columns: Vec<usize> = table
        .headers
        .iter()
        .enumerate()
        .filter(|(_, name)| expected.is_empty() || expected.contains(name))
        .map(|(idx, _)| idx)
        .collect();

    let headers: Vec<String> = kept_columns
        .iter()
        .map(|&idx| table.headers[idx].clone())
        .collect();

    let rows: Vec<CsvRecord> = table
        .rows
        .iter()
        .filter(|row| !row.has_missing())
        .map(|row| CsvRecord {
            index: row.index,
            values: kept_columns.iter().map(|&idx| row.values[idx].clone()).collect(),
        })
        .collect();

    let dropped_columns = table
        .headers
        .iter()
        .enumerate()
        .filter(|(idx, _)| !kept_columns.contains(idx))
        .map(|(_, name)| name.clone())
        .collect();

    let report = CleaningReport {
        rows_in: table.row_count(),
        rows_out: rows.len(),
        columns_in: table.column_count(),
        columns_out: headers.len(),
        dropped_columns,
    };

    (CsvTable::new(headers, rows), report)
}

/// CSV cleaning use case
pub struct CsvCleaner {
    expected: ExpectedColumns,
}

impl CsvCleaner {
    pub fn new(expected: ExpectedColumns) -> Self {
        Self { expected }
    }

    /// Clean CSV bytes and return the re-serialized output
    pub fn clean_bytes(&self, input: &[u8]) -> Result<(Vec<u8>, CleaningReport)> {
        let start = Instant::now();

        let table = CsvParser::default()
            .parse_bytes(input)
            .map_err(|e| AppError::ParseError(format!("Input is not tabular: {}", e)))?;

        let (cleaned, report) = clean_table(&table, &self.expected);
        let output = write_table(&cleaned)?;

        debug!(
            rows_in = report.rows_in,
            rows_out = report.rows_out,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Cleaned CSV content"
        );

        Ok((output, report))
    }

    /// Clean a file in place
    pub fn clean_file(&self, path: &Path) -> Result<CleaningReport> {
        let input = std::fs::read(path).map_err(|e| {
            AppError::IoError(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let (output, report) = self.clean_bytes(&input)?;
        std::fs::write(path, output).map_err(|e| {
            AppError::IoError(format!("Failed to write {}: {}", path.display(), e))
        })?;
        Ok(report)
    }
}

impl Default for CsvCleaner {
    fn default() -> Self {
        Self::new(ExpectedColumns::machine_failure())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MACHINE_CSV: &str = "\
airtemperature_k,process_temperature_k,rotational_speed_rpm,torque_nm,tool_wear_min,type_l,type_m,extra_col
298.1,308.6,1551,42.8,0,True,False,x
298.2,,1408,46.3,3,False,True,y
298.1,308.5,1498,49.4,5,True,False,";

    fn clean_str(cleaner: &CsvCleaner, input: &str) -> (String, CleaningReport) {
        let (bytes, report) = cleaner.clean_bytes(input.as_bytes()).unwrap();
        (String::from_utf8(bytes).unwrap(), report)
    }

    #[test]
    fn test_example_row_loses_extra_column() {
        let input = "\
airtemperature_k,process_temperature_k,rotational_speed_rpm,torque_nm,tool_wear_min,type_l,type_m,extra_col
298.1,308.6,1551,42.8,0,true,false,x";
        let (output, report) = clean_str(&CsvCleaner::default(), input);

        assert_eq!(
            output,
            "airtemperature_k,process_temperature_k,rotational_speed_rpm,torque_nm,tool_wear_min,type_l,type_m\n\
             298.1,308.6,1551,42.8,0,true,false\n"
        );
        assert_eq!(report.dropped_columns, vec!["extra_col"]);
        assert_eq!(report.rows_out, 1);
    }

    #[test]
    fn test_rows_with_missing_values_are_dropped() {
        let (output, report) = clean_str(&CsvCleaner::default(), MACHINE_CSV);

        // row 2 misses a retained column, row 3 misses only extra_col
        assert_eq!(report.rows_in, 3);
        assert_eq!(report.rows_out, 1);
        assert_eq!(report.dropped_rows(), 2);
        assert_eq!(output.lines().count(), 2);
        assert!(output.contains("298.1,308.6,1551,42.8,0,True,False"));
    }

    #[test]
    fn test_empty_allow_list_keeps_all_columns() {
        let cleaner = CsvCleaner::new(ExpectedColumns::default());
        let (output, report) = clean_str(&cleaner, "b,a,c\n1,2,3\n4,,6\n");

        assert_eq!(output, "b,a,c\n1,2,3\n");
        assert_eq!(report.columns_out, 3);
        assert!(report.dropped_columns.is_empty());
    }

    #[test]
    fn test_column_order_is_preserved() {
        let cleaner = CsvCleaner::new(ExpectedColumns::new(["c", "a"]));
        let (output, _) = clean_str(&cleaner, "a,b,c\n1,2,3\n");
        assert_eq!(output, "a,c\n1,3\n");
    }

    #[test]
    fn test_allow_list_without_matches_yields_no_columns() {
        let table = CsvParser::default().parse_content("a,b\n1,2\n").unwrap();
        let (cleaned, report) = clean_table(&table, &ExpectedColumns::new(["z"]));
        assert!(cleaned.headers.is_empty());
        assert_eq!(cleaned.rows.len(), 1);
        assert_eq!(report.columns_out, 0);
    }

    #[test]
    fn test_clean_table_matches_row_by_row_definition() {
        let table = CsvParser::default()
            .parse_content("a,b,c\n1,2,3\nNA,5,6\n7,8,\n9,10,11\n")
            .unwrap();
        let expected = ExpectedColumns::new(["a", "c"]);
        let (cleaned, _) = clean_table(&table, &expected);

        let survivors: Vec<usize> = cleaned.rows.iter().map(|r| r.index).collect();
        let complete: Vec<usize> = table
            .rows
            .iter()
            .filter(|r| !r.has_missing())
            .map(|r| r.index)
            .collect();
        assert_eq!(survivors, complete);
        assert!(cleaned.headers.iter().all(|h| expected.contains(h)));
        assert!(cleaned.rows.iter().all(|r| !r.has_missing()));
    }

    #[test]
    fn test_non_tabular_input_fails() {
        let result = CsvCleaner::default().clean_bytes(b"");
        assert!(matches!(result, Err(AppError::ParseError(_))));
    }

    #[test]
    fn test_ragged_row_fails_instead_of_dropping_fields() {
        let cleaner = CsvCleaner::new(ExpectedColumns::default());
        let err = cleaner.clean_bytes(b"a,b\n1,2\n3,4,5\n6,7\n").unwrap_err();
        assert!(matches!(err, AppError::ParseError(_)));
        assert!(err.to_string().contains("Expected 2 fields in line 3, saw 3"));
    }

    #[test]
    fn test_padded_header_is_not_in_allow_list() {
        let cleaner = CsvCleaner::new(ExpectedColumns::new(["torque_nm", "type_l"]));
        let (output, report) = clean_str(&cleaner, " torque_nm,type_l\n40.5,1\n");
        assert_eq!(output, "type_l\n1\n");
        assert_eq!(report.dropped_columns, vec![" torque_nm"]);
    }

    #[test]
    fn test_clean_file_overwrites_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("batch.csv");
        std::fs::write(&path, MACHINE_CSV).unwrap();

        let report = CsvCleaner::default().clean_file(&path).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();

        assert_eq!(report.rows_out, 1);
        assert!(!written.contains("extra_col"));
    }
}
