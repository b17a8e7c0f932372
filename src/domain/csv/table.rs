// ============================================================
// CSV TABLE TYPES
// ============================================================
// In-memory representation of a parsed CSV file

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Tokens read as a missing value, in addition to blank cells.
static NA_TOKENS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "NA", "N/A", "n/a", "NaN", "nan", "-NaN", "-nan", "null", "NULL", "None", "<NA>", "#N/A",
        "#NA", "#N/A N/A", "1.#IND", "-1.#IND", "1.#QNAN", "-1.#QNAN",
    ]
    .into_iter()
    .collect()
});

/// Returns true when a raw cell value counts as missing.
pub fn is_missing(raw: &str) -> bool {
    let trimmed = raw.trim();
    trimmed.is_empty() || NA_TOKENS.contains(trimmed)
}

/// A single data row. `None` marks a missing cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CsvRecord {
    /// Row index in the source file (0-based, header excluded)
    pub index: usize,

    /// One entry per header column
    pub values: Vec<Option<String>>,
}

impl CsvRecord {
    /// Build a record from raw cells. Rows shorter than `width` get missing
    /// trailing cells; callers reject longer rows.
    pub fn from_raw<'a, I>(index: usize, cells: I, width: usize) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut values: Vec<Option<String>> = cells
            .into_iter()
            .map(|cell| {
                if is_missing(cell) {
                    None
                } else {
                    Some(cell.to_string())
                }
            })
            .collect();
        values.resize(width, None);

        Self { index, values }
    }

    pub fn has_missing(&self) -> bool {
        self.values.iter().any(Option::is_none)
    }
}

/// Header plus rows of a CSV file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CsvTable {
    pub headers: Vec<String>,
    pub rows: Vec<CsvRecord>,
}

impl CsvTable {
    pub fn new(headers: Vec<String>, rows: Vec<CsvRecord>) -> Self {
        Self { headers, rows }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.headers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_and_na_tokens_are_missing() {
        assert!(is_missing(""));
        assert!(is_missing("   "));
        assert!(is_missing("NaN"));
        assert!(is_missing("NULL"));
        assert!(!is_missing("0"));
        assert!(!is_missing("false"));
    }

    #[test]
    fn test_short_row_is_padded_with_missing() {
        let record = CsvRecord::from_raw(0, ["1", "2"], 3);
        assert_eq!(record.values.len(), 3);
        assert!(record.has_missing());
        assert_eq!(record.values[1].as_deref(), Some("2"));
        assert_eq!(record.values[2], None);
    }

    #[test]
    fn test_na_token_cell_is_none() {
        let record = CsvRecord::from_raw(4, ["a", "N/A"], 2);
        assert_eq!(record.values, vec![Some("a".to_string()), None]);
        assert_eq!(record.index, 4);
    }
}
