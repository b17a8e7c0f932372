use serde::{Deserialize, Serialize};

/// Summary of one cleaning pass over a table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleaningReport {
    pub rows_in: usize,
    pub rows_out: usize,
    pub columns_in: usize,
    pub columns_out: usize,

    /// Headers removed by the allow-list
    pub dropped_columns: Vec<String>,
}

impl CleaningReport {
    pub fn dropped_rows(&self) -> usize {
        self.rows_in - self.rows_out
    }

    pub fn summary(&self) -> String {
        format!(
            "{} -> {} rows ({} dropped), {} -> {} columns",
            self.rows_in,
            self.rows_out,
            self.dropped_rows(),
            self.columns_in,
            self.columns_out
        )
    }
}
