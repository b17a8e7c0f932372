// ============================================================
// EXPECTED COLUMNS
// ============================================================
// Column allow-list applied when cleaning incoming files

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Columns the classifier is trained on, plus the label column.
pub const MACHINE_FAILURE_COLUMNS: [&str; 8] = [
    "airtemperature_k",
    "process_temperature_k",
    "rotational_speed_rpm",
    "torque_nm",
    "tool_wear_min",
    "type_l",
    "type_m",
    "target",
];

/// Set of column names to keep. An empty set keeps every column.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExpectedColumns(BTreeSet<String>);

impl ExpectedColumns {
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(columns.into_iter().map(Into::into).collect())
    }

    /// Allow-list for the machine-failure dataset
    pub fn machine_failure() -> Self {
        Self::new(MACHINE_FAILURE_COLUMNS)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, column: &str) -> bool {
        self.0.contains(column)
    }
}
