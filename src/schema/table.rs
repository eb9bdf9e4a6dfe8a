//! Raw tabular input
//!
//! A header row plus string cells, exactly as the loader read them. Nothing is
//! typed at this stage; the cleaner owns coercion.

use serde::{Deserialize, Serialize};

/// Untyped source table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl RawTable {
    /// Build a table. Rows shorter than the header read as empty cells.
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Cell at (`row`, `col`); missing trailing cells read as ""
    pub fn cell(&self, row: usize, col: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .map(String::as_str)
            .unwrap_or("")
    }

    /// A row's cells padded to the header width
    pub fn aligned_row(&self, row: usize) -> Vec<String> {
        (0..self.headers.len())
            .map(|col| self.cell(row, col).to_string())
            .collect()
    }
}
