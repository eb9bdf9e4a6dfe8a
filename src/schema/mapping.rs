//! Logical field to source column mapping
//!
//! The measurement sheet has been published under two layouts: one with a
//! height column and one without. A single `SchemaMapping` describes either, so
//! the rest of the pipeline never branches on the layout.

use crate::error::TrendError;
use serde::{Deserialize, Serialize};

/// Timestamp column written by the entry form
pub const DATE_COLUMN: &str = "タイムスタンプ";
/// Person name column (family and given name without a space)
pub const PERSON_COLUMN: &str = "氏名 (姓名間空けない)";
/// Height column (cm)
pub const HEIGHT_COLUMN: &str = "身長 (cm)";
/// Weight column (kg)
pub const WEIGHT_COLUMN: &str = "体重 (kg)";
/// Body fat column (%)
pub const BODY_FAT_COLUMN: &str = "体脂肪率 (%)";

/// Source column names for each logical field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaMapping {
    /// Timestamp column ("YYYY/MM/DD HH:MM:SS")
    pub date: String,
    /// Person identifier column
    pub person: String,
    /// Height column, absent in layouts without height
    #[serde(default)]
    pub height: Option<String>,
    /// Weight column
    pub weight: String,
    /// Body fat percentage column
    pub body_fat: String,
}

impl Default for SchemaMapping {
    fn default() -> Self {
        Self::with_height()
    }
}

impl SchemaMapping {
    /// Layout with a height column
    pub fn with_height() -> Self {
        Self {
            date: DATE_COLUMN.to_string(),
            person: PERSON_COLUMN.to_string(),
            height: Some(HEIGHT_COLUMN.to_string()),
            weight: WEIGHT_COLUMN.to_string(),
            body_fat: BODY_FAT_COLUMN.to_string(),
        }
    }

    /// Layout without a height column (no FFMI)
    pub fn without_height() -> Self {
        Self {
            height: None,
            ..Self::with_height()
        }
    }

    /// Built-in layouts, in resolution order
    pub fn known_layouts() -> Vec<SchemaMapping> {
        vec![Self::with_height(), Self::without_height()]
    }

    pub fn has_height(&self) -> bool {
        self.height.is_some()
    }

    /// Pick the first built-in layout whose columns all exist in `headers`.
    pub fn resolve(headers: &[String]) -> Result<Self, TrendError> {
        Self::known_layouts()
            .into_iter()
            .find(|layout| layout.bind(headers).is_ok())
            .ok_or_else(|| {
                TrendError::SchemaError(format!(
                    "header matches no known layout: [{}]",
                    headers.join(", ")
                ))
            })
    }

    /// Locate every mapped column in `headers`.
    pub fn bind(&self, headers: &[String]) -> Result<ColumnIndices, TrendError> {
        let find = |name: &str| -> Result<usize, TrendError> {
            headers
                .iter()
                .position(|h| h == name)
                .ok_or_else(|| TrendError::SchemaError(format!("missing column: {name}")))
        };

        Ok(ColumnIndices {
            date: find(&self.date)?,
            person: find(&self.person)?,
            height: self.height.as_deref().map(|h| find(h)).transpose()?,
            weight: find(&self.weight)?,
            body_fat: find(&self.body_fat)?,
        })
    }
}

/// Column positions of the mapped fields within a specific table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnIndices {
    pub date: usize,
    pub person: usize,
    pub height: Option<usize>,
    pub weight: usize,
    pub body_fat: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_resolve_prefers_height_layout() {
        let h = headers(&[
            DATE_COLUMN,
            PERSON_COLUMN,
            HEIGHT_COLUMN,
            WEIGHT_COLUMN,
            BODY_FAT_COLUMN,
        ]);
        let mapping = SchemaMapping::resolve(&h).unwrap();
        assert!(mapping.has_height());

        let indices = mapping.bind(&h).unwrap();
        assert_eq!(indices.height, Some(2));
        assert_eq!(indices.body_fat, 4);
    }

    #[test]
    fn test_resolve_falls_back_without_height() {
        let h = headers(&[DATE_COLUMN, PERSON_COLUMN, WEIGHT_COLUMN, BODY_FAT_COLUMN]);
        let mapping = SchemaMapping::resolve(&h).unwrap();
        assert_eq!(mapping, SchemaMapping::without_height());
    }

    #[test]
    fn test_resolve_unknown_header_is_schema_error() {
        let h = headers(&["Timestamp", "Name", "Weight"]);
        let err = SchemaMapping::resolve(&h).unwrap_err();
        assert!(matches!(err, TrendError::SchemaError(_)));
    }

    #[test]
    fn test_bind_reports_missing_column() {
        let mapping = SchemaMapping {
            date: "when".to_string(),
            person: "who".to_string(),
            height: None,
            weight: "kg".to_string(),
            body_fat: "bf".to_string(),
        };
        let err = mapping.bind(&headers(&["when", "who", "kg"])).unwrap_err();
        assert_eq!(err.to_string(), "Schema mismatch: missing column: bf");
    }

    #[test]
    fn test_mapping_from_json_without_height() {
        let json = r#"{"date":"ts","person":"name","weight":"w","body_fat":"bf"}"#;
        let mapping: SchemaMapping = serde_json::from_str(json).unwrap();
        assert!(!mapping.has_height());
        assert_eq!(mapping.person, "name");
    }
}
