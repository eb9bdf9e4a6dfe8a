//! Output encoding
//!
//! This module encodes the processed table for consumers:
//! - Per-person JSON reports (latest values with deltas, plus history)
//! - The processed table as CSV (input columns, derived columns, diff columns)

use std::io::Write;

use chrono::Utc;
use uuid::Uuid;

use crate::error::TrendError;
use crate::query::ProcessedTable;
use crate::types::{Metric, PersonReport, ReportProducer};
use crate::{BODYTREND_VERSION, PRODUCER_NAME};

/// Report encoder for producing per-person payloads
pub struct ReportEncoder {
    instance_id: String,
}

impl Default for ReportEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportEncoder {
    /// Create a new encoder with a unique instance ID
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4().to_string(),
        }
    }

    /// Create an encoder with a specific instance ID
    pub fn with_instance_id(instance_id: String) -> Self {
        Self { instance_id }
    }

    /// Build the report for one person. Fails with `NotFound` for unknown persons.
    pub fn encode(&self, table: &ProcessedTable, person: &str) -> Result<PersonReport, TrendError> {
        let latest = table.get_latest(person)?;

        Ok(PersonReport {
            producer: ReportProducer {
                name: PRODUCER_NAME.to_string(),
                version: BODYTREND_VERSION.to_string(),
                instance_id: self.instance_id.clone(),
                computed_at_utc: Utc::now().to_rfc3339(),
            },
            person: person.to_string(),
            last_updated: table.latest_date(),
            latest,
            series: table.get_series(person),
        })
    }

    /// Encode the report as JSON
    pub fn encode_to_json(&self, table: &ProcessedTable, person: &str) -> Result<String, TrendError> {
        let report = self.encode(table, person)?;
        Ok(serde_json::to_string(&report)?)
    }
}

/// Column names of the processed table, in output order
pub fn processed_columns(table: &ProcessedTable) -> Vec<String> {
    let mut columns = table.headers().to_vec();
    columns.push("date".to_string());
    columns.push(Metric::LeanBodyMassKg.as_str().to_string());
    if table.mapping().has_height() {
        columns.push(Metric::Ffmi.as_str().to_string());
    }
    columns.extend(table.metrics().iter().map(Metric::diff_column));
    columns
}

/// Write the processed table as CSV. Identical tables give identical bytes.
pub fn write_processed_csv<W: Write>(table: &ProcessedTable, writer: W) -> Result<(), TrendError> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(processed_columns(table))?;

    let metrics = table.metrics();
    let has_height = table.mapping().has_height();

    for record in table.records() {
        let mut row = record.derived.measurement.source_cells.clone();
        row.push(record.date().format("%Y-%m-%d").to_string());
        row.push(record.derived.lean_body_mass_kg.to_string());
        if has_height {
            row.push(format_optional(record.derived.ffmi));
        }
        for metric in &metrics {
            row.push(format_optional(record.diffs.get(*metric)));
        }
        wtr.write_record(&row)?;
    }

    wtr.flush()?;
    Ok(())
}

fn format_optional(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::{CsvReaderSource, TableSource};
    use crate::pipeline::process_detected;
    use pretty_assertions::assert_eq;

    fn sample_table(csv: &str) -> ProcessedTable {
        let raw = CsvReaderSource::new("test", csv).load().unwrap();
        process_detected(&raw).unwrap()
    }

    const WITH_HEIGHT: &str = "タイムスタンプ,氏名 (姓名間空けない),身長 (cm),体重 (kg),体脂肪率 (%)\n\
                               2024/01/08 8:00:00,Taro,175,69.0,19.0\n\
                               2024/01/01 8:00:00,Taro,175,70.0,20.0\n";

    #[test]
    fn test_processed_csv_layout() {
        let table = sample_table(WITH_HEIGHT);
        let mut out = Vec::new();
        write_processed_csv(&table, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(
            lines[0],
            "タイムスタンプ,氏名 (姓名間空けない),身長 (cm),体重 (kg),体脂肪率 (%),date,lean_body_mass_kg,ffmi,weight_kg_diff,body_fat_pct_diff,lean_body_mass_kg_diff,ffmi_diff"
        );
        assert_eq!(
            lines[1],
            "2024/01/01 8:00:00,Taro,175,70.0,20.0,2024-01-01,56,18.29,0,0,0,0"
        );
        assert!(lines[2].starts_with("2024/01/08 8:00:00,Taro,175,69.0,19.0,2024-01-08,55.9,"));
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn test_processed_columns_without_height() {
        let table = sample_table(
            "タイムスタンプ,氏名 (姓名間空けない),体重 (kg),体脂肪率 (%)\n2024/01/01 8:00:00,Taro,70,20\n",
        );
        let columns = processed_columns(&table);
        assert!(!columns.contains(&"ffmi".to_string()));
        assert!(!columns.contains(&"ffmi_diff".to_string()));
        assert_eq!(columns.last().map(String::as_str), Some("lean_body_mass_kg_diff"));
    }

    #[test]
    fn test_encode_report() {
        let table = sample_table(WITH_HEIGHT);
        let encoder = ReportEncoder::with_instance_id("test-instance".to_string());
        let json = encoder.encode_to_json(&table, "Taro").unwrap();
        let payload: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(payload["producer"]["name"], "bodytrend");
        assert_eq!(payload["producer"]["instance_id"], "test-instance");
        assert_eq!(payload["person"], "Taro");
        assert_eq!(payload["last_updated"], "2024-01-08");
        assert_eq!(payload["latest"]["date"], "2024-01-08");
        assert_eq!(payload["latest"]["metrics"]["weight_kg"]["value"], 69.0);
        assert_eq!(payload["latest"]["metrics"]["weight_kg"]["delta"], -1.0);
        assert_eq!(payload["series"].as_array().unwrap().len(), 2);
        assert_eq!(payload["series"][0]["date"], "2024-01-08");
    }

    #[test]
    fn test_encode_unknown_person() {
        let table = sample_table(WITH_HEIGHT);
        let err = ReportEncoder::new().encode(&table, "Unknown").unwrap_err();
        assert!(err.is_not_found());
    }
}
