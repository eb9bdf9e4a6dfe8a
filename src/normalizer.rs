//! Row cleaning and typed coercion
//!
//! This module turns raw string rows into typed measurements:
//! - Numeric cells coerced to f64, unparseable content treated as missing
//! - Calendar date taken from the first token of the timestamp cell
//! - Rows with any missing required field dropped and counted
//! - Rows whose values or derived metrics exceed `MAX_METRIC_MAGNITUDE` dropped,
//!   so every later difference stays finite
//!
//! A single bad row is a data-quality issue and is absorbed here. A date column
//! where no row parses at all means the mapping is wrong and fails the table.

use chrono::NaiveDate;
use tracing::{debug, info};

use crate::error::TrendError;
use crate::features::{compute_ffmi, compute_lean_body_mass};
use crate::schema::{ColumnIndices, RawTable, SchemaMapping};
use crate::types::{CleaningReport, DropReason, MeasurementRecord};

/// Date format of the timestamp's first token
pub const DATE_FORMAT: &str = "%Y/%m/%d";

/// Largest absolute value accepted for a tracked or derived metric
pub const MAX_METRIC_MAGNITUDE: f64 = 1e12;

/// Output of the cleaning stage
#[derive(Debug, Clone)]
pub struct CleanedTable {
    /// Mapping the table was cleaned with
    pub mapping: SchemaMapping,
    /// Source header, in input order
    pub headers: Vec<String>,
    /// Retained rows, in input order
    pub records: Vec<MeasurementRecord>,
    /// Drop diagnostics
    pub report: CleaningReport,
}

/// Cleaner for converting raw rows to measurement records
pub struct Cleaner;

impl Cleaner {
    /// Clean a raw table under the given mapping
    pub fn clean(table: &RawTable, mapping: &SchemaMapping) -> Result<CleanedTable, TrendError> {
        let columns = mapping.bind(table.headers())?;

        let mut report = CleaningReport {
            rows_read: table.len(),
            ..Default::default()
        };
        let mut records = Vec::with_capacity(table.len());
        let mut date_tokens_seen = 0usize;
        let mut dates_parsed = 0usize;
        let mut first_bad_token: Option<String> = None;

        for row in 0..table.len() {
            let token = date_token(table.cell(row, columns.date));
            if let Some(token) = token {
                date_tokens_seen += 1;
                if parse_date(token).is_some() {
                    dates_parsed += 1;
                } else if first_bad_token.is_none() {
                    first_bad_token = Some(token.to_string());
                }
            }

            match clean_row(table, row, &columns) {
                Ok(record) => records.push(record),
                Err(reason) => {
                    debug!(row = row + 1, reason = reason.as_str(), "dropping row");
                    report.record_drop(reason);
                }
            }
        }

        if date_tokens_seen > 0 && dates_parsed == 0 {
            return Err(TrendError::SchemaError(format!(
                "column '{}' never matches {} (first value: '{}')",
                mapping.date,
                DATE_FORMAT,
                first_bad_token.unwrap_or_default()
            )));
        }

        report.rows_retained = records.len();
        info!(
            rows_read = report.rows_read,
            rows_retained = report.rows_retained,
            rows_dropped = report.rows_dropped(),
            "cleaned measurement table"
        );

        Ok(CleanedTable {
            mapping: mapping.clone(),
            headers: table.headers().to_vec(),
            records,
            report,
        })
    }
}

/// Validate and type one row, or name the first reason it is unusable
fn clean_row(
    table: &RawTable,
    row: usize,
    columns: &ColumnIndices,
) -> Result<MeasurementRecord, DropReason> {
    let date = match date_token(table.cell(row, columns.date)) {
        None => return Err(DropReason::MissingDate),
        Some(token) => parse_date(token).ok_or(DropReason::UnparseableDate)?,
    };

    let person = table.cell(row, columns.person);
    if person.trim().is_empty() {
        return Err(DropReason::MissingPerson);
    }

    let height_cm = match columns.height {
        Some(col) => {
            let height = parse_number(table.cell(row, col)).ok_or(DropReason::InvalidHeight)?;
            if height <= 0.0 {
                return Err(DropReason::NonPositiveHeight);
            }
            Some(height)
        }
        None => None,
    };

    let weight_kg =
        parse_number(table.cell(row, columns.weight)).ok_or(DropReason::InvalidWeight)?;
    let body_fat_pct =
        parse_number(table.cell(row, columns.body_fat)).ok_or(DropReason::InvalidBodyFat)?;

    let lean_body_mass_kg = compute_lean_body_mass(weight_kg, body_fat_pct);
    let ffmi = height_cm.and_then(|height| compute_ffmi(lean_body_mass_kg, height));
    let in_range = |value: f64| value.abs() <= MAX_METRIC_MAGNITUDE;
    if ![weight_kg, body_fat_pct, lean_body_mass_kg]
        .into_iter()
        .chain(ffmi)
        .all(in_range)
    {
        return Err(DropReason::MetricOutOfRange);
    }

    Ok(MeasurementRecord {
        date,
        person: person.to_string(),
        height_cm,
        weight_kg,
        body_fat_pct,
        source_cells: table.aligned_row(row),
    })
}

/// First whitespace-delimited token of a timestamp cell
fn date_token(cell: &str) -> Option<&str> {
    cell.split_whitespace().next()
}

/// Parse a `YYYY/MM/DD` token
pub fn parse_date(token: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(token, DATE_FORMAT).ok()
}

/// Coerce a cell to a finite number; anything else is missing
pub fn parse_number(cell: &str) -> Option<f64> {
    cell.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{
        BODY_FAT_COLUMN, DATE_COLUMN, HEIGHT_COLUMN, PERSON_COLUMN, WEIGHT_COLUMN,
    };

    fn make_table(rows: &[[&str; 5]]) -> RawTable {
        RawTable::new(
            [
                DATE_COLUMN,
                PERSON_COLUMN,
                HEIGHT_COLUMN,
                WEIGHT_COLUMN,
                BODY_FAT_COLUMN,
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            rows.iter()
                .map(|r| r.iter().map(|s| s.to_string()).collect())
                .collect(),
        )
    }

    #[test]
    fn test_clean_valid_rows() {
        let table = make_table(&[
            ["2024/01/01 09:15:00", "Taro", "172.5", "70.0", "20.0"],
            ["2024/01/08 21:00:03", "Hanako", "158", " 52.3 ", "24.1"],
        ]);
        let cleaned = Cleaner::clean(&table, &SchemaMapping::with_height()).unwrap();

        assert_eq!(cleaned.records.len(), 2);
        let first = &cleaned.records[0];
        assert_eq!(first.date, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(first.person, "Taro");
        assert_eq!(first.height_cm, Some(172.5));
        assert_eq!(first.source_cells[0], "2024/01/01 09:15:00");
        assert_eq!(cleaned.records[1].weight_kg, 52.3);
        assert_eq!(cleaned.report.rows_dropped(), 0);
    }

    #[test]
    fn test_missing_weight_drops_row() {
        let table = make_table(&[
            ["2024/01/01 09:15:00", "Taro", "172.5", "", "20.0"],
            ["2024/01/02 09:15:00", "Taro", "172.5", "69.5", "19.8"],
        ]);
        let cleaned = Cleaner::clean(&table, &SchemaMapping::with_height()).unwrap();

        assert_eq!(cleaned.records.len(), 1);
        assert_eq!(cleaned.records[0].weight_kg, 69.5);
        assert_eq!(cleaned.report.dropped[&DropReason::InvalidWeight], 1);
    }

    #[test]
    fn test_zero_height_drops_row() {
        let table = make_table(&[
            ["2024/01/01 09:15:00", "Taro", "0", "70.0", "20.0"],
            ["2024/01/01 09:15:00", "Jiro", "-170", "70.0", "20.0"],
        ]);
        let cleaned = Cleaner::clean(&table, &SchemaMapping::with_height()).unwrap();

        assert!(cleaned.records.is_empty());
        assert_eq!(cleaned.report.dropped[&DropReason::NonPositiveHeight], 2);
    }

    #[test]
    fn test_unparseable_cells_are_missing() {
        let table = make_table(&[
            ["2024/01/01 09:15:00", "Taro", "172", "seventy", "20.0"],
            ["2024/01/01 09:15:00", "Taro", "172", "70", "NaN"],
            ["2024/01/01 09:15:00", "", "172", "70", "20"],
            ["", "Taro", "172", "70", "20"],
        ]);
        let cleaned = Cleaner::clean(&table, &SchemaMapping::with_height()).unwrap();

        assert!(cleaned.records.is_empty());
        assert_eq!(cleaned.report.rows_read, 4);
        assert_eq!(cleaned.report.rows_dropped(), 4);
        assert_eq!(cleaned.report.dropped[&DropReason::InvalidBodyFat], 1);
        assert_eq!(cleaned.report.dropped[&DropReason::MissingPerson], 1);
        assert_eq!(cleaned.report.dropped[&DropReason::MissingDate], 1);
    }

    #[test]
    fn test_single_bad_date_is_dropped_not_fatal() {
        let table = make_table(&[
            ["2024-01-01 09:15:00", "Taro", "172", "70", "20"],
            ["2024/01/02 09:15:00", "Taro", "172", "69", "20"],
        ]);
        let cleaned = Cleaner::clean(&table, &SchemaMapping::with_height()).unwrap();

        assert_eq!(cleaned.records.len(), 1);
        assert_eq!(cleaned.report.dropped[&DropReason::UnparseableDate], 1);
    }

    #[test]
    fn test_no_date_ever_matches_is_schema_error() {
        let table = make_table(&[
            ["2024-01-01T09:15:00Z", "Taro", "172", "70", "20"],
            ["2024-01-02T09:15:00Z", "Taro", "172", "69", "20"],
        ]);
        let err = Cleaner::clean(&table, &SchemaMapping::with_height()).unwrap_err();
        assert!(matches!(err, TrendError::SchemaError(_)));
    }

    #[test]
    fn test_empty_table_is_not_an_error() {
        let table = make_table(&[]);
        let cleaned = Cleaner::clean(&table, &SchemaMapping::with_height()).unwrap();
        assert!(cleaned.records.is_empty());
    }

    #[test]
    fn test_height_ignored_without_height_mapping() {
        let table = make_table(&[["2024/01/01 09:15:00", "Taro", "0", "70", "20"]]);
        let cleaned = Cleaner::clean(&table, &SchemaMapping::without_height()).unwrap();

        assert_eq!(cleaned.records.len(), 1);
        assert_eq!(cleaned.records[0].height_cm, None);
    }

    #[test]
    fn test_huge_values_drop_row() {
        let table = make_table(&[
            ["2024/01/01 09:15:00", "Taro", "172", "1e308", "20"],
            ["2024/01/02 09:15:00", "Taro", "172", "70", "-1e300"],
            ["2024/01/03 09:15:00", "Taro", "1e-300", "70", "20"],
            ["2024/01/04 09:15:00", "Taro", "172", "70", "20"],
        ]);
        let cleaned = Cleaner::clean(&table, &SchemaMapping::with_height()).unwrap();

        assert_eq!(cleaned.records.len(), 1);
        assert_eq!(cleaned.records[0].weight_kg, 70.0);
        assert_eq!(cleaned.report.dropped[&DropReason::MetricOutOfRange], 3);
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number(" 65.5 "), Some(65.5));
        assert_eq!(parse_number("inf"), None);
        assert_eq!(parse_number(""), None);
    }
}
