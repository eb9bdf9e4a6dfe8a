//! Core types for the bodytrend pipeline
//!
//! This module defines the data structures that flow through each stage of the
//! pipeline: cleaned measurements, derived records, diff-augmented records, and
//! the projections handed to the presentation layer.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Numeric fields tracked over time for each person
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    WeightKg,
    BodyFatPct,
    LeanBodyMassKg,
    Ffmi,
}

impl Metric {
    /// All tracked metrics, in display order
    pub const ALL: [Metric; 4] = [
        Metric::WeightKg,
        Metric::BodyFatPct,
        Metric::LeanBodyMassKg,
        Metric::Ffmi,
    ];

    /// Column name used in the processed table
    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::WeightKg => "weight_kg",
            Metric::BodyFatPct => "body_fat_pct",
            Metric::LeanBodyMassKg => "lean_body_mass_kg",
            Metric::Ffmi => "ffmi",
        }
    }

    /// Column name of the metric's delta in the processed table
    pub fn diff_column(&self) -> String {
        format!("{}_diff", self.as_str())
    }

    /// Human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            Metric::WeightKg => "Weight",
            Metric::BodyFatPct => "Body fat",
            Metric::LeanBodyMassKg => "Lean body mass",
            Metric::Ffmi => "FFMI",
        }
    }

    /// Display unit; FFMI is unitless
    pub fn unit(&self) -> &'static str {
        match self {
            Metric::WeightKg | Metric::LeanBodyMassKg => "kg",
            Metric::BodyFatPct => "%",
            Metric::Ffmi => "",
        }
    }

    /// Decimal places used when presenting values and deltas
    pub fn display_decimals(&self) -> u32 {
        match self {
            Metric::Ffmi => 2,
            _ => 1,
        }
    }
}

/// A cleaned measurement with every required field typed and valid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementRecord {
    /// Calendar date of the measurement
    pub date: NaiveDate,
    /// Person identifier (exact-match grouping key)
    pub person: String,
    /// Height in centimeters; only present when the schema has a height column
    pub height_cm: Option<f64>,
    /// Body weight in kilograms
    pub weight_kg: f64,
    /// Body fat percentage (0-100)
    pub body_fat_pct: f64,
    /// Raw cells of every input column, aligned with the source header
    pub source_cells: Vec<String>,
}

/// Measurement plus metrics computed from the same row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedRecord {
    /// Source measurement
    pub measurement: MeasurementRecord,
    /// Lean body mass (kg, 1 decimal)
    pub lean_body_mass_kg: f64,
    /// Fat-free mass index (2 decimals); absent without height
    pub ffmi: Option<f64>,
}

impl DerivedRecord {
    /// Value of a tracked metric on this row
    pub fn metric(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::WeightKg => Some(self.measurement.weight_kg),
            Metric::BodyFatPct => Some(self.measurement.body_fat_pct),
            Metric::LeanBodyMassKg => Some(self.lean_body_mass_kg),
            Metric::Ffmi => self.ffmi,
        }
    }
}

/// Deltas against the previous chronological record of the same person
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MetricDiffs {
    pub weight_kg: f64,
    pub body_fat_pct: f64,
    pub lean_body_mass_kg: f64,
    /// Present whenever the row has an FFMI value
    pub ffmi: Option<f64>,
}

impl MetricDiffs {
    /// Diffs of a person's first record
    pub fn zero(has_ffmi: bool) -> Self {
        Self {
            ffmi: has_ffmi.then_some(0.0),
            ..Default::default()
        }
    }

    pub fn get(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::WeightKg => Some(self.weight_kg),
            Metric::BodyFatPct => Some(self.body_fat_pct),
            Metric::LeanBodyMassKg => Some(self.lean_body_mass_kg),
            Metric::Ffmi => self.ffmi,
        }
    }
}

/// One row of the processed table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedRecord {
    /// Source derived record
    pub derived: DerivedRecord,
    /// Deltas for each tracked metric
    pub diffs: MetricDiffs,
}

impl ProcessedRecord {
    pub fn date(&self) -> NaiveDate {
        self.derived.measurement.date
    }

    pub fn person(&self) -> &str {
        &self.derived.measurement.person
    }

    pub fn metric(&self, metric: Metric) -> Option<f64> {
        self.derived.metric(metric)
    }
}

/// A metric value paired with its delta
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricValue {
    pub value: f64,
    pub delta: f64,
}

/// Most recent measurement of a person, as shown in the summary widgets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatestSnapshot {
    pub date: NaiveDate,
    pub metrics: BTreeMap<Metric, MetricValue>,
}

impl LatestSnapshot {
    /// Date formatted the way the source sheet writes it (YYYY/MM/DD)
    pub fn date_label(&self) -> String {
        self.date.format("%Y/%m/%d").to_string()
    }

    pub fn get(&self, metric: Metric) -> Option<&MetricValue> {
        self.metrics.get(&metric)
    }
}

/// One entry of a person's history table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub date: NaiveDate,
    pub weight_kg: f64,
    pub body_fat_pct: f64,
    pub lean_body_mass_kg: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ffmi: Option<f64>,
}

/// Why the cleaner dropped a row
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    MissingDate,
    UnparseableDate,
    MissingPerson,
    InvalidHeight,
    NonPositiveHeight,
    InvalidWeight,
    InvalidBodyFat,
    MetricOutOfRange,
}

impl DropReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DropReason::MissingDate => "missing_date",
            DropReason::UnparseableDate => "unparseable_date",
            DropReason::MissingPerson => "missing_person",
            DropReason::InvalidHeight => "invalid_height",
            DropReason::NonPositiveHeight => "non_positive_height",
            DropReason::InvalidWeight => "invalid_weight",
            DropReason::InvalidBodyFat => "invalid_body_fat",
            DropReason::MetricOutOfRange => "metric_out_of_range",
        }
    }
}

/// Diagnostic counts produced by the cleaner
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CleaningReport {
    /// Rows in the raw table
    pub rows_read: usize,
    /// Rows that survived cleaning
    pub rows_retained: usize,
    /// Drop counts keyed by reason
    pub dropped: BTreeMap<DropReason, usize>,
}

impl CleaningReport {
    pub fn rows_dropped(&self) -> usize {
        self.dropped.values().sum()
    }

    pub(crate) fn record_drop(&mut self, reason: DropReason) {
        *self.dropped.entry(reason).or_insert(0) += 1;
    }
}

/// Report producer metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportProducer {
    pub name: String,
    pub version: String,
    pub instance_id: String,
    pub computed_at_utc: String,
}

/// Per-person report for the presentation layer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonReport {
    pub producer: ReportProducer,
    pub person: String,
    /// Most recent date across the whole table
    pub last_updated: Option<NaiveDate>,
    pub latest: LatestSnapshot,
    /// History, newest first
    pub series: Vec<SeriesPoint>,
}
