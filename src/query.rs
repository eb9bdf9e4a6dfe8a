//! Read-only queries over the processed table
//!
//! These are the projections the presentation layer consumes: the person list,
//! a person's latest values with deltas, and their history.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use crate::error::TrendError;
use crate::features::round_to;
use crate::schema::SchemaMapping;
use crate::types::{
    CleaningReport, LatestSnapshot, Metric, MetricValue, ProcessedRecord, SeriesPoint,
};

/// Fully processed measurement table. Immutable once built.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessedTable {
    mapping: SchemaMapping,
    headers: Vec<String>,
    records: Vec<ProcessedRecord>,
    report: CleaningReport,
}

impl ProcessedTable {
    pub(crate) fn new(
        mapping: SchemaMapping,
        headers: Vec<String>,
        records: Vec<ProcessedRecord>,
        report: CleaningReport,
    ) -> Self {
        Self {
            mapping,
            headers,
            records,
            report,
        }
    }

    /// Mapping the table was built with
    pub fn mapping(&self) -> &SchemaMapping {
        &self.mapping
    }

    /// Source header, in input order
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// All records, ordered by person then date
    pub fn records(&self) -> &[ProcessedRecord] {
        &self.records
    }

    pub fn cleaning_report(&self) -> &CleaningReport {
        &self.report
    }

    /// Metrics this table carries (FFMI only with height)
    pub fn metrics(&self) -> Vec<Metric> {
        Metric::ALL
            .into_iter()
            .filter(|m| *m != Metric::Ffmi || self.mapping.has_height())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Distinct person identifiers
    pub fn list_persons(&self) -> BTreeSet<String> {
        self.records.iter().map(|r| r.person().to_string()).collect()
    }

    /// Most recent measurement date in the table
    pub fn latest_date(&self) -> Option<NaiveDate> {
        self.records.iter().map(ProcessedRecord::date).max()
    }

    /// A person's records in chronological order (same-date rows in input order)
    fn person_records<'a>(&'a self, person: &'a str) -> impl Iterator<Item = &'a ProcessedRecord> {
        self.records.iter().filter(move |r| r.person() == person)
    }

    /// Latest record of a person with display-rounded values and deltas.
    ///
    /// Same-date ties resolve to the last row in input order, which is also the
    /// end of the person's differencing chain.
    pub fn get_latest(&self, person: &str) -> Result<LatestSnapshot, TrendError> {
        let latest = self
            .person_records(person)
            .fold(None::<&ProcessedRecord>, |best, record| match best {
                Some(b) if b.date() > record.date() => Some(b),
                _ => Some(record),
            })
            .ok_or_else(|| TrendError::NotFound(person.to_string()))?;

        let metrics: BTreeMap<Metric, MetricValue> = Metric::ALL
            .into_iter()
            .filter_map(|metric| {
                let value = latest.metric(metric)?;
                let delta = latest.diffs.get(metric)?;
                let decimals = metric.display_decimals();
                Some((
                    metric,
                    MetricValue {
                        value: round_to(value, decimals),
                        delta: round_to(delta, decimals),
                    },
                ))
            })
            .collect();

        Ok(LatestSnapshot {
            date: latest.date(),
            metrics,
        })
    }

    /// A person's history, newest first. Empty if the person has no rows.
    pub fn get_series(&self, person: &str) -> Vec<SeriesPoint> {
        let mut series: Vec<SeriesPoint> = self
            .person_records(person)
            .map(|r| SeriesPoint {
                date: r.date(),
                weight_kg: r.derived.measurement.weight_kg,
                body_fat_pct: r.derived.measurement.body_fat_pct,
                lean_body_mass_kg: r.derived.lean_body_mass_kg,
                ffmi: r.derived.ffmi,
            })
            .collect();
        series.reverse();
        series
    }

    /// `(date, value)` points of one metric, oldest first, for trend charts
    pub fn metric_series(&self, person: &str, metric: Metric) -> Vec<(NaiveDate, f64)> {
        self.person_records(person)
            .filter_map(|r| r.metric(metric).map(|v| (r.date(), v)))
            .collect()
    }
}
