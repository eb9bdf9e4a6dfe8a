//! Per-person temporal differencing
//!
//! Rows are ordered by date (stable, so same-day rows keep input order) and
//! walked once. A map from person to the metrics of their last-seen record
//! supplies the previous value for each delta.

use std::collections::HashMap;

use crate::types::{DerivedRecord, MetricDiffs, ProcessedRecord};

/// Metrics remembered for the previous record of a person
#[derive(Debug, Clone, Copy)]
struct LastSeen {
    weight_kg: f64,
    body_fat_pct: f64,
    lean_body_mass_kg: f64,
    ffmi: Option<f64>,
}

impl LastSeen {
    fn of(record: &DerivedRecord) -> Self {
        Self {
            weight_kg: record.measurement.weight_kg,
            body_fat_pct: record.measurement.body_fat_pct,
            lean_body_mass_kg: record.lean_body_mass_kg,
            ffmi: record.ffmi,
        }
    }
}

/// Differencer for augmenting derived records with chronological deltas
pub struct TemporalDifferencer;

impl TemporalDifferencer {
    /// Compute diffs for every record.
    ///
    /// Returns one record per input, ordered by person, then date, then input
    /// position.
    pub fn difference(records: Vec<DerivedRecord>) -> Vec<ProcessedRecord> {
        let mut ordered = records;
        // Vec::sort_by is stable: same-date rows keep their input order
        ordered.sort_by(|a, b| a.measurement.date.cmp(&b.measurement.date));

        let mut last_seen: HashMap<String, LastSeen> = HashMap::new();
        let mut processed = Vec::with_capacity(ordered.len());

        for record in ordered {
            let current = LastSeen::of(&record);
            let diffs = match last_seen.get(&record.measurement.person) {
                Some(previous) => compute_diffs(&current, previous),
                None => MetricDiffs::zero(current.ffmi.is_some()),
            };
            last_seen.insert(record.measurement.person.clone(), current);

            processed.push(ProcessedRecord {
                derived: record,
                diffs,
            });
        }

        processed.sort_by(|a, b| a.person().cmp(b.person()));
        processed
    }
}

fn compute_diffs(current: &LastSeen, previous: &LastSeen) -> MetricDiffs {
    MetricDiffs {
        weight_kg: current.weight_kg - previous.weight_kg,
        body_fat_pct: current.body_fat_pct - previous.body_fat_pct,
        lean_body_mass_kg: current.lean_body_mass_kg - previous.lean_body_mass_kg,
        ffmi: current
            .ffmi
            .map(|ffmi| previous.ffmi.map_or(0.0, |prev| ffmi - prev)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::MetricDeriver;
    use crate::types::MeasurementRecord;
    use chrono::NaiveDate;

    fn make_derived(person: &str, day: u32, weight_kg: f64, body_fat_pct: f64) -> DerivedRecord {
        MetricDeriver::derive(MeasurementRecord {
            date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            person: person.to_string(),
            height_cm: Some(170.0),
            weight_kg,
            body_fat_pct,
            source_cells: vec![format!("{person}-{day}-{weight_kg}")],
        })
    }

    #[test]
    fn test_first_record_has_zero_diffs() {
        let processed = TemporalDifferencer::difference(vec![make_derived("Taro", 1, 70.0, 20.0)]);

        assert_eq!(processed.len(), 1);
        let diffs = processed[0].diffs;
        assert_eq!(diffs.weight_kg, 0.0);
        assert_eq!(diffs.body_fat_pct, 0.0);
        assert_eq!(diffs.lean_body_mass_kg, 0.0);
        assert_eq!(diffs.ffmi, Some(0.0));
    }

    #[test]
    fn test_diffs_follow_date_order_not_input_order() {
        let processed = TemporalDifferencer::difference(vec![
            make_derived("Taro", 8, 69.0, 19.0),
            make_derived("Taro", 1, 70.0, 20.0),
        ]);

        assert_eq!(processed[0].date().to_string(), "2024-01-01");
        assert_eq!(processed[0].diffs.weight_kg, 0.0);

        let second = &processed[1];
        assert_eq!(second.diffs.weight_kg, 69.0 - 70.0);
        assert_eq!(second.diffs.body_fat_pct, 19.0 - 20.0);
        assert_eq!(second.diffs.lean_body_mass_kg, 55.9 - 56.0);
        assert!((second.diffs.lean_body_mass_kg + 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_groups_are_independent() {
        let processed = TemporalDifferencer::difference(vec![
            make_derived("Taro", 1, 70.0, 20.0),
            make_derived("Hanako", 2, 50.0, 25.0),
            make_derived("Taro", 3, 71.0, 20.0),
            make_derived("Hanako", 4, 49.0, 25.0),
        ]);

        let persons: Vec<&str> = processed.iter().map(|r| r.person()).collect();
        assert_eq!(persons, vec!["Hanako", "Hanako", "Taro", "Taro"]);

        assert_eq!(processed[0].diffs.weight_kg, 0.0);
        assert_eq!(processed[1].diffs.weight_kg, -1.0);
        assert_eq!(processed[2].diffs.weight_kg, 0.0);
        assert_eq!(processed[3].diffs.weight_kg, 1.0);
    }

    #[test]
    fn test_same_date_keeps_input_order() {
        let processed = TemporalDifferencer::difference(vec![
            make_derived("Taro", 5, 70.0, 20.0),
            make_derived("Taro", 5, 71.0, 20.0),
            make_derived("Taro", 5, 69.0, 20.0),
        ]);

        let weights: Vec<f64> = processed
            .iter()
            .map(|r| r.derived.measurement.weight_kg)
            .collect();
        assert_eq!(weights, vec![70.0, 71.0, 69.0]);
        assert_eq!(processed[1].diffs.weight_kg, 1.0);
        assert_eq!(processed[2].diffs.weight_kg, -2.0);
    }

    #[test]
    fn test_without_height_ffmi_diff_is_absent() {
        let mut record = make_derived("Taro", 1, 70.0, 20.0);
        record.ffmi = None;
        let processed = TemporalDifferencer::difference(vec![record]);
        assert_eq!(processed[0].diffs.ffmi, None);
    }

    #[test]
    fn test_empty_input() {
        assert!(TemporalDifferencer::difference(Vec::new()).is_empty());
    }
}
