//! Derived metric computation
//!
//! This module derives secondary body-composition metrics from one cleaned row:
//! - Lean body mass (weight minus estimated fat mass)
//! - Fat-free mass index (lean mass over height squared)
//!
//! Derivation never looks at other rows.

use crate::types::{DerivedRecord, MeasurementRecord};

/// Decimal places kept for lean body mass
pub const LEAN_MASS_DECIMALS: u32 = 1;
/// Decimal places kept for FFMI
pub const FFMI_DECIMALS: u32 = 2;

/// Metric deriver for computing derived records
pub struct MetricDeriver;

impl MetricDeriver {
    /// Derive metrics for one measurement
    pub fn derive(measurement: MeasurementRecord) -> DerivedRecord {
        let lean_body_mass_kg =
            compute_lean_body_mass(measurement.weight_kg, measurement.body_fat_pct);
        let ffmi = measurement
            .height_cm
            .and_then(|height| compute_ffmi(lean_body_mass_kg, height));

        DerivedRecord {
            measurement,
            lean_body_mass_kg,
            ffmi,
        }
    }
}

/// Lean body mass: weight * (1 - body fat fraction), 1 decimal
pub fn compute_lean_body_mass(weight_kg: f64, body_fat_pct: f64) -> f64 {
    round_to(weight_kg * (1.0 - body_fat_pct / 100.0), LEAN_MASS_DECIMALS)
}

/// FFMI: lean mass / height(m)^2, 2 decimals. Undefined for non-positive height.
pub fn compute_ffmi(lean_body_mass_kg: f64, height_cm: f64) -> Option<f64> {
    if height_cm <= 0.0 {
        return None;
    }
    let height_m = height_cm / 100.0;
    Some(round_to(lean_body_mass_kg / (height_m * height_m), FFMI_DECIMALS))
}

/// Round to `decimals` places, halves away from zero
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}
