// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Emission calculator.
//!
//! Pure functions over an injected, read-only factor table:
//! - single-activity conversion (quantity -> kg CO2)
//! - factor lookup and activity type listings for client menus
//! - aggregation of stored records into summaries

use crate::models::{
    ActivityTypeInfo, Category, EmissionFactors, EmissionRecord, EmissionResult,
    EmissionSummary, CO2_UNIT,
};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Decimal places kept on a single computed emission.
const EMISSION_PRECISION: i32 = 3;
/// Decimal places kept on aggregated totals.
pub const SUMMARY_PRECISION: i32 = 2;

/// Calculation failures. All of them are caller errors, never retryable.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CalcError {
    #[error("Unknown category: {0}")]
    UnknownCategory(String),

    #[error("Unknown activity type: {activity_type} in category {category}")]
    UnknownActivityType {
        category: String,
        activity_type: String,
    },

    #[error("Invalid value {0}: quantity must be a finite number >= 0")]
    InvalidValue(f64),

    #[error("Emission for value {value} with factor {factor} is out of range")]
    EmissionOutOfRange { value: f64, factor: f64 },

    #[error("Invalid record at index {index}: {reason}")]
    InvalidRecord { index: usize, reason: String },
}

/// Converts activities into emissions using a fixed factor table.
///
/// Cloning is cheap; the table is shared.
#[derive(Debug, Clone)]
pub struct EmissionCalculator {
    factors: Arc<EmissionFactors>,
}

impl EmissionCalculator {
    pub fn new(factors: EmissionFactors) -> Self {
        Self {
            factors: Arc::new(factors),
        }
    }

    pub fn factors(&self) -> &EmissionFactors {
        &self.factors
    }

    /// Compute the emission for one activity.
    ///
    /// `unit` is passed through unchanged; it is not checked against the
    /// category's canonical unit.
    pub fn calculate_emission(
        &self,
        category: &str,
        activity_type: &str,
        value: f64,
        unit: &str,
    ) -> Result<EmissionResult, CalcError> {
        let parsed: Category = category
            .parse()
            .map_err(|_| CalcError::UnknownCategory(category.to_string()))?;

        let types = self
            .factors
            .types(parsed)
            .ok_or_else(|| CalcError::UnknownCategory(category.to_string()))?;

        let factor = types
            .iter()
            .find(|(name, _)| name == activity_type)
            .map(|(_, factor)| *factor)
            .ok_or_else(|| CalcError::UnknownActivityType {
                category: category.to_string(),
                activity_type: activity_type.to_string(),
            })?;

        if !value.is_finite() || value < 0.0 {
            return Err(CalcError::InvalidValue(value));
        }

        let raw = value * factor;
        if !raw.is_finite() {
            return Err(CalcError::EmissionOutOfRange { value, factor });
        }

        Ok(EmissionResult {
            category: parsed,
            activity_type: activity_type.to_string(),
            value,
            unit: unit.to_string(),
            emission_factor: factor,
            co2_emission: round_to(raw, EMISSION_PRECISION),
            co2_unit: CO2_UNIT.to_string(),
        })
    }

    /// Look up a factor. Absence is not an error here.
    pub fn emission_factor(&self, category: &str, activity_type: &str) -> Option<f64> {
        let category: Category = category.parse().ok()?;
        self.factors.factor(category, activity_type)
    }

    /// Every category with its activity types, for selection menus.
    ///
    /// All categories are listed; one missing from the table maps to an
    /// empty list.
    pub fn all_activity_types(&self) -> BTreeMap<Category, Vec<ActivityTypeInfo>> {
        Category::ALL
            .into_iter()
            .map(|category| {
                let types = self
                    .factors
                    .types(category)
                    .map(|types| {
                        types
                            .iter()
                            .map(|(name, factor)| ActivityTypeInfo {
                                activity_type: name.clone(),
                                factor: *factor,
                                unit: category.unit().to_string(),
                            })
                            .collect()
                    })
                    .unwrap_or_default();
                (category, types)
            })
            .collect()
    }
}

/// Fold records into an [`EmissionSummary`].
///
/// Rounding happens once, after all values are summed. Values are summed in
/// sorted order so any permutation of the input yields the same result.
pub fn calculate_total_emissions<R: EmissionRecord>(
    records: &[R],
) -> Result<EmissionSummary, CalcError> {
    let mut all = Vec::with_capacity(records.len());
    let mut by_category: BTreeMap<_, Vec<f64>> = BTreeMap::new();
    let mut by_activity_type: BTreeMap<String, Vec<f64>> = BTreeMap::new();

    for (index, record) in records.iter().enumerate() {
        let emission = validated_emission(index, record)?;

        all.push(emission);
        by_category
            .entry(record.category())
            .or_default()
            .push(emission);
        by_activity_type
            .entry(format!("{}_{}", record.category(), record.activity_type()))
            .or_default()
            .push(emission);
    }

    Ok(EmissionSummary {
        total: round_to(stable_sum(all), SUMMARY_PRECISION),
        by_category: by_category
            .into_iter()
            .map(|(k, v)| (k, round_to(stable_sum(v), SUMMARY_PRECISION)))
            .collect(),
        by_activity_type: by_activity_type
            .into_iter()
            .map(|(k, v)| (k, round_to(stable_sum(v), SUMMARY_PRECISION)))
            .collect(),
    })
}

/// Reject records whose emission would poison a sum.
pub(crate) fn validated_emission<R: EmissionRecord>(
    index: usize,
    record: &R,
) -> Result<f64, CalcError> {
    let emission = record.co2_emission();
    if !emission.is_finite() {
        return Err(CalcError::InvalidRecord {
            index,
            reason: format!("co2Emission is not a finite number ({})", emission),
        });
    }
    if emission < 0.0 {
        return Err(CalcError::InvalidRecord {
            index,
            reason: format!("co2Emission is negative ({})", emission),
        });
    }
    if record.activity_type().is_empty() {
        return Err(CalcError::InvalidRecord {
            index,
            reason: "activityType is empty".to_string(),
        });
    }
    Ok(emission)
}

/// Order-independent floating point sum.
pub(crate) fn stable_sum(mut values: Vec<f64>) -> f64 {
    values.sort_by(f64::total_cmp);
    values.into_iter().sum()
}

/// Round half away from zero to `places` decimals.
///
/// Values too large to scale are returned unchanged; they have no
/// fractional digits left to round.
pub fn round_to(value: f64, places: i32) -> f64 {
    let scale = 10f64.powi(places);
    let scaled = value * scale;
    if !scaled.is_finite() {
        return value;
    }
    scaled.round() / scale
}
