// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Emission factor table and per-activity calculation results.

use crate::models::Category;
use serde::de::{Deserializer, MapAccess, Visitor};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Unit of every computed emission.
pub const CO2_UNIT: &str = "kg";

/// Immutable mapping of category -> activity type -> kg CO2 per unit.
///
/// Categories iterate in [`Category`] order. Activity types keep their
/// declaration order so client menus list them the way the table was written.
#[derive(Debug, Clone, PartialEq)]
pub struct EmissionFactors {
    table: BTreeMap<Category, Vec<(String, f64)>>,
}

impl EmissionFactors {
    /// The default factor table.
    pub fn builtin() -> Self {
        let mut table = BTreeMap::new();
        table.insert(
            Category::Transport,
            entries(&[
                ("car_petrol", 0.12),
                ("car_diesel", 0.15),
                ("car_electric", 0.05),
                ("bus", 0.05),
                ("train", 0.04),
                ("metro", 0.03),
                ("motorcycle", 0.08),
                ("bicycle", 0.0),
                ("walking", 0.0),
                ("flight_short", 0.255), // < 1500 km
                ("flight_long", 0.195),  // > 1500 km
            ]),
        );
        table.insert(
            Category::Energy,
            entries(&[
                ("electricity", 0.5),
                ("natural_gas", 0.185),
                ("heating_oil", 0.25),
                ("lpg", 0.214),
                ("coal", 0.34),
            ]),
        );
        table.insert(
            Category::Food,
            entries(&[
                ("beef", 6.0),
                ("lamb", 5.5),
                ("pork", 3.5),
                ("chicken", 2.0),
                ("fish", 1.5),
                ("eggs", 1.2),
                ("dairy", 1.0),
                ("vegetarian", 1.5),
                ("vegan", 0.9),
            ]),
        );
        table.insert(
            Category::Waste,
            entries(&[
                ("general_waste", 0.5),
                ("recycling", 0.1),
                ("composting", 0.05),
            ]),
        );
        table.insert(
            Category::Consumption,
            entries(&[
                ("clothing", 15.0),
                ("electronics", 50.0),
                ("furniture", 100.0),
            ]),
        );
        Self { table }
    }

    /// Load a factor table from a JSON file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, FactorTableError> {
        let json_data = fs::read_to_string(path.as_ref())
            .map_err(|e| FactorTableError::IoError(e.to_string()))?;
        Self::from_json(&json_data)
    }

    /// Load a factor table from a JSON object of the form
    /// `{"transport": {"car_petrol": 0.12, ...}, ...}`.
    pub fn from_json(json_data: &str) -> Result<Self, FactorTableError> {
        let raw: BTreeMap<String, OrderedFactors> = serde_json::from_str(json_data)
            .map_err(|e| FactorTableError::ParseError(e.to_string()))?;

        let mut table = BTreeMap::new();
        for (category_name, OrderedFactors(types)) in raw {
            let category: Category = category_name
                .parse()
                .map_err(|_| FactorTableError::UnknownCategory(category_name.clone()))?;

            if let Some((activity_type, factor)) =
                types.iter().find(|(_, f)| !f.is_finite() || *f < 0.0)
            {
                return Err(FactorTableError::InvalidFactor {
                    category,
                    activity_type: activity_type.clone(),
                    factor: *factor,
                });
            }

            table.insert(category, types);
        }

        tracing::info!(categories = table.len(), "Loaded emission factors");
        Ok(Self { table })
    }

    /// Factor for a (category, activity type) pair.
    pub fn factor(&self, category: Category, activity_type: &str) -> Option<f64> {
        self.table
            .get(&category)?
            .iter()
            .find(|(name, _)| name == activity_type)
            .map(|(_, factor)| *factor)
    }

    /// Activity types for a category, in declaration order.
    pub fn types(&self, category: Category) -> Option<&[(String, f64)]> {
        self.table.get(&category).map(Vec::as_slice)
    }

    /// Total number of activity types across all categories.
    pub fn len(&self) -> usize {
        self.table.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for EmissionFactors {
    fn default() -> Self {
        Self::builtin()
    }
}

fn entries(pairs: &[(&str, f64)]) -> Vec<(String, f64)> {
    pairs
        .iter()
        .map(|(name, factor)| (name.to_string(), *factor))
        .collect()
}

/// A JSON object of `type -> factor`, kept in document order.
struct OrderedFactors(Vec<(String, f64)>);

impl<'de> Deserialize<'de> for OrderedFactors {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct FactorsVisitor;

        impl<'de> Visitor<'de> for FactorsVisitor {
            type Value = OrderedFactors;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("an object mapping activity types to factors")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut entries: Vec<(String, f64)> = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((name, factor)) = map.next_entry::<String, f64>()? {
                    if entries.iter().any(|(existing, _)| *existing == name) {
                        return Err(serde::de::Error::custom(format!(
                            "duplicate activity type `{name}`"
                        )));
                    }
                    entries.push((name, factor));
                }
                Ok(OrderedFactors(entries))
            }
        }

        deserializer.deserialize_map(FactorsVisitor)
    }
}

/// Errors from loading a factor table.
#[derive(Debug, thiserror::Error)]
pub enum FactorTableError {
    #[error("Failed to read file: {0}")]
    IoError(String),

    #[error("Failed to parse factor table: {0}")]
    ParseError(String),

    #[error("Unknown category in factor table: {0}")]
    UnknownCategory(String),

    #[error("Invalid factor {factor} for {category}/{activity_type}: must be finite and >= 0")]
    InvalidFactor {
        category: Category,
        activity_type: String,
        factor: f64,
    },
}

/// Result of converting one activity into an emission.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmissionResult {
    pub category: Category,
    pub activity_type: String,
    pub value: f64,
    pub unit: String,
    pub emission_factor: f64,
    pub co2_emission: f64,
    pub co2_unit: String,
}

/// One selectable activity type, for client menus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ActivityTypeInfo {
    #[serde(rename = "type")]
    pub activity_type: String,
    pub factor: f64,
    pub unit: String,
}
