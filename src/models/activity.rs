// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Activity categories and the stored activity record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Top-level activity grouping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum Category {
    Transport,
    Energy,
    Food,
    Waste,
    Consumption,
}

impl Category {
    /// All categories in display order.
    pub const ALL: [Category; 5] = [
        Category::Transport,
        Category::Energy,
        Category::Food,
        Category::Waste,
        Category::Consumption,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Transport => "transport",
            Category::Energy => "energy",
            Category::Food => "food",
            Category::Waste => "waste",
            Category::Consumption => "consumption",
        }
    }

    /// Natural measure that emission factors in this category are expressed in.
    pub fn unit(self) -> &'static str {
        match self {
            Category::Transport => "km",
            Category::Energy => "kWh",
            Category::Food => "meal",
            Category::Waste => "kg",
            Category::Consumption => "item",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown category: {0}")]
pub struct ParseCategoryError(pub String);

impl FromStr for Category {
    type Err = ParseCategoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| ParseCategoryError(s.to_string()))
    }
}

/// Stored activity record in Firestore.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    /// Document ID
    pub id: String,
    /// Owning user ID
    pub user_id: String,
    pub category: Category,
    /// Key into the emission factor table (e.g. "car_petrol")
    pub activity_type: String,
    /// Quantity in the category's natural measure
    pub value: f64,
    /// Unit as reported by the client (informational)
    pub unit: String,
    /// kg CO2, derived from value and the emission factor
    pub co2_emission: f64,
    /// When the activity happened
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub notes: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}
