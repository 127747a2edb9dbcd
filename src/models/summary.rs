// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Derived aggregates over activity records.
//!
//! Nothing here is persisted: summaries and trend points are recomputed
//! from the current record set on every request.

use crate::models::{Activity, Category};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// An input to aggregation: anything carrying a precomputed emission.
pub trait EmissionRecord {
    fn category(&self) -> Category;
    fn activity_type(&self) -> &str;
    /// kg CO2
    fn co2_emission(&self) -> f64;
    /// When the activity happened.
    fn occurred_at(&self) -> DateTime<Utc>;
}

impl<R: EmissionRecord + ?Sized> EmissionRecord for &R {
    fn category(&self) -> Category {
        (**self).category()
    }
    fn activity_type(&self) -> &str {
        (**self).activity_type()
    }
    fn co2_emission(&self) -> f64 {
        (**self).co2_emission()
    }
    fn occurred_at(&self) -> DateTime<Utc> {
        (**self).occurred_at()
    }
}

impl EmissionRecord for Activity {
    fn category(&self) -> Category {
        self.category
    }
    fn activity_type(&self) -> &str {
        &self.activity_type
    }
    fn co2_emission(&self) -> f64 {
        self.co2_emission
    }
    fn occurred_at(&self) -> DateTime<Utc> {
        self.date
    }
}

/// Minimal record for callers that only hold the aggregation fields.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedEmission {
    pub category: Category,
    pub activity_type: String,
    pub co2_emission: f64,
    pub date: DateTime<Utc>,
}

impl EmissionRecord for RecordedEmission {
    fn category(&self) -> Category {
        self.category
    }
    fn activity_type(&self) -> &str {
        &self.activity_type
    }
    fn co2_emission(&self) -> f64 {
        self.co2_emission
    }
    fn occurred_at(&self) -> DateTime<Utc> {
        self.date
    }
}

/// Total emissions with per-category and per-activity-type subtotals (kg CO2,
/// 2 decimals).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmissionSummary {
    pub total: f64,
    pub by_category: BTreeMap<Category, f64>,
    /// Keyed by "{category}_{activityType}"
    pub by_activity_type: BTreeMap<String, f64>,
}

impl EmissionSummary {
    /// Subtotal for a category, 0 when absent.
    pub fn category_total(&self, category: Category) -> f64 {
        self.by_category.get(&category).copied().unwrap_or(0.0)
    }
}

/// Emissions for one calendar day (kg CO2, 2 decimals).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct DailyTrend {
    /// "YYYY-MM-DD"
    pub date: String,
    pub total: f64,
    pub transport: f64,
    pub energy: f64,
    pub food: f64,
    pub waste: f64,
    pub consumption: f64,
}

impl DailyTrend {
    pub fn new(date: String) -> Self {
        Self {
            date,
            ..Default::default()
        }
    }

    pub fn set_category(&mut self, category: Category, value: f64) {
        let slot = match category {
            Category::Transport => &mut self.transport,
            Category::Energy => &mut self.energy,
            Category::Food => &mut self.food,
            Category::Waste => &mut self.waste,
            Category::Consumption => &mut self.consumption,
        };
        *slot = value;
    }

    pub fn category(&self, category: Category) -> f64 {
        match category {
            Category::Transport => self.transport,
            Category::Energy => self.energy,
            Category::Food => self.food,
            Category::Waste => self.waste,
            Category::Consumption => self.consumption,
        }
    }
}
