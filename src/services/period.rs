// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Time windows for summaries and trends.
//!
//! Periods are fixed-length rolling windows ending at the query time: a
//! "month" is the last 30 days, not a calendar month.

use crate::models::{Category, DailyTrend, EmissionRecord};
use crate::services::calculator::{round_to, stable_sum, validated_emission, CalcError, SUMMARY_PRECISION};
use crate::time_utils::iso_date;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::str::FromStr;

/// Summary period.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Day,
    Week,
    #[default]
    Month,
    Year,
}

impl Period {
    /// Parse a period name, falling back to `Month` for anything else.
    pub fn parse_or_default(raw: Option<&str>) -> Self {
        raw.and_then(|s| s.parse().ok()).unwrap_or_default()
    }

    pub fn length(self) -> Duration {
        match self {
            Period::Day => Duration::hours(24),
            Period::Week => Duration::days(7),
            Period::Month => Duration::days(30),
            Period::Year => Duration::days(365),
        }
    }
}

impl FromStr for Period {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "day" => Ok(Period::Day),
            "week" => Ok(Period::Week),
            "month" => Ok(Period::Month),
            "year" => Ok(Period::Year),
            _ => Err(()),
        }
    }
}

/// A contiguous time range `[start, end]` or `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    end_inclusive: bool,
}

impl PeriodWindow {
    /// `[now - length, now]`
    pub fn current(period: Period, now: DateTime<Utc>) -> Self {
        Self {
            start: now - period.length(),
            end: now,
            end_inclusive: true,
        }
    }

    /// `[now - 2*length, now - length)`: the window immediately before
    /// [`PeriodWindow::current`], sharing its start as an open end.
    pub fn previous(period: Period, now: DateTime<Utc>) -> Self {
        let length = period.length();
        Self {
            start: now - length - length,
            end: now - length,
            end_inclusive: false,
        }
    }

    pub fn for_period(period: Period, now: DateTime<Utc>, previous: bool) -> Self {
        if previous {
            Self::previous(period, now)
        } else {
            Self::current(period, now)
        }
    }

    /// `[now - days, now]`
    pub fn trailing_days(days: u32, now: DateTime<Utc>) -> Self {
        Self {
            start: now - Duration::days(i64::from(days)),
            end: now,
            end_inclusive: true,
        }
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        if at < self.start {
            return false;
        }
        if self.end_inclusive {
            at <= self.end
        } else {
            at < self.end
        }
    }

    /// Records whose occurrence falls inside this window.
    pub fn select<'a, R: EmissionRecord>(&self, records: &'a [R]) -> Vec<&'a R> {
        records
            .iter()
            .filter(|r| self.contains(r.occurred_at()))
            .collect()
    }
}

/// Group records in `window` by UTC calendar date.
///
/// Returns one point per date that has records, ascending by date. Every
/// category is present on each point (0 when nothing was logged).
pub fn daily_trends<R: EmissionRecord>(
    records: &[R],
    window: &PeriodWindow,
) -> Result<Vec<DailyTrend>, CalcError> {
    let mut days: BTreeMap<String, (Vec<f64>, BTreeMap<Category, Vec<f64>>)> = BTreeMap::new();

    for (index, record) in records.iter().enumerate() {
        let at = record.occurred_at();
        if !window.contains(at) {
            continue;
        }
        let emission = validated_emission(index, record)?;

        let (total, by_category) = days.entry(iso_date(at)).or_default();
        total.push(emission);
        by_category
            .entry(record.category())
            .or_default()
            .push(emission);
    }

    Ok(days
        .into_iter()
        .map(|(date, (total, by_category))| {
            let mut point = DailyTrend::new(date);
            point.total = round_to(stable_sum(total), SUMMARY_PRECISION);
            for (category, values) in by_category {
                point.set_category(category, round_to(stable_sum(values), SUMMARY_PRECISION));
            }
            point
        })
        .collect())
}
