// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Activity logging, listing and aggregation routes.
//!
//! Everything is filtered in memory after fetching the user's activities,
//! so Firestore only needs the single-field `userId` index.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{Activity, ActivityTypeInfo, Category, DailyTrend, EmissionSummary};
use crate::services::{
    calculate_total_emissions, daily_trends, EmissionCalculator, Period, PeriodWindow,
};
use crate::time_utils::{format_utc_rfc3339, parse_client_date};
use crate::AppState;
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    routing::{get, put},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use validator::Validate;

const DEFAULT_LIST_LIMIT: usize = 50;
const MAX_LIST_LIMIT: usize = 500;
const DEFAULT_TREND_DAYS: u32 = 30;
const MAX_TREND_DAYS: u32 = 365;

/// Activity routes (require authentication via JWT).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/activities/types", get(get_activity_types))
        .route("/api/activities/summary", get(get_summary))
        .route("/api/activities/trends", get(get_trends))
        .route(
            "/api/activities",
            get(list_activities).post(create_activity),
        )
        .route(
            "/api/activities/{id}",
            put(update_activity).delete(delete_activity),
        )
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ActivityResponse {
    pub message: String,
    pub activity: Activity,
}

fn parse_date_field(field: &str, raw: &str) -> Result<DateTime<Utc>> {
    parse_client_date(raw).ok_or_else(|| AppError::BadRequest(format!("Invalid {field}: {raw}")))
}

// ─── Activity Types ──────────────────────────────────────────

async fn get_activity_types(
    State(state): State<Arc<AppState>>,
) -> Json<BTreeMap<Category, Vec<ActivityTypeInfo>>> {
    Json(state.calculator.all_activity_types())
}

// ─── Create ──────────────────────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateActivityRequest {
    pub category: String,
    pub activity_type: String,
    pub value: f64,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[validate(length(max = 500, message = "Notes must be at most 500 characters"))]
    #[serde(default)]
    pub notes: Option<String>,
}

/// Build a new activity from a request, computing its emission.
///
/// A missing or blank unit defaults to the category's canonical unit.
pub fn build_activity(
    calculator: &EmissionCalculator,
    user_id: &str,
    req: CreateActivityRequest,
    now: DateTime<Utc>,
) -> Result<Activity> {
    let requested_unit = req.unit.filter(|u| !u.trim().is_empty());
    let result = calculator.calculate_emission(
        &req.category,
        &req.activity_type,
        req.value,
        requested_unit.as_deref().unwrap_or(""),
    )?;

    let canonical = result.category.unit();
    let unit = match requested_unit {
        Some(unit) => {
            if unit != canonical {
                tracing::warn!(
                    category = %result.category,
                    unit = %unit,
                    expected = canonical,
                    "Activity unit differs from factor table unit"
                );
            }
            unit
        }
        None => canonical.to_string(),
    };

    let date = match req.date.as_deref() {
        Some(raw) => parse_date_field("date", raw)?,
        None => now,
    };

    Ok(Activity {
        id: uuid::Uuid::now_v7().to_string(),
        user_id: user_id.to_string(),
        category: result.category,
        activity_type: result.activity_type,
        value: result.value,
        unit,
        co2_emission: result.co2_emission,
        date,
        notes: req.notes.unwrap_or_default(),
        created_at: now,
        updated_at: None,
    })
}

async fn create_activity(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    payload: std::result::Result<Json<CreateActivityRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ActivityResponse>)> {
    let Json(req) = payload?;
    req.validate()?;

    let activity = build_activity(&state.calculator, &user.user_id, req, Utc::now())?;
    state.db.create_activity(&activity).await?;

    Ok((
        StatusCode::CREATED,
        Json(ActivityResponse {
            message: "Activity logged successfully".to_string(),
            activity,
        }),
    ))
}

// ─── List ────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub category: Option<String>,
    pub limit: Option<usize>,
}

/// Parsed listing filter. Bounds are inclusive.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivityFilter {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub category: Option<Category>,
    pub limit: usize,
}

impl ActivityFilter {
    pub fn from_query(query: &ListQuery) -> Result<Self> {
        let start = query
            .start_date
            .as_deref()
            .map(|raw| parse_date_field("startDate", raw))
            .transpose()?;
        let end = query
            .end_date
            .as_deref()
            .map(|raw| parse_date_field("endDate", raw))
            .transpose()?;
        let category = query
            .category
            .as_deref()
            .map(|raw| {
                raw.parse::<Category>()
                    .map_err(|e| AppError::BadRequest(e.to_string()))
            })
            .transpose()?;

        Ok(Self {
            start,
            end,
            category,
            limit: query.limit.unwrap_or(DEFAULT_LIST_LIMIT).min(MAX_LIST_LIMIT),
        })
    }

    fn matches(&self, activity: &Activity) -> bool {
        self.start.is_none_or(|start| activity.date >= start)
            && self.end.is_none_or(|end| activity.date <= end)
            && self.category.is_none_or(|c| activity.category == c)
    }

    /// Filter, sort newest first, and truncate to the limit.
    pub fn apply(&self, activities: Vec<Activity>) -> Vec<Activity> {
        let mut selected: Vec<Activity> =
            activities.into_iter().filter(|a| self.matches(a)).collect();
        selected.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| b.id.cmp(&a.id)));
        selected.truncate(self.limit);
        selected
    }
}

async fn list_activities(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    query: std::result::Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<Vec<Activity>>> {
    let Query(query) = query?;
    let filter = ActivityFilter::from_query(&query)?;

    let activities = state.db.get_activities_for_user(&user.user_id).await?;
    Ok(Json(filter.apply(activities)))
}

// ─── Summary ─────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct SummaryQuery {
    pub period: Option<String>,
    pub previous: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryResponse {
    pub period: Period,
    pub is_previous: bool,
    pub start_date: String,
    pub end_date: String,
    pub activity_count: usize,
    #[serde(flatten)]
    pub summary: EmissionSummary,
}

/// Summarize the activities falling in the requested window.
pub fn summarize(
    activities: &[Activity],
    period: Period,
    is_previous: bool,
    now: DateTime<Utc>,
) -> Result<SummaryResponse> {
    let window = PeriodWindow::for_period(period, now, is_previous);
    let selected = window.select(activities);
    let summary = calculate_total_emissions(&selected)?;

    Ok(SummaryResponse {
        period,
        is_previous,
        start_date: format_utc_rfc3339(window.start),
        end_date: format_utc_rfc3339(window.end),
        activity_count: selected.len(),
        summary,
    })
}

async fn get_summary(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    query: std::result::Result<Query<SummaryQuery>, QueryRejection>,
) -> Result<Json<SummaryResponse>> {
    let Query(query) = query?;
    let period = Period::parse_or_default(query.period.as_deref());
    let is_previous = query.previous.as_deref() == Some("true");

    let activities = state.db.get_activities_for_user(&user.user_id).await?;
    Ok(Json(summarize(&activities, period, is_previous, Utc::now())?))
}

// ─── Trends ──────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct TrendsQuery {
    pub days: Option<u32>,
}

fn trend_days(query: &TrendsQuery) -> Result<u32> {
    let days = query.days.unwrap_or(DEFAULT_TREND_DAYS);
    if !(1..=MAX_TREND_DAYS).contains(&days) {
        return Err(AppError::BadRequest(format!(
            "days must be between 1 and {MAX_TREND_DAYS}"
        )));
    }
    Ok(days)
}

async fn get_trends(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    query: std::result::Result<Query<TrendsQuery>, QueryRejection>,
) -> Result<Json<Vec<DailyTrend>>> {
    let Query(query) = query?;
    let days = trend_days(&query)?;

    let activities = state.db.get_activities_for_user(&user.user_id).await?;
    let window = PeriodWindow::trailing_days(days, Utc::now());
    Ok(Json(daily_trends(&activities, &window)?))
}

// ─── Update / Delete ─────────────────────────────────────────

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateActivityRequest {
    pub category: Option<String>,
    pub activity_type: Option<String>,
    pub value: Option<f64>,
    pub unit: Option<String>,
    pub date: Option<String>,
    #[validate(length(max = 500, message = "Notes must be at most 500 characters"))]
    pub notes: Option<String>,
}

impl UpdateActivityRequest {
    /// Checks that need no stored state.
    pub fn precheck(&self) -> Result<()> {
        if let Some(category) = self.category.as_deref() {
            category
                .parse::<Category>()
                .map_err(|e| AppError::BadRequest(e.to_string()))?;
        }
        if let Some(value) = self.value {
            if !value.is_finite() || value < 0.0 {
                return Err(AppError::BadRequest(format!(
                    "value must be a non-negative number, got {value}"
                )));
            }
        }
        if let Some(raw) = self.date.as_deref() {
            parse_date_field("date", raw)?;
        }
        Ok(())
    }

    fn touches_emission(&self) -> bool {
        self.category.is_some() || self.activity_type.is_some() || self.value.is_some()
    }
}

/// Merge an update into an existing activity.
///
/// The emission is recomputed from the merged category, type and value when
/// any of them changes; otherwise the stored emission is kept.
pub fn apply_update(
    calculator: &EmissionCalculator,
    existing: &Activity,
    req: UpdateActivityRequest,
    now: DateTime<Utc>,
) -> Result<Activity> {
    let mut updated = existing.clone();
    let unit = req.unit.clone().filter(|u| !u.trim().is_empty());

    if req.touches_emission() {
        let category = req
            .category
            .as_deref()
            .unwrap_or(existing.category.as_str());
        let activity_type = req
            .activity_type
            .as_deref()
            .unwrap_or(&existing.activity_type);
        let value = req.value.unwrap_or(existing.value);

        let result = calculator.calculate_emission(category, activity_type, value, &existing.unit)?;

        if result.category != existing.category && unit.is_none() {
            updated.unit = result.category.unit().to_string();
        }
        updated.category = result.category;
        updated.activity_type = result.activity_type;
        updated.value = result.value;
        updated.co2_emission = result.co2_emission;
    }

    if let Some(unit) = unit {
        updated.unit = unit;
    }
    if let Some(raw) = req.date.as_deref() {
        updated.date = parse_date_field("date", raw)?;
    }
    if let Some(notes) = req.notes {
        updated.notes = notes;
    }
    updated.updated_at = Some(now);

    Ok(updated)
}

/// Fetch an activity and check the caller owns it.
async fn load_owned_activity(state: &AppState, id: &str, user: &AuthUser) -> Result<Activity> {
    let activity = state
        .db
        .get_activity(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Activity not found".to_string()))?;

    if activity.user_id != user.user_id {
        tracing::warn!(
            user_id = %user.user_id,
            activity_id = %id,
            "Rejected access to another user's activity"
        );
        return Err(AppError::Forbidden(
            "Not authorized to modify this activity".to_string(),
        ));
    }
    Ok(activity)
}

async fn update_activity(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
    payload: std::result::Result<Json<UpdateActivityRequest>, JsonRejection>,
) -> Result<Json<ActivityResponse>> {
    let Json(req) = payload?;
    req.validate()?;
    req.precheck()?;

    let existing = load_owned_activity(&state, &id, &user).await?;
    let updated = apply_update(&state.calculator, &existing, req, Utc::now())?;
    state.db.update_activity(&updated).await?;

    Ok(Json(ActivityResponse {
        message: "Activity updated successfully".to_string(),
        activity: updated,
    }))
}

async fn delete_activity(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>> {
    let activity = load_owned_activity(&state, &id, &user).await?;
    state.db.delete_activity(&activity).await?;

    Ok(Json(MessageResponse {
        message: "Activity deleted successfully".to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EmissionFactors;
    use crate::services::CalcError;
    use chrono::{Duration, TimeZone};

    fn calculator() -> EmissionCalculator {
        EmissionCalculator::new(EmissionFactors::builtin())
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap()
    }

    fn activity(id: &str, category: Category, co2: f64, date: DateTime<Utc>) -> Activity {
        Activity {
            id: id.to_string(),
            user_id: "u1".to_string(),
            category,
            activity_type: "car_petrol".to_string(),
            value: 1.0,
            unit: category.unit().to_string(),
            co2_emission: co2,
            date,
            notes: String::new(),
            created_at: date,
            updated_at: None,
        }
    }

    fn create_request(category: &str, activity_type: &str, value: f64) -> CreateActivityRequest {
        CreateActivityRequest {
            category: category.to_string(),
            activity_type: activity_type.to_string(),
            value,
            unit: None,
            date: None,
            notes: None,
        }
    }

    #[test]
    fn test_build_activity_defaults() {
        let a = build_activity(&calculator(), "u1", create_request("transport", "car_petrol", 10.0), now())
            .unwrap();
        assert_eq!(a.unit, "km");
        assert_eq!(a.date, now());
        assert_eq!(a.co2_emission, 1.2);
        assert_eq!(a.user_id, "u1");
        assert!(a.notes.is_empty());
    }

    #[test]
    fn test_build_activity_keeps_client_unit_and_date() {
        let mut req = create_request("transport", "car_petrol", 10.0);
        req.unit = Some("miles".to_string());
        req.date = Some("2024-06-01".to_string());
        let a = build_activity(&calculator(), "u1", req, now()).unwrap();
        assert_eq!(a.unit, "miles");
        assert_eq!(a.date, Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_build_activity_rejects_unknown_and_bad_dates() {
        let err = build_activity(&calculator(), "u1", create_request("space", "rocket", 1.0), now())
            .unwrap_err();
        assert!(matches!(err, AppError::Calculation(_)));

        let mut req = create_request("food", "vegan", 1.0);
        req.date = Some("yesterday".to_string());
        let err = build_activity(&calculator(), "u1", req, now()).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn test_build_activity_rejects_overflowing_emission() {
        let err = build_activity(
            &calculator(),
            "u1",
            create_request("consumption", "furniture", 1e307),
            now(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            AppError::Calculation(CalcError::EmissionOutOfRange { .. })
        ));

        // The largest accepted quantities still store a finite emission that
        // later summaries accept.
        let a = build_activity(
            &calculator(),
            "u1",
            create_request("consumption", "furniture", 1e304),
            now(),
        )
        .unwrap();
        assert!(a.co2_emission.is_finite());
        assert!(summarize(&[a], Period::Month, false, now()).is_ok());
    }

    #[test]
    fn test_filter_sorts_and_limits() {
        let base = now();
        let activities = vec![
            activity("a", Category::Transport, 1.0, base - Duration::days(3)),
            activity("b", Category::Food, 2.0, base - Duration::days(1)),
            activity("c", Category::Transport, 3.0, base - Duration::days(2)),
        ];

        let filter = ActivityFilter::from_query(&ListQuery::default()).unwrap();
        let ids: Vec<_> = filter.apply(activities.clone()).into_iter().map(|a| a.id).collect();
        assert_eq!(ids, ["b", "c", "a"]);

        let filter = ActivityFilter::from_query(&ListQuery {
            category: Some("transport".to_string()),
            limit: Some(1),
            ..Default::default()
        })
        .unwrap();
        let ids: Vec<_> = filter.apply(activities).into_iter().map(|a| a.id).collect();
        assert_eq!(ids, ["c"]);
    }

    #[test]
    fn test_filter_date_bounds_inclusive() {
        let base = now();
        let activities = vec![
            activity("early", Category::Energy, 1.0, base - Duration::days(10)),
            activity("edge", Category::Energy, 1.0, base - Duration::days(5)),
            activity("late", Category::Energy, 1.0, base),
        ];
        let filter = ActivityFilter {
            start: Some(base - Duration::days(5)),
            end: Some(base),
            category: None,
            limit: 50,
        };
        let ids: Vec<_> = filter.apply(activities).into_iter().map(|a| a.id).collect();
        assert_eq!(ids, ["late", "edge"]);
    }

    #[test]
    fn test_filter_query_validation() {
        let too_many = ActivityFilter::from_query(&ListQuery {
            limit: Some(10_000),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(too_many.limit, MAX_LIST_LIMIT);

        assert!(ActivityFilter::from_query(&ListQuery {
            category: Some("space".to_string()),
            ..Default::default()
        })
        .is_err());
        assert!(ActivityFilter::from_query(&ListQuery {
            start_date: Some("not a date".to_string()),
            ..Default::default()
        })
        .is_err());
    }

    #[test]
    fn test_summarize_current_and_previous() {
        let base = now();
        let activities = vec![
            activity("recent", Category::Transport, 4.0, base - Duration::days(1)),
            activity("older", Category::Food, 6.0, base - Duration::days(10)),
        ];

        let current = summarize(&activities, Period::Week, false, base).unwrap();
        assert_eq!(current.activity_count, 1);
        assert_eq!(current.summary.total, 4.0);

        let previous = summarize(&activities, Period::Week, true, base).unwrap();
        assert!(previous.is_previous);
        assert_eq!(previous.activity_count, 1);
        assert_eq!(previous.summary.total, 6.0);
        assert_eq!(previous.end_date, current.start_date);
    }

    #[test]
    fn test_trend_days_bounds() {
        assert_eq!(trend_days(&TrendsQuery::default()).unwrap(), 30);
        assert_eq!(trend_days(&TrendsQuery { days: Some(365) }).unwrap(), 365);
        assert!(trend_days(&TrendsQuery { days: Some(0) }).is_err());
        assert!(trend_days(&TrendsQuery { days: Some(366) }).is_err());
    }

    #[test]
    fn test_update_recomputes_with_merged_values() {
        let existing = build_activity(&calculator(), "u1", create_request("transport", "car_petrol", 10.0), now())
            .unwrap();

        let req = UpdateActivityRequest {
            value: Some(20.0),
            ..Default::default()
        };
        let updated = apply_update(&calculator(), &existing, req, now()).unwrap();
        assert_eq!(updated.co2_emission, 2.4);
        assert_eq!(updated.activity_type, "car_petrol");
        assert_eq!(updated.updated_at, Some(now()));
    }

    #[test]
    fn test_update_without_emission_fields_keeps_emission() {
        let existing = build_activity(&calculator(), "u1", create_request("transport", "car_petrol", 10.0), now())
            .unwrap();
        let req = UpdateActivityRequest {
            notes: Some("commute".to_string()),
            ..Default::default()
        };
        let updated = apply_update(&calculator(), &existing, req, now()).unwrap();
        assert_eq!(updated.co2_emission, existing.co2_emission);
        assert_eq!(updated.notes, "commute");
    }

    #[test]
    fn test_update_category_change_needs_valid_type() {
        let existing = build_activity(&calculator(), "u1", create_request("transport", "car_petrol", 10.0), now())
            .unwrap();
        let req = UpdateActivityRequest {
            category: Some("food".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            apply_update(&calculator(), &existing, req, now()),
            Err(AppError::Calculation(_))
        ));

        let req = UpdateActivityRequest {
            category: Some("food".to_string()),
            activity_type: Some("vegan".to_string()),
            value: Some(2.0),
            ..Default::default()
        };
        let updated = apply_update(&calculator(), &existing, req, now()).unwrap();
        assert_eq!(updated.category, Category::Food);
        assert_eq!(updated.unit, "meal");
    }

    #[test]
    fn test_update_blank_unit_uses_new_category_unit() {
        let existing = build_activity(&calculator(), "u1", create_request("transport", "car_petrol", 10.0), now())
            .unwrap();
        let req = UpdateActivityRequest {
            category: Some("food".to_string()),
            activity_type: Some("vegan".to_string()),
            unit: Some("  ".to_string()),
            ..Default::default()
        };
        let updated = apply_update(&calculator(), &existing, req, now()).unwrap();
        assert_eq!(updated.category, Category::Food);
        assert_eq!(updated.unit, "meal");

        let req = UpdateActivityRequest {
            unit: Some(String::new()),
            ..Default::default()
        };
        let updated = apply_update(&calculator(), &existing, req, now()).unwrap();
        assert_eq!(updated.unit, "km");
    }

    #[test]
    fn test_update_precheck() {
        let negative = UpdateActivityRequest {
            value: Some(-1.0),
            ..Default::default()
        };
        assert!(negative.precheck().is_err());

        let unknown = UpdateActivityRequest {
            category: Some("space".to_string()),
            ..Default::default()
        };
        assert!(unknown.precheck().is_err());

        assert!(UpdateActivityRequest::default().precheck().is_ok());
    }
}
