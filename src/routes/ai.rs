// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Advisor routes: reduction tips, chat and questions about recent data.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::EmissionSummary;
use crate::services::advisor::{ChatResponse, RecommendationsResponse};
use crate::services::{calculate_total_emissions, EmissionContext, PeriodWindow};
use crate::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

/// Advice is based on the trailing 30 days.
const CONTEXT_DAYS: u32 = 30;
const CONTEXT_PERIOD_LABEL: &str = "Last 30 days";

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/ai/recommendations", get(get_recommendations))
        .route("/api/ai/chat", post(chat))
        .route("/api/ai/ask", post(ask))
}

#[derive(Debug, Deserialize, Validate)]
pub struct ChatRequest {
    #[validate(length(min = 1, max = 2000, message = "Message is required"))]
    pub message: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AskRequest {
    #[validate(length(min = 1, max = 2000, message = "Question is required"))]
    pub question: String,
}

/// Summary of the user's last 30 days and how many activities it covers.
async fn recent_summary(state: &AppState, user_id: &str) -> Result<(EmissionSummary, usize)> {
    let activities = state.db.get_activities_for_user(user_id).await?;
    let window = PeriodWindow::trailing_days(CONTEXT_DAYS, Utc::now());
    let recent = window.select(&activities);
    Ok((calculate_total_emissions(&recent)?, recent.len()))
}

fn non_blank(text: &str, what: &str) -> Result<()> {
    if text.trim().is_empty() {
        return Err(AppError::BadRequest(format!("{what} is required")));
    }
    Ok(())
}

async fn get_recommendations(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<RecommendationsResponse>> {
    let (summary, activity_count) = recent_summary(&state, &user.user_id).await?;
    let context = EmissionContext {
        summary,
        activity_count,
        period: Some(CONTEXT_PERIOD_LABEL.to_string()),
    };

    Ok(Json(state.advisor.recommendations(&context, None).await))
}

async fn chat(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    payload: std::result::Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>> {
    let Json(req) = payload?;
    req.validate()?;
    non_blank(&req.message, "Message")?;

    let (summary, _) = recent_summary(&state, &user.user_id).await?;
    Ok(Json(state.advisor.chat(&req.message, &summary).await))
}

async fn ask(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    payload: std::result::Result<Json<AskRequest>, JsonRejection>,
) -> Result<Json<RecommendationsResponse>> {
    let Json(req) = payload?;
    req.validate()?;
    non_blank(&req.question, "Question")?;

    let (summary, activity_count) = recent_summary(&state, &user.user_id).await?;
    let context = EmissionContext {
        summary,
        activity_count,
        period: None,
    };

    Ok(Json(
        state
            .advisor
            .recommendations(&context, Some(&req.question))
            .await,
    ))
}
