// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Email/password authentication and profile routes.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

use crate::error::{AppError, Result};
use crate::middleware::auth::{create_jwt, AuthUser, SESSION_COOKIE};
use crate::models::User;
use crate::services::password::{hash_password, validate_password_strength, verify_password};
use crate::time_utils::format_utc_rfc3339;
use crate::AppState;

/// Registration, login and logout (no auth required).
pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/auth/logout", post(logout))
}

/// Profile routes. The auth middleware is applied in routes/mod.rs.
pub fn profile_routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/auth/profile", get(get_profile).put(update_profile))
}

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    pub password: String,
    #[validate(length(max = 100, message = "Name must be at most 100 characters"))]
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "Email is required"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(max = 100, message = "Name must be at most 100 characters"))]
    #[serde(default)]
    pub name: Option<String>,
}

/// Public part of a user returned alongside a token.
#[derive(Debug, Serialize)]
pub struct UserSummary {
    pub id: String,
    pub email: String,
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub message: String,
    pub token: String,
    pub user: UserSummary,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    pub id: String,
    pub email: String,
    pub name: String,
    pub created_at: String,
    pub total_emissions: f64,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Emails are matched case-insensitively.
fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn session_cookie(token: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Lax)
        .build()
}

fn issue_token(state: &AppState, user: &User) -> Result<String> {
    create_jwt(
        &user.id,
        &user.email,
        &state.config.jwt_signing_key,
        state.config.token_ttl_days,
    )
    .map_err(AppError::Internal)
}

/// Create an account and start a session.
async fn register(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    payload: std::result::Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, CookieJar, Json<AuthResponse>)> {
    let Json(req) = payload?;
    req.validate()?;
    validate_password_strength(&req.password).map_err(AppError::BadRequest)?;

    let email = normalize_email(&req.email);

    if state.db.find_user_by_email(&email).await?.is_some() {
        return Err(AppError::BadRequest(
            "User with this email already exists".to_string(),
        ));
    }

    let password_hash = hash_password(&req.password)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Password hashing failed: {}", e)))?;

    let user = User {
        id: uuid::Uuid::now_v7().to_string(),
        email,
        password_hash,
        name: req.name.map(|n| n.trim().to_string()).unwrap_or_default(),
        created_at: chrono::Utc::now(),
        total_emissions: 0.0,
    };

    state.db.create_user(&user).await?;
    tracing::info!(user_id = %user.id, "User registered");

    let token = issue_token(&state, &user)?;

    Ok((
        StatusCode::CREATED,
        jar.add(session_cookie(token.clone())),
        Json(AuthResponse {
            message: "User registered successfully".to_string(),
            token,
            user: UserSummary {
                id: user.id,
                email: user.email,
                name: user.name,
            },
        }),
    ))
}

/// Exchange credentials for a session token.
///
/// Unknown email and wrong password produce the same error.
async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    payload: std::result::Result<Json<LoginRequest>, JsonRejection>,
) -> Result<(CookieJar, Json<AuthResponse>)> {
    let Json(req) = payload?;
    req.validate()?;

    let email = normalize_email(&req.email);
    let user = state
        .db
        .find_user_by_email(&email)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    let valid = verify_password(&req.password, &user.password_hash).map_err(|e| {
        tracing::error!(user_id = %user.id, error = %e, "Stored password hash is unusable");
        AppError::InvalidCredentials
    })?;
    if !valid {
        tracing::debug!(user_id = %user.id, "Login rejected: wrong password");
        return Err(AppError::InvalidCredentials);
    }

    let token = issue_token(&state, &user)?;

    Ok((
        jar.add(session_cookie(token.clone())),
        Json(AuthResponse {
            message: "Login successful".to_string(),
            token,
            user: UserSummary {
                id: user.id,
                email: user.email,
                name: user.name,
            },
        }),
    ))
}

/// Clear the session cookie. Bearer tokens are dropped client side.
async fn logout(jar: CookieJar) -> (CookieJar, Json<MessageResponse>) {
    (
        jar.remove(Cookie::build(SESSION_COOKIE).path("/")),
        Json(MessageResponse {
            message: "Logged out".to_string(),
        }),
    )
}

async fn get_profile(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<ProfileResponse>> {
    let user = state
        .db
        .get_user(&auth.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    Ok(Json(ProfileResponse {
        id: user.id,
        email: user.email,
        name: user.name,
        created_at: format_utc_rfc3339(user.created_at),
        // Increments can leave tiny negative residue after deletes.
        total_emissions: user.total_emissions.max(0.0),
    }))
}

async fn update_profile(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    payload: std::result::Result<Json<UpdateProfileRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>> {
    let Json(req) = payload?;
    req.validate()?;

    let mut user = state
        .db
        .get_user(&auth.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    user.name = req.name.map(|n| n.trim().to_string()).unwrap_or_default();
    state.db.update_user_name(&user).await?;

    Ok(Json(MessageResponse {
        message: "Profile updated successfully".to_string(),
    }))
}
