// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API input validation tests.
//!
//! Invalid input must be rejected with 400 before the database is touched,
//! so all of these run against the offline mock.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use serde_json::json;
use tower::ServiceExt;

mod common;

async fn post_json(uri: &str, body: serde_json::Value) -> axum::response::Response {
    let (app, state) = common::create_test_app();
    let token = common::test_token(&state, "user-1");
    app.oneshot(common::json_request("POST", uri, &token, body))
        .await
        .unwrap()
}

async fn get(uri: &str) -> axum::response::Response {
    let (app, state) = common::create_test_app();
    let token = common::test_token(&state, "user-1");
    app.oneshot(common::authed_request("GET", uri, &token))
        .await
        .unwrap()
}

// ─── Auth ────────────────────────────────────────────────────

async fn post_public(uri: &str, body: serde_json::Value) -> axum::response::Response {
    let (app, _) = common::create_test_app();
    app.oneshot(
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await
    .unwrap()
}

#[tokio::test]
async fn test_register_invalid_email() {
    let response = post_public(
        "/api/auth/register",
        json!({"email": "not-an-email", "password": "secret123"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_register_short_password() {
    let response = post_public(
        "/api/auth/register",
        json!({"email": "jane@example.com", "password": "12345"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = common::body_json(response).await;
    assert_eq!(body["error"], "bad_request");
    assert!(body["details"].as_str().unwrap().contains("at least 6"));
}

#[tokio::test]
async fn test_register_missing_password() {
    let response = post_public("/api/auth/register", json!({"email": "jane@example.com"})).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_login_empty_password() {
    let response = post_public(
        "/api/auth/login",
        json!({"email": "jane@example.com", "password": ""}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ─── Activities ──────────────────────────────────────────────

#[tokio::test]
async fn test_create_activity_unknown_category() {
    let response = post_json(
        "/api/activities",
        json!({"category": "space", "activityType": "rocket", "value": 1.0}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = common::body_json(response).await;
    assert_eq!(body["error"], "invalid_activity");
    assert!(body["details"].as_str().unwrap().contains("space"));
}

#[tokio::test]
async fn test_create_activity_unknown_type() {
    let response = post_json(
        "/api/activities",
        json!({"category": "transport", "activityType": "teleport", "value": 1.0}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = common::body_json(response).await;
    assert_eq!(body["error"], "invalid_activity");
}

#[tokio::test]
async fn test_create_activity_negative_value() {
    let response = post_json(
        "/api/activities",
        json!({"category": "transport", "activityType": "car_petrol", "value": -5.0}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_create_activity_non_numeric_value() {
    let response = post_json(
        "/api/activities",
        json!({"category": "transport", "activityType": "car_petrol", "value": "ten"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_create_activity_invalid_date() {
    let response = post_json(
        "/api/activities",
        json!({
            "category": "food",
            "activityType": "vegan",
            "value": 1.0,
            "date": "last tuesday"
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_create_activity_notes_too_long() {
    let response = post_json(
        "/api/activities",
        json!({
            "category": "food",
            "activityType": "vegan",
            "value": 1.0,
            "notes": "a".repeat(501)
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_list_invalid_filters() {
    for uri in [
        "/api/activities?category=space",
        "/api/activities?startDate=invalid-date",
        "/api/activities?endDate=2024-13-45",
        "/api/activities?limit=lots",
    ] {
        let response = get(uri).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", uri);
    }
}

#[tokio::test]
async fn test_trends_days_out_of_range() {
    for uri in [
        "/api/activities/trends?days=0",
        "/api/activities/trends?days=366",
        "/api/activities/trends?days=-3",
    ] {
        let response = get(uri).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", uri);
    }
}

#[tokio::test]
async fn test_update_rejects_bad_fields_before_lookup() {
    let (app, state) = common::create_test_app();
    let token = common::test_token(&state, "user-1");

    let response = app
        .clone()
        .oneshot(common::json_request(
            "PUT",
            "/api/activities/some-id",
            &token,
            json!({"value": -1.0}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .oneshot(common::json_request(
            "PUT",
            "/api/activities/some-id",
            &token,
            json!({"category": "space"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ─── Advisor ─────────────────────────────────────────────────

#[tokio::test]
async fn test_chat_requires_message() {
    let response = post_json("/api/ai/chat", json!({"message": ""})).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = post_json("/api/ai/chat", json!({})).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_ask_rejects_blank_question() {
    let response = post_json("/api/ai/ask", json!({"question": "   "})).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
