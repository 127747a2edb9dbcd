// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::http::StatusCode;
use axum::response::IntoResponse;
use carbon_tracker::error::AppError;
use carbon_tracker::services::CalcError;

#[test]
fn test_calculation_errors_are_client_errors() {
    let err: AppError = CalcError::UnknownCategory("space".to_string()).into();
    assert_eq!(err.status(), StatusCode::BAD_REQUEST);

    let err: AppError = CalcError::UnknownActivityType {
        category: "transport".to_string(),
        activity_type: "teleport".to_string(),
    }
    .into();
    assert_eq!(err.status(), StatusCode::BAD_REQUEST);

    let err: AppError = CalcError::EmissionOutOfRange {
        value: 1e307,
        factor: 100.0,
    }
    .into();
    assert_eq!(err.status(), StatusCode::BAD_REQUEST);

    let err: AppError = CalcError::InvalidRecord {
        index: 3,
        reason: "co2Emission is negative (-1)".to_string(),
    }
    .into();
    assert_eq!(err.status(), StatusCode::BAD_REQUEST);
}

#[test]
fn test_status_mapping() {
    assert_eq!(AppError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(AppError::InvalidCredentials.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        AppError::Forbidden("nope".to_string()).status(),
        StatusCode::FORBIDDEN
    );
    assert_eq!(
        AppError::NotFound("Activity not found".to_string()).status(),
        StatusCode::NOT_FOUND
    );
    assert_eq!(
        AppError::Database("boom".to_string()).status(),
        StatusCode::INTERNAL_SERVER_ERROR
    );
}

#[test]
fn test_credentials_message_does_not_reveal_which_part_failed() {
    assert_eq!(
        AppError::InvalidCredentials.to_string(),
        "Invalid email or password"
    );
}

#[test]
fn test_into_response_status() {
    let response = AppError::NotFound("Activity not found".to_string()).into_response();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = AppError::Internal(anyhow::anyhow!("secret detail")).into_response();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}
