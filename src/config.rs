// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! On Cloud Run, secrets are injected as environment variables via secret
//! bindings, so a single loader covers local development and production.

use std::env;

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_TOKEN_TTL_DAYS: i64 = 7;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    /// Frontend URL allowed by CORS
    pub frontend_url: String,
    /// GCP project ID
    pub gcp_project_id: String,
    /// Server port
    pub port: u16,
    /// Optional JSON file with a regional emission factor table
    pub emission_factors_path: Option<String>,
    /// Session token lifetime in days
    pub token_ttl_days: i64,

    // --- Secrets ---
    /// JWT signing key for session tokens (raw bytes)
    pub jwt_signing_key: Vec<u8>,
    /// Gemini API key; rule-based tips are served when absent
    pub gemini_api_key: Option<String>,
}

impl Config {
    /// Config for tests only.
    pub fn test_default() -> Self {
        Self {
            frontend_url: "http://localhost:5173".to_string(),
            gcp_project_id: "test-project".to_string(),
            port: DEFAULT_PORT,
            emission_factors_path: None,
            token_ttl_days: DEFAULT_TOKEN_TTL_DAYS,
            jwt_signing_key: b"test_jwt_key_32_bytes_minimum!!".to_vec(),
            gemini_api_key: None,
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let port = match env::var("PORT") {
            Ok(raw) => raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid("PORT", raw))?,
            Err(_) => DEFAULT_PORT,
        };

        let token_ttl_days = match env::var("TOKEN_TTL_DAYS") {
            Ok(raw) => match raw.trim().parse::<i64>() {
                Ok(days) if days > 0 => days,
                _ => return Err(ConfigError::Invalid("TOKEN_TTL_DAYS", raw)),
            },
            Err(_) => DEFAULT_TOKEN_TTL_DAYS,
        };

        Ok(Self {
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            port,
            emission_factors_path: non_empty_var("EMISSION_FACTORS_PATH"),
            token_ttl_days,

            jwt_signing_key: env::var("JWT_SIGNING_KEY")
                .map_err(|_| ConfigError::Missing("JWT_SIGNING_KEY"))?
                .into_bytes(),
            gemini_api_key: non_empty_var("GEMINI_API_KEY"),
        })
    }
}

/// Read an optional variable, treating blank values as unset.
fn non_empty_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1:?}")]
    Invalid(&'static str, String),
}
