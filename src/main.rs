// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Carbon-Tracker API Server
//!
//! Logs user activities, converts them into CO2 emissions and serves
//! summaries, daily trends and reduction tips to the dashboard.

use carbon_tracker::{
    config::Config,
    db::FirestoreDb,
    models::EmissionFactors,
    services::{AdvisorService, EmissionCalculator},
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging();

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(port = config.port, "Starting Carbon-Tracker API");

    // Initialize Firestore database
    let db = FirestoreDb::new(&config.gcp_project_id).await?;

    // Load emission factors (regional override or built-in table)
    let factors = match &config.emission_factors_path {
        Some(path) => {
            tracing::info!(path = %path, "Loading emission factors");
            EmissionFactors::load_from_file(path)?
        }
        None => EmissionFactors::builtin(),
    };
    tracing::info!(
        activity_types = factors.len(),
        "Emission factor table loaded"
    );
    let calculator = EmissionCalculator::new(factors);

    let advisor = AdvisorService::new(config.gemini_api_key.clone());
    tracing::info!(
        ai_enabled = advisor.is_ai_enabled(),
        "Advisor service initialized"
    );

    // Build shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        db,
        calculator,
        advisor,
    });

    // Build router
    let app = carbon_tracker::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("carbon_tracker=debug,info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(format)
        .init();
}
