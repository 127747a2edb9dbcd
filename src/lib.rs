// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Carbon-Tracker: personal carbon footprint tracking
//!
//! This crate provides the backend API for logging everyday activities,
//! converting them into CO2-equivalent emissions, and summarizing them
//! over time windows.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::FirestoreDb;
use services::{AdvisorService, EmissionCalculator};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: FirestoreDb,
    pub calculator: EmissionCalculator,
    pub advisor: AdvisorService,
}
